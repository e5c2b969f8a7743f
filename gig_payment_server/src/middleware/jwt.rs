//! Bearer token middleware.
//!
//! Wrap the authenticated scope with this middleware. It validates the `Authorization: Bearer <token>` header and
//! stores the [`JwtClaims`] in the request extensions, where the [`JwtClaims`] extractor and the ACL middleware find
//! them. Requests without a valid token are answered with a 401 and never reach the handler.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{debug, trace};

use crate::{
    auth::{JwtClaims, TokenVerifier},
    errors::{AuthError, ServerError},
};

pub struct JwtMiddlewareFactory {
    verifier: TokenVerifier,
}

impl JwtMiddlewareFactory {
    pub fn new(verifier: TokenVerifier) -> Self {
        JwtMiddlewareFactory { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = JwtMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtMiddlewareService { verifier: Rc::new(self.verifier.clone()), service: Rc::new(service) }))
    }
}

pub struct JwtMiddlewareService<S> {
    verifier: Rc<TokenVerifier>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let verifier = Rc::clone(&self.verifier);
        Box::pin(async move {
            let header = req
                .headers()
                .get(AUTHORIZATION)
                .ok_or(ServerError::AuthenticationError(AuthError::MissingToken))?
                .to_str()
                .map_err(|e| ServerError::AuthenticationError(AuthError::PoorlyFormattedToken(e.to_string())))?;
            let claims: JwtClaims = verifier.verify_bearer(header).map_err(|e| {
                debug!("🔐️ Rejected access token for {}. {e}", req.path());
                ServerError::AuthenticationError(e)
            })?;
            trace!("🔐️ {} is calling {}", claims.sub, req.path());
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}

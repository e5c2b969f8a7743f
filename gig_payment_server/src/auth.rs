//! Access tokens are issued by the marketplace's auth provider and signed with a shared HS256 secret. The server only
//! ever verifies them; [`TokenIssuer`] exists for tests and operator tooling.
use std::{
    future::{ready, Ready},
    time::Duration,
};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::Utc;
use gig_payment_engine::db_types::{Role, Roles, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id
    pub sub: UserId,
    /// Expiry, in seconds since the epoch
    pub exp: i64,
    pub aud: String,
    #[serde(default)]
    pub roles: Roles,
}

impl JwtClaims {
    pub fn user_id(&self) -> &UserId {
        &self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

/// Handlers can take `JwtClaims` as an argument. The claims are put in the request extensions by the JWT middleware,
/// so a route outside the authenticated scope gets a 401.
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned().ok_or_else(|| {
            warn!("🔐️ No JWT claims found in request extensions for {}", req.path());
            ServerError::AuthenticationError(AuthError::MissingToken)
        });
        ready(claims)
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        Self { key, validation }
    }

    /// Extracts the token from an `Authorization: Bearer <token>` header value and validates it.
    pub fn verify_bearer(&self, header: &str) -> Result<JwtClaims, AuthError> {
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a Bearer token".into()))?;
        self.verify(token)
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        trace!("🔐️ Access token validated for {}", data.claims.sub);
        Ok(data.claims)
    }
}

pub struct TokenIssuer {
    key: EncodingKey,
    audience: String,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let key = EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        Self { key, audience: config.audience.clone() }
    }

    /// Issues an access token for `user`. Defaults to a 24 hour lifetime.
    pub fn issue_token(&self, user: &UserId, roles: Roles, duration: Option<Duration>) -> Result<String, AuthError> {
        let duration = duration.unwrap_or_else(|| Duration::from_secs(60 * 60 * 24));
        let ttl = i64::try_from(duration.as_secs()).map_err(|e| AuthError::ValidationError(e.to_string()))?;
        let claims = JwtClaims { sub: user.clone(), exp: Utc::now().timestamp() + ttl, aud: self.audience.clone(), roles };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key).map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}

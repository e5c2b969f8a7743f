use std::time::{Duration, SystemTime};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use gig_payment_engine::db_types::{Role, UserId};
use gig_payment_server::{auth::TokenIssuer, config::AuthConfig};

#[derive(Debug, Args)]
pub struct TokenParams {
    /// The user id to put in the `sub` claim
    #[arg(short, long)]
    pub user: String,
    /// Roles the token grants. May be given more than once.
    #[arg(short, long = "role", default_value = "user")]
    pub roles: Vec<Role>,
    /// How long the token is valid for, in hours
    #[arg(long, default_value_t = 24)]
    pub hours: u64,
    /// The HS256 secret the server verifies tokens with
    #[arg(short, long, env = "GIG_JWT_SECRET", hide_env_values = true)]
    pub secret: String,
    #[arg(short, long, env = "GIG_JWT_AUDIENCE", default_value = "authenticated")]
    pub audience: String,
}

pub fn print_access_token(params: TokenParams) -> Result<()> {
    if params.roles.is_empty() {
        return Err(anyhow!("A token without roles cannot call any endpoint"));
    }
    let config = AuthConfig::new(&params.secret, &params.audience);
    let lifetime = Duration::from_secs(params.hours * 3600);
    let user = UserId::from(params.user.as_str());
    let token = TokenIssuer::new(&config).issue_token(&user, params.roles.clone(), Some(lifetime))?;
    let expiry = DateTime::<Utc>::from(SystemTime::now() + lifetime);
    let roles = params.roles.iter().map(|r| r.to_string()).collect::<Vec<String>>();
    println!("----------------------------- Access Token -----------------------------");
    println!("user: {user}");
    println!("audience: {}", params.audience);
    println!("roles: {}", roles.join(","));
    println!("expires: {expiry}");
    println!("token:\n{token}");
    println!("------------------------------------------------------------------------");
    Ok(())
}

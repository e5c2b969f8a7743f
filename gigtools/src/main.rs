use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

mod fees;
mod setup;
mod signing;
mod token;

use crate::{
    fees::{print_fee_breakdown, FeeParams},
    setup::{handle_setup_command, SetupCommand},
    signing::{handle_sign_command, SignCommand},
    token::{print_access_token, TokenParams},
};

#[derive(Parser, Debug)]
#[command(version, about = "Operator and developer tools for the GigPay payment server")]
pub struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show what a client pays, and what the freelancer and platform receive, for a service price
    #[clap(name = "fees")]
    Fees(FeeParams),
    /// Produce gateway signatures for checkout results and webhook bodies, for testing against a local server
    #[command(subcommand)]
    Sign(SignCommand),
    /// Issue an access token signed with the server's JWT secret
    #[clap(name = "token")]
    AccessToken(TokenParams),
    /// Local database setup
    #[command(subcommand)]
    Setup(SetupCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    match cli.command {
        Command::Fees(params) => print_fee_breakdown(params),
        Command::Sign(command) => handle_sign_command(command),
        Command::AccessToken(params) => print_access_token(params),
        Command::Setup(command) => handle_setup_command(command).await,
    }
}

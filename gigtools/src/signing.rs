use std::{fs, path::PathBuf};

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use gig_payment_engine::helpers::{sign_checkout, sign_webhook};

#[derive(Debug, Subcommand)]
pub enum SignCommand {
    /// Sign a checkout result, as the gateway does before handing it to the client
    Checkout(CheckoutParams),
    /// Sign a webhook body, as the gateway does before delivering it
    Webhook(WebhookParams),
}

#[derive(Debug, Args)]
pub struct CheckoutParams {
    /// The gateway order id (order_...)
    #[arg(short, long)]
    pub order: String,
    /// The gateway payment id (pay_...)
    #[arg(short, long)]
    pub payment: String,
    /// The gateway API key secret
    #[arg(short, long, env = "GIG_RAZORPAY_KEY_SECRET", hide_env_values = true)]
    pub secret: String,
}

#[derive(Debug, Args)]
pub struct WebhookParams {
    /// A file holding the exact body to sign. Use `--body` for inline JSON instead.
    #[arg(short, long, conflicts_with = "body")]
    pub file: Option<PathBuf>,
    #[arg(short, long)]
    pub body: Option<String>,
    /// The webhook secret configured on the gateway dashboard
    #[arg(short, long, env = "GIG_RAZORPAY_WEBHOOK_SECRET", hide_env_values = true)]
    pub secret: String,
}

pub fn handle_sign_command(command: SignCommand) -> Result<()> {
    match command {
        SignCommand::Checkout(params) => {
            let signature = sign_checkout(&params.secret, &params.order, &params.payment);
            println!("----------------------------- Checkout result -----------------------------");
            println!("gatewayOrderId:   {}", params.order);
            println!("gatewayPaymentId: {}", params.payment);
            println!("gatewaySignature: {signature}");
            println!("---------------------------------------------------------------------------");
        },
        SignCommand::Webhook(params) => {
            let body = match (params.file, params.body) {
                (Some(path), _) => fs::read(&path).map_err(|e| anyhow!("Could not read {}. {e}", path.display()))?,
                (None, Some(body)) => body.into_bytes(),
                (None, None) => return Err(anyhow!("Provide the webhook body with --file or --body")),
            };
            println!("X-Razorpay-Signature: {}", sign_webhook(&params.secret, &body));
        },
    }
    Ok(())
}

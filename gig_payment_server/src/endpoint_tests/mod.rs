mod helpers;

mod fees;
mod payments;
mod webhooks;

use anyhow::Result;
use clap::Args;
use gig_payment_engine::{
    fees::{DEFAULT_COMMISSION_RATE, DEFAULT_TAX_RATE},
    FeeBreakdown,
    FeeSchedule,
};
use prettytable::{row, Table};
use rust_decimal::Decimal;

#[derive(Debug, Args)]
pub struct FeeParams {
    /// The service price, in major units (e.g. rupees)
    #[arg(short, long)]
    pub price: Decimal,
    /// Platform commission, in percent
    #[arg(short, long, env = "GIG_COMMISSION_RATE", default_value_t = DEFAULT_COMMISSION_RATE)]
    pub commission: Decimal,
    /// GST charged on the commission, in percent
    #[arg(short, long, env = "GIG_TAX_RATE", default_value_t = DEFAULT_TAX_RATE)]
    pub tax: Decimal,
}

pub fn print_fee_breakdown(params: FeeParams) -> Result<()> {
    let schedule = FeeSchedule::new(params.commission, params.tax)?;
    let breakdown = schedule.calculate(params.price)?;
    println!("Commission {}%, GST {}% on the commission", schedule.commission_rate(), schedule.tax_rate());
    println!("{}", format_fee_breakdown(&breakdown));
    Ok(())
}

pub fn format_fee_breakdown(breakdown: &FeeBreakdown) -> String {
    let mut table = Table::new();
    table.set_titles(row!["", "Amount"]);
    table.add_row(row!["Service price", r->breakdown.price]);
    table.add_row(row!["Commission", r->breakdown.commission]);
    table.add_row(row!["GST on commission", r->breakdown.tax_on_commission]);
    table.add_row(row!["Client pays", r->breakdown.total]);
    table.add_row(row!["Freelancer receives", r->breakdown.freelancer_net]);
    table.add_row(row!["Platform retains", r->breakdown.platform_retained]);
    table.to_string()
}

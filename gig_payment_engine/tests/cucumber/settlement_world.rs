use std::collections::HashMap;

use cucumber::World;
use gig_payment_engine::{
    db_types::OrderId,
    order_objects::OrderWindows,
    payment_objects::{PaymentInitiated, WebhookOutcome},
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    FeeSchedule,
    OrderFlowApi,
    SettlementApi,
    SettlementError,
    SqliteDatabase,
};
use log::*;

use crate::support::FakeGateway;

#[derive(Default, Debug, World)]
pub struct SettlementWorld {
    pub system: Option<SettlementSystem>,
    /// Order ids are random, so scenarios refer to them by label
    pub orders: HashMap<String, OrderId>,
    pub checkouts: HashMap<String, PaymentInitiated>,
    pub last_error: Option<SettlementError>,
    pub last_outcome: Option<WebhookOutcome>,
}

#[derive(Debug)]
pub struct SettlementSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub settlement: SettlementApi<SqliteDatabase, FakeGateway>,
}

impl SettlementWorld {
    pub fn system(&self) -> &SettlementSystem {
        self.system.as_ref().expect("System not initialised")
    }

    pub fn order_id(&self, label: &str) -> OrderId {
        self.orders.get(label).cloned().unwrap_or_else(|| panic!("No order labelled {label}"))
    }

    pub fn checkout(&self, label: &str) -> &PaymentInitiated {
        self.checkouts.get(label).unwrap_or_else(|| panic!("No checkout for order {label}"))
    }
}

impl SettlementSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let orders = OrderFlowApi::new(db.clone(), OrderWindows::default(), "INR");
        let settlement = SettlementApi::new(db.clone(), FakeGateway::default(), FeeSchedule::default(), "INR");
        Self { db_path: url, db, orders, settlement }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}

//! Test harness: an in-memory SQLite database with the engine's schema
//! plus seed helpers for products, buy orders, purchases and expenses.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    Statement,
};

use retaceo_api::config::AppConfig;
use retaceo_api::db::{establish_connection_with_config, DbConfig};
use retaceo_api::entities::{buy_order, expense, product, purchase, purchase_line};
use retaceo_api::events::{event_channel, EventSender};
use retaceo_api::EngineState;

const SCHEMA: &[&str] = &[
    "CREATE TABLE products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        amount REAL NOT NULL DEFAULT 0,
        price REAL NOT NULL DEFAULT 0,
        bill_cost REAL NOT NULL DEFAULT 0,
        final_bill_retaceo REAL NOT NULL DEFAULT 0,
        utility REAL NOT NULL DEFAULT 0,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE buy_orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL,
        supplier_id INTEGER,
        date TEXT,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE purchases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        buy_order_id INTEGER,
        invoice_number TEXT,
        date TEXT,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE purchase_lines (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        purchase_id INTEGER NOT NULL,
        product_id INTEGER NOT NULL,
        quantity REAL NOT NULL,
        price REAL NOT NULL
    )",
    "CREATE TABLE expenses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        buy_order_id INTEGER NOT NULL,
        expense_type TEXT NOT NULL,
        value REAL NOT NULL,
        date TEXT,
        description TEXT,
        created_at TEXT
    )",
    "CREATE TABLE retaceo_headers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        purchase_id INTEGER NOT NULL,
        code TEXT,
        invoice_ref TEXT,
        date TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE retaceo_lines (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        retaceo_id INTEGER NOT NULL,
        product_id INTEGER NOT NULL,
        quantity REAL NOT NULL,
        price REAL NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT,
        updated_at TEXT
    )",
];

/// Engine state backed by a fresh in-memory database.
pub struct TestEngine {
    pub state: EngineState,
    pub db: Arc<DatabaseConnection>,
    #[allow(dead_code)]
    pub event_sender: EventSender,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestEngine {
    pub async fn new() -> Self {
        // A single pooled connection keeps every statement on the same
        // in-memory database.
        let db_config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(5),
        };

        let db = establish_connection_with_config(&db_config)
            .await
            .expect("in-memory database should connect");

        for ddl in SCHEMA {
            db.execute(Statement::from_string(DatabaseBackend::Sqlite, *ddl))
                .await
                .expect("schema statement should apply");
        }

        let db = Arc::new(db);
        let (event_sender, mut receiver) = event_channel(64);
        let event_task = tokio::spawn(async move { while receiver.recv().await.is_some() {} });

        let config = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        let state = EngineState::new(db.clone(), config, Some(event_sender.clone()));

        Self {
            state,
            db,
            event_sender,
            _event_task: event_task,
        }
    }
}

pub async fn insert_product(db: &DatabaseConnection, name: &str, amount: Decimal) -> product::Model {
    product::ActiveModel {
        name: Set(name.to_string()),
        amount: Set(amount),
        price: Set(Decimal::ZERO),
        bill_cost: Set(Decimal::ZERO),
        final_bill_retaceo: Set(Decimal::ZERO),
        utility: Set(Decimal::ZERO),
        created_at: Set(Some(Utc::now())),
        updated_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("product insert")
}

pub async fn insert_buy_order(db: &DatabaseConnection, code: &str) -> buy_order::Model {
    buy_order::ActiveModel {
        code: Set(code.to_string()),
        supplier_id: Set(Some(1)),
        date: Set(None),
        created_at: Set(Some(Utc::now())),
        updated_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("buy order insert")
}

pub async fn insert_purchase(
    db: &DatabaseConnection,
    buy_order_id: Option<i64>,
) -> purchase::Model {
    purchase::ActiveModel {
        buy_order_id: Set(buy_order_id),
        invoice_number: Set(Some("INV-001".to_string())),
        date: Set(None),
        created_at: Set(Some(Utc::now())),
        updated_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("purchase insert")
}

pub async fn insert_purchase_line(
    db: &DatabaseConnection,
    purchase_id: i64,
    product_id: i64,
    quantity: Decimal,
    price: Decimal,
) -> purchase_line::Model {
    purchase_line::ActiveModel {
        purchase_id: Set(purchase_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        price: Set(price),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("purchase line insert")
}

pub async fn insert_expense(
    db: &DatabaseConnection,
    buy_order_id: i64,
    expense_type: &str,
    value: Decimal,
) -> expense::Model {
    expense::ActiveModel {
        buy_order_id: Set(buy_order_id),
        expense_type: Set(expense_type.to_string()),
        value: Set(value),
        date: Set(None),
        description: Set(None),
        created_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("expense insert")
}

/// The spec's concrete scenario: product A qty 10 @ 5.00, product B qty 5
/// @ 10.00 (FOB 50 each), freight 20.00 + duty 10.00 against the buy order.
pub struct TwoLineScenario {
    pub purchase_id: i64,
    pub buy_order_id: i64,
    pub product_a: i64,
    pub product_b: i64,
}

pub async fn seed_two_line_scenario(db: &DatabaseConnection) -> TwoLineScenario {
    use rust_decimal_macros::dec;

    let product_a = insert_product(db, "Product A", Decimal::ZERO).await;
    let product_b = insert_product(db, "Product B", dec!(2)).await;
    let buy_order = insert_buy_order(db, "BO-001").await;
    let purchase = insert_purchase(db, Some(buy_order.id)).await;

    insert_purchase_line(db, purchase.id, product_a.id, dec!(10), dec!(5.00)).await;
    insert_purchase_line(db, purchase.id, product_b.id, dec!(5), dec!(10.00)).await;

    insert_expense(db, buy_order.id, "freight", dec!(20.00)).await;
    insert_expense(db, buy_order.id, "duty", dec!(10.00)).await;

    TwoLineScenario {
        purchase_id: purchase.id,
        buy_order_id: buy_order.id,
        product_a: product_a.id,
        product_b: product_b.id,
    }
}

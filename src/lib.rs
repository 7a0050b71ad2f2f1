//! Cost allocation & approval engine ("retaceo") for a procurement back
//! office. Distributes a buy order's incidental expenses (freight, duty,
//! insurance, ...) across purchase line items in proportion to FOB value,
//! persists the result as an approvable draft, and on approval atomically
//! rewrites the affected products' stock, cost basis and resale price.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod services;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use services::allocations::AllocationService;
use services::approval::ApprovalService;
use services::expenses::ExpenseService;

/// Wires the engine's services around one database handle and an optional
/// event channel. Each service receives its collaborators explicitly;
/// there is no ambient global state.
#[derive(Clone)]
pub struct EngineState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Option<events::EventSender>,
    pub expenses: ExpenseService,
    pub allocations: AllocationService,
    pub approval: ApprovalService,
}

impl EngineState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Option<events::EventSender>,
    ) -> Self {
        let expenses = ExpenseService::new(db.clone());
        let allocations = AllocationService::new(db.clone(), event_sender.clone());
        let approval = ApprovalService::new(db.clone(), event_sender.clone());

        Self {
            db,
            config,
            event_sender,
            expenses,
            allocations,
            approval,
        }
    }
}

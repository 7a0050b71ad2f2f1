use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Events emitted by the allocation engine.
///
/// Events are sent only after the corresponding database work has committed;
/// the approval transaction never publishes from inside its unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A draft allocation was persisted for a purchase.
    AllocationDraftCreated {
        retaceo_id: i64,
        purchase_id: i64,
        total_fob: Decimal,
        total_expenses: Decimal,
        line_count: usize,
    },
    /// A draft allocation was approved and product master data rewritten.
    AllocationApproved {
        retaceo_id: i64,
        proration_factor: Decimal,
        products_updated: Vec<i64>,
    },
    /// A single product's cost basis changed during approval.
    ProductCostUpdated {
        product_id: i64,
        bill_cost: Decimal,
        landed_unit_cost: Decimal,
        price: Decimal,
    },
    /// A draft allocation was deleted before approval.
    AllocationDraftDeleted { retaceo_id: i64 },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the receiver is gone.
    /// Engine operations must not fail because nobody is listening.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

/// Creates an event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains events, logging each one. Useful as a default consumer when no
/// downstream integration is wired up.
pub async fn log_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "engine event");
    }
}

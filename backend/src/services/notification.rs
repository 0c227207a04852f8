//! Kitchen signal service
//!
//! Best-effort out-of-band notifications for kitchen and delivery boards:
//! an item pulled from an in-progress order, or an order cancelled outright.
//! Delivery failure never rolls back the state change that triggered the
//! signal; the commit happens first and the signal is fired after it.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events the kitchen cares about beyond the order snapshot itself
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KitchenEvent {
    /// An item was removed from an order already sent to the kitchen
    ItemRemoved {
        order_id: Uuid,
        item_name: String,
        quantity: u32,
    },
    /// The order document was deleted; stop preparing it
    OrderCancelled { order_id: Uuid },
}

/// Broadcast channel for kitchen signals
#[derive(Clone)]
pub struct KitchenSignalService {
    tx: broadcast::Sender<KitchenEvent>,
}

impl KitchenSignalService {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe a board to the signal feed.
    pub fn subscribe(&self) -> broadcast::Receiver<KitchenEvent> {
        self.tx.subscribe()
    }

    /// Fire a signal. Having no listening board is not an error: the send
    /// result only reports the receiver count, so an undelivered event is
    /// logged and swallowed.
    pub fn emit(&self, event: KitchenEvent) {
        match self.tx.send(event) {
            Ok(receivers) => tracing::debug!(receivers, "kitchen signal delivered"),
            Err(err) => tracing::warn!("kitchen signal had no listeners: {}", err),
        }
    }
}

impl Default for KitchenSignalService {
    fn default() -> Self {
        Self::new(64)
    }
}

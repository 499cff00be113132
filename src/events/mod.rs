use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after the owning transaction committed.
    /// A closed channel is logged, never surfaced to the caller.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

/// Things that happened to procurement orders and assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ProcurementOrderCreated {
        order_id: Uuid,
        po_number: String,
    },
    ProcurementOrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    DeliveryStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    ProcurementOrderCanceled {
        order_id: Uuid,
        reason: String,
    },
    ReceiptConfirmed {
        order_id: Uuid,
        fully_received: bool,
        has_discrepancy: bool,
    },
    DiscrepancyResolved {
        order_id: Uuid,
        item_id: Option<Uuid>,
    },
    AssetsGenerated {
        order_id: Uuid,
        generated_count: usize,
    },
    AssetWorkflowChanged {
        asset_id: Uuid,
        new_status: String,
    },
    DefaultCategoryCreated {
        category_id: Uuid,
        name: String,
    },
}

/// Drains the event channel, logging each event. Ends when every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::ProcurementOrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(%order_id, %old_status, %new_status, "procurement order status changed"),
            Event::DeliveryStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(%order_id, %old_status, %new_status, "delivery status changed"),
            Event::AssetsGenerated {
                order_id,
                generated_count,
            } => info!(%order_id, generated_count, "assets generated"),
            other => debug!(event = ?other, "event received"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sent_events_reach_the_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let order_id = Uuid::new_v4();

        sender
            .send(Event::AssetsGenerated {
                order_id,
                generated_count: 3,
            })
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(Event::AssetsGenerated {
                order_id,
                generated_count: 3
            })
        );
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender
            .send(Event::DiscrepancyResolved {
                order_id: Uuid::new_v4(),
                item_id: None
            })
            .await
            .is_err());
        // send_or_log swallows the failure
        sender
            .send_or_log(Event::DiscrepancyResolved {
                order_id: Uuid::new_v4(),
                item_id: None,
            })
            .await;
    }
}

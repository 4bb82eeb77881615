use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
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

    /// Sends an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

// Domain events emitted by the services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    FarmerRegistered(Uuid),
    ConsumerRegistered(Uuid),

    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    ProductQrBound { product_id: Uuid, qr_path: String },
    ProductQrPending { product_id: Uuid, reason: String },

    OrderPlaced { order_id: Uuid, product_id: Uuid, farmer_id: Uuid },
}

// Drains the channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::ProductQrPending { product_id, reason } => {
                warn!(%product_id, %reason, "product created without authenticity QR");
            }
            Event::ProductQrBound { product_id, qr_path } => {
                info!(%product_id, %qr_path, "authenticity QR bound");
            }
            Event::OrderPlaced {
                order_id,
                product_id,
                farmer_id,
            } => {
                info!(%order_id, %product_id, %farmer_id, "order placed");
            }
            other => info!("Received event: {:?}", other),
        }
    }

    info!("Event processing loop stopped");
}

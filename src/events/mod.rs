use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::qc::InspectionResult;
use crate::entities::rma::ReturnGrade;

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
}

// The state changes other subsystems may care about. One variant per
// observable transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Ledger events
    LotCreated {
        record_id: Uuid,
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
    },
    StockReserved {
        record_id: Uuid,
        reservation_id: Uuid,
        quantity: i32,
    },
    StockReleased {
        record_id: Uuid,
        reservation_id: Uuid,
    },
    StockConsumed {
        record_id: Uuid,
        reservation_id: Uuid,
        quantity: i32,
    },
    LotStatusChanged {
        record_id: Uuid,
        new_status: String,
    },
    LotScrapped {
        record_id: Uuid,
        quantity: i32,
    },
    StaleReservationsReleased {
        released_count: u64,
    },

    // Inbound events
    InboundOrderCreated(Uuid),
    ItemReceived {
        order_id: Uuid,
        order_item_id: Uuid,
        record_id: Uuid,
        quantity: i32,
        operator_id: Uuid,
    },
    InboundOrderReceived(Uuid),

    // Outbound / picking events
    OutboundOrderCreated(Uuid),
    WaveCreated {
        wave_id: Uuid,
        order_count: usize,
        task_count: usize,
    },
    PickTaskConfirmed {
        task_id: Uuid,
        quantity_picked: i32,
    },
    /// Exception report: an allowed under-pick left demand uncovered.
    PickShortfall {
        task_id: Uuid,
        quantity_to_pick: i32,
        quantity_picked: i32,
    },
    WaveCompleted(Uuid),
    OrderPicked(Uuid),

    // Packing / shipping events
    PackingStarted {
        order_id: Uuid,
        shipment_id: Uuid,
    },
    ParcelCreated {
        shipment_id: Uuid,
        parcel_id: Uuid,
    },
    ShipmentClosed {
        shipment_id: Uuid,
        parcel_count: usize,
    },
    ShippingLabelGenerated {
        shipment_id: Uuid,
        tracking_number: String,
    },
    ShipmentRecordCreated {
        shipment_id: Uuid,
        carrier_id: Uuid,
    },
    LoadCreated(Uuid),
    ShipmentAssignedToLoad {
        load_id: Uuid,
        shipment_id: Uuid,
    },
    LoadDispatched {
        load_id: Uuid,
        manifest_id: Uuid,
        shipment_count: usize,
    },
    OrderShipped(Uuid),

    // Returns / QC events
    RmaCreated(Uuid),
    ReturnReceived {
        rma_id: Uuid,
        lot_count: usize,
    },
    ReturnItemGraded {
        rma_id: Uuid,
        product_id: Uuid,
        grade: ReturnGrade,
    },
    RmaClosed(Uuid),
    InspectionCreated(Uuid),
    InspectionExecuted {
        inspection_id: Uuid,
        result: InspectionResult,
        lots_released: usize,
    },
    NcrCreated {
        ncr_id: Uuid,
        inspection_id: Uuid,
    },

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn with_data(message: String) -> Self {
        Event::Generic {
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Consumes the event stream. External collaborators (notifications,
/// telemetry, reporting) subscribe at this boundary; the core only logs.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PickShortfall {
                task_id,
                quantity_to_pick,
                quantity_picked,
            } => {
                warn!(
                    task_id = %task_id,
                    quantity_to_pick,
                    quantity_picked,
                    "pick confirmed short"
                );
            }
            other => {
                info!(event = ?other, "event processed");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_the_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        sender.send(Event::OrderShipped(Uuid::new_v4())).await.unwrap();
        assert!(matches!(rx.recv().await, Some(Event::OrderShipped(_))));
    }

    #[tokio::test]
    async fn send_fails_once_the_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        let result = sender.send(Event::with_data("orphan".into())).await;
        assert!(result.is_err());
    }
}

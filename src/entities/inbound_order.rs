use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundOrderStatus {
    Pending,
    PartiallyReceived,
    Received,
}

/// One expected SKU on an inbound order. Complete once received >= expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundOrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity_expected: i32,
    pub quantity_received: i32,
}

impl InboundOrderItem {
    pub fn is_complete(&self) -> bool {
        self.quantity_received >= self.quantity_expected
    }
}

/// Advance notice of an arriving delivery; receiving works item by item
/// against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundOrder {
    pub id: Uuid,
    pub order_reference: String,
    pub supplier: String,
    pub expected_arrival: Option<DateTime<Utc>>,
    pub status: InboundOrderStatus,
    pub items: Vec<InboundOrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

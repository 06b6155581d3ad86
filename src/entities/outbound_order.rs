use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Forward-path lifecycle of customer demand.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundOrderStatus {
    Planned,
    Picked,
    Packed,
    Shipped,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPriority {
    Low,
    Standard,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundOrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity_ordered: i32,
    pub quantity_picked: i32,
    pub quantity_shipped: i32,
    pub unit_price: Decimal,
}

impl OutboundOrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity_ordered)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundOrder {
    pub id: Uuid,
    pub reference_number: String,
    pub customer_name: Option<String>,
    pub destination: Option<String>,
    pub priority: OrderPriority,
    pub status: OutboundOrderStatus,
    pub items: Vec<OutboundOrderItem>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Packing,
    Packed,
    Shipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A physical box inside a shipment. Weight is derived: material tare
/// plus the summed unit weights of its contents. Immutable once the
/// shipment is closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub packing_material_id: String,
    pub tare_weight_grams: i64,
    pub items: Vec<ParcelItem>,
    pub weight_grams: i64,
    pub created_at: DateTime<Utc>,
}

/// One outbound order's physical dispatch unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub outbound_order_id: Uuid,
    pub status: ShipmentStatus,
    pub carrier_id: Option<Uuid>,
    pub tracking_number: Option<String>,
    pub parcel_ids: Vec<Uuid>,
    pub total_weight_grams: i64,
    pub load_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub packed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
}

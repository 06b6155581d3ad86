use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Carrier {
    pub id: Uuid,
    pub name: String,
    pub service_type: Option<String>,
    pub tracking_url_template: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadStatus {
    Open,
    Dispatched,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub trailer_number: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
}

/// Groups packed shipments for a single carrier pickup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportLoad {
    pub id: Uuid,
    pub load_number: String,
    pub carrier_id: Uuid,
    pub vehicle: VehicleInfo,
    pub status: LoadStatus,
    pub shipment_ids: Vec<Uuid>,
    pub manifest_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestLine {
    pub shipment_id: Uuid,
    pub outbound_order_id: Uuid,
    pub order_reference: String,
    pub tracking_number: String,
    pub parcel_count: u32,
    pub weight_grams: i64,
}

/// Carrier-facing snapshot produced exactly once, at dispatch.
/// Never regenerated or edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub id: Uuid,
    pub manifest_number: String,
    pub load_id: Uuid,
    pub carrier_id: Uuid,
    pub lines: Vec<ManifestLine>,
    pub generated_at: DateTime<Utc>,
}

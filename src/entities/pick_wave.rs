use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WaveStatus {
    InProgress,
    Completed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PickTaskStatus {
    Pending,
    Completed,
}

/// A batch of outbound demand released together for picking.
///
/// Completed once every task is completed; at that point the covered
/// orders move to PICKED.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickWave {
    pub id: Uuid,
    pub wave_number: String,
    pub status: WaveStatus,
    pub order_ids: Vec<Uuid>,
    pub task_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One unit of pick work: move N units of a product from a source lot to
/// a target LPN. Backed by exactly one ledger reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickTask {
    pub id: Uuid,
    pub wave_id: Uuid,
    pub outbound_order_id: Uuid,
    pub product_id: Uuid,
    pub source_location_id: Uuid,
    pub source_record_id: Uuid,
    pub reservation_id: Uuid,
    pub target_lpn: String,
    pub quantity_to_pick: i32,
    pub quantity_picked: Option<i32>,
    pub status: PickTaskStatus,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

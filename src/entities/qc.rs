use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an inspection samples from. Closed set; each variant's reference
/// is validated by the QC manager against its owning store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionSource {
    /// Reference is an inbound order id.
    Inbound,
    /// Reference is an RMA id.
    Return,
    /// Reference is a ledger record id; creating the inspection puts the
    /// lot on QC hold.
    Inventory,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionResult {
    Pending,
    Passed,
    Failed,
    Conditional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcInspection {
    pub id: Uuid,
    pub product_id: Uuid,
    pub source: InspectionSource,
    pub reference_id: Uuid,
    pub sample_size: i32,
    pub result: InspectionResult,
    pub inspector_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NcrStatus {
    Open,
    Closed,
}

/// Documents a defect found by a FAILED or CONDITIONAL inspection.
/// At most one per inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonConformanceReport {
    pub id: Uuid,
    pub ncr_number: String,
    pub inspection_id: Uuid,
    pub defect_type: String,
    pub description: String,
    pub status: NcrStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

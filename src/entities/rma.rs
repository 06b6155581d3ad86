use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RmaStatus {
    Pending,
    Received,
    Graded,
    Closed,
}

/// Grading outcome for a returned line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnGrade {
    GradeA,
    GradeB,
    GradeC,
    Scrap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub grade: Option<ReturnGrade>,
    pub comment: Option<String>,
    /// Ledger lot created in QC_HOLD when the return is received.
    pub lot_id: Option<Uuid>,
}

/// Return-merchandise authorization: the reverse-order header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmaRequest {
    pub id: Uuid,
    pub rma_number: String,
    pub outbound_order_id: Uuid,
    pub reason: String,
    pub status: RmaStatus,
    pub tracking_number: Option<String>,
    pub items: Vec<ReturnItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

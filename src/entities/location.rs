use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical area of the warehouse grouping locations with shared
/// security / temperature constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: Uuid,
    pub name: String,
    pub is_secure: bool,
    pub is_temperature_controlled: bool,
    pub created_at: DateTime<Utc>,
}

/// Classifies a location and carries its capacity constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationType {
    pub id: Uuid,
    pub name: String,
    /// Maximum number of units the location can physically hold.
    pub max_units: i32,
    pub created_at: DateTime<Utc>,
}

/// A single addressable slot (e.g. "A-01-01").
///
/// Occupancy is always derived from the inventory ledger; it is never
/// stored on the location itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub code: String,
    pub barcode: Option<String>,
    pub zone_id: Uuid,
    pub location_type_id: Uuid,
    /// Walk order used by the pick-wave scheduler; lower comes first.
    pub pick_sequence: i32,
    pub created_at: DateTime<Utc>,
}

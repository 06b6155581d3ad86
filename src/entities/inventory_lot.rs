use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an inventory record (lot).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStatus {
    Available,
    Reserved,
    QcHold,
    Damaged,
}

impl LotStatus {
    /// Transitions that `set_status` may perform directly.
    ///
    /// Reservation-driven transitions (Available <-> Reserved) belong to
    /// `reserve` / `release` / `consume` and are rejected here.
    pub fn can_set_to(self, to: LotStatus) -> bool {
        matches!(
            (self, to),
            (LotStatus::Available, LotStatus::QcHold)
                | (LotStatus::Available, LotStatus::Damaged)
                | (LotStatus::QcHold, LotStatus::Available)
                | (LotStatus::QcHold, LotStatus::Damaged)
        )
    }
}

/// Where a lot came from. Closed set of tagged variants; QC uses the
/// embedded reference to find the lots a document produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotSource {
    Inbound { order_id: Uuid },
    Return { rma_id: Uuid },
    Adjustment,
}

impl LotSource {
    pub fn reference_id(&self) -> Option<Uuid> {
        match self {
            LotSource::Inbound { order_id } => Some(*order_id),
            LotSource::Return { rma_id } => Some(*rma_id),
            LotSource::Adjustment => None,
        }
    }
}

/// One lot of physical stock: a product quantity sitting at a location
/// under a unique LPN.
///
/// `quantity` is the on-hand count and `reserved` the portion promised to
/// picks; `quantity - reserved` is what remains reservable. Records are
/// never deleted while quantity > 0; at zero they are archived and the
/// LPN is freed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub lpn: String,
    pub quantity: i32,
    pub reserved: i32,
    pub status: LotStatus,
    pub source: LotSource,
    pub archived: bool,
    /// Bumped on every mutation; per-record serializability marker.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn available(&self) -> i32 {
        self.quantity - self.reserved
    }
}

/// An outstanding reservation against a single record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub record_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// Aggregate stock position for one product across all open lots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSummary {
    pub product_id: Uuid,
    pub on_hand: i32,
    pub reserved: i32,
    pub available: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LotStatus::Available, LotStatus::QcHold => true)]
    #[test_case(LotStatus::Available, LotStatus::Damaged => true)]
    #[test_case(LotStatus::QcHold, LotStatus::Available => true)]
    #[test_case(LotStatus::QcHold, LotStatus::Damaged => true)]
    #[test_case(LotStatus::Damaged, LotStatus::Available => false; "damaged is terminal")]
    #[test_case(LotStatus::Damaged, LotStatus::QcHold => false)]
    #[test_case(LotStatus::Available, LotStatus::Reserved => false; "reserved belongs to reserve op")]
    #[test_case(LotStatus::Reserved, LotStatus::Available => false; "release owns the way back")]
    #[test_case(LotStatus::Available, LotStatus::Available => false; "no self transition")]
    fn manual_transition_table(from: LotStatus, to: LotStatus) -> bool {
        from.can_set_to(to)
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&LotStatus::QcHold).unwrap();
        assert_eq!(json, "\"QC_HOLD\"");
        assert_eq!(LotStatus::QcHold.to_string(), "QC_HOLD");
    }
}

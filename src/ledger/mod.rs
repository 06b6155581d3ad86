//! Inventory Ledger
//!
//! The authoritative store of physical stock. Every other component reads
//! and mutates stock only through the operations here.
//!
//! Concurrency model: each record is guarded by its map entry, so every
//! mutating operation is serializable per record; a version counter on the
//! record marks each mutation. Lock order is capacity guard -> lpn index ->
//! records, and a record guard is never held while acquiring another map.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entities::inventory_lot::{
    InventoryRecord, LotSource, LotStatus, Reservation, StockSummary,
};
use crate::errors::ServiceError;

/// Input for `create_lot`.
#[derive(Debug, Clone)]
pub struct NewLot {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub lpn: String,
    pub quantity: i32,
    pub status: LotStatus,
    pub source: LotSource,
}

/// Result of releasing stale reservations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResult {
    /// Number of reservations released back to available.
    pub released_count: u64,
    /// Reservations that were settled concurrently (skipped).
    pub skipped_count: u64,
    /// Timestamp when the sweep ran.
    pub cleaned_at: DateTime<Utc>,
}

pub struct InventoryLedger {
    records: DashMap<Uuid, InventoryRecord>,
    reservations: DashMap<Uuid, Reservation>,
    /// Open (non-archived) LPNs only; an archived lot frees its LPN.
    lpn_index: DashMap<String, Uuid>,
    /// Registered per-location unit capacity. The entry guard doubles as
    /// the per-location serializer for capacity checks.
    location_capacity: DashMap<Uuid, i32>,
    lpn_counter: AtomicU64,
}

impl Default for InventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            reservations: DashMap::new(),
            lpn_index: DashMap::new(),
            location_capacity: DashMap::new(),
            lpn_counter: AtomicU64::new(0),
        }
    }

    /// Registers a location's capacity. Called when the catalog creates
    /// the location; lots cannot land on unregistered locations.
    pub fn register_location(&self, location_id: Uuid, max_units: i32) {
        self.location_capacity.insert(location_id, max_units);
    }

    /// Produces the next globally unique lot identifier.
    ///
    /// A collision with an open lot means the counter was misconfigured;
    /// that is fatal, not retryable.
    pub fn next_lpn(&self) -> Result<String, ServiceError> {
        let n = self.lpn_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let lpn = format!("LPN-{:08}", n);
        if self.lpn_index.contains_key(&lpn) {
            error!(lpn = %lpn, "generated LPN collides with an open lot");
            return Err(ServiceError::InvariantViolation(format!(
                "generated LPN {} collides with an open lot",
                lpn
            )));
        }
        Ok(lpn)
    }

    pub fn create_lot(&self, new: NewLot) -> Result<InventoryRecord, ServiceError> {
        if new.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "lot quantity must be positive".to_string(),
            ));
        }
        if new.lpn.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "lpn must not be empty".to_string(),
            ));
        }

        // Holding the capacity entry serializes lot creation per location.
        let cap = self
            .location_capacity
            .get_mut(&new.location_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("location {} is not registered", new.location_id))
            })?;
        let occupied = self.location_occupancy(new.location_id);
        if occupied + new.quantity > *cap {
            return Err(ServiceError::CapacityExceeded(format!(
                "location {} holds {} of {} units; cannot add {}",
                new.location_id, occupied, *cap, new.quantity
            )));
        }

        let id = Uuid::new_v4();
        match self.lpn_index.entry(new.lpn.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(ServiceError::DuplicateLpn(new.lpn));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let now = Utc::now();
        let record = InventoryRecord {
            id,
            product_id: new.product_id,
            location_id: new.location_id,
            lpn: new.lpn,
            quantity: new.quantity,
            reserved: 0,
            status: new.status,
            source: new.source,
            archived: false,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.records.insert(id, record.clone());
        drop(cap);

        info!(
            record_id = %record.id,
            lpn = %record.lpn,
            quantity = record.quantity,
            status = %record.status,
            "created inventory lot"
        );
        Ok(record)
    }

    /// Decrements available quantity and increments reserved, atomically
    /// with respect to concurrent reservations on the same record.
    pub fn reserve(&self, record_id: Uuid, quantity: i32) -> Result<Reservation, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "reservation quantity must be positive".to_string(),
            ));
        }

        let reservation = {
            let mut rec = self
                .records
                .get_mut(&record_id)
                .ok_or_else(|| ServiceError::NotFound(format!("inventory record {}", record_id)))?;
            if rec.archived {
                return Err(ServiceError::Conflict(format!(
                    "lot {} is archived",
                    rec.lpn
                )));
            }
            if !matches!(rec.status, LotStatus::Available | LotStatus::Reserved) {
                return Err(ServiceError::Conflict(format!(
                    "lot {} is {} and cannot be reserved",
                    rec.lpn, rec.status
                )));
            }
            let available = rec.available();
            if quantity > available {
                return Err(ServiceError::InsufficientStock(format!(
                    "record {}: requested {}, available {}",
                    record_id, quantity, available
                )));
            }
            rec.reserved += quantity;
            rec.status = LotStatus::Reserved;
            rec.version += 1;
            rec.updated_at = Utc::now();
            Reservation {
                id: Uuid::new_v4(),
                record_id,
                quantity,
                created_at: rec.updated_at,
            }
        };

        self.reservations
            .insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    /// Finalizes a reservation in full: the reserved quantity leaves the
    /// record permanently.
    pub fn consume(&self, reservation_id: Uuid) -> Result<(), ServiceError> {
        let quantity = self
            .reservations
            .get(&reservation_id)
            .map(|r| r.quantity)
            .ok_or(ServiceError::InvalidToken(reservation_id))?;
        self.settle(reservation_id, quantity)
    }

    /// Finalizes a reservation for `consumed` units and releases the
    /// shortfall back to available, as one atomic step under the record
    /// guard. Used by pick confirmation, where under-picks are allowed.
    pub fn consume_partial(
        &self,
        reservation_id: Uuid,
        consumed: i32,
    ) -> Result<(), ServiceError> {
        if consumed < 0 {
            return Err(ServiceError::ValidationError(
                "consumed quantity must not be negative".to_string(),
            ));
        }
        let quantity = self
            .reservations
            .get(&reservation_id)
            .map(|r| r.quantity)
            .ok_or(ServiceError::InvalidToken(reservation_id))?;
        if consumed > quantity {
            return Err(ServiceError::ValidationError(format!(
                "cannot consume {} of a {}-unit reservation",
                consumed, quantity
            )));
        }
        self.settle(reservation_id, consumed)
    }

    /// Returns the reserved quantity to available.
    pub fn release(&self, reservation_id: Uuid) -> Result<(), ServiceError> {
        self.settle(reservation_id, 0)
    }

    /// Removes the token and applies its settlement to the record:
    /// `consumed` units leave the record, the remainder becomes available
    /// again. `consumed == 0` is a pure release.
    fn settle(&self, reservation_id: Uuid, consumed: i32) -> Result<(), ServiceError> {
        let (_, res) = self
            .reservations
            .remove(&reservation_id)
            .ok_or(ServiceError::InvalidToken(reservation_id))?;

        let retired_lpn = {
            let mut rec = self.records.get_mut(&res.record_id).ok_or_else(|| {
                error!(
                    reservation_id = %reservation_id,
                    record_id = %res.record_id,
                    "reservation referenced a missing record"
                );
                ServiceError::InvariantViolation(format!(
                    "reservation {} referenced missing record {}",
                    reservation_id, res.record_id
                ))
            })?;

            rec.reserved -= res.quantity;
            rec.quantity -= consumed;
            if rec.reserved < 0 || rec.quantity < 0 {
                error!(
                    record_id = %rec.id,
                    quantity = rec.quantity,
                    reserved = rec.reserved,
                    "inventory counters went negative"
                );
                return Err(ServiceError::InvariantViolation(format!(
                    "record {} counters went negative",
                    rec.id
                )));
            }
            if rec.reserved == 0 && rec.status == LotStatus::Reserved {
                rec.status = LotStatus::Available;
            }
            rec.version += 1;
            rec.updated_at = Utc::now();
            if rec.quantity == 0 && rec.reserved == 0 {
                rec.archived = true;
                Some(rec.lpn.clone())
            } else {
                None
            }
        };

        if let Some(lpn) = retired_lpn {
            self.lpn_index.remove(&lpn);
        }
        Ok(())
    }

    /// Applies a manual status change, enforcing the transition table.
    /// Transitions touching RESERVED belong to the reservation operations
    /// and are rejected here.
    pub fn set_status(
        &self,
        record_id: Uuid,
        new_status: LotStatus,
    ) -> Result<InventoryRecord, ServiceError> {
        let mut rec = self
            .records
            .get_mut(&record_id)
            .ok_or_else(|| ServiceError::NotFound(format!("inventory record {}", record_id)))?;
        if rec.archived {
            return Err(ServiceError::Conflict(format!(
                "lot {} is archived",
                rec.lpn
            )));
        }
        if rec.reserved > 0 {
            return Err(ServiceError::Conflict(format!(
                "lot {} has outstanding reservations",
                rec.lpn
            )));
        }
        if !rec.status.can_set_to(new_status) {
            return Err(ServiceError::InvalidStateTransition(format!(
                "lot {}: {} -> {}",
                rec.lpn, rec.status, new_status
            )));
        }
        let old = rec.status;
        rec.status = new_status;
        rec.version += 1;
        rec.updated_at = Utc::now();
        info!(record_id = %rec.id, lpn = %rec.lpn, from = %old, to = %new_status, "lot status changed");
        Ok(rec.clone())
    }

    /// Permanently removes a lot's stock (returns grading SCRAP path).
    /// Returns the written-off quantity.
    pub fn scrap(&self, record_id: Uuid) -> Result<i32, ServiceError> {
        let (written_off, lpn) = {
            let mut rec = self
                .records
                .get_mut(&record_id)
                .ok_or_else(|| ServiceError::NotFound(format!("inventory record {}", record_id)))?;
            if rec.archived {
                return Err(ServiceError::Conflict(format!(
                    "lot {} is archived",
                    rec.lpn
                )));
            }
            if rec.reserved > 0 {
                return Err(ServiceError::Conflict(format!(
                    "lot {} has outstanding reservations",
                    rec.lpn
                )));
            }
            let qty = rec.quantity;
            rec.quantity = 0;
            rec.archived = true;
            rec.version += 1;
            rec.updated_at = Utc::now();
            (qty, rec.lpn.clone())
        };

        self.lpn_index.remove(&lpn);
        warn!(record_id = %record_id, lpn = %lpn, quantity = written_off, "lot scrapped");
        Ok(written_off)
    }

    /// Releases reservations older than `ttl`, so abandoned waves cannot
    /// strand stock forever. Run periodically from a background task.
    pub fn sweep_stale_reservations(&self, ttl: Duration) -> CleanupResult {
        let cutoff = Utc::now() - ttl;
        let stale: Vec<Uuid> = self
            .reservations
            .iter()
            .filter(|r| r.created_at < cutoff)
            .map(|r| r.id)
            .collect();

        let mut released_count = 0u64;
        let mut skipped_count = 0u64;
        for id in stale {
            match self.release(id) {
                Ok(()) => released_count += 1,
                // Settled between the scan and the release.
                Err(ServiceError::InvalidToken(_)) => skipped_count += 1,
                Err(e) => {
                    warn!(reservation_id = %id, error = %e, "failed to release stale reservation")
                }
            }
        }

        if released_count > 0 {
            info!(released_count, "released stale reservations");
        }
        CleanupResult {
            released_count,
            skipped_count,
            cleaned_at: Utc::now(),
        }
    }

    pub fn get_record(&self, record_id: Uuid) -> Option<InventoryRecord> {
        self.records.get(&record_id).map(|r| r.clone())
    }

    pub fn get_reservation(&self, reservation_id: Uuid) -> Option<Reservation> {
        self.reservations.get(&reservation_id).map(|r| r.clone())
    }

    /// Lists records with pagination, newest first.
    pub fn list_records(
        &self,
        page: u64,
        limit: u64,
        product_id: Option<Uuid>,
        location_id: Option<Uuid>,
        status: Option<LotStatus>,
        include_archived: bool,
    ) -> Result<(Vec<InventoryRecord>, u64), ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page number must be greater than 0".to_string(),
            ));
        }
        if limit == 0 || limit > 1000 {
            return Err(ServiceError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let mut items: Vec<InventoryRecord> = self
            .records
            .iter()
            .filter(|r| include_archived || !r.archived)
            .filter(|r| product_id.map_or(true, |p| r.product_id == p))
            .filter(|r| location_id.map_or(true, |l| r.location_id == l))
            .filter(|r| status.map_or(true, |s| r.status == s))
            .map(|r| r.clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = items.len() as u64;
        let start = ((page - 1) * limit) as usize;
        let page_items = items.into_iter().skip(start).take(limit as usize).collect();
        Ok((page_items, total))
    }

    /// Aggregate stock position for a product across open lots.
    pub fn stock_summary(&self, product_id: Uuid) -> StockSummary {
        let mut on_hand = 0;
        let mut reserved = 0;
        for r in self.records.iter() {
            if r.product_id == product_id && !r.archived {
                on_hand += r.quantity;
                reserved += r.reserved;
            }
        }
        StockSummary {
            product_id,
            on_hand,
            reserved,
            available: on_hand - reserved,
        }
    }

    /// Units physically present at a location, derived from open lots.
    pub fn location_occupancy(&self, location_id: Uuid) -> i32 {
        self.records
            .iter()
            .filter(|r| r.location_id == location_id && !r.archived)
            .map(|r| r.quantity)
            .sum()
    }

    /// Open lots of a product with reservable stock, for wave planning.
    pub fn reservable_lots(&self, product_id: Uuid) -> Vec<InventoryRecord> {
        self.records
            .iter()
            .filter(|r| {
                r.product_id == product_id
                    && !r.archived
                    && matches!(r.status, LotStatus::Available | LotStatus::Reserved)
                    && r.available() > 0
            })
            .map(|r| r.clone())
            .collect()
    }

    /// Open lots created by the given source document (inbound order or
    /// RMA), for QC hold/release.
    pub fn lots_for_source(&self, reference_id: Uuid) -> Vec<InventoryRecord> {
        self.records
            .iter()
            .filter(|r| !r.archived && r.source.reference_id() == Some(reference_id))
            .map(|r| r.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ledger_with_location(capacity: i32) -> (InventoryLedger, Uuid) {
        let ledger = InventoryLedger::new();
        let location_id = Uuid::new_v4();
        ledger.register_location(location_id, capacity);
        (ledger, location_id)
    }

    fn seed_lot(ledger: &InventoryLedger, location_id: Uuid, quantity: i32) -> InventoryRecord {
        ledger
            .create_lot(NewLot {
                product_id: Uuid::new_v4(),
                location_id,
                lpn: ledger.next_lpn().unwrap(),
                quantity,
                status: LotStatus::Available,
                source: LotSource::Adjustment,
            })
            .unwrap()
    }

    #[test]
    fn reserve_then_release_restores_available() {
        let (ledger, loc) = ledger_with_location(1000);
        let rec = seed_lot(&ledger, loc, 50);

        let before = ledger.get_record(rec.id).unwrap().available();
        let res = ledger.reserve(rec.id, 30).unwrap();
        assert_eq!(ledger.get_record(rec.id).unwrap().available(), 20);
        assert_eq!(ledger.get_record(rec.id).unwrap().status, LotStatus::Reserved);

        ledger.release(res.id).unwrap();
        let after = ledger.get_record(rec.id).unwrap();
        assert_eq!(after.available(), before);
        assert_eq!(after.quantity, 50);
        assert_eq!(after.status, LotStatus::Available);
    }

    #[test]
    fn reserve_rejects_more_than_available() {
        let (ledger, loc) = ledger_with_location(1000);
        let rec = seed_lot(&ledger, loc, 40);

        ledger.reserve(rec.id, 30).unwrap();
        assert_matches!(
            ledger.reserve(rec.id, 11),
            Err(ServiceError::InsufficientStock(_))
        );
        // Exactly the remainder still works.
        ledger.reserve(rec.id, 10).unwrap();
    }

    #[test]
    fn consume_removes_stock_permanently() {
        let (ledger, loc) = ledger_with_location(1000);
        let rec = seed_lot(&ledger, loc, 50);

        let res = ledger.reserve(rec.id, 30).unwrap();
        ledger.consume(res.id).unwrap();

        let after = ledger.get_record(rec.id).unwrap();
        assert_eq!(after.quantity, 20);
        assert_eq!(after.reserved, 0);
        assert_eq!(after.status, LotStatus::Available);
    }

    #[test]
    fn consume_partial_releases_shortfall() {
        let (ledger, loc) = ledger_with_location(1000);
        let rec = seed_lot(&ledger, loc, 50);

        let res = ledger.reserve(rec.id, 30).unwrap();
        ledger.consume_partial(res.id, 25).unwrap();

        let after = ledger.get_record(rec.id).unwrap();
        assert_eq!(after.quantity, 25);
        assert_eq!(after.reserved, 0);
        assert_eq!(after.available(), 25);
    }

    #[test]
    fn token_cannot_settle_twice() {
        let (ledger, loc) = ledger_with_location(1000);
        let rec = seed_lot(&ledger, loc, 50);

        let res = ledger.reserve(rec.id, 10).unwrap();
        ledger.consume(res.id).unwrap();
        assert_matches!(ledger.consume(res.id), Err(ServiceError::InvalidToken(_)));
        assert_matches!(ledger.release(res.id), Err(ServiceError::InvalidToken(_)));
    }

    #[test]
    fn duplicate_lpn_is_rejected() {
        let (ledger, loc) = ledger_with_location(1000);
        let product_id = Uuid::new_v4();
        let new = |lpn: &str| NewLot {
            product_id,
            location_id: loc,
            lpn: lpn.to_string(),
            quantity: 5,
            status: LotStatus::Available,
            source: LotSource::Adjustment,
        };
        ledger.create_lot(new("LPN-A")).unwrap();
        assert_matches!(
            ledger.create_lot(new("LPN-A")),
            Err(ServiceError::DuplicateLpn(_))
        );
    }

    #[test]
    fn capacity_is_enforced_per_location() {
        let (ledger, loc) = ledger_with_location(80);
        seed_lot(&ledger, loc, 50);
        seed_lot(&ledger, loc, 30);
        let over = NewLot {
            product_id: Uuid::new_v4(),
            location_id: loc,
            lpn: "LPN-OVER".to_string(),
            quantity: 1,
            status: LotStatus::Available,
            source: LotSource::Adjustment,
        };
        assert_matches!(
            ledger.create_lot(over),
            Err(ServiceError::CapacityExceeded(_))
        );
    }

    #[test]
    fn consuming_to_zero_archives_and_frees_the_lpn() {
        let (ledger, loc) = ledger_with_location(1000);
        let rec = seed_lot(&ledger, loc, 10);
        let lpn = rec.lpn.clone();

        let res = ledger.reserve(rec.id, 10).unwrap();
        ledger.consume(res.id).unwrap();

        let after = ledger.get_record(rec.id).unwrap();
        assert!(after.archived);
        assert_eq!(after.quantity, 0);

        // The LPN is open again for a fresh receipt.
        let reused = ledger.create_lot(NewLot {
            product_id: Uuid::new_v4(),
            location_id: loc,
            lpn,
            quantity: 3,
            status: LotStatus::Available,
            source: LotSource::Adjustment,
        });
        assert!(reused.is_ok());
    }

    #[test]
    fn set_status_enforces_the_table() {
        let (ledger, loc) = ledger_with_location(1000);
        let rec = seed_lot(&ledger, loc, 10);

        let held = ledger.set_status(rec.id, LotStatus::QcHold).unwrap();
        assert_eq!(held.status, LotStatus::QcHold);
        let damaged = ledger.set_status(rec.id, LotStatus::Damaged).unwrap();
        assert_eq!(damaged.status, LotStatus::Damaged);
        assert_matches!(
            ledger.set_status(rec.id, LotStatus::Available),
            Err(ServiceError::InvalidStateTransition(_))
        );
    }

    #[test]
    fn set_status_refuses_lots_with_open_reservations() {
        let (ledger, loc) = ledger_with_location(1000);
        let rec = seed_lot(&ledger, loc, 10);
        let _res = ledger.reserve(rec.id, 4).unwrap();
        assert_matches!(
            ledger.set_status(rec.id, LotStatus::QcHold),
            Err(ServiceError::Conflict(_))
        );
    }

    #[test]
    fn scrap_writes_off_and_refuses_reserved_lots() {
        let (ledger, loc) = ledger_with_location(1000);
        let rec = seed_lot(&ledger, loc, 10);
        let res = ledger.reserve(rec.id, 4).unwrap();
        assert_matches!(ledger.scrap(rec.id), Err(ServiceError::Conflict(_)));
        ledger.release(res.id).unwrap();
        assert_eq!(ledger.scrap(rec.id).unwrap(), 10);
        assert!(ledger.get_record(rec.id).unwrap().archived);
    }

    #[test]
    fn sweep_releases_stale_reservations_only() {
        let (ledger, loc) = ledger_with_location(1000);
        let rec = seed_lot(&ledger, loc, 50);
        ledger.reserve(rec.id, 20).unwrap();

        // Nothing is older than an hour yet.
        let result = ledger.sweep_stale_reservations(Duration::hours(1));
        assert_eq!(result.released_count, 0);
        assert_eq!(ledger.get_record(rec.id).unwrap().reserved, 20);

        // With a zero TTL every open reservation is stale.
        let result = ledger.sweep_stale_reservations(Duration::zero());
        assert_eq!(result.released_count, 1);
        assert_eq!(ledger.get_record(rec.id).unwrap().reserved, 0);
        assert_eq!(ledger.get_record(rec.id).unwrap().available(), 50);
    }

    #[test]
    fn stock_summary_tracks_the_sum_invariant() {
        let (ledger, loc) = ledger_with_location(1000);
        let product_id = Uuid::new_v4();
        let mut first = None;
        for qty in [10, 15] {
            let rec = ledger
                .create_lot(NewLot {
                    product_id,
                    location_id: loc,
                    lpn: ledger.next_lpn().unwrap(),
                    quantity: qty,
                    status: LotStatus::Available,
                    source: LotSource::Adjustment,
                })
                .unwrap();
            first.get_or_insert(rec.id);
        }
        ledger.reserve(first.unwrap(), 6).unwrap();

        let summary = ledger.stock_summary(product_id);
        assert_eq!(summary.on_hand, 25);
        assert_eq!(summary.reserved, 6);
        assert_eq!(summary.available, 19);
        assert_eq!(summary.reserved + summary.available, summary.on_hand);
    }

    #[test]
    fn generated_lpns_are_unique() {
        let ledger = InventoryLedger::new();
        let a = ledger.next_lpn().unwrap();
        let b = ledger.next_lpn().unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("LPN-"));
    }
}

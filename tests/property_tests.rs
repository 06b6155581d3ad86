//! Property-based tests for the inventory ledger.
//!
//! These tests use proptest to verify the ledger's counter invariants
//! across a wide range of operation sequences, helping to catch edge
//! cases that unit tests might miss.

use proptest::prelude::*;
use uuid::Uuid;

use warehouse_api::entities::inventory_lot::{LotSource, LotStatus};
use warehouse_api::ledger::{InventoryLedger, NewLot};

/// One step a picker or scheduler might take against a lot.
#[derive(Debug, Clone)]
enum LedgerOp {
    Reserve(i32),
    ReleaseOldest,
    ConsumeOldest(i32),
}

fn op_strategy() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (1i32..60).prop_map(LedgerOp::Reserve),
        Just(LedgerOp::ReleaseOldest),
        (0i32..60).prop_map(LedgerOp::ConsumeOldest),
    ]
}

fn seeded_ledger(quantity: i32) -> (InventoryLedger, Uuid) {
    let ledger = InventoryLedger::new();
    let location_id = Uuid::new_v4();
    ledger.register_location(location_id, i32::MAX);
    let record = ledger
        .create_lot(NewLot {
            product_id: Uuid::new_v4(),
            location_id,
            lpn: ledger.next_lpn().expect("lpn"),
            quantity,
            status: LotStatus::Available,
            source: LotSource::Adjustment,
        })
        .expect("seed lot");
    (ledger, record.id)
}

// Property: whatever sequence of reserve / release / consume a lot sees,
// its counters stay consistent: reserved + available == quantity, and
// nothing ever goes negative.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn counters_stay_consistent_under_any_op_sequence(
        initial in 1i32..500,
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let (ledger, record_id) = seeded_ledger(initial);
        let mut open_reservations: Vec<(Uuid, i32)> = Vec::new();

        for op in ops {
            match op {
                LedgerOp::Reserve(qty) => {
                    let available = ledger.get_record(record_id).unwrap().available();
                    match ledger.reserve(record_id, qty) {
                        Ok(res) => {
                            prop_assert!(qty <= available,
                                "reserve of {} succeeded with only {} available", qty, available);
                            open_reservations.push((res.id, res.quantity));
                        }
                        Err(_) => {
                            prop_assert!(qty > available,
                                "reserve of {} failed with {} available", qty, available);
                        }
                    }
                }
                LedgerOp::ReleaseOldest => {
                    if !open_reservations.is_empty() {
                        let (id, _) = open_reservations.remove(0);
                        ledger.release(id).expect("release open reservation");
                    }
                }
                LedgerOp::ConsumeOldest(picked) => {
                    if !open_reservations.is_empty() {
                        let (id, reserved) = open_reservations.remove(0);
                        ledger
                            .consume_partial(id, picked.min(reserved))
                            .expect("consume open reservation");
                    }
                }
            }

            let record = ledger.get_record(record_id).unwrap();
            prop_assert!(record.quantity >= 0);
            prop_assert!(record.reserved >= 0);
            prop_assert_eq!(record.reserved + record.available(), record.quantity);
            let open_total: i32 = open_reservations.iter().map(|(_, q)| q).sum();
            prop_assert_eq!(record.reserved, open_total,
                "record.reserved diverged from the open reservations");
        }
    }
}

// Property: reserve followed immediately by release restores the
// available quantity exactly.
proptest! {
    #[test]
    fn reserve_release_round_trips(initial in 1i32..500, qty in 1i32..500) {
        let (ledger, record_id) = seeded_ledger(initial);
        let before = ledger.get_record(record_id).unwrap();

        if let Ok(res) = ledger.reserve(record_id, qty) {
            ledger.release(res.id).expect("release");
        }

        let after = ledger.get_record(record_id).unwrap();
        prop_assert_eq!(after.quantity, before.quantity);
        prop_assert_eq!(after.available(), before.available());
        prop_assert_eq!(after.reserved, 0);
    }
}

// Property: a full consume removes exactly the reserved quantity, no
// more, no less.
proptest! {
    #[test]
    fn consume_removes_exactly_the_reservation(initial in 1i32..500, qty in 1i32..500) {
        prop_assume!(qty <= initial);
        let (ledger, record_id) = seeded_ledger(initial);

        let res = ledger.reserve(record_id, qty).expect("reserve within stock");
        ledger.consume(res.id).expect("consume");

        let after = ledger.get_record(record_id).unwrap();
        prop_assert_eq!(after.quantity, initial - qty);
        prop_assert_eq!(after.reserved, 0);
        prop_assert_eq!(after.archived, after.quantity == 0);
    }
}

// Property: generated LPNs never repeat while lots are open.
proptest! {
    #[test]
    fn generated_lpns_never_collide(count in 1usize..200) {
        let ledger = InventoryLedger::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..count {
            let lpn = ledger.next_lpn().expect("lpn");
            prop_assert!(seen.insert(lpn.clone()), "duplicate lpn {}", lpn);
        }
    }
}

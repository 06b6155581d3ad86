mod common;

use warehouse_api::errors::ServiceError;

use common::{create_location, create_product, receive_stock, spawn_app};

// Two simultaneous reservations of 30 against 40 available: exactly one
// may win, the other must see InsufficientStock.
#[tokio::test]
async fn concurrent_reserves_never_oversell_a_lot() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-CONC").await;
    let location = create_location(&state, "A-01-01", 1).await;
    let record_id = receive_stock(&state, product.id, location.id, 40).await;

    let mut handles = vec![];
    for _ in 0..2 {
        let svc = state.inventory_service.clone();
        handles.push(tokio::spawn(
            async move { svc.reserve(record_id, 30).await },
        ));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => successes += 1,
            Err(ServiceError::InsufficientStock(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);

    let record = state.inventory_service.get_record(record_id).await.unwrap();
    assert_eq!(record.reserved, 30);
    assert_eq!(record.available(), 10);
}

// 20 operators grabbing one unit each from a 10-unit lot: exactly 10
// reservations succeed.
#[tokio::test]
async fn concurrent_unit_reserves_drain_to_exactly_zero() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-DRAIN").await;
    let location = create_location(&state, "A-01-02", 1).await;
    let record_id = receive_stock(&state, product.id, location.id, 10).await;

    let mut tasks = vec![];
    for _ in 0..20 {
        let svc = state.inventory_service.clone();
        tasks.push(tokio::spawn(async move {
            svc.reserve(record_id, 1).await.is_ok()
        }));
    }
    let mut success = 0;
    for t in tasks {
        if t.await.unwrap_or(false) {
            success += 1;
        }
    }
    assert_eq!(
        success, 10,
        "exactly 10 reservations should succeed; got {}",
        success
    );

    let record = state.inventory_service.get_record(record_id).await.unwrap();
    assert_eq!(record.available(), 0);
    assert_eq!(record.reserved, 10);
    assert_eq!(record.quantity, 10);
}

// Interleaved reserve/release pairs keep the counters consistent: once
// everything settles the record is exactly where it started.
#[tokio::test]
async fn reserve_release_storm_round_trips() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-STORM").await;
    let location = create_location(&state, "A-01-03", 1).await;
    let record_id = receive_stock(&state, product.id, location.id, 50).await;

    let mut tasks = vec![];
    for _ in 0..25 {
        let svc = state.inventory_service.clone();
        tasks.push(tokio::spawn(async move {
            if let Ok(reservation) = svc.reserve(record_id, 3).await {
                svc.release(reservation.id).await.expect("release");
            }
        }));
    }
    for t in tasks {
        t.await.expect("task panicked");
    }

    let record = state.inventory_service.get_record(record_id).await.unwrap();
    assert_eq!(record.quantity, 50);
    assert_eq!(record.reserved, 0);
    assert_eq!(record.available(), 50);
}

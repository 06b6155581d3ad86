mod common;

use assert_matches::assert_matches;
use warehouse_api::entities::inventory_lot::LotStatus;
use warehouse_api::entities::outbound_order::OutboundOrderStatus;
use warehouse_api::entities::shipment::ShipmentStatus;
use warehouse_api::errors::ServiceError;

use common::{create_location, create_order, create_product, receive_stock, spawn_app};

// The full forward path: receive 50, wave 30, pick, pack, dispatch.
// Stock and statuses must match at every checkpoint and dispatch must
// cause no further stock mutation.
#[tokio::test]
async fn receive_pick_pack_dispatch_flow() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-X").await;
    let location = create_location(&state, "A-01-01", 1).await;

    // Receive 50: one AVAILABLE record of 50.
    let record_id = receive_stock(&state, product.id, location.id, 50).await;
    let record = state.inventory_service.get_record(record_id).await.unwrap();
    assert_eq!(record.quantity, 50);
    assert_eq!(record.status, LotStatus::Available);
    let stock = state.inventory_service.stock_summary(product.id).await.unwrap();
    assert_eq!(stock.on_hand, 50);
    assert_eq!(stock.available, 50);

    // Wave for 30: one task, available drops to 20, reserved rises to 30.
    let order = create_order(&state, product.id, 30).await;
    let wave = state
        .picking_service
        .create_wave(vec![order.id])
        .await
        .expect("create wave");
    assert_eq!(wave.task_ids.len(), 1);
    let record = state.inventory_service.get_record(record_id).await.unwrap();
    assert_eq!(record.available(), 20);
    assert_eq!(record.reserved, 30);

    // Confirm 30: reserved drops to 0, quantity becomes 20.
    state
        .picking_service
        .confirm_pick_task(wave.task_ids[0], 30)
        .await
        .expect("confirm pick");
    let record = state.inventory_service.get_record(record_id).await.unwrap();
    assert_eq!(record.reserved, 0);
    assert_eq!(record.quantity, 20);
    assert_eq!(
        state.order_service.get_order(order.id).await.unwrap().status,
        OutboundOrderStatus::Picked
    );

    // Pack all 30 into one carton.
    let shipment = state
        .packing_service
        .start_packing(order.id)
        .await
        .expect("start packing");
    assert_eq!(shipment.status, ShipmentStatus::Packing);
    let parcel = state
        .packing_service
        .create_parcel(shipment.id, "CARTON-M".to_string())
        .await
        .expect("create parcel");
    state
        .packing_service
        .add_item_to_parcel(parcel.id, product.id, 30)
        .await
        .expect("pack items");
    let closed = state
        .packing_service
        .close_shipment(shipment.id)
        .await
        .expect("close shipment");
    assert_eq!(closed.status, ShipmentStatus::Packed);
    assert!(closed.tracking_number.is_some(), "label generated on close");
    // Carton tare 250g + 30 x 500g.
    assert_eq!(closed.total_weight_grams, 250 + 30 * 500);
    assert_eq!(
        state.order_service.get_order(order.id).await.unwrap().status,
        OutboundOrderStatus::Packed
    );

    // Dispatch on a load; order reaches SHIPPED.
    let carrier = state
        .catalog_service
        .create_carrier("Speedy".to_string(), None, None)
        .await
        .unwrap();
    let load = state
        .shipping_service
        .create_load(carrier.id, Default::default())
        .await
        .expect("create load");
    state
        .shipping_service
        .assign_shipment_to_load(load.id, shipment.id)
        .await
        .expect("assign");
    let manifest = state
        .shipping_service
        .dispatch_load(load.id)
        .await
        .expect("dispatch");
    assert_eq!(manifest.lines.len(), 1);
    assert_eq!(manifest.lines[0].parcel_count, 1);

    let order = state.order_service.get_order(order.id).await.unwrap();
    assert_eq!(order.status, OutboundOrderStatus::Shipped);
    assert_eq!(order.items[0].quantity_shipped, 30);
    assert_eq!(
        state
            .packing_service
            .get_shipment(shipment.id)
            .await
            .unwrap()
            .status,
        ShipmentStatus::Shipped
    );

    // No further stock mutation after dispatch.
    let stock = state.inventory_service.stock_summary(product.id).await.unwrap();
    assert_eq!(stock.on_hand, 20);
    assert_eq!(stock.reserved, 0);
    assert_eq!(stock.available, 20);
}

#[tokio::test]
async fn packing_guards_the_order_and_quantities() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-PACK").await;
    let location = create_location(&state, "A-02-01", 1).await;
    receive_stock(&state, product.id, location.id, 50).await;
    let order = create_order(&state, product.id, 30).await;

    // PLANNED orders cannot start packing.
    assert_matches!(
        state.packing_service.start_packing(order.id).await,
        Err(ServiceError::OrderNotPicked(id)) if id == order.id
    );

    let wave = state
        .picking_service
        .create_wave(vec![order.id])
        .await
        .unwrap();
    state
        .picking_service
        .confirm_pick_task(wave.task_ids[0], 30)
        .await
        .unwrap();

    let shipment = state.packing_service.start_packing(order.id).await.unwrap();

    // A second station cannot start the same order again.
    assert_matches!(
        state.packing_service.start_packing(order.id).await,
        Err(ServiceError::Conflict(_))
    );

    // Closing with no packed items is rejected.
    assert_matches!(
        state.packing_service.close_shipment(shipment.id).await,
        Err(ServiceError::EmptyShipment(id)) if id == shipment.id
    );

    let parcel = state
        .packing_service
        .create_parcel(shipment.id, "CARTON-S".to_string())
        .await
        .unwrap();

    // Packing more than was picked is a quantity mismatch, across
    // parcels cumulatively.
    assert_matches!(
        state
            .packing_service
            .add_item_to_parcel(parcel.id, product.id, 31)
            .await,
        Err(ServiceError::QuantityMismatch(_))
    );
    state
        .packing_service
        .add_item_to_parcel(parcel.id, product.id, 20)
        .await
        .unwrap();
    let second = state
        .packing_service
        .create_parcel(shipment.id, "CARTON-S".to_string())
        .await
        .unwrap();
    assert_matches!(
        state
            .packing_service
            .add_item_to_parcel(second.id, product.id, 11)
            .await,
        Err(ServiceError::QuantityMismatch(_))
    );
    state
        .packing_service
        .add_item_to_parcel(second.id, product.id, 10)
        .await
        .unwrap();

    let closed = state
        .packing_service
        .close_shipment(shipment.id)
        .await
        .unwrap();
    assert_eq!(closed.status, ShipmentStatus::Packed);

    // A closed shipment accepts no more parcels.
    assert_matches!(
        state
            .packing_service
            .create_parcel(shipment.id, "CARTON-S".to_string())
            .await,
        Err(ServiceError::Conflict(_))
    );
}

#[tokio::test]
async fn dispatch_guards_the_load_and_shipment_states() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-LOAD").await;
    let location = create_location(&state, "A-03-01", 1).await;
    receive_stock(&state, product.id, location.id, 50).await;
    let order = create_order(&state, product.id, 10).await;
    let wave = state
        .picking_service
        .create_wave(vec![order.id])
        .await
        .unwrap();
    state
        .picking_service
        .confirm_pick_task(wave.task_ids[0], 10)
        .await
        .unwrap();
    let shipment = state.packing_service.start_packing(order.id).await.unwrap();

    let carrier = state
        .catalog_service
        .create_carrier("Speedy".to_string(), None, None)
        .await
        .unwrap();
    let load = state
        .shipping_service
        .create_load(carrier.id, Default::default())
        .await
        .unwrap();

    // A PACKING shipment cannot ride a load.
    assert_matches!(
        state
            .shipping_service
            .assign_shipment_to_load(load.id, shipment.id)
            .await,
        Err(ServiceError::ShipmentNotPacked(id)) if id == shipment.id
    );

    // An empty load cannot dispatch.
    assert_matches!(
        state.shipping_service.dispatch_load(load.id).await,
        Err(ServiceError::EmptyLoad(id)) if id == load.id
    );

    let parcel = state
        .packing_service
        .create_parcel(shipment.id, "CARTON-S".to_string())
        .await
        .unwrap();
    state
        .packing_service
        .add_item_to_parcel(parcel.id, product.id, 10)
        .await
        .unwrap();
    state
        .packing_service
        .close_shipment(shipment.id)
        .await
        .unwrap();

    state
        .shipping_service
        .assign_shipment_to_load(load.id, shipment.id)
        .await
        .unwrap();

    // One load per shipment.
    let second_load = state
        .shipping_service
        .create_load(carrier.id, Default::default())
        .await
        .unwrap();
    assert_matches!(
        state
            .shipping_service
            .assign_shipment_to_load(second_load.id, shipment.id)
            .await,
        Err(ServiceError::Conflict(_))
    );

    let manifest = state.shipping_service.dispatch_load(load.id).await.unwrap();

    // A dispatched load is frozen: no new shipments, no second dispatch,
    // and the manifest stays as generated.
    assert_matches!(
        state.shipping_service.dispatch_load(load.id).await,
        Err(ServiceError::Conflict(_))
    );
    let fetched = state
        .shipping_service
        .get_manifest(manifest.id)
        .await
        .unwrap();
    assert_eq!(fetched.generated_at, manifest.generated_at);
    assert_eq!(fetched.lines.len(), manifest.lines.len());
}

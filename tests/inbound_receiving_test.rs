mod common;

use assert_matches::assert_matches;
use uuid::Uuid;
use warehouse_api::config::AppConfig;
use warehouse_api::entities::inbound_order::InboundOrderStatus;
use warehouse_api::entities::inventory_lot::LotStatus;
use warehouse_api::errors::ServiceError;
use warehouse_api::services::inbound::{NewInboundItem, NewInboundOrder, ReceiveItemCommand};

use common::{create_location, create_product, spawn_app, spawn_app_with_config};

fn receive_command(
    order_item_id: Uuid,
    location_id: Uuid,
    lpn: String,
    quantity: i32,
) -> ReceiveItemCommand {
    ReceiveItemCommand {
        order_item_id,
        location_id,
        lpn,
        quantity,
        operator_id: Uuid::new_v4(),
        damage_code: None,
    }
}

// Item-by-item receipt drives the order PENDING -> PARTIALLY_RECEIVED ->
// RECEIVED, and each receipt lands as its own AVAILABLE lot.
#[tokio::test]
async fn receipts_complete_the_order_item_by_item() {
    let state = spawn_app();
    let product_a = create_product(&state, "SKU-IN-A").await;
    let product_b = create_product(&state, "SKU-IN-B").await;
    let location = create_location(&state, "R-01-01", 1).await;

    let order = state
        .inbound_service
        .create_inbound_order(NewInboundOrder {
            order_reference: None,
            supplier: "Acme Supply".to_string(),
            expected_arrival: None,
            items: vec![
                NewInboundItem {
                    product_id: product_a.id,
                    quantity_expected: 30,
                },
                NewInboundItem {
                    product_id: product_b.id,
                    quantity_expected: 10,
                },
            ],
        })
        .await
        .expect("create inbound order");
    assert_eq!(order.status, InboundOrderStatus::Pending);
    assert!(order.order_reference.starts_with("ASN-"));

    let lpn = state.inbound_service.generate_lpn().await.unwrap();
    let record = state
        .inbound_service
        .receive_item(receive_command(order.items[0].id, location.id, lpn, 30))
        .await
        .expect("receive first item");
    assert_eq!(record.status, LotStatus::Available);
    assert_eq!(record.quantity, 30);

    let order_after = state
        .inbound_service
        .get_inbound_order(order.id)
        .await
        .unwrap();
    assert_eq!(order_after.status, InboundOrderStatus::PartiallyReceived);
    assert_eq!(order_after.items[0].quantity_received, 30);

    let lpn = state.inbound_service.generate_lpn().await.unwrap();
    state
        .inbound_service
        .receive_item(receive_command(order.items[1].id, location.id, lpn, 10))
        .await
        .expect("receive second item");
    let order_after = state
        .inbound_service
        .get_inbound_order(order.id)
        .await
        .unwrap();
    assert_eq!(order_after.status, InboundOrderStatus::Received);
}

// Default tolerance is zero: exactly the expected quantity works, one
// unit more is rejected and leaves no lot behind.
#[tokio::test]
async fn over_receipt_is_rejected_at_zero_tolerance() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-OVR").await;
    let location = create_location(&state, "R-02-01", 1).await;
    let order = state
        .inbound_service
        .create_inbound_order(NewInboundOrder {
            order_reference: None,
            supplier: "Acme Supply".to_string(),
            expected_arrival: None,
            items: vec![NewInboundItem {
                product_id: product.id,
                quantity_expected: 20,
            }],
        })
        .await
        .unwrap();
    let item_id = order.items[0].id;

    let lpn = state.inbound_service.generate_lpn().await.unwrap();
    assert_matches!(
        state
            .inbound_service
            .receive_item(receive_command(item_id, location.id, lpn.clone(), 21))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    let stock = state
        .inventory_service
        .stock_summary(product.id)
        .await
        .unwrap();
    assert_eq!(stock.on_hand, 0);

    state
        .inbound_service
        .receive_item(receive_command(item_id, location.id, lpn, 20))
        .await
        .expect("exact quantity is fine");

    // The item is complete; nothing more fits.
    let lpn = state.inbound_service.generate_lpn().await.unwrap();
    assert_matches!(
        state
            .inbound_service
            .receive_item(receive_command(item_id, location.id, lpn, 1))
            .await,
        Err(ServiceError::ValidationError(_))
    );
}

// A 10% tolerance on 20 expected admits 22 units, not 23.
#[tokio::test]
async fn over_receipt_tolerance_is_a_fraction_of_expected() {
    let state = spawn_app_with_config(AppConfig {
        over_receipt_tolerance: 0.1,
        ..AppConfig::default()
    });
    let product = create_product(&state, "SKU-TOL").await;
    let location = create_location(&state, "R-03-01", 1).await;
    let order = state
        .inbound_service
        .create_inbound_order(NewInboundOrder {
            order_reference: None,
            supplier: "Acme Supply".to_string(),
            expected_arrival: None,
            items: vec![NewInboundItem {
                product_id: product.id,
                quantity_expected: 20,
            }],
        })
        .await
        .unwrap();
    let item_id = order.items[0].id;

    let lpn = state.inbound_service.generate_lpn().await.unwrap();
    assert_matches!(
        state
            .inbound_service
            .receive_item(receive_command(item_id, location.id, lpn.clone(), 23))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    let record = state
        .inbound_service
        .receive_item(receive_command(item_id, location.id, lpn, 22))
        .await
        .expect("within tolerance");
    assert_eq!(record.quantity, 22);
}

// A damage code sends the receipt straight to DAMAGED; the stock never
// becomes reservable.
#[tokio::test]
async fn damaged_receipts_never_enter_circulation() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-DMG").await;
    let location = create_location(&state, "R-04-01", 1).await;
    let order = state
        .inbound_service
        .create_inbound_order(NewInboundOrder {
            order_reference: None,
            supplier: "Acme Supply".to_string(),
            expected_arrival: None,
            items: vec![NewInboundItem {
                product_id: product.id,
                quantity_expected: 5,
            }],
        })
        .await
        .unwrap();

    let record = state
        .inbound_service
        .receive_item(ReceiveItemCommand {
            order_item_id: order.items[0].id,
            location_id: location.id,
            lpn: state.inbound_service.generate_lpn().await.unwrap(),
            quantity: 5,
            operator_id: Uuid::new_v4(),
            damage_code: Some("CRUSHED".to_string()),
        })
        .await
        .expect("receive damaged");
    assert_eq!(record.status, LotStatus::Damaged);

    assert_matches!(
        state.inventory_service.reserve(record.id, 1).await,
        Err(ServiceError::Conflict(_))
    );
}

// An LPN already open in the ledger cannot be received again; the order
// item's received count stays untouched.
#[tokio::test]
async fn duplicate_lpn_rejects_the_receipt() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-DUP").await;
    let location = create_location(&state, "R-05-01", 1).await;
    let order = state
        .inbound_service
        .create_inbound_order(NewInboundOrder {
            order_reference: None,
            supplier: "Acme Supply".to_string(),
            expected_arrival: None,
            items: vec![NewInboundItem {
                product_id: product.id,
                quantity_expected: 10,
            }],
        })
        .await
        .unwrap();
    let item_id = order.items[0].id;

    let lpn = state.inbound_service.generate_lpn().await.unwrap();
    state
        .inbound_service
        .receive_item(receive_command(item_id, location.id, lpn.clone(), 4))
        .await
        .unwrap();
    assert_matches!(
        state
            .inbound_service
            .receive_item(receive_command(item_id, location.id, lpn, 4))
            .await,
        Err(ServiceError::DuplicateLpn(_))
    );

    let order = state
        .inbound_service
        .get_inbound_order(order.id)
        .await
        .unwrap();
    assert_eq!(order.items[0].quantity_received, 4);
}

// Receiving onto a full location surfaces the ledger's capacity error.
#[tokio::test]
async fn receipt_respects_location_capacity() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-CAP").await;
    let location = common::create_location_with_capacity(&state, "R-06-01", 1, 15).await;
    let order = state
        .inbound_service
        .create_inbound_order(NewInboundOrder {
            order_reference: None,
            supplier: "Acme Supply".to_string(),
            expected_arrival: None,
            items: vec![NewInboundItem {
                product_id: product.id,
                quantity_expected: 20,
            }],
        })
        .await
        .unwrap();

    let lpn = state.inbound_service.generate_lpn().await.unwrap();
    assert_matches!(
        state
            .inbound_service
            .receive_item(receive_command(order.items[0].id, location.id, lpn, 16))
            .await,
        Err(ServiceError::CapacityExceeded(_))
    );
}

#![allow(dead_code)]

use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use uuid::Uuid;

use warehouse_api::config::AppConfig;
use warehouse_api::entities::location::Location;
use warehouse_api::entities::outbound_order::{OrderPriority, OutboundOrder};
use warehouse_api::entities::product::Product;
use warehouse_api::events::EventSender;
use warehouse_api::services::catalog::{NewLocation, NewProduct};
use warehouse_api::services::inbound::{NewInboundItem, NewInboundOrder, ReceiveItemCommand};
use warehouse_api::services::orders::{NewOrderItem, NewOutboundOrder};
use warehouse_api::AppState;

/// Builds a full service graph over a fresh in-memory store, with the
/// event stream drained in the background.
pub fn spawn_app() -> AppState {
    spawn_app_with_config(AppConfig::default())
}

pub fn spawn_app_with_config(config: AppConfig) -> AppState {
    let (tx, mut rx) = mpsc::channel(1024);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    AppState::new(config, EventSender::new(tx))
}

pub async fn create_product(state: &AppState, sku: &str) -> Product {
    state
        .catalog_service
        .create_product(NewProduct {
            sku: sku.to_string(),
            name: format!("Product {}", sku),
            description: None,
            category: None,
            barcode: None,
            unit_price: dec!(9.99),
            unit_weight_grams: 500,
        })
        .await
        .expect("create product")
}

/// Creates a location under its own zone and a 10k-unit location type.
pub async fn create_location(state: &AppState, code: &str, pick_sequence: i32) -> Location {
    create_location_with_capacity(state, code, pick_sequence, 10_000).await
}

pub async fn create_location_with_capacity(
    state: &AppState,
    code: &str,
    pick_sequence: i32,
    max_units: i32,
) -> Location {
    let zone = state
        .catalog_service
        .create_zone(format!("Zone {}", code), false, false)
        .await
        .expect("create zone");
    let location_type = state
        .catalog_service
        .create_location_type(format!("Type {}", code), max_units)
        .await
        .expect("create location type");
    state
        .catalog_service
        .create_location(NewLocation {
            code: code.to_string(),
            barcode: None,
            zone_id: zone.id,
            location_type_id: location_type.id,
            pick_sequence,
        })
        .await
        .expect("create location")
}

/// Receives `quantity` units of the product through a one-line inbound
/// order and returns the created record id.
pub async fn receive_stock(
    state: &AppState,
    product_id: Uuid,
    location_id: Uuid,
    quantity: i32,
) -> Uuid {
    let order = state
        .inbound_service
        .create_inbound_order(NewInboundOrder {
            order_reference: None,
            supplier: "Test Supplier".to_string(),
            expected_arrival: None,
            items: vec![NewInboundItem {
                product_id,
                quantity_expected: quantity,
            }],
        })
        .await
        .expect("create inbound order");
    let record = state
        .inbound_service
        .receive_item(ReceiveItemCommand {
            order_item_id: order.items[0].id,
            location_id,
            lpn: state
                .inbound_service
                .generate_lpn()
                .await
                .expect("generate lpn"),
            quantity,
            operator_id: Uuid::new_v4(),
            damage_code: None,
        })
        .await
        .expect("receive item");
    record.id
}

pub async fn create_order(
    state: &AppState,
    product_id: Uuid,
    quantity: i32,
) -> OutboundOrder {
    state
        .order_service
        .create_order(NewOutboundOrder {
            reference_number: None,
            customer_name: Some("Test Customer".to_string()),
            destination: Some("12 Dock Road".to_string()),
            priority: OrderPriority::Standard,
            items: vec![NewOrderItem {
                product_id,
                quantity,
            }],
        })
        .await
        .expect("create outbound order")
}

/// Drives one order through the whole forward path (wave, pick, pack,
/// load, dispatch) and returns its id.
pub async fn ship_order(state: &AppState, product_id: Uuid, quantity: i32) -> Uuid {
    let order = create_order(state, product_id, quantity).await;
    let wave = state
        .picking_service
        .create_wave(vec![order.id])
        .await
        .expect("create wave");
    for task_id in &wave.task_ids {
        let task = state.picking_service.get_task(*task_id).await.unwrap();
        state
            .picking_service
            .confirm_pick_task(*task_id, task.quantity_to_pick)
            .await
            .expect("confirm pick");
    }

    let shipment = state
        .packing_service
        .start_packing(order.id)
        .await
        .expect("start packing");
    let parcel = state
        .packing_service
        .create_parcel(shipment.id, "CARTON-M".to_string())
        .await
        .expect("create parcel");
    state
        .packing_service
        .add_item_to_parcel(parcel.id, product_id, quantity)
        .await
        .expect("pack items");
    state
        .packing_service
        .close_shipment(shipment.id)
        .await
        .expect("close shipment");

    let carrier = state
        .catalog_service
        .create_carrier("Test Carrier".to_string(), None, None)
        .await
        .expect("create carrier");
    let load = state
        .shipping_service
        .create_load(carrier.id, Default::default())
        .await
        .expect("create load");
    state
        .shipping_service
        .assign_shipment_to_load(load.id, shipment.id)
        .await
        .expect("assign shipment");
    state
        .shipping_service
        .dispatch_load(load.id)
        .await
        .expect("dispatch load");
    order.id
}

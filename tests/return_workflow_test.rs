mod common;

use assert_matches::assert_matches;
use warehouse_api::config::AppConfig;
use warehouse_api::entities::inventory_lot::LotStatus;
use warehouse_api::entities::qc::{InspectionResult, InspectionSource};
use warehouse_api::entities::rma::{ReturnGrade, RmaStatus};
use warehouse_api::errors::ServiceError;

use common::{
    create_location, create_order, create_product, receive_stock, ship_order, spawn_app,
    spawn_app_with_config,
};

// Full reverse flow: RMA for a shipped order, receipt into QC hold at
// the staging location, per-line grading, close.
#[tokio::test]
async fn rma_receive_grade_close_flow() {
    let state = spawn_app();
    let grade_a = create_product(&state, "SKU-RET-A").await;
    let grade_c = create_product(&state, "SKU-RET-C").await;
    let scrap = create_product(&state, "SKU-RET-S").await;
    let pick_face = create_location(&state, "A-01-01", 1).await;
    let staging = create_location(&state, "RET-STAGE", 99).await;
    for product in [&grade_a, &grade_c, &scrap] {
        receive_stock(&state, product.id, pick_face.id, 20).await;
    }

    let order_a = ship_order(&state, grade_a.id, 5).await;
    let order_c = ship_order(&state, grade_c.id, 4).await;
    let order_s = ship_order(&state, scrap.id, 3).await;

    // Grade A: the lot re-enters stock at the staging location.
    let rma = state
        .returns_service
        .create_rma(order_a, "damaged box".to_string(), None)
        .await
        .expect("create rma");
    assert_eq!(rma.status, RmaStatus::Pending);
    let rma = state
        .returns_service
        .receive_return(rma.id, "TRKRETURN0001".to_string())
        .await
        .expect("receive return");
    assert_eq!(rma.status, RmaStatus::Received);
    let lot_id = rma.items[0].lot_id.expect("lot created on receipt");
    let lot = state.inventory_service.get_record(lot_id).await.unwrap();
    assert_eq!(lot.status, LotStatus::QcHold);
    assert_eq!(lot.location_id, staging.id);
    assert_eq!(lot.quantity, 5);

    let item = state
        .returns_service
        .grade_item(rma.id, grade_a.id, ReturnGrade::GradeA, None)
        .await
        .expect("grade");
    assert_eq!(item.grade, Some(ReturnGrade::GradeA));
    let lot = state.inventory_service.get_record(lot_id).await.unwrap();
    assert_eq!(lot.status, LotStatus::Available);
    let rma = state.returns_service.get_rma(rma.id).await.unwrap();
    assert_eq!(rma.status, RmaStatus::Graded);
    let rma = state.returns_service.close_rma(rma.id).await.unwrap();
    assert_eq!(rma.status, RmaStatus::Closed);

    // Grade C: the lot goes to DAMAGED and stays there.
    let rma = state
        .returns_service
        .create_rma(order_c, "wrong size".to_string(), None)
        .await
        .unwrap();
    let rma = state
        .returns_service
        .receive_return(rma.id, "TRKRETURN0002".to_string())
        .await
        .unwrap();
    state
        .returns_service
        .grade_item(rma.id, grade_c.id, ReturnGrade::GradeC, Some("scuffed".into()))
        .await
        .unwrap();
    let lot = state
        .inventory_service
        .get_record(rma.items[0].lot_id.unwrap())
        .await
        .unwrap();
    assert_eq!(lot.status, LotStatus::Damaged);

    // Scrap: the stock is written off and the lot archived.
    let rma = state
        .returns_service
        .create_rma(order_s, "destroyed in transit".to_string(), None)
        .await
        .unwrap();
    let rma = state
        .returns_service
        .receive_return(rma.id, "TRKRETURN0003".to_string())
        .await
        .unwrap();
    state
        .returns_service
        .grade_item(rma.id, scrap.id, ReturnGrade::Scrap, None)
        .await
        .unwrap();
    let lot_id = rma.items[0].lot_id.unwrap();
    let record = state.store.ledger.get_record(lot_id).unwrap();
    assert!(record.archived);
    assert_eq!(record.quantity, 0);
}

#[tokio::test]
async fn rma_guards_order_status_and_lifecycle() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-RET-G").await;
    let location = create_location(&state, "A-02-01", 1).await;
    create_location(&state, "RET-STAGE", 99).await;
    receive_stock(&state, product.id, location.id, 20).await;

    // Undelivered demand cannot be returned.
    let order = create_order(&state, product.id, 5).await;
    assert_matches!(
        state
            .returns_service
            .create_rma(order.id, "changed my mind".to_string(), None)
            .await,
        Err(ServiceError::Conflict(_))
    );

    let shipped = ship_order(&state, product.id, 5).await;
    let rma = state
        .returns_service
        .create_rma(shipped, "changed my mind".to_string(), None)
        .await
        .unwrap();

    // Grading before receipt, double receipt, and early close all fail.
    assert_matches!(
        state
            .returns_service
            .grade_item(rma.id, product.id, ReturnGrade::GradeA, None)
            .await,
        Err(ServiceError::Conflict(_))
    );
    assert_matches!(
        state.returns_service.close_rma(rma.id).await,
        Err(ServiceError::Conflict(_))
    );
    state
        .returns_service
        .receive_return(rma.id, "TRKRETURN0004".to_string())
        .await
        .unwrap();
    assert_matches!(
        state
            .returns_service
            .receive_return(rma.id, "TRKRETURN0004".to_string())
            .await,
        Err(ServiceError::Conflict(_))
    );
}

// QC-gated receiving: lots land in QC_HOLD, an INBOUND inspection PASS
// releases them.
#[tokio::test]
async fn inbound_inspection_releases_qc_hold() {
    let state = spawn_app_with_config(AppConfig {
        qc_hold_on_receipt: true,
        ..AppConfig::default()
    });
    let product = create_product(&state, "SKU-QC").await;
    let location = create_location(&state, "A-03-01", 1).await;
    let record_id = receive_stock(&state, product.id, location.id, 25).await;

    let record = state.inventory_service.get_record(record_id).await.unwrap();
    assert_eq!(record.status, LotStatus::QcHold);
    let order_id = match record.source {
        warehouse_api::entities::inventory_lot::LotSource::Inbound { order_id } => order_id,
        other => panic!("unexpected source {:?}", other),
    };

    let inspection = state
        .qc_service
        .create_inspection(product.id, InspectionSource::Inbound, order_id, 5)
        .await
        .expect("create inspection");
    assert_eq!(inspection.result, InspectionResult::Pending);

    let inspection = state
        .qc_service
        .execute_inspection(inspection.id, InspectionResult::Passed, uuid::Uuid::new_v4())
        .await
        .expect("execute inspection");
    assert_eq!(inspection.result, InspectionResult::Passed);

    let record = state.inventory_service.get_record(record_id).await.unwrap();
    assert_eq!(record.status, LotStatus::Available);
}

#[tokio::test]
async fn failed_inspection_holds_stock_and_produces_one_ncr() {
    let state = spawn_app_with_config(AppConfig {
        qc_hold_on_receipt: true,
        ..AppConfig::default()
    });
    let product = create_product(&state, "SKU-NCR").await;
    let location = create_location(&state, "A-04-01", 1).await;
    let record_id = receive_stock(&state, product.id, location.id, 10).await;
    let order_id = match state
        .inventory_service
        .get_record(record_id)
        .await
        .unwrap()
        .source
    {
        warehouse_api::entities::inventory_lot::LotSource::Inbound { order_id } => order_id,
        other => panic!("unexpected source {:?}", other),
    };

    let inspection = state
        .qc_service
        .create_inspection(product.id, InspectionSource::Inbound, order_id, 3)
        .await
        .unwrap();

    // No NCR before the verdict.
    assert_matches!(
        state
            .qc_service
            .create_ncr(inspection.id, "cosmetic".to_string(), "scratches".to_string())
            .await,
        Err(ServiceError::InspectionNotFailed(_))
    );

    state
        .qc_service
        .execute_inspection(inspection.id, InspectionResult::Failed, uuid::Uuid::new_v4())
        .await
        .unwrap();

    // Stock stays held pending the NCR.
    let record = state.inventory_service.get_record(record_id).await.unwrap();
    assert_eq!(record.status, LotStatus::QcHold);

    let ncr = state
        .qc_service
        .create_ncr(inspection.id, "cosmetic".to_string(), "scratches".to_string())
        .await
        .expect("create ncr");
    assert!(ncr.ncr_number.starts_with("NCR-"));

    // At most one NCR per inspection.
    assert_matches!(
        state
            .qc_service
            .create_ncr(inspection.id, "cosmetic".to_string(), "more".to_string())
            .await,
        Err(ServiceError::Conflict(_))
    );

    let closed = state.qc_service.close_ncr(ncr.id).await.unwrap();
    assert!(closed.closed_at.is_some());
}

// An INVENTORY inspection pulls the referenced lot out of circulation
// immediately.
#[tokio::test]
async fn inventory_inspection_holds_the_lot() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-SPOT").await;
    let location = create_location(&state, "A-05-01", 1).await;
    let record_id = receive_stock(&state, product.id, location.id, 12).await;

    let inspection = state
        .qc_service
        .create_inspection(product.id, InspectionSource::Inventory, record_id, 2)
        .await
        .unwrap();
    let record = state.inventory_service.get_record(record_id).await.unwrap();
    assert_eq!(record.status, LotStatus::QcHold);

    // While held, the lot cannot be reserved.
    assert_matches!(
        state.inventory_service.reserve(record_id, 1).await,
        Err(ServiceError::Conflict(_))
    );

    state
        .qc_service
        .execute_inspection(inspection.id, InspectionResult::Passed, uuid::Uuid::new_v4())
        .await
        .unwrap();
    let record = state.inventory_service.get_record(record_id).await.unwrap();
    assert_eq!(record.status, LotStatus::Available);
}

#[tokio::test]
async fn inspection_references_are_validated() {
    let state = spawn_app();
    let product = create_product(&state, "SKU-REF").await;

    assert_matches!(
        state
            .qc_service
            .create_inspection(
                product.id,
                InspectionSource::Inbound,
                uuid::Uuid::new_v4(),
                1
            )
            .await,
        Err(ServiceError::InvalidReference(_))
    );
    assert_matches!(
        state
            .qc_service
            .create_inspection(
                product.id,
                InspectionSource::Return,
                uuid::Uuid::new_v4(),
                1
            )
            .await,
        Err(ServiceError::InvalidReference(_))
    );
}

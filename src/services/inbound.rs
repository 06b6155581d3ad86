//! Inbound receiving: advance notices and item-by-item receipt into the
//! ledger.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::inbound_order::{InboundOrder, InboundOrderItem, InboundOrderStatus};
use crate::entities::inventory_lot::{InventoryRecord, LotSource, LotStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::ledger::NewLot;
use crate::services::catalog::validate_page;
use crate::store::WarehouseStore;

#[derive(Debug, Clone)]
pub struct NewInboundItem {
    pub product_id: Uuid,
    pub quantity_expected: i32,
}

#[derive(Debug, Clone)]
pub struct NewInboundOrder {
    pub order_reference: Option<String>,
    pub supplier: String,
    pub expected_arrival: Option<DateTime<Utc>>,
    pub items: Vec<NewInboundItem>,
}

#[derive(Debug, Clone)]
pub struct ReceiveItemCommand {
    pub order_item_id: Uuid,
    pub location_id: Uuid,
    pub lpn: String,
    pub quantity: i32,
    pub operator_id: Uuid,
    pub damage_code: Option<String>,
}

/// Service for inbound receiving
#[derive(Clone)]
pub struct InboundService {
    store: Arc<WarehouseStore>,
    event_sender: EventSender,
    config: AppConfig,
}

impl InboundService {
    pub fn new(store: Arc<WarehouseStore>, event_sender: EventSender, config: AppConfig) -> Self {
        Self {
            store,
            event_sender,
            config,
        }
    }

    #[instrument(skip(self, new))]
    pub async fn create_inbound_order(
        &self,
        new: NewInboundOrder,
    ) -> Result<InboundOrder, ServiceError> {
        if new.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "inbound order requires at least one item".to_string(),
            ));
        }
        for item in &new.items {
            if item.quantity_expected < 1 {
                return Err(ServiceError::ValidationError(
                    "expected quantity must be at least 1".to_string(),
                ));
            }
            if !self.store.products.contains_key(&item.product_id) {
                return Err(ServiceError::NotFound(format!(
                    "product {}",
                    item.product_id
                )));
            }
        }

        let now = Utc::now();
        let order = InboundOrder {
            id: Uuid::new_v4(),
            order_reference: new
                .order_reference
                .unwrap_or_else(|| self.store.next_inbound_reference()),
            supplier: new.supplier,
            expected_arrival: new.expected_arrival,
            status: InboundOrderStatus::Pending,
            items: new
                .items
                .into_iter()
                .map(|i| InboundOrderItem {
                    id: Uuid::new_v4(),
                    product_id: i.product_id,
                    quantity_expected: i.quantity_expected,
                    quantity_received: 0,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        };
        for item in &order.items {
            self.store.inbound_item_index.insert(item.id, order.id);
        }
        self.store.inbound_orders.insert(order.id, order.clone());

        self.event_sender
            .send(Event::InboundOrderCreated(order.id))
            .await
            .map_err(ServiceError::EventError)?;
        info!(order_id = %order.id, reference = %order.order_reference, "created inbound order");
        Ok(order)
    }

    /// Receives a quantity against an expected item, creating the ledger
    /// lot. Damaged receipts go straight to DAMAGED; otherwise lots start
    /// AVAILABLE, or QC_HOLD when receiving is QC-gated.
    #[instrument(skip(self))]
    pub async fn receive_item(
        &self,
        command: ReceiveItemCommand,
    ) -> Result<InventoryRecord, ServiceError> {
        if command.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "received quantity must be at least 1".to_string(),
            ));
        }

        let order_id = self
            .store
            .inbound_item_index
            .get(&command.order_item_id)
            .map(|e| *e)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("inbound order item {}", command.order_item_id))
            })?;

        let lot_status = if command.damage_code.is_some() {
            LotStatus::Damaged
        } else if self.config.qc_hold_on_receipt {
            LotStatus::QcHold
        } else {
            LotStatus::Available
        };

        let (record, order_received) = {
            let mut order = self.store.inbound_orders.get_mut(&order_id).ok_or_else(|| {
                ServiceError::InvariantViolation(format!(
                    "inbound item {} indexed to missing order {}",
                    command.order_item_id, order_id
                ))
            })?;

            let item = order
                .items
                .iter()
                .find(|i| i.id == command.order_item_id)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("inbound order item {}", command.order_item_id))
                })?;

            let expected = item.quantity_expected;
            let allowed =
                expected + (expected as f64 * self.config.over_receipt_tolerance).floor() as i32;
            if item.quantity_received + command.quantity > allowed {
                return Err(ServiceError::ValidationError(format!(
                    "receiving {} would exceed the allowed {} (expected {}, already received {})",
                    command.quantity, allowed, expected, item.quantity_received
                )));
            }
            let product_id = item.product_id;

            let record = self.store.ledger.create_lot(NewLot {
                product_id,
                location_id: command.location_id,
                lpn: command.lpn.clone(),
                quantity: command.quantity,
                status: lot_status,
                source: LotSource::Inbound { order_id },
            })?;

            // The lot exists; record the receipt on the order.
            let item = order
                .items
                .iter_mut()
                .find(|i| i.id == command.order_item_id)
                .expect("item present above");
            item.quantity_received += command.quantity;

            let all_complete = order.items.iter().all(|i| i.is_complete());
            let was_received = order.status == InboundOrderStatus::Received;
            order.status = if all_complete {
                InboundOrderStatus::Received
            } else {
                InboundOrderStatus::PartiallyReceived
            };
            order.updated_at = Utc::now();
            (record, all_complete && !was_received)
        };

        self.event_sender
            .send(Event::ItemReceived {
                order_id,
                order_item_id: command.order_item_id,
                record_id: record.id,
                quantity: command.quantity,
                operator_id: command.operator_id,
            })
            .await
            .map_err(ServiceError::EventError)?;
        if order_received {
            self.event_sender
                .send(Event::InboundOrderReceived(order_id))
                .await
                .map_err(ServiceError::EventError)?;
            info!(order_id = %order_id, "inbound order fully received");
        }

        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn generate_lpn(&self) -> Result<String, ServiceError> {
        self.store.ledger.next_lpn()
    }

    #[instrument(skip(self))]
    pub async fn get_inbound_order(&self, order_id: Uuid) -> Result<InboundOrder, ServiceError> {
        self.store
            .inbound_orders
            .get(&order_id)
            .map(|o| o.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("inbound order {}", order_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_inbound_orders(
        &self,
        page: u64,
        limit: u64,
        status: Option<InboundOrderStatus>,
    ) -> Result<(Vec<InboundOrder>, u64), ServiceError> {
        validate_page(page, limit)?;
        let mut items: Vec<InboundOrder> = self
            .store
            .inbound_orders
            .iter()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .map(|o| o.clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        let total = items.len() as u64;
        let start = ((page - 1) * limit) as usize;
        Ok((
            items.into_iter().skip(start).take(limit as usize).collect(),
            total,
        ))
    }
}

//! Outbound orders: the customer demand the forward path fulfils.
//!
//! Orders are created PLANNED and are driven through PICKED, PACKED and
//! SHIPPED by the picking, packing and shipping managers; this service
//! only owns creation and queries.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::outbound_order::{
    OrderPriority, OutboundOrder, OutboundOrderItem, OutboundOrderStatus,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::catalog::validate_page;
use crate::store::WarehouseStore;

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct NewOutboundOrder {
    pub reference_number: Option<String>,
    pub customer_name: Option<String>,
    pub destination: Option<String>,
    pub priority: OrderPriority,
    pub items: Vec<NewOrderItem>,
}

/// Service for outbound orders
#[derive(Clone)]
pub struct OrderService {
    store: Arc<WarehouseStore>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(store: Arc<WarehouseStore>, event_sender: EventSender) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    #[instrument(skip(self, new))]
    pub async fn create_order(
        &self,
        new: NewOutboundOrder,
    ) -> Result<OutboundOrder, ServiceError> {
        if new.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "outbound order requires at least one item".to_string(),
            ));
        }

        let mut items = Vec::with_capacity(new.items.len());
        let mut total_amount = Decimal::ZERO;
        for line in &new.items {
            if line.quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "ordered quantity must be at least 1".to_string(),
                ));
            }
            let product = self
                .store
                .products
                .get(&line.product_id)
                .map(|p| p.clone())
                .ok_or_else(|| ServiceError::NotFound(format!("product {}", line.product_id)))?;
            if !product.active {
                return Err(ServiceError::ValidationError(format!(
                    "product {} is inactive",
                    product.sku
                )));
            }
            let item = OutboundOrderItem {
                id: Uuid::new_v4(),
                product_id: line.product_id,
                quantity_ordered: line.quantity,
                quantity_picked: 0,
                quantity_shipped: 0,
                unit_price: product.unit_price,
            };
            total_amount += item.line_total();
            items.push(item);
        }

        let now = Utc::now();
        let order = OutboundOrder {
            id: Uuid::new_v4(),
            reference_number: new
                .reference_number
                .unwrap_or_else(|| self.store.next_order_reference()),
            customer_name: new.customer_name,
            destination: new.destination,
            priority: new.priority,
            status: OutboundOrderStatus::Planned,
            items,
            total_amount,
            created_at: now,
            updated_at: now,
        };
        self.store.outbound_orders.insert(order.id, order.clone());

        self.event_sender
            .send(Event::OutboundOrderCreated(order.id))
            .await
            .map_err(ServiceError::EventError)?;
        info!(order_id = %order.id, reference = %order.reference_number, "created outbound order");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OutboundOrder, ServiceError> {
        self.store
            .outbound_orders
            .get(&order_id)
            .map(|o| o.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("outbound order {}", order_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        limit: u64,
        status: Option<OutboundOrderStatus>,
    ) -> Result<(Vec<OutboundOrder>, u64), ServiceError> {
        validate_page(page, limit)?;
        let mut items: Vec<OutboundOrder> = self
            .store
            .outbound_orders
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

//! Packing stations: turn picked orders into closed, shippable parcels.
//!
//! A shipment entry guard scopes every mutation, so stations working the
//! same shipment cannot interleave; cross-shipment work needs no
//! coordination.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::outbound_order::OutboundOrderStatus;
use crate::entities::shipment::{Parcel, ParcelItem, Shipment, ShipmentStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::catalog::validate_page;
use crate::services::shipping::ShippingService;
use crate::store::WarehouseStore;

/// Service for packing stations
#[derive(Clone)]
pub struct PackingService {
    store: Arc<WarehouseStore>,
    event_sender: EventSender,
    config: AppConfig,
    shipping: ShippingService,
}

impl PackingService {
    pub fn new(
        store: Arc<WarehouseStore>,
        event_sender: EventSender,
        config: AppConfig,
        shipping: ShippingService,
    ) -> Self {
        Self {
            store,
            event_sender,
            config,
            shipping,
        }
    }

    /// Opens a shipment for a picked order. The order-to-shipment index
    /// entry arbitrates concurrent starts for the same order.
    #[instrument(skip(self))]
    pub async fn start_packing(&self, outbound_order_id: Uuid) -> Result<Shipment, ServiceError> {
        let order_status = self
            .store
            .outbound_orders
            .get(&outbound_order_id)
            .map(|o| o.status)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("outbound order {}", outbound_order_id))
            })?;
        if order_status != OutboundOrderStatus::Picked {
            return Err(ServiceError::OrderNotPicked(outbound_order_id));
        }

        let shipment_id = Uuid::new_v4();
        match self.store.shipment_by_order.entry(outbound_order_id) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                return Err(ServiceError::Conflict(format!(
                    "order {} is already being packed as shipment {}",
                    outbound_order_id,
                    existing.get()
                )));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(shipment_id);
            }
        }

        let now = Utc::now();
        let shipment = Shipment {
            id: shipment_id,
            outbound_order_id,
            status: ShipmentStatus::Packing,
            carrier_id: None,
            tracking_number: None,
            parcel_ids: Vec::new(),
            total_weight_grams: 0,
            load_id: None,
            created_at: now,
            updated_at: now,
            packed_at: None,
            shipped_at: None,
        };
        self.store.shipments.insert(shipment_id, shipment.clone());

        self.event_sender
            .send(Event::PackingStarted {
                order_id: outbound_order_id,
                shipment_id,
            })
            .await
            .map_err(ServiceError::EventError)?;
        info!(order_id = %outbound_order_id, shipment_id = %shipment_id, "packing started");
        Ok(shipment)
    }

    #[instrument(skip(self))]
    pub async fn create_parcel(
        &self,
        shipment_id: Uuid,
        packing_material_id: String,
    ) -> Result<Parcel, ServiceError> {
        let material = self
            .config
            .packing_material(&packing_material_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "unknown packing material {}",
                    packing_material_id
                ))
            })?;

        let parcel = {
            let mut shipment = self
                .store
                .shipments
                .get_mut(&shipment_id)
                .ok_or_else(|| ServiceError::NotFound(format!("shipment {}", shipment_id)))?;
            if shipment.status != ShipmentStatus::Packing {
                return Err(ServiceError::Conflict(format!(
                    "shipment {} is {} and no longer accepts parcels",
                    shipment_id, shipment.status
                )));
            }

            let parcel = Parcel {
                id: Uuid::new_v4(),
                shipment_id,
                packing_material_id: material.id,
                tare_weight_grams: material.tare_weight_grams,
                items: Vec::new(),
                weight_grams: material.tare_weight_grams,
                created_at: Utc::now(),
            };
            shipment.parcel_ids.push(parcel.id);
            shipment.updated_at = parcel.created_at;
            self.store.parcels.insert(parcel.id, parcel.clone());
            parcel
        };

        self.event_sender
            .send(Event::ParcelCreated {
                shipment_id,
                parcel_id: parcel.id,
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(parcel)
    }

    /// Packs units into a parcel. The cumulative packed quantity for a
    /// product across the shipment's parcels may never exceed what was
    /// picked for the order.
    #[instrument(skip(self))]
    pub async fn add_item_to_parcel(
        &self,
        parcel_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Parcel, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "packed quantity must be at least 1".to_string(),
            ));
        }
        let shipment_id = self
            .store
            .parcels
            .get(&parcel_id)
            .map(|p| p.shipment_id)
            .ok_or_else(|| ServiceError::NotFound(format!("parcel {}", parcel_id)))?;
        let unit_weight = self
            .store
            .products
            .get(&product_id)
            .map(|p| p.unit_weight_grams)
            .ok_or_else(|| ServiceError::NotFound(format!("product {}", product_id)))?;

        // The shipment guard serializes packs and the close for this
        // shipment.
        let shipment = self
            .store
            .shipments
            .get_mut(&shipment_id)
            .ok_or_else(|| ServiceError::NotFound(format!("shipment {}", shipment_id)))?;
        if shipment.status != ShipmentStatus::Packing {
            return Err(ServiceError::Conflict(format!(
                "shipment {} is {} and no longer accepts items",
                shipment_id, shipment.status
            )));
        }

        let picked = self
            .store
            .outbound_orders
            .get(&shipment.outbound_order_id)
            .and_then(|o| {
                o.items
                    .iter()
                    .find(|i| i.product_id == product_id)
                    .map(|i| i.quantity_picked)
            })
            .unwrap_or(0);
        let already_packed: i32 = shipment
            .parcel_ids
            .iter()
            .filter_map(|id| self.store.parcels.get(id))
            .flat_map(|p| {
                p.items
                    .iter()
                    .filter(|i| i.product_id == product_id)
                    .map(|i| i.quantity)
                    .collect::<Vec<_>>()
            })
            .sum();
        if already_packed + quantity > picked {
            return Err(ServiceError::QuantityMismatch(format!(
                "product {}: packing {} on top of {} would exceed the picked {}",
                product_id, quantity, already_packed, picked
            )));
        }

        let mut parcel = self.store.parcels.get_mut(&parcel_id).ok_or_else(|| {
            ServiceError::InvariantViolation(format!(
                "shipment {} lost parcel {}",
                shipment_id, parcel_id
            ))
        })?;
        match parcel.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => item.quantity += quantity,
            None => parcel.items.push(ParcelItem {
                product_id,
                quantity,
            }),
        }
        parcel.weight_grams += unit_weight * i64::from(quantity);
        Ok(parcel.clone())
    }

    /// Closes the shipment: totals are computed, the shipment becomes
    /// PACKED, the order becomes PACKED, and label generation is handed
    /// to the shipping dispatcher.
    #[instrument(skip(self))]
    pub async fn close_shipment(&self, shipment_id: Uuid) -> Result<Shipment, ServiceError> {
        let (order_id, parcel_count) = {
            let mut shipment = self
                .store
                .shipments
                .get_mut(&shipment_id)
                .ok_or_else(|| ServiceError::NotFound(format!("shipment {}", shipment_id)))?;
            if shipment.status != ShipmentStatus::Packing {
                return Err(ServiceError::Conflict(format!(
                    "shipment {} is {} and cannot be closed",
                    shipment_id, shipment.status
                )));
            }

            let parcels: Vec<Parcel> = shipment
                .parcel_ids
                .iter()
                .filter_map(|id| self.store.parcels.get(id).map(|p| p.clone()))
                .collect();
            if !parcels.iter().any(|p| !p.items.is_empty()) {
                return Err(ServiceError::EmptyShipment(shipment_id));
            }

            let now = Utc::now();
            shipment.total_weight_grams = parcels.iter().map(|p| p.weight_grams).sum();
            shipment.status = ShipmentStatus::Packed;
            shipment.packed_at = Some(now);
            shipment.updated_at = now;

            let mut order = self
                .store
                .outbound_orders
                .get_mut(&shipment.outbound_order_id)
                .ok_or_else(|| {
                    ServiceError::InvariantViolation(format!(
                        "shipment {} references missing order {}",
                        shipment_id, shipment.outbound_order_id
                    ))
                })?;
            order.status = OutboundOrderStatus::Packed;
            order.updated_at = now;
            (shipment.outbound_order_id, parcels.len())
        };

        self.shipping.generate_label(shipment_id).await?;

        self.event_sender
            .send(Event::ShipmentClosed {
                shipment_id,
                parcel_count,
            })
            .await
            .map_err(ServiceError::EventError)?;
        info!(shipment_id = %shipment_id, order_id = %order_id, "shipment closed");

        self.get_shipment(shipment_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_shipment(&self, shipment_id: Uuid) -> Result<Shipment, ServiceError> {
        self.store
            .shipments
            .get(&shipment_id)
            .map(|s| s.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("shipment {}", shipment_id)))
    }

    #[instrument(skip(self))]
    pub async fn get_parcel(&self, parcel_id: Uuid) -> Result<Parcel, ServiceError> {
        self.store
            .parcels
            .get(&parcel_id)
            .map(|p| p.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("parcel {}", parcel_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_shipments(
        &self,
        page: u64,
        limit: u64,
        status: Option<ShipmentStatus>,
    ) -> Result<(Vec<Shipment>, u64), ServiceError> {
        validate_page(page, limit)?;
        let mut items: Vec<Shipment> = self
            .store
            .shipments
            .iter()
            .filter(|s| status.map_or(true, |st| s.status == st))
            .map(|s| s.clone())
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

//! Shipping dispatcher: carrier assignment, transport loads, and the
//! dispatch that freezes a manifest.
//!
//! Lock order within this module follows the store hierarchy: a load
//! entry is held while its shipments are visited, and shipment entries
//! while parcels and orders are read.

use chrono::Utc;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::outbound_order::OutboundOrderStatus;
use crate::entities::shipment::{Shipment, ShipmentStatus};
use crate::entities::transport_load::{
    LoadStatus, Manifest, ManifestLine, TransportLoad, VehicleInfo,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::catalog::validate_page;
use crate::store::WarehouseStore;

/// Service for shipping dispatch
#[derive(Clone)]
pub struct ShippingService {
    store: Arc<WarehouseStore>,
    event_sender: EventSender,
}

impl ShippingService {
    pub fn new(store: Arc<WarehouseStore>, event_sender: EventSender) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    fn generate_tracking_number() -> String {
        let suffix: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(|c| (c as char).to_ascii_uppercase())
            .collect();
        format!("TRK{}", suffix)
    }

    /// Attaches carrier and tracking number to the order's shipment,
    /// generating a tracking number when none is given.
    #[instrument(skip(self))]
    pub async fn create_shipment_record(
        &self,
        outbound_order_id: Uuid,
        carrier_id: Uuid,
        tracking_number: Option<String>,
    ) -> Result<Shipment, ServiceError> {
        if !self.store.carriers.contains_key(&carrier_id) {
            return Err(ServiceError::NotFound(format!("carrier {}", carrier_id)));
        }
        let shipment_id = self
            .store
            .shipment_by_order
            .get(&outbound_order_id)
            .map(|e| *e)
            .ok_or_else(|| {
                ServiceError::Conflict(format!(
                    "order {} has no shipment; packing has not started",
                    outbound_order_id
                ))
            })?;

        let shipment = {
            let mut shipment = self.store.shipments.get_mut(&shipment_id).ok_or_else(|| {
                ServiceError::InvariantViolation(format!(
                    "order {} indexed to missing shipment {}",
                    outbound_order_id, shipment_id
                ))
            })?;
            shipment.carrier_id = Some(carrier_id);
            shipment.tracking_number = Some(
                tracking_number.unwrap_or_else(Self::generate_tracking_number),
            );
            shipment.updated_at = Utc::now();
            shipment.clone()
        };

        self.event_sender
            .send(Event::ShipmentRecordCreated {
                shipment_id,
                carrier_id,
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(shipment)
    }

    /// Assigns a tracking number if the shipment has none yet and emits
    /// the label event. Called by the packing manager when a shipment
    /// closes.
    #[instrument(skip(self))]
    pub async fn generate_label(&self, shipment_id: Uuid) -> Result<String, ServiceError> {
        let tracking_number = {
            let mut shipment = self
                .store
                .shipments
                .get_mut(&shipment_id)
                .ok_or_else(|| ServiceError::NotFound(format!("shipment {}", shipment_id)))?;
            match &shipment.tracking_number {
                Some(t) => t.clone(),
                None => {
                    let t = Self::generate_tracking_number();
                    shipment.tracking_number = Some(t.clone());
                    shipment.updated_at = Utc::now();
                    t
                }
            }
        };

        self.event_sender
            .send(Event::ShippingLabelGenerated {
                shipment_id,
                tracking_number: tracking_number.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(tracking_number)
    }

    #[instrument(skip(self))]
    pub async fn create_load(
        &self,
        carrier_id: Uuid,
        vehicle: VehicleInfo,
    ) -> Result<TransportLoad, ServiceError> {
        if !self.store.carriers.contains_key(&carrier_id) {
            return Err(ServiceError::NotFound(format!("carrier {}", carrier_id)));
        }
        let load = TransportLoad {
            id: Uuid::new_v4(),
            load_number: self.store.next_load_number(),
            carrier_id,
            vehicle,
            status: LoadStatus::Open,
            shipment_ids: Vec::new(),
            manifest_id: None,
            created_at: Utc::now(),
            dispatched_at: None,
        };
        self.store.loads.insert(load.id, load.clone());

        self.event_sender
            .send(Event::LoadCreated(load.id))
            .await
            .map_err(ServiceError::EventError)?;
        info!(load_id = %load.id, load_number = %load.load_number, "created transport load");
        Ok(load)
    }

    /// Puts a packed shipment on an open load. A shipment rides at most
    /// one load.
    #[instrument(skip(self))]
    pub async fn assign_shipment_to_load(
        &self,
        load_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<(), ServiceError> {
        {
            let mut load = self
                .store
                .loads
                .get_mut(&load_id)
                .ok_or_else(|| ServiceError::NotFound(format!("transport load {}", load_id)))?;
            if load.status != LoadStatus::Open {
                return Err(ServiceError::Conflict(format!(
                    "load {} is already dispatched",
                    load.load_number
                )));
            }

            let mut shipment = self
                .store
                .shipments
                .get_mut(&shipment_id)
                .ok_or_else(|| ServiceError::NotFound(format!("shipment {}", shipment_id)))?;
            if shipment.status != ShipmentStatus::Packed {
                return Err(ServiceError::ShipmentNotPacked(shipment_id));
            }
            if shipment.load_id.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "shipment {} is already assigned to a load",
                    shipment_id
                )));
            }
            shipment.load_id = Some(load_id);
            shipment.updated_at = Utc::now();
            load.shipment_ids.push(shipment_id);
        }

        self.event_sender
            .send(Event::ShipmentAssignedToLoad {
                load_id,
                shipment_id,
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(())
    }

    /// Dispatches a load: every assigned shipment and its order become
    /// SHIPPED, shipped quantities are stamped from the packed parcels,
    /// and the manifest snapshot is frozen.
    #[instrument(skip(self))]
    pub async fn dispatch_load(&self, load_id: Uuid) -> Result<Manifest, ServiceError> {
        let (manifest, shipped_orders) = {
            let mut load = self
                .store
                .loads
                .get_mut(&load_id)
                .ok_or_else(|| ServiceError::NotFound(format!("transport load {}", load_id)))?;
            if load.status != LoadStatus::Open {
                return Err(ServiceError::Conflict(format!(
                    "load {} is already dispatched",
                    load.load_number
                )));
            }
            if load.shipment_ids.is_empty() {
                return Err(ServiceError::EmptyLoad(load_id));
            }

            let now = Utc::now();
            let mut lines = Vec::with_capacity(load.shipment_ids.len());
            let mut shipped_orders = Vec::with_capacity(load.shipment_ids.len());
            for shipment_id in &load.shipment_ids {
                let mut shipment =
                    self.store.shipments.get_mut(shipment_id).ok_or_else(|| {
                        ServiceError::InvariantViolation(format!(
                            "load {} references missing shipment {}",
                            load_id, shipment_id
                        ))
                    })?;
                if shipment.status != ShipmentStatus::Packed {
                    return Err(ServiceError::InvariantViolation(format!(
                        "shipment {} on load {} is {} instead of PACKED",
                        shipment_id, load_id, shipment.status
                    )));
                }

                let tracking_number = match &shipment.tracking_number {
                    Some(t) => t.clone(),
                    None => {
                        let t = Self::generate_tracking_number();
                        shipment.tracking_number = Some(t.clone());
                        t
                    }
                };

                // Stamp shipped quantities from what was actually packed.
                let packed = self.packed_quantities(&shipment);
                let order_reference = {
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
                    for item in order.items.iter_mut() {
                        if let Some(qty) = packed.iter().find(|(p, _)| *p == item.product_id) {
                            item.quantity_shipped = qty.1;
                        }
                    }
                    order.status = OutboundOrderStatus::Shipped;
                    order.updated_at = now;
                    order.reference_number.clone()
                };

                shipment.status = ShipmentStatus::Shipped;
                shipment.shipped_at = Some(now);
                shipment.updated_at = now;
                shipped_orders.push(shipment.outbound_order_id);

                lines.push(ManifestLine {
                    shipment_id: *shipment_id,
                    outbound_order_id: shipment.outbound_order_id,
                    order_reference,
                    tracking_number,
                    parcel_count: shipment.parcel_ids.len() as u32,
                    weight_grams: shipment.total_weight_grams,
                });
            }

            let manifest = Manifest {
                id: Uuid::new_v4(),
                manifest_number: self.store.next_manifest_number(),
                load_id,
                carrier_id: load.carrier_id,
                lines,
                generated_at: now,
            };
            self.store.manifests.insert(manifest.id, manifest.clone());
            load.status = LoadStatus::Dispatched;
            load.manifest_id = Some(manifest.id);
            load.dispatched_at = Some(now);
            (manifest, shipped_orders)
        };

        self.event_sender
            .send(Event::LoadDispatched {
                load_id,
                manifest_id: manifest.id,
                shipment_count: manifest.lines.len(),
            })
            .await
            .map_err(ServiceError::EventError)?;
        for order_id in shipped_orders {
            self.event_sender
                .send(Event::OrderShipped(order_id))
                .await
                .map_err(ServiceError::EventError)?;
        }
        info!(
            load_id = %load_id,
            manifest_number = %manifest.manifest_number,
            shipments = manifest.lines.len(),
            "dispatched load"
        );
        Ok(manifest)
    }

    /// Per-product packed totals across a shipment's parcels.
    fn packed_quantities(&self, shipment: &Shipment) -> Vec<(Uuid, i32)> {
        let mut totals: Vec<(Uuid, i32)> = Vec::new();
        for parcel_id in &shipment.parcel_ids {
            if let Some(parcel) = self.store.parcels.get(parcel_id) {
                for item in &parcel.items {
                    match totals.iter_mut().find(|(p, _)| *p == item.product_id) {
                        Some(entry) => entry.1 += item.quantity,
                        None => totals.push((item.product_id, item.quantity)),
                    }
                }
            }
        }
        totals
    }

    #[instrument(skip(self))]
    pub async fn get_load(&self, load_id: Uuid) -> Result<TransportLoad, ServiceError> {
        self.store
            .loads
            .get(&load_id)
            .map(|l| l.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("transport load {}", load_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_loads(
        &self,
        page: u64,
        limit: u64,
        status: Option<LoadStatus>,
    ) -> Result<(Vec<TransportLoad>, u64), ServiceError> {
        validate_page(page, limit)?;
        let mut items: Vec<TransportLoad> = self
            .store
            .loads
            .iter()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .map(|l| l.clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        let total = items.len() as u64;
        let start = ((page - 1) * limit) as usize;
        Ok((
            items.into_iter().skip(start).take(limit as usize).collect(),
            total,
        ))
    }

    #[instrument(skip(self))]
    pub async fn get_manifest(&self, manifest_id: Uuid) -> Result<Manifest, ServiceError> {
        self.store
            .manifests
            .get(&manifest_id)
            .map(|m| m.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("manifest {}", manifest_id)))
    }
}

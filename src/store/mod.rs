//! Shared in-process entity store.
//!
//! All aggregates of the system live here, each in its own map; the
//! inventory ledger is the stock-bearing member. Services share one
//! `Arc<WarehouseStore>` and mutate entries under their map guards.
//!
//! Lock hierarchy (a guard on a later map is never held while acquiring an
//! earlier one): loads -> shipments -> parcels / orders, waves -> tasks /
//! orders, and every ledger map after any aggregate map. Within the ledger
//! see `ledger::InventoryLedger`.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use uuid::Uuid;

use crate::entities::inbound_order::InboundOrder;
use crate::entities::location::{Location, LocationType, Zone};
use crate::entities::outbound_order::OutboundOrder;
use crate::entities::pick_wave::{PickTask, PickWave};
use crate::entities::product::Product;
use crate::entities::qc::{NonConformanceReport, QcInspection};
use crate::entities::rma::RmaRequest;
use crate::entities::shipment::{Parcel, Shipment};
use crate::entities::transport_load::{Carrier, Manifest, TransportLoad};
use crate::ledger::InventoryLedger;

#[derive(Default)]
pub struct WarehouseStore {
    pub ledger: InventoryLedger,

    // Catalog
    pub products: DashMap<Uuid, Product>,
    pub product_skus: DashMap<String, Uuid>,
    pub zones: DashMap<Uuid, Zone>,
    pub location_types: DashMap<Uuid, LocationType>,
    pub locations: DashMap<Uuid, Location>,
    pub location_codes: DashMap<String, Uuid>,
    pub carriers: DashMap<Uuid, Carrier>,

    // Inbound
    pub inbound_orders: DashMap<Uuid, InboundOrder>,
    /// item id -> owning inbound order id
    pub inbound_item_index: DashMap<Uuid, Uuid>,

    // Outbound
    pub outbound_orders: DashMap<Uuid, OutboundOrder>,
    pub waves: DashMap<Uuid, PickWave>,
    pub pick_tasks: DashMap<Uuid, PickTask>,
    /// order id -> wave id; the entry arbitrates concurrent wave
    /// creation so an order's demand is never released twice.
    pub wave_by_order: DashMap<Uuid, Uuid>,

    // Packing / shipping
    pub shipments: DashMap<Uuid, Shipment>,
    /// outbound order id -> shipment id; the entry arbitrates concurrent
    /// packing starts for the same order.
    pub shipment_by_order: DashMap<Uuid, Uuid>,
    pub parcels: DashMap<Uuid, Parcel>,
    pub loads: DashMap<Uuid, TransportLoad>,
    pub manifests: DashMap<Uuid, Manifest>,

    // Reverse flow / QC
    pub rmas: DashMap<Uuid, RmaRequest>,
    pub inspections: DashMap<Uuid, QcInspection>,
    pub ncrs: DashMap<Uuid, NonConformanceReport>,
    /// inspection id -> NCR id; at most one NCR per inspection.
    pub ncr_by_inspection: DashMap<Uuid, Uuid>,

    wave_counter: AtomicU64,
    inbound_counter: AtomicU64,
    load_counter: AtomicU64,
    manifest_counter: AtomicU64,
    rma_counter: AtomicU64,
    ncr_counter: AtomicU64,
    order_counter: AtomicU64,
}

impl WarehouseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_wave_number(&self) -> String {
        format!("WAVE-{:06}", self.wave_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn next_inbound_reference(&self) -> String {
        format!(
            "ASN-{:06}",
            self.inbound_counter.fetch_add(1, Ordering::SeqCst) + 1
        )
    }

    pub fn next_load_number(&self) -> String {
        format!("LOAD-{:06}", self.load_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn next_manifest_number(&self) -> String {
        format!(
            "MAN-{:06}",
            self.manifest_counter.fetch_add(1, Ordering::SeqCst) + 1
        )
    }

    pub fn next_rma_number(&self) -> String {
        format!("RMA-{:06}", self.rma_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn next_ncr_number(&self) -> String {
        format!("NCR-{:06}", self.ncr_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn next_order_reference(&self) -> String {
        format!("OUT-{:06}", self.order_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

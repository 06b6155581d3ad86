//! Service wrapper around the inventory ledger: manual lot entry, the
//! reservation lifecycle, status changes, and the stale-reservation sweep.

use chrono::Duration;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::inventory_lot::{
    InventoryRecord, LotSource, LotStatus, Reservation, StockSummary,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::ledger::{CleanupResult, NewLot};
use crate::store::WarehouseStore;

#[derive(Debug, Clone)]
pub struct CreateLotCommand {
    pub product_id: Uuid,
    pub location_id: Uuid,
    /// Generated when omitted.
    pub lpn: Option<String>,
    pub quantity: i32,
}

/// Service for managing inventory
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<WarehouseStore>,
    event_sender: EventSender,
}

impl InventoryService {
    /// Creates a new inventory service instance
    pub fn new(store: Arc<WarehouseStore>, event_sender: EventSender) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    /// Creates a lot from a manual stock entry (cycle-count adjustment,
    /// found stock). Receiving and returns create their lots through their
    /// own managers.
    #[instrument(skip(self))]
    pub async fn create_lot(
        &self,
        command: CreateLotCommand,
    ) -> Result<InventoryRecord, ServiceError> {
        let product = self
            .store
            .products
            .get(&command.product_id)
            .map(|p| p.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("product {}", command.product_id)))?;
        if !product.active {
            return Err(ServiceError::ValidationError(format!(
                "product {} is inactive",
                product.sku
            )));
        }
        if !self.store.locations.contains_key(&command.location_id) {
            return Err(ServiceError::NotFound(format!(
                "location {}",
                command.location_id
            )));
        }

        let lpn = match command.lpn {
            Some(lpn) => lpn,
            None => self.store.ledger.next_lpn()?,
        };
        let record = self.store.ledger.create_lot(NewLot {
            product_id: command.product_id,
            location_id: command.location_id,
            lpn,
            quantity: command.quantity,
            status: LotStatus::Available,
            source: LotSource::Adjustment,
        })?;

        self.event_sender
            .send(Event::LotCreated {
                record_id: record.id,
                product_id: record.product_id,
                location_id: record.location_id,
                quantity: record.quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn get_record(&self, record_id: Uuid) -> Result<InventoryRecord, ServiceError> {
        self.store
            .ledger
            .get_record(record_id)
            .ok_or_else(|| ServiceError::NotFound(format!("inventory record {}", record_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_records(
        &self,
        page: u64,
        limit: u64,
        product_id: Option<Uuid>,
        location_id: Option<Uuid>,
        status: Option<LotStatus>,
    ) -> Result<(Vec<InventoryRecord>, u64), ServiceError> {
        self.store
            .ledger
            .list_records(page, limit, product_id, location_id, status, false)
    }

    #[instrument(skip(self))]
    pub async fn stock_summary(&self, product_id: Uuid) -> Result<StockSummary, ServiceError> {
        if !self.store.products.contains_key(&product_id) {
            return Err(ServiceError::NotFound(format!("product {}", product_id)));
        }
        Ok(self.store.ledger.stock_summary(product_id))
    }

    #[instrument(skip(self))]
    pub async fn location_occupancy(&self, location_id: Uuid) -> Result<i32, ServiceError> {
        if !self.store.locations.contains_key(&location_id) {
            return Err(ServiceError::NotFound(format!("location {}", location_id)));
        }
        Ok(self.store.ledger.location_occupancy(location_id))
    }

    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        record_id: Uuid,
        quantity: i32,
    ) -> Result<Reservation, ServiceError> {
        let reservation = self.store.ledger.reserve(record_id, quantity)?;
        self.event_sender
            .send(Event::StockReserved {
                record_id,
                reservation_id: reservation.id,
                quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(reservation)
    }

    #[instrument(skip(self))]
    pub async fn release(&self, reservation_id: Uuid) -> Result<(), ServiceError> {
        let reservation = self
            .store
            .ledger
            .get_reservation(reservation_id)
            .ok_or(ServiceError::InvalidToken(reservation_id))?;
        self.store.ledger.release(reservation_id)?;
        self.event_sender
            .send(Event::StockReleased {
                record_id: reservation.record_id,
                reservation_id,
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn consume(&self, reservation_id: Uuid) -> Result<(), ServiceError> {
        let reservation = self
            .store
            .ledger
            .get_reservation(reservation_id)
            .ok_or(ServiceError::InvalidToken(reservation_id))?;
        self.store.ledger.consume(reservation_id)?;
        self.event_sender
            .send(Event::StockConsumed {
                record_id: reservation.record_id,
                reservation_id,
                quantity: reservation.quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        record_id: Uuid,
        new_status: LotStatus,
    ) -> Result<InventoryRecord, ServiceError> {
        let record = self.store.ledger.set_status(record_id, new_status)?;
        self.event_sender
            .send(Event::LotStatusChanged {
                record_id,
                new_status: new_status.to_string(),
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(record)
    }

    /// Releases reservations older than the configured TTL so abandoned
    /// waves cannot strand stock.
    #[instrument(skip(self))]
    pub async fn sweep_stale_reservations(
        &self,
        ttl_secs: u64,
    ) -> Result<CleanupResult, ServiceError> {
        let result = self
            .store
            .ledger
            .sweep_stale_reservations(Duration::seconds(ttl_secs as i64));
        if result.released_count > 0 {
            info!(
                released_count = result.released_count,
                "stale reservation sweep released stock"
            );
            self.event_sender
                .send(Event::StaleReservationsReleased {
                    released_count: result.released_count,
                })
                .await
                .map_err(ServiceError::EventError)?;
        }
        Ok(result)
    }
}

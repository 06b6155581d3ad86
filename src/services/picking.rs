//! Pick-wave scheduler: batches outbound demand into waves, reserves
//! stock, and emits pick tasks.
//!
//! Wave creation is all-or-nothing: if any line cannot be covered, every
//! reservation already made for the wave is released before the error
//! surfaces. Task confirmation settles the backing reservation and, when
//! the wave drains, moves the covered orders to PICKED.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::inventory_lot::{InventoryRecord, Reservation};
use crate::entities::outbound_order::OutboundOrderStatus;
use crate::entities::pick_wave::{PickTask, PickTaskStatus, PickWave, WaveStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::catalog::validate_page;
use crate::store::WarehouseStore;

/// One planned reservation: the lot it draws from and the quantity.
struct PlannedPick {
    order_id: Uuid,
    product_id: Uuid,
    record: InventoryRecord,
    reservation: Reservation,
}

/// Service for wave picking
#[derive(Clone)]
pub struct PickingService {
    store: Arc<WarehouseStore>,
    event_sender: EventSender,
}

impl PickingService {
    pub fn new(store: Arc<WarehouseStore>, event_sender: EventSender) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    /// Creates a wave covering the given outbound orders, reserving stock
    /// for every line and emitting one pick task per reservation.
    #[instrument(skip(self))]
    pub async fn create_wave(&self, order_ids: Vec<Uuid>) -> Result<PickWave, ServiceError> {
        if order_ids.is_empty() {
            return Err(ServiceError::EmptySelection);
        }
        for (i, id) in order_ids.iter().enumerate() {
            if order_ids[..i].contains(id) {
                return Err(ServiceError::ValidationError(format!(
                    "outbound order {} appears twice in the selection",
                    id
                )));
            }
        }

        // Validate the whole selection before reserving anything.
        let mut demand: Vec<(Uuid, Uuid, i32)> = Vec::new();
        for order_id in &order_ids {
            let order = self
                .store
                .outbound_orders
                .get(order_id)
                .map(|o| o.clone())
                .ok_or_else(|| ServiceError::NotFound(format!("outbound order {}", order_id)))?;
            if order.status != OutboundOrderStatus::Planned {
                return Err(ServiceError::OrderNotPickable(*order_id));
            }
            for item in &order.items {
                demand.push((*order_id, item.product_id, item.quantity_ordered));
            }
        }

        // Claim every order for this wave before reserving: a PLANNED
        // order already riding another wave must not be released twice.
        let wave_id = Uuid::new_v4();
        let mut claimed: Vec<Uuid> = Vec::with_capacity(order_ids.len());
        for order_id in &order_ids {
            match self.store.wave_by_order.entry(*order_id) {
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    for undo in &claimed {
                        self.store.wave_by_order.remove(undo);
                    }
                    return Err(ServiceError::OrderNotPickable(*order_id));
                }
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(wave_id);
                    claimed.push(*order_id);
                }
            }
        }

        let mut planned: Vec<PlannedPick> = Vec::new();
        for (order_id, product_id, quantity) in demand {
            if let Err(e) = self.plan_line(order_id, product_id, quantity, &mut planned) {
                self.rollback(&planned);
                for undo in &claimed {
                    self.store.wave_by_order.remove(undo);
                }
                return Err(e);
            }
        }
        let now = Utc::now();
        let mut tasks = Vec::with_capacity(planned.len());
        for pick in &planned {
            let target_lpn = match self.store.ledger.next_lpn() {
                Ok(lpn) => lpn,
                Err(e) => {
                    self.rollback(&planned);
                    for undo in &claimed {
                        self.store.wave_by_order.remove(undo);
                    }
                    return Err(e);
                }
            };
            tasks.push(PickTask {
                id: Uuid::new_v4(),
                wave_id,
                outbound_order_id: pick.order_id,
                product_id: pick.product_id,
                source_location_id: pick.record.location_id,
                source_record_id: pick.record.id,
                reservation_id: pick.reservation.id,
                target_lpn,
                quantity_to_pick: pick.reservation.quantity,
                quantity_picked: None,
                status: PickTaskStatus::Pending,
                created_at: now,
                confirmed_at: None,
            });
        }

        let wave = PickWave {
            id: wave_id,
            wave_number: self.store.next_wave_number(),
            status: WaveStatus::InProgress,
            order_ids: order_ids.clone(),
            task_ids: tasks.iter().map(|t| t.id).collect(),
            created_at: now,
            completed_at: None,
        };
        for task in tasks {
            self.store.pick_tasks.insert(task.id, task);
        }
        self.store.waves.insert(wave_id, wave.clone());

        self.event_sender
            .send(Event::WaveCreated {
                wave_id,
                order_count: wave.order_ids.len(),
                task_count: wave.task_ids.len(),
            })
            .await
            .map_err(ServiceError::EventError)?;
        info!(
            wave_id = %wave_id,
            wave_number = %wave.wave_number,
            task_count = wave.task_ids.len(),
            "created pick wave"
        );
        Ok(wave)
    }

    /// Reserves stock for one order line, preferring the lowest
    /// pick-sequence location that can cover the line in full; ties break
    /// toward the lowest on-hand quantity so partial lots drain first.
    /// Splits across lots only when no single lot suffices.
    fn plan_line(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        planned: &mut Vec<PlannedPick>,
    ) -> Result<(), ServiceError> {
        let mut candidates = self.store.ledger.reservable_lots(product_id);
        candidates.sort_by_key(|r| (self.pick_sequence(r.location_id), r.quantity, r.lpn.clone()));

        let mut remaining = quantity;
        if let Some(whole) = candidates.iter().find(|r| r.available() >= remaining) {
            let reservation = self.store.ledger.reserve(whole.id, remaining)?;
            planned.push(PlannedPick {
                order_id,
                product_id,
                record: whole.clone(),
                reservation,
            });
            return Ok(());
        }

        for record in &candidates {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(record.available());
            if take == 0 {
                continue;
            }
            let reservation = self.store.ledger.reserve(record.id, take)?;
            remaining -= take;
            planned.push(PlannedPick {
                order_id,
                product_id,
                record: record.clone(),
                reservation,
            });
        }

        if remaining > 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "product {}: {} of {} units uncovered for order {}",
                product_id, remaining, quantity, order_id
            )));
        }
        Ok(())
    }

    fn pick_sequence(&self, location_id: Uuid) -> i32 {
        self.store
            .locations
            .get(&location_id)
            .map(|l| l.pick_sequence)
            .unwrap_or(i32::MAX)
    }

    /// Releases every reservation the aborted wave request already made.
    fn rollback(&self, planned: &[PlannedPick]) {
        for pick in planned {
            if let Err(e) = self.store.ledger.release(pick.reservation.id) {
                warn!(
                    reservation_id = %pick.reservation.id,
                    error = %e,
                    "failed to roll back wave reservation"
                );
            }
        }
        if !planned.is_empty() {
            info!(count = planned.len(), "rolled back wave reservations");
        }
    }

    /// Confirms a pick. Under-picks are allowed: the shortfall is released
    /// back to stock and surfaced as an exception event, not an error.
    #[instrument(skip(self))]
    pub async fn confirm_pick_task(
        &self,
        task_id: Uuid,
        quantity_picked: i32,
    ) -> Result<PickTask, ServiceError> {
        if quantity_picked < 0 {
            return Err(ServiceError::ValidationError(
                "picked quantity must not be negative".to_string(),
            ));
        }

        let task = {
            let mut task = self
                .store
                .pick_tasks
                .get_mut(&task_id)
                .ok_or_else(|| ServiceError::NotFound(format!("pick task {}", task_id)))?;
            if task.status != PickTaskStatus::Pending {
                return Err(ServiceError::Conflict(format!(
                    "pick task {} is already completed",
                    task_id
                )));
            }
            if quantity_picked > task.quantity_to_pick {
                return Err(ServiceError::OverPick(format!(
                    "task {}: picked {} of {}",
                    task_id, quantity_picked, task.quantity_to_pick
                )));
            }

            // Settle the reservation while holding the task entry, so a
            // racing confirm cannot touch the same token.
            self.store
                .ledger
                .consume_partial(task.reservation_id, quantity_picked)?;

            task.quantity_picked = Some(quantity_picked);
            task.status = PickTaskStatus::Completed;
            task.confirmed_at = Some(Utc::now());
            task.clone()
        };

        if let Some(mut order) = self.store.outbound_orders.get_mut(&task.outbound_order_id) {
            if let Some(item) = order
                .items
                .iter_mut()
                .find(|i| i.product_id == task.product_id)
            {
                item.quantity_picked += quantity_picked;
            }
            order.updated_at = Utc::now();
        }

        let completed_orders = self.complete_wave_if_drained(task.wave_id);

        self.event_sender
            .send(Event::PickTaskConfirmed {
                task_id,
                quantity_picked,
            })
            .await
            .map_err(ServiceError::EventError)?;
        if quantity_picked < task.quantity_to_pick {
            self.event_sender
                .send(Event::PickShortfall {
                    task_id,
                    quantity_to_pick: task.quantity_to_pick,
                    quantity_picked,
                })
                .await
                .map_err(ServiceError::EventError)?;
        }
        if let Some(order_ids) = completed_orders {
            self.event_sender
                .send(Event::WaveCompleted(task.wave_id))
                .await
                .map_err(ServiceError::EventError)?;
            for order_id in order_ids {
                self.event_sender
                    .send(Event::OrderPicked(order_id))
                    .await
                    .map_err(ServiceError::EventError)?;
            }
            info!(wave_id = %task.wave_id, "pick wave completed");
        }

        Ok(task)
    }

    /// Marks the wave COMPLETED once every task is, and moves its orders
    /// to PICKED. Returns the order ids on the completing confirmation.
    fn complete_wave_if_drained(&self, wave_id: Uuid) -> Option<Vec<Uuid>> {
        let mut wave = self.store.waves.get_mut(&wave_id)?;
        if wave.status == WaveStatus::Completed {
            return None;
        }
        let all_done = wave.task_ids.iter().all(|id| {
            self.store
                .pick_tasks
                .get(id)
                .map(|t| t.status == PickTaskStatus::Completed)
                .unwrap_or(false)
        });
        if !all_done {
            return None;
        }

        wave.status = WaveStatus::Completed;
        wave.completed_at = Some(Utc::now());
        let order_ids = wave.order_ids.clone();
        for order_id in &order_ids {
            if let Some(mut order) = self.store.outbound_orders.get_mut(order_id) {
                if order.status == OutboundOrderStatus::Planned {
                    order.status = OutboundOrderStatus::Picked;
                    order.updated_at = Utc::now();
                }
            }
        }
        Some(order_ids)
    }

    #[instrument(skip(self))]
    pub async fn get_wave(&self, wave_id: Uuid) -> Result<PickWave, ServiceError> {
        self.store
            .waves
            .get(&wave_id)
            .map(|w| w.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("pick wave {}", wave_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_waves(
        &self,
        page: u64,
        limit: u64,
        status: Option<WaveStatus>,
    ) -> Result<(Vec<PickWave>, u64), ServiceError> {
        validate_page(page, limit)?;
        let mut items: Vec<PickWave> = self
            .store
            .waves
            .iter()
            .filter(|w| status.map_or(true, |s| w.status == s))
            .map(|w| w.clone())
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
    pub async fn get_task(&self, task_id: Uuid) -> Result<PickTask, ServiceError> {
        self.store
            .pick_tasks
            .get(&task_id)
            .map(|t| t.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("pick task {}", task_id)))
    }

    /// Tasks of one wave, in pick-walk order.
    #[instrument(skip(self))]
    pub async fn list_wave_tasks(&self, wave_id: Uuid) -> Result<Vec<PickTask>, ServiceError> {
        let wave = self
            .store
            .waves
            .get(&wave_id)
            .map(|w| w.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("pick wave {}", wave_id)))?;
        let mut tasks: Vec<PickTask> = wave
            .task_ids
            .iter()
            .filter_map(|id| self.store.pick_tasks.get(id).map(|t| t.clone()))
            .collect();
        tasks.sort_by_key(|t| (self.pick_sequence(t.source_location_id), t.created_at));
        Ok(tasks)
    }
}

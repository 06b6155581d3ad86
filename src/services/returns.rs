//! Returns manager: RMA lifecycle from request through receipt and
//! grading.
//!
//! Received returns land as QC_HOLD lots at the configured staging
//! location; grading decides whether each lot re-enters stock, is marked
//! damaged, or is written off.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::inventory_lot::{LotSource, LotStatus};
use crate::entities::outbound_order::OutboundOrderStatus;
use crate::entities::rma::{ReturnGrade, ReturnItem, RmaRequest, RmaStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::ledger::NewLot;
use crate::services::catalog::validate_page;
use crate::store::WarehouseStore;

#[derive(Debug, Clone)]
pub struct NewReturnLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Service for return processing
#[derive(Clone)]
pub struct ReturnsService {
    store: Arc<WarehouseStore>,
    event_sender: EventSender,
    config: AppConfig,
}

impl ReturnsService {
    pub fn new(store: Arc<WarehouseStore>, event_sender: EventSender, config: AppConfig) -> Self {
        Self {
            store,
            event_sender,
            config,
        }
    }

    /// Opens an RMA for a shipped order. With no explicit lines, every
    /// shipped line is expected back in full.
    #[instrument(skip(self))]
    pub async fn create_rma(
        &self,
        outbound_order_id: Uuid,
        reason: String,
        lines: Option<Vec<NewReturnLine>>,
    ) -> Result<RmaRequest, ServiceError> {
        if reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "return reason must not be empty".to_string(),
            ));
        }
        let order = self
            .store
            .outbound_orders
            .get(&outbound_order_id)
            .map(|o| o.clone())
            .ok_or_else(|| {
                ServiceError::NotFound(format!("outbound order {}", outbound_order_id))
            })?;
        if order.status != OutboundOrderStatus::Shipped {
            return Err(ServiceError::Conflict(format!(
                "order {} is {} and cannot be returned",
                order.reference_number, order.status
            )));
        }

        let items: Vec<ReturnItem> = match lines {
            Some(lines) => {
                if lines.is_empty() {
                    return Err(ServiceError::ValidationError(
                        "rma requires at least one return line".to_string(),
                    ));
                }
                let mut items = Vec::with_capacity(lines.len());
                for line in lines {
                    let shipped = order
                        .items
                        .iter()
                        .find(|i| i.product_id == line.product_id)
                        .map(|i| i.quantity_shipped)
                        .ok_or_else(|| {
                            ServiceError::ValidationError(format!(
                                "product {} is not on order {}",
                                line.product_id, order.reference_number
                            ))
                        })?;
                    if line.quantity < 1 || line.quantity > shipped {
                        return Err(ServiceError::ValidationError(format!(
                            "product {}: return quantity {} outside shipped {}",
                            line.product_id, line.quantity, shipped
                        )));
                    }
                    items.push(ReturnItem {
                        id: Uuid::new_v4(),
                        product_id: line.product_id,
                        quantity: line.quantity,
                        grade: None,
                        comment: None,
                        lot_id: None,
                    });
                }
                items
            }
            None => order
                .items
                .iter()
                .filter(|i| i.quantity_shipped > 0)
                .map(|i| ReturnItem {
                    id: Uuid::new_v4(),
                    product_id: i.product_id,
                    quantity: i.quantity_shipped,
                    grade: None,
                    comment: None,
                    lot_id: None,
                })
                .collect(),
        };
        if items.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "order {} has no shipped lines to return",
                order.reference_number
            )));
        }

        let now = Utc::now();
        let rma = RmaRequest {
            id: Uuid::new_v4(),
            rma_number: self.store.next_rma_number(),
            outbound_order_id,
            reason,
            status: RmaStatus::Pending,
            tracking_number: None,
            items,
            created_at: now,
            updated_at: now,
        };
        self.store.rmas.insert(rma.id, rma.clone());

        self.event_sender
            .send(Event::RmaCreated(rma.id))
            .await
            .map_err(ServiceError::EventError)?;
        info!(rma_id = %rma.id, rma_number = %rma.rma_number, "created rma");
        Ok(rma)
    }

    /// Books the physical return in: one QC_HOLD lot per expected line at
    /// the returns staging location.
    #[instrument(skip(self))]
    pub async fn receive_return(
        &self,
        rma_id: Uuid,
        tracking_number: String,
    ) -> Result<RmaRequest, ServiceError> {
        let staging_location_id = self
            .store
            .location_codes
            .get(&self.config.returns_location_code)
            .map(|e| *e)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "returns staging location {}",
                    self.config.returns_location_code
                ))
            })?;

        let (rma, lot_count) = {
            let mut rma = self
                .store
                .rmas
                .get_mut(&rma_id)
                .ok_or_else(|| ServiceError::NotFound(format!("rma {}", rma_id)))?;
            if rma.status != RmaStatus::Pending {
                return Err(ServiceError::Conflict(format!(
                    "rma {} is {} and cannot be received",
                    rma.rma_number, rma.status
                )));
            }

            let mut created: Vec<Uuid> = Vec::with_capacity(rma.items.len());
            let mut lot_ids: Vec<Uuid> = Vec::with_capacity(rma.items.len());
            for item in &rma.items {
                let result = self.store.ledger.next_lpn().and_then(|lpn| {
                    self.store.ledger.create_lot(NewLot {
                        product_id: item.product_id,
                        location_id: staging_location_id,
                        lpn,
                        quantity: item.quantity,
                        status: LotStatus::QcHold,
                        source: LotSource::Return { rma_id },
                    })
                });
                match result {
                    Ok(record) => {
                        created.push(record.id);
                        lot_ids.push(record.id);
                    }
                    Err(e) => {
                        // Undo the lots this receipt already created.
                        for record_id in created {
                            if let Err(undo) = self.store.ledger.scrap(record_id) {
                                warn!(record_id = %record_id, error = %undo, "failed to undo return lot");
                            }
                        }
                        return Err(e);
                    }
                }
            }

            for (item, lot_id) in rma.items.iter_mut().zip(lot_ids) {
                item.lot_id = Some(lot_id);
            }
            rma.status = RmaStatus::Received;
            rma.tracking_number = Some(tracking_number);
            rma.updated_at = Utc::now();
            (rma.clone(), created.len())
        };

        self.event_sender
            .send(Event::ReturnReceived { rma_id, lot_count })
            .await
            .map_err(ServiceError::EventError)?;
        info!(rma_id = %rma_id, lot_count, "return received into qc hold");
        Ok(rma)
    }

    /// Grades one returned line. GRADE_A/B re-enter stock, GRADE_C is
    /// marked damaged, SCRAP is written off. The RMA is GRADED when every
    /// line has an outcome.
    #[instrument(skip(self))]
    pub async fn grade_item(
        &self,
        rma_id: Uuid,
        product_id: Uuid,
        grade: ReturnGrade,
        comment: Option<String>,
    ) -> Result<ReturnItem, ServiceError> {
        let graded = {
            let mut rma = self
                .store
                .rmas
                .get_mut(&rma_id)
                .ok_or_else(|| ServiceError::NotFound(format!("rma {}", rma_id)))?;
            if rma.status != RmaStatus::Received {
                return Err(ServiceError::Conflict(format!(
                    "rma {} is {} and cannot be graded",
                    rma.rma_number, rma.status
                )));
            }

            let item = rma
                .items
                .iter_mut()
                .find(|i| i.product_id == product_id && i.grade.is_none())
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "ungraded return line for product {} on rma {}",
                        product_id, rma_id
                    ))
                })?;
            let lot_id = item.lot_id.ok_or_else(|| {
                ServiceError::InvariantViolation(format!(
                    "received rma {} line {} has no lot",
                    rma_id, item.id
                ))
            })?;

            match grade {
                ReturnGrade::GradeA | ReturnGrade::GradeB => {
                    self.store.ledger.set_status(lot_id, LotStatus::Available)?;
                }
                ReturnGrade::GradeC => {
                    self.store.ledger.set_status(lot_id, LotStatus::Damaged)?;
                }
                ReturnGrade::Scrap => {
                    self.store.ledger.scrap(lot_id)?;
                }
            }
            item.grade = Some(grade);
            item.comment = comment;
            let graded = item.clone();

            if rma.items.iter().all(|i| i.grade.is_some()) {
                rma.status = RmaStatus::Graded;
            }
            rma.updated_at = Utc::now();
            graded
        };

        self.event_sender
            .send(Event::ReturnItemGraded {
                rma_id,
                product_id,
                grade,
            })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(graded)
    }

    #[instrument(skip(self))]
    pub async fn close_rma(&self, rma_id: Uuid) -> Result<RmaRequest, ServiceError> {
        let rma = {
            let mut rma = self
                .store
                .rmas
                .get_mut(&rma_id)
                .ok_or_else(|| ServiceError::NotFound(format!("rma {}", rma_id)))?;
            if rma.status != RmaStatus::Graded {
                return Err(ServiceError::Conflict(format!(
                    "rma {} is {} and cannot be closed",
                    rma.rma_number, rma.status
                )));
            }
            rma.status = RmaStatus::Closed;
            rma.updated_at = Utc::now();
            rma.clone()
        };

        self.event_sender
            .send(Event::RmaClosed(rma_id))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(rma)
    }

    #[instrument(skip(self))]
    pub async fn get_rma(&self, rma_id: Uuid) -> Result<RmaRequest, ServiceError> {
        self.store
            .rmas
            .get(&rma_id)
            .map(|r| r.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("rma {}", rma_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_rmas(
        &self,
        page: u64,
        limit: u64,
        status: Option<RmaStatus>,
    ) -> Result<(Vec<RmaRequest>, u64), ServiceError> {
        validate_page(page, limit)?;
        let mut items: Vec<RmaRequest> = self
            .store
            .rmas
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .map(|r| r.clone())
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

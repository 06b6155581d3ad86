//! Quality control: inspections over inbound receipts, returns, and
//! standing inventory, with non-conformance reporting.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::inbound_order::InboundOrderStatus;
use crate::entities::inventory_lot::LotStatus;
use crate::entities::qc::{
    InspectionResult, InspectionSource, NcrStatus, NonConformanceReport, QcInspection,
};
use crate::entities::rma::RmaStatus;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::catalog::validate_page;
use crate::store::WarehouseStore;

/// Service for quality control
#[derive(Clone)]
pub struct QcService {
    store: Arc<WarehouseStore>,
    event_sender: EventSender,
}

impl QcService {
    pub fn new(store: Arc<WarehouseStore>, event_sender: EventSender) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    /// Opens an inspection against a tagged source. An INVENTORY
    /// inspection puts the referenced lot on QC hold immediately; INBOUND
    /// and RETURN references must be in an inspectable status.
    #[instrument(skip(self))]
    pub async fn create_inspection(
        &self,
        product_id: Uuid,
        source: InspectionSource,
        reference_id: Uuid,
        sample_size: i32,
    ) -> Result<QcInspection, ServiceError> {
        if sample_size < 1 {
            return Err(ServiceError::ValidationError(
                "sample size must be at least 1".to_string(),
            ));
        }
        if !self.store.products.contains_key(&product_id) {
            return Err(ServiceError::NotFound(format!("product {}", product_id)));
        }

        match source {
            InspectionSource::Inbound => {
                let order = self
                    .store
                    .inbound_orders
                    .get(&reference_id)
                    .map(|o| o.clone())
                    .ok_or_else(|| {
                        ServiceError::InvalidReference(format!("inbound order {}", reference_id))
                    })?;
                if order.status == InboundOrderStatus::Pending {
                    return Err(ServiceError::InvalidReference(format!(
                        "inbound order {} has received nothing to inspect",
                        order.order_reference
                    )));
                }
                if !order.items.iter().any(|i| i.product_id == product_id) {
                    return Err(ServiceError::InvalidReference(format!(
                        "product {} is not on inbound order {}",
                        product_id, order.order_reference
                    )));
                }
            }
            InspectionSource::Return => {
                let rma = self
                    .store
                    .rmas
                    .get(&reference_id)
                    .map(|r| r.clone())
                    .ok_or_else(|| {
                        ServiceError::InvalidReference(format!("rma {}", reference_id))
                    })?;
                if rma.status != RmaStatus::Received {
                    return Err(ServiceError::InvalidReference(format!(
                        "rma {} is {} and not inspectable",
                        rma.rma_number, rma.status
                    )));
                }
                if !rma.items.iter().any(|i| i.product_id == product_id) {
                    return Err(ServiceError::InvalidReference(format!(
                        "product {} is not on rma {}",
                        product_id, rma.rma_number
                    )));
                }
            }
            InspectionSource::Inventory => {
                let record = self.store.ledger.get_record(reference_id).ok_or_else(|| {
                    ServiceError::InvalidReference(format!("inventory record {}", reference_id))
                })?;
                if record.product_id != product_id {
                    return Err(ServiceError::InvalidReference(format!(
                        "record {} holds a different product",
                        reference_id
                    )));
                }
                // Pull the lot out of circulation for the inspection.
                self.store.ledger.set_status(reference_id, LotStatus::QcHold)?;
            }
        }

        let inspection = QcInspection {
            id: Uuid::new_v4(),
            product_id,
            source,
            reference_id,
            sample_size,
            result: InspectionResult::Pending,
            inspector_id: None,
            created_at: Utc::now(),
            executed_at: None,
        };
        self.store
            .inspections
            .insert(inspection.id, inspection.clone());

        self.event_sender
            .send(Event::InspectionCreated(inspection.id))
            .await
            .map_err(ServiceError::EventError)?;
        info!(inspection_id = %inspection.id, source = %source, "created inspection");
        Ok(inspection)
    }

    /// Records the inspection outcome. PASSED releases the reference's
    /// QC_HOLD lots back to AVAILABLE; FAILED and CONDITIONAL keep them
    /// held pending an NCR.
    #[instrument(skip(self))]
    pub async fn execute_inspection(
        &self,
        inspection_id: Uuid,
        result: InspectionResult,
        inspector_id: Uuid,
    ) -> Result<QcInspection, ServiceError> {
        if result == InspectionResult::Pending {
            return Err(ServiceError::ValidationError(
                "inspection result must be PASSED, FAILED or CONDITIONAL".to_string(),
            ));
        }

        let inspection = {
            let mut inspection = self
                .store
                .inspections
                .get_mut(&inspection_id)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("inspection {}", inspection_id))
                })?;
            if inspection.result != InspectionResult::Pending {
                return Err(ServiceError::Conflict(format!(
                    "inspection {} was already executed",
                    inspection_id
                )));
            }
            inspection.result = result;
            inspection.inspector_id = Some(inspector_id);
            inspection.executed_at = Some(Utc::now());
            inspection.clone()
        };

        let lots_released = if result == InspectionResult::Passed {
            self.release_held_lots(&inspection)?
        } else {
            0
        };

        self.event_sender
            .send(Event::InspectionExecuted {
                inspection_id,
                result,
                lots_released,
            })
            .await
            .map_err(ServiceError::EventError)?;
        info!(
            inspection_id = %inspection_id,
            result = %result,
            lots_released,
            "inspection executed"
        );
        Ok(inspection)
    }

    /// Moves the inspection's held lots back to AVAILABLE. For document
    /// sources only lots the document created are touched; an inventory
    /// inspection releases its single record.
    fn release_held_lots(&self, inspection: &QcInspection) -> Result<usize, ServiceError> {
        let held: Vec<Uuid> = match inspection.source {
            InspectionSource::Inventory => {
                vec![inspection.reference_id]
            }
            InspectionSource::Inbound | InspectionSource::Return => self
                .store
                .ledger
                .lots_for_source(inspection.reference_id)
                .into_iter()
                .filter(|r| r.product_id == inspection.product_id)
                .map(|r| r.id)
                .collect(),
        };

        let mut released = 0;
        for record_id in held {
            let is_held = self
                .store
                .ledger
                .get_record(record_id)
                .map(|r| r.status == LotStatus::QcHold)
                .unwrap_or(false);
            if is_held {
                self.store.ledger.set_status(record_id, LotStatus::Available)?;
                released += 1;
            }
        }
        Ok(released)
    }

    /// Documents the defect behind a FAILED or CONDITIONAL inspection.
    /// At most one NCR per inspection.
    #[instrument(skip(self))]
    pub async fn create_ncr(
        &self,
        inspection_id: Uuid,
        defect_type: String,
        description: String,
    ) -> Result<NonConformanceReport, ServiceError> {
        if defect_type.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "defect type must not be empty".to_string(),
            ));
        }
        let inspection = self
            .store
            .inspections
            .get(&inspection_id)
            .map(|i| i.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("inspection {}", inspection_id)))?;
        if !matches!(
            inspection.result,
            InspectionResult::Failed | InspectionResult::Conditional
        ) {
            return Err(ServiceError::InspectionNotFailed(inspection_id));
        }

        let ncr_id = Uuid::new_v4();
        match self.store.ncr_by_inspection.entry(inspection_id) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                return Err(ServiceError::Conflict(format!(
                    "inspection {} already has ncr {}",
                    inspection_id,
                    existing.get()
                )));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(ncr_id);
            }
        }

        let ncr = NonConformanceReport {
            id: ncr_id,
            ncr_number: self.store.next_ncr_number(),
            inspection_id,
            defect_type,
            description,
            status: NcrStatus::Open,
            created_at: Utc::now(),
            closed_at: None,
        };
        self.store.ncrs.insert(ncr.id, ncr.clone());

        self.event_sender
            .send(Event::NcrCreated {
                ncr_id,
                inspection_id,
            })
            .await
            .map_err(ServiceError::EventError)?;
        info!(ncr_id = %ncr_id, ncr_number = %ncr.ncr_number, "created ncr");
        Ok(ncr)
    }

    #[instrument(skip(self))]
    pub async fn close_ncr(&self, ncr_id: Uuid) -> Result<NonConformanceReport, ServiceError> {
        let mut ncr = self
            .store
            .ncrs
            .get_mut(&ncr_id)
            .ok_or_else(|| ServiceError::NotFound(format!("ncr {}", ncr_id)))?;
        if ncr.status != NcrStatus::Open {
            return Err(ServiceError::Conflict(format!(
                "ncr {} is already closed",
                ncr.ncr_number
            )));
        }
        ncr.status = NcrStatus::Closed;
        ncr.closed_at = Some(Utc::now());
        Ok(ncr.clone())
    }

    #[instrument(skip(self))]
    pub async fn get_inspection(
        &self,
        inspection_id: Uuid,
    ) -> Result<QcInspection, ServiceError> {
        self.store
            .inspections
            .get(&inspection_id)
            .map(|i| i.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("inspection {}", inspection_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_inspections(
        &self,
        page: u64,
        limit: u64,
        result: Option<InspectionResult>,
    ) -> Result<(Vec<QcInspection>, u64), ServiceError> {
        validate_page(page, limit)?;
        let mut items: Vec<QcInspection> = self
            .store
            .inspections
            .iter()
            .filter(|i| result.map_or(true, |r| i.result == r))
            .map(|i| i.clone())
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
    pub async fn get_ncr(&self, ncr_id: Uuid) -> Result<NonConformanceReport, ServiceError> {
        self.store
            .ncrs
            .get(&ncr_id)
            .map(|n| n.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("ncr {}", ncr_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_ncrs(
        &self,
        page: u64,
        limit: u64,
        status: Option<NcrStatus>,
    ) -> Result<(Vec<NonConformanceReport>, u64), ServiceError> {
        validate_page(page, limit)?;
        let mut items: Vec<NonConformanceReport> = self
            .store
            .ncrs
            .iter()
            .filter(|n| status.map_or(true, |s| n.status == s))
            .map(|n| n.clone())
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

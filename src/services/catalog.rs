//! Catalog service: products, zones, location types, locations, carriers.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::location::{Location, LocationType, Zone};
use crate::entities::product::Product;
use crate::entities::transport_load::Carrier;
use crate::errors::ServiceError;
use crate::store::WarehouseStore;

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub unit_price: Decimal,
    pub unit_weight_grams: i64,
}

/// Descriptive fields only; the sku is immutable once the product exists.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub unit_price: Option<Decimal>,
    pub unit_weight_grams: Option<i64>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub code: String,
    pub barcode: Option<String>,
    pub zone_id: Uuid,
    pub location_type_id: Uuid,
    pub pick_sequence: i32,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<WarehouseStore>,
}

impl CatalogService {
    pub fn new(store: Arc<WarehouseStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn create_product(&self, new: NewProduct) -> Result<Product, ServiceError> {
        if new.unit_price.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "unit price must not be negative".to_string(),
            ));
        }
        if new.unit_weight_grams < 0 {
            return Err(ServiceError::ValidationError(
                "unit weight must not be negative".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        match self.store.product_skus.entry(new.sku.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(ServiceError::Conflict(format!(
                    "sku {} already exists",
                    new.sku
                )));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let now = Utc::now();
        let product = Product {
            id,
            sku: new.sku,
            name: new.name,
            description: new.description,
            category: new.category,
            barcode: new.barcode,
            unit_price: new.unit_price,
            unit_weight_grams: new.unit_weight_grams,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.products.insert(id, product.clone());
        info!(product_id = %id, sku = %product.sku, "created product");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        update: ProductUpdate,
    ) -> Result<Product, ServiceError> {
        let mut product = self
            .store
            .products
            .get_mut(&product_id)
            .ok_or_else(|| ServiceError::NotFound(format!("product {}", product_id)))?;

        if let Some(price) = update.unit_price {
            if price.is_sign_negative() {
                return Err(ServiceError::ValidationError(
                    "unit price must not be negative".to_string(),
                ));
            }
            product.unit_price = price;
        }
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = Some(description);
        }
        if let Some(category) = update.category {
            product.category = Some(category);
        }
        if let Some(barcode) = update.barcode {
            product.barcode = Some(barcode);
        }
        if let Some(weight) = update.unit_weight_grams {
            if weight < 0 {
                return Err(ServiceError::ValidationError(
                    "unit weight must not be negative".to_string(),
                ));
            }
            product.unit_weight_grams = weight;
        }
        if let Some(active) = update.active {
            product.active = active;
        }
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<Product, ServiceError> {
        self.store
            .products
            .get(&product_id)
            .map(|p| p.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("product {}", product_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<Product>, u64), ServiceError> {
        validate_page(page, limit)?;
        let mut items: Vec<Product> = self.store.products.iter().map(|p| p.clone()).collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        let total = items.len() as u64;
        let start = ((page - 1) * limit) as usize;
        Ok((
            items.into_iter().skip(start).take(limit as usize).collect(),
            total,
        ))
    }

    #[instrument(skip(self))]
    pub async fn create_zone(
        &self,
        name: String,
        is_secure: bool,
        is_temperature_controlled: bool,
    ) -> Result<Zone, ServiceError> {
        let zone = Zone {
            id: Uuid::new_v4(),
            name,
            is_secure,
            is_temperature_controlled,
            created_at: Utc::now(),
        };
        self.store.zones.insert(zone.id, zone.clone());
        Ok(zone)
    }

    #[instrument(skip(self))]
    pub async fn list_zones(&self) -> Result<Vec<Zone>, ServiceError> {
        let mut zones: Vec<Zone> = self.store.zones.iter().map(|z| z.clone()).collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(zones)
    }

    #[instrument(skip(self))]
    pub async fn create_location_type(
        &self,
        name: String,
        max_units: i32,
    ) -> Result<LocationType, ServiceError> {
        if max_units < 1 {
            return Err(ServiceError::ValidationError(
                "location type capacity must be at least 1 unit".to_string(),
            ));
        }
        let location_type = LocationType {
            id: Uuid::new_v4(),
            name,
            max_units,
            created_at: Utc::now(),
        };
        self.store
            .location_types
            .insert(location_type.id, location_type.clone());
        Ok(location_type)
    }

    #[instrument(skip(self))]
    pub async fn list_location_types(&self) -> Result<Vec<LocationType>, ServiceError> {
        let mut types: Vec<LocationType> =
            self.store.location_types.iter().map(|t| t.clone()).collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    /// Creates a location and registers its type-defined capacity with the
    /// ledger, so lot creation can enforce it.
    #[instrument(skip(self))]
    pub async fn create_location(&self, new: NewLocation) -> Result<Location, ServiceError> {
        if !self.store.zones.contains_key(&new.zone_id) {
            return Err(ServiceError::NotFound(format!("zone {}", new.zone_id)));
        }
        let max_units = self
            .store
            .location_types
            .get(&new.location_type_id)
            .map(|t| t.max_units)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("location type {}", new.location_type_id))
            })?;

        let id = Uuid::new_v4();
        match self.store.location_codes.entry(new.code.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(ServiceError::Conflict(format!(
                    "location code {} already exists",
                    new.code
                )));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let location = Location {
            id,
            code: new.code,
            barcode: new.barcode,
            zone_id: new.zone_id,
            location_type_id: new.location_type_id,
            pick_sequence: new.pick_sequence,
            created_at: Utc::now(),
        };
        self.store.locations.insert(id, location.clone());
        self.store.ledger.register_location(id, max_units);
        info!(location_id = %id, code = %location.code, "created location");
        Ok(location)
    }

    #[instrument(skip(self))]
    pub async fn get_location(&self, location_id: Uuid) -> Result<Location, ServiceError> {
        self.store
            .locations
            .get(&location_id)
            .map(|l| l.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("location {}", location_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_locations(&self) -> Result<Vec<Location>, ServiceError> {
        let mut locations: Vec<Location> =
            self.store.locations.iter().map(|l| l.clone()).collect();
        locations.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(locations)
    }

    #[instrument(skip(self))]
    pub async fn create_carrier(
        &self,
        name: String,
        service_type: Option<String>,
        tracking_url_template: Option<String>,
    ) -> Result<Carrier, ServiceError> {
        let carrier = Carrier {
            id: Uuid::new_v4(),
            name,
            service_type,
            tracking_url_template,
            created_at: Utc::now(),
        };
        self.store.carriers.insert(carrier.id, carrier.clone());
        Ok(carrier)
    }

    #[instrument(skip(self))]
    pub async fn list_carriers(&self) -> Result<Vec<Carrier>, ServiceError> {
        let mut carriers: Vec<Carrier> = self.store.carriers.iter().map(|c| c.clone()).collect();
        carriers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(carriers)
    }
}

pub(crate) fn validate_page(page: u64, limit: u64) -> Result<(), ServiceError> {
    if page == 0 {
        return Err(ServiceError::ValidationError(
            "Page number must be greater than 0".to_string(),
        ));
    }
    if limit == 0 || limit > 1000 {
        return Err(ServiceError::ValidationError(
            "Limit must be between 1 and 1000".to_string(),
        ));
    }
    Ok(())
}

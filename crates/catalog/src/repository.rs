//! Catalog ports and registration rules.

use forgewms_core::{DomainError, DomainResult, LocationId, LotId, ProductId, SubWarehouseId};

use crate::{Location, Lot, Product, SubWarehouse};

/// Read access to master data inside a unit of work.
///
/// Implementations return owned records so they can be backed by any store.
pub trait CatalogReader {
    fn product(&self, id: ProductId) -> Option<Product>;

    fn lot(&self, id: LotId) -> Option<Lot>;

    fn lot_by_code(&self, code: &str) -> Option<Lot>;

    fn lots_for_product(&self, product_id: ProductId) -> Vec<Lot>;

    fn location(&self, id: LocationId) -> Option<Location>;

    fn location_by_code(&self, code: &str) -> Option<Location>;

    /// All locations, in no particular order.
    fn locations(&self) -> Vec<Location>;

    fn sub_warehouse(&self, id: SubWarehouseId) -> Option<SubWarehouse>;
}

/// Write access to master data (used only by registration).
pub trait CatalogRepository: CatalogReader {
    fn insert_product(&mut self, product: Product);

    fn insert_lot(&mut self, lot: Lot);

    fn insert_location(&mut self, location: Location);

    fn insert_sub_warehouse(&mut self, sub_warehouse: SubWarehouse);

    fn product_by_sku(&self, sku: &str) -> Option<Product>;

    fn sub_warehouse_by_code(&self, code: &str) -> Option<SubWarehouse>;
}

pub fn register_product<R: CatalogRepository>(repo: &mut R, product: Product) -> DomainResult<Product> {
    product.validate()?;
    if repo.product_by_sku(&product.sku).is_some() {
        return Err(DomainError::conflict(format!("product sku '{}' already exists", product.sku)));
    }
    repo.insert_product(product.clone());
    Ok(product)
}

pub fn register_lot<R: CatalogRepository>(repo: &mut R, lot: Lot) -> DomainResult<Lot> {
    lot.validate()?;
    if repo.product(lot.product_id).is_none() {
        return Err(DomainError::not_found(format!("product {}", lot.product_id)));
    }
    if repo.lot_by_code(&lot.code).is_some() {
        return Err(DomainError::conflict(format!("lot code '{}' already exists", lot.code)));
    }
    repo.insert_lot(lot.clone());
    Ok(lot)
}

pub fn register_location<R: CatalogRepository>(repo: &mut R, location: Location) -> DomainResult<Location> {
    location.validate()?;
    if let Some(sub) = location.sub_warehouse {
        if repo.sub_warehouse(sub).is_none() {
            return Err(DomainError::not_found(format!("sub-warehouse {sub}")));
        }
    }
    if repo.location_by_code(&location.code).is_some() {
        return Err(DomainError::conflict(format!(
            "location code '{}' already exists",
            location.code
        )));
    }
    repo.insert_location(location.clone());
    Ok(location)
}

pub fn register_sub_warehouse<R: CatalogRepository>(
    repo: &mut R,
    sub_warehouse: SubWarehouse,
) -> DomainResult<SubWarehouse> {
    if sub_warehouse.code.trim().is_empty() {
        return Err(DomainError::validation("sub-warehouse code cannot be empty"));
    }
    if repo.sub_warehouse_by_code(&sub_warehouse.code).is_some() {
        return Err(DomainError::conflict(format!(
            "sub-warehouse code '{}' already exists",
            sub_warehouse.code
        )));
    }
    repo.insert_sub_warehouse(sub_warehouse.clone());
    Ok(sub_warehouse)
}

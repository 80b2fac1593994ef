//! In-memory catalog + ledger fixture for allocation tests.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use forgewms_catalog::{CatalogReader, Location, LocationType, Lot, Product, SubWarehouse};
use forgewms_core::{LocationId, LotId, ProductId, SubWarehouseId, TaskId};
use forgewms_inventory::{
    InventoryRecord, InventoryRepository, InventoryStatus, Movement, StockContext, add_stock,
};

#[derive(Debug, Default)]
pub(crate) struct MemWarehouse {
    products: BTreeMap<ProductId, Product>,
    lots: BTreeMap<LotId, Lot>,
    locations: BTreeMap<LocationId, Location>,
    records: BTreeMap<(LotId, LocationId), InventoryRecord>,
    movements: Vec<Movement>,
}

impl MemWarehouse {
    pub(crate) fn add_product(&mut self, sku: &str, location_type: &str, unit_weight: f64) -> Product {
        let product = Product::new(sku, sku, unit_weight, LocationType::new(location_type).unwrap());
        self.products.insert(product.id, product.clone());
        product
    }

    /// Lot expiring on the first day of `year`/`month`.
    pub(crate) fn add_lot(&mut self, product: &Product, code: &str, year: i32, month: u32) -> Lot {
        let expires = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        let made = NaiveDate::from_ymd_opt(year - 1, month, 1).unwrap();
        let lot = Lot::new(code, product.id, made, expires, 1_000);
        self.lots.insert(lot.id, lot.clone());
        lot
    }

    pub(crate) fn add_location(
        &mut self,
        code: &str,
        location_type: &str,
        max_quantity: i64,
        max_weight: f64,
    ) -> Location {
        let location = Location::new(
            code,
            LocationType::new(location_type).unwrap(),
            max_quantity,
            max_weight,
        );
        self.locations.insert(location.id, location.clone());
        location
    }

    pub(crate) fn overflow_location(&mut self, code: &str, location_type: &str) -> Location {
        let location = Location::new(code, LocationType::new(location_type).unwrap(), 10_000, 100_000.0)
            .overflow();
        self.locations.insert(location.id, location.clone());
        location
    }

    pub(crate) fn stock(&mut self, lot: &Lot, location: &Location, quantity: i64) {
        add_stock(self, lot.id, location.id, quantity, StockContext::now()).unwrap();
    }

    pub(crate) fn set_status(&mut self, lot: &Lot, location: &Location, status: InventoryStatus) {
        if let Some(record) = self.records.get_mut(&(lot.id, location.id)) {
            record.status = status;
        }
    }
}

impl CatalogReader for MemWarehouse {
    fn product(&self, id: ProductId) -> Option<Product> {
        self.products.get(&id).cloned()
    }

    fn lot(&self, id: LotId) -> Option<Lot> {
        self.lots.get(&id).cloned()
    }

    fn lot_by_code(&self, code: &str) -> Option<Lot> {
        self.lots.values().find(|l| l.code == code).cloned()
    }

    fn lots_for_product(&self, product_id: ProductId) -> Vec<Lot> {
        self.lots.values().filter(|l| l.product_id == product_id).cloned().collect()
    }

    fn location(&self, id: LocationId) -> Option<Location> {
        self.locations.get(&id).cloned()
    }

    fn location_by_code(&self, code: &str) -> Option<Location> {
        self.locations.values().find(|l| l.code == code).cloned()
    }

    fn locations(&self) -> Vec<Location> {
        self.locations.values().cloned().collect()
    }

    fn sub_warehouse(&self, _id: SubWarehouseId) -> Option<SubWarehouse> {
        None
    }
}

impl InventoryRepository for MemWarehouse {
    fn record(&self, lot_id: LotId, location_id: LocationId) -> Option<InventoryRecord> {
        self.records.get(&(lot_id, location_id)).cloned()
    }

    fn records_at_location(&self, location_id: LocationId) -> Vec<InventoryRecord> {
        self.records.values().filter(|r| r.location_id == location_id).cloned().collect()
    }

    fn records_for_lot(&self, lot_id: LotId) -> Vec<InventoryRecord> {
        self.records.values().filter(|r| r.lot_id == lot_id).cloned().collect()
    }

    fn save_record(&mut self, record: InventoryRecord) {
        self.records.insert(record.key(), record);
    }

    fn delete_record(&mut self, lot_id: LotId, location_id: LocationId) {
        self.records.remove(&(lot_id, location_id));
    }

    fn append_movement(&mut self, movement: Movement) {
        self.movements.push(movement);
    }

    fn movements_for_lot(&self, lot_id: LotId) -> Vec<Movement> {
        self.movements.iter().filter(|m| m.lot_id == lot_id).cloned().collect()
    }

    fn movements_for_task(&self, task_id: TaskId) -> Vec<Movement> {
        self.movements.iter().filter(|m| m.task_id == Some(task_id)).cloned().collect()
    }
}

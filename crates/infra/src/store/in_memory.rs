use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use forgewms_catalog::{CatalogReader, CatalogRepository, Location, Lot, Product, SubWarehouse};
use forgewms_core::{AggregateRoot, LocationId, LotId, OrderId, ProductId, SubWarehouseId, TaskId};
use forgewms_inventory::{InventoryRecord, InventoryRepository, LedgerEvent, Movement};
use forgewms_tasks::{Task, TaskEvent, TaskRepository};

use super::unit_of_work::{Committed, CommittedEvent, StagedEvent, StoreError, UnitOfWork};

/// Transaction handle of the in-memory store.
///
/// Holds a private copy of the warehouse. Writes mark the handle dirty and
/// stage the matching events; the store swaps the copy in on commit.
#[derive(Debug, Clone, Default)]
pub struct WarehouseTx {
    products: BTreeMap<ProductId, Product>,
    lots: BTreeMap<LotId, Lot>,
    locations: BTreeMap<LocationId, Location>,
    sub_warehouses: BTreeMap<SubWarehouseId, SubWarehouse>,
    records: BTreeMap<(LotId, LocationId), InventoryRecord>,
    movements: Vec<Movement>,
    tasks: BTreeMap<TaskId, Task>,
    task_order: Vec<TaskId>,
    /// Last commit position handed out.
    position: u64,
    staged: Vec<StagedEvent>,
    dirty: bool,
}

impl WarehouseTx {
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn into_commit(mut self) -> (Self, Vec<CommittedEvent>) {
        let staged = std::mem::take(&mut self.staged);
        let events = staged
            .into_iter()
            .map(|event| {
                self.position += 1;
                CommittedEvent {
                    sequence_number: self.position,
                    event,
                }
            })
            .collect();
        self.dirty = false;
        (self, events)
    }
}

impl CatalogReader for WarehouseTx {
    fn product(&self, id: ProductId) -> Option<Product> {
        self.products.get(&id).cloned()
    }

    fn lot(&self, id: LotId) -> Option<Lot> {
        self.lots.get(&id).cloned()
    }

    fn lot_by_code(&self, code: &str) -> Option<Lot> {
        self.lots.values().find(|lot| lot.code == code).cloned()
    }

    fn lots_for_product(&self, product_id: ProductId) -> Vec<Lot> {
        self.lots
            .values()
            .filter(|lot| lot.product_id == product_id)
            .cloned()
            .collect()
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

    fn sub_warehouse(&self, id: SubWarehouseId) -> Option<SubWarehouse> {
        self.sub_warehouses.get(&id).cloned()
    }
}

impl CatalogRepository for WarehouseTx {
    fn insert_product(&mut self, product: Product) {
        self.dirty = true;
        self.products.insert(product.id, product);
    }

    fn insert_lot(&mut self, lot: Lot) {
        self.dirty = true;
        self.lots.insert(lot.id, lot);
    }

    fn insert_location(&mut self, location: Location) {
        self.dirty = true;
        self.locations.insert(location.id, location);
    }

    fn insert_sub_warehouse(&mut self, sub_warehouse: SubWarehouse) {
        self.dirty = true;
        self.sub_warehouses.insert(sub_warehouse.id, sub_warehouse);
    }

    fn product_by_sku(&self, sku: &str) -> Option<Product> {
        self.products.values().find(|p| p.sku == sku).cloned()
    }

    fn sub_warehouse_by_code(&self, code: &str) -> Option<SubWarehouse> {
        self.sub_warehouses.values().find(|s| s.code == code).cloned()
    }
}

impl InventoryRepository for WarehouseTx {
    fn record(&self, lot_id: LotId, location_id: LocationId) -> Option<InventoryRecord> {
        self.records.get(&(lot_id, location_id)).cloned()
    }

    fn records_at_location(&self, location_id: LocationId) -> Vec<InventoryRecord> {
        self.records
            .values()
            .filter(|r| r.location_id == location_id)
            .cloned()
            .collect()
    }

    fn records_for_lot(&self, lot_id: LotId) -> Vec<InventoryRecord> {
        self.records
            .range((lot_id, LocationId::from_uuid(uuid::Uuid::nil()))..)
            .take_while(|((lot, _), _)| *lot == lot_id)
            .map(|(_, record)| record.clone())
            .collect()
    }

    fn save_record(&mut self, record: InventoryRecord) {
        self.dirty = true;
        self.records.insert(record.key(), record);
    }

    fn delete_record(&mut self, lot_id: LotId, location_id: LocationId) {
        self.dirty = true;
        self.records.remove(&(lot_id, location_id));
    }

    fn append_movement(&mut self, movement: Movement) {
        self.dirty = true;
        self.staged
            .push(StagedEvent::Ledger(LedgerEvent::MovementRecorded(movement.clone())));
        self.movements.push(movement);
    }

    fn movements_for_lot(&self, lot_id: LotId) -> Vec<Movement> {
        self.movements
            .iter()
            .filter(|m| m.lot_id == lot_id)
            .cloned()
            .collect()
    }

    fn movements_for_task(&self, task_id: TaskId) -> Vec<Movement> {
        self.movements
            .iter()
            .filter(|m| m.task_id == Some(task_id))
            .cloned()
            .collect()
    }
}

impl TaskRepository for WarehouseTx {
    fn task(&self, id: TaskId) -> Option<Task> {
        self.tasks.get(&id).cloned()
    }

    fn tasks_for_order(&self, order_id: OrderId) -> Vec<Task> {
        self.task_order
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|task| task.order_id() == Some(order_id))
            .cloned()
            .collect()
    }

    fn save_task(&mut self, task: Task, events: Vec<TaskEvent>) {
        self.dirty = true;
        let id = *task.id();
        if self.tasks.insert(id, task).is_none() {
            self.task_order.push(id);
        }
        self.staged.extend(events.into_iter().map(StagedEvent::Task));
    }
}

/// Single-process warehouse store.
///
/// Units of work are serialized behind one lock and run against a copy of
/// the committed state, so a failed or panicking unit of work leaves the
/// committed state untouched.
#[derive(Debug, Default)]
pub struct InMemoryWarehouseStore {
    committed: Mutex<WarehouseTx>,
}

impl InMemoryWarehouseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, WarehouseTx> {
        // The committed state is only ever replaced wholesale after a unit of
        // work succeeds, so a poisoned lock still guards consistent data.
        self.committed.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("warehouse store lock was poisoned by a panicking unit of work; recovering");
            self.committed.clear_poison();
            poisoned.into_inner()
        })
    }
}

impl UnitOfWork for InMemoryWarehouseStore {
    type Tx = WarehouseTx;

    fn transact<T, E, F>(&self, work: F) -> Result<Committed<T>, E>
    where
        F: FnOnce(&mut Self::Tx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut committed = self.lock();
        let mut tx = committed.clone();

        let value = work(&mut tx)?;

        if !tx.is_dirty() {
            return Ok(Committed {
                value,
                events: Vec::new(),
            });
        }

        let (next, events) = tx.into_commit();
        *committed = next;
        Ok(Committed { value, events })
    }

    fn read<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Self::Tx) -> T,
    {
        Ok(query(&self.lock()))
    }
}

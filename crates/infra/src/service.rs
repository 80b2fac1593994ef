//! Warehouse service: the entry points boundary handlers call.
//!
//! Every mutating call runs as one unit of work:
//!
//! ```text
//! call
//!   ↓
//! 1. transact: domain functions over the tx (catalog, ledger, task engine)
//!   ↓
//! 2. commit (Ok) or discard (Err / panic)
//!   ↓
//! 3. publish committed events to the bus
//! ```
//!
//! Placement and allocation failures additionally publish an alert after
//! the discarded unit of work. Recoverable scan rejections are returned as
//! values and write nothing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, warn};

use forgewms_allocation::{AllocationError, LocationLoad, Placement, location_load};
use forgewms_catalog::{
    CatalogReader, Location, Lot, Product, SubWarehouse, register_location, register_lot,
    register_product, register_sub_warehouse,
};
use forgewms_core::{
    AggregateRoot, DomainError, LocationId, LotId, OrderId, TaskId, UserId,
};
use forgewms_events::{EventBus, EventEnvelope};
use forgewms_inventory::{
    InventoryRepository, LedgerError, Movement, MovementKind, StockContext, add_stock,
    adjust_stock, move_stock, on_hand, remove_stock, stock_at,
};
use forgewms_tasks::{PickLine, Scan, StepOutcome, Task, TaskError, TaskRepository};

use crate::alerts::AlertEvent;
use crate::config::WarehouseConfig;
use crate::store::{CommittedEvent, StoreError, UnitOfWork};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The unit of work committed; only publication of its events failed.
    #[error("event publication failed after commit: {0}")]
    Publish(String),
}

impl ServiceError {
    /// The placement/allocation failure behind this error, wherever it was
    /// raised.
    pub fn allocation(&self) -> Option<&AllocationError> {
        match self {
            ServiceError::Allocation(e) | ServiceError::Task(TaskError::Allocation(e)) => Some(e),
            _ => None,
        }
    }

    pub fn is_insufficient_stock(&self) -> bool {
        matches!(
            self,
            ServiceError::Ledger(LedgerError::InsufficientStock { .. })
                | ServiceError::Task(TaskError::Ledger(LedgerError::InsufficientStock { .. }))
        ) || matches!(
            self.allocation(),
            Some(AllocationError::InsufficientStock { .. } | AllocationError::NoAvailableStock { .. })
        )
    }
}

/// `{success, message}` shape of ledger calls at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub message: String,
}

impl OperationOutcome {
    pub fn from_ledger(result: &Result<Movement, ServiceError>) -> Self {
        match result {
            Ok(movement) => Self {
                success: true,
                message: describe(movement),
            },
            Err(err) => Self {
                success: false,
                message: err.to_string(),
            },
        }
    }
}

fn describe(movement: &Movement) -> String {
    match movement.kind {
        MovementKind::Receipt => format!("received {} units", movement.quantity),
        MovementKind::Shipment => format!("removed {} units", movement.quantity),
        MovementKind::Transfer => format!("moved {} units", movement.quantity),
        MovementKind::Adjustment => format!("adjusted by {} units", movement.quantity),
    }
}

fn ensure_lot<R: CatalogReader>(repo: &R, lot_id: LotId) -> Result<(), ServiceError> {
    match repo.lot(lot_id) {
        Some(_) => Ok(()),
        None => Err(DomainError::not_found(format!("lot {lot_id}")).into()),
    }
}

fn ensure_location<R: CatalogReader>(repo: &R, location_id: LocationId) -> Result<(), ServiceError> {
    match repo.location(location_id) {
        Some(_) => Ok(()),
        None => Err(DomainError::not_found(format!("location {location_id}")).into()),
    }
}

/// Synchronous facade over a unit-of-work store and an event bus.
#[derive(Debug)]
pub struct WarehouseService<S, B> {
    store: S,
    bus: B,
    config: WarehouseConfig,
}

impl<S, B> WarehouseService<S, B> {
    pub fn new(store: S, bus: B, config: WarehouseConfig) -> Self {
        Self { store, bus, config }
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S, B> WarehouseService<S, B>
where
    S: UnitOfWork,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn run<T>(
        &self,
        operation: &'static str,
        work: impl FnOnce(&mut S::Tx) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let committed = self.store.transact(work)?;
        if !committed.events.is_empty() {
            debug!(operation, events = committed.events.len(), "unit of work committed");
        }
        self.publish(&committed.events)?;
        Ok(committed.value)
    }

    fn publish(&self, events: &[CommittedEvent]) -> Result<(), ServiceError> {
        if !self.config.publish_events {
            return Ok(());
        }
        for committed in events {
            let envelope = committed
                .event
                .to_envelope(committed.sequence_number)
                .map_err(|e| ServiceError::Publish(e.to_string()))?;
            self.bus
                .publish(envelope)
                .map_err(|e| ServiceError::Publish(format!("{e:?}")))?;
        }
        Ok(())
    }

    fn raise_alert(&self, err: &ServiceError, requested: i64) {
        let Some(alert) = err
            .allocation()
            .and_then(|e| AlertEvent::from_allocation_error(e, requested, Utc::now()))
        else {
            return;
        };
        warn!(alert = forgewms_events::Event::event_type(&alert), error = %err, "raising alert");
        if !self.config.publish_events {
            return;
        }
        let published = alert
            .to_envelope()
            .map_err(|e| format!("{e}"))
            .and_then(|env| self.bus.publish(env).map_err(|e| format!("{e:?}")));
        if let Err(e) = published {
            warn!(error = %e, "failed to publish alert");
        }
    }

    fn read<T>(&self, query: impl FnOnce(&S::Tx) -> T) -> Result<T, ServiceError> {
        Ok(self.store.read(query)?)
    }

    // --- catalog -----------------------------------------------------------

    pub fn register_product(&self, product: Product) -> Result<Product, ServiceError> {
        let product = self.run("register_product", |tx| Ok(register_product(tx, product)?))?;
        info!(product_id = %product.id, sku = %product.sku, "product registered");
        Ok(product)
    }

    pub fn register_lot(&self, lot: Lot) -> Result<Lot, ServiceError> {
        let lot = self.run("register_lot", |tx| Ok(register_lot(tx, lot)?))?;
        info!(lot_id = %lot.id, code = %lot.code, expires_on = %lot.expires_on, "lot registered");
        Ok(lot)
    }

    pub fn register_location(&self, location: Location) -> Result<Location, ServiceError> {
        let location = self.run("register_location", |tx| Ok(register_location(tx, location)?))?;
        info!(
            location_id = %location.id,
            code = %location.code,
            overflow = location.is_overflow,
            "location registered"
        );
        Ok(location)
    }

    pub fn register_sub_warehouse(&self, sub_warehouse: SubWarehouse) -> Result<SubWarehouse, ServiceError> {
        let sub_warehouse = self.run("register_sub_warehouse", |tx| {
            Ok(register_sub_warehouse(tx, sub_warehouse)?)
        })?;
        info!(sub_warehouse_id = %sub_warehouse.id, code = %sub_warehouse.code, "sub-warehouse registered");
        Ok(sub_warehouse)
    }

    // --- stock ledger ------------------------------------------------------

    pub fn add_stock(
        &self,
        lot_id: LotId,
        location_id: LocationId,
        quantity: i64,
        task_id: Option<TaskId>,
        user_id: Option<UserId>,
    ) -> Result<Movement, ServiceError> {
        let ctx = context(task_id, user_id);
        let result = self.run("add_stock", |tx| {
            ensure_lot(&*tx, lot_id)?;
            ensure_location(&*tx, location_id)?;
            Ok(add_stock(tx, lot_id, location_id, quantity, ctx)?)
        });
        log_ledger("add_stock", lot_id, &result);
        result
    }

    pub fn remove_stock(
        &self,
        lot_id: LotId,
        location_id: LocationId,
        quantity: i64,
        task_id: Option<TaskId>,
        user_id: Option<UserId>,
    ) -> Result<Movement, ServiceError> {
        let ctx = context(task_id, user_id);
        let result = self.run("remove_stock", |tx| {
            ensure_lot(&*tx, lot_id)?;
            ensure_location(&*tx, location_id)?;
            Ok(remove_stock(tx, lot_id, location_id, quantity, ctx)?)
        });
        log_ledger("remove_stock", lot_id, &result);
        result
    }

    pub fn move_stock(
        &self,
        lot_id: LotId,
        origin: LocationId,
        destination: LocationId,
        quantity: i64,
        task_id: Option<TaskId>,
        user_id: Option<UserId>,
    ) -> Result<Movement, ServiceError> {
        let ctx = context(task_id, user_id);
        let result = self.run("move_stock", |tx| {
            ensure_lot(&*tx, lot_id)?;
            ensure_location(&*tx, origin)?;
            ensure_location(&*tx, destination)?;
            Ok(move_stock(tx, lot_id, origin, destination, quantity, ctx)?)
        });
        log_ledger("move_stock", lot_id, &result);
        result
    }

    pub fn adjust_stock(
        &self,
        lot_id: LotId,
        location_id: LocationId,
        actual_quantity: i64,
        user_id: Option<UserId>,
    ) -> Result<Movement, ServiceError> {
        let ctx = context(None, user_id);
        let result = self.run("adjust_stock", |tx| {
            ensure_lot(&*tx, lot_id)?;
            ensure_location(&*tx, location_id)?;
            Ok(adjust_stock(tx, lot_id, location_id, actual_quantity, ctx)?)
        });
        log_ledger("adjust_stock", lot_id, &result);
        result
    }

    // --- tasks -------------------------------------------------------------

    pub fn create_putaway_task(
        &self,
        order_id: OrderId,
        lot_id: LotId,
        quantity: i64,
        user_id: Option<UserId>,
    ) -> Result<Task, ServiceError> {
        let policy = self.config.task_policy();
        let result = self.run("create_putaway_task", |tx| {
            Ok(forgewms_tasks::create_putaway_task(
                tx,
                &policy,
                order_id,
                lot_id,
                quantity,
                user_id,
                Utc::now(),
            )?)
        });
        self.log_created("putaway", quantity, &result);
        result
    }

    pub fn create_putaway_task_to_location(
        &self,
        order_id: OrderId,
        lot_id: LotId,
        quantity: i64,
        location_id: LocationId,
        user_id: Option<UserId>,
    ) -> Result<Task, ServiceError> {
        let policy = self.config.task_policy();
        let result = self.run("create_putaway_task_to_location", |tx| {
            Ok(forgewms_tasks::create_putaway_task_to_location(
                tx,
                &policy,
                order_id,
                lot_id,
                quantity,
                location_id,
                user_id,
                Utc::now(),
            )?)
        });
        self.log_created("putaway", quantity, &result);
        result
    }

    pub fn create_picking_task_with_multiple_products(
        &self,
        order_id: OrderId,
        lines: &[PickLine],
        user_id: Option<UserId>,
    ) -> Result<Task, ServiceError> {
        let policy = self.config.task_policy();
        let result = self.run("create_picking_task", |tx| {
            Ok(forgewms_tasks::create_picking_task_with_multiple_products(
                tx,
                &policy,
                order_id,
                lines,
                user_id,
                Utc::now(),
            )?)
        });
        let requested = match &result {
            Err(err) => err
                .allocation()
                .and_then(|e| match e {
                    AllocationError::NoAvailableStock { product_id } => lines
                        .iter()
                        .find(|line| line.product_id == *product_id)
                        .map(|line| line.quantity),
                    _ => None,
                })
                .unwrap_or(0),
            Ok(_) => 0,
        };
        self.log_created("pick", requested, &result);
        result
    }

    pub fn assign_task(&self, task_id: TaskId, operator: UserId) -> Result<Task, ServiceError> {
        let task = self.run("assign_task", |tx| {
            Ok(forgewms_tasks::assign_task(tx, task_id, operator, Utc::now())?)
        })?;
        info!(task_id = %task_id, operator = %operator, "task assigned");
        Ok(task)
    }

    /// Validate a scan given as boundary strings (`"location"`, `"lot"`,
    /// `"quantity"`). Unknown scan types are rejected before any work runs.
    pub fn validate_step(
        &self,
        task_id: TaskId,
        scan_type: &str,
        value: &str,
        quantity: Option<i64>,
        user_id: Option<UserId>,
    ) -> Result<StepOutcome, ServiceError> {
        let scan = Scan::parse(scan_type, value, quantity)?;
        self.validate_scan(task_id, &scan, user_id)
    }

    pub fn validate_scan(
        &self,
        task_id: TaskId,
        scan: &Scan,
        user_id: Option<UserId>,
    ) -> Result<StepOutcome, ServiceError> {
        let result = self.run("validate_step", |tx| {
            Ok(forgewms_tasks::validate_step(tx, task_id, scan, user_id, Utc::now())?)
        });
        match &result {
            Ok(outcome) if outcome.success => {
                info!(task_id = %task_id, step = %scan.step(), next = ?outcome.next_step, "{}", outcome.message);
            }
            Ok(outcome) => {
                warn!(task_id = %task_id, step = %scan.step(), "scan rejected: {}", outcome.message);
            }
            Err(err) => {
                warn!(task_id = %task_id, step = %scan.step(), error = %err, "scan failed");
            }
        }
        result
    }

    pub fn suggest_putaway_location(&self, lot_id: LotId, quantity: i64) -> Result<Placement, ServiceError> {
        let policy = self.config.task_policy();
        self.read(|tx| forgewms_tasks::suggest_putaway_location(tx, &policy, lot_id, quantity))?
            .map_err(ServiceError::from)
    }

    // --- queries -----------------------------------------------------------

    pub fn task(&self, task_id: TaskId) -> Result<Option<Task>, ServiceError> {
        self.read(|tx| tx.task(task_id))
    }

    pub fn tasks_for_order(&self, order_id: OrderId) -> Result<Vec<Task>, ServiceError> {
        self.read(|tx| tx.tasks_for_order(order_id))
    }

    pub fn stock_at(&self, lot_id: LotId, location_id: LocationId) -> Result<i64, ServiceError> {
        self.read(|tx| stock_at(tx, lot_id, location_id))
    }

    pub fn on_hand_for_lot(&self, lot_id: LotId) -> Result<i64, ServiceError> {
        self.read(|tx| on_hand(tx, lot_id))
    }

    pub fn location_load(&self, location_id: LocationId) -> Result<LocationLoad, ServiceError> {
        self.read(|tx| location_load(tx, location_id))
    }

    pub fn movements_for_lot(&self, lot_id: LotId) -> Result<Vec<Movement>, ServiceError> {
        self.read(|tx| tx.movements_for_lot(lot_id))
    }

    pub fn movements_for_task(&self, task_id: TaskId) -> Result<Vec<Movement>, ServiceError> {
        self.read(|tx| tx.movements_for_task(task_id))
    }

    pub fn lot_by_code(&self, code: &str) -> Result<Option<Lot>, ServiceError> {
        self.read(|tx| tx.lot_by_code(code))
    }

    pub fn location_by_code(&self, code: &str) -> Result<Option<Location>, ServiceError> {
        self.read(|tx| tx.location_by_code(code))
    }

    fn log_created(&self, kind: &'static str, requested: i64, result: &Result<Task, ServiceError>) {
        match result {
            Ok(task) => info!(
                task_id = %task.id(),
                kind,
                lines = task.details().len(),
                priority = task.priority(),
                "task created"
            ),
            Err(err) => {
                warn!(kind, error = %err, "task creation failed");
                self.raise_alert(err, requested);
            }
        }
    }
}

fn context(task_id: Option<TaskId>, user_id: Option<UserId>) -> StockContext {
    let ctx = StockContext::now().by(user_id);
    match task_id {
        Some(task_id) => ctx.for_task(task_id),
        None => ctx,
    }
}

fn log_ledger(operation: &'static str, lot_id: LotId, result: &Result<Movement, ServiceError>) {
    match result {
        Ok(movement) => info!(
            operation,
            lot_id = %lot_id,
            movement_id = %movement.id,
            quantity = movement.quantity,
            "ledger updated"
        ),
        Err(err) => warn!(operation, lot_id = %lot_id, error = %err, "ledger operation rejected"),
    }
}

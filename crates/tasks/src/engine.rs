//! Task engine: task factories and the scan-validation state machine.
//!
//! Every function runs against one unit of work (`R`). A returned `Err`
//! means the caller must discard the unit of work; a rejected
//! `StepOutcome` means nothing was written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgewms_allocation::{AllocationError, Placement, allocate_fefo, place, validate_location};
use forgewms_catalog::{Location, Lot, Product};
use forgewms_core::{
    Aggregate, AggregateRoot, DomainError, LocationId, LotId, OrderId, ProductId, TaskId, UserId,
};
use forgewms_inventory::{StockContext, add_stock, remove_stock, stock_at};

use crate::error::TaskError;
use crate::repository::WarehouseRepository;
use crate::scan::{Scan, ScanStep, StepData, StepOutcome};
use crate::task::{
    AssignTask, CreateTask, RecordProgress, StartTask, Task, TaskCommand, TaskDetail, TaskEvent,
    TaskType,
};

/// Knobs the factories need from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPolicy {
    /// Priority stamped on every created task.
    pub default_priority: i32,
    /// Fall back to an overflow location when no ordinary one has room.
    pub allow_overflow: bool,
}

impl Default for TaskPolicy {
    fn default() -> Self {
        Self {
            default_priority: 5,
            allow_overflow: true,
        }
    }
}

/// One product line of a picking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

fn load_task<R: WarehouseRepository>(repo: &R, task_id: TaskId) -> Result<Task, TaskError> {
    repo.task(task_id)
        .ok_or_else(|| TaskError::not_found(format!("task {task_id}")))
}

fn lot_and_product<R: WarehouseRepository>(repo: &R, lot_id: LotId) -> Result<(Lot, Product), TaskError> {
    let lot = repo
        .lot(lot_id)
        .ok_or_else(|| TaskError::not_found(format!("lot {lot_id}")))?;
    let product = repo
        .product(lot.product_id)
        .ok_or_else(|| TaskError::not_found(format!("product {}", lot.product_id)))?;
    Ok((lot, product))
}

fn location<R: WarehouseRepository>(repo: &R, location_id: LocationId) -> Result<Location, TaskError> {
    repo.location(location_id)
        .ok_or_else(|| TaskError::not_found(format!("location {location_id}")))
}

fn create_task<R: WarehouseRepository>(
    repo: &mut R,
    policy: &TaskPolicy,
    task_type: TaskType,
    order_id: OrderId,
    details: Vec<TaskDetail>,
    user_id: Option<UserId>,
    now: DateTime<Utc>,
) -> Result<Task, TaskError> {
    let task_id = TaskId::new();
    let mut task = Task::empty(task_id);
    let events = task.execute(&TaskCommand::CreateTask(CreateTask {
        task_id,
        task_type,
        priority: policy.default_priority,
        order_id: Some(order_id),
        created_by: user_id,
        details,
        occurred_at: now,
    }))?;
    repo.save_task(task.clone(), events);
    Ok(task)
}

/// Where a putaway of `quantity` units of a lot would go, without creating
/// anything.
pub fn suggest_putaway_location<R: WarehouseRepository>(
    repo: &R,
    policy: &TaskPolicy,
    lot_id: LotId,
    quantity: i64,
) -> Result<Placement, TaskError> {
    let (_, product) = lot_and_product(repo, lot_id)?;
    Ok(place(
        repo,
        &product,
        quantity,
        product.weight_of(quantity),
        policy.allow_overflow,
    )?)
}

/// Putaway of one lot to the location the placement engine picks.
pub fn create_putaway_task<R: WarehouseRepository>(
    repo: &mut R,
    policy: &TaskPolicy,
    order_id: OrderId,
    lot_id: LotId,
    quantity: i64,
    user_id: Option<UserId>,
    now: DateTime<Utc>,
) -> Result<Task, TaskError> {
    let placement = suggest_putaway_location(repo, policy, lot_id, quantity)?;
    let detail = TaskDetail::putaway(lot_id, quantity, placement.location.id);
    create_task(repo, policy, TaskType::Putaway, order_id, vec![detail], user_id, now)
}

/// Putaway of one lot to a location named by the caller, checked for type
/// and capacity instead of searched for.
#[allow(clippy::too_many_arguments)]
pub fn create_putaway_task_to_location<R: WarehouseRepository>(
    repo: &mut R,
    policy: &TaskPolicy,
    order_id: OrderId,
    lot_id: LotId,
    quantity: i64,
    location_id: LocationId,
    user_id: Option<UserId>,
    now: DateTime<Utc>,
) -> Result<Task, TaskError> {
    if quantity <= 0 {
        return Err(AllocationError::InvalidQuantity(quantity).into());
    }
    let (_, product) = lot_and_product(repo, lot_id)?;
    let target = location(repo, location_id)?;
    validate_location(repo, &target, &product, quantity, product.weight_of(quantity))
        .map_err(AllocationError::from)?;

    let detail = TaskDetail::putaway(lot_id, quantity, target.id);
    create_task(repo, policy, TaskType::Putaway, order_id, vec![detail], user_id, now)
}

/// One PICK task with a FEFO-allocated line per product. Any line that
/// cannot be allocated fails the whole call before anything is saved.
pub fn create_picking_task_with_multiple_products<R: WarehouseRepository>(
    repo: &mut R,
    policy: &TaskPolicy,
    order_id: OrderId,
    lines: &[PickLine],
    user_id: Option<UserId>,
    now: DateTime<Utc>,
) -> Result<Task, TaskError> {
    if lines.is_empty() {
        return Err(DomainError::validation("a picking task needs at least one product line").into());
    }

    let details = lines
        .iter()
        .map(|line| {
            if repo.product(line.product_id).is_none() {
                return Err(TaskError::not_found(format!("product {}", line.product_id)));
            }
            let allocation = allocate_fefo(&*repo, line.product_id, line.quantity)?;
            Ok(TaskDetail::pick(allocation.lot.id, line.quantity, allocation.location_id))
        })
        .collect::<Result<Vec<_>, TaskError>>()?;

    create_task(repo, policy, TaskType::Pick, order_id, details, user_id, now)
}

/// Hand a not-yet-started task to an operator.
pub fn assign_task<R: WarehouseRepository>(
    repo: &mut R,
    task_id: TaskId,
    operator: UserId,
    now: DateTime<Utc>,
) -> Result<Task, TaskError> {
    let mut task = load_task(repo, task_id)?;
    let events = task.execute(&TaskCommand::AssignTask(AssignTask {
        task_id,
        operator,
        occurred_at: now,
    }))?;
    repo.save_task(task.clone(), events);
    Ok(task)
}

fn start_if_needed(task: &mut Task, now: DateTime<Utc>) -> Result<Vec<TaskEvent>, TaskError> {
    if task.is_started() {
        return Ok(Vec::new());
    }
    let task_id = *task.id();
    Ok(task.execute(&TaskCommand::StartTask(StartTask {
        task_id,
        occurred_at: now,
    }))?)
}

fn save_if_changed<R: WarehouseRepository>(repo: &mut R, task: &Task, events: Vec<TaskEvent>) {
    if !events.is_empty() {
        repo.save_task(task.clone(), events);
    }
}

/// Validate one operator scan against the task's first pending line.
pub fn validate_step<R: WarehouseRepository>(
    repo: &mut R,
    task_id: TaskId,
    scan: &Scan,
    user_id: Option<UserId>,
    now: DateTime<Utc>,
) -> Result<StepOutcome, TaskError> {
    let mut task = load_task(repo, task_id)?;

    if task.state().is_terminal() {
        return Ok(StepOutcome::rejected(format!(
            "task is already {}",
            task.state()
        )));
    }

    let is_pick = match task.task_type() {
        TaskType::Pick => true,
        TaskType::Putaway => false,
        other => return Err(TaskError::UnsupportedScanFlow(other)),
    };

    let Some(detail) = task.first_pending_detail().cloned() else {
        return Ok(StepOutcome::rejected("no pending details"));
    };

    let expected_location_id = (if is_pick { detail.origin } else { detail.destination })
        .ok_or_else(|| DomainError::invariant(format!("task detail {} has no location", detail.id)))?;
    let expected_location = location(repo, expected_location_id)?;

    match scan {
        Scan::Location(code) => {
            let matches = repo
                .location_by_code(code)
                .is_some_and(|scanned| scanned.id == expected_location.id);
            if !matches {
                return Ok(StepOutcome::rejected(format!(
                    "wrong location '{code}': expected {}",
                    expected_location.code
                )));
            }

            let events = start_if_needed(&mut task, now)?;
            save_if_changed(repo, &task, events);
            Ok(StepOutcome::accepted(
                format!("location {} confirmed", expected_location.code),
                Some(ScanStep::Lot),
            ))
        }

        Scan::Lot(code) => {
            let expected_lot = repo
                .lot(detail.lot_id)
                .ok_or_else(|| TaskError::not_found(format!("lot {}", detail.lot_id)))?;
            let matches = repo
                .lot_by_code(code)
                .is_some_and(|scanned| scanned.id == expected_lot.id);
            if !matches {
                return Ok(StepOutcome::rejected(format!(
                    "wrong lot '{code}': expected {}",
                    expected_lot.code
                )));
            }

            let available = stock_at(&*repo, expected_lot.id, expected_location.id);
            let pending = detail.remaining();
            if is_pick && available < pending {
                return Ok(StepOutcome::rejected(format!(
                    "insufficient stock: {} holds {available} of lot {}, {pending} pending",
                    expected_location.code, expected_lot.code
                )));
            }

            let events = start_if_needed(&mut task, now)?;
            save_if_changed(repo, &task, events);
            Ok(StepOutcome::accepted(
                format!("lot {} confirmed", expected_lot.code),
                Some(ScanStep::Quantity),
            )
            .with_data(StepData {
                detail_id: detail.id,
                available,
                pending,
                completed: detail.completed,
                task_state: task.state(),
            }))
        }

        Scan::Quantity(quantity) => {
            let quantity = *quantity;
            let pending = detail.remaining();
            if quantity <= 0 {
                return Ok(StepOutcome::rejected(format!(
                    "quantity must be positive (got {quantity})"
                )));
            }
            if quantity > pending {
                return Ok(StepOutcome::rejected(format!(
                    "quantity {quantity} exceeds the {pending} units pending"
                )));
            }
            if is_pick {
                let available = stock_at(&*repo, detail.lot_id, expected_location.id);
                if available < quantity {
                    return Ok(StepOutcome::rejected(format!(
                        "insufficient stock: {} holds {available}, {quantity} requested",
                        expected_location.code
                    )));
                }
            }

            let mut events = start_if_needed(&mut task, now)?;
            let ctx = StockContext::new(now).for_task(task_id).by(user_id);
            if is_pick {
                remove_stock(repo, detail.lot_id, expected_location.id, quantity, ctx)?;
            } else {
                add_stock(repo, detail.lot_id, expected_location.id, quantity, ctx)?;
            }
            events.extend(task.execute(&TaskCommand::RecordProgress(RecordProgress {
                task_id,
                detail_id: detail.id,
                quantity,
                user_id,
                occurred_at: now,
            }))?);
            save_if_changed(repo, &task, events);

            let completed = detail.completed + quantity;
            let data = StepData {
                detail_id: detail.id,
                available: stock_at(&*repo, detail.lot_id, expected_location.id),
                pending: detail.requested - completed,
                completed,
                task_state: task.state(),
            };
            let outcome = if task.is_fully_completed() {
                StepOutcome::accepted(format!("{quantity} units recorded, task completed"), None)
            } else {
                StepOutcome::accepted(
                    format!("{quantity} units recorded"),
                    Some(ScanStep::Location),
                )
            };
            Ok(outcome.with_data(data))
        }
    }
}

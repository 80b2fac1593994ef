//! Stock ledger: quantity-at-location plus its audit trail.
//!
//! Every operation here mutates an `InventoryRecord` and appends exactly one
//! `Movement`. The functions check before they write, so a failed call leaves
//! the repository untouched; the caller's unit of work makes the record write
//! and the movement append commit together.

use chrono::{DateTime, Utc};
use thiserror::Error;

use forgewms_core::{LocationId, LotId, MovementId, TaskId, UserId};

use crate::movement::{Movement, MovementKind};
use crate::record::{InventoryRecord, InventoryStatus};

/// Storage port for records and movements, implemented by the unit of work.
pub trait InventoryRepository {
    fn record(&self, lot_id: LotId, location_id: LocationId) -> Option<InventoryRecord>;

    fn records_at_location(&self, location_id: LocationId) -> Vec<InventoryRecord>;

    fn records_for_lot(&self, lot_id: LotId) -> Vec<InventoryRecord>;

    /// Insert or replace the record keyed by `(lot_id, location_id)`.
    fn save_record(&mut self, record: InventoryRecord);

    fn delete_record(&mut self, lot_id: LotId, location_id: LocationId);

    fn append_movement(&mut self, movement: Movement);

    /// Movements of one lot, in append order.
    fn movements_for_lot(&self, lot_id: LotId) -> Vec<Movement>;

    /// Movements linked to one task, in append order.
    fn movements_for_task(&self, task_id: TaskId) -> Vec<Movement>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("quantity must be positive (got {0})")]
    NonPositiveQuantity(i64),

    #[error("counted quantity cannot be negative (got {0})")]
    NegativeTarget(i64),

    #[error(
        "insufficient stock of lot {lot_id} at location {location_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        lot_id: LotId,
        location_id: LocationId,
        available: i64,
        requested: i64,
    },

    #[error("origin and destination are the same location ({0})")]
    SameLocation(LocationId),

    #[error(
        "lot {lot_id} at location {location_id} cannot hold {held} + {added} units"
    )]
    QuantityOverflow {
        lot_id: LotId,
        location_id: LocationId,
        held: i64,
        added: i64,
    },
}

/// Who and what a ledger mutation is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockContext {
    pub task_id: Option<TaskId>,
    pub user_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl StockContext {
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            task_id: None,
            user_id: None,
            occurred_at,
        }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn for_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn by(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    fn movement(
        &self,
        lot_id: LotId,
        kind: MovementKind,
        quantity: i64,
        origin: Option<LocationId>,
        destination: Option<LocationId>,
    ) -> Movement {
        Movement {
            id: MovementId::new(),
            lot_id,
            kind,
            quantity,
            origin,
            destination,
            task_id: self.task_id,
            user_id: self.user_id,
            occurred_at: self.occurred_at,
        }
    }
}

fn ensure_positive(quantity: i64) -> Result<(), LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::NonPositiveQuantity(quantity));
    }
    Ok(())
}

fn held<R: InventoryRepository>(repo: &R, lot_id: LotId, location_id: LocationId) -> i64 {
    repo.record(lot_id, location_id).map(|r| r.quantity).unwrap_or(0)
}

fn ensure_held<R: InventoryRepository>(
    repo: &R,
    lot_id: LotId,
    location_id: LocationId,
    requested: i64,
) -> Result<InventoryRecord, LedgerError> {
    match repo.record(lot_id, location_id) {
        Some(record) if record.quantity >= requested => Ok(record),
        other => Err(LedgerError::InsufficientStock {
            lot_id,
            location_id,
            available: other.map(|r| r.quantity).unwrap_or(0),
            requested,
        }),
    }
}

/// Quantity the location will hold once `quantity` more units arrive.
fn credited<R: InventoryRepository>(
    repo: &R,
    lot_id: LotId,
    location_id: LocationId,
    quantity: i64,
) -> Result<i64, LedgerError> {
    let current = held(repo, lot_id, location_id);
    current
        .checked_add(quantity)
        .ok_or(LedgerError::QuantityOverflow {
            lot_id,
            location_id,
            held: current,
            added: quantity,
        })
}

fn credit<R: InventoryRepository>(
    repo: &mut R,
    lot_id: LotId,
    location_id: LocationId,
    total: i64,
    at: DateTime<Utc>,
) {
    repo.save_record(InventoryRecord {
        lot_id,
        location_id,
        quantity: total,
        status: InventoryStatus::Available,
        updated_at: at,
    });
}

fn debit<R: InventoryRepository>(
    repo: &mut R,
    mut record: InventoryRecord,
    quantity: i64,
    at: DateTime<Utc>,
) {
    record.quantity -= quantity;
    if record.quantity == 0 {
        repo.delete_record(record.lot_id, record.location_id);
    } else {
        record.updated_at = at;
        repo.save_record(record);
    }
}

/// Receive `quantity` units of a lot into a location from outside the warehouse.
pub fn add_stock<R: InventoryRepository>(
    repo: &mut R,
    lot_id: LotId,
    location_id: LocationId,
    quantity: i64,
    ctx: StockContext,
) -> Result<Movement, LedgerError> {
    ensure_positive(quantity)?;
    let total = credited(repo, lot_id, location_id, quantity)?;

    credit(repo, lot_id, location_id, total, ctx.occurred_at);

    let movement = ctx.movement(lot_id, MovementKind::Receipt, quantity, None, Some(location_id));
    repo.append_movement(movement.clone());
    Ok(movement)
}

/// Ship `quantity` units of a lot out of a location.
pub fn remove_stock<R: InventoryRepository>(
    repo: &mut R,
    lot_id: LotId,
    location_id: LocationId,
    quantity: i64,
    ctx: StockContext,
) -> Result<Movement, LedgerError> {
    ensure_positive(quantity)?;
    let record = ensure_held(repo, lot_id, location_id, quantity)?;

    debit(repo, record, quantity, ctx.occurred_at);

    let movement = ctx.movement(lot_id, MovementKind::Shipment, quantity, Some(location_id), None);
    repo.append_movement(movement.clone());
    Ok(movement)
}

/// Transfer `quantity` units of a lot between two locations (one movement row).
pub fn move_stock<R: InventoryRepository>(
    repo: &mut R,
    lot_id: LotId,
    origin: LocationId,
    destination: LocationId,
    quantity: i64,
    ctx: StockContext,
) -> Result<Movement, LedgerError> {
    ensure_positive(quantity)?;
    if origin == destination {
        return Err(LedgerError::SameLocation(origin));
    }
    let record = ensure_held(repo, lot_id, origin, quantity)?;
    let total = credited(repo, lot_id, destination, quantity)?;

    debit(repo, record, quantity, ctx.occurred_at);
    credit(repo, lot_id, destination, total, ctx.occurred_at);

    let movement = ctx.movement(
        lot_id,
        MovementKind::Transfer,
        quantity,
        Some(origin),
        Some(destination),
    );
    repo.append_movement(movement.clone());
    Ok(movement)
}

/// Set the counted quantity of a lot at a location, recording the signed delta.
pub fn adjust_stock<R: InventoryRepository>(
    repo: &mut R,
    lot_id: LotId,
    location_id: LocationId,
    actual_quantity: i64,
    ctx: StockContext,
) -> Result<Movement, LedgerError> {
    if actual_quantity < 0 {
        return Err(LedgerError::NegativeTarget(actual_quantity));
    }

    let existing = repo.record(lot_id, location_id);
    let previous = existing.as_ref().map(|r| r.quantity).unwrap_or(0);
    let delta = actual_quantity - previous;

    if actual_quantity == 0 {
        if existing.is_some() {
            repo.delete_record(lot_id, location_id);
        }
    } else {
        let status = existing.map(|r| r.status).unwrap_or(InventoryStatus::Available);
        repo.save_record(InventoryRecord {
            lot_id,
            location_id,
            quantity: actual_quantity,
            status,
            updated_at: ctx.occurred_at,
        });
    }

    let movement = ctx.movement(lot_id, MovementKind::Adjustment, delta, None, Some(location_id));
    repo.append_movement(movement.clone());
    Ok(movement)
}

/// Quantity of a lot held at one location (0 when no record exists).
pub fn stock_at<R: InventoryRepository>(repo: &R, lot_id: LotId, location_id: LocationId) -> i64 {
    held(repo, lot_id, location_id)
}

/// Total quantity of a lot across all locations, saturating at `i64::MAX`.
pub fn on_hand<R: InventoryRepository>(repo: &R, lot_id: LotId) -> i64 {
    saturating_total(&repo.records_for_lot(lot_id))
}

/// Total quantity (all lots, all statuses) held at a location, saturating at
/// `i64::MAX`.
pub fn location_quantity<R: InventoryRepository>(repo: &R, location_id: LocationId) -> i64 {
    saturating_total(&repo.records_at_location(location_id))
}

fn saturating_total(records: &[InventoryRecord]) -> i64 {
    records
        .iter()
        .fold(0i64, |total, r| total.saturating_add(r.quantity))
}

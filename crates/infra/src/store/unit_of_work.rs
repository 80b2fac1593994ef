use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use forgewms_catalog::CatalogRepository;
use forgewms_events::{EnvelopeError, Event, EventEnvelope};
use forgewms_inventory::LedgerEvent;
use forgewms_tasks::{TaskEvent, WarehouseRepository};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not run the unit of work at all.
    #[error("warehouse store unavailable: {0}")]
    Unavailable(String),
}

/// Domain event staged by a unit of work, published only after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedEvent {
    Ledger(LedgerEvent),
    Task(TaskEvent),
}

impl StagedEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            StagedEvent::Ledger(e) => e.event_type(),
            StagedEvent::Task(e) => e.event_type(),
        }
    }

    pub fn to_envelope(&self, sequence_number: u64) -> Result<EventEnvelope<JsonValue>, EnvelopeError> {
        match self {
            StagedEvent::Ledger(e) => {
                let LedgerEvent::MovementRecorded(movement) = e;
                EventEnvelope::from_typed(
                    Uuid::from(movement.lot_id),
                    "ledger.lot",
                    sequence_number,
                    e,
                )
            }
            StagedEvent::Task(e) => {
                EventEnvelope::from_typed(Uuid::from(e.task_id()), "tasks.task", sequence_number, e)
            }
        }
    }
}

/// A staged event with its commit position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedEvent {
    pub sequence_number: u64,
    pub event: StagedEvent,
}

/// Result of a committed unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<T> {
    pub value: T,
    /// Events in the order the work staged them. Empty when nothing changed.
    pub events: Vec<CommittedEvent>,
}

/// Atomic unit of work over the whole warehouse (catalog, ledger, tasks).
///
/// `transact` runs `work` against a transaction handle. If `work` returns
/// `Ok`, everything it wrote commits at once; if it returns `Err` or panics,
/// nothing it wrote is observable afterwards.
pub trait UnitOfWork: Send + Sync {
    type Tx: WarehouseRepository + CatalogRepository;

    fn transact<T, E, F>(&self, work: F) -> Result<Committed<T>, E>
    where
        F: FnOnce(&mut Self::Tx) -> Result<T, E>,
        E: From<StoreError>;

    /// Run a read-only query against committed state.
    fn read<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Self::Tx) -> T;
}

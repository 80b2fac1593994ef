use thiserror::Error;

use forgewms_allocation::AllocationError;
use forgewms_core::DomainError;
use forgewms_inventory::LedgerError;

use crate::task::TaskType;

/// Hard failures of the task engine. Each one aborts the unit of work.
///
/// Wrong scans are not errors; they come back as a rejected `StepOutcome`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0} tasks have no scan flow")]
    UnsupportedScanFlow(TaskType),
}

impl TaskError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

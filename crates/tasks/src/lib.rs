//! Task engine: putaway and picking work, driven forward by operator scans.
//!
//! The `Task` aggregate is pure (commands in, events out). The engine
//! functions compose it with placement, FEFO allocation and the stock
//! ledger over repository ports; atomicity comes from the caller's unit of
//! work.

pub mod engine;
pub mod error;
pub mod repository;
pub mod scan;
pub mod task;

pub use engine::{
    PickLine, TaskPolicy, assign_task, create_picking_task_with_multiple_products,
    create_putaway_task, create_putaway_task_to_location, suggest_putaway_location, validate_step,
};
pub use error::TaskError;
pub use repository::{TaskRepository, WarehouseRepository};
pub use scan::{Scan, ScanStep, StepData, StepOutcome};
pub use task::{
    AssignTask, CreateTask, DetailProgressed, RecordProgress, StartTask, Task, TaskAssigned,
    TaskCommand, TaskCompleted, TaskCreated, TaskDetail, TaskEvent, TaskStarted, TaskState,
    TaskType,
};

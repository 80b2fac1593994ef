//! Unit of work over the warehouse state.
//!
//! ```text
//! service call
//!   ↓
//! transact(work)           private copy of committed state
//!   ↓
//! work(tx)                 domain functions read/write through the ports,
//!   ↓                      writes stage ledger/task events
//! Ok  → swap copy in, number staged events, return them for publishing
//! Err → drop copy (nothing staged is ever published)
//! ```

pub mod in_memory;
pub mod unit_of_work;

pub use in_memory::{InMemoryWarehouseStore, WarehouseTx};
pub use unit_of_work::{Committed, CommittedEvent, StagedEvent, StoreError, UnitOfWork};

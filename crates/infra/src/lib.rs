//! Infrastructure layer: unit-of-work store, configuration, event publication
//! and the service facade boundary handlers call.

pub mod alerts;
pub mod config;
pub mod service;
pub mod store;

mod integration_tests;

pub use alerts::AlertEvent;
pub use config::WarehouseConfig;
pub use service::{OperationOutcome, ServiceError, WarehouseService};
pub use store::{InMemoryWarehouseStore, StoreError, UnitOfWork};

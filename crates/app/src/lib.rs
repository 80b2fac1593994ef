//! Scenario replay: seed a warehouse from JSON and drive it through the
//! service, the way an operator session or an integration partner would.

pub mod replay;
pub mod scenario;

pub use replay::{OperationReport, Replay, ReplayReport, StockLine, TaskSummary};
pub use scenario::{LocationSpec, LotSpec, Operation, PickLineSpec, ProductSpec, Scenario};

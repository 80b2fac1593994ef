//! Warehouse events and their distribution to external collaborators.
//!
//! Domain crates describe what happened (`Event`); infra wraps committed
//! events in envelopes and publishes them on a bus for alerting and reporting
//! consumers.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::{EnvelopeError, EventEnvelope};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};

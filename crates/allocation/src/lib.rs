//! Placement and lot allocation.
//!
//! Both engines only *read* the ledger: they suggest a location (putaway) or
//! a lot + location (picking) and reserve nothing. The stock they point at is
//! re-checked when an operator later scans it.

pub mod error;
pub mod fefo;
pub mod placement;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AllocationError, PlacementViolation};
pub use fefo::{LotAllocation, allocate_fefo};
pub use placement::{
    LocationLoad, Placement, PlacementSource, find_optimal_location, find_overflow_location,
    location_load, place, validate_location,
};

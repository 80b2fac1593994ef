//! Warehouse master data: products, lots, locations and sub-warehouses.
//!
//! These records are collaborator inputs: the stock ledger, the placement
//! engine and the task engine read them but never change them.

pub mod location;
pub mod lot;
pub mod product;
pub mod repository;

pub use location::{Location, LocationType, SubWarehouse};
pub use lot::Lot;
pub use product::{Product, RotationClass, TemperatureRange};
pub use repository::{
    CatalogReader, CatalogRepository, register_location, register_lot, register_product,
    register_sub_warehouse,
};

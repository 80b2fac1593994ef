use thiserror::Error;

use forgewms_catalog::LocationType;
use forgewms_core::{LotId, ProductId};

/// Why a specific location cannot take an incoming quantity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementViolation {
    #[error("location {location} is type '{offered}' but the product requires '{required}'")]
    TypeMismatch {
        location: String,
        required: LocationType,
        offered: LocationType,
    },

    #[error("location {location} would exceed its quantity limit by {excess} units")]
    QuantityOverflow { location: String, excess: i64 },

    #[error("location {location} would exceed its weight limit by {excess:.2} kg")]
    WeightOverflow { location: String, excess: f64 },
}

/// Hard failures of placement and lot allocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("requested quantity must be positive (got {0})")]
    InvalidQuantity(i64),

    #[error("no location can take {quantity} units of product {product_id}")]
    CapacityExceeded { product_id: ProductId, quantity: i64 },

    #[error("location rejected: {0}")]
    LocationRejected(#[from] PlacementViolation),

    #[error("no available stock of product {product_id}")]
    NoAvailableStock { product_id: ProductId },

    #[error(
        "no single location holds {requested} units of lot {lot_id} (product {product_id}); largest holding is {largest}"
    )]
    InsufficientStock {
        product_id: ProductId,
        lot_id: LotId,
        requested: i64,
        largest: i64,
    },
}

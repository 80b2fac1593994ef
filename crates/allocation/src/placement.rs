//! Placement (slotting): choose where incoming stock goes.
//!
//! Search order:
//! 1. ordinary locations of the product's exact location type,
//! 2. that still have room for the quantity *and* the weight,
//! 3. preferring ones already holding the same product (most held first),
//!    otherwise the first by location code;
//! 4. failing that, an overflow location (same type if possible, else any).

use std::cmp::Reverse;

use forgewms_catalog::{CatalogReader, Location, Product};
use forgewms_core::{LocationId, ProductId};
use forgewms_inventory::InventoryRepository;

use crate::error::{AllocationError, PlacementViolation};

/// Weight excess (kg) tolerated before a location counts as over its limit,
/// absorbing rounding in summed unit weights.
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// What a location currently holds, summed over every record there.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocationLoad {
    pub quantity: i64,
    /// Kilograms, derived from each lot's product unit weight.
    pub weight: f64,
}

/// How a placement was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementSource {
    Optimal,
    Overflow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub location: Location,
    pub source: PlacementSource,
}

pub fn location_load<R>(repo: &R, location_id: LocationId) -> LocationLoad
where
    R: CatalogReader + InventoryRepository,
{
    repo.records_at_location(location_id)
        .iter()
        .fold(LocationLoad::default(), |mut load, record| {
            load.quantity = load.quantity.saturating_add(record.quantity);
            if let Some(product) = repo
                .lot(record.lot_id)
                .and_then(|lot| repo.product(lot.product_id))
            {
                load.weight += product.weight_of(record.quantity);
            }
            load
        })
}

fn held_of_product<R>(repo: &R, location_id: LocationId, product_id: ProductId) -> i64
where
    R: CatalogReader + InventoryRepository,
{
    repo.records_at_location(location_id)
        .iter()
        .filter(|record| {
            repo.lot(record.lot_id)
                .is_some_and(|lot| lot.product_id == product_id)
        })
        .fold(0i64, |held, record| held.saturating_add(record.quantity))
}

fn check_capacity(
    location: &Location,
    load: LocationLoad,
    quantity: i64,
    total_weight: f64,
) -> Result<(), PlacementViolation> {
    let room = location.max_quantity.saturating_sub(load.quantity);
    if quantity > room {
        return Err(PlacementViolation::QuantityOverflow {
            location: location.code.clone(),
            excess: quantity.saturating_sub(room),
        });
    }
    let weight_excess = load.weight + total_weight - location.max_weight;
    if weight_excess > WEIGHT_TOLERANCE {
        return Err(PlacementViolation::WeightOverflow {
            location: location.code.clone(),
            excess: weight_excess,
        });
    }
    Ok(())
}

/// Re-check a location chosen by other means (e.g. a temporary location
/// named by the caller) against type compatibility and both capacity limits.
pub fn validate_location<R>(
    repo: &R,
    location: &Location,
    product: &Product,
    quantity: i64,
    total_weight: f64,
) -> Result<(), PlacementViolation>
where
    R: CatalogReader + InventoryRepository,
{
    if !location.accepts(&product.location_type) {
        return Err(PlacementViolation::TypeMismatch {
            location: location.code.clone(),
            required: product.location_type.clone(),
            offered: location.location_type.clone(),
        });
    }
    check_capacity(location, location_load(repo, location.id), quantity, total_weight)
}

/// Best ordinary (non-overflow) location for `quantity` units weighing
/// `total_weight` kilograms, or `None` when nothing compatible has room.
pub fn find_optimal_location<R>(
    repo: &R,
    product: &Product,
    quantity: i64,
    total_weight: f64,
) -> Option<Location>
where
    R: CatalogReader + InventoryRepository,
{
    let mut candidates: Vec<(Location, i64)> = repo
        .locations()
        .into_iter()
        .filter(|location| !location.is_overflow && location.accepts(&product.location_type))
        .filter(|location| {
            check_capacity(location, location_load(repo, location.id), quantity, total_weight)
                .is_ok()
        })
        .map(|location| {
            let held = held_of_product(repo, location.id, product.id);
            (location, held)
        })
        .collect();

    // Consolidate first: most of the same product already held, then by code.
    candidates.sort_by(|(a, held_a), (b, held_b)| {
        (Reverse(*held_a), &a.code).cmp(&(Reverse(*held_b), &b.code))
    });

    candidates.into_iter().next().map(|(location, _)| location)
}

/// Fallback overflow location: same type as the product if one exists,
/// otherwise any overflow location. Capacity is not checked here.
pub fn find_overflow_location<R>(repo: &R, product: &Product) -> Option<Location>
where
    R: CatalogReader,
{
    let mut overflow: Vec<Location> = repo
        .locations()
        .into_iter()
        .filter(|location| location.is_overflow)
        .collect();
    overflow.sort_by(|a, b| a.code.cmp(&b.code));

    let same_type = overflow
        .iter()
        .position(|location| location.accepts(&product.location_type));
    match same_type {
        Some(idx) => Some(overflow.swap_remove(idx)),
        None => overflow.into_iter().next(),
    }
}

/// Full placement policy: optimal search, then (optionally) overflow.
pub fn place<R>(
    repo: &R,
    product: &Product,
    quantity: i64,
    total_weight: f64,
    allow_overflow: bool,
) -> Result<Placement, AllocationError>
where
    R: CatalogReader + InventoryRepository,
{
    if quantity <= 0 {
        return Err(AllocationError::InvalidQuantity(quantity));
    }

    if let Some(location) = find_optimal_location(repo, product, quantity, total_weight) {
        return Ok(Placement {
            location,
            source: PlacementSource::Optimal,
        });
    }

    if allow_overflow {
        if let Some(location) = find_overflow_location(repo, product) {
            return Ok(Placement {
                location,
                source: PlacementSource::Overflow,
            });
        }
    }

    Err(AllocationError::CapacityExceeded {
        product_id: product.id,
        quantity,
    })
}

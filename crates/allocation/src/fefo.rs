//! First-expired, first-out lot selection for picking.
//!
//! One request picks one lot and one location. The chosen quantity is never
//! split across locations, and a shortfall at the soonest-expiring lot does
//! not fall through to the next lot: the allocation simply fails.

use std::cmp::Reverse;

use forgewms_catalog::{CatalogReader, Lot};
use forgewms_core::{LocationId, ProductId};
use forgewms_inventory::{InventoryRecord, InventoryRepository};

use crate::error::AllocationError;

/// Advisory pick source for one product line. Nothing is reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotAllocation {
    pub lot: Lot,
    pub location_id: LocationId,
    /// Quantity available at `location_id` when the allocation was computed.
    pub available: i64,
}

fn available_records<R: InventoryRepository>(repo: &R, lot: &Lot) -> Vec<InventoryRecord> {
    repo.records_for_lot(lot.id)
        .into_iter()
        .filter(InventoryRecord::is_available)
        .collect()
}

pub fn allocate_fefo<R>(
    repo: &R,
    product_id: ProductId,
    quantity: i64,
) -> Result<LotAllocation, AllocationError>
where
    R: CatalogReader + InventoryRepository,
{
    if quantity <= 0 {
        return Err(AllocationError::InvalidQuantity(quantity));
    }

    let lot = repo
        .lots_for_product(product_id)
        .into_iter()
        .filter(|lot| !available_records(repo, lot).is_empty())
        .min_by(|a, b| (a.expires_on, a.id).cmp(&(b.expires_on, b.id)))
        .ok_or(AllocationError::NoAvailableStock { product_id })?;

    let records = available_records(repo, &lot);
    let largest = records.iter().map(|r| r.quantity).max().unwrap_or(0);

    let mut sufficient: Vec<(InventoryRecord, String)> = records
        .into_iter()
        .filter(|record| record.quantity >= quantity)
        .map(|record| {
            let code = repo
                .location(record.location_id)
                .map(|location| location.code)
                .unwrap_or_default();
            (record, code)
        })
        .collect();
    sufficient.sort_by(|(a, code_a), (b, code_b)| {
        (Reverse(a.quantity), code_a).cmp(&(Reverse(b.quantity), code_b))
    });

    match sufficient.into_iter().next() {
        Some((record, _)) => Ok(LotAllocation {
            lot,
            location_id: record.location_id,
            available: record.quantity,
        }),
        None => Err(AllocationError::InsufficientStock {
            product_id,
            lot_id: lot.id,
            requested: quantity,
            largest,
        }),
    }
}

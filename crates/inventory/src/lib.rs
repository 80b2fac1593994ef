//! Stock ledger: where every lot sits, and how it got there.
//!
//! Pure domain logic over the `InventoryRepository` port (no IO). The infra
//! layer supplies the unit of work that makes each operation atomic.

pub mod ledger;
pub mod movement;
pub mod record;

pub use ledger::{
    InventoryRepository, LedgerError, StockContext, add_stock, adjust_stock, location_quantity,
    move_stock, on_hand, remove_stock, stock_at,
};
pub use movement::{LedgerEvent, Movement, MovementKind};
pub use record::{InventoryRecord, InventoryStatus};

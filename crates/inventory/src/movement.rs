use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgewms_core::{LocationId, LotId, MovementId, TaskId, UserId};
use forgewms_events::Event;

/// What a movement did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Stock entered from outside (no origin).
    Receipt,
    /// Stock left to the outside (no destination).
    Shipment,
    /// Stock moved between two locations.
    Transfer,
    /// Physical-count correction; `quantity` is the signed delta.
    Adjustment,
}

/// Append-only audit row of the stock ledger.
///
/// Directional kinds carry a positive `quantity` and express direction through
/// `origin`/`destination`. Adjustments carry the signed delta and name the
/// counted location as `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub lot_id: LotId,
    pub kind: MovementKind,
    pub quantity: i64,
    pub origin: Option<LocationId>,
    pub destination: Option<LocationId>,
    pub task_id: Option<TaskId>,
    pub user_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl Movement {
    /// Change this movement caused to the quantity held at `location`.
    pub fn net_effect_at(&self, location: LocationId) -> i64 {
        match self.kind {
            MovementKind::Adjustment => {
                if self.destination == Some(location) {
                    self.quantity
                } else {
                    0
                }
            }
            _ => {
                let mut effect = 0;
                if self.destination == Some(location) {
                    effect += self.quantity;
                }
                if self.origin == Some(location) {
                    effect -= self.quantity;
                }
                effect
            }
        }
    }

    /// Change this movement caused to the lot's total holdings.
    pub fn net_effect(&self) -> i64 {
        match self.kind {
            MovementKind::Receipt | MovementKind::Adjustment => self.quantity,
            MovementKind::Shipment => -self.quantity,
            MovementKind::Transfer => 0,
        }
    }
}

/// Ledger events published to reporting collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    MovementRecorded(Movement),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::MovementRecorded(_) => "ledger.movement.recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::MovementRecorded(m) => m.occurred_at,
        }
    }
}

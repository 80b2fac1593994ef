//! Alert events for the external alerting collaborator.
//!
//! Raised when placement or lot allocation fails. They describe work that
//! was refused, so they are published outside (after) the rolled-back unit
//! of work rather than staged inside it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use forgewms_allocation::AllocationError;
use forgewms_core::{LotId, ProductId};
use forgewms_events::{EnvelopeError, Event, EventEnvelope};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityExceeded {
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientStock {
    pub product_id: ProductId,
    /// Lot FEFO settled on, when one had any available stock at all.
    pub lot_id: Option<LotId>,
    pub requested: i64,
    /// Largest single-location holding of that lot (0 when no lot qualified).
    pub largest: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertEvent {
    CapacityExceeded(CapacityExceeded),
    InsufficientStock(InsufficientStock),
}

impl AlertEvent {
    /// The alert an allocation failure should raise, if any. Invalid input
    /// and rejected explicit locations are the caller's problem, not an alert.
    pub fn from_allocation_error(
        err: &AllocationError,
        requested: i64,
        occurred_at: DateTime<Utc>,
    ) -> Option<Self> {
        match err {
            AllocationError::CapacityExceeded {
                product_id,
                quantity,
            } => Some(AlertEvent::CapacityExceeded(CapacityExceeded {
                product_id: *product_id,
                quantity: *quantity,
                occurred_at,
            })),
            AllocationError::NoAvailableStock { product_id } => {
                Some(AlertEvent::InsufficientStock(InsufficientStock {
                    product_id: *product_id,
                    lot_id: None,
                    requested,
                    largest: 0,
                    occurred_at,
                }))
            }
            AllocationError::InsufficientStock {
                product_id,
                lot_id,
                requested,
                largest,
            } => Some(AlertEvent::InsufficientStock(InsufficientStock {
                product_id: *product_id,
                lot_id: Some(*lot_id),
                requested: *requested,
                largest: *largest,
                occurred_at,
            })),
            AllocationError::InvalidQuantity(_) | AllocationError::LocationRejected(_) => None,
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            AlertEvent::CapacityExceeded(e) => e.product_id,
            AlertEvent::InsufficientStock(e) => e.product_id,
        }
    }

    /// Alerts are not part of any commit and carry sequence number 0.
    pub fn to_envelope(&self) -> Result<EventEnvelope<JsonValue>, EnvelopeError> {
        EventEnvelope::from_typed(Uuid::from(self.product_id()), "alerts.product", 0, self)
    }
}

impl Event for AlertEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AlertEvent::CapacityExceeded(_) => "alerts.capacity_exceeded",
            AlertEvent::InsufficientStock(_) => "alerts.insufficient_stock",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AlertEvent::CapacityExceeded(e) => e.occurred_at,
            AlertEvent::InsufficientStock(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use forgewms_allocation::PlacementViolation;

    use super::*;

    #[test]
    fn shortfalls_raise_insufficient_stock() {
        let product_id = ProductId::new();
        let alert = AlertEvent::from_allocation_error(
            &AllocationError::NoAvailableStock { product_id },
            3,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(alert.event_type(), "alerts.insufficient_stock");
        assert_eq!(alert.product_id(), product_id);

        let env = alert.to_envelope().unwrap();
        assert_eq!(env.stream_type(), "alerts.product");
        assert_eq!(env.payload()["InsufficientStock"]["requested"], 3);
    }

    #[test]
    fn rejected_explicit_location_raises_nothing() {
        let err = AllocationError::LocationRejected(PlacementViolation::QuantityOverflow {
            location: "A-01".into(),
            excess: 4,
        });
        assert!(AlertEvent::from_allocation_error(&err, 10, Utc::now()).is_none());
    }
}

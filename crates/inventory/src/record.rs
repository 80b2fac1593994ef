use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgewms_core::{DomainError, LocationId, LotId};

/// Usability of stock held in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    Available,
    Quarantine,
    Damaged,
    Transit,
}

impl FromStr for InventoryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Self::Available),
            "QUARANTINE" => Ok(Self::Quarantine),
            "DAMAGED" => Ok(Self::Damaged),
            "TRANSIT" => Ok(Self::Transit),
            other => Err(DomainError::validation(format!("unknown inventory status '{other}'"))),
        }
    }
}

/// Quantity of one lot at one location.
///
/// Keyed by `(lot_id, location_id)`. A record with zero quantity does not
/// exist: the ledger deletes it instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub lot_id: LotId,
    pub location_id: LocationId,
    pub quantity: i64,
    pub status: InventoryStatus,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn key(&self) -> (LotId, LocationId) {
        (self.lot_id, self.location_id)
    }

    pub fn is_available(&self) -> bool {
        self.status == InventoryStatus::Available && self.quantity > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tags_round_trip_at_the_boundary() {
        for tag in ["AVAILABLE", "QUARANTINE", "DAMAGED", "TRANSIT"] {
            let status: InventoryStatus = tag.parse().unwrap();
            assert_eq!(serde_json::to_string(&status).unwrap(), format!("\"{tag}\""));
        }
        assert!("LOST".parse::<InventoryStatus>().is_err());
    }

    #[test]
    fn quarantined_stock_is_not_available() {
        let record = InventoryRecord {
            lot_id: LotId::new(),
            location_id: LocationId::new(),
            quantity: 4,
            status: InventoryStatus::Quarantine,
            updated_at: Utc::now(),
        };
        assert!(!record.is_available());
    }
}

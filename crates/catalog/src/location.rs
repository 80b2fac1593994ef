use serde::{Deserialize, Serialize};

use forgewms_core::{DomainError, DomainResult, Entity, LocationId, SubWarehouseId};

/// Location-type tag shared by products (required type) and locations
/// (offered type). Compatibility is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationType(String);

impl LocationType {
    pub fn new(tag: impl Into<String>) -> DomainResult<Self> {
        let tag = tag.into();
        if tag.trim().is_empty() {
            return Err(DomainError::validation("location type cannot be empty"));
        }
        Ok(Self(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for LocationType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A zone of the warehouse grouping locations (e.g. a cold room).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubWarehouse {
    pub id: SubWarehouseId,
    pub code: String,
    pub name: String,
}

impl SubWarehouse {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: SubWarehouseId::new(),
            code: code.into(),
            name: name.into(),
        }
    }
}

impl Entity for SubWarehouse {
    type Id = SubWarehouseId;

    fn id(&self) -> SubWarehouseId {
        self.id
    }
}

/// A physical storage slot.
///
/// `max_weight` and `max_quantity` are soft limits: they are checked when a
/// location is chosen for placement, not on every ledger mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub code: String,
    pub location_type: LocationType,
    pub sub_warehouse: Option<SubWarehouseId>,
    /// Kilograms.
    pub max_weight: f64,
    /// Units.
    pub max_quantity: i64,
    pub is_overflow: bool,
}

impl Location {
    pub fn new(
        code: impl Into<String>,
        location_type: LocationType,
        max_quantity: i64,
        max_weight: f64,
    ) -> Self {
        Self {
            id: LocationId::new(),
            code: code.into(),
            location_type,
            sub_warehouse: None,
            max_weight,
            max_quantity,
            is_overflow: false,
        }
    }

    pub fn overflow(mut self) -> Self {
        self.is_overflow = true;
        self
    }

    pub fn in_sub_warehouse(mut self, sub_warehouse: SubWarehouseId) -> Self {
        self.sub_warehouse = Some(sub_warehouse);
        self
    }

    pub fn accepts(&self, location_type: &LocationType) -> bool {
        &self.location_type == location_type
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("location code cannot be empty"));
        }
        if self.max_quantity < 0 {
            return Err(DomainError::validation("max quantity cannot be negative"));
        }
        if !self.max_weight.is_finite() || self.max_weight < 0.0 {
            return Err(DomainError::validation("max weight must be a non-negative number"));
        }
        Ok(())
    }
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> LocationId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_location_type_is_rejected() {
        assert!(LocationType::new("  ").is_err());
    }

    #[test]
    fn compatibility_is_exact() {
        let pallet = LocationType::new("PALLET").unwrap();
        let location = Location::new("A-01", pallet.clone(), 10, 100.0);
        assert!(location.accepts(&pallet));
        assert!(!location.accepts(&LocationType::new("pallet").unwrap()));
        assert!(!location.accepts(&LocationType::new("PALLET-XL").unwrap()));
    }

    #[test]
    fn negative_capacity_is_rejected() {
        let location = Location::new("A-01", LocationType::new("PALLET").unwrap(), -1, 100.0);
        assert!(location.validate().is_err());
    }
}

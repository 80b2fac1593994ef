use core::str::FromStr;

use serde::{Deserialize, Serialize};

use forgewms_core::{DomainError, DomainResult, Entity, ProductId};

use crate::location::LocationType;

/// Turnover class used for slotting decisions by collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotationClass {
    High,
    Medium,
    Low,
}

impl FromStr for RotationClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            other => Err(DomainError::validation(format!("unknown rotation class '{other}'"))),
        }
    }
}

/// Storage temperature window in degrees Celsius (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min_celsius: f64,
    pub max_celsius: f64,
}

/// Product master data.
///
/// Read-only input to placement and allocation; never modified while tasks
/// are executing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    /// Weight of one unit, in kilograms.
    pub unit_weight: f64,
    /// Volume of one unit, in cubic metres.
    pub unit_volume: f64,
    /// Location type this product must be stored in.
    pub location_type: LocationType,
    pub rotation: RotationClass,
    pub risk_category: Option<String>,
    pub temperature_range: Option<TemperatureRange>,
}

impl Product {
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_weight: f64,
        location_type: LocationType,
    ) -> Self {
        Self {
            id: ProductId::new(),
            sku: sku.into(),
            name: name.into(),
            unit_weight,
            unit_volume: 0.0,
            location_type,
            rotation: RotationClass::Medium,
            risk_category: None,
            temperature_range: None,
        }
    }

    pub fn with_temperature_range(mut self, range: TemperatureRange) -> Self {
        self.temperature_range = Some(range);
        self
    }

    /// Total weight of `quantity` units.
    pub fn weight_of(&self, quantity: i64) -> f64 {
        self.unit_weight * quantity as f64
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("product sku cannot be empty"));
        }
        if !self.unit_weight.is_finite() || self.unit_weight < 0.0 {
            return Err(DomainError::validation("unit weight must be a non-negative number"));
        }
        if !self.unit_volume.is_finite() || self.unit_volume < 0.0 {
            return Err(DomainError::validation("unit volume must be a non-negative number"));
        }
        if let Some(range) = &self.temperature_range {
            if range.min_celsius > range.max_celsius {
                return Err(DomainError::validation(
                    "temperature range minimum exceeds maximum",
                ));
            }
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

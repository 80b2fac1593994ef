//! JSON scenario format.
//!
//! Catalog entries are referenced by code (product SKU, lot code, location
//! code); orders and operators by any name; tasks by the position in which
//! the scenario created them (0 = first task created).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub products: Vec<ProductSpec>,
    #[serde(default)]
    pub locations: Vec<LocationSpec>,
    #[serde(default)]
    pub lots: Vec<LotSpec>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub sku: String,
    pub name: String,
    /// Kilograms per unit.
    pub unit_weight: f64,
    pub location_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSpec {
    pub code: String,
    pub location_type: String,
    pub max_quantity: i64,
    pub max_weight: f64,
    #[serde(default)]
    pub overflow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotSpec {
    pub code: String,
    pub sku: String,
    pub manufactured_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub original_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickLineSpec {
    pub sku: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    AddStock {
        lot: String,
        location: String,
        quantity: i64,
    },
    RemoveStock {
        lot: String,
        location: String,
        quantity: i64,
    },
    MoveStock {
        lot: String,
        from: String,
        to: String,
        quantity: i64,
    },
    AdjustStock {
        lot: String,
        location: String,
        quantity: i64,
    },
    /// Putaway to the engine's choice, or to `location` when given.
    Putaway {
        order: String,
        lot: String,
        quantity: i64,
        #[serde(default)]
        location: Option<String>,
        #[serde(default)]
        user: Option<String>,
    },
    Pick {
        order: String,
        lines: Vec<PickLineSpec>,
        #[serde(default)]
        user: Option<String>,
    },
    Assign {
        task: usize,
        operator: String,
    },
    Scan {
        task: usize,
        scan_type: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        quantity: Option<i64>,
        #[serde(default)]
        user: Option<String>,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::AddStock { .. } => "add_stock",
            Operation::RemoveStock { .. } => "remove_stock",
            Operation::MoveStock { .. } => "move_stock",
            Operation::AdjustStock { .. } => "adjust_stock",
            Operation::Putaway { .. } => "putaway",
            Operation::Pick { .. } => "pick",
            Operation::Assign { .. } => "assign",
            Operation::Scan { .. } => "scan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_are_tagged_by_name() {
        let op: Operation = serde_json::from_str(
            r#"{"op":"scan","task":0,"scan_type":"quantity","quantity":4}"#,
        )
        .unwrap();
        assert_eq!(
            op,
            Operation::Scan {
                task: 0,
                scan_type: "quantity".into(),
                value: String::new(),
                quantity: Some(4),
                user: None,
            }
        );
        assert_eq!(op.name(), "scan");
    }

    #[test]
    fn unknown_operations_are_rejected() {
        let parsed = serde_json::from_str::<Operation>(r#"{"op":"teleport","lot":"L-1"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn bundled_scenario_parses() {
        let scenario: Scenario =
            serde_json::from_str(include_str!("../scenarios/putaway_and_pick.json")).unwrap();
        assert_eq!(scenario.products.len(), 2);
        assert!(!scenario.operations.is_empty());
    }
}

//! Operator scans and the outcome reported back for each one.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use forgewms_core::{DomainError, DomainResult, TaskDetailId};

use crate::task::TaskState;

/// Step of the scan sequence: location, then lot, then quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStep {
    Location,
    Lot,
    Quantity,
}

impl ScanStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStep::Location => "location",
            ScanStep::Lot => "lot",
            ScanStep::Quantity => "quantity",
        }
    }
}

impl core::fmt::Display for ScanStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStep {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "location" => Ok(Self::Location),
            "lot" => Ok(Self::Lot),
            "quantity" => Ok(Self::Quantity),
            other => Err(DomainError::validation(format!("unknown scan type '{other}'"))),
        }
    }
}

/// A single scan as read by the operator's device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Scan {
    Location(String),
    Lot(String),
    Quantity(i64),
}

impl Scan {
    /// Build a scan from boundary strings.
    ///
    /// Quantity scans take `quantity` when given, otherwise `value` must
    /// hold an integer.
    pub fn parse(scan_type: &str, value: &str, quantity: Option<i64>) -> DomainResult<Self> {
        match scan_type.parse::<ScanStep>()? {
            ScanStep::Location => Ok(Scan::Location(value.trim().to_string())),
            ScanStep::Lot => Ok(Scan::Lot(value.trim().to_string())),
            ScanStep::Quantity => match quantity {
                Some(q) => Ok(Scan::Quantity(q)),
                None => value.trim().parse::<i64>().map(Scan::Quantity).map_err(|_| {
                    DomainError::validation(format!("quantity scan needs a number, got '{value}'"))
                }),
            },
        }
    }

    pub fn step(&self) -> ScanStep {
        match self {
            Scan::Location(_) => ScanStep::Location,
            Scan::Lot(_) => ScanStep::Lot,
            Scan::Quantity(_) => ScanStep::Quantity,
        }
    }
}

/// Quantities reported alongside a successful lot or quantity scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepData {
    pub detail_id: TaskDetailId,
    /// Quantity of the lot currently at the line's location.
    pub available: i64,
    /// Quantity still to be scanned on the line.
    pub pending: i64,
    pub completed: i64,
    pub task_state: TaskState,
}

/// Result of validating one scan.
///
/// `success == false` is a recoverable rejection: nothing changed and the
/// operator rescans. Hard failures are returned as `TaskError` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub success: bool,
    pub message: String,
    pub next_step: Option<ScanStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StepData>,
}

impl StepOutcome {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            next_step: None,
            data: None,
        }
    }

    pub fn accepted(message: impl Into<String>, next_step: Option<ScanStep>) -> Self {
        Self {
            success: true,
            message: message.into(),
            next_step,
            data: None,
        }
    }

    pub fn with_data(mut self, data: StepData) -> Self {
        self.data = Some(data);
        self
    }
}

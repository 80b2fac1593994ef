use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use forgewms_core::{DomainError, DomainResult, Entity, LotId, ProductId};

/// A traceable batch of one product.
///
/// Created once at receipt. Never removed while inventory or movement
/// history references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub code: String,
    pub product_id: ProductId,
    pub manufactured_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub original_quantity: i64,
}

impl Lot {
    pub fn new(
        code: impl Into<String>,
        product_id: ProductId,
        manufactured_on: NaiveDate,
        expires_on: NaiveDate,
        original_quantity: i64,
    ) -> Self {
        Self {
            id: LotId::new(),
            code: code.into(),
            product_id,
            manufactured_on,
            expires_on,
            original_quantity,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("lot code cannot be empty"));
        }
        if self.expires_on < self.manufactured_on {
            return Err(DomainError::validation(format!(
                "lot {} expires ({}) before it was manufactured ({})",
                self.code, self.expires_on, self.manufactured_on
            )));
        }
        if self.original_quantity <= 0 {
            return Err(DomainError::validation("lot original quantity must be positive"));
        }
        Ok(())
    }
}

impl Entity for Lot {
    type Id = LotId;

    fn id(&self) -> LotId {
        self.id
    }
}

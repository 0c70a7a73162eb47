use crate::CoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Discount carried by a validated code. Percent applies to the ticket
/// subtotal; Amount is a fixed number of cents capped at that subtotal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeDiscount {
    Percent(f64),
    Amount(i64),
}

/// A discount code accepted by the validation service. Mutually exclusive
/// with offer-level discounts: while a code is applied, offer discounts
/// contribute nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedDiscountCode {
    pub id: Uuid,
    pub code: String,
    pub discount: CodeDiscount,
}

#[async_trait]
pub trait DiscountValidator: Send + Sync {
    /// Validate a code for an event. `Ok(None)` means the code is invalid;
    /// `Err` is a transport failure and leaves any applied code untouched.
    async fn validate_code(
        &self,
        code: &str,
        event_id: Uuid,
    ) -> CoreResult<Option<AppliedDiscountCode>>;
}

/// Fixed code table for tests and local development.
pub struct StaticDiscountValidator {
    codes: HashMap<String, AppliedDiscountCode>,
}

impl StaticDiscountValidator {
    pub fn new(codes: Vec<AppliedDiscountCode>) -> Self {
        Self {
            codes: codes
                .into_iter()
                .map(|c| (c.code.to_ascii_uppercase(), c))
                .collect(),
        }
    }
}

#[async_trait]
impl DiscountValidator for StaticDiscountValidator {
    async fn validate_code(
        &self,
        code: &str,
        _event_id: Uuid,
    ) -> CoreResult<Option<AppliedDiscountCode>> {
        Ok(self.codes.get(&code.to_ascii_uppercase()).cloned())
    }
}

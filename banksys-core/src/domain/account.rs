//! Account balance and credit card domain models
//!
//! Monetary values are trusted from the backend; the client never derives
//! or adjusts them.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::wire::{deserialize_amount, deserialize_timestamp};

/// Current balance of the user's checking account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    #[serde(deserialize_with = "deserialize_amount")]
    pub balance: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub available_balance: Decimal,
    pub account_number: String,
}

/// A credit card as listed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCard {
    pub id: String,
    /// Masked card number (e.g. `**** **** **** 1234`)
    pub card_number: String,
    pub card_name: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub credit_limit: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub available_limit: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub current_balance: Decimal,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub due_date: NaiveDateTime,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub minimum_payment: Decimal,
}

impl CreditCard {
    /// Last four digits of the masked number, for compact display
    pub fn last_four(&self) -> &str {
        let digits = self.card_number.trim();
        let start = digits.len().saturating_sub(4);
        digits.get(start..).unwrap_or(digits)
    }
}

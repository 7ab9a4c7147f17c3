//! Transaction domain model

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::wire::{deserialize_amount, deserialize_optional_amount, deserialize_timestamp};

/// Smallest amount the backend accepts for a transaction
pub const MIN_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Debit,
    Credit,
    PixSent,
    PixReceived,
    BillPayment,
    Transfer,
    MobileTopup,
    Investment,
    LoanPayment,
}

impl TransactionType {
    pub const ALL: [TransactionType; 9] = [
        Self::Debit,
        Self::Credit,
        Self::PixSent,
        Self::PixReceived,
        Self::BillPayment,
        Self::Transfer,
        Self::MobileTopup,
        Self::Investment,
        Self::LoanPayment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::PixSent => "pix_sent",
            Self::PixReceived => "pix_received",
            Self::BillPayment => "bill_payment",
            Self::Transfer => "transfer",
            Self::MobileTopup => "mobile_topup",
            Self::Investment => "investment",
            Self::LoanPayment => "loan_payment",
        }
    }

    /// Money coming into the account
    pub fn is_inflow(&self) -> bool {
        matches!(self, Self::Credit | Self::PixReceived)
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| Error::validation(format!("Unknown transaction type: {}", s)))
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spending category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    Food,
    Transport,
    Shopping,
    Entertainment,
    Bills,
    Health,
    Education,
    Investment,
    Transfer,
    #[default]
    Other,
}

impl TransactionCategory {
    pub const ALL: [TransactionCategory; 10] = [
        Self::Food,
        Self::Transport,
        Self::Shopping,
        Self::Entertainment,
        Self::Bills,
        Self::Health,
        Self::Education,
        Self::Investment,
        Self::Transfer,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Transport => "transport",
            Self::Shopping => "shopping",
            Self::Entertainment => "entertainment",
            Self::Bills => "bills",
            Self::Health => "health",
            Self::Education => "education",
            Self::Investment => "investment",
            Self::Transfer => "transfer",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| Error::validation(format!("Unknown category: {}", s)))
    }
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction record as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub category: TransactionCategory,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    pub description: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub transaction_date: NaiveDateTime,
    /// pending, completed or failed
    pub status: String,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub balance_after: Option<Decimal>,
}

impl Transaction {
    /// Counterparty shown next to the description
    pub fn counterparty(&self) -> Option<&str> {
        self.merchant_name
            .as_deref()
            .or(self.recipient_name.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Draft sent to the create endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
}

impl NewTransaction {
    pub fn new(
        transaction_type: TransactionType,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            transaction_type,
            category: TransactionCategory::default(),
            amount,
            description: description.into(),
            merchant_name: None,
            pix_key: None,
            recipient_name: None,
        }
    }

    pub fn with_category(mut self, category: TransactionCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant_name = Some(merchant.into());
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient_name = Some(recipient.into());
        self
    }

    /// Reject drafts the backend would refuse, before any request is sent
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;
        if self.description.trim().is_empty() {
            return Err(Error::validation("Description is required"));
        }
        Ok(())
    }
}

/// PIX instant payment request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixPayment {
    /// CPF, email, phone, or random key
    pub pix_key: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    pub recipient_name: String,
}

impl PixPayment {
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;
        if self.pix_key.trim().is_empty() {
            return Err(Error::validation("PIX key is required"));
        }
        if self.recipient_name.trim().is_empty() {
            return Err(Error::validation("Recipient name is required"));
        }
        if self.description.trim().is_empty() {
            return Err(Error::validation("Description is required"));
        }
        Ok(())
    }
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount < MIN_AMOUNT {
        return Err(Error::validation(format!(
            "Amount must be at least {}",
            MIN_AMOUNT
        )));
    }
    if amount.scale() > 2 && amount.round_dp(2) != amount {
        return Err(Error::validation("Amount cannot have more than 2 decimal places"));
    }
    Ok(())
}

/// Spending in a single month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySpending {
    pub month: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
}

/// Spending per category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
}

/// Spending per merchant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantSpending {
    pub merchant: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
}

/// Server-computed spending analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAnalytics {
    #[serde(deserialize_with = "deserialize_amount")]
    pub total_income: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub total_expenses: Decimal,
    #[serde(default)]
    pub monthly_spending: Vec<MonthlySpending>,
    #[serde(default)]
    pub category_breakdown: Vec<CategorySpending>,
    #[serde(default)]
    pub top_merchants: Vec<MerchantSpending>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_from_backend_payload() {
        let json = r#"{
            "id": "t1", "transaction_type": "pix_sent", "category": "transfer",
            "amount": 200.0, "description": "Payment to friend",
            "recipient_name": "João Silva", "transaction_date": "2024-01-14T09:00:00.512000",
            "status": "completed", "balance_after": 5220.5
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.transaction_type, TransactionType::PixSent);
        assert_eq!(tx.category, TransactionCategory::Transfer);
        assert_eq!(tx.amount, Decimal::new(200, 0));
        assert_eq!(tx.counterparty(), Some("João Silva"));
        assert_eq!(tx.balance_after, Some(Decimal::new(52205, 1)));
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let json = r#"{"id": "t1", "transaction_type": "teleport", "amount": 1,
                       "description": "x", "transaction_date": "2024-01-14",
                       "status": "completed"}"#;
        assert!(serde_json::from_str::<Transaction>(json).is_err());
    }

    #[test]
    fn test_missing_category_defaults_to_other() {
        let json = r#"{"id": "t1", "transaction_type": "debit", "amount": 1,
                       "description": "x", "transaction_date": "2024-01-14",
                       "status": "completed"}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.category, TransactionCategory::Other);
    }

    #[test]
    fn test_new_transaction_serializes_amount_as_number() {
        let draft = NewTransaction::new(TransactionType::Debit, Decimal::new(8950, 2), "Groceries")
            .with_category(TransactionCategory::Food)
            .with_merchant("Mercado");
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["amount"], serde_json::json!(89.5));
        assert_eq!(value["transaction_type"], "debit");
        assert_eq!(value["category"], "food");
        assert!(value.get("pix_key").is_none());
    }

    #[test]
    fn test_new_transaction_validation() {
        let ok = NewTransaction::new(TransactionType::Debit, Decimal::new(1, 2), "Gum");
        assert!(ok.validate().is_ok());

        let zero = NewTransaction::new(TransactionType::Debit, Decimal::ZERO, "Nothing");
        assert!(matches!(zero.validate(), Err(Error::Validation(_))));

        let fractional = NewTransaction::new(TransactionType::Debit, Decimal::new(1001, 3), "x");
        assert!(fractional.validate().is_err());

        let blank = NewTransaction::new(TransactionType::Debit, Decimal::new(500, 2), "  ");
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_pix_validation() {
        let pix = PixPayment {
            pix_key: "joao@email.com".to_string(),
            amount: Decimal::new(5000, 2),
            description: "Dinner".to_string(),
            recipient_name: String::new(),
        };
        assert!(pix.validate().is_err());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!(TransactionType::parse("PIX_SENT").unwrap(), TransactionType::PixSent);
        assert!(TransactionType::parse("nope").is_err());
        assert_eq!(
            TransactionCategory::parse("health").unwrap(),
            TransactionCategory::Health
        );
        assert!(TransactionType::Credit.is_inflow());
        assert!(!TransactionType::BillPayment.is_inflow());
    }
}

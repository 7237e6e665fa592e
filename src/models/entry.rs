use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Largest amount a single entry may carry (10^15). Keeps every sum the
/// aggregator forms far inside `Decimal`'s range.
pub(crate) const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum EntryType {
    Income,
    Expense,
}

impl EntryType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" | "in" | "i" => Some(Self::Income),
            "expense" | "expenses" | "out" | "e" => Some(Self::Expense),
            _ => None,
        }
    }

    pub(crate) fn all() -> &'static [EntryType] {
        &[Self::Income, Self::Expense]
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One income or expense record as held in a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Entry {
    pub id: String,
    pub kind: EntryType,
    pub amount: Decimal,
    pub category: String,
    pub remarks: String,
    pub date: NaiveDate,
}

impl Entry {
    pub(crate) fn is_expense(&self) -> bool {
        self.kind == EntryType::Expense
    }

    pub(crate) fn to_document(&self) -> EntryDocument {
        EntryDocument {
            kind: self.kind,
            amount: self.amount,
            category: self.category.clone(),
            remarks: self.remarks.clone(),
            date: self.date,
        }
    }
}

/// Stored body of an entry document. The id lives in the document key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct EntryDocument {
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub amount: Decimal,
    pub category: String,
    #[serde(default)]
    pub remarks: String,
    pub date: NaiveDate,
}

impl EntryDocument {
    /// Stored bodies are written by other clients too; anything past the
    /// amount bound is treated as unreadable.
    pub(crate) fn amount_in_range(&self) -> bool {
        self.amount.abs() <= MAX_AMOUNT
    }

    pub(crate) fn into_entry(self, id: String) -> Entry {
        Entry {
            id,
            kind: self.kind,
            amount: self.amount,
            category: self.category,
            remarks: self.remarks,
            date: self.date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ValidationError {
    #[error("amount is required")]
    MissingAmount,
    #[error("amount '{0}' is not a number")]
    InvalidAmount(String),
    #[error("amount cannot be negative")]
    NegativeAmount,
    #[error("amount cannot exceed {}", MAX_AMOUNT)]
    AmountTooLarge,
    #[error("category is required")]
    MissingCategory,
    #[error("date '{0}' is not a valid YYYY-MM-DD date")]
    InvalidDate(String),
    #[error("category name cannot be empty")]
    EmptyCategoryName,
    #[error("category '{0}' already exists")]
    DuplicateCategory(String),
}

/// Raw form input for creating or editing an entry.
#[derive(Debug, Clone)]
pub(crate) struct EntryDraft {
    pub kind: EntryType,
    pub amount: String,
    pub category: String,
    pub remarks: String,
    pub date: String,
}

impl EntryDraft {
    pub(crate) fn from_entry(entry: &Entry) -> Self {
        Self {
            kind: entry.kind,
            amount: entry.amount.to_string(),
            category: entry.category.clone(),
            remarks: entry.remarks.clone(),
            date: entry.date.format("%Y-%m-%d").to_string(),
        }
    }

    pub(crate) fn validate(&self) -> Result<EntryDocument, ValidationError> {
        let raw_amount = self.amount.trim();
        if raw_amount.is_empty() {
            return Err(ValidationError::MissingAmount);
        }
        let amount = parse_amount(raw_amount)
            .ok_or_else(|| ValidationError::InvalidAmount(raw_amount.to_string()))?;
        if amount < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount);
        }
        if amount > MAX_AMOUNT {
            return Err(ValidationError::AmountTooLarge);
        }

        let category = self.category.trim();
        if category.is_empty() {
            return Err(ValidationError::MissingCategory);
        }

        let raw_date = self.date.trim();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(raw_date.to_string()))?;

        Ok(EntryDocument {
            kind: self.kind,
            amount,
            category: category.to_string(),
            remarks: self.remarks.trim().to_string(),
            date,
        })
    }
}

/// Accepts plain decimals plus currency symbols and thousand separators.
fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '₹' | '€' | '£' | ',' | ' '))
        .collect();
    Decimal::from_str(&cleaned).ok()
}

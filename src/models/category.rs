use serde::{Deserialize, Serialize};

use super::{EntryType, ValidationError};

pub(crate) const DEFAULT_INCOME_CATEGORIES: &[&str] = &[
    "Salary",
    "Business",
    "Freelance",
    "Investments",
    "Rental Income",
    "Gifts",
    "Other",
];

pub(crate) const DEFAULT_EXPENSE_CATEGORIES: &[&str] = &[
    "Food",
    "Groceries",
    "Rent",
    "Utilities",
    "Transport",
    "Shopping",
    "Entertainment",
    "Health",
    "Education",
    "Bills",
    "Other",
];

/// Ordered, per-type list of category names owned by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CategoryList {
    pub kind: EntryType,
    pub categories: Vec<String>,
}

impl CategoryList {
    pub(crate) fn defaults(kind: EntryType) -> Self {
        let seed = match kind {
            EntryType::Income => DEFAULT_INCOME_CATEGORIES,
            EntryType::Expense => DEFAULT_EXPENSE_CATEGORIES,
        };
        Self {
            kind,
            categories: seed.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Document key the list is stored under inside a user collection.
    pub(crate) fn document_id(kind: EntryType) -> &'static str {
        match kind {
            EntryType::Income => "IncomeCategoryList",
            EntryType::Expense => "ExpenseCategoryList",
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c == name)
    }

    /// Find a category by name ignoring case.
    pub(crate) fn find_by_name(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.categories
            .iter()
            .find(|c| c.to_lowercase() == lower)
            .map(|c| c.as_str())
    }

    /// Append a trimmed name. Names are unique within a list.
    pub(crate) fn add(&mut self, name: &str) -> Result<String, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyCategoryName);
        }
        if self.contains(name) {
            return Err(ValidationError::DuplicateCategory(name.to_string()));
        }
        self.categories.push(name.to_string());
        Ok(name.to_string())
    }

    /// Returns false when the name was not in the list.
    pub(crate) fn remove(&mut self, name: &str) -> bool {
        let before = self.categories.len();
        self.categories.retain(|c| c != name.trim());
        self.categories.len() != before
    }

    pub(crate) fn to_document(&self) -> CategoryListDocument {
        CategoryListDocument {
            categories: self.categories.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct CategoryListDocument {
    #[serde(default)]
    pub categories: Vec<String>,
}

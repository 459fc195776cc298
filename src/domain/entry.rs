use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Amount;

pub type EntryId = i64;

/// The four kinds of records kept in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Client,
    Invoice,
    Revenue,
    Expense,
}

impl EntryKind {
    pub const ALL: [EntryKind; 4] = [
        EntryKind::Client,
        EntryKind::Invoice,
        EntryKind::Revenue,
        EntryKind::Expense,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Client => "client",
            EntryKind::Invoice => "invoice",
            EntryKind::Revenue => "revenue",
            EntryKind::Expense => "expense",
        }
    }

    /// Accepts singular or plural names ("client", "clients", "expenses", ...).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "client" | "clients" => Some(EntryKind::Client),
            "invoice" | "invoices" => Some(EntryKind::Invoice),
            "revenue" | "revenues" => Some(EntryKind::Revenue),
            "expense" | "expenses" => Some(EntryKind::Expense),
            _ => None,
        }
    }

    /// Whether records of this kind carry a summable amount.
    pub fn has_amount(&self) -> bool {
        !matches!(self, EntryKind::Client)
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Money received, outside of invoicing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueEntry {
    pub id: EntryId,
    /// Where the money came from
    pub source: String,
    pub amount: Amount,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl RevenueEntry {
    /// Create a new revenue entry. The id is assigned by the repository on insert.
    pub fn new(source: impl Into<String>, amount: Amount, date: NaiveDate) -> Self {
        Self {
            id: 0,
            source: source.into(),
            amount,
            description: None,
            date,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Money spent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub id: EntryId,
    pub description: String,
    pub amount: Amount,
    pub category: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl ExpenseEntry {
    /// Create a new expense entry. The id is assigned by the repository on insert.
    pub fn new(description: impl Into<String>, amount: Amount, date: NaiveDate) -> Self {
        Self {
            id: 0,
            description: description.into(),
            amount,
            category: None,
            date,
            created_at: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_roundtrip() {
        for kind in EntryKind::ALL {
            assert_eq!(EntryKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(EntryKind::from_str("Expenses"), Some(EntryKind::Expense));
        assert_eq!(EntryKind::from_str("wallets"), None);
    }

    #[test]
    fn test_only_clients_lack_amount() {
        assert!(!EntryKind::Client.has_amount());
        assert!(EntryKind::Invoice.has_amount());
        assert!(EntryKind::Revenue.has_amount());
        assert!(EntryKind::Expense.has_amount());
    }
}

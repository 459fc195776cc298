use chrono::NaiveDate;

use crate::domain::{ClientId, EntryKind};

/// Listing order. Dated orders use the entry date (creation time for clients)
/// with ties broken by id; `Inserted` is plain id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    Inserted,
}

impl SortOrder {
    fn keyword(&self) -> &'static str {
        match self {
            SortOrder::NewestFirst => "DESC",
            SortOrder::OldestFirst | SortOrder::Inserted => "ASC",
        }
    }
}

/// Equality and date-range filters for listing and summing entries.
///
/// Filters that do not apply to a kind are ignored: `category` only narrows
/// expenses, `source` only narrows revenue, and the client filters narrow
/// clients and invoices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub client_id: Option<ClientId>,
    pub client_name: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn client_id(mut self, id: ClientId) -> Self {
        self.client_id = Some(id);
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Inclusive date range; either bound may be open.
    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from_date = from;
        self.to_date = to;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlValue {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WhereClause {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

pub(crate) fn table_name(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Client => "clients",
        EntryKind::Invoice => "invoices",
        EntryKind::Revenue => "revenue",
        EntryKind::Expense => "expenses",
    }
}

/// Column prefix used in queries. Invoices are joined with clients, so their
/// columns are qualified.
fn prefix(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Invoice => "i.",
        _ => "",
    }
}

fn date_column(kind: EntryKind) -> String {
    match kind {
        EntryKind::Client => "substr(created_at, 1, 10)".to_string(),
        _ => format!("{}date", prefix(kind)),
    }
}

impl EntryFilter {
    /// Build the `WHERE` clause for `kind`. Always starts with `WHERE 1=1`.
    pub(crate) fn where_clause(&self, kind: EntryKind) -> WhereClause {
        let p = prefix(kind);
        let mut sql = String::from(" WHERE 1=1");
        let mut values = Vec::new();

        match kind {
            EntryKind::Client => {
                if let Some(id) = self.client_id {
                    sql.push_str(" AND id = ?");
                    values.push(SqlValue::Int(id));
                }
                if let Some(name) = &self.client_name {
                    sql.push_str(" AND name = ?");
                    values.push(SqlValue::Text(name.clone()));
                }
            }
            EntryKind::Invoice => {
                if let Some(id) = self.client_id {
                    sql.push_str(&format!(" AND {}client_id = ?", p));
                    values.push(SqlValue::Int(id));
                }
                if let Some(name) = &self.client_name {
                    sql.push_str(&format!(" AND {}client_name = ?", p));
                    values.push(SqlValue::Text(name.clone()));
                }
            }
            EntryKind::Revenue => {
                if let Some(source) = &self.source {
                    sql.push_str(" AND source = ?");
                    values.push(SqlValue::Text(source.clone()));
                }
            }
            EntryKind::Expense => {
                if let Some(category) = &self.category {
                    sql.push_str(" AND category = ?");
                    values.push(SqlValue::Text(category.clone()));
                }
            }
        }

        let date_col = date_column(kind);
        if let Some(from) = self.from_date {
            sql.push_str(&format!(" AND {} >= ?", date_col));
            values.push(SqlValue::Text(from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to_date {
            sql.push_str(&format!(" AND {} <= ?", date_col));
            values.push(SqlValue::Text(to.format("%Y-%m-%d").to_string()));
        }

        WhereClause { sql, values }
    }

    /// `ORDER BY` and optional `LIMIT` for listing `kind`.
    pub(crate) fn order_clause(&self, kind: EntryKind, order: SortOrder) -> String {
        let p = prefix(kind);
        let key = match kind {
            EntryKind::Client => "created_at".to_string(),
            _ => format!("{}date", p),
        };
        let dir = order.keyword();
        let mut sql = match order {
            SortOrder::Inserted => format!(" ORDER BY {}id ASC", p),
            _ => format!(" ORDER BY {} {}, {}id {}", key, dir, p, dir),
        };
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql
    }
}

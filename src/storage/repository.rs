use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::debug;
use sqlx::sqlite::{SqliteArguments, SqlitePoolOptions, SqliteRow};
use sqlx::{query::Query, Row, Sqlite, SqlitePool};

use crate::domain::{
    Client, ClientId, ClientRef, Country, EntryId, EntryKind, ExpenseEntry, Invoice, InvoiceId,
    RevenueEntry,
};

use super::filter::{table_name, SqlValue};
use super::{EntryFilter, SortOrder, MIGRATION_001_INITIAL};

const CLIENT_SELECT: &str = "SELECT id, name, country, contact, created_at FROM clients";

const INVOICE_SELECT: &str = r#"
    SELECT i.id, i.client_id, i.client_name, i.amount, i.tax, i.description, i.date, i.created_at,
           c.id AS live_client_id
    FROM invoices i
    LEFT JOIN clients c ON c.id = i.client_id"#;

const REVENUE_SELECT: &str =
    "SELECT id, source, amount, description, date, created_at FROM revenue";

const EXPENSE_SELECT: &str =
    "SELECT id, description, amount, category, date, created_at FROM expenses";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Where the store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Lives as long as the repository; nothing touches the disk.
    Memory,
    /// A SQLite database file, created if missing.
    File(String),
}

impl StoreLocation {
    /// `":memory:"` selects the in-memory store, anything else is a file path.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            ":memory:" | "memory" => StoreLocation::Memory,
            path => StoreLocation::File(path.to_string()),
        }
    }
}

impl std::fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreLocation::Memory => write!(f, ":memory:"),
            StoreLocation::File(path) => write!(f, "{}", path),
        }
    }
}

/// Repository for persisting and querying clients, invoices, revenue and expenses.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Open a private in-memory database.
    ///
    /// Every pooled connection to `sqlite::memory:` gets its own database, so the
    /// pool is pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;
        Ok(Self::new(pool))
    }

    /// Open the store at `location` and run migrations.
    pub async fn open(location: &StoreLocation) -> Result<Self> {
        let repo = match location {
            StoreLocation::Memory => Self::in_memory().await?,
            StoreLocation::File(path) => Self::connect(&format!("sqlite:{}?mode=rwc", path)).await?,
        };
        repo.migrate().await?;
        debug!("Opened store at {}", location);
        Ok(repo)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Release every connection. The repository cannot be used afterwards.
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Closed store");
    }

    // ========================
    // Inserts
    // ========================

    /// Save a new client and assign its id.
    pub async fn insert_client(&self, client: &mut Client) -> Result<ClientId> {
        let result = sqlx::query(
            "INSERT INTO clients (name, country, contact, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&client.name)
        .bind(client.country.as_str())
        .bind(&client.contact)
        .bind(timestamp(&client.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save client")?;

        client.id = result.last_insert_rowid();
        debug!("Inserted client {} ({})", client.id, client.name);
        Ok(client.id)
    }

    /// Save a new invoice and assign its id.
    pub async fn insert_invoice(&self, invoice: &mut Invoice) -> Result<InvoiceId> {
        let result = sqlx::query(
            r#"
            INSERT INTO invoices (client_id, client_name, amount, tax, description, date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invoice.client.id())
        .bind(invoice.client.name())
        .bind(invoice.amount)
        .bind(invoice.tax)
        .bind(&invoice.description)
        .bind(invoice.date.format(DATE_FORMAT).to_string())
        .bind(timestamp(&invoice.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save invoice")?;

        invoice.id = result.last_insert_rowid();
        debug!("Inserted invoice {} for {}", invoice.id, invoice.client.name());
        Ok(invoice.id)
    }

    /// Save a new revenue entry and assign its id.
    pub async fn insert_revenue(&self, entry: &mut RevenueEntry) -> Result<EntryId> {
        let result = sqlx::query(
            "INSERT INTO revenue (source, amount, description, date, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&entry.source)
        .bind(entry.amount)
        .bind(&entry.description)
        .bind(entry.date.format(DATE_FORMAT).to_string())
        .bind(timestamp(&entry.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save revenue entry")?;

        entry.id = result.last_insert_rowid();
        debug!("Inserted revenue entry {}", entry.id);
        Ok(entry.id)
    }

    /// Save a new expense entry and assign its id.
    pub async fn insert_expense(&self, entry: &mut ExpenseEntry) -> Result<EntryId> {
        let result = sqlx::query(
            "INSERT INTO expenses (description, amount, category, date, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&entry.description)
        .bind(entry.amount)
        .bind(&entry.category)
        .bind(entry.date.format(DATE_FORMAT).to_string())
        .bind(timestamp(&entry.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save expense entry")?;

        entry.id = result.last_insert_rowid();
        debug!("Inserted expense entry {}", entry.id);
        Ok(entry.id)
    }

    // ========================
    // Queries
    // ========================

    /// Get a client by id.
    pub async fn get_client(&self, id: ClientId) -> Result<Option<Client>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", CLIENT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch client")?;

        row.as_ref().map(Self::row_to_client).transpose()
    }

    /// Get the first client registered under `name`.
    pub async fn get_client_by_name(&self, name: &str) -> Result<Option<Client>> {
        let row = sqlx::query(&format!("{} WHERE name = ? ORDER BY id LIMIT 1", CLIENT_SELECT))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch client by name")?;

        row.as_ref().map(Self::row_to_client).transpose()
    }

    /// List clients, ordered by creation time.
    pub async fn list_clients(&self, order: SortOrder, filter: &EntryFilter) -> Result<Vec<Client>> {
        let rows = self
            .fetch_filtered(CLIENT_SELECT, EntryKind::Client, order, filter)
            .await
            .context("Failed to list clients")?;
        rows.iter().map(Self::row_to_client).collect()
    }

    /// List invoices, ordered by issue date.
    pub async fn list_invoices(&self, order: SortOrder, filter: &EntryFilter) -> Result<Vec<Invoice>> {
        let rows = self
            .fetch_filtered(INVOICE_SELECT, EntryKind::Invoice, order, filter)
            .await
            .context("Failed to list invoices")?;
        rows.iter().map(Self::row_to_invoice).collect()
    }

    /// List revenue entries, ordered by date.
    pub async fn list_revenue(
        &self,
        order: SortOrder,
        filter: &EntryFilter,
    ) -> Result<Vec<RevenueEntry>> {
        let rows = self
            .fetch_filtered(REVENUE_SELECT, EntryKind::Revenue, order, filter)
            .await
            .context("Failed to list revenue")?;
        rows.iter().map(Self::row_to_revenue).collect()
    }

    /// List expense entries, ordered by date.
    pub async fn list_expenses(
        &self,
        order: SortOrder,
        filter: &EntryFilter,
    ) -> Result<Vec<ExpenseEntry>> {
        let rows = self
            .fetch_filtered(EXPENSE_SELECT, EntryKind::Expense, order, filter)
            .await
            .context("Failed to list expenses")?;
        rows.iter().map(Self::row_to_expense).collect()
    }

    async fn fetch_filtered(
        &self,
        select: &str,
        kind: EntryKind,
        order: SortOrder,
        filter: &EntryFilter,
    ) -> Result<Vec<SqliteRow>> {
        let clause = filter.where_clause(kind);
        let query = format!("{}{}{}", select, clause.sql, filter.order_clause(kind, order));

        let rows = bind_values(sqlx::query(&query), &clause.values)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ========================
    // Aggregates
    // ========================

    /// `SUM(amount)` over the matching entries of `kind`.
    /// Returns `None` when no row matches.
    pub async fn sum(&self, kind: EntryKind, filter: &EntryFilter) -> Result<Option<f64>> {
        if !kind.has_amount() {
            anyhow::bail!("Records of kind '{}' have no amount to sum", kind);
        }

        let clause = filter.where_clause(kind);
        let from = match kind {
            EntryKind::Invoice => "invoices i",
            other => table_name(other),
        };
        let column = match kind {
            EntryKind::Invoice => "i.amount",
            _ => "amount",
        };
        let query = format!("SELECT SUM({}) AS total FROM {}{}", column, from, clause.sql);

        let row = bind_values(sqlx::query(&query), &clause.values)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to sum {} amounts", kind))?;

        Ok(row.get::<Option<f64>, _>("total"))
    }

    /// Number of stored records of `kind`.
    pub async fn count(&self, kind: EntryKind) -> Result<i64> {
        let query = format!("SELECT COUNT(*) AS count FROM {}", table_name(kind));
        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {} records", kind))?;
        Ok(row.get("count"))
    }

    // ========================
    // Deletes
    // ========================

    /// Delete one record. Returns false if no record had that id.
    /// Deleting a client leaves its invoices untouched.
    pub async fn delete_by_id(&self, kind: EntryKind, id: i64) -> Result<bool> {
        let query = format!("DELETE FROM {} WHERE id = ?", table_name(kind));
        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {} {}", kind, id))?;

        let deleted = result.rows_affected() > 0;
        debug!("Delete {} {}: {}", kind, id, deleted);
        Ok(deleted)
    }

    /// Delete every record of `kind`. Returns how many were removed.
    pub async fn delete_all(&self, kind: EntryKind) -> Result<u64> {
        let query = format!("DELETE FROM {}", table_name(kind));
        let result = sqlx::query(&query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete all {} records", kind))?;

        debug!("Deleted {} {} records", result.rows_affected(), kind);
        Ok(result.rows_affected())
    }

    // ========================
    // Row mapping
    // ========================

    fn row_to_client(row: &SqliteRow) -> Result<Client> {
        let country: String = row.get("country");
        let created_at: String = row.get("created_at");

        Ok(Client {
            id: row.get("id"),
            name: row.get("name"),
            country: Country::from(country),
            contact: row.get("contact"),
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_invoice(row: &SqliteRow) -> Result<Invoice> {
        let client_id: Option<i64> = row.get("client_id");
        let live_client_id: Option<i64> = row.get("live_client_id");
        let client_name: String = row.get("client_name");
        let date: String = row.get("date");
        let created_at: String = row.get("created_at");

        let client = match live_client_id {
            Some(id) => ClientRef::Linked {
                id,
                name: client_name,
            },
            None => ClientRef::Orphaned {
                former_id: client_id,
                name: client_name,
            },
        };

        Ok(Invoice {
            id: row.get("id"),
            client,
            amount: row.get("amount"),
            tax: row.get("tax"),
            description: row.get("description"),
            date: parse_date(&date)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_revenue(row: &SqliteRow) -> Result<RevenueEntry> {
        let date: String = row.get("date");
        let created_at: String = row.get("created_at");

        Ok(RevenueEntry {
            id: row.get("id"),
            source: row.get("source"),
            amount: row.get("amount"),
            description: row.get("description"),
            date: parse_date(&date)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_expense(row: &SqliteRow) -> Result<ExpenseEntry> {
        let date: String = row.get("date");
        let created_at: String = row.get("created_at");

        Ok(ExpenseEntry {
            id: row.get("id"),
            description: row.get("description"),
            amount: row.get("amount"),
            category: row.get("category"),
            date: parse_date(&date)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &'q [SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).with_context(|| format!("Invalid date: {}", s))
}

/// Fixed-width so that text order matches time order.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}

use chrono::{Local, NaiveDate, Utc};
use log::{debug, info};

use crate::config::Settings;
use crate::domain::{
    compute_expense_ratio, compute_invoice_total, compute_net_profit, invoice_grand_total,
    or_zero, top_clients_by_spend, Amount, Client, ClientId, ClientRef, ClientSpend, Country,
    EntryKind, ExpenseEntry, Invoice, LedgerSummary, RevenueEntry,
};
use crate::storage::{EntryFilter, Repository, SortOrder};

use super::{AppError, Dashboard, InvoiceList, InvoiceReceipt, SystemStats};

/// Application service providing the bookkeeping operations.
/// This is the primary interface for any client (CLI, tests, ...).
pub struct BookkeepingService {
    repo: Repository,
    settings: Settings,
}

/// Input for issuing an invoice
#[derive(Debug, Clone, Default)]
pub struct NewInvoice {
    pub client_id: ClientId,
    pub amount: Amount,
    /// Percent; the tax policy's default applies when omitted
    pub tax_rate: Option<u8>,
    pub description: Option<String>,
    /// Defaults to today
    pub date: Option<NaiveDate>,
}

impl BookkeepingService {
    /// Create a new service over an already opened repository.
    pub fn new(repo: Repository, settings: Settings) -> Self {
        Self { repo, settings }
    }

    /// Open the store described by `settings`.
    pub async fn open(settings: Settings) -> Result<Self, AppError> {
        let repo = Repository::open(&settings.store_location()).await?;
        Ok(Self::new(repo, settings))
    }

    /// Close the store, releasing its connections.
    pub async fn close(self) {
        self.repo.close().await;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ========================
    // Clients
    // ========================

    /// Register a client. Name and contact are required and a country must be chosen.
    pub async fn add_client(
        &self,
        name: &str,
        country: Option<Country>,
        contact: &str,
    ) -> Result<Client, AppError> {
        let name = required("name", name)?;
        let contact = required("contact", contact)?;
        let country = country.ok_or_else(|| AppError::validation("country", "must be selected"))?;

        if self.settings.unique_client_names
            && self.repo.get_client_by_name(&name).await?.is_some()
        {
            return Err(AppError::DuplicateClient(name));
        }

        let mut client = Client::new(name, country, contact);
        self.repo.insert_client(&mut client).await?;
        info!("Added client {} ({})", client.id, client.name);
        Ok(client)
    }

    pub async fn get_client(&self, id: ClientId) -> Result<Client, AppError> {
        self.repo
            .get_client(id)
            .await?
            .ok_or(AppError::ClientNotFound(id))
    }

    /// All clients, most recently added first.
    pub async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        Ok(self
            .repo
            .list_clients(SortOrder::NewestFirst, &EntryFilter::all())
            .await?)
    }

    /// The most recently added clients, as many as configured.
    pub async fn recent_clients(&self) -> Result<Vec<Client>, AppError> {
        let filter = EntryFilter::all().limit(self.settings.recent_clients);
        Ok(self.repo.list_clients(SortOrder::NewestFirst, &filter).await?)
    }

    /// Delete a client. Invoices issued to it are kept and become orphaned.
    pub async fn delete_client(&self, id: ClientId) -> Result<Client, AppError> {
        let client = self.get_client(id).await?;
        self.repo.delete_by_id(EntryKind::Client, id).await?;
        info!("Deleted client {} ({})", client.id, client.name);
        Ok(client)
    }

    /// Delete every client. Invoices are kept.
    pub async fn delete_all_clients(&self) -> Result<u64, AppError> {
        let deleted = self.repo.delete_all(EntryKind::Client).await?;
        info!("Deleted all {} clients", deleted);
        Ok(deleted)
    }

    // ========================
    // Invoices
    // ========================

    /// Issue an invoice to an existing client.
    pub async fn add_invoice(&self, new: NewInvoice) -> Result<InvoiceReceipt, AppError> {
        positive("amount", new.amount)?;
        let client = self.get_client(new.client_id).await?;
        let tax_rate_percent = self.settings.tax_policy.resolve(new.tax_rate)?;
        let date = new.date.unwrap_or_else(today);

        let mut invoice = Invoice::issue(&client, new.amount, tax_rate_percent, date);
        if let Some(description) = optional(new.description) {
            invoice = invoice.with_description(description);
        }

        self.repo.insert_invoice(&mut invoice).await?;
        let total = compute_invoice_total(invoice.amount, f64::from(tax_rate_percent)).total;
        info!(
            "Issued invoice {} to {} ({} + {} tax)",
            invoice.id, client.name, invoice.amount, invoice.tax
        );

        Ok(InvoiceReceipt {
            invoice,
            tax_rate_percent,
            total,
        })
    }

    /// Re-insert an exported invoice with its stored amount and tax.
    /// It is linked to a client of the same name when one exists, orphaned otherwise.
    pub async fn restore_invoice(&self, mut invoice: Invoice) -> Result<Invoice, AppError> {
        positive("amount", invoice.amount)?;
        let name = required("client_name", invoice.client.name())?;

        invoice.client = match self.repo.get_client_by_name(&name).await? {
            Some(client) => ClientRef::linked(&client),
            None => ClientRef::Orphaned {
                former_id: None,
                name,
            },
        };
        invoice.id = 0;

        self.repo.insert_invoice(&mut invoice).await?;
        debug!("Restored invoice {} for {}", invoice.id, invoice.client.name());
        Ok(invoice)
    }

    /// Invoices, newest issue date first.
    pub async fn list_invoices(&self, filter: &EntryFilter) -> Result<InvoiceList, AppError> {
        let invoices = self.repo.list_invoices(SortOrder::NewestFirst, filter).await?;
        let grand_total = invoice_grand_total(&invoices);
        Ok(InvoiceList {
            invoices,
            grand_total,
        })
    }

    /// Clients ranked by invoiced base amount, ties in invoice insertion order.
    pub async fn top_clients(&self, limit: usize) -> Result<Vec<ClientSpend>, AppError> {
        let invoices = self
            .repo
            .list_invoices(SortOrder::Inserted, &EntryFilter::all())
            .await?;
        Ok(top_clients_by_spend(&invoices, limit))
    }

    // ========================
    // Revenue and expenses
    // ========================

    pub async fn add_revenue(
        &self,
        source: &str,
        amount: Amount,
        description: Option<String>,
        date: Option<NaiveDate>,
    ) -> Result<RevenueEntry, AppError> {
        let source = required("source", source)?;
        positive("amount", amount)?;

        let mut entry = RevenueEntry::new(source, amount, date.unwrap_or_else(today));
        if let Some(description) = optional(description) {
            entry = entry.with_description(description);
        }

        self.repo.insert_revenue(&mut entry).await?;
        info!("Recorded revenue {} from {}", entry.amount, entry.source);
        Ok(entry)
    }

    pub async fn list_revenue(&self, filter: &EntryFilter) -> Result<Vec<RevenueEntry>, AppError> {
        Ok(self.repo.list_revenue(SortOrder::NewestFirst, filter).await?)
    }

    pub async fn add_expense(
        &self,
        description: &str,
        amount: Amount,
        category: Option<String>,
        date: Option<NaiveDate>,
    ) -> Result<ExpenseEntry, AppError> {
        let description = required("description", description)?;
        positive("amount", amount)?;

        let mut entry = ExpenseEntry::new(description, amount, date.unwrap_or_else(today));
        if let Some(category) = optional(category) {
            entry = entry.with_category(category);
        }

        self.repo.insert_expense(&mut entry).await?;
        info!("Recorded expense {} ({})", entry.amount, entry.description);
        Ok(entry)
    }

    pub async fn list_expenses(&self, filter: &EntryFilter) -> Result<Vec<ExpenseEntry>, AppError> {
        Ok(self.repo.list_expenses(SortOrder::NewestFirst, filter).await?)
    }

    /// Delete a single record of any kind.
    pub async fn delete_entry(&self, kind: EntryKind, id: i64) -> Result<(), AppError> {
        if kind == EntryKind::Client {
            return self.delete_client(id).await.map(|_| ());
        }
        if !self.repo.delete_by_id(kind, id).await? {
            return Err(AppError::RecordNotFound { kind, id });
        }
        info!("Deleted {} {}", kind, id);
        Ok(())
    }

    // ========================
    // Summaries
    // ========================

    /// Totals straight from the store's aggregates.
    pub async fn summary(&self) -> Result<LedgerSummary, AppError> {
        let all = EntryFilter::all();
        Ok(LedgerSummary {
            total_invoiced: self.repo.sum(EntryKind::Invoice, &all).await?,
            total_revenue: self.repo.sum(EntryKind::Revenue, &all).await?,
            total_expenses: self.repo.sum(EntryKind::Expense, &all).await?,
        })
    }

    pub async fn dashboard(&self) -> Result<Dashboard, AppError> {
        let summary = self.summary().await?;
        let revenue = or_zero(summary.total_revenue);
        let expenses = or_zero(summary.total_expenses);
        debug!("Dashboard totals: revenue={} expenses={}", revenue, expenses);

        Ok(Dashboard {
            client_count: self.repo.count(EntryKind::Client).await?,
            invoice_count: self.repo.count(EntryKind::Invoice).await?,
            net_profit: compute_net_profit(revenue, expenses),
            expense_ratio: compute_expense_ratio(expenses, revenue),
            recent_clients: self.recent_clients().await?,
            summary,
        })
    }

    pub async fn system_stats(&self) -> Result<SystemStats, AppError> {
        Ok(SystemStats {
            clients: self.repo.count(EntryKind::Client).await?,
            invoices: self.repo.count(EntryKind::Invoice).await?,
            revenue_entries: self.repo.count(EntryKind::Revenue).await?,
            expense_entries: self.repo.count(EntryKind::Expense).await?,
            generated_at: Utc::now(),
        })
    }

    /// Insert the demo clients and invoice into an empty store.
    /// Returns false and changes nothing when clients already exist.
    pub async fn seed_sample_data(&self) -> Result<bool, AppError> {
        if self.repo.count(EntryKind::Client).await? > 0 {
            return Ok(false);
        }

        let tech = self
            .add_client("شركة التقنية المحدودة", Some(Country::SaudiArabia), "0112345678")
            .await?;
        self.add_client("مؤسسة النجاح", Some(Country::Bahrain), "33221100")
            .await?;

        self.add_invoice(NewInvoice {
            client_id: tech.id,
            amount: 5000.0,
            tax_rate: Some(5),
            description: Some("تصميم موقع إلكتروني".to_string()),
            date: None,
        })
        .await?;

        info!("Seeded sample data");
        Ok(true)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn required(field: &'static str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(field, "is required"));
    }
    Ok(trimmed.to_string())
}

fn positive(field: &'static str, amount: Amount) -> Result<(), AppError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::validation(field, "must be a positive number"));
    }
    Ok(())
}

/// Blank optional text is treated as absent.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Amount, Client, ExpenseRatio, Invoice, LedgerSummary};

/// Everything the home screen shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub client_count: i64,
    pub invoice_count: i64,
    pub summary: LedgerSummary,
    pub net_profit: Amount,
    /// `None` when no revenue has been recorded
    pub expense_ratio: Option<ExpenseRatio>,
    pub recent_clients: Vec<Client>,
}

/// Invoices as listed, with the value of all of them including tax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceList {
    pub invoices: Vec<Invoice>,
    pub grand_total: Option<Amount>,
}

/// Result of issuing an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceReceipt {
    pub invoice: Invoice,
    pub tax_rate_percent: u8,
    pub total: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub clients: i64,
    pub invoices: i64,
    pub revenue_entries: i64,
    pub expense_entries: i64,
    pub generated_at: DateTime<Utc>,
}

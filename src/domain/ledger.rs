use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Amount, ExpenseEntry, Invoice, RevenueEntry};

/// Anything that carries a monetary amount that can be summed.
pub trait HasAmount {
    fn amount(&self) -> Amount;
}

impl HasAmount for Amount {
    fn amount(&self) -> Amount {
        *self
    }
}

/// Invoices contribute their base amount, without tax.
impl HasAmount for Invoice {
    fn amount(&self) -> Amount {
        self.amount
    }
}

impl HasAmount for RevenueEntry {
    fn amount(&self) -> Amount {
        self.amount
    }
}

impl HasAmount for ExpenseEntry {
    fn amount(&self) -> Amount {
        self.amount
    }
}

/// Tax and grand total of a single invoice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotal {
    pub tax: Amount,
    pub total: Amount,
}

/// Compute the tax and total for a base amount at a percentage rate.
/// tax = base * rate / 100, total = base + tax
pub fn compute_invoice_total(base_amount: Amount, tax_rate_percent: f64) -> InvoiceTotal {
    let tax = base_amount * tax_rate_percent / 100.0;
    InvoiceTotal {
        tax,
        total: base_amount + tax,
    }
}

/// Sum the amounts of a sequence of entries.
/// Returns `None` for an empty sequence so "no data" stays distinct from a zero sum.
pub fn sum_amounts<'a, T, I>(entries: I) -> Option<Amount>
where
    T: HasAmount + 'a,
    I: IntoIterator<Item = &'a T>,
{
    entries
        .into_iter()
        .fold(None, |acc, entry| Some(acc.unwrap_or(0.0) + entry.amount()))
}

/// Collapse an optional aggregate to zero, for display.
pub fn or_zero(total: Option<Amount>) -> Amount {
    total.unwrap_or(0.0)
}

/// Sum of `amount + tax` across invoices, as shown under the invoice table.
pub fn invoice_grand_total(invoices: &[Invoice]) -> Option<Amount> {
    invoices
        .iter()
        .fold(None, |acc, invoice| Some(acc.unwrap_or(0.0) + invoice.total()))
}

/// Revenue minus expenses. Negative means a net loss.
pub fn compute_net_profit(total_revenue: Amount, total_expenses: Amount) -> Amount {
    total_revenue - total_expenses
}

/// Share of revenue consumed by expenses, and what remains as profit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRatio {
    pub expense_percent: f64,
    /// 100 - expense_percent, negative when expenses exceed revenue
    pub profit_percent: f64,
}

/// Expense ratio in percent. `None` when there is no revenue to divide by.
pub fn compute_expense_ratio(total_expenses: Amount, total_revenue: Amount) -> Option<ExpenseRatio> {
    if total_revenue == 0.0 {
        return None;
    }
    let expense_percent = total_expenses / total_revenue * 100.0;
    Some(ExpenseRatio {
        expense_percent,
        profit_percent: 100.0 - expense_percent,
    })
}

/// Total invoiced (base amounts) for one client name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSpend {
    pub client_name: String,
    pub total: Amount,
    pub invoice_count: usize,
}

/// Rank clients by the sum of their invoice base amounts (tax excluded).
///
/// Invoices are grouped by client name. Clients with equal totals keep the order
/// in which they first appear in `invoices`.
pub fn top_clients_by_spend(invoices: &[Invoice], limit: usize) -> Vec<ClientSpend> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut spends: Vec<ClientSpend> = Vec::new();

    for invoice in invoices {
        let name = invoice.client_name();
        match index.get(name) {
            Some(&i) => {
                spends[i].total += invoice.amount;
                spends[i].invoice_count += 1;
            }
            None => {
                index.insert(name, spends.len());
                spends.push(ClientSpend {
                    client_name: name.to_string(),
                    total: invoice.amount,
                    invoice_count: 1,
                });
            }
        }
    }

    // sort_by is stable, so ties stay in first-appearance order
    spends.sort_by(|a, b| b.total.total_cmp(&a.total));
    spends.truncate(limit);
    spends
}

/// Financial summary computed from a snapshot of the stored entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_invoiced: Option<Amount>,
    pub total_revenue: Option<Amount>,
    pub total_expenses: Option<Amount>,
}

impl LedgerSummary {
    pub fn compute(
        invoices: &[Invoice],
        revenue: &[RevenueEntry],
        expenses: &[ExpenseEntry],
    ) -> Self {
        Self {
            total_invoiced: sum_amounts(invoices),
            total_revenue: sum_amounts(revenue),
            total_expenses: sum_amounts(expenses),
        }
    }

    pub fn net_profit(&self) -> Amount {
        compute_net_profit(or_zero(self.total_revenue), or_zero(self.total_expenses))
    }

    pub fn expense_ratio(&self) -> Option<ExpenseRatio> {
        compute_expense_ratio(or_zero(self.total_expenses), or_zero(self.total_revenue))
    }
}

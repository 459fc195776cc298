use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{compute_invoice_total, Amount, Client, ClientId};

pub type InvoiceId = i64;

/// Reference from an invoice to the client it was issued to.
///
/// The client name is captured when the invoice is issued. Deleting clients
/// never cascades to invoices, so a reference may outlive its client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ClientRef {
    Linked { id: ClientId, name: String },
    /// The referenced client no longer exists (or never did, for imported rows).
    Orphaned { former_id: Option<ClientId>, name: String },
}

impl ClientRef {
    pub fn linked(client: &Client) -> Self {
        ClientRef::Linked {
            id: client.id,
            name: client.name.clone(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ClientRef::Linked { name, .. } | ClientRef::Orphaned { name, .. } => name,
        }
    }

    pub fn id(&self) -> Option<ClientId> {
        match self {
            ClientRef::Linked { id, .. } => Some(*id),
            ClientRef::Orphaned { former_id, .. } => *former_id,
        }
    }

    pub fn is_orphaned(&self) -> bool {
        matches!(self, ClientRef::Orphaned { .. })
    }
}

/// How the tax rate of a new invoice is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TaxPolicy {
    /// Integer percentage picked per invoice, between 0 and `max_percent`.
    Selectable { max_percent: u8, default_percent: u8 },
    /// Every invoice is taxed at the same rate.
    Fixed { percent: u8 },
}

impl Default for TaxPolicy {
    fn default() -> Self {
        TaxPolicy::Selectable {
            max_percent: 20,
            default_percent: 5,
        }
    }
}

impl TaxPolicy {
    /// Resolve the rate to apply for a requested rate (if any).
    /// A fixed policy ignores the request.
    pub fn resolve(&self, requested: Option<u8>) -> Result<u8, TaxRateError> {
        match *self {
            TaxPolicy::Fixed { percent } => Ok(percent),
            TaxPolicy::Selectable {
                max_percent,
                default_percent,
            } => {
                let rate = requested.unwrap_or(default_percent);
                if rate > max_percent {
                    return Err(TaxRateError::OutOfRange {
                        rate,
                        max: max_percent,
                    });
                }
                Ok(rate)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxRateError {
    OutOfRange { rate: u8, max: u8 },
}

impl std::fmt::Display for TaxRateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxRateError::OutOfRange { rate, max } => {
                write!(f, "Tax rate {}% is outside the allowed range 0-{}%", rate, max)
            }
        }
    }
}

impl std::error::Error for TaxRateError {}

/// An issued invoice. Invoices are immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub client: ClientRef,
    /// Base amount, before tax
    pub amount: Amount,
    /// Tax derived from the base amount at issue time
    pub tax: Amount,
    pub description: Option<String>,
    /// Issue date
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Issue an invoice to `client`, computing the tax at `tax_rate_percent`.
    /// The id is assigned by the repository on insert.
    pub fn issue(client: &Client, amount: Amount, tax_rate_percent: u8, date: NaiveDate) -> Self {
        let totals = compute_invoice_total(amount, f64::from(tax_rate_percent));
        Self {
            id: 0,
            client: ClientRef::linked(client),
            amount,
            tax: totals.tax,
            description: None,
            date,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Base amount plus tax.
    pub fn total(&self) -> Amount {
        self.amount + self.tax
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Country;

    fn client(id: ClientId, name: &str) -> Client {
        let mut client = Client::new(name, Country::Bahrain, "33221100");
        client.id = id;
        client
    }

    #[test]
    fn test_issue_computes_tax() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let invoice = Invoice::issue(&client(7, "Acme"), 5000.0, 5, date)
            .with_description("Website design");

        assert!((invoice.tax - 250.0).abs() < 1e-9);
        assert!((invoice.total() - 5250.0).abs() < 1e-9);
        assert_eq!(invoice.client, ClientRef::Linked { id: 7, name: "Acme".into() });
        assert_eq!(invoice.description.as_deref(), Some("Website design"));
    }

    #[test]
    fn test_client_ref_accessors() {
        let orphan = ClientRef::Orphaned {
            former_id: Some(3),
            name: "Gone".into(),
        };
        assert!(orphan.is_orphaned());
        assert_eq!(orphan.id(), Some(3));
        assert_eq!(orphan.name(), "Gone");
        assert!(!ClientRef::linked(&client(1, "Here")).is_orphaned());
    }

    #[test]
    fn test_selectable_policy() {
        let policy = TaxPolicy::default();
        assert_eq!(policy.resolve(None), Ok(5));
        assert_eq!(policy.resolve(Some(0)), Ok(0));
        assert_eq!(policy.resolve(Some(20)), Ok(20));
        assert_eq!(
            policy.resolve(Some(21)),
            Err(TaxRateError::OutOfRange { rate: 21, max: 20 })
        );
    }

    #[test]
    fn test_fixed_policy_ignores_request() {
        let policy = TaxPolicy::Fixed { percent: 5 };
        assert_eq!(policy.resolve(None), Ok(5));
        assert_eq!(policy.resolve(Some(18)), Ok(5));
    }

    #[test]
    fn test_tax_policy_serde() {
        let json = r#"{"mode":"fixed","percent":5}"#;
        let policy: TaxPolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy, TaxPolicy::Fixed { percent: 5 });
    }
}

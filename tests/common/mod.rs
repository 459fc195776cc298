// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use daftar::application::{BookkeepingService, NewInvoice};
use daftar::config::Settings;
use daftar::domain::{Client, Country};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BookkeepingService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let settings = Settings {
        database: db_path.to_str().unwrap().to_string(),
        ..Settings::default()
    };
    let service = BookkeepingService::open(settings).await?;
    Ok((service, temp_dir))
}

/// Helper to create a service over an in-memory store
pub async fn memory_service() -> Result<BookkeepingService> {
    Ok(BookkeepingService::open(Settings::in_memory()).await?)
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Test fixture: a few clients and their invoices
pub struct StandardClients;

impl StandardClients {
    /// Create Acme (Bahrain) and Globex (Saudi Arabia)
    pub async fn create_basic(service: &BookkeepingService) -> Result<(Client, Client)> {
        let acme = service
            .add_client("Acme", Some(Country::Bahrain), "33221100")
            .await?;
        let globex = service
            .add_client("Globex", Some(Country::SaudiArabia), "globex@example.com")
            .await?;
        Ok((acme, globex))
    }

    /// Issue an invoice at the given rate and date
    pub async fn invoice(
        service: &BookkeepingService,
        client: &Client,
        amount: f64,
        tax_rate: u8,
        date: &str,
    ) -> Result<()> {
        service
            .add_invoice(NewInvoice {
                client_id: client.id,
                amount,
                tax_rate: Some(tax_rate),
                date: Some(parse_date(date)),
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::application::BookkeepingService;
use crate::domain::{Client, ExpenseEntry, Invoice, RevenueEntry};
use crate::storage::EntryFilter;

use super::{ColumnMap, Tabular};

/// Byte-order mark written before the header so spreadsheet tools read the
/// file as UTF-8 and keep Arabic text intact.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A rendered CSV file, ready to be written or offered for download.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub rows: usize,
}

impl CsvExport {
    /// Write the file into `dir`, returning the full path.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Render `records` as CSV: one header row from `columns`, fields
/// comma-separated and quoted where needed.
pub fn export_csv<T: Tabular>(
    records: &[T],
    columns: &ColumnMap,
    file_name: impl Into<String>,
) -> Result<CsvExport> {
    if let Some(unknown) = columns.fields().find(|f| !T::FIELDS.contains(f)) {
        anyhow::bail!("Unknown {} column: {}", T::KIND, unknown);
    }

    let mut bytes = UTF8_BOM.to_vec();
    {
        let mut writer = csv::Writer::from_writer(&mut bytes);
        writer.write_record(columns.headers())?;

        for record in records {
            writer.write_record(
                columns
                    .fields()
                    .map(|f| record.field(f).unwrap_or_default()),
            )?;
        }
        writer.flush()?;
    }

    Ok(CsvExport {
        file_name: file_name.into(),
        bytes,
        rows: records.len(),
    })
}

/// Full dump of the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub clients: Vec<Client>,
    pub invoices: Vec<Invoice>,
    pub revenue: Vec<RevenueEntry>,
    pub expenses: Vec<ExpenseEntry>,
}

/// Exporter for turning the stored entries into files
pub struct Exporter<'a> {
    service: &'a BookkeepingService,
    arabic_headers: bool,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a BookkeepingService) -> Self {
        Self {
            service,
            arabic_headers: false,
        }
    }

    pub fn with_arabic_headers(mut self, arabic: bool) -> Self {
        self.arabic_headers = arabic;
        self
    }

    fn columns<T: Tabular>(&self) -> ColumnMap {
        if self.arabic_headers {
            ColumnMap::arabic(T::KIND)
        } else {
            ColumnMap::english(T::KIND)
        }
    }

    fn render<T: Tabular>(&self, records: &[T], file_name: &str) -> Result<CsvExport> {
        let export = export_csv(records, &self.columns::<T>(), file_name)?;
        info!("Exported {} {} records", export.rows, T::KIND);
        Ok(export)
    }

    pub async fn clients_csv(&self) -> Result<CsvExport> {
        let clients = self.service.list_clients().await?;
        self.render(&clients, "clients.csv")
    }

    pub async fn invoices_csv(&self) -> Result<CsvExport> {
        let list = self.service.list_invoices(&EntryFilter::all()).await?;
        self.render(&list.invoices, "invoices.csv")
    }

    pub async fn revenue_csv(&self) -> Result<CsvExport> {
        let revenue = self.service.list_revenue(&EntryFilter::all()).await?;
        self.render(&revenue, "revenue.csv")
    }

    pub async fn expenses_csv(&self) -> Result<CsvExport> {
        let expenses = self.service.list_expenses(&EntryFilter::all()).await?;
        self.render(&expenses, "expenses.csv")
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        let all = EntryFilter::all();
        Ok(Snapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            clients: self.service.list_clients().await?,
            invoices: self.service.list_invoices(&all).await?.invoices,
            revenue: self.service.list_revenue(&all).await?,
            expenses: self.service.list_expenses(&all).await?,
        })
    }

    /// Export everything as a pretty-printed JSON snapshot
    pub async fn full_json<W: Write>(&self, mut writer: W) -> Result<Snapshot> {
        let snapshot = self.snapshot().await?;
        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::Country;

    #[test]
    fn test_export_starts_with_bom_and_header() {
        let clients = vec![Client::new("Acme, Ltd", Country::Bahrain, "33221100")];
        let columns = ColumnMap::new([("name", "Name"), ("contact", "Contact")]);

        let export = export_csv(&clients, &columns, "clients.csv").unwrap();
        assert!(export.bytes.starts_with(UTF8_BOM));

        let text = std::str::from_utf8(&export.bytes[UTF8_BOM.len()..]).unwrap();
        assert_eq!(text, "Name,Contact\n\"Acme, Ltd\",33221100\n");
        assert_eq!(export.rows, 1);
        assert_eq!(export.file_name, "clients.csv");
    }

    #[test]
    fn test_export_preserves_arabic_bytes() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let entries = vec![ExpenseEntry::new("إيجار المكتب", 1200.0, date).with_category("تشغيل")];
        let columns = ColumnMap::arabic(crate::domain::EntryKind::Expense);

        let export = export_csv(&entries, &columns, "expenses.csv").unwrap();
        let text = std::str::from_utf8(&export.bytes).unwrap();
        assert!(text.contains("إيجار المكتب"));
        assert!(text.contains("الوصف"));
    }

    #[test]
    fn test_export_rejects_unknown_column() {
        let columns = ColumnMap::new([("balance", "Balance")]);
        assert!(export_csv::<Client>(&[], &columns, "x.csv").is_err());
    }

    #[test]
    fn test_export_empty_has_header_only() {
        let columns = ColumnMap::english(crate::domain::EntryKind::Revenue);
        let export = export_csv::<RevenueEntry>(&[], &columns, "revenue.csv").unwrap();
        let text = std::str::from_utf8(&export.bytes[UTF8_BOM.len()..]).unwrap();
        assert_eq!(text, "id,source,amount,description,date,created_at\n");
    }
}

use std::collections::HashMap;

use anyhow::{Context, Result};
use log::warn;

use crate::application::BookkeepingService;
use crate::domain::{Client, ExpenseEntry, Invoice, RevenueEntry};

use super::export::UTF8_BOM;
use super::{ColumnMap, Fields, Tabular};

/// Records read from a CSV file, plus the rows that could not be read
#[derive(Debug, Clone)]
pub struct ParsedCsv<T> {
    /// Each record with the CSV line it came from
    pub records: Vec<(usize, T)>,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Count the rows that parse without writing them. Rows the store would
    /// reject (duplicate client names, for one) are still counted.
    pub dry_run: bool,
}

/// Parse CSV produced by `export_csv` with the same column mapping.
/// A leading byte-order mark is ignored; columns are matched by header label.
pub fn parse_csv<T: Tabular>(data: &[u8], columns: &ColumnMap) -> Result<ParsedCsv<T>> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = csv::Reader::from_reader(data);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let positions: Vec<(&'static str, usize)> = columns
        .fields()
        .filter_map(|field| {
            let label = columns.header_for(field)?;
            headers.iter().position(|h| h == label).map(|i| (field, i))
        })
        .collect();

    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (line_num, result) in reader.records().enumerate() {
        let line = line_num + 2; // +2 for header and 0-indexing

        let row = match result {
            Ok(r) => r,
            Err(e) => {
                errors.push(ImportError {
                    line,
                    field: None,
                    error: format!("CSV parse error: {}", e),
                });
                continue;
            }
        };

        let values: HashMap<&'static str, &str> = positions
            .iter()
            .filter_map(|(field, i)| row.get(*i).map(|v| (*field, v)))
            .collect();

        match T::from_fields(&Fields::new(values)) {
            Ok(record) => records.push((line, record)),
            Err(e) => errors.push(ImportError {
                line,
                field: Some(e.field.to_string()),
                error: e.message,
            }),
        }
    }

    Ok(ParsedCsv { records, errors })
}

/// Importer for loading exported files back into the store.
/// Records get fresh ids; their contents go through the usual validation.
pub struct Importer<'a> {
    service: &'a BookkeepingService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a BookkeepingService) -> Self {
        Self { service }
    }

    pub async fn import_clients(
        &self,
        data: &[u8],
        columns: &ColumnMap,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let parsed = parse_csv::<Client>(data, columns)?;
        let mut result = ImportResult {
            errors: parsed.errors,
            ..Default::default()
        };

        for (line, client) in parsed.records {
            if options.dry_run {
                result.imported += 1;
                continue;
            }
            match self
                .service
                .add_client(&client.name, Some(client.country), &client.contact)
                .await
            {
                Ok(_) => result.imported += 1,
                Err(e) => skip(&mut result, line, e),
            }
        }
        Ok(result)
    }

    /// Invoices keep their stored amount and tax; they are linked to a client
    /// with the same name when one exists and orphaned otherwise.
    pub async fn import_invoices(
        &self,
        data: &[u8],
        columns: &ColumnMap,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let parsed = parse_csv::<Invoice>(data, columns)?;
        let mut result = ImportResult {
            errors: parsed.errors,
            ..Default::default()
        };

        for (line, invoice) in parsed.records {
            if options.dry_run {
                result.imported += 1;
                continue;
            }
            match self.service.restore_invoice(invoice).await {
                Ok(_) => result.imported += 1,
                Err(e) => skip(&mut result, line, e),
            }
        }
        Ok(result)
    }

    pub async fn import_revenue(
        &self,
        data: &[u8],
        columns: &ColumnMap,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let parsed = parse_csv::<RevenueEntry>(data, columns)?;
        let mut result = ImportResult {
            errors: parsed.errors,
            ..Default::default()
        };

        for (line, entry) in parsed.records {
            if options.dry_run {
                result.imported += 1;
                continue;
            }
            match self
                .service
                .add_revenue(&entry.source, entry.amount, entry.description, Some(entry.date))
                .await
            {
                Ok(_) => result.imported += 1,
                Err(e) => skip(&mut result, line, e),
            }
        }
        Ok(result)
    }

    pub async fn import_expenses(
        &self,
        data: &[u8],
        columns: &ColumnMap,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let parsed = parse_csv::<ExpenseEntry>(data, columns)?;
        let mut result = ImportResult {
            errors: parsed.errors,
            ..Default::default()
        };

        for (line, entry) in parsed.records {
            if options.dry_run {
                result.imported += 1;
                continue;
            }
            match self
                .service
                .add_expense(&entry.description, entry.amount, entry.category, Some(entry.date))
                .await
            {
                Ok(_) => result.imported += 1,
                Err(e) => skip(&mut result, line, e),
            }
        }
        Ok(result)
    }
}

fn skip(result: &mut ImportResult, line: usize, error: impl std::fmt::Display) {
    warn!("Skipped line {}: {}", line, error);
    result.skipped += 1;
    result.errors.push(ImportError {
        line,
        field: None,
        error: error.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{ClientRef, Country, EntryKind};
    use crate::io::export_csv;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn records<T>(parsed: ParsedCsv<T>) -> Vec<T> {
        parsed.records.into_iter().map(|(_, record)| record).collect()
    }

    #[test]
    fn test_roundtrip_clients_with_arabic_text() {
        let mut first = Client::new("شركة التقنية المحدودة", Country::SaudiArabia, "0112345678");
        first.id = 1;
        let mut second = Client::new("Smith, \"Jr\" & Co", Country::Other("مصر".into()), "a@b.c");
        second.id = 2;
        let clients = vec![first, second];

        for columns in [
            ColumnMap::english(EntryKind::Client),
            ColumnMap::arabic(EntryKind::Client),
        ] {
            let export = export_csv(&clients, &columns, "clients.csv").unwrap();
            let parsed = parse_csv::<Client>(&export.bytes, &columns).unwrap();
            assert!(parsed.errors.is_empty());
            assert_eq!(records(parsed), clients);
        }
    }

    #[test]
    fn test_roundtrip_invoices_keeps_orphan_state() {
        let mut client = Client::new("مؤسسة النجاح", Country::Bahrain, "33221100");
        client.id = 9;
        let mut linked = Invoice::issue(&client, 1234.56, 15, date("2024-03-10"))
            .with_description("تصميم, شعار");
        linked.id = 1;
        let mut orphan = Invoice::issue(&client, 10.0, 0, date("2024-03-11"));
        orphan.id = 2;
        orphan.client = ClientRef::Orphaned {
            former_id: Some(9),
            name: "مؤسسة النجاح".into(),
        };
        let invoices = vec![linked, orphan];

        let columns = ColumnMap::arabic(EntryKind::Invoice);
        let export = export_csv(&invoices, &columns, "invoices.csv").unwrap();
        let parsed = parse_csv::<Invoice>(&export.bytes, &columns).unwrap();
        assert_eq!(records(parsed), invoices);
    }

    #[test]
    fn test_roundtrip_revenue_and_expenses() {
        let mut revenue = RevenueEntry::new("استشارات", 0.1 + 0.2, date("2024-01-02"));
        revenue.id = 4;
        let mut expense = ExpenseEntry::new("Rent\nJanuary", 900.0, date("2024-01-03"))
            .with_category("office");
        expense.id = 5;

        let columns = ColumnMap::english(EntryKind::Revenue);
        let export = export_csv(std::slice::from_ref(&revenue), &columns, "r.csv").unwrap();
        let parsed = parse_csv::<RevenueEntry>(&export.bytes, &columns).unwrap();
        assert_eq!(records(parsed), vec![revenue]);

        let columns = ColumnMap::english(EntryKind::Expense);
        let export = export_csv(std::slice::from_ref(&expense), &columns, "e.csv").unwrap();
        let parsed = parse_csv::<ExpenseEntry>(&export.bytes, &columns).unwrap();
        assert_eq!(records(parsed), vec![expense]);
    }

    #[test]
    fn test_bad_rows_are_reported_with_line_numbers() {
        let data = "id,source,amount,description,date,created_at\n\
                    1,Sales,100,,2024-01-01,\n\
                    2,Sales,abc,,2024-01-02,\n\
                    3,,5,,2024-01-03,\n";
        let columns = ColumnMap::english(EntryKind::Revenue);
        let parsed = parse_csv::<RevenueEntry>(data.as_bytes(), &columns).unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].0, 2);
        assert_eq!(parsed.errors.len(), 2);
        assert_eq!(parsed.errors[0].line, 3);
        assert_eq!(parsed.errors[0].field.as_deref(), Some("amount"));
        assert_eq!(parsed.errors[1].field.as_deref(), Some("source"));
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::debug;

use crate::application::{BookkeepingService, NewInvoice};
use crate::config::Settings;
use crate::domain::{format_amount, format_percent, or_zero, parse_amount, Country, EntryKind};
use crate::io::{ColumnMap, CsvExport, Exporter, ImportOptions, ImportResult, Importer};
use crate::storage::EntryFilter;

/// Daftar - bookkeeping for clients, invoices, revenue and expenses
#[derive(Parser)]
#[command(name = "daftar")]
#[command(about = "A small bookkeeping ledger for clients, invoices, revenue and expenses")]
#[command(version)]
pub struct Cli {
    /// Database file path, or ":memory:" (overrides the settings file)
    #[arg(short, long, env = "DAFTAR_DATABASE")]
    pub database: Option<String>,

    /// Settings file (JSON); defaults apply when it doesn't exist
    #[arg(long, env = "DAFTAR_CONFIG", default_value = "daftar.json")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init {
        /// Add the demo clients and invoice
        #[arg(long)]
        sample: bool,
    },

    /// Client management commands
    #[command(subcommand)]
    Client(ClientCommands),

    /// Invoice commands
    #[command(subcommand)]
    Invoice(InvoiceCommands),

    /// Revenue commands
    #[command(subcommand)]
    Revenue(RevenueCommands),

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Delete a single record
    Delete {
        /// Record kind: client, invoice, revenue, expense
        kind: String,

        /// Record id
        id: i64,
    },

    /// Show totals, net profit and recently added clients
    Dashboard,

    /// Generate reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Export data to CSV or JSON
    Export {
        /// What to export: clients, invoices, revenue, expenses, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long, conflicts_with = "dir")]
        output: Option<PathBuf>,

        /// Write into this directory using the default file name
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Use Arabic column headers
        #[arg(long)]
        arabic: bool,
    },

    /// Import records from a CSV file produced by `export`
    Import {
        /// What to import: clients, invoices, revenue, expenses
        import_type: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// The file uses Arabic column headers
        #[arg(long)]
        arabic: bool,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,
    },

    /// Record counts and system time
    Stats,
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Register a new client
    Add {
        /// Client name
        name: String,

        /// Country: bahrain, saudi-arabia, uae, oman, qatar, kuwait, or any other name
        #[arg(short, long)]
        country: String,

        /// Phone number or e-mail
        #[arg(long)]
        contact: String,
    },

    /// List all clients
    List,

    /// Delete a client (its invoices are kept)
    Delete {
        /// Client id
        id: i64,
    },

    /// Delete every client (invoices are kept)
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum InvoiceCommands {
    /// Issue an invoice to a client
    Add {
        /// Client id
        #[arg(long)]
        client: i64,

        /// Base amount before tax (e.g., "5000" or "1,250.50")
        amount: String,

        /// Tax rate in percent (defaults to the configured rate)
        #[arg(short, long)]
        tax_rate: Option<u8>,

        /// What was sold
        #[arg(short, long)]
        description: Option<String>,

        /// Issue date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List invoices, newest first
    List {
        /// Only invoices of this client id
        #[arg(long)]
        client: Option<i64>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,

        /// Maximum number of invoices to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum RevenueCommands {
    /// Record revenue
    Add {
        /// Where the money came from
        source: String,

        /// Amount (e.g., "1200.00")
        amount: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List revenue entries, newest first
    List {
        /// Filter by source
        #[arg(long)]
        source: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// What the money was spent on
        description: String,

        /// Amount (e.g., "350.75")
        amount: String,

        /// Category (e.g., "rent", "salaries")
        #[arg(short, long)]
        category: Option<String>,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List expense entries, newest first
    List {
        /// Filter by category
        #[arg(long)]
        category: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Clients ranked by invoiced amount (before tax)
    TopClients {
        /// Number of clients to show
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// PDF report (not available yet)
    Pdf,
}

impl Cli {
    /// Settings from the config file, with command-line overrides applied.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load_or_default(&self.config)?;
        if let Some(database) = &self.database {
            settings.database = database.clone();
        }
        Ok(settings)
    }

    pub async fn run(self) -> Result<()> {
        let settings = self.settings()?;
        debug!("Using database {}", settings.database);

        let service = BookkeepingService::open(settings).await?;
        let result = run_command(&service, self.command).await;
        service.close().await;
        result
    }
}

async fn run_command(service: &BookkeepingService, command: Commands) -> Result<()> {
    match command {
        Commands::Init { sample } => {
            println!("Database ready at {}", service.settings().database);
            if sample {
                if service.seed_sample_data().await? {
                    println!("Added sample clients and invoice.");
                } else {
                    println!("Clients already exist; sample data skipped.");
                }
            }
            Ok(())
        }
        Commands::Client(cmd) => run_client_command(service, cmd).await,
        Commands::Invoice(cmd) => run_invoice_command(service, cmd).await,
        Commands::Revenue(cmd) => run_revenue_command(service, cmd).await,
        Commands::Expense(cmd) => run_expense_command(service, cmd).await,
        Commands::Delete { kind, id } => {
            let kind = parse_kind(&kind)?;
            service.delete_entry(kind, id).await?;
            println!("Deleted {} {}", kind, id);
            Ok(())
        }
        Commands::Dashboard => run_dashboard_command(service).await,
        Commands::Report(cmd) => run_report_command(service, cmd).await,
        Commands::Export {
            export_type,
            output,
            dir,
            arabic,
        } => run_export_command(service, &export_type, output.as_deref(), dir.as_deref(), arabic).await,
        Commands::Import {
            import_type,
            input,
            arabic,
            dry_run,
        } => run_import_command(service, &import_type, input.as_deref(), arabic, dry_run).await,
        Commands::Stats => run_stats_command(service).await,
    }
}

async fn run_client_command(service: &BookkeepingService, cmd: ClientCommands) -> Result<()> {
    match cmd {
        ClientCommands::Add {
            name,
            country,
            contact,
        } => {
            let country = Some(country.trim())
                .filter(|c| !c.is_empty())
                .map(|c| Country::from(c.to_string()));
            let client = service.add_client(&name, country, &contact).await?;
            println!("Added client '{}' (id {})", client.name, client.id);
        }
        ClientCommands::List => {
            let clients = service.list_clients().await?;
            if clients.is_empty() {
                println!("No clients found.");
                return Ok(());
            }

            println!(
                "{:<6} {:<30} {:<15} {:<20} {:<16}",
                "ID", "NAME", "COUNTRY", "CONTACT", "ADDED"
            );
            println!("{}", "-".repeat(91));
            for client in clients {
                println!(
                    "{:<6} {:<30} {:<15} {:<20} {:<16}",
                    client.id,
                    truncate(&client.name, 30),
                    truncate(client.country.as_str(), 15),
                    truncate(&client.contact, 20),
                    client.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ClientCommands::Delete { id } => {
            let client = service.delete_client(id).await?;
            println!("Deleted client '{}'. Their invoices were kept.", client.name);
        }
        ClientCommands::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to delete all clients without --yes");
            }
            let deleted = service.delete_all_clients().await?;
            println!("Deleted {} clients. Their invoices were kept.", deleted);
        }
    }
    Ok(())
}

async fn run_invoice_command(service: &BookkeepingService, cmd: InvoiceCommands) -> Result<()> {
    let currency = &service.settings().currency;

    match cmd {
        InvoiceCommands::Add {
            client,
            amount,
            tax_rate,
            description,
            date,
        } => {
            let receipt = service
                .add_invoice(NewInvoice {
                    client_id: client,
                    amount: parse_amount(&amount)?,
                    tax_rate,
                    description,
                    date: date.as_deref().map(parse_date).transpose()?,
                })
                .await?;

            println!(
                "Added invoice {} worth {} {}",
                receipt.invoice.id,
                format_amount(receipt.total),
                currency
            );
            println!(
                "  Base amount: {} | Tax ({}%): {}",
                format_amount(receipt.invoice.amount),
                receipt.tax_rate_percent,
                format_amount(receipt.invoice.tax)
            );
        }
        InvoiceCommands::List {
            client,
            from_date,
            to_date,
            limit,
        } => {
            let mut filter = date_filter(from_date.as_deref(), to_date.as_deref())?;
            filter.client_id = client;
            filter.limit = limit;

            let list = service.list_invoices(&filter).await?;
            if list.invoices.is_empty() {
                println!("No invoices found.");
                return Ok(());
            }

            println!(
                "Total invoice value: {} {}\n",
                format_amount(or_zero(list.grand_total)),
                currency
            );
            println!(
                "{:<6} {:<10} {:<25} {:>12} {:>10} {:>12}  {}",
                "ID", "DATE", "CLIENT", "AMOUNT", "TAX", "TOTAL", "DESCRIPTION"
            );
            println!("{}", "-".repeat(100));
            for invoice in &list.invoices {
                let client = if invoice.client.is_orphaned() {
                    format!("{} (deleted)", invoice.client_name())
                } else {
                    invoice.client_name().to_string()
                };
                println!(
                    "{:<6} {:<10} {:<25} {:>12} {:>10} {:>12}  {}",
                    invoice.id,
                    invoice.date,
                    truncate(&client, 25),
                    format_amount(invoice.amount),
                    format_amount(invoice.tax),
                    format_amount(invoice.total()),
                    truncate(invoice.description.as_deref().unwrap_or(""), 30)
                );
            }
        }
    }
    Ok(())
}

async fn run_revenue_command(service: &BookkeepingService, cmd: RevenueCommands) -> Result<()> {
    match cmd {
        RevenueCommands::Add {
            source,
            amount,
            description,
            date,
        } => {
            let entry = service
                .add_revenue(
                    &source,
                    parse_amount(&amount)?,
                    description,
                    date.as_deref().map(parse_date).transpose()?,
                )
                .await?;
            println!(
                "Recorded revenue {} from '{}' (id {})",
                format_amount(entry.amount),
                entry.source,
                entry.id
            );
        }
        RevenueCommands::List {
            source,
            from_date,
            to_date,
        } => {
            let mut filter = date_filter(from_date.as_deref(), to_date.as_deref())?;
            filter.source = source;

            let entries = service.list_revenue(&filter).await?;
            if entries.is_empty() {
                println!("No revenue recorded.");
                return Ok(());
            }

            println!(
                "{:<6} {:<10} {:<25} {:>12}  {}",
                "ID", "DATE", "SOURCE", "AMOUNT", "DESCRIPTION"
            );
            println!("{}", "-".repeat(80));
            for entry in entries {
                println!(
                    "{:<6} {:<10} {:<25} {:>12}  {}",
                    entry.id,
                    entry.date,
                    truncate(&entry.source, 25),
                    format_amount(entry.amount),
                    truncate(entry.description.as_deref().unwrap_or(""), 30)
                );
            }
        }
    }
    Ok(())
}

async fn run_expense_command(service: &BookkeepingService, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            description,
            amount,
            category,
            date,
        } => {
            let entry = service
                .add_expense(
                    &description,
                    parse_amount(&amount)?,
                    category,
                    date.as_deref().map(parse_date).transpose()?,
                )
                .await?;
            println!(
                "Recorded expense {} for '{}' (id {})",
                format_amount(entry.amount),
                entry.description,
                entry.id
            );
        }
        ExpenseCommands::List {
            category,
            from_date,
            to_date,
        } => {
            let mut filter = date_filter(from_date.as_deref(), to_date.as_deref())?;
            filter.category = category;

            let entries = service.list_expenses(&filter).await?;
            if entries.is_empty() {
                println!("No expenses recorded.");
                return Ok(());
            }

            println!(
                "{:<6} {:<10} {:<30} {:<15} {:>12}",
                "ID", "DATE", "DESCRIPTION", "CATEGORY", "AMOUNT"
            );
            println!("{}", "-".repeat(77));
            for entry in entries {
                println!(
                    "{:<6} {:<10} {:<30} {:<15} {:>12}",
                    entry.id,
                    entry.date,
                    truncate(&entry.description, 30),
                    truncate(entry.category.as_deref().unwrap_or("-"), 15),
                    format_amount(entry.amount)
                );
            }
        }
    }
    Ok(())
}

async fn run_dashboard_command(service: &BookkeepingService) -> Result<()> {
    let dashboard = service.dashboard().await?;
    let currency = &service.settings().currency;
    let summary = &dashboard.summary;

    println!("Clients:          {}", dashboard.client_count);
    println!("Invoices:         {}", dashboard.invoice_count);
    println!(
        "Total invoiced:   {:>14}",
        format_amount(or_zero(summary.total_invoiced))
    );
    println!(
        "Total revenue:    {:>14}",
        format_amount(or_zero(summary.total_revenue))
    );
    println!(
        "Total expenses:   {:>14}",
        format_amount(or_zero(summary.total_expenses))
    );
    println!();
    println!(
        "Net profit:       {:>14} {}",
        format_amount(dashboard.net_profit),
        currency
    );
    match dashboard.expense_ratio {
        Some(ratio) => println!(
            "Profit ratio:     {:>14}",
            format_percent(ratio.profit_percent)
        ),
        None => println!("Profit ratio:     no revenue recorded"),
    }

    println!();
    println!("Recently added clients:");
    if dashboard.recent_clients.is_empty() {
        println!("  No clients yet.");
    }
    for client in &dashboard.recent_clients {
        println!(
            "  {:<30} {:<15} {:<20} {}",
            truncate(&client.name, 30),
            truncate(client.country.as_str(), 15),
            truncate(&client.contact, 20),
            client.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

async fn run_report_command(service: &BookkeepingService, cmd: ReportCommands) -> Result<()> {
    match cmd {
        ReportCommands::TopClients { limit, format } => {
            let top = service.top_clients(limit).await?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&top)?),
                "table" => {
                    if top.is_empty() {
                        println!("No invoices found.");
                        return Ok(());
                    }
                    println!("{:<4} {:<30} {:>9} {:>14}", "#", "CLIENT", "INVOICES", "AMOUNT");
                    println!("{}", "-".repeat(60));
                    for (rank, spend) in top.iter().enumerate() {
                        println!(
                            "{:<4} {:<30} {:>9} {:>14}",
                            rank + 1,
                            truncate(&spend.client_name, 30),
                            spend.invoice_count,
                            format_amount(spend.total)
                        );
                    }
                    println!("\nAmounts exclude tax.");
                }
                other => anyhow::bail!("Invalid format '{}'. Valid formats: table, json", other),
            }
        }
        ReportCommands::Pdf => {
            println!("PDF reports are not generated by daftar.");
            println!("To produce one:");
            println!("  1. daftar export invoices --dir reports");
            println!("  2. Open reports/invoices.csv in a spreadsheet application");
            println!("  3. Print or save the sheet as PDF");
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &BookkeepingService,
    export_type: &str,
    output: Option<&Path>,
    dir: Option<&Path>,
    arabic: bool,
) -> Result<()> {
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service).with_arabic_headers(arabic);

    if export_type == "full" {
        let writer: Box<dyn Write> = match (output, dir) {
            (Some(path), _) => Box::new(
                File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?,
            ),
            (None, Some(dir)) => {
                let path = dir.join("daftar_full.json");
                Box::new(
                    File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                )
            }
            (None, None) => Box::new(stdout()),
        };
        let snapshot = exporter.full_json(writer).await?;
        if output.is_some() || dir.is_some() {
            eprintln!(
                "Exported {} clients, {} invoices, {} revenue entries, {} expenses",
                snapshot.clients.len(),
                snapshot.invoices.len(),
                snapshot.revenue.len(),
                snapshot.expenses.len()
            );
        }
        return Ok(());
    }

    let export: CsvExport = match parse_kind(export_type) {
        Ok(EntryKind::Client) => exporter.clients_csv().await?,
        Ok(EntryKind::Invoice) => exporter.invoices_csv().await?,
        Ok(EntryKind::Revenue) => exporter.revenue_csv().await?,
        Ok(EntryKind::Expense) => exporter.expenses_csv().await?,
        Err(_) => anyhow::bail!(
            "Invalid export type '{}'. Valid types: clients, invoices, revenue, expenses, full",
            export_type
        ),
    };

    match (output, dir) {
        (Some(path), _) => {
            std::fs::write(path, &export.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported {} rows to {}", export.rows, path.display());
        }
        (None, Some(dir)) => {
            let path = export.save_in(dir)?;
            eprintln!("Exported {} rows to {}", export.rows, path.display());
        }
        (None, None) => {
            let mut out = stdout();
            out.write_all(&export.bytes)?;
            out.flush()?;
        }
    }
    Ok(())
}

async fn run_import_command(
    service: &BookkeepingService,
    import_type: &str,
    input: Option<&Path>,
    arabic: bool,
    dry_run: bool,
) -> Result<()> {
    use std::io::{stdin, Read};

    let kind = parse_kind(import_type)?;
    let data = match input {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let mut buffer = Vec::new();
            stdin().read_to_end(&mut buffer)?;
            buffer
        }
    };

    let columns = if arabic {
        ColumnMap::arabic(kind)
    } else {
        ColumnMap::english(kind)
    };
    let options = ImportOptions { dry_run };
    let importer = Importer::new(service);

    let result: ImportResult = match kind {
        EntryKind::Client => importer.import_clients(&data, &columns, &options).await?,
        EntryKind::Invoice => importer.import_invoices(&data, &columns, &options).await?,
        EntryKind::Revenue => importer.import_revenue(&data, &columns, &options).await?,
        EntryKind::Expense => importer.import_expenses(&data, &columns, &options).await?,
    };

    if dry_run {
        println!("Dry run: {} {} records would be imported", result.imported, kind);
    } else {
        println!("Imported {} {} records", result.imported, kind);
    }
    if result.skipped > 0 {
        println!("Skipped {}", result.skipped);
    }
    for error in &result.errors {
        match &error.field {
            Some(field) => println!("  line {}: {}: {}", error.line, field, error.error),
            None => println!("  line {}: {}", error.line, error.error),
        }
    }
    Ok(())
}

async fn run_stats_command(service: &BookkeepingService) -> Result<()> {
    let stats = service.system_stats().await?;
    println!("Clients:          {}", stats.clients);
    println!("Invoices:         {}", stats.invoices);
    println!("Revenue entries:  {}", stats.revenue_entries);
    println!("Expense entries:  {}", stats.expense_entries);
    println!(
        "System time:      {}",
        stats
            .generated_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

fn parse_kind(s: &str) -> Result<EntryKind> {
    EntryKind::from_str(s).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid record kind '{}'. Valid kinds: client, invoice, revenue, expense",
            s
        )
    })
}

fn date_filter(from: Option<&str>, to: Option<&str>) -> Result<EntryFilter> {
    Ok(EntryFilter::all().between(
        from.map(parse_date).transpose()?,
        to.map(parse_date).transpose()?,
    ))
}

/// Shorten to `max_len` characters (not bytes, names are often Arabic).
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").context("Date must be in YYYY-MM-DD format")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("شركة التقنية المحدودة", 8), "شركة ...");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("29/02/2024").is_err());
    }

    #[test]
    fn test_cli_parses_invoice_add() {
        let cli = Cli::try_parse_from([
            "daftar",
            "--database",
            ":memory:",
            "invoice",
            "add",
            "--client",
            "3",
            "1,250.50",
            "--tax-rate",
            "15",
        ])
        .unwrap();

        assert_eq!(cli.database.as_deref(), Some(":memory:"));
        match cli.command {
            Commands::Invoice(InvoiceCommands::Add {
                client,
                amount,
                tax_rate,
                ..
            }) => {
                assert_eq!(client, 3);
                assert_eq!(amount, "1,250.50");
                assert_eq!(tax_rate, Some(15));
            }
            _ => panic!("expected invoice add"),
        }
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

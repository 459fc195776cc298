mod common;

use anyhow::Result;
use common::{memory_service, parse_date, test_service, StandardClients};
use daftar::application::{AppError, BookkeepingService, NewInvoice};
use daftar::config::Settings;
use daftar::domain::{Country, EntryKind, TaxPolicy};
use daftar::storage::EntryFilter;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn test_add_invoice_computes_tax_and_total() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (acme, _) = StandardClients::create_basic(&service).await?;

    let receipt = service
        .add_invoice(NewInvoice {
            client_id: acme.id,
            amount: 5000.0,
            tax_rate: Some(15),
            description: Some("Website design".into()),
            date: Some(parse_date("2024-04-01")),
        })
        .await?;

    assert!(approx(receipt.invoice.tax, 750.0));
    assert!(approx(receipt.total, 5750.0));
    assert_eq!(receipt.tax_rate_percent, 15);
    assert_eq!(receipt.invoice.client_name(), "Acme");
    assert_eq!(receipt.invoice.date, parse_date("2024-04-01"));

    let stored = service.list_invoices(&EntryFilter::all()).await?;
    assert_eq!(stored.invoices, vec![receipt.invoice]);
    Ok(())
}

#[tokio::test]
async fn test_default_tax_rate_applies() -> Result<()> {
    let service = memory_service().await?;
    let (acme, _) = StandardClients::create_basic(&service).await?;

    let receipt = service
        .add_invoice(NewInvoice {
            client_id: acme.id,
            amount: 200.0,
            ..Default::default()
        })
        .await?;

    assert_eq!(receipt.tax_rate_percent, 5);
    assert!(approx(receipt.invoice.tax, 10.0));
    Ok(())
}

#[tokio::test]
async fn test_fixed_tax_policy_ignores_requested_rate() -> Result<()> {
    let settings = Settings {
        tax_policy: TaxPolicy::Fixed { percent: 10 },
        ..Settings::in_memory()
    };
    let service = BookkeepingService::open(settings).await?;
    let client = service
        .add_client("Acme", Some(Country::Bahrain), "1")
        .await?;

    let receipt = service
        .add_invoice(NewInvoice {
            client_id: client.id,
            amount: 100.0,
            tax_rate: Some(15),
            ..Default::default()
        })
        .await?;

    assert_eq!(receipt.tax_rate_percent, 10);
    assert!(approx(receipt.total, 110.0));
    Ok(())
}

#[tokio::test]
async fn test_tax_rate_above_maximum_rejected() -> Result<()> {
    let service = memory_service().await?;
    let (acme, _) = StandardClients::create_basic(&service).await?;

    let err = service
        .add_invoice(NewInvoice {
            client_id: acme.id,
            amount: 100.0,
            tax_rate: Some(21),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TaxRateOutOfRange { rate: 21, max: 20 }));
    assert!(service.list_invoices(&EntryFilter::all()).await?.invoices.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_invoice_validation() -> Result<()> {
    let service = memory_service().await?;
    let (acme, _) = StandardClients::create_basic(&service).await?;

    for amount in [0.0, -5.0, f64::NAN] {
        let err = service
            .add_invoice(NewInvoice {
                client_id: acme.id,
                amount,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "amount", .. }));
    }

    let err = service
        .add_invoice(NewInvoice {
            client_id: 999,
            amount: 10.0,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ClientNotFound(999)));
    Ok(())
}

#[tokio::test]
async fn test_list_invoices_newest_first_with_grand_total() -> Result<()> {
    let service = memory_service().await?;
    let (acme, globex) = StandardClients::create_basic(&service).await?;
    StandardClients::invoice(&service, &acme, 100.0, 10, "2024-01-05").await?;
    StandardClients::invoice(&service, &globex, 200.0, 0, "2024-03-05").await?;
    StandardClients::invoice(&service, &acme, 300.0, 5, "2024-02-05").await?;

    let list = service.list_invoices(&EntryFilter::all()).await?;
    let dates: Vec<String> = list.invoices.iter().map(|i| i.date.to_string()).collect();
    assert_eq!(dates, vec!["2024-03-05", "2024-02-05", "2024-01-05"]);

    // 110 + 200 + 315
    assert!(approx(list.grand_total.unwrap(), 625.0));
    Ok(())
}

#[tokio::test]
async fn test_list_invoices_filters() -> Result<()> {
    let service = memory_service().await?;
    let (acme, globex) = StandardClients::create_basic(&service).await?;
    StandardClients::invoice(&service, &acme, 100.0, 0, "2024-01-05").await?;
    StandardClients::invoice(&service, &globex, 200.0, 0, "2024-02-05").await?;
    StandardClients::invoice(&service, &acme, 300.0, 0, "2024-03-05").await?;

    let by_client = service
        .list_invoices(&EntryFilter::all().client_id(acme.id))
        .await?;
    assert_eq!(by_client.invoices.len(), 2);

    let in_range = service
        .list_invoices(&EntryFilter::all().between(
            Some(parse_date("2024-02-01")),
            Some(parse_date("2024-03-05")),
        ))
        .await?;
    assert_eq!(in_range.invoices.len(), 2);

    let limited = service.list_invoices(&EntryFilter::all().limit(1)).await?;
    assert_eq!(limited.invoices.len(), 1);
    assert_eq!(limited.invoices[0].date, parse_date("2024-03-05"));

    let none = service
        .list_invoices(&EntryFilter::all().client_id(globex.id + 100))
        .await?;
    assert!(none.invoices.is_empty());
    assert_eq!(none.grand_total, None);
    Ok(())
}

#[tokio::test]
async fn test_ids_are_not_reused_after_delete() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (acme, _) = StandardClients::create_basic(&service).await?;
    StandardClients::invoice(&service, &acme, 100.0, 0, "2024-01-05").await?;
    StandardClients::invoice(&service, &acme, 100.0, 0, "2024-01-06").await?;

    let list = service.list_invoices(&EntryFilter::all()).await?;
    let newest_id = list.invoices.iter().map(|i| i.id).max().unwrap();
    service.delete_entry(EntryKind::Invoice, newest_id).await?;

    let receipt = service
        .add_invoice(NewInvoice {
            client_id: acme.id,
            amount: 1.0,
            ..Default::default()
        })
        .await?;
    assert!(receipt.invoice.id > newest_id);

    let err = service
        .delete_entry(EntryKind::Invoice, newest_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::RecordNotFound {
            kind: EntryKind::Invoice,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_sample_data_seeds_once() -> Result<()> {
    let service = memory_service().await?;

    assert!(service.seed_sample_data().await?);
    assert!(!service.seed_sample_data().await?);

    assert_eq!(service.list_clients().await?.len(), 2);
    let list = service.list_invoices(&EntryFilter::all()).await?;
    assert_eq!(list.invoices.len(), 1);
    assert!(approx(list.grand_total.unwrap(), 5250.0));
    assert_eq!(list.invoices[0].client_name(), "شركة التقنية المحدودة");
    Ok(())
}

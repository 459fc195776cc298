mod common;

use anyhow::Result;
use common::{memory_service, test_service, StandardClients};
use daftar::application::{AppError, BookkeepingService};
use daftar::config::Settings;
use daftar::domain::{ClientRef, Country, EntryKind};
use daftar::storage::EntryFilter;

#[tokio::test]
async fn test_add_and_list_clients() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let client = service
        .add_client("  شركة التقنية المحدودة ", Some(Country::SaudiArabia), "0112345678")
        .await?;
    assert!(client.id > 0);
    assert_eq!(client.name, "شركة التقنية المحدودة");

    let clients = service.list_clients().await?;
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0], client);

    Ok(())
}

#[tokio::test]
async fn test_client_requires_name_country_and_contact() -> Result<()> {
    let service = memory_service().await?;

    let err = service
        .add_client("", Some(Country::Oman), "123")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { field: "name", .. }));

    let err = service.add_client("Acme", None, "123").await.unwrap_err();
    assert!(matches!(err, AppError::Validation { field: "country", .. }));

    let err = service
        .add_client("Acme", Some(Country::Oman), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { field: "contact", .. }));

    assert!(service.list_clients().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_duplicate_client_names_rejected_by_default() -> Result<()> {
    let service = memory_service().await?;
    service
        .add_client("Acme", Some(Country::Qatar), "1")
        .await?;

    let err = service
        .add_client("Acme", Some(Country::Kuwait), "2")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateClient(name) if name == "Acme"));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_client_names_allowed_when_configured() -> Result<()> {
    let settings = Settings {
        unique_client_names: false,
        ..Settings::in_memory()
    };
    let service = BookkeepingService::open(settings).await?;

    let first = service.add_client("Acme", Some(Country::Qatar), "1").await?;
    let second = service.add_client("Acme", Some(Country::Qatar), "1").await?;
    assert_ne!(first.id, second.id);
    assert_eq!(service.list_clients().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_recent_clients_newest_first_and_limited() -> Result<()> {
    let settings = Settings {
        recent_clients: 2,
        ..Settings::in_memory()
    };
    let service = BookkeepingService::open(settings).await?;

    for name in ["First", "Second", "Third"] {
        service.add_client(name, Some(Country::Uae), "x").await?;
    }

    let recent = service.recent_clients().await?;
    let names: Vec<&str> = recent.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Third", "Second"]);
    Ok(())
}

#[tokio::test]
async fn test_deleting_client_keeps_invoices_as_orphans() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (acme, globex) = StandardClients::create_basic(&service).await?;
    StandardClients::invoice(&service, &acme, 1000.0, 5, "2024-01-10").await?;
    StandardClients::invoice(&service, &globex, 500.0, 5, "2024-01-11").await?;

    service.delete_entry(EntryKind::Client, acme.id).await?;

    let list = service.list_invoices(&EntryFilter::all()).await?;
    assert_eq!(list.invoices.len(), 2);

    let orphan = list
        .invoices
        .iter()
        .find(|i| i.client.name() == "Acme")
        .unwrap();
    assert_eq!(
        orphan.client,
        ClientRef::Orphaned {
            former_id: Some(acme.id),
            name: "Acme".into()
        }
    );

    let linked = list
        .invoices
        .iter()
        .find(|i| i.client.name() == "Globex")
        .unwrap();
    assert!(!linked.client.is_orphaned());

    // Orphaned invoices still count
    let summary = service.summary().await?;
    assert_eq!(summary.total_invoiced, Some(1500.0));
    Ok(())
}

#[tokio::test]
async fn test_delete_all_clients() -> Result<()> {
    let service = memory_service().await?;
    let (acme, _) = StandardClients::create_basic(&service).await?;
    StandardClients::invoice(&service, &acme, 200.0, 0, "2024-03-01").await?;

    assert_eq!(service.delete_all_clients().await?, 2);
    assert!(service.list_clients().await?.is_empty());
    assert_eq!(service.summary().await?.total_invoiced, Some(200.0));

    let list = service.list_invoices(&EntryFilter::all()).await?;
    assert_eq!(list.invoices.len(), 1);
    assert!(list.invoices[0].client.is_orphaned());
    Ok(())
}

#[tokio::test]
async fn test_delete_missing_client() -> Result<()> {
    let service = memory_service().await?;
    let err = service
        .delete_entry(EntryKind::Client, 42)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ClientNotFound(42)));
    Ok(())
}

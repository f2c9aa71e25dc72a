//! Integration tests for invoice persistence: numbering, totals, item edits
//! and status transitions.

mod common;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use factura_core::invoice::{InvoiceError, InvoiceLifecycle, LineItemInput, year_prefix};
use factura_db::InvoiceRepository;
use factura_db::entities::sea_orm_active_enums::InvoiceStatus;
use factura_db::repositories::{
    CreateInvoiceInput, InvoiceFilter, InvoiceRepoError, UpdateInvoiceInput, UpdateItemInput,
};
use factura_shared::types::PageRequest;

use common::{connect, create_client, register};

fn item(description: &str, quantity: i64, unit_price: i64) -> LineItemInput {
    LineItemInput {
        description: description.to_string(),
        quantity: Decimal::from(quantity),
        unit_price: Decimal::from(unit_price),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn draft(client_id: Uuid) -> CreateInvoiceInput {
    CreateInvoiceInput {
        client_id,
        invoice_number: None,
        date: date(2026, 3, 1),
        due_date: date(2026, 3, 31),
        tax_rate: Some(Decimal::from(19)),
        notes: None,
        items: vec![item("Design", 2, 10), item("Hosting", 1, 5)],
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_create_computes_totals_and_numbers() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let client = create_client(&db, business_id).await;
    let repo = InvoiceRepository::new(db.clone());

    let first = repo.create(business_id, draft(client.id)).await.expect("create");
    let second = repo.create(business_id, draft(client.id)).await.expect("create");

    let prefix = year_prefix(Utc::now().year());
    assert_eq!(first.invoice.invoice_number, format!("{prefix}001"));
    assert_eq!(second.invoice.invoice_number, format!("{prefix}002"));

    assert_eq!(first.invoice.status, InvoiceStatus::Draft);
    assert_eq!(first.invoice.subtotal, Decimal::from(25));
    assert_eq!(first.invoice.tax, Decimal::new(4750, 3));
    assert_eq!(first.invoice.total, Decimal::new(29750, 3));
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].amount, Decimal::from(20));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_concurrent_creates_get_distinct_numbers() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let client = create_client(&db, business_id).await;
    let repo = InvoiceRepository::new(db.clone());

    let (a, b, c) = tokio::join!(
        repo.create(business_id, draft(client.id)),
        repo.create(business_id, draft(client.id)),
        repo.create(business_id, draft(client.id)),
    );
    let mut numbers = vec![
        a.expect("a").invoice.invoice_number,
        b.expect("b").invoice.invoice_number,
        c.expect("c").invoice.invoice_number,
    ];
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 3);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_duplicate_manual_number_is_rejected() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let client = create_client(&db, business_id).await;
    let repo = InvoiceRepository::new(db.clone());

    let mut input = draft(client.id);
    input.invoice_number = Some("MANUAL-1".to_string());
    repo.create(business_id, input.clone()).await.expect("first");

    let result = repo.create(business_id, input).await;
    assert!(matches!(result, Err(InvoiceRepoError::DuplicateNumber(n)) if n == "MANUAL-1"));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_client_of_other_business_is_rejected() {
    let db = connect().await;
    let ours = register(&db).await;
    let theirs = register(&db).await;
    let foreign_client = create_client(&db, theirs.business.id).await;

    let result = InvoiceRepository::new(db.clone())
        .create(ours.business.id, draft(foreign_client.id))
        .await;
    assert!(matches!(result, Err(InvoiceRepoError::ClientNotFound)));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_item_edits_recalculate_totals() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let client = create_client(&db, business_id).await;
    let repo = InvoiceRepository::new(db.clone());

    let created = repo.create(business_id, draft(client.id)).await.expect("create");
    let id = created.invoice.id;

    let added = repo
        .add_item(business_id, id, item("Support", 3, 5))
        .await
        .expect("add item");
    assert_eq!(added.invoice.subtotal, Decimal::from(40));
    assert_eq!(added.invoice.total, added.invoice.subtotal + added.invoice.tax);

    let design = &created.items[0];
    let updated = repo
        .update_item(
            business_id,
            id,
            design.id,
            UpdateItemInput {
                quantity: Some(Decimal::ONE),
                ..Default::default()
            },
        )
        .await
        .expect("update item");
    assert_eq!(updated.invoice.subtotal, Decimal::from(30));

    let removed = repo
        .delete_item(business_id, id, design.id)
        .await
        .expect("delete item");
    assert_eq!(removed.items.len(), 2);
    assert_eq!(removed.invoice.subtotal, Decimal::from(20));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_concurrent_item_adds_keep_totals_consistent() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let client = create_client(&db, business_id).await;
    let repo = InvoiceRepository::new(db.clone());
    let id = repo
        .create(business_id, draft(client.id))
        .await
        .expect("create")
        .invoice
        .id;

    let (a, b) = tokio::join!(
        repo.add_item(business_id, id, item("A", 1, 100)),
        repo.add_item(business_id, id, item("B", 1, 200)),
    );
    a.expect("a");
    b.expect("b");

    let loaded = repo.get(business_id, id).await.expect("get");
    let sum: Decimal = loaded.items.iter().map(|i| i.amount).sum();
    assert_eq!(loaded.items.len(), 4);
    assert_eq!(loaded.invoice.subtotal, sum);
    assert_eq!(loaded.invoice.subtotal, Decimal::from(325));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_last_item_cannot_be_removed() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let client = create_client(&db, business_id).await;
    let repo = InvoiceRepository::new(db.clone());

    let mut input = draft(client.id);
    input.items.truncate(1);
    let created = repo.create(business_id, input).await.expect("create");

    let result = repo
        .delete_item(business_id, created.invoice.id, created.items[0].id)
        .await;
    assert!(matches!(result, Err(InvoiceRepoError::Rule(InvoiceError::NoItems))));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_lifecycle_locks_editing() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let client = create_client(&db, business_id).await;
    let repo = InvoiceRepository::new(db.clone());
    let id = repo
        .create(business_id, draft(client.id))
        .await
        .expect("create")
        .invoice
        .id;

    let sent = repo
        .transition(business_id, id, |inv| InvoiceLifecycle::send(inv.status.into()))
        .await
        .expect("send");
    assert_eq!(sent.status, InvoiceStatus::Sent);

    let edit = repo
        .update(
            business_id,
            id,
            UpdateInvoiceInput {
                notes: Some("late change".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(edit, Err(InvoiceRepoError::Rule(InvoiceError::NotDraft { .. }))));
    assert!(repo.delete(business_id, id).await.is_err());

    let paid_on = date(2026, 3, 15);
    let paid = repo
        .transition(business_id, id, |inv| {
            InvoiceLifecycle::mark_paid(
                inv.status.into(),
                Some(paid_on),
                Some("bank transfer".to_string()),
                paid_on,
            )
        })
        .await
        .expect("mark paid");
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.paid_at, Some(paid_on));
    assert_eq!(paid.payment_method.as_deref(), Some("bank transfer"));

    let cancel = repo
        .transition(business_id, id, |inv| {
            InvoiceLifecycle::cancel(inv.status.into(), inv.notes.as_deref(), None)
        })
        .await;
    assert!(matches!(cancel, Err(InvoiceRepoError::Rule(_))));

    let (paid_only, total) = repo
        .list(
            business_id,
            &InvoiceFilter {
                status: Some(InvoiceStatus::Paid),
                client_id: None,
            },
            &PageRequest::default(),
        )
        .await
        .expect("list");
    assert_eq!(total, 1);
    assert_eq!(paid_only[0].id, id);
}

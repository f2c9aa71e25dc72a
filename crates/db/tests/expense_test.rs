//! Integration tests for the expense approval workflow.

mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use factura_core::auth::Role;
use factura_core::expense::{Actor, ExpenseError, ExpenseWorkflow, list_scope};
use factura_db::entities::sea_orm_active_enums::ExpenseStatus;
use factura_db::repositories::{
    CreateExpenseInput, ExpenseFilter, ExpenseRepoError, UpdateExpenseInput,
};
use factura_db::{ExpenseCategoryRepository, ExpenseRepository};
use factura_shared::types::PageRequest;

use common::{connect, register};

fn expense(category_id: Option<uuid::Uuid>) -> CreateExpenseInput {
    CreateExpenseInput {
        category_id,
        amount: Decimal::new(12_500, 3),
        date: NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date"),
        description: "Taxi to client".to_string(),
        vendor: Some("Taxi Tunis".to_string()),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_submit_approve_flow() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let owner = registered.user.id;
    let category = ExpenseCategoryRepository::new(db.clone())
        .create(business_id, "Travel".to_string(), None)
        .await
        .expect("category");
    let repo = ExpenseRepository::new(db.clone());

    let created = repo
        .create(business_id, owner, expense(Some(category.id)))
        .await
        .expect("create");
    assert_eq!(created.status, ExpenseStatus::Draft);

    let pending = repo
        .apply_action(business_id, created.id, |e| {
            ExpenseWorkflow::submit(e.status.into(), e.user_id, owner)
        })
        .await
        .expect("submit");
    assert_eq!(pending.status, ExpenseStatus::Pending);

    // Pending expenses are frozen for their owner.
    let member = Actor::new(owner, Role::TeamMember);
    let edit = repo
        .update(
            business_id,
            created.id,
            &member,
            UpdateExpenseInput {
                vendor: Some("Other".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(edit, Err(ExpenseRepoError::Rule(_))));

    let approved = repo
        .apply_action(business_id, created.id, |e| {
            ExpenseWorkflow::approve(e.status.into(), owner, Some("ok".to_string()))
        })
        .await
        .expect("approve");
    assert_eq!(approved.status, ExpenseStatus::Approved);
    assert_eq!(approved.approved_by, Some(owner));
    assert!(approved.approved_at.is_some());
    assert_eq!(approved.approval_notes.as_deref(), Some("ok"));

    let again = repo
        .apply_action(business_id, created.id, |e| {
            ExpenseWorkflow::reject(e.status.into(), owner, "too late")
        })
        .await;
    assert!(matches!(
        again,
        Err(ExpenseRepoError::Rule(ExpenseError::WrongStatus { .. }))
    ));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_reject_stores_reason_and_filters() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let owner = registered.user.id;
    let repo = ExpenseRepository::new(db.clone());

    let created = repo.create(business_id, owner, expense(None)).await.expect("create");
    repo.apply_action(business_id, created.id, |e| {
        ExpenseWorkflow::submit(e.status.into(), e.user_id, owner)
    })
    .await
    .expect("submit");
    let rejected = repo
        .apply_action(business_id, created.id, |e| {
            ExpenseWorkflow::reject(e.status.into(), owner, "no receipt")
        })
        .await
        .expect("reject");
    assert_eq!(rejected.status, ExpenseStatus::Rejected);
    assert_eq!(rejected.approval_notes.as_deref(), Some("no receipt"));

    let (rows, total) = repo
        .list(
            business_id,
            &ExpenseFilter {
                status: Some(ExpenseStatus::Rejected),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .expect("list");
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, created.id);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_category_of_other_business_is_rejected() {
    let db = connect().await;
    let ours = register(&db).await;
    let theirs = register(&db).await;
    let foreign = ExpenseCategoryRepository::new(db.clone())
        .create(theirs.business.id, "Office".to_string(), None)
        .await
        .expect("category");

    let result = ExpenseRepository::new(db.clone())
        .create(ours.business.id, ours.user.id, expense(Some(foreign.id)))
        .await;
    assert!(matches!(result, Err(ExpenseRepoError::CategoryNotFound)));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_receipt_replacement_returns_previous_key() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let repo = ExpenseRepository::new(db.clone());
    let created = repo
        .create(business_id, registered.user.id, expense(None))
        .await
        .expect("create");

    let (_, previous) = repo
        .set_receipt(business_id, created.id, Some("receipts/a.pdf".to_string()))
        .await
        .expect("first upload");
    assert!(previous.is_none());

    let (updated, previous) = repo
        .set_receipt(business_id, created.id, Some("receipts/b.pdf".to_string()))
        .await
        .expect("second upload");
    assert_eq!(previous.as_deref(), Some("receipts/a.pdf"));
    assert_eq!(updated.receipt_url.as_deref(), Some("receipts/b.pdf"));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_list_filters_by_submitter() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let owner = registered.user.id;
    let colleague = register(&db).await.user.id;
    let repo = ExpenseRepository::new(db.clone());

    repo.create(business_id, owner, expense(None)).await.expect("create");
    let theirs = repo
        .create(business_id, colleague, expense(None))
        .await
        .expect("create");

    let approver = Actor::new(owner, Role::Accountant);
    let (rows, total) = repo
        .list(
            business_id,
            &ExpenseFilter {
                scope: list_scope(&approver),
                user_id: Some(colleague),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .expect("list");
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, theirs.id);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_member_asking_for_someone_else_gets_empty_page() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let colleague = register(&db).await.user.id;
    let repo = ExpenseRepository::new(db.clone());

    repo.create(business_id, colleague, expense(None))
        .await
        .expect("create");
    let member_id = registered.user.id;
    repo.create(business_id, member_id, expense(None))
        .await
        .expect("create");

    let member = Actor::new(member_id, Role::TeamMember);
    let (rows, total) = repo
        .list(
            business_id,
            &ExpenseFilter {
                scope: list_scope(&member),
                user_id: Some(colleague),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .expect("list");
    assert_eq!(total, 0);
    assert!(rows.is_empty());

    let (own, _) = repo
        .list(
            business_id,
            &ExpenseFilter {
                scope: list_scope(&member),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .expect("list");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].user_id, member_id);
}

//! Integration tests for signup and the identity repositories.

mod common;

use chrono::{Duration, Utc};
use factura_db::entities::sea_orm_active_enums::{UserRole, UserTokenType};
use factura_db::entities::tenants;
use factura_db::repositories::{RegistrationError, TaxRateError, UserTokenError};
use factura_db::{
    BusinessRepository, RefreshTokenRepository, RegistrationRepository, TaxRateRepository,
    TenantRepository, UserRepository, UserTokenRepository,
};
use factura_shared::{AppError, types::PageRequest};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use common::{connect, register, registration_input};

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_register_creates_every_record() {
    let db = connect().await;
    let registered = register(&db).await;

    assert_eq!(registered.user.role, UserRole::BusinessOwner);
    assert_eq!(registered.user.tenant_id, Some(registered.tenant.id));
    assert!(!registered.user.is_verified);
    assert_eq!(registered.tenant.owner_id, Some(registered.user.id));
    assert_eq!(registered.business.tenant_id, registered.tenant.id);
    assert!(registered.tax_rate.is_default);

    let settings = BusinessRepository::new(db.clone())
        .get_settings(registered.business.id)
        .await
        .expect("settings exist");
    assert_eq!(settings.invoice_prefix, "INV-");
    assert_eq!(settings.payment_terms, 30);

    let owned = TenantRepository::new(db.clone())
        .find_by_owner(registered.user.id)
        .await
        .expect("owner has a tenant");
    assert_eq!(owned.id, registered.tenant.id);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_register_duplicate_email_rolls_back() {
    let db = connect().await;
    let first = register(&db).await;
    let repo = RegistrationRepository::new(db.clone());

    let result = repo.register(registration_input(&first.user.email)).await;
    assert!(matches!(result, Err(RegistrationError::EmailTaken)));

    let tenants_for_email = tenants::Entity::find()
        .filter(tenants::Column::ContactEmail.eq(first.user.email.clone()))
        .count(&db)
        .await
        .expect("count tenants");
    assert_eq!(tenants_for_email, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_refresh_token_reuse_fails() {
    let db = connect().await;
    let registered = register(&db).await;
    let repo = RefreshTokenRepository::new(db.clone());
    let expires = Utc::now() + Duration::days(7);

    let token = repo.create(registered.user.id, expires).await.expect("issue");

    let rotated = repo.rotate(&token, expires).await.expect("rotate");
    let rotated = rotated.expect("first rotation succeeds");
    assert_ne!(rotated.token, token);
    assert_eq!(rotated.user.id, registered.user.id);

    let reused = repo.rotate(&token, expires).await.expect("rotate again");
    assert!(reused.is_none());

    assert!(repo.revoke(&rotated.token).await.expect("logout"));
    assert!(repo.rotate(&rotated.token, expires).await.expect("rotate").is_none());
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_suspended_user_cannot_refresh() {
    let db = connect().await;
    let registered = register(&db).await;
    let tokens = RefreshTokenRepository::new(db.clone());
    let expires = Utc::now() + Duration::days(7);
    let token = tokens.create(registered.user.id, expires).await.expect("issue");

    UserRepository::new(db.clone())
        .set_suspended(registered.user.id, true)
        .await
        .expect("suspend");

    assert!(tokens.rotate(&token, expires).await.expect("rotate").is_none());
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_verify_email_is_single_use() {
    let db = connect().await;
    let registered = register(&db).await;
    let repo = UserTokenRepository::new(db.clone());

    let stale = repo
        .create_token(registered.user.id, UserTokenType::EmailVerification)
        .await
        .expect("issue");
    let token = repo
        .create_token(registered.user.id, UserTokenType::EmailVerification)
        .await
        .expect("reissue");

    assert!(matches!(
        repo.verify_email(&stale).await,
        Err(UserTokenError::InvalidToken)
    ));

    let user = repo.verify_email(&token).await.expect("verify");
    assert!(user.is_verified);
    assert!(matches!(
        repo.verify_email(&token).await,
        Err(UserTokenError::InvalidToken)
    ));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_reset_password_revokes_refresh_tokens() {
    let db = connect().await;
    let registered = register(&db).await;
    let tokens = RefreshTokenRepository::new(db.clone());
    let resets = UserTokenRepository::new(db.clone());
    let expires = Utc::now() + Duration::days(7);

    let refresh = tokens.create(registered.user.id, expires).await.expect("issue");
    let reset = resets
        .create_token(registered.user.id, UserTokenType::PasswordReset)
        .await
        .expect("reset token");

    // A reset token is not accepted as a verification token.
    assert!(resets.verify_email(&reset).await.is_err());

    let user = resets
        .reset_password(&reset, "$argon2id$new")
        .await
        .expect("reset");
    assert_eq!(user.password_hash, "$argon2id$new");
    assert!(tokens.rotate(&refresh, expires).await.expect("rotate").is_none());
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_tax_rate_single_default() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let repo = TaxRateRepository::new(db.clone());

    let reduced = repo
        .create(
            business_id,
            factura_db::repositories::CreateTaxRateInput {
                name: "TVA 7%".to_string(),
                rate: 7.into(),
                is_default: true,
            },
        )
        .await
        .expect("create");

    let (rates, _) = repo
        .list(business_id, &PageRequest::default())
        .await
        .expect("list");
    let defaults: Vec<_> = rates.iter().filter(|r| r.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, reduced.id);

    repo.update(
        business_id,
        registered.tax_rate.id,
        factura_db::repositories::UpdateTaxRateInput {
            is_default: Some(true),
            ..Default::default()
        },
    )
    .await
    .expect("update");

    let current = repo
        .find_default(business_id)
        .await
        .expect("query")
        .expect("one default");
    assert_eq!(current.id, registered.tax_rate.id);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_racing_default_rates_conflict_instead_of_failing() {
    let db = connect().await;
    let registered = register(&db).await;
    let business_id = registered.business.id;
    let repo = TaxRateRepository::new(db.clone());

    let input = |name: &str| factura_db::repositories::CreateTaxRateInput {
        name: name.to_string(),
        rate: 10.into(),
        is_default: true,
    };
    let (a, b) = tokio::join!(
        repo.create(business_id, input("A")),
        repo.create(business_id, input("B")),
    );

    for result in [&a, &b] {
        assert!(
            matches!(result, Ok(_) | Err(TaxRateError::DefaultTaken)),
            "unexpected outcome: {result:?}"
        );
    }
    assert!(a.is_ok() || b.is_ok());

    let (rates, _) = repo
        .list(business_id, &PageRequest::default())
        .await
        .expect("list");
    assert_eq!(rates.iter().filter(|r| r.is_default).count(), 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_unknown_tenant_lookup_is_not_found() {
    let db = connect().await;
    let err = TenantRepository::new(db)
        .get(uuid::Uuid::new_v4())
        .await
        .expect_err("no such tenant");
    let err: AppError = err.into();
    assert_eq!(err.status_code(), 404);
}

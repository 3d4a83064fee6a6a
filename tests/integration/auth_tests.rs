//! Authorization gate integration tests.
//!
//! Tests verify:
//! - Valid credentials attach exactly one bearer header per request
//! - Expired and malformed credentials are purged before any dispatch
//! - Missing credentials are rejected locally
//! - Rejections are turned into a login redirect by the feedback handler
//! - Credentials persist across contexts sharing a state directory

use std::sync::Arc;
use std::time::Duration;

use ledgerdesk::config::ClientConfig;
use ledgerdesk::{
    handle_api_error, ApiError, AppContext, AuthError, FileStore, Notice, RecordingFeedback,
    Route,
};

use super::test_utils::{context_for, profile, signed_in_context, token_expiring_in, MockBackend};

// =============================================================================
// Valid Credentials
// =============================================================================

#[tokio::test]
async fn test_valid_token_sends_bearer_header() {
    let backend = MockBackend::start().await;
    let ctx = signed_in_context(&backend.base_url);
    let token = ctx.store().credential().unwrap().unwrap();

    ctx.client().payment_methods().await.unwrap();

    assert_eq!(
        backend.log.authorization(),
        vec![vec![format!("Bearer {}", token)]]
    );
}

#[tokio::test]
async fn test_repeated_requests_carry_one_header_each() {
    let backend = MockBackend::start().await;
    let ctx = signed_in_context(&backend.base_url);

    for _ in 0..3 {
        ctx.client().list_employees().await.unwrap();
    }

    let seen = backend.log.authorization();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|values| values.len() == 1));
    assert!(ctx.store().credential().unwrap().is_some());
}

// =============================================================================
// Expired / Malformed / Missing
// =============================================================================

#[tokio::test]
async fn test_expired_token_purged_without_dispatch() {
    let backend = MockBackend::start().await;
    let ctx = context_for(&backend.base_url);
    ctx.store()
        .save_login(&token_expiring_in(-1), &profile())
        .unwrap();
    ctx.store().select_company("7").unwrap();
    let feedback = RecordingFeedback::new();

    let err = ctx.client().list_employees().await.unwrap_err();
    handle_api_error(&err, &feedback);

    assert!(matches!(
        err,
        ApiError::Auth(AuthError::CredentialExpired {
            expired_at: Some(_),
            ..
        })
    ));
    assert_eq!(backend.log.hits(), 0);
    assert_eq!(ctx.store().credential().unwrap(), None);
    assert_eq!(ctx.store().profile().unwrap(), None);
    assert_eq!(ctx.store().selected_company().unwrap(), None);
    assert_eq!(feedback.redirects(), vec![Route::Login]);
    assert_eq!(feedback.notices(), vec![Notice::SessionExpired]);
}

#[tokio::test]
async fn test_expired_token_rejected_for_every_endpoint() {
    let backend = MockBackend::start().await;

    let ctx = context_for(&backend.base_url);
    ctx.store()
        .save_login(&token_expiring_in(-60), &profile())
        .unwrap();
    let first = ctx.client().payment_methods().await.unwrap_err();
    assert!(matches!(
        first,
        ApiError::Auth(AuthError::CredentialExpired { .. })
    ));

    // After the purge the same client reports no credential at all.
    let as_of = chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    let second = ctx.client().balance_sheet("7", as_of).await.unwrap_err();
    assert!(matches!(second, ApiError::Auth(AuthError::Unauthenticated)));

    assert_eq!(backend.log.hits(), 0);
}

#[tokio::test]
async fn test_malformed_token_treated_as_expired() {
    let backend = MockBackend::start().await;
    let ctx = context_for(&backend.base_url);
    ctx.store().save_login("not-a-token", &profile()).unwrap();

    let err = ctx.client().list_employees().await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::Auth(AuthError::CredentialExpired {
            expired_at: None,
            ..
        })
    ));
    assert_eq!(ctx.store().credential().unwrap(), None);
    assert_eq!(backend.log.hits(), 0);
}

#[tokio::test]
async fn test_missing_token_rejected_locally() {
    let backend = MockBackend::start().await;
    let ctx = context_for(&backend.base_url);
    let feedback = RecordingFeedback::new();

    let err = ctx.client().payment_methods().await.unwrap_err();
    handle_api_error(&err, &feedback);

    assert!(matches!(err, ApiError::Auth(AuthError::Unauthenticated)));
    assert!(!err.is_retryable());
    assert_eq!(feedback.notices(), vec![Notice::SignInRequired]);
    assert_eq!(backend.log.hits(), 0);
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_login_persists_across_contexts() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        api_url: backend.base_url.clone(),
        state_dir: dir.path().to_path_buf(),
        timeout: 5,
        verbose: false,
    };

    let first = AppContext::init(&config).unwrap();
    first
        .store()
        .save_login(&token_expiring_in(3600), &profile())
        .unwrap();
    first.store().select_company("7").unwrap();
    first.teardown().unwrap();

    let second = AppContext::init(&config).unwrap();
    assert_eq!(second.store().profile().unwrap(), Some(profile()));
    assert_eq!(second.store().selected_company().unwrap(), None);
    second.client().payment_methods().await.unwrap();
    assert_eq!(backend.log.hits(), 1);
}

#[tokio::test]
async fn test_expired_purge_visible_to_other_contexts() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let open = || Arc::new(FileStore::in_dir(dir.path()));

    let writer =
        AppContext::with_persistent(&backend.base_url, open(), Duration::from_secs(5)).unwrap();
    writer
        .store()
        .save_login(&token_expiring_in(-1), &profile())
        .unwrap();

    let reader =
        AppContext::with_persistent(&backend.base_url, open(), Duration::from_secs(5)).unwrap();
    assert!(reader.client().list_employees().await.is_err());

    assert_eq!(writer.store().credential().unwrap(), None);
}

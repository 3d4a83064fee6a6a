//! API integration tests against the mock backend.
//!
//! Tests verify:
//! - Typed decoding of backend responses
//! - Status mapping (4xx validation, 5xx failure, malformed bodies)
//! - The employee form's behavior on rejected and accepted submissions
//! - Per-view fetch failures

use chrono::NaiveDate;

use ledgerdesk::api::models::EmployeeDraft;
use ledgerdesk::views::{load, EmployeeForm, ViewState};
use ledgerdesk::{ApiError, Notice, RecordingFeedback};

use super::test_utils::{signed_in_context, MockBackend};

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
}

// =============================================================================
// Typed Responses
// =============================================================================

#[tokio::test]
async fn test_payment_methods_decoded() {
    let backend = MockBackend::start().await;
    let ctx = signed_in_context(&backend.base_url);

    let methods = ctx.client().payment_methods().await.unwrap();

    assert_eq!(methods.len(), 2);
    assert_eq!(methods[1].name, "Bank Transfer");
}

#[tokio::test]
async fn test_balance_sheet_sends_as_of_date() {
    let backend = MockBackend::start().await;
    let ctx = signed_in_context(&backend.base_url);

    let sheet = ctx.client().balance_sheet("7", as_of()).await.unwrap();

    assert_eq!(sheet.as_of_date, as_of());
    assert_eq!(sheet.assets[0].lines[0].account, "Cash");
    assert!(sheet.equity[0].lines.is_empty());
    assert_eq!(sheet.total_assets, 1500.0);
}

#[tokio::test]
async fn test_not_found_is_validation_error() {
    let backend = MockBackend::start().await;
    let ctx = signed_in_context(&backend.base_url);

    let err = ctx.client().balance_sheet("99", as_of()).await.unwrap_err();

    match err {
        ApiError::Validation { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Company not found");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_request_failure() {
    let backend = MockBackend::start().await;
    let ctx = signed_in_context(&backend.base_url);

    let err = ctx.client().stock_take("7").await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::RequestFailed {
            status: Some(503),
            ..
        }
    ));
    assert!(err.is_retryable());
    assert!(err.to_string().contains("database offline"));
}

#[tokio::test]
async fn test_shape_mismatch_is_malformed_response() {
    let backend = MockBackend::start().await;
    let ctx = signed_in_context(&backend.base_url);

    let err = ctx.client().ap_aging("7", as_of()).await.unwrap_err();

    match err {
        ApiError::MalformedResponse { path, .. } => assert_eq!(path, "/api/ap-aging/7"),
        other => panic!("expected malformed response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_auth_rejection_is_validation_error() {
    let backend = MockBackend::start().await;
    let ctx = signed_in_context(&backend.base_url);
    let feedback = RecordingFeedback::new();

    let err = ctx.client().list_invoices("7").await.unwrap_err();
    ledgerdesk::handle_api_error(&err, &feedback);

    match &err {
        ApiError::Validation { status, message } => {
            assert_eq!(*status, 401);
            assert_eq!(message, "Token has been revoked");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    // Only the local gate purges; the stored credential stays in place.
    assert!(ctx.store().credential().unwrap().is_some());
    assert!(feedback.redirects().is_empty());
    assert_eq!(backend.log.hits(), 1);
}

#[tokio::test]
async fn test_unreachable_backend() {
    // Bind then drop a listener so the port is closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ctx = signed_in_context(&format!("http://{}", addr));
    let err = ctx.client().payment_methods().await.unwrap_err();

    assert!(matches!(err, ApiError::RequestFailed { status: None, .. }));
}

// =============================================================================
// Employee Form
// =============================================================================

#[tokio::test]
async fn test_rejected_employee_keeps_form_open() {
    let backend = MockBackend::start().await;
    let ctx = signed_in_context(&backend.base_url);
    let feedback = RecordingFeedback::new();

    let mut form = EmployeeForm::create();
    *form.draft_mut() = EmployeeDraft {
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        salary: Some(-5.0),
        ..EmployeeDraft::default()
    };
    let entered = form.draft().clone();

    let result = form.submit(ctx.client(), &feedback).await;

    assert!(matches!(result, Err(ApiError::Validation { status: 400, .. })));
    assert!(form.is_open());
    assert_eq!(form.error(), Some("Salary must be a positive number"));
    assert_eq!(form.draft(), &entered);
    assert!(feedback.redirects().is_empty());
    assert_eq!(backend.log.hits(), 1);
}

#[tokio::test]
async fn test_accepted_employee_closes_form() {
    let backend = MockBackend::start().await;
    let ctx = signed_in_context(&backend.base_url);
    let feedback = RecordingFeedback::new();

    let mut form = EmployeeForm::create();
    form.draft_mut().first_name = "Grace".to_string();
    form.draft_mut().last_name = "Hopper".to_string();
    form.draft_mut().salary = Some(1000.0);

    let employee = form.submit(ctx.client(), &feedback).await.unwrap();

    assert_eq!(employee.id, 42);
    assert_eq!(employee.full_name(), "Grace Hopper");
    assert!(!form.is_open());
    assert!(form.error().is_none());
}

// =============================================================================
// Views
// =============================================================================

#[tokio::test]
async fn test_view_failure_is_local() {
    let backend = MockBackend::start().await;
    let ctx = signed_in_context(&backend.base_url);
    let feedback = RecordingFeedback::new();

    let failing = load(ctx.client().stock_take("7"), &feedback).await;
    let working = load(ctx.client().list_employees(), &feedback).await;

    assert!(failing.error().unwrap().contains("database offline"));
    assert_eq!(working.loaded().map(Vec::len), Some(1));
    assert!(feedback.notices().is_empty());
    assert!(feedback.redirects().is_empty());
}

#[tokio::test]
async fn test_view_auth_failure_notifies() {
    let backend = MockBackend::start().await;
    let ctx = super::test_utils::context_for(&backend.base_url);
    let feedback = RecordingFeedback::new();

    let state = load(ctx.client().list_employees(), &feedback).await;

    assert!(matches!(state, ViewState::Failed(_)));
    assert_eq!(feedback.notices(), vec![Notice::SignInRequired]);
    assert_eq!(backend.log.hits(), 0);
}

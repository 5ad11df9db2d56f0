use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{AccountKind, AccountRegistration, PackageId, UserId};
use super::repository::LedgerRepository;
use super::service::{SubscriptionService, SubscriptionServiceError};

/// Router builder exposing the catalog, account page, recharge, and gate endpoints.
pub fn subscription_router<R>(service: Arc<SubscriptionService<R>>) -> Router
where
    R: LedgerRepository + 'static,
{
    Router::new()
        .route("/api/v1/packages", get(packages_handler::<R>))
        .route("/api/v1/accounts", post(register_handler::<R>))
        .route("/api/v1/accounts/:user_id", get(account_handler::<R>))
        .route(
            "/api/v1/accounts/:user_id/subscription",
            get(subscription_handler::<R>),
        )
        .route(
            "/api/v1/accounts/:user_id/recharges",
            get(ledger_handler::<R>),
        )
        .route(
            "/api/v1/accounts/:user_id/recharges/:package_id",
            post(purchase_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PackageQuery {
    #[serde(default)]
    pub(crate) kind: Option<String>,
}

pub(crate) async fn packages_handler<R>(
    State(service): State<Arc<SubscriptionService<R>>>,
    Query(query): Query<PackageQuery>,
) -> Response
where
    R: LedgerRepository + 'static,
{
    let result = match query.kind.as_deref() {
        None => service.packages(),
        Some(raw) => match AccountKind::parse(raw) {
            Some(kind) => service.offers_for(kind),
            None => {
                let payload = json!({
                    "error": format!("unknown account kind '{raw}'"),
                });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        },
    };

    match result {
        Ok(packages) => (StatusCode::OK, axum::Json(packages)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn register_handler<R>(
    State(service): State<Arc<SubscriptionService<R>>>,
    axum::Json(registration): axum::Json<AccountRegistration>,
) -> Response
where
    R: LedgerRepository + 'static,
{
    match service.register_account(registration) {
        Ok(account) => (StatusCode::CREATED, axum::Json(account)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn account_handler<R>(
    State(service): State<Arc<SubscriptionService<R>>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: LedgerRepository + 'static,
{
    match service.account_overview(&UserId(user_id), Utc::now()) {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn subscription_handler<R>(
    State(service): State<Arc<SubscriptionService<R>>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: LedgerRepository + 'static,
{
    let user = UserId(user_id);
    match service.require_active_subscription(&user, Utc::now()) {
        Ok(account) => {
            let payload = json!({
                "user": user,
                "active": true,
                "recharge_validity": account.subscription().recharge_validity,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(SubscriptionServiceError::SubscriptionRequired(_)) => {
            let payload = json!({
                "user": user,
                "active": false,
                "error": "an active subscription is required",
            });
            (StatusCode::PAYMENT_REQUIRED, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn ledger_handler<R>(
    State(service): State<Arc<SubscriptionService<R>>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: LedgerRepository + 'static,
{
    let user = UserId(user_id);
    let result = service
        .account(&user)
        .and_then(|account| service.ledger(account.user()));

    match result {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn purchase_handler<R>(
    State(service): State<Arc<SubscriptionService<R>>>,
    Path((user_id, package_id)): Path<(String, u64)>,
) -> Response
where
    R: LedgerRepository + 'static,
{
    match service.purchase(&UserId(user_id), PackageId(package_id), Utc::now()) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: SubscriptionServiceError) -> Response {
    let payload = json!({
        "error": err.to_string(),
    });
    (err.status_code(), axum::Json(payload)).into_response()
}

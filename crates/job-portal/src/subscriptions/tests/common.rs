use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::subscriptions::domain::{
    AccountKind, AccountRegistration, Package, PackageDraft, RecruiterType, UserId,
};
use crate::subscriptions::memory::{InMemoryLedger, InMemoryTransaction};
use crate::subscriptions::repository::{LedgerRepository, RepositoryError};
use crate::subscriptions::{subscription_router, SubscriptionService};

pub(super) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn days(count: i64) -> Duration {
    Duration::days(count)
}

pub(super) fn candidate_id() -> UserId {
    UserId("cand-001".to_string())
}

pub(super) fn recruiter_id() -> UserId {
    UserId("recr-001".to_string())
}

pub(super) fn candidate_registration() -> AccountRegistration {
    AccountRegistration {
        user: candidate_id(),
        kind: AccountKind::Candidate,
        full_name: "Asha Verma".to_string(),
        email: Some("asha@example.com".to_string()),
        recruiter_type: None,
    }
}

pub(super) fn recruiter_registration() -> AccountRegistration {
    AccountRegistration {
        user: recruiter_id(),
        kind: AccountKind::Recruiter,
        full_name: "Northwind Hiring".to_string(),
        email: Some("jobs@northwind.example".to_string()),
        recruiter_type: Some(RecruiterType::Company),
    }
}

pub(super) fn package_draft(
    name: &str,
    account_kind: AccountKind,
    validity_days: u32,
) -> PackageDraft {
    PackageDraft {
        name: name.to_string(),
        account_kind,
        price: validity_days * 10,
        validity_days,
        description: format!("{validity_days} days of access"),
        available: true,
    }
}

/// Packages published by [`seeded_service`].
pub(super) struct Catalog {
    pub(super) candidate_monthly: Package,
    pub(super) candidate_booster: Package,
    pub(super) recruiter_monthly: Package,
}

pub(super) fn build_service() -> (SubscriptionService<InMemoryLedger>, Arc<InMemoryLedger>) {
    let ledger = Arc::new(InMemoryLedger::new());
    let service = SubscriptionService::new(ledger.clone());
    (service, ledger)
}

pub(super) fn seeded_service() -> (
    SubscriptionService<InMemoryLedger>,
    Arc<InMemoryLedger>,
    Catalog,
) {
    let (service, ledger) = build_service();
    service
        .register_account(candidate_registration())
        .expect("candidate registers");
    service
        .register_account(recruiter_registration())
        .expect("recruiter registers");

    let catalog = Catalog {
        candidate_monthly: service
            .publish_package(package_draft("Monthly", AccountKind::Candidate, 30))
            .expect("publish"),
        candidate_booster: service
            .publish_package(package_draft("Booster", AccountKind::Candidate, 10))
            .expect("publish"),
        recruiter_monthly: service
            .publish_package(package_draft("Hiring", AccountKind::Recruiter, 30))
            .expect("publish"),
    };

    (service, ledger, catalog)
}

pub(super) struct UnavailableLedger;

impl LedgerRepository for UnavailableLedger {
    type Transaction<'a> = InMemoryTransaction<'a>;

    fn begin(&self) -> Result<InMemoryTransaction<'_>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_with_service(service: SubscriptionService<InMemoryLedger>) -> axum::Router {
    subscription_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

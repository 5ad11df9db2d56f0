use chrono::{DateTime, NaiveDate, Utc};
use job_portal::config::CatalogConfig;
use job_portal::error::AppError;
use job_portal::subscriptions::{
    default_catalog, InMemoryLedger, Package, PackageCatalogImporter, PackageDraft,
    SubscriptionService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type PortalService = SubscriptionService<InMemoryLedger>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads catalog drafts from a CSV export, or the built-in plans when none is given.
pub(crate) fn catalog_drafts(csv_path: Option<&Path>) -> Result<Vec<PackageDraft>, AppError> {
    match csv_path {
        Some(path) => PackageCatalogImporter::from_path(path).map_err(AppError::from),
        None => Ok(default_catalog()),
    }
}

pub(crate) fn build_service(
    config: &CatalogConfig,
) -> Result<(Arc<PortalService>, Vec<Package>), AppError> {
    let service = Arc::new(SubscriptionService::new(Arc::new(InMemoryLedger::new())));
    let packages = seed_catalog(&service, catalog_drafts(config.csv_path.as_deref())?)?;
    Ok((service, packages))
}

pub(crate) fn seed_catalog(
    service: &PortalService,
    drafts: Vec<PackageDraft>,
) -> Result<Vec<Package>, AppError> {
    let mut packages = Vec::with_capacity(drafts.len());
    for draft in drafts {
        packages.push(service.publish_package(draft)?);
    }

    info!(count = packages.len(), "package catalog seeded");
    Ok(packages)
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("failed to parse '{raw}' as RFC 3339 or YYYY-MM-DD"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use job_portal::subscriptions::AccountKind;

    #[test]
    fn parse_timestamp_accepts_dates_and_rfc3339() {
        let midnight = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-01"), Ok(midnight));

        let offset = parse_timestamp("2025-03-01T05:30:00+05:30").expect("rfc3339");
        assert_eq!(offset, midnight);

        assert!(parse_timestamp("March 1st").is_err());
    }

    #[test]
    fn default_catalog_seeds_both_kinds() {
        let (service, packages) = build_service(&CatalogConfig::default()).expect("service builds");

        assert_eq!(packages.len(), default_catalog().len());
        assert!(!service
            .offers_for(AccountKind::Candidate)
            .expect("offers")
            .is_empty());
        assert!(!service
            .offers_for(AccountKind::Recruiter)
            .expect("offers")
            .is_empty());
    }
}

use crate::infra::{catalog_drafts, seed_catalog, PortalService};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use job_portal::error::AppError;
use job_portal::subscriptions::{
    offers_for, Account, AccountKind, AccountRegistration, InMemoryLedger, Package,
    RecruiterType, SubscriptionService, UserId,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference time for the first purchase (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Optional package catalog CSV export. Defaults to the built-in plans.
    #[arg(long)]
    pub(crate) catalog_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Optional package catalog CSV export. Defaults to the built-in plans.
    #[arg(long)]
    pub(crate) catalog_csv: Option<PathBuf>,
    /// Include packages that are no longer offered.
    #[arg(long)]
    pub(crate) include_withdrawn: bool,
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let service = SubscriptionService::new(Arc::new(InMemoryLedger::new()));
    let packages = seed_catalog(&service, catalog_drafts(args.catalog_csv.as_deref())?)?;

    for kind in [AccountKind::Candidate, AccountKind::Recruiter] {
        println!("{} packages", kind.label());
        let listed: Vec<Package> = if args.include_withdrawn {
            let mut all: Vec<Package> = packages
                .iter()
                .filter(|package| package.account_kind == kind)
                .cloned()
                .collect();
            all.sort_by_key(|package| package.price);
            all
        } else {
            offers_for(&packages, kind)
        };

        if listed.is_empty() {
            println!("  (none)");
        }
        for package in listed {
            let status = if package.available { "" } else { " [withdrawn]" };
            println!("  #{} {}{}", package.id, package.label(), status);
            if !package.description.is_empty() {
                println!("      {}", package.description);
            }
        }
        println!();
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { now, catalog_csv } = args;
    let start = now.unwrap_or_else(Utc::now);

    let service = SubscriptionService::new(Arc::new(InMemoryLedger::new()));
    seed_catalog(&service, catalog_drafts(catalog_csv.as_deref())?)?;

    let candidate = service.register_account(AccountRegistration {
        user: UserId("demo-candidate".to_string()),
        kind: AccountKind::Candidate,
        full_name: "Asha Verma".to_string(),
        email: Some("asha@example.com".to_string()),
        recruiter_type: None,
    })?;
    let recruiter = service.register_account(AccountRegistration {
        user: UserId("demo-recruiter".to_string()),
        kind: AccountKind::Recruiter,
        full_name: "Northwind Hiring".to_string(),
        email: None,
        recruiter_type: Some(RecruiterType::Company),
    })?;

    println!("Job portal subscription demo (start {})", format_time(start));
    println!("==================================================");

    for account in [&candidate, &recruiter] {
        run_account_story(&service, account, start)?;
    }

    println!();
    println!("Cross-kind purchase check");
    let candidate_plans = service.offers_for(AccountKind::Candidate)?;
    match candidate_plans.first() {
        Some(package) => match service.purchase(recruiter.user(), package.id, start) {
            Ok(_) => println!("- Unexpected: recruiter bought {}", package.label()),
            Err(err) => println!("- Recruiter buying '{}' rejected: {}", package.name, err),
        },
        None => println!("- No candidate packages in the catalog"),
    }

    Ok(())
}

fn run_account_story(
    service: &PortalService,
    account: &Account,
    start: DateTime<Utc>,
) -> Result<(), AppError> {
    let user = account.user();
    let offers = service.offers_for(account.kind())?;

    println!();
    println!(
        "{} '{}' ({})",
        account.kind().label(),
        account.display_name(),
        user
    );
    println!(
        "- Gate before any recharge: {}",
        gate_label(service.has_active_subscription(user, start)?)
    );

    let Some(first) = offers.first() else {
        println!("- No packages offered to this account kind");
        return Ok(());
    };
    let second = offers.last().unwrap_or(first);

    let receipt = service.purchase(user, first.id, start)?;
    println!("- Bought {}: {}", first.label(), receipt.message);

    let midway = start + Duration::days(i64::from(first.validity_days) / 2);
    let receipt = service.purchase(user, second.id, midway)?;
    println!(
        "- Bought {} at {} while active (stacked): {}",
        second.label(),
        format_time(midway),
        receipt.message
    );

    let Some(expiry) = receipt.recharge_validity else {
        return Ok(());
    };
    println!(
        "- Gate one minute before expiry: {}",
        gate_label(service.has_active_subscription(user, expiry - Duration::minutes(1))?)
    );
    println!(
        "- Gate at expiry: {}",
        gate_label(service.has_active_subscription(user, expiry)?)
    );

    let lapsed = expiry + Duration::days(3);
    let receipt = service.purchase(user, first.id, lapsed)?;
    println!(
        "- Bought {} at {} after lapse (reset): {}",
        first.label(),
        format_time(lapsed),
        receipt.message
    );

    let entries = service.ledger(user)?;
    println!("- Ledger ({} entries, newest first):", entries.len());
    for entry in entries {
        let terms = entry.package_snapshot.replace('\n', " | ");
        println!("    #{} {} {}", entry.id, format_time(entry.created_at), terms);
    }

    Ok(())
}

fn gate_label(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "inactive"
    }
}

fn format_time(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn demo_runs_against_the_default_catalog() {
        let args = DemoArgs {
            now: Some(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()),
            catalog_csv: None,
        };

        run_demo(args).expect("demo completes");
    }

    #[test]
    fn catalog_rejects_missing_csv() {
        let args = CatalogArgs {
            catalog_csv: Some(PathBuf::from("/nonexistent/packages.csv")),
            include_withdrawn: false,
        };

        assert!(matches!(run_catalog(args), Err(AppError::Catalog(_))));
    }
}

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::catalog;
use super::domain::{
    Account, AccountKind, AccountRegistration, EntryAmendment, EntryId, NewRechargeEntry, Package,
    PackageDraft, PackageId, RechargeEntry, RechargeError, SubscriptionState, UserId,
};
use super::repository::{LedgerRepository, LedgerTransaction, RepositoryError};

/// Service owning the recharge protocol and the subscription gate.
pub struct SubscriptionService<R> {
    repository: Arc<R>,
}

impl<R> SubscriptionService<R>
where
    R: LedgerRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn register_account(
        &self,
        registration: AccountRegistration,
    ) -> Result<Account, SubscriptionServiceError> {
        let mut tx = self.repository.begin()?;
        let account = tx.insert_account(registration.into_account())?;
        tx.commit()?;

        info!(user = %account.user(), kind = account.kind().label(), "account registered");
        Ok(account)
    }

    pub fn account(&self, user: &UserId) -> Result<Account, SubscriptionServiceError> {
        let tx = self.repository.begin()?;
        let account = tx
            .account(user)?
            .ok_or_else(|| SubscriptionServiceError::AccountNotFound {
                user: user.clone(),
                kind: None,
            })?;
        Ok(account)
    }

    /// Adds a plan to the catalog.
    pub fn publish_package(&self, draft: PackageDraft) -> Result<Package, SubscriptionServiceError> {
        if draft.validity_days == 0 {
            return Err(RechargeError::ZeroValidity.into());
        }

        let mut tx = self.repository.begin()?;
        let package = tx.insert_package(draft)?;
        tx.commit()?;

        info!(package = package.id.0, label = %package.label(), "package published");
        Ok(package)
    }

    pub fn packages(&self) -> Result<Vec<Package>, SubscriptionServiceError> {
        let tx = self.repository.begin()?;
        Ok(tx.packages()?)
    }

    pub fn offers_for(&self, kind: AccountKind) -> Result<Vec<Package>, SubscriptionServiceError> {
        let packages = self.packages()?;
        Ok(catalog::offers_for(&packages, kind))
    }

    /// Removes a plan. Entries that bought it keep their frozen terms.
    pub fn delete_package(&self, id: PackageId) -> Result<Package, SubscriptionServiceError> {
        let mut tx = self.repository.begin()?;
        let package = tx.delete_package(id).map_err(|err| match err {
            RepositoryError::NotFound => SubscriptionServiceError::PackageNotFound(id),
            other => other.into(),
        })?;
        tx.commit()?;

        info!(package = id.0, "package deleted");
        Ok(package)
    }

    /// Records a purchase of `package_id` by `user` and extends the matching account.
    ///
    /// The entry insert, the subscription extension, and the snapshot write commit together.
    /// Authorization and package eligibility are the caller's concern; see [`Self::purchase`].
    pub fn apply_recharge(
        &self,
        user: &UserId,
        package_id: PackageId,
        now: DateTime<Utc>,
    ) -> Result<RechargeEntry, SubscriptionServiceError> {
        let mut tx = self.repository.begin()?;
        let package = tx
            .package(package_id)?
            .ok_or(SubscriptionServiceError::PackageNotFound(package_id))?;

        let (entry, _) = record_recharge(&mut tx, user, &package, now)?;
        tx.commit()?;
        Ok(entry)
    }

    /// Purchase flow for an account: the package must be available and meant for its kind.
    pub fn purchase(
        &self,
        user: &UserId,
        package_id: PackageId,
        now: DateTime<Utc>,
    ) -> Result<PurchaseReceipt, SubscriptionServiceError> {
        let mut tx = self.repository.begin()?;
        let account = tx
            .account(user)?
            .ok_or_else(|| SubscriptionServiceError::AccountNotFound {
                user: user.clone(),
                kind: None,
            })?;
        let package = tx
            .package(package_id)?
            .filter(|package| package.is_offered_to(account.kind()))
            .ok_or(SubscriptionServiceError::PackageNotFound(package_id))?;

        let (entry, account) = record_recharge(&mut tx, user, &package, now)?;
        tx.commit()?;

        Ok(PurchaseReceipt::new(entry, &package, &account))
    }

    /// Re-saves an entry, refreshing its snapshot if the package terms drifted.
    pub fn save_entry(&self, id: EntryId) -> Result<RechargeEntry, SubscriptionServiceError> {
        self.amend_entry(id, EntryAmendment::default())
    }

    /// Applies an edit to an entry and re-saves it. The subscription window is not touched.
    pub fn amend_entry(
        &self,
        id: EntryId,
        amendment: EntryAmendment,
    ) -> Result<RechargeEntry, SubscriptionServiceError> {
        let mut tx = self.repository.begin()?;
        let mut entry = tx
            .entry(id)?
            .ok_or(SubscriptionServiceError::EntryNotFound(id))?;

        amendment.apply(&mut entry);
        tx.update_entry(&entry)?;
        refresh_snapshot(&mut tx, &mut entry)?;
        tx.commit()?;
        Ok(entry)
    }

    /// Deletes a ledger entry. The subscription extension it granted stays in place.
    pub fn delete_entry(&self, id: EntryId) -> Result<RechargeEntry, SubscriptionServiceError> {
        let mut tx = self.repository.begin()?;
        let entry = tx.delete_entry(id).map_err(|err| match err {
            RepositoryError::NotFound => SubscriptionServiceError::EntryNotFound(id),
            other => other.into(),
        })?;
        tx.commit()?;

        info!(entry = id.0, user = %entry.user, "recharge entry deleted; validity unchanged");
        Ok(entry)
    }

    pub fn entry(&self, id: EntryId) -> Result<RechargeEntry, SubscriptionServiceError> {
        let tx = self.repository.begin()?;
        let entry = tx
            .entry(id)?
            .ok_or(SubscriptionServiceError::EntryNotFound(id))?;
        Ok(entry)
    }

    /// Recharge history for a user, newest first.
    pub fn ledger(&self, user: &UserId) -> Result<Vec<RechargeEntry>, SubscriptionServiceError> {
        let tx = self.repository.begin()?;
        Ok(tx.entries_for(user)?)
    }

    pub fn has_active_subscription(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, SubscriptionServiceError> {
        let account = self.account(user)?;
        Ok(account.has_active_subscription(now))
    }

    /// Gate for restricted operations; returns the account when its window is open.
    pub fn require_active_subscription(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Account, SubscriptionServiceError> {
        let account = self.account(user)?;
        if account.has_active_subscription(now) {
            return Ok(account);
        }

        warn!(user = %user, "subscription required");
        Err(SubscriptionServiceError::SubscriptionRequired(user.clone()))
    }

    /// Account page: subscription state plus the packages this account may buy.
    pub fn account_overview(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<AccountOverview, SubscriptionServiceError> {
        let tx = self.repository.begin()?;
        let account = tx
            .account(user)?
            .ok_or_else(|| SubscriptionServiceError::AccountNotFound {
                user: user.clone(),
                kind: None,
            })?;
        let offers = catalog::offers_for(&tx.packages()?, account.kind());
        Ok(AccountOverview::new(&account, offers, now))
    }
}

/// Inserts the entry, extends the account once, then fixes up the snapshot.
fn record_recharge<T: LedgerTransaction>(
    tx: &mut T,
    user: &UserId,
    package: &Package,
    now: DateTime<Utc>,
) -> Result<(RechargeEntry, Account), SubscriptionServiceError> {
    let mut entry = tx.insert_entry(NewRechargeEntry {
        user: user.clone(),
        package: Some(package.id),
        created_at: now,
        package_snapshot: String::new(),
    })?;

    let mut account = tx
        .account(user)?
        .filter(|account| account.kind() == package.account_kind)
        .ok_or_else(|| {
            warn!(
                user = %user,
                kind = package.account_kind.label(),
                "recharge rejected: no account of the package kind"
            );
            SubscriptionServiceError::AccountNotFound {
                user: user.clone(),
                kind: Some(package.account_kind),
            }
        })?;
    account.apply_recharge(package.validity_days, now)?;
    tx.update_account(&account)?;

    refresh_snapshot(tx, &mut entry)?;

    info!(
        entry = entry.id.0,
        user = %user,
        package = package.id.0,
        validity = ?account.subscription().recharge_validity,
        "recharge applied"
    );
    Ok((entry, account))
}

fn refresh_snapshot<T: LedgerTransaction>(
    tx: &mut T,
    entry: &mut RechargeEntry,
) -> Result<bool, RepositoryError> {
    let package = match entry.package {
        Some(id) => tx.package(id)?,
        None => None,
    };

    if !entry.refresh_snapshot(package.as_ref()) {
        return Ok(false);
    }

    tx.update_entry(entry)?;
    debug!(entry = entry.id.0, "package snapshot refreshed");
    Ok(true)
}

/// Outcome of a successful purchase, including the confirmation shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub entry: RechargeEntry,
    pub price: u32,
    pub recharge_validity: Option<DateTime<Utc>>,
    pub message: String,
}

impl PurchaseReceipt {
    fn new(entry: RechargeEntry, package: &Package, account: &Account) -> Self {
        let recharge_validity = account.subscription().recharge_validity;
        let validity_label = recharge_validity
            .map(|validity| validity.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            message: format!(
                "Recharge of {} rupees has been successful. Your validity is till {}",
                package.price, validity_label
            ),
            entry,
            price: package.price,
            recharge_validity,
        }
    }
}

/// Serializable account summary for the account page.
#[derive(Debug, Clone, Serialize)]
pub struct AccountOverview {
    pub user: UserId,
    pub kind: AccountKind,
    pub display_name: String,
    #[serde(flatten)]
    pub subscription: SubscriptionState,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_days: Option<i64>,
    pub packages: Vec<Package>,
}

impl AccountOverview {
    fn new(account: &Account, packages: Vec<Package>, now: DateTime<Utc>) -> Self {
        let subscription = *account.subscription();
        Self {
            user: account.user().clone(),
            kind: account.kind(),
            display_name: account.display_name().to_string(),
            active: subscription.is_active(now),
            remaining_days: subscription.remaining(now).map(|left| left.num_days()),
            subscription,
            packages,
        }
    }
}

/// Error raised by the subscription service.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionServiceError {
    #[error("no {} account for user {user}", account_label(.kind))]
    AccountNotFound {
        user: UserId,
        kind: Option<AccountKind>,
    },
    #[error("package {0} not found")]
    PackageNotFound(PackageId),
    #[error("recharge entry {0} not found")]
    EntryNotFound(EntryId),
    #[error("an active subscription is required for user {0}")]
    SubscriptionRequired(UserId),
    #[error(transparent)]
    Recharge(#[from] RechargeError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn account_label(kind: &Option<AccountKind>) -> &'static str {
    kind.map(AccountKind::label).unwrap_or("portal")
}

impl SubscriptionServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionServiceError::AccountNotFound { .. }
            | SubscriptionServiceError::PackageNotFound(_)
            | SubscriptionServiceError::EntryNotFound(_)
            | SubscriptionServiceError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            SubscriptionServiceError::SubscriptionRequired(_) => StatusCode::PAYMENT_REQUIRED,
            SubscriptionServiceError::Recharge(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SubscriptionServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            SubscriptionServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of the portal user owning an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Surrogate key of a catalog package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageId(pub u64);

/// Surrogate key of a recharge ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two account kinds that can hold a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Candidate,
    Recruiter,
}

impl AccountKind {
    pub const fn label(self) -> &'static str {
        match self {
            AccountKind::Candidate => "Candidate",
            AccountKind::Recruiter => "Recruiter",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "candidate" => Some(Self::Candidate),
            "recruiter" => Some(Self::Recruiter),
            _ => None,
        }
    }
}

/// Rejections raised while applying a recharge to a subscription window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RechargeError {
    #[error("package validity must be at least one day")]
    ZeroValidity,
    #[error("subscription window overflows the supported date range")]
    WindowOverflow,
}

/// Access window carried by every account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionState {
    pub last_recharge: Option<DateTime<Utc>>,
    pub recharge_validity: Option<DateTime<Utc>>,
}

impl SubscriptionState {
    /// Extends the window by `validity_days`.
    ///
    /// An active window stacks from its current expiry. A missing or lapsed window restarts at
    /// `now`; a window expiring exactly at `now` counts as lapsed. Nothing is mutated when the
    /// call is rejected.
    pub fn apply_recharge(
        &mut self,
        validity_days: u32,
        now: DateTime<Utc>,
    ) -> Result<(), RechargeError> {
        if validity_days == 0 {
            return Err(RechargeError::ZeroValidity);
        }

        let extension =
            Duration::try_days(i64::from(validity_days)).ok_or(RechargeError::WindowOverflow)?;
        let base = match self.recharge_validity {
            Some(expiry) if expiry > now => expiry,
            _ => now,
        };
        let validity = base
            .checked_add_signed(extension)
            .ok_or(RechargeError::WindowOverflow)?;

        self.last_recharge = Some(now);
        self.recharge_validity = Some(validity);
        Ok(())
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        matches!(self.recharge_validity, Some(expiry) if expiry > now)
    }

    /// Time left in the window, `None` once it has lapsed.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.recharge_validity
            .filter(|expiry| *expiry > now)
            .map(|expiry| expiry - now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecruiterType {
    Individual,
    Company,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub user: UserId,
    pub full_name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub subscription: SubscriptionState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterProfile {
    pub user: UserId,
    pub full_name: String,
    pub email: Option<String>,
    pub recruiter_type: Option<RecruiterType>,
    #[serde(default)]
    pub subscription: SubscriptionState,
}

/// A subscription-holding identity. The variant decides which packages apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Account {
    Candidate(CandidateProfile),
    Recruiter(RecruiterProfile),
}

impl Account {
    pub fn user(&self) -> &UserId {
        match self {
            Account::Candidate(profile) => &profile.user,
            Account::Recruiter(profile) => &profile.user,
        }
    }

    pub const fn kind(&self) -> AccountKind {
        match self {
            Account::Candidate(_) => AccountKind::Candidate,
            Account::Recruiter(_) => AccountKind::Recruiter,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Account::Candidate(profile) => &profile.full_name,
            Account::Recruiter(profile) => &profile.full_name,
        }
    }

    pub fn subscription(&self) -> &SubscriptionState {
        match self {
            Account::Candidate(profile) => &profile.subscription,
            Account::Recruiter(profile) => &profile.subscription,
        }
    }

    fn subscription_mut(&mut self) -> &mut SubscriptionState {
        match self {
            Account::Candidate(profile) => &mut profile.subscription,
            Account::Recruiter(profile) => &mut profile.subscription,
        }
    }

    pub fn apply_recharge(
        &mut self,
        validity_days: u32,
        now: DateTime<Utc>,
    ) -> Result<(), RechargeError> {
        self.subscription_mut().apply_recharge(validity_days, now)
    }

    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription().is_active(now)
    }
}

/// Gate for subscription-restricted operations.
pub fn has_active_subscription(account: &Account, now: DateTime<Utc>) -> bool {
    account.has_active_subscription(now)
}

/// Sign-up payload producing an account with an empty subscription window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRegistration {
    pub user: UserId,
    pub kind: AccountKind,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub recruiter_type: Option<RecruiterType>,
}

impl AccountRegistration {
    pub fn into_account(self) -> Account {
        match self.kind {
            AccountKind::Candidate => Account::Candidate(CandidateProfile {
                user: self.user,
                full_name: self.full_name,
                email: self.email,
                subscription: SubscriptionState::default(),
            }),
            AccountKind::Recruiter => Account::Recruiter(RecruiterProfile {
                user: self.user,
                full_name: self.full_name,
                email: self.email,
                recruiter_type: self.recruiter_type,
                subscription: SubscriptionState::default(),
            }),
        }
    }
}

/// Catalog plan as curated by the portal administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub account_kind: AccountKind,
    pub price: u32,
    pub validity_days: u32,
    pub description: String,
    pub available: bool,
}

impl Package {
    pub fn from_draft(id: PackageId, draft: PackageDraft) -> Self {
        Self {
            id,
            name: draft.name,
            account_kind: draft.account_kind,
            price: draft.price,
            validity_days: draft.validity_days,
            description: draft.description,
            available: draft.available,
        }
    }

    /// Frozen terms stored on every recharge entry that references this package.
    pub fn snapshot(&self) -> String {
        format!(
            "Name : {} \nPrice : {} \nValidity Days : {}\nDescription : {}",
            self.name, self.price, self.validity_days, self.description
        )
    }

    pub fn label(&self) -> String {
        format!("{} - {} - {}", self.name, self.price, self.validity_days)
    }

    pub fn is_offered_to(&self, kind: AccountKind) -> bool {
        self.available && self.account_kind == kind
    }
}

/// Package attributes before the catalog assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDraft {
    pub name: String,
    pub account_kind: AccountKind,
    pub price: u32,
    pub validity_days: u32,
    pub description: String,
    #[serde(default = "available_by_default")]
    pub available: bool,
}

fn available_by_default() -> bool {
    true
}

/// One purchase in the recharge ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RechargeEntry {
    pub id: EntryId,
    pub user: UserId,
    pub package: Option<PackageId>,
    pub created_at: DateTime<Utc>,
    pub package_snapshot: String,
}

impl RechargeEntry {
    pub fn from_new(id: EntryId, entry: NewRechargeEntry) -> Self {
        Self {
            id,
            user: entry.user,
            package: entry.package,
            created_at: entry.created_at,
            package_snapshot: entry.package_snapshot,
        }
    }

    /// Rewrites the snapshot from `package` when it has drifted. Returns whether it changed.
    ///
    /// Without a package (never set, or deleted from the catalog) the stored text is kept.
    pub fn refresh_snapshot(&mut self, package: Option<&Package>) -> bool {
        let Some(package) = package else {
            return false;
        };

        let canonical = package.snapshot();
        if self.package_snapshot == canonical {
            return false;
        }

        self.package_snapshot = canonical;
        true
    }
}

/// Ledger row before the repository assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRechargeEntry {
    pub user: UserId,
    pub package: Option<PackageId>,
    pub created_at: DateTime<Utc>,
    pub package_snapshot: String,
}

/// Admin-style edit applied to an existing ledger entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAmendment {
    /// `Some(None)` detaches the package reference. On the wire a missing field leaves the
    /// reference alone and an explicit `null` detaches it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub package: Option<Option<PackageId>>,
    #[serde(default)]
    pub package_snapshot: Option<String>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<PackageId>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<PackageId>::deserialize(deserializer).map(Some)
}

impl EntryAmendment {
    pub fn apply(self, entry: &mut RechargeEntry) {
        if let Some(package) = self.package {
            entry.package = package;
        }
        if let Some(snapshot) = self.package_snapshot {
            entry.package_snapshot = snapshot;
        }
    }
}

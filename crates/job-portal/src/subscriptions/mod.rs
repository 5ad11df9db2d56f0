//! Package catalog, recharge ledger, and the subscription gate.
//!
//! Purchasing a package writes a ledger entry, extends the buyer's subscription window once,
//! and freezes the package terms on the entry. All three happen in one repository transaction.

pub mod catalog;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{default_catalog, offers_for, CatalogImportError, PackageCatalogImporter};
pub use domain::{
    has_active_subscription, Account, AccountKind, AccountRegistration, CandidateProfile,
    EntryAmendment, EntryId, NewRechargeEntry, Package, PackageDraft, PackageId, RechargeEntry,
    RechargeError, RecruiterProfile, RecruiterType, SubscriptionState, UserId,
};
pub use memory::{InMemoryLedger, WriteStats};
pub use repository::{LedgerRepository, LedgerTransaction, RepositoryError};
pub use router::subscription_router;
pub use service::{AccountOverview, PurchaseReceipt, SubscriptionService, SubscriptionServiceError};

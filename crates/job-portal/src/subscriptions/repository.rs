use super::domain::{
    Account, EntryId, NewRechargeEntry, Package, PackageDraft, PackageId, RechargeEntry, UserId,
};

/// Storage abstraction for accounts, the package catalog, and the recharge ledger.
///
/// Every read and write goes through a transaction. Nothing is visible to other callers until
/// [`LedgerTransaction::commit`] succeeds, and dropping an uncommitted transaction discards it.
pub trait LedgerRepository: Send + Sync {
    type Transaction<'a>: LedgerTransaction
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Transaction<'_>, RepositoryError>;
}

/// Unit of work opened by [`LedgerRepository::begin`].
pub trait LedgerTransaction {
    fn account(&self, user: &UserId) -> Result<Option<Account>, RepositoryError>;
    fn insert_account(&mut self, account: Account) -> Result<Account, RepositoryError>;
    fn update_account(&mut self, account: &Account) -> Result<(), RepositoryError>;

    fn package(&self, id: PackageId) -> Result<Option<Package>, RepositoryError>;
    fn packages(&self) -> Result<Vec<Package>, RepositoryError>;
    fn insert_package(&mut self, draft: PackageDraft) -> Result<Package, RepositoryError>;
    /// Removes a package and clears the reference on every entry that pointed at it.
    fn delete_package(&mut self, id: PackageId) -> Result<Package, RepositoryError>;

    fn entry(&self, id: EntryId) -> Result<Option<RechargeEntry>, RepositoryError>;
    fn entries_for(&self, user: &UserId) -> Result<Vec<RechargeEntry>, RepositoryError>;
    fn insert_entry(&mut self, entry: NewRechargeEntry) -> Result<RechargeEntry, RepositoryError>;
    fn update_entry(&mut self, entry: &RechargeEntry) -> Result<(), RepositoryError>;
    fn delete_entry(&mut self, id: EntryId) -> Result<RechargeEntry, RepositoryError>;

    fn commit(self) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Account, EntryId, NewRechargeEntry, Package, PackageDraft, PackageId, RechargeEntry, UserId,
};
use super::repository::{LedgerRepository, LedgerTransaction, RepositoryError};

/// Write counters, useful for asserting how many rows an operation touched.
///
/// `account_writes`, `entry_writes` and `commits` only count committed transactions.
/// `rows_copied` counts existing rows saved for rollback by any write transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub account_writes: u64,
    pub entry_writes: u64,
    pub commits: u64,
    pub rows_copied: u64,
}

#[derive(Debug, Default)]
struct LedgerTables {
    accounts: BTreeMap<UserId, Account>,
    packages: BTreeMap<PackageId, Package>,
    entries: BTreeMap<EntryId, RechargeEntry>,
    last_package_id: u64,
    last_entry_id: u64,
    stats: WriteStats,
}

/// Process-local ledger. Transactions are serialized by a single mutex and write straight
/// into the tables, recording an undo step for every change so that a dropped transaction
/// can restore the prior state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    tables: Arc<Mutex<LedgerTables>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_stats(&self) -> WriteStats {
        match self.tables.lock() {
            Ok(tables) => tables.stats,
            Err(poisoned) => poisoned.into_inner().stats,
        }
    }
}

impl LedgerRepository for InMemoryLedger {
    type Transaction<'a> = InMemoryTransaction<'a>;

    fn begin(&self) -> Result<InMemoryTransaction<'_>, RepositoryError> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("ledger mutex poisoned".to_string()))?;
        Ok(InMemoryTransaction {
            last_package_id: tables.last_package_id,
            last_entry_id: tables.last_entry_id,
            tables,
            undo: Vec::new(),
            pending: WriteStats::default(),
        })
    }
}

#[derive(Debug)]
enum UndoStep {
    AccountInserted(UserId),
    AccountReplaced(Account),
    PackageInserted(PackageId),
    PackageRemoved(Package),
    EntryInserted(EntryId),
    EntryReplaced(RechargeEntry),
    EntryRemoved(RechargeEntry),
}

pub struct InMemoryTransaction<'a> {
    tables: MutexGuard<'a, LedgerTables>,
    undo: Vec<UndoStep>,
    pending: WriteStats,
    last_package_id: u64,
    last_entry_id: u64,
}

impl InMemoryTransaction<'_> {
    fn inserted_here(&self, id: EntryId) -> bool {
        self.undo
            .iter()
            .any(|step| matches!(step, UndoStep::EntryInserted(inserted) if *inserted == id))
    }

    fn save_entry_for_rollback(&mut self, previous: RechargeEntry) {
        if self.inserted_here(previous.id) {
            return;
        }
        self.pending.rows_copied += 1;
        self.undo.push(UndoStep::EntryReplaced(previous));
    }

    fn rollback(&mut self) {
        let tables = &mut *self.tables;
        while let Some(step) = self.undo.pop() {
            match step {
                UndoStep::AccountInserted(user) => {
                    tables.accounts.remove(&user);
                }
                UndoStep::AccountReplaced(account) => {
                    tables.accounts.insert(account.user().clone(), account);
                }
                UndoStep::PackageInserted(id) => {
                    tables.packages.remove(&id);
                }
                UndoStep::PackageRemoved(package) => {
                    tables.packages.insert(package.id, package);
                }
                UndoStep::EntryInserted(id) => {
                    tables.entries.remove(&id);
                }
                UndoStep::EntryReplaced(entry) | UndoStep::EntryRemoved(entry) => {
                    tables.entries.insert(entry.id, entry);
                }
            }
        }
        tables.last_package_id = self.last_package_id;
        tables.last_entry_id = self.last_entry_id;
        tables.stats.rows_copied += self.pending.rows_copied;
    }
}

impl Drop for InMemoryTransaction<'_> {
    fn drop(&mut self) {
        self.rollback();
    }
}

impl LedgerTransaction for InMemoryTransaction<'_> {
    fn account(&self, user: &UserId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.tables.accounts.get(user).cloned())
    }

    fn insert_account(&mut self, account: Account) -> Result<Account, RepositoryError> {
        if self.tables.accounts.contains_key(account.user()) {
            return Err(RepositoryError::Conflict);
        }
        self.tables
            .accounts
            .insert(account.user().clone(), account.clone());
        self.undo
            .push(UndoStep::AccountInserted(account.user().clone()));
        self.pending.account_writes += 1;
        Ok(account)
    }

    fn update_account(&mut self, account: &Account) -> Result<(), RepositoryError> {
        let slot = self
            .tables
            .accounts
            .get_mut(account.user())
            .ok_or(RepositoryError::NotFound)?;
        let previous = std::mem::replace(slot, account.clone());
        self.undo.push(UndoStep::AccountReplaced(previous));
        self.pending.rows_copied += 1;
        self.pending.account_writes += 1;
        Ok(())
    }

    fn package(&self, id: PackageId) -> Result<Option<Package>, RepositoryError> {
        Ok(self.tables.packages.get(&id).cloned())
    }

    fn packages(&self) -> Result<Vec<Package>, RepositoryError> {
        Ok(self.tables.packages.values().cloned().collect())
    }

    fn insert_package(&mut self, draft: PackageDraft) -> Result<Package, RepositoryError> {
        self.tables.last_package_id += 1;
        let package = Package::from_draft(PackageId(self.tables.last_package_id), draft);
        self.tables.packages.insert(package.id, package.clone());
        self.undo.push(UndoStep::PackageInserted(package.id));
        Ok(package)
    }

    fn delete_package(&mut self, id: PackageId) -> Result<Package, RepositoryError> {
        let removed = self
            .tables
            .packages
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        self.undo.push(UndoStep::PackageRemoved(removed.clone()));
        self.pending.rows_copied += 1;

        let mut detached = Vec::new();
        for entry in self.tables.entries.values_mut() {
            if entry.package == Some(id) {
                detached.push(entry.clone());
                entry.package = None;
            }
        }
        for previous in detached {
            self.pending.entry_writes += 1;
            self.save_entry_for_rollback(previous);
        }

        Ok(removed)
    }

    fn entry(&self, id: EntryId) -> Result<Option<RechargeEntry>, RepositoryError> {
        Ok(self.tables.entries.get(&id).cloned())
    }

    fn entries_for(&self, user: &UserId) -> Result<Vec<RechargeEntry>, RepositoryError> {
        let mut entries: Vec<RechargeEntry> = self
            .tables
            .entries
            .values()
            .filter(|entry| &entry.user == user)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    fn insert_entry(&mut self, entry: NewRechargeEntry) -> Result<RechargeEntry, RepositoryError> {
        self.tables.last_entry_id += 1;
        let entry = RechargeEntry::from_new(EntryId(self.tables.last_entry_id), entry);
        self.tables.entries.insert(entry.id, entry.clone());
        self.undo.push(UndoStep::EntryInserted(entry.id));
        self.pending.entry_writes += 1;
        Ok(entry)
    }

    fn update_entry(&mut self, entry: &RechargeEntry) -> Result<(), RepositoryError> {
        let slot = self
            .tables
            .entries
            .get_mut(&entry.id)
            .ok_or(RepositoryError::NotFound)?;
        let previous = std::mem::replace(slot, entry.clone());
        self.pending.entry_writes += 1;
        self.save_entry_for_rollback(previous);
        Ok(())
    }

    fn delete_entry(&mut self, id: EntryId) -> Result<RechargeEntry, RepositoryError> {
        let removed = self
            .tables
            .entries
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        self.undo.push(UndoStep::EntryRemoved(removed.clone()));
        self.pending.rows_copied += 1;
        Ok(removed)
    }

    fn commit(mut self) -> Result<(), RepositoryError> {
        self.undo.clear();
        self.last_package_id = self.tables.last_package_id;
        self.last_entry_id = self.tables.last_entry_id;

        let pending = std::mem::take(&mut self.pending);
        let stats = &mut self.tables.stats;
        stats.account_writes += pending.account_writes;
        stats.entry_writes += pending.entry_writes;
        stats.rows_copied += pending.rows_copied;
        stats.commits += 1;
        Ok(())
    }
}

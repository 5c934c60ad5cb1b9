// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Linked account store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `linked_accounts`: external_id → serialized LinkedAccount (JSON bytes)
//!
//! Every update is a read-modify-write inside a single write transaction,
//! so concurrent writers never observe a half-applied record.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::models::LinkedAccount;

const LINKED_ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("linked_accounts");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("linked account not found: {0}")]
    NotFound(String),

    #[error("linked account already exists: {0}")]
    AlreadyExists(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// AccountStore
// =============================================================================

/// Point operations on linked accounts. No multi-record transactions.
pub trait AccountStore: Send + Sync {
    fn get_account_by_external_id(&self, external_id: &str) -> StoreResult<Option<LinkedAccount>>;

    /// All accounts in a stable enumeration order.
    fn list_all_accounts(&self) -> StoreResult<Vec<LinkedAccount>>;

    /// Fails with [`StoreError::AlreadyExists`] when the external id is taken.
    fn insert_account(&self, account: &LinkedAccount) -> StoreResult<()>;

    fn update_credentials(
        &self,
        external_id: &str,
        access_credential: &str,
        refresh_credential: &str,
    ) -> StoreResult<()>;

    fn update_holdings_count(&self, external_id: &str, count: u64) -> StoreResult<()>;

    fn update_identity_link(
        &self,
        external_id: &str,
        asset_identity_id: &str,
        asset_identity_email: &str,
    ) -> StoreResult<()>;
}

// =============================================================================
// RedbAccountStore
// =============================================================================

pub struct RedbAccountStore {
    db: Database,
}

impl RedbAccountStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("{}: {e}", parent.display())))?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LINKED_ACCOUNTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Apply `mutate` to one record inside a single write transaction.
    fn modify<F>(&self, external_id: &str, mutate: F) -> StoreResult<()>
    where
        F: FnOnce(&mut LinkedAccount),
    {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LINKED_ACCOUNTS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(external_id)?
                    .ok_or_else(|| StoreError::NotFound(external_id.to_string()))?;
                existing.value().to_vec()
            };

            let mut account: LinkedAccount = serde_json::from_slice(&existing_bytes)?;
            mutate(&mut account);

            let json = serde_json::to_vec(&account)?;
            table.insert(external_id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl AccountStore for RedbAccountStore {
    fn get_account_by_external_id(&self, external_id: &str) -> StoreResult<Option<LinkedAccount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LINKED_ACCOUNTS)?;
        match table.get(external_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn list_all_accounts(&self) -> StoreResult<Vec<LinkedAccount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LINKED_ACCOUNTS)?;

        let mut accounts = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            match serde_json::from_slice::<LinkedAccount>(value.value()) {
                Ok(account) => accounts.push(account),
                Err(e) => {
                    tracing::warn!(
                        external_id = %key.value(),
                        error = %e,
                        "Skipping malformed linked account record"
                    );
                }
            }
        }
        Ok(accounts)
    }

    fn insert_account(&self, account: &LinkedAccount) -> StoreResult<()> {
        let json = serde_json::to_vec(account)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LINKED_ACCOUNTS)?;
            if table.get(account.external_id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(account.external_id.clone()));
            }
            table.insert(account.external_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn update_credentials(
        &self,
        external_id: &str,
        access_credential: &str,
        refresh_credential: &str,
    ) -> StoreResult<()> {
        self.modify(external_id, |account| {
            account.access_credential = Some(access_credential.to_string());
            account.refresh_credential = Some(refresh_credential.to_string());
        })
    }

    fn update_holdings_count(&self, external_id: &str, count: u64) -> StoreResult<()> {
        self.modify(external_id, |account| {
            account.last_known_holdings_count = Some(count);
            account.holdings_updated_at = Some(Utc::now());
        })
    }

    fn update_identity_link(
        &self,
        external_id: &str,
        asset_identity_id: &str,
        asset_identity_email: &str,
    ) -> StoreResult<()> {
        self.modify(external_id, |account| {
            account.asset_identity_id = Some(asset_identity_id.to_string());
            account.asset_identity_email = Some(asset_identity_email.to_string());
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (RedbAccountStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbAccountStore::open(&dir.path().join("accounts.redb")).unwrap();
        (store, dir)
    }

    fn account(id: &str) -> LinkedAccount {
        LinkedAccount::new(id, format!("member-{id}"), format!("{id}@example.com"))
    }

    #[test]
    fn insert_and_get_account() {
        let (store, _dir) = temp_store();
        store.insert_account(&account("1001")).unwrap();

        let loaded = store.get_account_by_external_id("1001").unwrap().unwrap();
        assert_eq!(loaded.messaging_handle, "member-1001");
        assert_eq!(loaded.refresh_credential, None);
        assert_eq!(loaded.last_known_holdings_count, None);
    }

    #[test]
    fn get_missing_account_is_none() {
        let (store, _dir) = temp_store();
        assert!(store.get_account_by_external_id("nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let (store, _dir) = temp_store();
        store.insert_account(&account("1001")).unwrap();

        let mut renamed = account("1001");
        renamed.messaging_handle = "someone-else".to_string();
        let result = store.insert_account(&renamed);
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));

        let loaded = store.get_account_by_external_id("1001").unwrap().unwrap();
        assert_eq!(loaded.messaging_handle, "member-1001");
    }

    #[test]
    fn updates_touch_only_their_fields() {
        let (store, _dir) = temp_store();
        store.insert_account(&account("1001")).unwrap();

        store
            .update_identity_link("1001", "asset-77", "holder@assets.example")
            .unwrap();
        store.update_credentials("1001", "access-1", "refresh-1").unwrap();
        store.update_holdings_count("1001", 12).unwrap();

        let loaded = store.get_account_by_external_id("1001").unwrap().unwrap();
        assert_eq!(loaded.asset_identity_id.as_deref(), Some("asset-77"));
        assert_eq!(loaded.access_credential.as_deref(), Some("access-1"));
        assert_eq!(loaded.refresh_credential.as_deref(), Some("refresh-1"));
        assert_eq!(loaded.last_known_holdings_count, Some(12));
        assert!(loaded.holdings_updated_at.is_some());
        assert_eq!(loaded.messaging_email, "1001@example.com");
    }

    #[test]
    fn update_unknown_account_is_not_found() {
        let (store, _dir) = temp_store();
        let result = store.update_holdings_count("ghost", 3);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn list_is_stable_and_complete() {
        let (store, _dir) = temp_store();
        for id in ["300", "100", "200"] {
            store.insert_account(&account(id)).unwrap();
        }

        let first: Vec<String> = store
            .list_all_accounts()
            .unwrap()
            .into_iter()
            .map(|a| a.external_id)
            .collect();
        let second: Vec<String> = store
            .list_all_accounts()
            .unwrap()
            .into_iter()
            .map(|a| a.external_id)
            .collect();

        assert_eq!(first, vec!["100", "200", "300"]);
        assert_eq!(first, second);
    }

    #[test]
    fn reopening_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("accounts.redb");
        {
            let store = RedbAccountStore::open(&path).unwrap();
            store.insert_account(&account("1001")).unwrap();
            store.update_holdings_count("1001", 4).unwrap();
        }

        let store = RedbAccountStore::open(&path).unwrap();
        let loaded = store.get_account_by_external_id("1001").unwrap().unwrap();
        assert_eq!(loaded.last_known_holdings_count, Some(4));
    }
}

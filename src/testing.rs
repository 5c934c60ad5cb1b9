// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::models::{AssetIdentity, AssetItem, LinkedAccount, TokenSet};
use crate::providers::{AssetOwnershipApi, GroupMembershipApi, IdentityProvider, ProviderError};
use crate::storage::{AccountStore, StoreError, StoreResult};

/// Account with both credentials on file.
pub fn authorized_account(external_id: &str, access: &str, refresh: &str) -> LinkedAccount {
    let mut account = LinkedAccount::new(
        external_id,
        format!("member-{external_id}"),
        format!("{external_id}@example.com"),
    );
    account.asset_identity_id = Some(format!("asset-{external_id}"));
    account.access_credential = Some(access.to_string());
    account.refresh_credential = Some(refresh.to_string());
    account
}

// =============================================================================
// Account store
// =============================================================================

#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<BTreeMap<String, LinkedAccount>>,
    failing_credential_updates: Mutex<HashSet<String>>,
    failing_holdings_updates: Mutex<HashSet<String>>,
    credential_writes: Mutex<Vec<String>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, external_id: &str) -> Option<LinkedAccount> {
        self.accounts.lock().unwrap().get(external_id).cloned()
    }

    pub fn set_holdings_count(&self, external_id: &str, count: u64) {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(external_id) {
            account.last_known_holdings_count = Some(count);
        }
    }

    pub fn fail_credential_update(&self, external_id: &str) {
        self.failing_credential_updates
            .lock()
            .unwrap()
            .insert(external_id.to_string());
    }

    pub fn fail_holdings_update(&self, external_id: &str) {
        self.failing_holdings_updates
            .lock()
            .unwrap()
            .insert(external_id.to_string());
    }

    /// External ids whose credentials were written, in call order.
    pub fn credential_writes(&self) -> Vec<String> {
        self.credential_writes.lock().unwrap().clone()
    }

    fn modify(&self, external_id: &str, mutate: impl FnOnce(&mut LinkedAccount)) -> StoreResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get_mut(external_id)
            .ok_or_else(|| StoreError::NotFound(external_id.to_string()))?;
        mutate(account);
        Ok(())
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get_account_by_external_id(&self, external_id: &str) -> StoreResult<Option<LinkedAccount>> {
        Ok(self.account(external_id))
    }

    fn list_all_accounts(&self) -> StoreResult<Vec<LinkedAccount>> {
        Ok(self.accounts.lock().unwrap().values().cloned().collect())
    }

    fn insert_account(&self, account: &LinkedAccount) -> StoreResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&account.external_id) {
            return Err(StoreError::AlreadyExists(account.external_id.clone()));
        }
        accounts.insert(account.external_id.clone(), account.clone());
        Ok(())
    }

    fn update_credentials(
        &self,
        external_id: &str,
        access_credential: &str,
        refresh_credential: &str,
    ) -> StoreResult<()> {
        if self
            .failing_credential_updates
            .lock()
            .unwrap()
            .contains(external_id)
        {
            return Err(StoreError::Unavailable("injected credential failure".to_string()));
        }
        self.modify(external_id, |account| {
            account.access_credential = Some(access_credential.to_string());
            account.refresh_credential = Some(refresh_credential.to_string());
        })?;
        self.credential_writes
            .lock()
            .unwrap()
            .push(external_id.to_string());
        Ok(())
    }

    fn update_holdings_count(&self, external_id: &str, count: u64) -> StoreResult<()> {
        if self
            .failing_holdings_updates
            .lock()
            .unwrap()
            .contains(external_id)
        {
            return Err(StoreError::Unavailable("injected holdings failure".to_string()));
        }
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
// Identity provider
// =============================================================================

/// Token endpoint keyed by refresh credential (or authorization code).
#[derive(Default)]
pub struct FakeIdentityProvider {
    grants: Mutex<HashMap<String, TokenSet>>,
    rejected: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, refresh: &str, access: &str, new_refresh: Option<&str>) {
        self.grants.lock().unwrap().insert(
            refresh.to_string(),
            TokenSet {
                access_token: access.to_string(),
                refresh_token: new_refresh.map(str::to_string),
                expires_at: None,
            },
        );
    }

    pub fn reject(&self, refresh: &str) {
        self.rejected.lock().unwrap().insert(refresh.to_string());
    }

    /// Every credential presented to the provider, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, credential: &str) -> Result<TokenSet, ProviderError> {
        self.calls.lock().unwrap().push(credential.to_string());
        if self.rejected.lock().unwrap().contains(credential) {
            return Err(ProviderError::Rejected {
                status: 401,
                body: "invalid_grant".to_string(),
            });
        }
        self.grants
            .lock()
            .unwrap()
            .get(credential)
            .cloned()
            .ok_or_else(|| ProviderError::Rejected {
                status: 400,
                body: "unknown credential".to_string(),
            })
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, ProviderError> {
        self.answer(code)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, ProviderError> {
        self.answer(refresh_token)
    }
}

// =============================================================================
// Asset API
// =============================================================================

/// Ownership answers keyed by (access token, class). Unknown pairs are 404s.
#[derive(Default)]
pub struct FakeAssetApi {
    answers: Mutex<HashMap<(String, String), Result<usize, u16>>>,
    queries: Mutex<Vec<(String, String)>>,
    identities: Mutex<HashMap<String, AssetIdentity>>,
}

impl FakeAssetApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holds(&self, access: &str, class_id: &str, count: usize) {
        self.answers
            .lock()
            .unwrap()
            .insert((access.to_string(), class_id.to_string()), Ok(count));
    }

    pub fn fails(&self, access: &str, class_id: &str, status: u16) {
        self.answers
            .lock()
            .unwrap()
            .insert((access.to_string(), class_id.to_string()), Err(status));
    }

    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn identifies(&self, access: &str, id: &str, email: &str) {
        self.identities.lock().unwrap().insert(
            access.to_string(),
            AssetIdentity {
                id: id.to_string(),
                email: email.to_string(),
            },
        );
    }
}

#[async_trait]
impl AssetOwnershipApi for FakeAssetApi {
    async fn query_assets(
        &self,
        access_token: &str,
        class_id: &str,
    ) -> Result<Vec<AssetItem>, ProviderError> {
        let key = (access_token.to_string(), class_id.to_string());
        self.queries.lock().unwrap().push(key.clone());

        match self.answers.lock().unwrap().get(&key) {
            None => Ok(Vec::new()),
            Some(Err(status)) => Err(ProviderError::Rejected {
                status: *status,
                body: "upstream error".to_string(),
            }),
            Some(Ok(count)) => Ok((0..*count)
                .map(|n| AssetItem {
                    class_id: class_id.to_string(),
                    name: format!("item-{n}"),
                    quantity: "1".to_string(),
                    metadata: None,
                })
                .collect()),
        }
    }

    async fn user_info(&self, access_token: &str) -> Result<Option<AssetIdentity>, ProviderError> {
        Ok(self.identities.lock().unwrap().get(access_token).cloned())
    }
}

// =============================================================================
// Guild
// =============================================================================

/// Guild role state with per-role failure injection.
#[derive(Default)]
pub struct FakeGuild {
    members: Mutex<HashMap<String, BTreeSet<String>>>,
    failing_adds: Mutex<HashSet<String>>,
    failing_removes: Mutex<HashSet<String>>,
    operations: Mutex<Vec<(String, String, &'static str)>>,
}

impl FakeGuild {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, member: &str, role: &str) {
        self.members
            .lock()
            .unwrap()
            .entry(member.to_string())
            .or_default()
            .insert(role.to_string());
    }

    pub fn roles_of(&self, member: &str) -> BTreeSet<String> {
        self.members
            .lock()
            .unwrap()
            .get(member)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_add(&self, role: &str) {
        self.failing_adds.lock().unwrap().insert(role.to_string());
    }

    pub fn fail_remove(&self, role: &str) {
        self.failing_removes.lock().unwrap().insert(role.to_string());
    }

    /// `(member, role, "add" | "remove")` for every attempted call.
    pub fn operations(&self) -> Vec<(String, String, &'static str)> {
        self.operations.lock().unwrap().clone()
    }

    fn record(&self, member: &str, role: &str, action: &'static str) {
        self.operations
            .lock()
            .unwrap()
            .push((member.to_string(), role.to_string(), action));
    }
}

#[async_trait]
impl GroupMembershipApi for FakeGuild {
    async fn add_role(&self, member_id: &str, role_id: &str) -> Result<(), ProviderError> {
        self.record(member_id, role_id, "add");
        if self.failing_adds.lock().unwrap().contains(role_id) {
            return Err(ProviderError::Rejected {
                status: 403,
                body: "Missing Permissions".to_string(),
            });
        }
        self.grant(member_id, role_id);
        Ok(())
    }

    async fn remove_role(&self, member_id: &str, role_id: &str) -> Result<(), ProviderError> {
        self.record(member_id, role_id, "remove");
        if self.failing_removes.lock().unwrap().contains(role_id) {
            return Err(ProviderError::Rejected {
                status: 403,
                body: "Missing Permissions".to_string(),
            });
        }
        if let Some(roles) = self.members.lock().unwrap().get_mut(member_id) {
            roles.remove(role_id);
        }
        Ok(())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Verification Scheduler
//!
//! Background task that periodically re-verifies every linked account:
//! refresh the asset credential, count holdings, resolve the tier and bring
//! the member's Discord roles in line with it.
//!
//! ## Strategy
//!
//! Each sweep:
//! 1. Lists all accounts in the store's stable order.
//! 2. Verifies them one at a time, pausing `account_delay` between accounts.
//! 3. Logs a [`SweepReport`] and sleeps `sweep_interval` before the next one.
//!
//! A failure is scoped to the account being verified. It is logged with the
//! external id and the step, and the sweep moves on.
//!
//! ## Shutdown
//!
//! `tokio_util::sync::CancellationToken` is checked between accounts and
//! during every sleep. The account in flight is always finished first.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{CredentialRefresher, HoldingsAggregator, RoleReconciler};
use crate::config::SyncPolicy;
use crate::error::{AccountFailure, VerificationStep};
use crate::storage::{AccountStore, StoreError};

/// Result of one successful account cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountVerified {
    pub external_id: String,
    pub holdings: u64,
    pub tier_role: Option<String>,
    pub credentials_rotated: bool,
}

/// Summary of a single sweep over the account store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub sweep_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Accounts listed at the start of the sweep.
    pub total: usize,
    pub verified: usize,
    /// Failed accounts, keyed by the step that failed.
    pub failures: BTreeMap<VerificationStep, usize>,
    /// The sweep stopped early because shutdown was requested.
    pub cancelled: bool,
}

impl SweepReport {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            sweep_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            total: 0,
            verified: 0,
            failures: BTreeMap::new(),
            cancelled: false,
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.values().sum()
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }
}

pub struct VerificationScheduler {
    store: Arc<dyn AccountStore>,
    refresher: CredentialRefresher,
    aggregator: HoldingsAggregator,
    reconciler: RoleReconciler,
    policy: Arc<SyncPolicy>,
}

impl VerificationScheduler {
    pub fn new(
        store: Arc<dyn AccountStore>,
        refresher: CredentialRefresher,
        aggregator: HoldingsAggregator,
        reconciler: RoleReconciler,
        policy: Arc<SyncPolicy>,
    ) -> Self {
        Self {
            store,
            refresher,
            aggregator,
            reconciler,
            policy,
        }
    }

    /// Run sweeps until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(scheduler.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.policy.sweep_interval.as_secs(),
            account_delay_ms = self.policy.account_delay.as_millis() as u64,
            tiers = self.policy.tiers.len(),
            asset_classes = self.policy.asset_class_ids.len(),
            "Verification scheduler starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Verification scheduler shutting down");
                return;
            }

            self.sweep(&shutdown).await;

            tokio::select! {
                _ = tokio::time::sleep(self.policy.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Verification scheduler shutting down");
                    return;
                }
            }
        }
    }

    /// Verify every listed account once.
    pub async fn sweep(&self, shutdown: &CancellationToken) -> SweepReport {
        let mut report = SweepReport::start();
        let sweep_id = report.sweep_id;

        let accounts = match self.store.list_all_accounts() {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(sweep_id = %sweep_id, error = %e, "Failed to list linked accounts");
                return report.finish();
            }
        };
        report.total = accounts.len();
        info!(sweep_id = %sweep_id, accounts = report.total, "Sweep starting");

        for (index, account) in accounts.iter().enumerate() {
            if shutdown.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if index > 0 && !self.policy.account_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.policy.account_delay) => {},
                    _ = shutdown.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                }
            }

            let span = info_span!("verify", sweep_id = %sweep_id);
            match self
                .verify_account(&account.external_id)
                .instrument(span)
                .await
            {
                Ok(_) => report.verified += 1,
                Err(failure) => *report.failures.entry(failure.step).or_default() += 1,
            }
        }

        let report = report.finish();
        info!(
            sweep_id = %sweep_id,
            total = report.total,
            verified = report.verified,
            failed = report.failed(),
            cancelled = report.cancelled,
            "Sweep finished"
        );
        report
    }

    /// Run one verification cycle for `external_id`, logging any failure.
    pub async fn verify_account(&self, external_id: &str) -> Result<AccountVerified, AccountFailure> {
        match self.cycle(external_id).await {
            Ok(verified) => {
                info!(
                    external_id = %external_id,
                    holdings = verified.holdings,
                    tier_role = verified.tier_role.as_deref().unwrap_or("none"),
                    rotated = verified.credentials_rotated,
                    "Account verified"
                );
                Ok(verified)
            }
            Err(failure) => {
                warn!(
                    external_id = %external_id,
                    step = %failure.step,
                    error = %failure.error,
                    "Account verification failed"
                );
                Err(failure)
            }
        }
    }

    async fn cycle(&self, external_id: &str) -> Result<AccountVerified, AccountFailure> {
        use VerificationStep::*;

        // Persisted state is the source of truth; never trust the listing copy.
        let account = self
            .store
            .get_account_by_external_id(external_id)
            .map_err(|e| AccountFailure::new(LoadingAccount, e))?
            .ok_or_else(|| {
                AccountFailure::new(LoadingAccount, StoreError::NotFound(external_id.to_string()))
            })?;

        let outcome = self
            .refresher
            .refresh(&account)
            .await
            .map_err(|e| AccountFailure::new(RefreshingCredential, e))?;

        if outcome.rotated {
            self.store
                .update_credentials(external_id, &outcome.access_token, &outcome.refresh_token)
                .map_err(|e| AccountFailure::new(RefreshingCredential, e))?;
        }

        let holdings = self
            .aggregator
            .aggregate(external_id, &outcome.access_token, &self.policy.asset_class_ids)
            .await
            .map_err(|e| AccountFailure::new(AggregatingHoldings, e))?;

        let tier_role = self.policy.tiers.resolve(holdings);

        self.reconciler
            .reconcile(external_id, tier_role, &self.policy.tiers)
            .await
            .map_err(|e| AccountFailure::new(ReconcilingRoles, e))?;

        self.store
            .update_holdings_count(external_id, holdings)
            .map_err(|e| AccountFailure::new(Persisting, e))?;

        Ok(AccountVerified {
            external_id: external_id.to_string(),
            holdings,
            tier_role: tier_role.map(str::to_string),
            credentials_rotated: outcome.rotated,
        })
    }
}

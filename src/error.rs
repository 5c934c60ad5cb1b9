// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account-scoped verification failures.
//!
//! None of these are fatal to the process: the scheduler logs them with the
//! account's external id and the step they occurred in, then moves on.

use std::fmt;

use crate::providers::ProviderError;
use crate::storage::StoreError;

/// Steps of a single account's verification cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VerificationStep {
    LoadingAccount,
    RefreshingCredential,
    AggregatingHoldings,
    /// Names the state in logs and reports. Resolution itself cannot fail.
    ResolvingTier,
    ReconcilingRoles,
    Persisting,
}

impl fmt::Display for VerificationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerificationStep::LoadingAccount => "loading_account",
            VerificationStep::RefreshingCredential => "refreshing_credential",
            VerificationStep::AggregatingHoldings => "aggregating_holdings",
            VerificationStep::ResolvingTier => "resolving_tier",
            VerificationStep::ReconcilingRoles => "reconciling_roles",
            VerificationStep::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("credential exchange failed: {0}")]
    CredentialExchangeFailed(String),

    #[error("holdings query failed for asset class {asset_class}: {source}")]
    HoldingsQueryFailed {
        asset_class: String,
        #[source]
        source: ProviderError,
    },

    #[error("role update failed for {}", .failed_roles.join(", "))]
    RoleUpdateFailed { failed_roles: Vec<String> },

    #[error("persistence failed: {0}")]
    PersistenceFailed(#[from] StoreError),
}

/// Failure to complete the asset-side identity handshake.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("linked account not found: {0}")]
    UnknownAccount(String),

    #[error("authorization code exchange failed: {0}")]
    CodeExchangeFailed(#[source] ProviderError),

    #[error("identity lookup failed: {0}")]
    IdentityLookupFailed(#[source] ProviderError),

    #[error("asset API does not know the authorized user")]
    UnknownIdentity,

    #[error("provider issued no refresh credential")]
    NoRefreshCredential,

    #[error("persistence failed: {0}")]
    PersistenceFailed(#[from] StoreError),
}

/// A failed cycle: the step that broke and why.
#[derive(Debug, thiserror::Error)]
#[error("{step}: {error}")]
pub struct AccountFailure {
    pub step: VerificationStep,
    #[source]
    pub error: SyncError,
}

impl AccountFailure {
    pub fn new(step: VerificationStep, error: impl Into<SyncError>) -> Self {
        Self {
            step,
            error: error.into(),
        }
    }
}

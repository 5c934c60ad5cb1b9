// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential refresher: trades a stored refresh credential for a current
//! access credential and reports whether the access credential rotated.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::models::LinkedAccount;
use crate::providers::IdentityProvider;

/// Result of a successful exchange. Nothing has been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub access_token: String,
    /// The provider's new refresh credential, or the previous one when the
    /// provider did not issue a replacement.
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// True iff `access_token` differs from the one on file.
    pub rotated: bool,
}

pub struct CredentialRefresher {
    provider: Arc<dyn IdentityProvider>,
}

impl CredentialRefresher {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    pub async fn refresh(&self, account: &LinkedAccount) -> Result<RefreshOutcome, SyncError> {
        let current_refresh = account
            .refresh_credential
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                SyncError::CredentialExchangeFailed("no refresh credential on file".to_string())
            })?;

        let tokens = self
            .provider
            .refresh(current_refresh)
            .await
            .map_err(|e| SyncError::CredentialExchangeFailed(e.to_string()))?;

        let rotated = account.access_credential.as_deref() != Some(tokens.access_token.as_str());

        Ok(RefreshOutcome {
            refresh_token: tokens
                .refresh_token
                .unwrap_or_else(|| current_refresh.to_string()),
            access_token: tokens.access_token,
            expires_at: tokens.expires_at,
            rotated,
        })
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # External Providers
//!
//! Capability traits for the three remote systems the verifier talks to,
//! plus the reqwest-backed clients used in production:
//!
//! - [`IdentityProvider`] - OAuth2 token endpoint of the asset identity service
//! - [`AssetOwnershipApi`] - per-class ownership queries and identity lookup
//!   under a bearer token
//! - [`GroupMembershipApi`] - Discord guild role add/remove

use async_trait::async_trait;

use crate::models::{AssetIdentity, AssetItem, TokenSet};

pub mod asset_api;
pub mod discord;
pub mod oauth;

pub use asset_api::AssetApiClient;
pub use discord::DiscordClient;
pub use oauth::OAuthClient;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider configuration invalid: {0}")]
    InvalidConfig(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("provider response was invalid: {0}")]
    InvalidResponse(String),
}

/// Exchanges authorization codes and refresh credentials for tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, ProviderError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, ProviderError>;
}

/// Ownership queries against the asset API.
#[async_trait]
pub trait AssetOwnershipApi: Send + Sync {
    /// Items of one asset class owned by the bearer of `access_token`.
    /// A "not found" answer is an empty list, not an error.
    async fn query_assets(
        &self,
        access_token: &str,
        class_id: &str,
    ) -> Result<Vec<AssetItem>, ProviderError>;

    /// Identity of the bearer of `access_token`, `None` if the API does not
    /// know the user.
    async fn user_info(&self, access_token: &str) -> Result<Option<AssetIdentity>, ProviderError>;
}

/// Role membership within the managed guild. Both operations are idempotent.
#[async_trait]
pub trait GroupMembershipApi: Send + Sync {
    async fn add_role(&self, member_id: &str, role_id: &str) -> Result<(), ProviderError>;

    async fn remove_role(&self, member_id: &str, role_id: &str) -> Result<(), ProviderError>;
}

/// Parse and normalise a base URL, dropping any trailing slash.
pub(crate) fn normalize_base_url(raw: &str) -> Result<String, ProviderError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| ProviderError::InvalidConfig(format!("invalid URL `{raw}`: {e}")))?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

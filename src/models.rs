// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Records shared between the verifier, the store and the HTTP collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far an account has progressed through the two identity handshakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Only the Discord side is known.
    Unlinked,
    /// The asset identity is known but no refresh credential is on file.
    LinkedUnauthorized,
    /// A refresh credential is on file; the account takes part in sweeps.
    Authorized,
}

/// A Discord member paired with an optional asset-ownership identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedAccount {
    /// Discord user id. Unique and immutable.
    pub external_id: String,
    pub messaging_handle: String,
    pub messaging_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_identity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_identity_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_credential: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_credential: Option<String>,
    /// Last successfully computed holdings total. `None` until the first
    /// complete verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_holdings_count: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holdings_updated_at: Option<DateTime<Utc>>,
}

impl LinkedAccount {
    /// Construct a freshly linked Discord member with no asset identity yet.
    pub fn new(
        external_id: impl Into<String>,
        messaging_handle: impl Into<String>,
        messaging_email: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            messaging_handle: messaging_handle.into(),
            messaging_email: messaging_email.into(),
            asset_identity_id: None,
            asset_identity_email: None,
            access_credential: None,
            refresh_credential: None,
            last_known_holdings_count: None,
            created_at: Utc::now(),
            holdings_updated_at: None,
        }
    }

    pub fn link_state(&self) -> LinkState {
        let has_refresh = self
            .refresh_credential
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty());

        if has_refresh {
            LinkState::Authorized
        } else if self.asset_identity_id.is_some() {
            LinkState::LinkedUnauthorized
        } else {
            LinkState::Unlinked
        }
    }
}

/// Credentials returned by the identity provider's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    /// Absent when the provider keeps the previous refresh token valid.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One owned item as reported by the asset ownership API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetItem {
    #[serde(rename = "policy_id")]
    pub class_id: String,
    #[serde(rename = "asset_name", default)]
    pub name: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(rename = "onchain_metadata", default)]
    pub metadata: Option<serde_json::Value>,
}

/// The asset-side identity behind an access token (`GET /userinfo`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIdentity {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_state_distinguishes_handshake_progress() {
        let mut account = LinkedAccount::new("1001", "holder#0001", "holder@example.com");
        assert_eq!(account.link_state(), LinkState::Unlinked);

        account.asset_identity_id = Some("asset-user-1".to_string());
        assert_eq!(account.link_state(), LinkState::LinkedUnauthorized);

        account.refresh_credential = Some("   ".to_string());
        assert_eq!(account.link_state(), LinkState::LinkedUnauthorized);

        account.refresh_credential = Some("refresh-1".to_string());
        assert_eq!(account.link_state(), LinkState::Authorized);
    }

    #[test]
    fn account_round_trips_without_optional_fields() {
        let account = LinkedAccount::new("1001", "holder#0001", "holder@example.com");
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("refresh_credential"));

        let parsed: LinkedAccount = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, account);
    }

    #[test]
    fn asset_item_reads_wire_field_names() {
        let item: AssetItem = serde_json::from_str(
            r#"{"policy_id":"hunters","asset_name":"Hunter42","quantity":"1","onchain_metadata":{"name":"Hunter 42"}}"#,
        )
        .unwrap();
        assert_eq!(item.class_id, "hunters");
        assert_eq!(item.name, "Hunter42");
        assert!(item.metadata.is_some());
    }

    #[test]
    fn asset_identity_tolerates_missing_email() {
        let identity: AssetIdentity = serde_json::from_str(r#"{"id":"asset-77"}"#).unwrap();
        assert_eq!(identity.id, "asset-77");
        assert_eq!(identity.email, "");
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity linker: finishes the asset-side handshake for a Discord member
//! who already has a linked account record.
//!
//! The front end owns the redirect and callback. It hands over the member's
//! external id and the authorization code, and usually follows a successful
//! link with [`VerificationScheduler::verify_account`](super::VerificationScheduler::verify_account).

use std::sync::Arc;

use tracing::info;

use crate::error::LinkError;
use crate::models::AssetIdentity;
use crate::providers::{AssetOwnershipApi, IdentityProvider};
use crate::storage::AccountStore;

pub struct IdentityLinker {
    store: Arc<dyn AccountStore>,
    identity: Arc<dyn IdentityProvider>,
    assets: Arc<dyn AssetOwnershipApi>,
}

impl IdentityLinker {
    pub fn new(
        store: Arc<dyn AccountStore>,
        identity: Arc<dyn IdentityProvider>,
        assets: Arc<dyn AssetOwnershipApi>,
    ) -> Self {
        Self {
            store,
            identity,
            assets,
        }
    }

    /// Exchange `code`, look up the asset identity and store both the
    /// identity and the credentials on the account.
    ///
    /// The identity is written before the credentials. When the provider
    /// issues no refresh credential the account is left linked but not
    /// authorized.
    pub async fn complete_link(
        &self,
        external_id: &str,
        code: &str,
    ) -> Result<AssetIdentity, LinkError> {
        if self.store.get_account_by_external_id(external_id)?.is_none() {
            return Err(LinkError::UnknownAccount(external_id.to_string()));
        }

        let tokens = self
            .identity
            .exchange_code(code)
            .await
            .map_err(LinkError::CodeExchangeFailed)?;

        let identity = self
            .assets
            .user_info(&tokens.access_token)
            .await
            .map_err(LinkError::IdentityLookupFailed)?
            .ok_or(LinkError::UnknownIdentity)?;

        self.store
            .update_identity_link(external_id, &identity.id, &identity.email)?;

        let refresh = tokens
            .refresh_token
            .as_deref()
            .ok_or(LinkError::NoRefreshCredential)?;
        self.store
            .update_credentials(external_id, &tokens.access_token, refresh)?;

        info!(
            external_id = %external_id,
            asset_identity_id = %identity.id,
            "Linked asset identity"
        );
        Ok(identity)
    }
}

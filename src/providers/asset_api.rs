// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Asset ownership API client.
//!
//! - `GET {base}/assets?policyId={class}`: items owned by the token's bearer.
//!   A 404 means the member holds nothing of that class.
//! - `GET {base}/userinfo`: the bearer's asset identity. A 404 means unknown.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{normalize_base_url, AssetOwnershipApi, ProviderError};
use crate::models::{AssetIdentity, AssetItem};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct AssetApiClient {
    base_url: String,
    http: Client,
}

impl AssetApiClient {
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            http,
        })
    }
}

#[async_trait]
impl AssetOwnershipApi for AssetApiClient {
    async fn query_assets(
        &self,
        access_token: &str,
        class_id: &str,
    ) -> Result<Vec<AssetItem>, ProviderError> {
        let mut request = self
            .http
            .get(format!("{}/assets", self.base_url))
            .bearer_auth(access_token);
        if !class_id.is_empty() {
            request = request.query(&[("policyId", class_id)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("GET /assets failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(class_id = %class_id, "Asset API returned not found, counting zero");
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("GET /assets invalid JSON: {e}")))
    }

    async fn user_info(&self, access_token: &str) -> Result<Option<AssetIdentity>, ProviderError> {
        let response = self
            .http
            .get(format!("{}/userinfo", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("GET /userinfo failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Asset API does not know this user");
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected { status, body });
        }

        response.json().await.map(Some).map_err(|e| {
            ProviderError::InvalidResponse(format!("GET /userinfo invalid JSON: {e}"))
        })
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth2 token endpoint client for the asset identity provider.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{normalize_base_url, IdentityProvider, ProviderError};
use crate::models::TokenSet;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct OAuthClient {
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: Option<String>,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl OAuthClient {
    pub fn new(
        token_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: Option<String>,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            token_url: normalize_base_url(token_url)?,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url,
            http,
        })
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenSet, ProviderError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected { status, body });
        }

        let token_response: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid token response: {e}")))?;

        into_token_set(token_response)
    }
}

#[async_trait]
impl IdentityProvider for OAuthClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, ProviderError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(redirect) = self.redirect_url.as_deref() {
            form.push(("redirect_uri", redirect));
        }
        self.request_token(&form).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, ProviderError> {
        debug!(token_url = %self.token_url, "Refreshing access token");
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        self.request_token(&form).await
    }
}

fn into_token_set(response: OAuthTokenResponse) -> Result<TokenSet, ProviderError> {
    if response.access_token.trim().is_empty() {
        return Err(ProviderError::InvalidResponse(
            "token response did not include access_token".to_string(),
        ));
    }

    let refresh_token = response
        .refresh_token
        .filter(|token| !token.trim().is_empty());
    let expires_at = response
        .expires_in
        .filter(|secs| *secs > 0)
        .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

    Ok(TokenSet {
        access_token: response.access_token,
        refresh_token,
        expires_at,
    })
}

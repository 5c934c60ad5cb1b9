// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Discord guild role management using bot token authentication.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use tracing::debug;

use super::{normalize_base_url, GroupMembershipApi, ProviderError};

/// Discord API v10 base URL.
pub const DEFAULT_DISCORD_API: &str = "https://discord.com/api/v10";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const AUDIT_LOG_REASON: &str = "holder tier sync";

#[derive(Debug, Clone)]
pub struct DiscordClient {
    api_base_url: String,
    bot_token: String,
    guild_id: String,
    http: Client,
}

impl DiscordClient {
    pub fn new(
        api_base_url: &str,
        bot_token: impl Into<String>,
        guild_id: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url: normalize_base_url(api_base_url)?,
            bot_token: bot_token.into(),
            guild_id: guild_id.into(),
            http,
        })
    }

    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    fn member_role_url(&self, member_id: &str, role_id: &str) -> String {
        format!(
            "{}/guilds/{}/members/{}/roles/{}",
            self.api_base_url, self.guild_id, member_id, role_id
        )
    }

    async fn send_role_request(
        &self,
        method: Method,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), ProviderError> {
        let url = self.member_role_url(member_id, role_id);
        debug!(method = %method, member_id = %member_id, role_id = %role_id, "Discord role request");

        let response = self
            .http
            .request(method.clone(), &url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .header("X-Audit-Log-Reason", AUDIT_LOG_REASON)
            .body("")
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("{method} member role failed: {e}")))?;

        // Unknown member or role: nothing left to remove.
        if method == Method::DELETE && response.status() == StatusCode::NOT_FOUND {
            debug!(member_id = %member_id, role_id = %role_id, "Role already absent");
            return Ok(());
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected { status, body });
        }

        Ok(())
    }
}

#[async_trait]
impl GroupMembershipApi for DiscordClient {
    async fn add_role(&self, member_id: &str, role_id: &str) -> Result<(), ProviderError> {
        self.send_role_request(Method::PUT, member_id, role_id).await
    }

    async fn remove_role(&self, member_id: &str, role_id: &str) -> Result<(), ProviderError> {
        self.send_role_request(Method::DELETE, member_id, role_id)
            .await
    }
}

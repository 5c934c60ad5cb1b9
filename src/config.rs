// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the immutable [`SyncConfig`]
//! built from them once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TIER_ROLE_MAP` | Tier thresholds to role ids (`0:role,5:role`) | Required |
//! | `ASSET_CLASS_IDS` | Comma-separated asset class ids to query | Required |
//! | `SWEEP_INTERVAL_SECS` | Pause between sweeps | `86400` |
//! | `ACCOUNT_DELAY_MS` | Pause between accounts within a sweep | `5000` |
//! | `ACCOUNT_DB_PATH` | redb file holding linked accounts | `data/accounts.redb` |
//! | `ASSET_API_URL` | Asset ownership API base URL | Required |
//! | `ASSET_OAUTH_TOKEN_URL` | Identity provider token endpoint | Required |
//! | `ASSET_OAUTH_CLIENT_ID` | OAuth client id | Required |
//! | `ASSET_OAUTH_CLIENT_SECRET` | OAuth client secret | Required |
//! | `ASSET_OAUTH_REDIRECT_URL` | Redirect URI sent on code exchange | Optional |
//! | `DISCORD_BOT_TOKEN` | Bot token used for role updates | Required |
//! | `DISCORD_GUILD_ID` | Guild whose roles are managed | Required |
//! | `DISCORD_API_URL` | Discord REST base URL | `https://discord.com/api/v10` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::providers::discord::DEFAULT_DISCORD_API;
use crate::tiers::{TierTable, TierTableError};

/// Environment variable name for the tier table.
///
/// Comma-separated `threshold:role_id` pairs, e.g. `0:111,5:222,20:333`.
/// Thresholds must be distinct; a role id may repeat.
///
/// # Default
/// None (required)
pub const TIER_ROLE_MAP_ENV: &str = "TIER_ROLE_MAP";

/// Environment variable name for the asset classes counted toward holdings.
///
/// Comma-separated class (policy) ids, queried in the order given.
///
/// # Default
/// None (required)
pub const ASSET_CLASS_IDS_ENV: &str = "ASSET_CLASS_IDS";

/// Environment variable name for the pause between sweeps, in seconds.
///
/// # Default
/// [`DEFAULT_SWEEP_INTERVAL`]
pub const SWEEP_INTERVAL_SECS_ENV: &str = "SWEEP_INTERVAL_SECS";

/// Environment variable name for the pause between accounts, in milliseconds.
///
/// # Default
/// [`DEFAULT_ACCOUNT_DELAY`]
pub const ACCOUNT_DELAY_MS_ENV: &str = "ACCOUNT_DELAY_MS";

/// Environment variable name for the redb file holding linked accounts.
///
/// Parent directories are created on startup.
///
/// # Default
/// [`DEFAULT_ACCOUNT_DB_PATH`]
pub const ACCOUNT_DB_PATH_ENV: &str = "ACCOUNT_DB_PATH";

/// Environment variable name for the asset ownership API base URL.
///
/// # Default
/// None (required)
pub const ASSET_API_URL_ENV: &str = "ASSET_API_URL";

/// Environment variable name for the identity provider's OAuth2 token endpoint.
///
/// # Default
/// None (required)
pub const ASSET_OAUTH_TOKEN_URL_ENV: &str = "ASSET_OAUTH_TOKEN_URL";

/// Environment variable name for the OAuth2 client id.
///
/// # Default
/// None (required)
pub const ASSET_OAUTH_CLIENT_ID_ENV: &str = "ASSET_OAUTH_CLIENT_ID";

/// Environment variable name for the OAuth2 client secret.
///
/// Never logged; [`ProviderSettings`] redacts it in `Debug` output.
///
/// # Default
/// None (required)
pub const ASSET_OAUTH_CLIENT_SECRET_ENV: &str = "ASSET_OAUTH_CLIENT_SECRET";

/// Environment variable name for the redirect URI sent on code exchange.
///
/// # Default
/// Unset (no `redirect_uri` parameter is sent)
pub const ASSET_OAUTH_REDIRECT_URL_ENV: &str = "ASSET_OAUTH_REDIRECT_URL";

/// Environment variable name for the Discord bot token.
///
/// The bot needs the Manage Roles permission in the guild.
///
/// # Default
/// None (required)
pub const DISCORD_BOT_TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";

/// Environment variable name for the guild whose roles are managed.
///
/// # Default
/// None (required)
pub const DISCORD_GUILD_ID_ENV: &str = "DISCORD_GUILD_ID";

/// Environment variable name for the Discord REST base URL.
///
/// # Default
/// `https://discord.com/api/v10`
pub const DISCORD_API_URL_ENV: &str = "DISCORD_API_URL";

/// Environment variable name for the log output format.
///
/// Accepts `json` (one object per line) or `pretty`.
///
/// # Default
/// `pretty`
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default pause between sweeps: once a day.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(86_400);

/// Default pause between accounts within a sweep.
pub const DEFAULT_ACCOUNT_DELAY: Duration = Duration::from_millis(5_000);

/// Default redb file location, relative to the working directory.
pub const DEFAULT_ACCOUNT_DB_PATH: &str = "data/accounts.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("invalid TIER_ROLE_MAP: {0}")]
    TierTable(#[from] TierTableError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "" => Ok(LogFormat::Pretty),
            other => Err(ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                reason: format!("expected `json` or `pretty`, got `{other}`"),
            }),
        }
    }
}

/// What the scheduler needs to verify accounts. Shared read-only.
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    pub tiers: TierTable,
    pub asset_class_ids: Vec<String>,
    pub sweep_interval: Duration,
    pub account_delay: Duration,
}

/// Endpoints and secrets for the HTTP collaborators.
#[derive(Clone)]
pub struct ProviderSettings {
    pub asset_api_url: String,
    pub oauth_token_url: String,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_redirect_url: Option<String>,
    pub discord_api_url: String,
    pub discord_bot_token: String,
    pub discord_guild_id: String,
}

// Secrets stay out of logs and panic messages.
impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("asset_api_url", &self.asset_api_url)
            .field("oauth_token_url", &self.oauth_token_url)
            .field("oauth_client_id", &self.oauth_client_id)
            .field("oauth_client_secret", &"<redacted>")
            .field("oauth_redirect_url", &self.oauth_redirect_url)
            .field("discord_api_url", &self.discord_api_url)
            .field("discord_bot_token", &"<redacted>")
            .field("discord_guild_id", &self.discord_guild_id)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub policy: SyncPolicy,
    pub providers: ProviderSettings,
    pub account_db_path: PathBuf,
    pub log_format: LogFormat,
}

impl SyncConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &'static str| optional(name).ok_or(ConfigError::Missing(name));

        let tiers: TierTable = required(TIER_ROLE_MAP_ENV)?.parse()?;
        if tiers.is_empty() {
            return Err(ConfigError::Invalid {
                name: TIER_ROLE_MAP_ENV,
                reason: "no tiers configured".to_string(),
            });
        }

        let asset_class_ids: Vec<String> = required(ASSET_CLASS_IDS_ENV)?
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        if asset_class_ids.is_empty() {
            return Err(ConfigError::Invalid {
                name: ASSET_CLASS_IDS_ENV,
                reason: "no asset class ids configured".to_string(),
            });
        }

        let sweep_interval = match optional(SWEEP_INTERVAL_SECS_ENV) {
            Some(raw) => Duration::from_secs(parse_number(SWEEP_INTERVAL_SECS_ENV, &raw)?),
            None => DEFAULT_SWEEP_INTERVAL,
        };
        let account_delay = match optional(ACCOUNT_DELAY_MS_ENV) {
            Some(raw) => Duration::from_millis(parse_number(ACCOUNT_DELAY_MS_ENV, &raw)?),
            None => DEFAULT_ACCOUNT_DELAY,
        };

        let providers = ProviderSettings {
            asset_api_url: url_value(ASSET_API_URL_ENV, required(ASSET_API_URL_ENV)?)?,
            oauth_token_url: url_value(
                ASSET_OAUTH_TOKEN_URL_ENV,
                required(ASSET_OAUTH_TOKEN_URL_ENV)?,
            )?,
            oauth_client_id: required(ASSET_OAUTH_CLIENT_ID_ENV)?,
            oauth_client_secret: required(ASSET_OAUTH_CLIENT_SECRET_ENV)?,
            oauth_redirect_url: optional(ASSET_OAUTH_REDIRECT_URL_ENV)
                .map(|raw| url_value(ASSET_OAUTH_REDIRECT_URL_ENV, raw))
                .transpose()?,
            discord_api_url: url_value(
                DISCORD_API_URL_ENV,
                optional(DISCORD_API_URL_ENV).unwrap_or_else(|| DEFAULT_DISCORD_API.to_string()),
            )?,
            discord_bot_token: required(DISCORD_BOT_TOKEN_ENV)?,
            discord_guild_id: required(DISCORD_GUILD_ID_ENV)?,
        };

        let log_format = match optional(LOG_FORMAT_ENV) {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            policy: SyncPolicy {
                tiers,
                asset_class_ids,
                sweep_interval,
                account_delay,
            },
            providers,
            account_db_path: optional(ACCOUNT_DB_PATH_ENV)
                .unwrap_or_else(|| DEFAULT_ACCOUNT_DB_PATH.to_string())
                .into(),
            log_format,
        })
    }
}

fn parse_number(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        name,
        reason: format!("`{raw}` is not a non-negative integer"),
    })
}

fn url_value(name: &'static str, raw: String) -> Result<String, ConfigError> {
    url::Url::parse(&raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    Ok(raw)
}

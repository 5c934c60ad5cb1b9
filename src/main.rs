// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use holder_role_sync::config::{LogFormat, SyncConfig};
use holder_role_sync::providers::{AssetApiClient, DiscordClient, OAuthClient};
use holder_role_sync::storage::RedbAccountStore;
use holder_role_sync::verifier::{
    CredentialRefresher, HoldingsAggregator, RoleReconciler, VerificationScheduler,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SyncConfig::from_env()?;
    init_tracing(config.log_format);

    info!(
        db_path = %config.account_db_path.display(),
        guild_id = %config.providers.discord_guild_id,
        "Starting holder role sync"
    );

    let store = Arc::new(RedbAccountStore::open(&config.account_db_path)?);

    let providers = &config.providers;
    let identity = Arc::new(OAuthClient::new(
        &providers.oauth_token_url,
        providers.oauth_client_id.clone(),
        providers.oauth_client_secret.clone(),
        providers.oauth_redirect_url.clone(),
    )?);
    let assets = Arc::new(AssetApiClient::new(&providers.asset_api_url)?);
    let guild = Arc::new(DiscordClient::new(
        &providers.discord_api_url,
        providers.discord_bot_token.clone(),
        providers.discord_guild_id.clone(),
    )?);

    let scheduler = VerificationScheduler::new(
        store,
        CredentialRefresher::new(identity),
        HoldingsAggregator::new(assets),
        RoleReconciler::new(guild),
        Arc::new(config.policy),
    );

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(scheduler.run(shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping scheduler");
    shutdown.cancel();
    handle.await?;

    Ok(())
}

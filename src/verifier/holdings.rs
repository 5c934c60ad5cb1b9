// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Holdings aggregator: one ownership query per asset class, summed.

use std::sync::Arc;

use tracing::debug;

use crate::error::SyncError;
use crate::providers::AssetOwnershipApi;

pub struct HoldingsAggregator {
    api: Arc<dyn AssetOwnershipApi>,
}

impl HoldingsAggregator {
    pub fn new(api: Arc<dyn AssetOwnershipApi>) -> Self {
        Self { api }
    }

    /// Total number of items held across `asset_class_ids`.
    ///
    /// Items appearing under more than one class are counted once per class.
    /// Any failed query aborts the whole aggregation.
    pub async fn aggregate(
        &self,
        external_id: &str,
        access_token: &str,
        asset_class_ids: &[String],
    ) -> Result<u64, SyncError> {
        let mut total: u64 = 0;

        for class_id in asset_class_ids {
            let items = self
                .api
                .query_assets(access_token, class_id)
                .await
                .map_err(|source| SyncError::HoldingsQueryFailed {
                    asset_class: class_id.clone(),
                    source,
                })?;

            debug!(
                external_id = %external_id,
                asset_class = %class_id,
                count = items.len(),
                "Counted holdings for asset class"
            );
            total = total.saturating_add(items.len() as u64);
        }

        Ok(total)
    }
}

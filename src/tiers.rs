// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tier table: holdings thresholds mapped to Discord role ids.
//!
//! Thresholds are evaluated from highest to lowest and the first one the
//! holdings total reaches wins. The table is parsed once at startup from the
//! `threshold:role,threshold:role` format and never mutated afterwards.

use std::collections::BTreeMap;
use std::str::FromStr;

/// Error produced while parsing a tier table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierTableError {
    #[error("tier entry `{0}` is not in `threshold:role` form")]
    MalformedEntry(String),

    #[error("tier threshold `{0}` is not a non-negative integer")]
    InvalidThreshold(String),

    #[error("tier threshold {0} has an empty role id")]
    EmptyRole(u64),

    #[error("tier threshold {0} is configured more than once")]
    DuplicateThreshold(u64),
}

/// Ordered threshold → role mapping with pairwise distinct thresholds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierTable {
    tiers: BTreeMap<u64, String>,
}

impl TierTable {
    /// Build a table from `(threshold, role_id)` pairs.
    pub fn new<I, R>(entries: I) -> Result<Self, TierTableError>
    where
        I: IntoIterator<Item = (u64, R)>,
        R: Into<String>,
    {
        let mut tiers = BTreeMap::new();
        for (threshold, role) in entries {
            let role = role.into();
            if role.trim().is_empty() {
                return Err(TierTableError::EmptyRole(threshold));
            }
            if tiers.insert(threshold, role.trim().to_string()).is_some() {
                return Err(TierTableError::DuplicateThreshold(threshold));
            }
        }
        Ok(Self { tiers })
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Tiers from the highest threshold to the lowest.
    pub fn descending(&self) -> impl Iterator<Item = (u64, &str)> + '_ {
        self.tiers
            .iter()
            .rev()
            .map(|(threshold, role)| (*threshold, role.as_str()))
    }

    /// Resolve the role for a holdings total, or `None` when the total is
    /// below every threshold.
    pub fn resolve(&self, total: u64) -> Option<&str> {
        self.descending()
            .find(|(threshold, _)| *threshold <= total)
            .map(|(_, role)| role)
    }

    /// Every distinct role id in descending threshold order.
    pub fn role_ids(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = Vec::with_capacity(self.tiers.len());
        for (_, role) in self.descending() {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        roles
    }
}

impl FromStr for TierTable {
    type Err = TierTableError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (threshold, role) = entry
                .split_once(':')
                .ok_or_else(|| TierTableError::MalformedEntry(entry.to_string()))?;
            let threshold = threshold.trim();
            let threshold: u64 = threshold
                .parse()
                .map_err(|_| TierTableError::InvalidThreshold(threshold.to_string()))?;
            entries.push((threshold, role.trim().to_string()));
        }
        Self::new(entries)
    }
}

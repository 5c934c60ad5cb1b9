// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Holder Role Sync - NFT holdings to Discord tier roles
//!
//! Keeps each linked Discord member's tier role in line with the number of
//! assets they hold, re-verifying every account on a fixed schedule.
//!
//! ## Modules
//!
//! - `config` - Environment configuration and sync policy
//! - `models` - Linked accounts, token sets, asset items
//! - `providers` - OAuth, asset API and Discord HTTP clients
//! - `storage` - Linked account store (redb)
//! - `tiers` - Holdings thresholds to role ids
//! - `verifier` - Per-account verification cycle and the sweep scheduler

pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod storage;
pub mod tiers;
pub mod verifier;

#[cfg(test)]
mod testing;

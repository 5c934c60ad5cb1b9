// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Storage
//!
//! Persistence for linked accounts. The verifier only depends on the
//! [`AccountStore`] trait; [`RedbAccountStore`] is the embedded
//! implementation used by the service binary.
//!
//! ## Storage Layout
//!
//! ```text
//! {ACCOUNT_DB_PATH}          # single redb file
//!   linked_accounts          # external_id -> LinkedAccount JSON
//! ```

pub mod accounts;

pub use accounts::{AccountStore, RedbAccountStore, StoreError, StoreResult};

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Verifier
//!
//! The per-account verification cycle and the background task that drives it.
//!
//! - [`CredentialRefresher`] - refresh credential → current access credential
//! - [`HoldingsAggregator`] - access credential → holdings total
//! - [`RoleReconciler`] - resolved tier → Discord role add/remove operations
//! - [`VerificationScheduler`] - sweeps all linked accounts on an interval
//! - [`IdentityLinker`] - stores the asset identity after the code handshake

pub mod holdings;
pub mod linker;
pub mod reconciler;
pub mod refresher;
pub mod scheduler;

pub use holdings::HoldingsAggregator;
pub use linker::IdentityLinker;
pub use reconciler::{ReconcileReport, RoleAction, RoleDecision, RoleOperation, RoleReconciler};
pub use refresher::{CredentialRefresher, RefreshOutcome};
pub use scheduler::{AccountVerified, SweepReport, VerificationScheduler};

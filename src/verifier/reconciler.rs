// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role reconciler.
//!
//! An account should hold exactly one tier role (the resolved one, if any)
//! and none of the other tier roles. Roles outside the tier table are never
//! touched. Operations follow descending threshold order so the emitted
//! sequence is deterministic.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::SyncError;
use crate::providers::GroupMembershipApi;
use crate::tiers::TierTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOperation {
    pub role_id: String,
    pub action: RoleAction,
}

/// Add/remove plan for one account, computed fresh every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDecision {
    pub account_id: String,
    pub operations: Vec<RoleOperation>,
}

impl RoleDecision {
    /// Plan the operations that bring `account_id` to `resolved`.
    ///
    /// A role id bound to several thresholds is planned once; when it is the
    /// resolved role it is only ever added.
    pub fn compute(account_id: &str, resolved: Option<&str>, tiers: &TierTable) -> Self {
        let operations = tiers
            .role_ids()
            .into_iter()
            .map(|role_id| RoleOperation {
                role_id: role_id.to_string(),
                action: if Some(role_id) == resolved {
                    RoleAction::Add
                } else {
                    RoleAction::Remove
                },
            })
            .collect();

        Self {
            account_id: account_id.to_string(),
            operations,
        }
    }

    pub fn roles_to_add(&self) -> BTreeSet<&str> {
        self.roles_with(RoleAction::Add)
    }

    pub fn roles_to_remove(&self) -> BTreeSet<&str> {
        self.roles_with(RoleAction::Remove)
    }

    fn roles_with(&self, action: RoleAction) -> BTreeSet<&str> {
        self.operations
            .iter()
            .filter(|op| op.action == action)
            .map(|op| op.role_id.as_str())
            .collect()
    }
}

/// Outcome of one applied operation. `error` is `None` on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOutcome {
    pub operation: RoleOperation,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub account_id: String,
    pub outcomes: Vec<RoleOutcome>,
}

impl ReconcileReport {
    pub fn failed_roles(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.error.is_some())
            .map(|outcome| outcome.operation.role_id.clone())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.error.is_none())
    }

    /// `RoleUpdateFailed` naming every failed role, if any failed.
    pub fn into_result(self) -> Result<Self, SyncError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SyncError::RoleUpdateFailed {
                failed_roles: self.failed_roles(),
            })
        }
    }
}

pub struct RoleReconciler {
    membership: Arc<dyn GroupMembershipApi>,
}

impl RoleReconciler {
    pub fn new(membership: Arc<dyn GroupMembershipApi>) -> Self {
        Self { membership }
    }

    /// Compute and apply the decision for `account_id`.
    pub async fn reconcile(
        &self,
        account_id: &str,
        resolved: Option<&str>,
        tiers: &TierTable,
    ) -> Result<ReconcileReport, SyncError> {
        let decision = RoleDecision::compute(account_id, resolved, tiers);
        self.apply(&decision).await.into_result()
    }

    /// Apply every operation. A failed operation does not stop the others.
    pub async fn apply(&self, decision: &RoleDecision) -> ReconcileReport {
        let member = decision.account_id.as_str();
        let mut outcomes = Vec::with_capacity(decision.operations.len());

        for operation in &decision.operations {
            let role = operation.role_id.as_str();
            let result = match operation.action {
                RoleAction::Add => self.membership.add_role(member, role).await,
                RoleAction::Remove => self.membership.remove_role(member, role).await,
            };

            let error = match result {
                Ok(()) => {
                    info!(
                        external_id = %member,
                        role_id = %role,
                        action = ?operation.action,
                        "Applied tier role"
                    );
                    None
                }
                Err(e) => {
                    warn!(
                        external_id = %member,
                        role_id = %role,
                        action = ?operation.action,
                        error = %e,
                        "Tier role update failed"
                    );
                    Some(e.to_string())
                }
            };

            outcomes.push(RoleOutcome {
                operation: operation.clone(),
                error,
            });
        }

        ReconcileReport {
            account_id: decision.account_id.clone(),
            outcomes,
        }
    }
}

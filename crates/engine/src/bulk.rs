//! Bulk action coordination.
//!
//! One decision applied to many instances. Each instance id is its own
//! atomic unit; a failing instance never aborts or rolls back the others.

use serde::{Deserialize, Serialize};
use tracing::info;

use fuelgate_core::workflow::{ApprovalDecision, Approver, InstanceStatus, WorkflowError};
use fuelgate_shared::types::InstanceId;

use crate::manager::WorkflowEngine;

/// Result for a single instance in a bulk action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkActionItem {
    /// The acted-on instance.
    pub instance_id: InstanceId,
    /// Whether the action succeeded.
    pub success: bool,
    /// Status after the action, when it succeeded.
    pub status: Option<InstanceStatus>,
    /// Error message, when it failed.
    pub error: Option<String>,
}

/// Aggregated result of a bulk action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkActionReport {
    /// Per-instance outcomes, in request order.
    pub results: Vec<BulkActionItem>,
    /// Number of successful actions.
    pub success_count: usize,
    /// Number of failed actions.
    pub failure_count: usize,
}

impl WorkflowEngine {
    /// Applies one decision to many instances, isolating failures.
    ///
    /// The current step of each instance is resolved internally.
    /// `skip_authorization` bypasses only the assignee check; state-machine
    /// validation always runs. The aggregate call itself never fails on a
    /// per-instance error.
    pub async fn bulk_act(
        &self,
        instance_ids: Vec<InstanceId>,
        decision: ApprovalDecision,
        approver: Approver,
        comments: Option<String>,
        skip_authorization: bool,
    ) -> BulkActionReport {
        let mut results = Vec::with_capacity(instance_ids.len());
        let mut success_count = 0;
        let mut failure_count = 0;

        for instance_id in instance_ids {
            match self
                .act_with_options(
                    instance_id,
                    None,
                    approver,
                    decision.clone(),
                    comments.clone(),
                    vec![],
                    !skip_authorization,
                )
                .await
            {
                Ok(instance) => {
                    success_count += 1;
                    results.push(BulkActionItem {
                        instance_id,
                        success: true,
                        status: Some(instance.status),
                        error: None,
                    });
                }
                Err(err) => {
                    failure_count += 1;
                    results.push(BulkActionItem {
                        instance_id,
                        success: false,
                        status: None,
                        error: Some(error_summary(&err)),
                    });
                }
            }
        }

        info!(
            successful = success_count,
            failed = failure_count,
            "bulk action completed"
        );

        BulkActionReport {
            results,
            success_count,
            failure_count,
        }
    }
}

fn error_summary(err: &WorkflowError) -> String {
    format!("{}: {err}", err.error_code())
}

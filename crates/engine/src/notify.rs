//! Outbound notifications and domain events.
//!
//! Emission is strictly fire-and-log: it happens after the workflow write
//! commits, and a failing emitter never rolls back a transition. Other
//! subsystems (inventory, invoicing, accrual) subscribe to the domain
//! events to react to terminal states.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use fuelgate_core::workflow::{
    InstanceStatus, Priority, SourceDocument, StepAssignee, WorkflowType,
};
use fuelgate_shared::error::AppError;
use fuelgate_shared::types::{InstanceId, UserId};

/// What a notification request is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new instance awaits its first decision.
    Submitted,
    /// An approver action was processed; the next decision is awaited.
    ActionProcessed,
    /// An SLA deadline was missed and the instance escalated.
    Escalated,
    /// The instance was cancelled.
    Cancelled,
}

/// A request for the notification subsystem; delivery mechanics live there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// The instance the notification is about.
    pub instance_id: InstanceId,
    /// The workflow type of the instance.
    pub workflow_type: WorkflowType,
    /// What the notification is about.
    pub kind: NotificationKind,
    /// The user who submitted the transaction.
    pub requester: UserId,
    /// Who should be notified.
    pub audience: Vec<StepAssignee>,
    /// Processing priority of the instance.
    pub priority: Priority,
    /// Deadline for the awaited decision, when one is pending.
    pub sla_deadline: Option<DateTime<Utc>>,
}

/// Domain event published on workflow state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// An instance was created and awaits approval.
    SubmittedForApproval {
        /// The new instance.
        instance_id: InstanceId,
        /// The workflow type of the instance.
        workflow_type: WorkflowType,
        /// The document being authorized.
        document: SourceDocument,
        /// The submitting user.
        requester: UserId,
    },
    /// An approval action was processed.
    ApprovalProcessed {
        /// The acted-on instance.
        instance_id: InstanceId,
        /// The workflow type of the instance.
        workflow_type: WorkflowType,
        /// Status after the action.
        status: InstanceStatus,
    },
    /// An instance was cancelled.
    Cancelled {
        /// The cancelled instance.
        instance_id: InstanceId,
        /// The workflow type of the instance.
        workflow_type: WorkflowType,
        /// The stated cancellation reason.
        reason: String,
    },
    /// An instance escalated after a missed deadline.
    Escalated {
        /// The escalated instance.
        instance_id: InstanceId,
        /// The workflow type of the instance.
        workflow_type: WorkflowType,
        /// Escalation level after the sweep.
        level: u32,
    },
    /// An instance timed out with no escalation rule configured.
    TimedOut {
        /// The timed-out instance.
        instance_id: InstanceId,
        /// The workflow type of the instance.
        workflow_type: WorkflowType,
    },
}

impl WorkflowEvent {
    /// Dotted event name, e.g. `delivery_approval.submitted_for_approval`.
    #[must_use]
    pub fn name(&self) -> String {
        let (workflow_type, suffix) = match self {
            Self::SubmittedForApproval { workflow_type, .. } => {
                (workflow_type, "submitted_for_approval")
            }
            Self::ApprovalProcessed { workflow_type, .. } => (workflow_type, "approval_processed"),
            Self::Cancelled { workflow_type, .. } => (workflow_type, "cancelled"),
            Self::Escalated { workflow_type, .. } => (workflow_type, "escalated"),
            Self::TimedOut { workflow_type, .. } => (workflow_type, "timed_out"),
        };
        format!("{workflow_type}.{suffix}")
    }
}

/// Outbound contract to the notification and event subsystems.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    /// Requests a notification delivery.
    async fn notify(&self, request: NotificationRequest) -> Result<(), AppError>;

    /// Publishes a domain event.
    async fn publish(&self, event: WorkflowEvent) -> Result<(), AppError>;
}

/// Emitter that writes requests to the log; the development default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmitter;

#[async_trait]
impl NotificationEmitter for TracingEmitter {
    async fn notify(&self, request: NotificationRequest) -> Result<(), AppError> {
        info!(
            instance_id = %request.instance_id,
            workflow_type = %request.workflow_type,
            kind = ?request.kind,
            audience = request.audience.len(),
            "notification requested"
        );
        Ok(())
    }

    async fn publish(&self, event: WorkflowEvent) -> Result<(), AppError> {
        info!(event = %event.name(), "domain event published");
        Ok(())
    }
}

//! Workflow domain types for the approval lifecycle.
//!
//! This module defines the core types used for managing instance
//! status transitions, approver identity, and the audit history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use fuelgate_shared::types::{HistoryEntryId, StepId, UserId};

/// Business transaction domains that require approval before proceeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    /// Fuel delivery authorization.
    DeliveryApproval,
    /// Supplier invoice authorization.
    SupplierInvoice,
    /// Customer invoice authorization.
    CustomerInvoice,
    /// Bulk invoice run authorization.
    BulkInvoice,
    /// Fuel subsidy claim authorization.
    SubsidyClaim,
}

impl WorkflowType {
    /// Returns the string representation of the workflow type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeliveryApproval => "delivery_approval",
            Self::SupplierInvoice => "supplier_invoice",
            Self::CustomerInvoice => "customer_invoice",
            Self::BulkInvoice => "bulk_invoice",
            Self::SubsidyClaim => "subsidy_claim",
        }
    }

    /// Parses a workflow type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "delivery_approval" => Some(Self::DeliveryApproval),
            "supplier_invoice" => Some(Self::SupplierInvoice),
            "customer_invoice" => Some(Self::CustomerInvoice),
            "bulk_invoice" => Some(Self::BulkInvoice),
            "subsidy_claim" => Some(Self::SubsidyClaim),
            _ => None,
        }
    }

    /// Returns true for workflow types covering many counterparties at once.
    #[must_use]
    pub fn is_bulk(&self) -> bool {
        matches!(self, Self::BulkInvoice)
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Processing priority of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Routine processing.
    Low,
    /// Default priority.
    Normal,
    /// Expedited processing.
    High,
    /// Requires immediate attention.
    Critical,
}

impl Priority {
    /// Returns the string representation of the priority.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parses a priority from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Instance status in the approval workflow.
///
/// Instances progress through these states from submission to a terminal
/// outcome. `Escalated` and `TimedOut` are alert states: the instance still
/// accepts approver actions until a terminal transition is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Created, first step not yet acted on.
    Pending,
    /// At least one step acted on, more remain.
    InProgress,
    /// All required approvals collected (terminal).
    Approved,
    /// Rejected by an approver or forced by escalation (terminal).
    Rejected,
    /// Cancelled by the requester or an administrator (terminal).
    Cancelled,
    /// SLA deadline passed and an escalation rule fired.
    Escalated,
    /// SLA deadline passed with no escalation rule configured.
    TimedOut,
}

impl InstanceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Escalated => "escalated",
            Self::TimedOut => "timed_out",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            "escalated" => Some(Self::Escalated),
            "timed_out" => Some(Self::TimedOut),
            _ => None,
        }
    }

    /// Returns true if the instance has reached a final outcome.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }

    /// Returns true if approver actions are still accepted.
    #[must_use]
    pub fn accepts_actions(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the instance can be cancelled from this status.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress | Self::Escalated)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Organizational role an approver can act under.
///
/// Role-based steps match any approver presenting the configured role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    /// Depot and delivery operations staff.
    Operations,
    /// Accounts payable/receivable officers.
    FinanceOfficer,
    /// Regulatory compliance officers.
    ComplianceOfficer,
    /// Line management.
    Manager,
    /// Senior management.
    Director,
}

impl ApproverRole {
    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operations => "operations",
            Self::FinanceOfficer => "finance_officer",
            Self::ComplianceOfficer => "compliance_officer",
            Self::Manager => "manager",
            Self::Director => "director",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "operations" => Some(Self::Operations),
            "finance_officer" => Some(Self::FinanceOfficer),
            "compliance_officer" => Some(Self::ComplianceOfficer),
            "manager" => Some(Self::Manager),
            "director" => Some(Self::Director),
            _ => None,
        }
    }
}

impl fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity an approver presents when acting on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    /// The acting user.
    pub id: UserId,
    /// The role the user is acting under.
    pub role: ApproverRole,
}

/// Decision submitted by an approver against the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Approve the current step.
    Approve,
    /// Reject the instance (terminal unless the step allows skip-and-advance).
    Reject,
    /// Hand the pending approval to another user.
    Delegate {
        /// The user receiving the delegation.
        to: UserId,
    },
    /// Ask the requester for more information; extends the SLA clock.
    RequestInfo,
}

/// Action recorded for a human approver in the audit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HumanAction {
    /// Step approval.
    Approved,
    /// Instance rejection.
    Rejected,
    /// Pending approval handed to another user.
    Delegated {
        /// The approver who delegated.
        from: UserId,
        /// The user receiving the delegation.
        to: UserId,
    },
    /// Additional information requested from the requester.
    InfoRequested,
    /// Instance cancelled.
    Cancelled,
}

/// Action recorded for the engine itself in the audit history.
///
/// Only the submission short-circuit and the escalation sweeper author
/// these entries; they never carry a human actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SystemAction {
    /// Auto-approval rule satisfied at submission, or escalation forced approval.
    AutoApproved,
    /// Escalation rule fired after a missed SLA deadline.
    Escalated {
        /// The escalation level after this entry.
        level: u32,
    },
    /// SLA deadline passed with no escalation rule configured.
    TimedOut,
    /// Escalation forced a terminal rejection.
    AutoRejected,
    /// Escalation reassigned the pending step.
    Reassigned {
        /// The new assignee for the current step.
        to: super::definition::StepAssignee,
    },
}

/// Actor-tagged action on the audit history.
///
/// Modeled as a sum type so handling of human versus system entries is
/// exhaustive rather than stringly-typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "actor", rename_all = "snake_case")]
pub enum HistoryAction {
    /// An action performed by a human approver.
    Human {
        /// The acting approver.
        approver: UserId,
        /// What the approver did.
        action: HumanAction,
    },
    /// An action performed by the engine.
    System {
        /// What the engine did.
        action: SystemAction,
    },
}

impl HistoryAction {
    /// Returns the approver if this entry records a human step approval.
    #[must_use]
    pub fn approved_by(&self) -> Option<UserId> {
        match self {
            Self::Human {
                approver,
                action: HumanAction::Approved,
            } => Some(*approver),
            _ => None,
        }
    }

    /// Returns a short label for logs and API responses.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Human { action, .. } => match action {
                HumanAction::Approved => "approved",
                HumanAction::Rejected => "rejected",
                HumanAction::Delegated { .. } => "delegated",
                HumanAction::InfoRequested => "info_requested",
                HumanAction::Cancelled => "cancelled",
            },
            Self::System { action } => match action {
                SystemAction::AutoApproved => "system_approved",
                SystemAction::Escalated { .. } => "escalated",
                SystemAction::TimedOut => "timeout",
                SystemAction::AutoRejected => "system_rejected",
                SystemAction::Reassigned { .. } => "reassigned",
            },
        }
    }
}

/// One immutable entry in an instance's append-only audit history.
///
/// Entries are strictly ordered by `at`; the history is the sole audit
/// trail and replaying it reproduces the instance state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalHistoryEntry {
    /// Unique identifier for the entry.
    pub id: HistoryEntryId,
    /// The step this entry was recorded against.
    pub step_id: StepId,
    /// The order of that step within the definition.
    pub step_order: u32,
    /// Human-readable step name at recording time.
    pub step_name: String,
    /// Who acted and what they did.
    pub action: HistoryAction,
    /// When the action happened.
    pub at: DateTime<Utc>,
    /// Free-text comments from the actor.
    pub comments: Option<String>,
    /// Attachment references supplied with the action.
    pub attachments: Vec<String>,
}

//! Workflow definition templates.
//!
//! A definition describes the approval gates for one workflow type:
//! ordered steps, escalation rules, and auto-approval rules. Definitions
//! are validated at construction and treated as immutable once a live
//! instance has bound to them.

use serde::{Deserialize, Serialize};

use fuelgate_shared::types::{DefinitionId, RuleId, StepId, UserId};
use rust_decimal::Decimal;

use crate::workflow::condition::{ApprovalCondition, EvaluationContext, evaluate_all};
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Approver, ApproverRole, WorkflowType};

/// How approvals for a step are sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// A single named approver.
    Individual,
    /// A set of named approvers, a configured number of whom must approve.
    Group,
    /// Any approver acting under the configured role.
    RoleBased,
    /// A bookkeeping gate that passes without human action.
    System,
}

/// Who may approve a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAssignee {
    /// A specific user.
    User {
        /// The assigned user.
        id: UserId,
    },
    /// Any user acting under a role.
    Role {
        /// The assigned role.
        role: ApproverRole,
    },
}

impl StepAssignee {
    /// Returns true if the presented approver satisfies this assignment.
    #[must_use]
    pub fn matches(&self, approver: &Approver) -> bool {
        match self {
            Self::User { id } => *id == approver.id,
            Self::Role { role } => *role == approver.role,
        }
    }

    /// Returns true if this assignment names the given user directly.
    #[must_use]
    pub fn is_user(&self, user: UserId) -> bool {
        matches!(self, Self::User { id } if *id == user)
    }
}

/// What a rejection does on a step.
///
/// Whether rejecting an optional step terminates the workflow or skips
/// past the step is a per-deployment policy, so it is configured per step
/// rather than hard-coded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectPolicy {
    /// A single rejection terminates the instance.
    #[default]
    Terminate,
    /// On an optional step, a rejection skips the step and advances.
    SkipAndAdvance,
}

/// One ordered approval gate in a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    /// Unique identifier for the step.
    pub id: StepId,
    /// Human-readable step name.
    pub name: String,
    /// Position in the sequence; unique and ascending within a definition.
    pub order: u32,
    /// How approvals for this step are sourced.
    pub step_type: StepType,
    /// Number of distinct qualifying approvals required to advance.
    pub required_approvals: u32,
    /// Who may approve this step.
    pub assignees: Vec<StepAssignee>,
    /// Skip conditions: the step only applies when these hold.
    pub conditions: Vec<ApprovalCondition>,
    /// Whether the step may be skipped on rejection (see `reject_policy`).
    pub optional: bool,
    /// What a rejection does on this step.
    pub reject_policy: RejectPolicy,
    /// SLA for a decision on this step, in hours.
    pub timeout_hours: Option<i64>,
    /// Step-specific escalation actions, consulted before the rule's own.
    pub escalation_actions: Vec<EscalationAction>,
}

impl ApprovalStep {
    /// Returns true if the step applies under the given context.
    ///
    /// A step with conditions that do not hold is skipped entirely.
    #[must_use]
    pub fn applies_to(&self, ctx: &EvaluationContext) -> bool {
        evaluate_all(&self.conditions, ctx)
    }
}

/// What causes an escalation rule to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTrigger {
    /// SLA deadline missed.
    Timeout,
    /// Step rejected.
    Rejection,
    /// Assignee unresponsive.
    NonResponse,
    /// Compliance check failed.
    ComplianceFailure,
}

/// One action executed when an escalation rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationAction {
    /// Send a notification to the current assignees.
    Notify,
    /// Replace the current step's assignees.
    Reassign {
        /// The new assignee.
        to: StepAssignee,
    },
    /// Hand the step to a (usually more senior) role.
    EscalateToRole {
        /// The role receiving the step.
        role: ApproverRole,
    },
    /// Force terminal approval.
    AutoApprove,
    /// Force terminal rejection.
    AutoReject,
}

/// Escalation configuration for a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRule {
    /// Unique identifier for the rule.
    pub id: RuleId,
    /// What causes the rule to fire.
    pub trigger: EscalationTrigger,
    /// Hours granted to the escalated step before the next sweep fires.
    pub delay_hours: i64,
    /// Actions executed in order when the rule fires.
    pub actions: Vec<EscalationAction>,
    /// Cap on repeated escalations; at the cap a terminal outcome is forced.
    pub max_escalation_level: u32,
}

impl EscalationRule {
    /// The terminal action forced once `max_escalation_level` is reached.
    ///
    /// The last configured auto action wins; rules without one default to
    /// auto-reject so instances cannot linger in unbounded limbo.
    #[must_use]
    pub fn forced_outcome(&self) -> EscalationAction {
        self.actions
            .iter()
            .rev()
            .find(|a| matches!(a, EscalationAction::AutoApprove | EscalationAction::AutoReject))
            .cloned()
            .unwrap_or(EscalationAction::AutoReject)
    }
}

/// A rule that bypasses human approval entirely when satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoApprovalRule {
    /// Unique identifier for the rule.
    pub id: RuleId,
    /// Human-readable rule name, recorded on the auto-approval entry.
    pub name: String,
    /// AND-combined conditions; all must hold.
    pub conditions: Vec<ApprovalCondition>,
    /// Workflow types the rule applies to; empty means all.
    pub workflow_types: Vec<WorkflowType>,
    /// Inactive rules are never evaluated.
    pub active: bool,
}

impl AutoApprovalRule {
    /// Returns true if the rule applies to the given workflow type.
    #[must_use]
    pub fn applies_to(&self, workflow_type: WorkflowType) -> bool {
        self.workflow_types.is_empty() || self.workflow_types.contains(&workflow_type)
    }

    /// Returns true if the rule authorizes auto-approval under the context.
    #[must_use]
    pub fn matches(&self, workflow_type: WorkflowType, ctx: &EvaluationContext) -> bool {
        self.active && self.applies_to(workflow_type) && evaluate_all(&self.conditions, ctx)
    }
}

/// Compliance thresholds and flags attached to a definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Transactions scoring below this are flagged for compliance review.
    pub minimum_compliance_score: Option<Decimal>,
    /// Whether regulatory identifiers are mandatory for this workflow type.
    pub require_regulatory_ids: bool,
}

/// A versioned approval workflow template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique identifier for the definition.
    pub id: DefinitionId,
    /// Human-readable definition name.
    pub name: String,
    /// The transaction domain this definition governs.
    pub workflow_type: WorkflowType,
    /// Ordered approval gates.
    pub steps: Vec<ApprovalStep>,
    /// Escalation configuration.
    pub escalation_rules: Vec<EscalationRule>,
    /// Rules that bypass human approval entirely.
    pub auto_approval_rules: Vec<AutoApprovalRule>,
    /// Compliance thresholds and flags.
    pub compliance: ComplianceConfig,
}

impl WorkflowDefinition {
    /// Checks the definition is structurally sound.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Validation` when the definition has no
    /// steps, step orders are not strictly ascending and unique, a step
    /// requires zero approvals, a non-system step has no assignees, a
    /// condition operand does not fit its operator, or an escalation rule
    /// has a non-positive delay or a zero level cap.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.steps.is_empty() {
            return Err(WorkflowError::Validation(format!(
                "definition {} has no steps",
                self.name
            )));
        }

        let mut previous_order: Option<u32> = None;
        for step in &self.steps {
            if let Some(prev) = previous_order {
                if step.order <= prev {
                    return Err(WorkflowError::Validation(format!(
                        "step {} breaks the ascending order sequence",
                        step.name
                    )));
                }
            }
            previous_order = Some(step.order);

            if step.required_approvals == 0 && step.step_type != StepType::System {
                return Err(WorkflowError::Validation(format!(
                    "step {} requires zero approvals",
                    step.name
                )));
            }
            if step.assignees.is_empty() && step.step_type != StepType::System {
                return Err(WorkflowError::Validation(format!(
                    "step {} has no assignees",
                    step.name
                )));
            }
            for condition in &step.conditions {
                condition.validate()?;
            }
        }

        for rule in &self.auto_approval_rules {
            for condition in &rule.conditions {
                condition.validate()?;
            }
        }

        for rule in &self.escalation_rules {
            if rule.delay_hours <= 0 {
                return Err(WorkflowError::Validation(format!(
                    "escalation rule {} has a non-positive delay",
                    rule.id
                )));
            }
            if rule.max_escalation_level == 0 {
                return Err(WorkflowError::Validation(format!(
                    "escalation rule {} has a zero level cap",
                    rule.id
                )));
            }
        }

        Ok(())
    }

    /// Returns the step at the given order, if any.
    #[must_use]
    pub fn step_at(&self, order: u32) -> Option<&ApprovalStep> {
        self.steps.iter().find(|s| s.order == order)
    }

    /// Returns the first step that applies under the context.
    ///
    /// System-type steps are bookkeeping gates and pass without action.
    #[must_use]
    pub fn first_step(&self, ctx: &EvaluationContext) -> Option<&ApprovalStep> {
        self.steps
            .iter()
            .find(|s| s.step_type != StepType::System && s.applies_to(ctx))
    }

    /// Returns the next applicable step after the given order.
    #[must_use]
    pub fn next_step_after(&self, order: u32, ctx: &EvaluationContext) -> Option<&ApprovalStep> {
        self.steps
            .iter()
            .find(|s| s.order > order && s.step_type != StepType::System && s.applies_to(ctx))
    }

    /// Returns the escalation rule for a trigger, if configured.
    #[must_use]
    pub fn escalation_rule(&self, trigger: EscalationTrigger) -> Option<&EscalationRule> {
        self.escalation_rules.iter().find(|r| r.trigger == trigger)
    }

    /// Returns the first active auto-approval rule satisfied by the context.
    #[must_use]
    pub fn matching_auto_approval(
        &self,
        workflow_type: WorkflowType,
        ctx: &EvaluationContext,
    ) -> Option<&AutoApprovalRule> {
        self.auto_approval_rules
            .iter()
            .find(|r| r.matches(workflow_type, ctx))
    }

    /// Built-in fallback used when no definition is registered for a type.
    ///
    /// One role-based manager step with a 24-hour timeout and a single
    /// timeout escalation rule. Resolution through this path is degraded
    /// operation and must be logged by the caller.
    #[must_use]
    pub fn fallback(workflow_type: WorkflowType) -> Self {
        Self {
            id: DefinitionId::new(),
            name: format!("fallback:{workflow_type}"),
            workflow_type,
            steps: vec![ApprovalStep {
                id: StepId::new(),
                name: "Manager review".to_string(),
                order: 1,
                step_type: StepType::RoleBased,
                required_approvals: 1,
                assignees: vec![StepAssignee::Role {
                    role: ApproverRole::Manager,
                }],
                conditions: vec![],
                optional: false,
                reject_policy: RejectPolicy::Terminate,
                timeout_hours: Some(24),
                escalation_actions: vec![],
            }],
            escalation_rules: vec![EscalationRule {
                id: RuleId::new(),
                trigger: EscalationTrigger::Timeout,
                delay_hours: 24,
                actions: vec![
                    EscalationAction::Notify,
                    EscalationAction::EscalateToRole {
                        role: ApproverRole::Director,
                    },
                ],
                max_escalation_level: 1,
            }],
            auto_approval_rules: vec![],
            compliance: ComplianceConfig::default(),
        }
    }
}

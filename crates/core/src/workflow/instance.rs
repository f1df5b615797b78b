//! The live workflow instance aggregate.
//!
//! An instance binds an immutable definition snapshot to one source
//! document and advances through the definition's steps by appending
//! history entries. All state transitions flow through [`WorkflowInstance::apply`],
//! so replaying the history through the same rules reproduces the
//! instance state exactly.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fuelgate_shared::types::{DocumentId, HistoryEntryId, InstanceId, Money, StepId, UserId};

use crate::risk::RiskAssessment;
use crate::workflow::condition::EvaluationContext;
use crate::workflow::definition::{
    ApprovalStep, ComplianceConfig, RejectPolicy, StepAssignee, WorkflowDefinition,
};
use crate::workflow::types::{
    ApprovalHistoryEntry, Approver, HistoryAction, HumanAction, InstanceStatus, Priority,
    SystemAction, WorkflowType,
};

/// Reference to the business document a workflow authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// The document identifier in its owning subsystem.
    pub id: DocumentId,
    /// The transaction domain of the document.
    pub kind: WorkflowType,
}

/// Risk-relevant snapshot of the source transaction, frozen at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    /// Transaction amount.
    pub amount: Money,
    /// Supplier identifier, when the document has one.
    pub supplier_id: Option<String>,
    /// Customer identifier, when the document has one.
    pub customer_id: Option<String>,
    /// Product category of the underlying goods.
    pub product_category: Option<String>,
    /// Remaining credit limit of the counterparty.
    pub credit_limit: Option<Decimal>,
    /// Counterparty rating.
    pub customer_rating: Option<Decimal>,
    /// Regulatory compliance score.
    pub compliance_score: Option<Decimal>,
    /// Regulatory identifiers (permits, licenses) attached to the document.
    pub regulatory_ids: Vec<String>,
    /// Number of counterparties covered; above 1 only for bulk runs.
    pub counterparty_count: u32,
    /// Risk assessment computed at submission.
    pub risk: RiskAssessment,
    /// Domain-specific compliance metadata the engine carries but does not
    /// interpret.
    pub extra: serde_json::Value,
}

impl WorkflowMetadata {
    /// Builds the typed context conditions evaluate against.
    #[must_use]
    pub fn evaluation_context(&self) -> EvaluationContext {
        EvaluationContext {
            amount: self.amount.amount,
            credit_limit: self.credit_limit,
            customer_rating: self.customer_rating,
            product_category: self.product_category.clone(),
            compliance_score: self.compliance_score,
        }
    }
}

/// Compliance posture of an instance, frozen at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// No compliance concern.
    Cleared,
    /// Compliance score below the configured minimum; review recommended.
    Review,
    /// Mandatory regulatory identifiers missing.
    Failed,
}

impl ComplianceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cleared => "cleared",
            Self::Review => "review",
            Self::Failed => "failed",
        }
    }

    /// Derives the compliance posture from definition config and metadata.
    #[must_use]
    pub fn evaluate(config: &ComplianceConfig, metadata: &WorkflowMetadata) -> Self {
        if config.require_regulatory_ids && metadata.regulatory_ids.is_empty() {
            return Self::Failed;
        }
        match (config.minimum_compliance_score, metadata.compliance_score) {
            (Some(minimum), Some(score)) if score < minimum => Self::Review,
            (Some(_), None) => Self::Review,
            _ => Self::Cleared,
        }
    }
}

/// Outcome of replaying an instance's history from an empty state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// The reconstructed status.
    pub status: InstanceStatus,
    /// The reconstructed current step order.
    pub current_step_order: u32,
    /// The reconstructed escalation level.
    pub escalation_level: u32,
}

/// One live, auditable execution of a workflow definition.
///
/// The instance embeds the definition snapshot it was created from;
/// registry edits after creation never affect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Unique identifier for the instance.
    pub id: InstanceId,
    /// The definition snapshot this instance executes.
    pub definition: WorkflowDefinition,
    /// The business document being authorized.
    pub source: SourceDocument,
    /// The user who submitted the transaction.
    pub requester: UserId,
    /// Order of the step currently awaiting decisions; 0 when no step applies.
    pub current_step_order: u32,
    /// Current lifecycle status.
    pub status: InstanceStatus,
    /// Processing priority.
    pub priority: Priority,
    /// Append-only audit history, strictly ordered by action time.
    pub history: Vec<ApprovalHistoryEntry>,
    /// Attachment references supplied at submission.
    pub attachments: Vec<String>,
    /// Transaction snapshot used for condition evaluation.
    pub metadata: WorkflowMetadata,
    /// Compliance posture derived at submission.
    pub compliance_status: ComplianceStatus,
    /// Absolute deadline for a decision on the current step.
    pub sla_deadline: DateTime<Utc>,
    /// Number of escalations performed so far; never decreases.
    pub escalation_level: u32,
    /// Who may act on the current step; rewritten by delegation/reassignment.
    pub current_assignees: Vec<StepAssignee>,
    /// SLA fallback for steps without their own timeout, in hours.
    pub default_timeout_hours: i64,
    /// Optimistic concurrency version, bumped on every persisted write.
    pub version: u64,
    /// When the instance was created.
    pub created_at: DateTime<Utc>,
    /// When the instance last changed.
    pub updated_at: DateTime<Utc>,
    /// When a terminal decision was reached.
    pub decided_at: Option<DateTime<Utc>>,
    /// Who made the completing decision, for human terminals.
    pub decided_by: Option<UserId>,
    /// Comments supplied with the completing decision.
    pub decision_comments: Option<String>,
}

impl WorkflowInstance {
    /// Creates a new instance positioned at the first applicable step.
    ///
    /// Creation appends nothing to the history; the submission
    /// short-circuit and every later transition go through [`Self::apply`].
    /// When no step applies under the metadata (all conditioned away),
    /// `current_step_order` stays 0 and the caller is expected to
    /// system-approve the vacuous instance.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        definition: WorkflowDefinition,
        source: SourceDocument,
        requester: UserId,
        priority: Priority,
        metadata: WorkflowMetadata,
        attachments: Vec<String>,
        default_timeout_hours: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let ctx = metadata.evaluation_context();
        let first = definition
            .first_step(&ctx)
            .map(|s| (s.order, s.assignees.clone(), s.timeout_hours));
        let compliance_status = ComplianceStatus::evaluate(&definition.compliance, &metadata);

        let mut instance = Self {
            id: InstanceId::new(),
            definition,
            source,
            requester,
            current_step_order: 0,
            status: InstanceStatus::Pending,
            priority,
            history: Vec::new(),
            attachments,
            metadata,
            compliance_status,
            sla_deadline: now + Duration::hours(default_timeout_hours),
            escalation_level: 0,
            current_assignees: Vec::new(),
            default_timeout_hours,
            version: 0,
            created_at: now,
            updated_at: now,
            decided_at: None,
            decided_by: None,
            decision_comments: None,
        };

        if let Some((order, assignees, timeout)) = first {
            instance.current_step_order = order;
            instance.current_assignees = assignees;
            instance.sla_deadline =
                now + Duration::hours(timeout.unwrap_or(default_timeout_hours));
        }

        instance
    }

    /// The workflow type this instance executes.
    #[must_use]
    pub fn workflow_type(&self) -> WorkflowType {
        self.definition.workflow_type
    }

    /// The step currently awaiting decisions, if one applies.
    #[must_use]
    pub fn current_step(&self) -> Option<&ApprovalStep> {
        self.definition.step_at(self.current_step_order)
    }

    /// Returns true when a step is awaiting decisions.
    #[must_use]
    pub fn has_pending_step(&self) -> bool {
        self.current_step_order != 0
    }

    /// Returns true if the presented approver may act on the current step.
    #[must_use]
    pub fn is_assigned(&self, approver: &Approver) -> bool {
        self.current_assignees.iter().any(|a| a.matches(approver))
    }

    /// Number of distinct approvers who approved the given step order.
    #[must_use]
    pub fn distinct_approvals_at(&self, order: u32) -> usize {
        let mut approvers: Vec<UserId> = self
            .history
            .iter()
            .filter(|e| e.step_order == order)
            .filter_map(|e| e.action.approved_by())
            .collect();
        approvers.sort_unstable();
        approvers.dedup();
        approvers.len()
    }

    /// Returns true if the user already approved the current step.
    #[must_use]
    pub fn has_approved_current_step(&self, user: UserId) -> bool {
        self.history
            .iter()
            .filter(|e| e.step_order == self.current_step_order)
            .filter_map(|e| e.action.approved_by())
            .any(|u| u == user)
    }

    /// Builds a history entry for a human action against the current step.
    #[must_use]
    pub fn human_entry(
        &self,
        approver: UserId,
        action: HumanAction,
        comments: Option<String>,
        attachments: Vec<String>,
        at: DateTime<Utc>,
    ) -> ApprovalHistoryEntry {
        let (step_id, step_order, step_name) = self.entry_step_context();
        ApprovalHistoryEntry {
            id: HistoryEntryId::new(),
            step_id,
            step_order,
            step_name,
            action: HistoryAction::Human { approver, action },
            at,
            comments,
            attachments,
        }
    }

    /// Builds a history entry for an engine action against the current step.
    #[must_use]
    pub fn system_entry(
        &self,
        action: SystemAction,
        comments: Option<String>,
        at: DateTime<Utc>,
    ) -> ApprovalHistoryEntry {
        let (step_id, step_order, step_name) = self.entry_step_context();
        ApprovalHistoryEntry {
            id: HistoryEntryId::new(),
            step_id,
            step_order,
            step_name,
            action: HistoryAction::System { action },
            at,
            comments,
            attachments: Vec::new(),
        }
    }

    fn entry_step_context(&self) -> (StepId, u32, String) {
        self.current_step()
            .or_else(|| self.definition.steps.first())
            .map_or_else(
                || (StepId::new(), 0, "(none)".to_string()),
                |s| (s.id, s.order, s.name.clone()),
            )
    }

    /// Appends a history entry and transitions the instance state.
    ///
    /// This is the single transition function: live actions and history
    /// replay both go through it, which is what makes the audit trail
    /// reconstructable. Callers validate preconditions (status,
    /// authorization, step match) before building the entry.
    pub fn apply(&mut self, entry: ApprovalHistoryEntry) {
        let at = entry.at;
        let action = entry.action.clone();
        let comments = entry.comments.clone();
        self.history.push(entry);
        self.updated_at = at;

        match action {
            HistoryAction::Human { approver, action } => match action {
                HumanAction::Approved => {
                    let required = self
                        .current_step()
                        .map_or(1, |s| s.required_approvals as usize);
                    if self.distinct_approvals_at(self.current_step_order) >= required {
                        self.advance(at);
                        if self.status == InstanceStatus::Approved {
                            self.decided_by = Some(approver);
                            self.decision_comments = comments;
                        }
                    } else {
                        self.status = InstanceStatus::InProgress;
                    }
                }
                HumanAction::Rejected => {
                    let skip = self.current_step().is_some_and(|s| {
                        s.optional && s.reject_policy == RejectPolicy::SkipAndAdvance
                    });
                    if skip {
                        self.advance(at);
                    } else {
                        self.status = InstanceStatus::Rejected;
                        self.decided_at = Some(at);
                        self.decided_by = Some(approver);
                        self.decision_comments = comments;
                    }
                }
                HumanAction::Delegated { from, to } => self.delegate_assignee(from, to),
                HumanAction::InfoRequested => {
                    let hours = self
                        .current_step()
                        .and_then(|s| s.timeout_hours)
                        .unwrap_or(self.default_timeout_hours);
                    self.sla_deadline += Duration::hours(hours);
                }
                HumanAction::Cancelled => {
                    self.status = InstanceStatus::Cancelled;
                    self.decided_at = Some(at);
                    self.decided_by = Some(approver);
                    self.decision_comments = comments;
                }
            },
            HistoryAction::System { action } => match action {
                SystemAction::AutoApproved => {
                    self.status = InstanceStatus::Approved;
                    self.decided_at = Some(at);
                }
                SystemAction::AutoRejected => {
                    self.status = InstanceStatus::Rejected;
                    self.decided_at = Some(at);
                }
                SystemAction::Escalated { .. } => {
                    self.escalation_level += 1;
                    self.status = InstanceStatus::Escalated;
                }
                SystemAction::TimedOut => {
                    self.status = InstanceStatus::TimedOut;
                }
                SystemAction::Reassigned { to } => {
                    self.current_assignees = vec![to];
                }
            },
        }
    }

    /// Moves to the next applicable step or approves when none remain.
    fn advance(&mut self, at: DateTime<Utc>) {
        let ctx = self.metadata.evaluation_context();
        let next = self
            .definition
            .next_step_after(self.current_step_order, &ctx)
            .map(|s| (s.order, s.assignees.clone(), s.timeout_hours));

        match next {
            Some((order, assignees, timeout)) => {
                self.current_step_order = order;
                self.current_assignees = assignees;
                self.status = InstanceStatus::InProgress;
                self.sla_deadline =
                    at + Duration::hours(timeout.unwrap_or(self.default_timeout_hours));
            }
            None => {
                self.status = InstanceStatus::Approved;
                self.decided_at = Some(at);
            }
        }
    }

    /// Rewrites the pending assignment from one user to another.
    ///
    /// When the delegating approver matched through a role rather than a
    /// direct assignment, the delegate is added alongside the role.
    fn delegate_assignee(&mut self, from: UserId, to: UserId) {
        let mut replaced = false;
        for assignee in &mut self.current_assignees {
            if assignee.is_user(from) {
                *assignee = StepAssignee::User { id: to };
                replaced = true;
            }
        }
        if !replaced {
            self.current_assignees.push(StepAssignee::User { id: to });
        }
    }
}

/// Replays an instance's history from an empty state.
///
/// Builds a fresh instance from the same definition snapshot and metadata,
/// applies every history entry through the same transition rules, and
/// returns the reconstructed state.
#[must_use]
pub fn replay(instance: &WorkflowInstance) -> ReplayOutcome {
    let mut fresh = WorkflowInstance::create(
        instance.definition.clone(),
        instance.source,
        instance.requester,
        instance.priority,
        instance.metadata.clone(),
        instance.attachments.clone(),
        instance.default_timeout_hours,
        instance.created_at,
    );
    for entry in &instance.history {
        fresh.apply(entry.clone());
    }
    ReplayOutcome {
        status: fresh.status,
        current_step_order: fresh.current_step_order,
        escalation_level: fresh.escalation_level,
    }
}

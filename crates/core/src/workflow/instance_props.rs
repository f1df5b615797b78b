//! Property-based tests for the instance state machine.
//!
//! The central property: replaying the append-only history through the
//! same transition rules reconstructs the live instance state exactly.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use fuelgate_shared::types::{Currency, DefinitionId, DocumentId, Money, RuleId, StepId, UserId};

use crate::risk::{RiskAssessment, RiskLevel};
use crate::workflow::definition::{
    ApprovalStep, ComplianceConfig, EscalationRule, EscalationTrigger, RejectPolicy, StepAssignee,
    StepType, WorkflowDefinition,
};
use crate::workflow::instance::{SourceDocument, WorkflowInstance, WorkflowMetadata, replay};
use crate::workflow::types::{
    ApproverRole, HistoryAction, HumanAction, InstanceStatus, Priority, SystemAction, WorkflowType,
};

/// Abstract action the generator drives the instance with.
#[derive(Debug, Clone)]
enum DrivenAction {
    Approve { user: u8 },
    Reject { user: u8 },
    Delegate { user: u8, to: u8 },
    RequestInfo { user: u8 },
    Escalate,
    MarkTimedOut,
}

fn arb_action() -> impl Strategy<Value = DrivenAction> {
    prop_oneof![
        4 => (0u8..6).prop_map(|user| DrivenAction::Approve { user }),
        1 => (0u8..6).prop_map(|user| DrivenAction::Reject { user }),
        1 => (0u8..6, 0u8..6).prop_map(|(user, to)| DrivenAction::Delegate { user, to }),
        1 => (0u8..6).prop_map(|user| DrivenAction::RequestInfo { user }),
        1 => Just(DrivenAction::Escalate),
        1 => Just(DrivenAction::MarkTimedOut),
    ]
}

/// Deterministic user pool so generated sequences are reproducible.
fn user(index: u8) -> UserId {
    UserId::from_uuid(Uuid::from_u128(0x1000 + u128::from(index)))
}

fn step(order: u32, required: u32, optional_skip: bool) -> ApprovalStep {
    ApprovalStep {
        id: StepId::new(),
        name: format!("Step {order}"),
        order,
        step_type: StepType::RoleBased,
        required_approvals: required,
        assignees: vec![StepAssignee::Role {
            role: ApproverRole::Manager,
        }],
        conditions: vec![],
        optional: optional_skip,
        reject_policy: if optional_skip {
            RejectPolicy::SkipAndAdvance
        } else {
            RejectPolicy::Terminate
        },
        timeout_hours: Some(24),
        escalation_actions: vec![],
    }
}

fn arb_definition() -> impl Strategy<Value = WorkflowDefinition> {
    proptest::collection::vec((1u32..=2, proptest::bool::ANY), 1..=3).prop_map(|shapes| {
        let steps = shapes
            .into_iter()
            .enumerate()
            .map(|(i, (required, optional_skip))| {
                let order = u32::try_from(i).unwrap_or(u32::MAX).saturating_add(1);
                step(order, required, optional_skip)
            })
            .collect();
        WorkflowDefinition {
            id: DefinitionId::new(),
            name: "Generated".to_string(),
            workflow_type: WorkflowType::DeliveryApproval,
            steps,
            escalation_rules: vec![EscalationRule {
                id: RuleId::new(),
                trigger: EscalationTrigger::Timeout,
                delay_hours: 4,
                actions: vec![],
                max_escalation_level: 3,
            }],
            auto_approval_rules: vec![],
            compliance: ComplianceConfig::default(),
        }
    })
}

fn metadata() -> WorkflowMetadata {
    WorkflowMetadata {
        amount: Money::new(Decimal::new(5000, 0), Currency::Usd),
        supplier_id: None,
        customer_id: None,
        product_category: None,
        credit_limit: None,
        customer_rating: None,
        compliance_score: None,
        regulatory_ids: vec!["PERMIT-1".to_string()],
        counterparty_count: 1,
        risk: RiskAssessment {
            score: 0,
            level: RiskLevel::Low,
            factors: vec![],
            mitigations: vec![],
        },
        extra: serde_json::Value::Null,
    }
}

/// Drives an instance through a generated action sequence, skipping
/// actions the engine would reject (terminal status, duplicate approvals).
fn drive(definition: WorkflowDefinition, actions: &[DrivenAction]) -> WorkflowInstance {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("valid timestamp");
    let mut instance = WorkflowInstance::create(
        definition,
        SourceDocument {
            id: DocumentId::new(),
            kind: WorkflowType::DeliveryApproval,
        },
        user(0),
        Priority::Normal,
        metadata(),
        vec![],
        48,
        start,
    );

    for (i, action) in actions.iter().enumerate() {
        if !instance.status.accepts_actions() || !instance.has_pending_step() {
            break;
        }
        let at = start + Duration::minutes(i as i64 + 1);
        let entry = match action {
            DrivenAction::Approve { user: u } => {
                if instance.has_approved_current_step(user(*u)) {
                    continue;
                }
                instance.human_entry(user(*u), HumanAction::Approved, None, vec![], at)
            }
            DrivenAction::Reject { user: u } => instance.human_entry(
                user(*u),
                HumanAction::Rejected,
                Some("rejected".to_string()),
                vec![],
                at,
            ),
            DrivenAction::Delegate { user: u, to } => instance.human_entry(
                user(*u),
                HumanAction::Delegated {
                    from: user(*u),
                    to: user(*to),
                },
                None,
                vec![],
                at,
            ),
            DrivenAction::RequestInfo { user: u } => {
                instance.human_entry(user(*u), HumanAction::InfoRequested, None, vec![], at)
            }
            DrivenAction::Escalate => instance.system_entry(
                SystemAction::Escalated {
                    level: instance.escalation_level + 1,
                },
                None,
                at,
            ),
            DrivenAction::MarkTimedOut => {
                instance.system_entry(SystemAction::TimedOut, None, at)
            }
        };
        instance.apply(entry);
    }

    instance
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Replaying the history reconstructs status, step, and level exactly.
    #[test]
    fn prop_replay_reconstructs_state(
        definition in arb_definition(),
        actions in proptest::collection::vec(arb_action(), 0..20),
    ) {
        let instance = drive(definition, &actions);
        let outcome = replay(&instance);
        prop_assert_eq!(outcome.status, instance.status);
        prop_assert_eq!(outcome.current_step_order, instance.current_step_order);
        prop_assert_eq!(outcome.escalation_level, instance.escalation_level);
    }

    /// The escalation level always equals the count of escalation entries.
    #[test]
    fn prop_escalation_level_matches_history(
        definition in arb_definition(),
        actions in proptest::collection::vec(arb_action(), 0..20),
    ) {
        let instance = drive(definition, &actions);
        let escalations = instance
            .history
            .iter()
            .filter(|e| matches!(
                e.action,
                HistoryAction::System { action: SystemAction::Escalated { .. } }
            ))
            .count();
        prop_assert_eq!(instance.escalation_level as usize, escalations);
    }

    /// History timestamps never decrease.
    #[test]
    fn prop_history_is_time_ordered(
        definition in arb_definition(),
        actions in proptest::collection::vec(arb_action(), 0..20),
    ) {
        let instance = drive(definition, &actions);
        for window in instance.history.windows(2) {
            prop_assert!(window[0].at <= window[1].at);
        }
    }

    /// A step never advances before its required approval count is met,
    /// and a rejection on a terminate-policy step is immediately terminal.
    #[test]
    fn prop_step_gate_holds(
        definition in arb_definition(),
        actions in proptest::collection::vec(arb_action(), 0..20),
    ) {
        let instance = drive(definition, &actions);

        if instance.status == InstanceStatus::Approved {
            // Every non-optional step the instance passed collected its
            // required distinct approvals or was skipped by policy.
            for step in &instance.definition.steps {
                let approvals = instance.distinct_approvals_at(step.order);
                let rejected_past = instance.history.iter().any(|e| {
                    e.step_order == step.order
                        && matches!(
                            e.action,
                            HistoryAction::Human { action: HumanAction::Rejected, .. }
                        )
                });
                if !rejected_past {
                    prop_assert!(
                        approvals == 0 || approvals >= step.required_approvals as usize
                    );
                }
            }
        }
    }
}

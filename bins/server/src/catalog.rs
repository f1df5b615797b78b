//! Standard workflow definition catalog.
//!
//! Registered at startup so every workflow type resolves without hitting
//! the degraded fallback path. Deployments replace or extend these
//! through the registry.

use rust_decimal::Decimal;

use fuelgate_core::workflow::definition::{
    ApprovalStep, AutoApprovalRule, ComplianceConfig, EscalationAction, EscalationRule,
    EscalationTrigger, RejectPolicy, StepAssignee, StepType, WorkflowDefinition,
};
use fuelgate_core::workflow::{
    ApprovalCondition, ApproverRole, ConditionKey, ConditionValue, Operator, WorkflowError,
    WorkflowType,
};
use fuelgate_engine::{DefinitionSelector, InMemoryDefinitionRegistry};
use fuelgate_shared::types::{DefinitionId, RuleId, StepId};

/// Registers the standard definitions; returns how many were registered.
pub fn register_standard_definitions(
    registry: &InMemoryDefinitionRegistry,
) -> Result<usize, WorkflowError> {
    let definitions = [
        delivery_approval(),
        supplier_invoice(),
        customer_invoice(),
        bulk_invoice(),
        subsidy_claim(),
    ];
    let count = definitions.len();
    for definition in definitions {
        registry.register(definition, DefinitionSelector::default())?;
    }
    Ok(count)
}

fn role_step(
    name: &str,
    order: u32,
    role: ApproverRole,
    required: u32,
    timeout_hours: i64,
) -> ApprovalStep {
    ApprovalStep {
        id: StepId::new(),
        name: name.to_string(),
        order,
        step_type: StepType::RoleBased,
        required_approvals: required,
        assignees: vec![StepAssignee::Role { role }],
        conditions: vec![],
        optional: false,
        reject_policy: RejectPolicy::Terminate,
        timeout_hours: Some(timeout_hours),
        escalation_actions: vec![],
    }
}

fn timeout_rule(delay_hours: i64, max_level: u32) -> EscalationRule {
    EscalationRule {
        id: RuleId::new(),
        trigger: EscalationTrigger::Timeout,
        delay_hours,
        actions: vec![
            EscalationAction::Notify,
            EscalationAction::EscalateToRole {
                role: ApproverRole::Director,
            },
        ],
        max_escalation_level: max_level,
    }
}

fn amount_above(threshold: i64) -> ApprovalCondition {
    ApprovalCondition {
        key: ConditionKey::Amount,
        operator: Operator::Gt,
        value: ConditionValue::Number(Decimal::new(threshold, 0)),
        description: Some(format!("Amount above {threshold}")),
    }
}

fn delivery_approval() -> WorkflowDefinition {
    // Second gate only engages for high-value deliveries.
    let mut manager_review = role_step("Manager review", 2, ApproverRole::Manager, 1, 24);
    manager_review.conditions = vec![amount_above(50_000)];

    WorkflowDefinition {
        id: DefinitionId::new(),
        name: "Standard delivery approval".to_string(),
        workflow_type: WorkflowType::DeliveryApproval,
        steps: vec![
            role_step("Operations review", 1, ApproverRole::Operations, 1, 24),
            manager_review,
        ],
        escalation_rules: vec![timeout_rule(24, 2)],
        auto_approval_rules: vec![AutoApprovalRule {
            id: RuleId::new(),
            name: "Routine small deliveries".to_string(),
            conditions: vec![
                ApprovalCondition {
                    key: ConditionKey::Amount,
                    operator: Operator::Lt,
                    value: ConditionValue::Number(Decimal::new(1_000, 0)),
                    description: Some("Amount below 1000".to_string()),
                },
                ApprovalCondition {
                    key: ConditionKey::ComplianceScore,
                    operator: Operator::Gte,
                    value: ConditionValue::Number(Decimal::new(80, 0)),
                    description: Some("Counterparty in good standing".to_string()),
                },
            ],
            workflow_types: vec![WorkflowType::DeliveryApproval],
            active: true,
        }],
        compliance: ComplianceConfig {
            minimum_compliance_score: Some(Decimal::new(70, 0)),
            require_regulatory_ids: true,
        },
    }
}

fn supplier_invoice() -> WorkflowDefinition {
    let mut director_signoff = role_step("Director sign-off", 2, ApproverRole::Director, 1, 48);
    director_signoff.conditions = vec![amount_above(100_000)];

    WorkflowDefinition {
        id: DefinitionId::new(),
        name: "Supplier invoice approval".to_string(),
        workflow_type: WorkflowType::SupplierInvoice,
        steps: vec![
            role_step("Finance review", 1, ApproverRole::FinanceOfficer, 1, 48),
            director_signoff,
        ],
        escalation_rules: vec![timeout_rule(24, 2)],
        auto_approval_rules: vec![],
        compliance: ComplianceConfig::default(),
    }
}

fn customer_invoice() -> WorkflowDefinition {
    WorkflowDefinition {
        id: DefinitionId::new(),
        name: "Customer invoice approval".to_string(),
        workflow_type: WorkflowType::CustomerInvoice,
        steps: vec![role_step(
            "Finance review",
            1,
            ApproverRole::FinanceOfficer,
            1,
            48,
        )],
        escalation_rules: vec![timeout_rule(24, 2)],
        auto_approval_rules: vec![AutoApprovalRule {
            id: RuleId::new(),
            name: "Low-value invoices".to_string(),
            conditions: vec![ApprovalCondition {
                key: ConditionKey::Amount,
                operator: Operator::Lt,
                value: ConditionValue::Number(Decimal::new(500, 0)),
                description: None,
            }],
            workflow_types: vec![WorkflowType::CustomerInvoice],
            active: true,
        }],
        compliance: ComplianceConfig::default(),
    }
}

fn bulk_invoice() -> WorkflowDefinition {
    WorkflowDefinition {
        id: DefinitionId::new(),
        name: "Bulk invoice run approval".to_string(),
        workflow_type: WorkflowType::BulkInvoice,
        steps: vec![
            role_step("Finance review", 1, ApproverRole::FinanceOfficer, 2, 24),
            role_step("Director sign-off", 2, ApproverRole::Director, 1, 24),
        ],
        escalation_rules: vec![timeout_rule(12, 2)],
        auto_approval_rules: vec![],
        compliance: ComplianceConfig::default(),
    }
}

fn subsidy_claim() -> WorkflowDefinition {
    WorkflowDefinition {
        id: DefinitionId::new(),
        name: "Subsidy claim approval".to_string(),
        workflow_type: WorkflowType::SubsidyClaim,
        steps: vec![
            role_step(
                "Compliance review",
                1,
                ApproverRole::ComplianceOfficer,
                1,
                48,
            ),
            role_step("Director sign-off", 2, ApproverRole::Director, 1, 48),
        ],
        // One escalation, then the cap forces the default auto-reject.
        escalation_rules: vec![EscalationRule {
            id: RuleId::new(),
            trigger: EscalationTrigger::Timeout,
            delay_hours: 24,
            actions: vec![EscalationAction::Notify],
            max_escalation_level: 1,
        }],
        auto_approval_rules: vec![],
        compliance: ComplianceConfig {
            minimum_compliance_score: Some(Decimal::new(80, 0)),
            require_regulatory_ids: true,
        },
    }
}

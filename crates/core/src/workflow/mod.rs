//! Approval workflow management for Fuelgate.
//!
//! This module implements the workflow definition model, condition
//! evaluation, and the instance state machine that drives fuel-trade
//! transactions through their approval lifecycle.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (InstanceStatus, history actions)
//! - `error` - Workflow-specific error types
//! - `condition` - Typed approval-condition evaluation
//! - `definition` - Workflow definition templates (steps, rules)
//! - `instance` - The live workflow instance aggregate and its transitions

pub mod condition;
pub mod definition;
pub mod error;
pub mod instance;
pub mod types;

#[cfg(test)]
mod condition_props;
#[cfg(test)]
mod instance_props;

pub use condition::{ApprovalCondition, ConditionKey, ConditionValue, EvaluationContext, Operator};
pub use definition::{
    ApprovalStep, AutoApprovalRule, ComplianceConfig, EscalationAction, EscalationRule,
    EscalationTrigger, RejectPolicy, StepAssignee, StepType, WorkflowDefinition,
};
pub use error::WorkflowError;
pub use instance::{
    ComplianceStatus, ReplayOutcome, SourceDocument, WorkflowInstance, WorkflowMetadata, replay,
};
pub use types::{
    ApprovalDecision, ApprovalHistoryEntry, Approver, ApproverRole, HistoryAction, HumanAction,
    InstanceStatus, Priority, SystemAction, WorkflowType,
};

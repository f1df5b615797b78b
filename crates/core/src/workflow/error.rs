//! Workflow error types for the approval lifecycle.
//!
//! This module defines all error types that can occur during
//! workflow operations such as submission, approver actions, and sweeps.

use thiserror::Error;

use fuelgate_shared::types::{DocumentId, InstanceId, StepId, UserId};

use crate::workflow::types::{InstanceStatus, WorkflowType};

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Workflow instance not found.
    #[error("Workflow instance {0} not found")]
    InstanceNotFound(InstanceId),

    /// Source business document not found.
    #[error("Source document {0} not found")]
    DocumentNotFound(DocumentId),

    /// No workflow definition registered for the workflow type.
    #[error("No workflow definition registered for type {workflow_type}")]
    DefinitionNotFound {
        /// The workflow type that failed to resolve.
        workflow_type: WorkflowType,
    },

    /// An active instance already exists for the source document.
    #[error("Document {document} already has active workflow instance {existing}")]
    DuplicateActiveInstance {
        /// The source document.
        document: DocumentId,
        /// The already-active instance.
        existing: InstanceId,
    },

    /// The acting approver is not assigned to the current step.
    #[error("User {approver} is not authorized to act on step {step}")]
    NotAuthorized {
        /// The user who attempted the action.
        approver: UserId,
        /// The step the action targeted.
        step: StepId,
    },

    /// The approver already approved the current step.
    #[error("User {approver} already approved step {step}")]
    DuplicateApproval {
        /// The user who attempted a second approval.
        approver: UserId,
        /// The step already approved.
        step: StepId,
    },

    /// Action attempted from a status that forbids it.
    #[error("Cannot {operation} an instance in status {status}")]
    InvalidState {
        /// The instance status at the time of the attempt.
        status: InstanceStatus,
        /// The attempted operation.
        operation: &'static str,
    },

    /// Action targeted a step other than the current one.
    #[error("Action targets step {actual} but the current step is {expected}")]
    StepMismatch {
        /// The instance's current step.
        expected: StepId,
        /// The step the action targeted.
        actual: StepId,
    },

    /// Rejection comments are required but not provided.
    #[error("Rejection comments are required")]
    RejectionReasonRequired,

    /// Cancellation reason is required but not provided.
    #[error("Cancellation reason is required")]
    CancelReasonRequired,

    /// Malformed action payload or definition.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A collaborator the engine depends on was unreachable.
    #[error("Dependency failure: {0}")]
    Dependency(String),

    /// Instance storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidState { .. }
            | Self::StepMismatch { .. }
            | Self::RejectionReasonRequired
            | Self::CancelReasonRequired
            | Self::Validation(_) => 400,

            Self::NotAuthorized { .. } => 403,

            Self::InstanceNotFound(_)
            | Self::DocumentNotFound(_)
            | Self::DefinitionNotFound { .. } => 404,

            Self::DuplicateActiveInstance { .. } | Self::DuplicateApproval { .. } => 409,

            Self::Dependency(_) | Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InstanceNotFound(_) => "INSTANCE_NOT_FOUND",
            Self::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::DefinitionNotFound { .. } => "DEFINITION_NOT_FOUND",
            Self::DuplicateActiveInstance { .. } => "DUPLICATE_ACTIVE_INSTANCE",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::DuplicateApproval { .. } => "DUPLICATE_APPROVAL",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::StepMismatch { .. } => "STEP_MISMATCH",
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
            Self::CancelReasonRequired => "CANCEL_REASON_REQUIRED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Dependency(_) => "DEPENDENCY_FAILURE",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

//! Workflow approval routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::AppState;
use fuelgate_core::workflow::{
    ApprovalDecision, Approver, ApproverRole, Priority, SourceDocument, WorkflowError,
    WorkflowInstance, WorkflowType,
};
use fuelgate_engine::{BulkActionReport, SubmitRequest};
use fuelgate_shared::types::{DocumentId, InstanceId, PageResponse, StepId, UserId};

/// Creates the workflow routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/workflows", post(submit_workflow))
        .route("/workflows/pending", get(list_pending))
        .route("/workflows/bulk-actions", post(bulk_action))
        .route("/workflows/{instance_id}", get(get_workflow))
        .route("/workflows/{instance_id}/actions", post(act_on_workflow))
        .route("/workflows/{instance_id}/cancel", post(cancel_workflow))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a transaction for approval.
#[derive(Debug, Deserialize)]
pub struct SubmitWorkflowRequest {
    /// The source document to authorize.
    pub document_id: Uuid,
    /// The transaction domain of the document.
    #[serde(rename = "type")]
    pub workflow_type: String,
    /// The submitting user.
    pub submitter_id: Uuid,
    /// Processing priority (defaults to normal).
    pub priority: Option<String>,
    /// Attachment references.
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Request body for an approver action.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    /// The step the action targets.
    pub step_id: Uuid,
    /// The acting approver.
    pub approver_id: Uuid,
    /// The role the approver is acting under.
    pub approver_role: String,
    /// The decision: approve, reject, delegate, or request_info.
    pub action: String,
    /// Delegation target, required for delegate.
    pub delegate_to: Option<Uuid>,
    /// Free-text comments.
    pub comments: Option<String>,
    /// Attachment references.
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Request body for cancelling an instance.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    /// The cancelling user.
    pub cancelled_by: Uuid,
    /// The cancellation reason.
    pub reason: String,
}

/// Request body for a bulk action.
#[derive(Debug, Deserialize)]
pub struct BulkActionRequest {
    /// The instances to act on.
    pub instance_ids: Vec<Uuid>,
    /// The acting approver.
    pub approver_id: Uuid,
    /// The role the approver is acting under.
    pub approver_role: String,
    /// The decision: approve, reject, delegate, or request_info.
    pub action: String,
    /// Delegation target, required for delegate.
    pub delegate_to: Option<Uuid>,
    /// Free-text comments.
    pub comments: Option<String>,
    /// Skip the assignee-authorization check.
    #[serde(default)]
    pub skip_validation: bool,
}

/// Query parameters for the pending list.
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    /// The approver to list work for.
    pub approver_id: Uuid,
    /// The role the approver is acting under.
    pub role: String,
    /// Optional workflow type filter.
    #[serde(rename = "type")]
    pub workflow_type: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

/// Response for a workflow instance.
#[derive(Debug, Serialize)]
pub struct InstanceResponse {
    /// Instance ID.
    pub id: Uuid,
    /// Workflow type.
    #[serde(rename = "type")]
    pub workflow_type: String,
    /// Current status.
    pub status: String,
    /// Source document ID.
    pub document_id: Uuid,
    /// Submitting user.
    pub requester: Uuid,
    /// Processing priority.
    pub priority: String,
    /// Current step, absent once no step awaits decisions.
    pub current_step: Option<StepResponse>,
    /// Risk level at submission.
    pub risk_level: String,
    /// Risk score at submission.
    pub risk_score: u32,
    /// Compliance posture at submission.
    pub compliance_status: String,
    /// Deadline for the awaited decision.
    pub sla_deadline: DateTime<Utc>,
    /// Escalation level.
    pub escalation_level: u32,
    /// Audit history.
    pub history: Vec<HistoryEntryResponse>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last change timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Response for the current step of an instance.
#[derive(Debug, Serialize)]
pub struct StepResponse {
    /// Step ID.
    pub id: Uuid,
    /// Step name.
    pub name: String,
    /// Step order.
    pub order: u32,
    /// Required approvals to advance.
    pub required_approvals: u32,
    /// Distinct approvals collected so far.
    pub approvals_collected: usize,
}

/// Response for one audit history entry.
#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    /// Entry ID.
    pub id: Uuid,
    /// Step name at recording time.
    pub step_name: String,
    /// Step order.
    pub step_order: u32,
    /// Action label.
    pub action: String,
    /// Acting user, absent for system entries.
    pub actor: Option<Uuid>,
    /// When the action happened.
    pub at: DateTime<Utc>,
    /// Free-text comments.
    pub comments: Option<String>,
}

/// Summary item for the pending list.
#[derive(Debug, Serialize)]
pub struct InstanceSummary {
    /// Instance ID.
    pub id: Uuid,
    /// Workflow type.
    #[serde(rename = "type")]
    pub workflow_type: String,
    /// Current status.
    pub status: String,
    /// Processing priority.
    pub priority: String,
    /// Transaction amount.
    pub amount: String,
    /// Deadline for the awaited decision.
    pub sla_deadline: DateTime<Utc>,
}

impl InstanceResponse {
    fn from_instance(instance: &WorkflowInstance) -> Self {
        let current_step = instance
            .status
            .accepts_actions()
            .then(|| instance.current_step())
            .flatten()
            .map(|step| StepResponse {
                id: step.id.into_inner(),
                name: step.name.clone(),
                order: step.order,
                required_approvals: step.required_approvals,
                approvals_collected: instance.distinct_approvals_at(step.order),
            });

        Self {
            id: instance.id.into_inner(),
            workflow_type: instance.workflow_type().to_string(),
            status: instance.status.to_string(),
            document_id: instance.source.id.into_inner(),
            requester: instance.requester.into_inner(),
            priority: instance.priority.to_string(),
            current_step,
            risk_level: instance.metadata.risk.level.to_string(),
            risk_score: instance.metadata.risk.score,
            compliance_status: instance.compliance_status.as_str().to_string(),
            sla_deadline: instance.sla_deadline,
            escalation_level: instance.escalation_level,
            history: instance
                .history
                .iter()
                .map(|entry| HistoryEntryResponse {
                    id: entry.id.into_inner(),
                    step_name: entry.step_name.clone(),
                    step_order: entry.step_order,
                    action: entry.action.label().to_string(),
                    actor: match &entry.action {
                        fuelgate_core::workflow::HistoryAction::Human { approver, .. } => {
                            Some(approver.into_inner())
                        }
                        fuelgate_core::workflow::HistoryAction::System { .. } => None,
                    },
                    at: entry.at,
                    comments: entry.comments.clone(),
                })
                .collect(),
            created_at: instance.created_at,
            updated_at: instance.updated_at,
        }
    }
}

impl InstanceSummary {
    fn from_instance(instance: &WorkflowInstance) -> Self {
        Self {
            id: instance.id.into_inner(),
            workflow_type: instance.workflow_type().to_string(),
            status: instance.status.to_string(),
            priority: instance.priority.to_string(),
            amount: instance.metadata.amount.to_string(),
            sla_deadline: instance.sla_deadline,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/workflows` - Submit a transaction for approval.
async fn submit_workflow(
    State(state): State<AppState>,
    Json(request): Json<SubmitWorkflowRequest>,
) -> Response {
    let workflow_type = match parse_workflow_type(&request.workflow_type) {
        Ok(wt) => wt,
        Err(err) => return error_response(&err),
    };
    let priority = match request.priority.as_deref() {
        None => Priority::Normal,
        Some(s) => match Priority::parse(s) {
            Some(p) => p,
            None => {
                return error_response(&WorkflowError::Validation(format!(
                    "unknown priority: {s}"
                )));
            }
        },
    };

    let result = state
        .engine
        .submit(SubmitRequest {
            document: SourceDocument {
                id: DocumentId::from_uuid(request.document_id),
                kind: workflow_type,
            },
            submitter: UserId::from_uuid(request.submitter_id),
            priority,
            attachments: request.attachments,
        })
        .await;

    match result {
        Ok(instance) => (
            StatusCode::CREATED,
            Json(InstanceResponse::from_instance(&instance)),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET `/workflows/{instance_id}` - Fetch an instance.
async fn get_workflow(
    State(state): State<AppState>,
    Path(instance_id): Path<Uuid>,
) -> Response {
    match state
        .engine
        .get_instance(InstanceId::from_uuid(instance_id))
        .await
    {
        Ok(instance) => Json(InstanceResponse::from_instance(&instance)).into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST `/workflows/{instance_id}/actions` - Apply an approver decision.
async fn act_on_workflow(
    State(state): State<AppState>,
    Path(instance_id): Path<Uuid>,
    Json(request): Json<ActionRequest>,
) -> Response {
    let approver = match parse_approver(request.approver_id, &request.approver_role) {
        Ok(approver) => approver,
        Err(err) => return error_response(&err),
    };
    let decision = match parse_decision(&request.action, request.delegate_to) {
        Ok(decision) => decision,
        Err(err) => return error_response(&err),
    };

    let result = state
        .engine
        .act(
            InstanceId::from_uuid(instance_id),
            StepId::from_uuid(request.step_id),
            approver,
            decision,
            request.comments,
            request.attachments,
        )
        .await;

    match result {
        Ok(instance) => Json(InstanceResponse::from_instance(&instance)).into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST `/workflows/{instance_id}/cancel` - Cancel an instance.
async fn cancel_workflow(
    State(state): State<AppState>,
    Path(instance_id): Path<Uuid>,
    Json(request): Json<CancelRequest>,
) -> Response {
    let result = state
        .engine
        .cancel(
            InstanceId::from_uuid(instance_id),
            UserId::from_uuid(request.cancelled_by),
            request.reason,
        )
        .await;

    match result {
        Ok(instance) => Json(InstanceResponse::from_instance(&instance)).into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST `/workflows/bulk-actions` - Apply one decision to many instances.
async fn bulk_action(
    State(state): State<AppState>,
    Json(request): Json<BulkActionRequest>,
) -> Response {
    if request.instance_ids.is_empty() {
        return error_response(&WorkflowError::Validation(
            "instance_ids must not be empty".to_string(),
        ));
    }
    let approver = match parse_approver(request.approver_id, &request.approver_role) {
        Ok(approver) => approver,
        Err(err) => return error_response(&err),
    };
    let decision = match parse_decision(&request.action, request.delegate_to) {
        Ok(decision) => decision,
        Err(err) => return error_response(&err),
    };

    let report: BulkActionReport = state
        .engine
        .bulk_act(
            request
                .instance_ids
                .into_iter()
                .map(InstanceId::from_uuid)
                .collect(),
            decision,
            approver,
            request.comments,
            request.skip_validation,
        )
        .await;

    Json(report).into_response()
}

/// GET `/workflows/pending` - List instances awaiting the approver.
async fn list_pending(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Response {
    let approver = match parse_approver(query.approver_id, &query.role) {
        Ok(approver) => approver,
        Err(err) => return error_response(&err),
    };
    let workflow_type = match query.workflow_type.as_deref() {
        None => None,
        Some(s) => match parse_workflow_type(s) {
            Ok(wt) => Some(wt),
            Err(err) => return error_response(&err),
        },
    };

    match state.engine.list_pending(&approver, workflow_type).await {
        Ok(pending) => {
            let page = query.page.unwrap_or(1).max(1);
            let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
            let total = pending.len() as u64;
            let offset = ((page - 1) as usize).saturating_mul(per_page as usize);
            let items: Vec<InstanceSummary> = pending
                .iter()
                .skip(offset)
                .take(per_page as usize)
                .map(InstanceSummary::from_instance)
                .collect();
            Json(PageResponse::new(items, page, per_page, total)).into_response()
        }
        Err(err) => error_response(&err),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_workflow_type(s: &str) -> Result<WorkflowType, WorkflowError> {
    WorkflowType::parse(s)
        .ok_or_else(|| WorkflowError::Validation(format!("unknown workflow type: {s}")))
}

fn parse_approver(id: Uuid, role: &str) -> Result<Approver, WorkflowError> {
    let role = ApproverRole::parse(role)
        .ok_or_else(|| WorkflowError::Validation(format!("unknown approver role: {role}")))?;
    Ok(Approver {
        id: UserId::from_uuid(id),
        role,
    })
}

fn parse_decision(
    action: &str,
    delegate_to: Option<Uuid>,
) -> Result<ApprovalDecision, WorkflowError> {
    match action.to_lowercase().as_str() {
        "approve" => Ok(ApprovalDecision::Approve),
        "reject" => Ok(ApprovalDecision::Reject),
        "request_info" => Ok(ApprovalDecision::RequestInfo),
        "delegate" => delegate_to
            .map(|to| ApprovalDecision::Delegate {
                to: UserId::from_uuid(to),
            })
            .ok_or_else(|| {
                WorkflowError::Validation("delegate requires delegate_to".to_string())
            }),
        other => Err(WorkflowError::Validation(format!(
            "unknown action: {other}"
        ))),
    }
}

fn error_response(err: &WorkflowError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(code = err.error_code(), "workflow operation failed: {err}");
    }
    (
        status,
        Json(json!({
            "error": {
                "code": err.error_code(),
                "message": err.to_string(),
            }
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("approve", None, true)]
    #[case("REJECT", None, true)]
    #[case("request_info", None, true)]
    #[case("delegate", None, false)]
    #[case("escalate", None, false)]
    fn test_parse_decision(
        #[case] action: &str,
        #[case] delegate_to: Option<Uuid>,
        #[case] ok: bool,
    ) {
        assert_eq!(parse_decision(action, delegate_to).is_ok(), ok);
    }

    #[test]
    fn test_parse_decision_delegate() {
        let target = Uuid::new_v4();
        let decision = parse_decision("delegate", Some(target)).unwrap();
        assert_eq!(
            decision,
            ApprovalDecision::Delegate {
                to: UserId::from_uuid(target)
            }
        );
    }

    #[test]
    fn test_parse_approver_rejects_unknown_role() {
        assert!(parse_approver(Uuid::new_v4(), "janitor").is_err());
        assert!(parse_approver(Uuid::new_v4(), "manager").is_ok());
    }

    #[test]
    fn test_error_response_codes() {
        let err = WorkflowError::InstanceNotFound(InstanceId::new());
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

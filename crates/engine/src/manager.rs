//! The workflow engine: submission, approver actions, cancellation, queries.
//!
//! Every mutating operation is one atomic unit: read the instance,
//! validate, append the history entry, persist. Mutations are serialized
//! per instance id with an in-process lock on top of the store's
//! optimistic version check. Notifications fire only after the write
//! commits and never roll it back.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use fuelgate_core::risk::RiskAssessor;
use fuelgate_core::workflow::{
    ApprovalDecision, Approver, HumanAction, Priority, SourceDocument, SystemAction,
    WorkflowError, WorkflowInstance, WorkflowType,
};
use fuelgate_shared::types::{InstanceId, StepId, UserId};

use crate::gateway::TransactionGateway;
use crate::notify::{NotificationEmitter, NotificationKind, NotificationRequest, WorkflowEvent};
use crate::registry::{DefinitionRegistry, DefinitionResolver};
use crate::store::InstanceStore;

/// Collaborators the engine is composed from at process startup.
pub struct EngineDependencies {
    /// Instance persistence.
    pub store: Arc<dyn InstanceStore>,
    /// Definition lookup.
    pub registry: Arc<dyn DefinitionRegistry>,
    /// Source transaction lookup.
    pub gateway: Arc<dyn TransactionGateway>,
    /// Notification and event sink.
    pub emitter: Arc<dyn NotificationEmitter>,
}

/// A request to start an approval workflow for a transaction.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// The document to authorize.
    pub document: SourceDocument,
    /// The submitting user.
    pub submitter: UserId,
    /// Processing priority.
    pub priority: Priority,
    /// Attachment references supplied at submission.
    pub attachments: Vec<String>,
}

/// The approval workflow engine.
pub struct WorkflowEngine {
    store: Arc<dyn InstanceStore>,
    resolver: DefinitionResolver,
    gateway: Arc<dyn TransactionGateway>,
    emitter: Arc<dyn NotificationEmitter>,
    risk: RiskAssessor,
    default_timeout_hours: i64,
    locks: DashMap<InstanceId, Arc<Mutex<()>>>,
}

impl WorkflowEngine {
    /// Composes an engine from its collaborators.
    #[must_use]
    pub fn new(deps: EngineDependencies, risk: RiskAssessor, default_timeout_hours: i64) -> Self {
        Self {
            store: deps.store,
            resolver: DefinitionResolver::new(deps.registry),
            gateway: deps.gateway,
            emitter: deps.emitter,
            risk,
            default_timeout_hours,
            locks: DashMap::new(),
        }
    }

    /// Submits a transaction for approval.
    ///
    /// Resolves the definition, assesses risk, and evaluates auto-approval
    /// rules. When a rule matches, the instance materializes already
    /// approved with a single system entry and no pending step.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` when the source transaction does not
    /// exist, `DuplicateActiveInstance` when the document already has an
    /// active instance, and storage errors from persistence.
    pub async fn submit(&self, request: SubmitRequest) -> Result<WorkflowInstance, WorkflowError> {
        let snapshot = self
            .gateway
            .fetch(&request.document)
            .await?
            .ok_or(WorkflowError::DocumentNotFound(request.document.id))?;

        if let Some(existing) = self.store.active_instance_for(request.document.id).await? {
            return Err(WorkflowError::DuplicateActiveInstance {
                document: request.document.id,
                existing,
            });
        }

        let ctx = snapshot.evaluation_context();
        let definition = self.resolver.resolve(request.document.kind, &ctx).await;
        let risk = self.risk.assess(&snapshot.risk_input());
        let metadata = snapshot.into_metadata(risk);
        let now = Utc::now();

        let mut instance = WorkflowInstance::create(
            definition,
            request.document,
            request.submitter,
            request.priority,
            metadata,
            request.attachments,
            self.default_timeout_hours,
            now,
        );

        let matched_rule = instance
            .definition
            .matching_auto_approval(instance.workflow_type(), &ctx)
            .map(|rule| rule.name.clone());

        if let Some(rule_name) = matched_rule {
            let entry = instance.system_entry(
                SystemAction::AutoApproved,
                Some(format!("Auto-approval rule: {rule_name}")),
                now,
            );
            instance.apply(entry);
        } else if !instance.has_pending_step() {
            // Every step was conditioned away; nothing requires a decision.
            let entry = instance.system_entry(
                SystemAction::AutoApproved,
                Some("No approval steps apply".to_string()),
                now,
            );
            instance.apply(entry);
        }

        self.store.insert(instance.clone()).await?;
        info!(
            instance_id = %instance.id,
            workflow_type = %instance.workflow_type(),
            status = %instance.status,
            "workflow instance created"
        );

        if instance.status.is_terminal() {
            self.emit_event(WorkflowEvent::ApprovalProcessed {
                instance_id: instance.id,
                workflow_type: instance.workflow_type(),
                status: instance.status,
            })
            .await;
        } else {
            self.emit_event(WorkflowEvent::SubmittedForApproval {
                instance_id: instance.id,
                workflow_type: instance.workflow_type(),
                document: instance.source,
                requester: instance.requester,
            })
            .await;
            self.emit_notification(&instance, NotificationKind::Submitted)
                .await;
        }

        Ok(instance)
    }

    /// Applies an approver decision to the instance's current step.
    ///
    /// # Errors
    ///
    /// Returns `InstanceNotFound`, `InvalidState` for terminal instances,
    /// `StepMismatch` when `step_id` is not the current step, `NotAuthorized`
    /// when the approver is not assigned, `DuplicateApproval` on a repeated
    /// approval, and `RejectionReasonRequired` on a comment-less rejection.
    pub async fn act(
        &self,
        instance_id: InstanceId,
        step_id: StepId,
        approver: Approver,
        decision: ApprovalDecision,
        comments: Option<String>,
        attachments: Vec<String>,
    ) -> Result<WorkflowInstance, WorkflowError> {
        self.act_with_options(
            instance_id,
            Some(step_id),
            approver,
            decision,
            comments,
            attachments,
            true,
        )
        .await
    }

    /// `act` with the step check optional and authorization bypassable.
    ///
    /// Bulk actions resolve each instance's current step themselves and may
    /// skip the assignee check; the state machine validation always runs.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn act_with_options(
        &self,
        instance_id: InstanceId,
        target_step: Option<StepId>,
        approver: Approver,
        decision: ApprovalDecision,
        comments: Option<String>,
        attachments: Vec<String>,
        enforce_authorization: bool,
    ) -> Result<WorkflowInstance, WorkflowError> {
        let lock = self.instance_lock(instance_id);
        let _guard = lock.lock().await;

        let mut instance = self
            .store
            .get(instance_id)
            .await?
            .ok_or(WorkflowError::InstanceNotFound(instance_id))?;

        if instance.status.is_terminal() {
            return Err(WorkflowError::InvalidState {
                status: instance.status,
                operation: "act on",
            });
        }

        let current_step_id = instance.current_step().map(|s| s.id).ok_or_else(|| {
            WorkflowError::Validation("instance has no step awaiting decisions".to_string())
        })?;

        if let Some(target) = target_step {
            if target != current_step_id {
                return Err(WorkflowError::StepMismatch {
                    expected: current_step_id,
                    actual: target,
                });
            }
        }

        if enforce_authorization && !instance.is_assigned(&approver) {
            return Err(WorkflowError::NotAuthorized {
                approver: approver.id,
                step: current_step_id,
            });
        }

        let now = Utc::now();
        let entry = match &decision {
            ApprovalDecision::Approve => {
                if instance.has_approved_current_step(approver.id) {
                    return Err(WorkflowError::DuplicateApproval {
                        approver: approver.id,
                        step: current_step_id,
                    });
                }
                instance.human_entry(approver.id, HumanAction::Approved, comments, attachments, now)
            }
            ApprovalDecision::Reject => {
                if comments.as_deref().is_none_or(|c| c.trim().is_empty()) {
                    return Err(WorkflowError::RejectionReasonRequired);
                }
                instance.human_entry(approver.id, HumanAction::Rejected, comments, attachments, now)
            }
            ApprovalDecision::Delegate { to } => instance.human_entry(
                approver.id,
                HumanAction::Delegated {
                    from: approver.id,
                    to: *to,
                },
                comments,
                attachments,
                now,
            ),
            ApprovalDecision::RequestInfo => instance.human_entry(
                approver.id,
                HumanAction::InfoRequested,
                comments,
                attachments,
                now,
            ),
        };

        instance.apply(entry);
        let updated = self.store.update(instance).await?;

        info!(
            instance_id = %updated.id,
            approver = %approver.id,
            action = %decision_label(&decision),
            status = %updated.status,
            "approval action processed"
        );

        self.emit_event(WorkflowEvent::ApprovalProcessed {
            instance_id: updated.id,
            workflow_type: updated.workflow_type(),
            status: updated.status,
        })
        .await;
        if updated.status.accepts_actions() {
            self.emit_notification(&updated, NotificationKind::ActionProcessed)
                .await;
        }

        Ok(updated)
    }

    /// Cancels an instance.
    ///
    /// # Errors
    ///
    /// Returns `CancelReasonRequired` for a blank reason, `InstanceNotFound`
    /// when the instance does not exist, and `InvalidState` unless the
    /// instance is pending, in progress, or escalated.
    pub async fn cancel(
        &self,
        instance_id: InstanceId,
        cancelled_by: UserId,
        reason: String,
    ) -> Result<WorkflowInstance, WorkflowError> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::CancelReasonRequired);
        }

        let lock = self.instance_lock(instance_id);
        let _guard = lock.lock().await;

        let mut instance = self
            .store
            .get(instance_id)
            .await?
            .ok_or(WorkflowError::InstanceNotFound(instance_id))?;

        if !instance.status.is_cancellable() {
            return Err(WorkflowError::InvalidState {
                status: instance.status,
                operation: "cancel",
            });
        }

        let entry = instance.human_entry(
            cancelled_by,
            HumanAction::Cancelled,
            Some(reason.clone()),
            vec![],
            Utc::now(),
        );
        instance.apply(entry);
        let updated = self.store.update(instance).await?;

        info!(instance_id = %updated.id, "workflow instance cancelled");
        self.emit_event(WorkflowEvent::Cancelled {
            instance_id: updated.id,
            workflow_type: updated.workflow_type(),
            reason,
        })
        .await;

        Ok(updated)
    }

    /// Loads an instance.
    ///
    /// # Errors
    ///
    /// Returns `InstanceNotFound` when the instance does not exist.
    pub async fn get_instance(
        &self,
        instance_id: InstanceId,
    ) -> Result<WorkflowInstance, WorkflowError> {
        self.store
            .get(instance_id)
            .await?
            .ok_or(WorkflowError::InstanceNotFound(instance_id))
    }

    /// Lists instances awaiting a decision from the given approver.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the instance store.
    pub async fn list_pending(
        &self,
        approver: &Approver,
        workflow_type: Option<WorkflowType>,
    ) -> Result<Vec<WorkflowInstance>, WorkflowError> {
        let mut pending: Vec<WorkflowInstance> = self
            .store
            .list_active()
            .await?
            .into_iter()
            .filter(|i| workflow_type.is_none_or(|wt| i.workflow_type() == wt))
            .filter(|i| i.is_assigned(approver))
            .collect();
        pending.sort_by_key(|i| i.sla_deadline);
        Ok(pending)
    }

    /// The instance store, for sibling modules within the crate.
    pub(crate) fn store_ref(&self) -> &dyn InstanceStore {
        self.store.as_ref()
    }

    /// Per-instance mutation lock; operations on different ids run in
    /// parallel.
    pub(crate) fn instance_lock(&self, id: InstanceId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Publishes a domain event; failures are logged and swallowed.
    pub(crate) async fn emit_event(&self, event: WorkflowEvent) {
        let name = event.name();
        if let Err(err) = self.emitter.publish(event).await {
            warn!(event = %name, error = %err, "domain event publication failed");
        }
    }

    /// Requests a notification; failures are logged and swallowed.
    pub(crate) async fn emit_notification(&self, instance: &WorkflowInstance, kind: NotificationKind) {
        let request = NotificationRequest {
            instance_id: instance.id,
            workflow_type: instance.workflow_type(),
            kind,
            requester: instance.requester,
            audience: instance.current_assignees.clone(),
            priority: instance.priority,
            sla_deadline: instance
                .status
                .accepts_actions()
                .then_some(instance.sla_deadline),
        };
        if let Err(err) = self.emitter.notify(request).await {
            warn!(
                instance_id = %instance.id,
                error = %err,
                "notification dispatch failed"
            );
        }
    }
}

fn decision_label(decision: &ApprovalDecision) -> &'static str {
    match decision {
        ApprovalDecision::Approve => "approve",
        ApprovalDecision::Reject => "reject",
        ApprovalDecision::Delegate { .. } => "delegate",
        ApprovalDecision::RequestInfo => "request_info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{InMemoryTransactionGateway, TransactionSnapshot};
    use crate::notify::MockNotificationEmitter;
    use crate::registry::InMemoryDefinitionRegistry;
    use crate::store::InMemoryInstanceStore;
    use fuelgate_core::workflow::{ApproverRole, InstanceStatus};
    use fuelgate_shared::error::AppError;
    use fuelgate_shared::types::{Currency, DocumentId, Money};
    use rust_decimal_macros::dec;

    fn snapshot(document: SourceDocument) -> TransactionSnapshot {
        TransactionSnapshot {
            document,
            amount: Money::new(dec!(5000), Currency::Usd),
            supplier_id: None,
            customer_id: None,
            product_category: Some("diesel".to_string()),
            credit_limit: None,
            customer_rating: None,
            compliance_score: Some(dec!(90)),
            regulatory_ids: vec!["PERMIT-1".to_string()],
            counterparty_count: 1,
            extra: serde_json::Value::Null,
        }
    }

    fn engine_with_emitter(emitter: Arc<dyn NotificationEmitter>) -> (WorkflowEngine, SourceDocument) {
        let gateway = Arc::new(InMemoryTransactionGateway::new());
        let document = SourceDocument {
            id: DocumentId::new(),
            kind: WorkflowType::DeliveryApproval,
        };
        gateway.put(snapshot(document));

        let engine = WorkflowEngine::new(
            EngineDependencies {
                store: Arc::new(InMemoryInstanceStore::new()),
                registry: Arc::new(InMemoryDefinitionRegistry::new()),
                gateway,
                emitter,
            },
            RiskAssessor::default(),
            48,
        );
        (engine, document)
    }

    #[tokio::test]
    async fn test_emitter_failure_never_fails_the_transition() {
        let mut emitter = MockNotificationEmitter::new();
        emitter
            .expect_publish()
            .returning(|_| Err(AppError::ExternalService("event bus down".to_string())));
        emitter
            .expect_notify()
            .returning(|_| Err(AppError::ExternalService("smtp down".to_string())));

        let (engine, document) = engine_with_emitter(Arc::new(emitter));

        // The fallback definition resolves (empty registry) and the submit
        // still succeeds with every emission failing.
        let instance = engine
            .submit(SubmitRequest {
                document,
                submitter: UserId::new(),
                priority: Priority::Normal,
                attachments: vec![],
            })
            .await
            .unwrap();
        assert_eq!(instance.status, InstanceStatus::Pending);

        let step_id = instance.current_step().unwrap().id;
        let updated = engine
            .act(
                instance.id,
                step_id,
                Approver {
                    id: UserId::new(),
                    role: ApproverRole::Manager,
                },
                ApprovalDecision::Approve,
                None,
                vec![],
            )
            .await
            .unwrap();
        assert_eq!(updated.status, InstanceStatus::Approved);
    }

    #[tokio::test]
    async fn test_submitted_event_published_once() {
        let mut emitter = MockNotificationEmitter::new();
        emitter
            .expect_publish()
            .times(1)
            .returning(|_| Ok(()));
        emitter.expect_notify().times(1).returning(|_| Ok(()));

        let (engine, document) = engine_with_emitter(Arc::new(emitter));
        engine
            .submit(SubmitRequest {
                document,
                submitter: UserId::new(),
                priority: Priority::Normal,
                attachments: vec![],
            })
            .await
            .unwrap();
    }
}

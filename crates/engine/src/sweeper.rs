//! SLA sweep and the recurring sweeper task.
//!
//! The sweep is the only code path that authors system escalation,
//! timeout, and forced-decision entries. It is idempotent: every
//! escalation pushes the deadline forward, so re-sweeping an instance
//! already escalated at the current level is a no-op.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use fuelgate_core::workflow::{
    EscalationAction, EscalationTrigger, InstanceStatus, StepAssignee, SystemAction, WorkflowError,
};
use fuelgate_shared::types::InstanceId;

use crate::manager::WorkflowEngine;
use crate::notify::{NotificationKind, WorkflowEvent};

impl WorkflowEngine {
    /// Sweeps overdue instances and triggers configured escalations.
    ///
    /// Returns the ids of instances the sweep acted on. Instances whose
    /// deadline has not passed are untouched. At the escalation level cap
    /// the rule's forced outcome takes the instance terminal.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the instance store; per-instance
    /// escalation work that fails is logged and skipped.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<InstanceId>, WorkflowError> {
        let candidates = self.store_list_overdue(now).await?;
        let mut triggered = Vec::new();

        for instance_id in candidates {
            match self.sweep_instance(instance_id, now).await {
                Ok(true) => triggered.push(instance_id),
                Ok(false) => {}
                Err(err) => {
                    warn!(instance_id = %instance_id, error = %err, "sweep failed for instance");
                }
            }
        }

        Ok(triggered)
    }

    async fn store_list_overdue(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<InstanceId>, WorkflowError> {
        Ok(self
            .store_ref()
            .list_active()
            .await?
            .into_iter()
            .filter(|i| i.sla_deadline < now)
            .map(|i| i.id)
            .collect())
    }

    /// Escalates one overdue instance. Returns false for the no-op cases.
    async fn sweep_instance(
        &self,
        instance_id: InstanceId,
        now: DateTime<Utc>,
    ) -> Result<bool, WorkflowError> {
        let lock = self.instance_lock(instance_id);
        let _guard = lock.lock().await;

        let Some(mut instance) = self.store_ref().get(instance_id).await? else {
            return Ok(false);
        };
        // Revalidated under the lock: another caller may have decided or
        // re-deadlined the instance since the candidate scan.
        if !instance.status.accepts_actions() || instance.sla_deadline >= now {
            return Ok(false);
        }

        let Some(rule) = instance
            .definition
            .escalation_rule(EscalationTrigger::Timeout)
            .cloned()
        else {
            // No rule configured: mark the timeout once and keep accepting
            // approver actions.
            if instance.status == InstanceStatus::TimedOut {
                return Ok(false);
            }
            let entry = instance.system_entry(SystemAction::TimedOut, None, now);
            instance.apply(entry);
            let updated = self.store_ref().update(instance).await?;
            warn!(instance_id = %updated.id, "instance timed out with no escalation rule");
            self.emit_event(WorkflowEvent::TimedOut {
                instance_id: updated.id,
                workflow_type: updated.workflow_type(),
            })
            .await;
            return Ok(true);
        };

        if instance.escalation_level >= rule.max_escalation_level {
            // Cap reached: force the configured terminal outcome.
            let action = match rule.forced_outcome() {
                EscalationAction::AutoApprove => SystemAction::AutoApproved,
                _ => SystemAction::AutoRejected,
            };
            let entry = instance.system_entry(
                action,
                Some("Escalation level cap reached".to_string()),
                now,
            );
            instance.apply(entry);
            let updated = self.store_ref().update(instance).await?;
            info!(
                instance_id = %updated.id,
                status = %updated.status,
                "escalation cap reached, terminal outcome forced"
            );
            self.emit_event(WorkflowEvent::ApprovalProcessed {
                instance_id: updated.id,
                workflow_type: updated.workflow_type(),
                status: updated.status,
            })
            .await;
            return Ok(true);
        }

        let entry = instance.system_entry(
            SystemAction::Escalated {
                level: instance.escalation_level + 1,
            },
            None,
            now,
        );
        instance.apply(entry);

        // Step-specific actions run before the rule's own.
        let actions: Vec<EscalationAction> = instance
            .current_step()
            .map(|s| s.escalation_actions.clone())
            .unwrap_or_default()
            .into_iter()
            .chain(rule.actions.iter().cloned())
            .collect();

        let mut notify_assignees = false;
        for action in actions {
            match action {
                EscalationAction::Notify => notify_assignees = true,
                EscalationAction::Reassign { to } => {
                    let entry =
                        instance.system_entry(SystemAction::Reassigned { to }, None, now);
                    instance.apply(entry);
                }
                EscalationAction::EscalateToRole { role } => {
                    let entry = instance.system_entry(
                        SystemAction::Reassigned {
                            to: StepAssignee::Role { role },
                        },
                        None,
                        now,
                    );
                    instance.apply(entry);
                }
                EscalationAction::AutoApprove => {
                    let entry = instance.system_entry(
                        SystemAction::AutoApproved,
                        Some("Forced by escalation".to_string()),
                        now,
                    );
                    instance.apply(entry);
                }
                EscalationAction::AutoReject => {
                    let entry = instance.system_entry(
                        SystemAction::AutoRejected,
                        Some("Forced by escalation".to_string()),
                        now,
                    );
                    instance.apply(entry);
                }
            }
            if instance.status.is_terminal() {
                break;
            }
        }

        if instance.status.accepts_actions() {
            instance.sla_deadline = now + Duration::hours(rule.delay_hours);
        }

        let updated = self.store_ref().update(instance).await?;
        info!(
            instance_id = %updated.id,
            level = updated.escalation_level,
            status = %updated.status,
            "instance escalated"
        );

        self.emit_event(WorkflowEvent::Escalated {
            instance_id: updated.id,
            workflow_type: updated.workflow_type(),
            level: updated.escalation_level,
        })
        .await;
        if updated.status.is_terminal() {
            self.emit_event(WorkflowEvent::ApprovalProcessed {
                instance_id: updated.id,
                workflow_type: updated.workflow_type(),
                status: updated.status,
            })
            .await;
        } else if notify_assignees {
            self.emit_notification(&updated, NotificationKind::Escalated)
                .await;
        }

        Ok(true)
    }
}

/// Recurring task invoking the sweep on a fixed interval.
pub struct SweeperTask {
    engine: Arc<WorkflowEngine>,
    interval: std::time::Duration,
}

impl SweeperTask {
    /// Creates a sweeper task over the given engine.
    #[must_use]
    pub fn new(engine: Arc<WorkflowEngine>, interval: std::time::Duration) -> Self {
        Self { engine, interval }
    }

    /// Runs the sweep loop until the task is dropped.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.engine.sweep(Utc::now()).await {
                Ok(triggered) if triggered.is_empty() => {}
                Ok(triggered) => {
                    info!(count = triggered.len(), "escalation sweep triggered instances");
                }
                Err(err) => warn!(error = %err, "escalation sweep failed"),
            }
        }
    }
}

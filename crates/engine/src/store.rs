//! Instance persistence contract and the in-memory store.
//!
//! The engine reads and writes instances through [`InstanceStore`] only.
//! Writes carry an optimistic version check: the store rejects a write
//! whose version does not match the stored instance, so a lost update can
//! never silently drop a history entry.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use fuelgate_core::workflow::{WorkflowError, WorkflowInstance};
use fuelgate_shared::types::{DocumentId, InstanceId};

/// Persistence contract for workflow instances.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Persists a newly created instance.
    ///
    /// Claims the active slot for the instance's source document; inserting
    /// a second active instance for the same document fails with
    /// `DuplicateActiveInstance`.
    async fn insert(&self, instance: WorkflowInstance) -> Result<(), WorkflowError>;

    /// Loads an instance by id.
    async fn get(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, WorkflowError>;

    /// Persists a mutated instance and returns it with a bumped version.
    ///
    /// Fails when the incoming version does not match the stored one.
    async fn update(&self, instance: WorkflowInstance) -> Result<WorkflowInstance, WorkflowError>;

    /// Returns the active instance for a source document, if any.
    async fn active_instance_for(
        &self,
        document: DocumentId,
    ) -> Result<Option<InstanceId>, WorkflowError>;

    /// Lists every instance still accepting actions.
    async fn list_active(&self) -> Result<Vec<WorkflowInstance>, WorkflowError>;
}

/// In-memory instance store backed by concurrent maps.
#[derive(Debug, Default)]
pub struct InMemoryInstanceStore {
    instances: DashMap<InstanceId, WorkflowInstance>,
    active_by_document: DashMap<DocumentId, InstanceId>,
}

impl InMemoryInstanceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn insert(&self, instance: WorkflowInstance) -> Result<(), WorkflowError> {
        // Terminal instances (submission short-circuits) never occupy the
        // active slot, so the document can be resubmitted later.
        if instance.status.accepts_actions() {
            match self.active_by_document.entry(instance.source.id) {
                Entry::Occupied(existing) => {
                    return Err(WorkflowError::DuplicateActiveInstance {
                        document: instance.source.id,
                        existing: *existing.get(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(instance.id);
                }
            }
        }
        self.instances.insert(instance.id, instance);
        Ok(())
    }

    async fn get(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, WorkflowError> {
        Ok(self.instances.get(&id).map(|entry| entry.clone()))
    }

    async fn update(&self, instance: WorkflowInstance) -> Result<WorkflowInstance, WorkflowError> {
        let mut stored = self
            .instances
            .get_mut(&instance.id)
            .ok_or(WorkflowError::InstanceNotFound(instance.id))?;

        if stored.version != instance.version {
            return Err(WorkflowError::Storage(format!(
                "stale write for instance {}: version {} does not match stored {}",
                instance.id, instance.version, stored.version
            )));
        }

        let mut updated = instance;
        updated.version += 1;
        *stored = updated.clone();
        drop(stored);

        if updated.status.is_terminal() {
            self.active_by_document
                .remove_if(&updated.source.id, |_, active| *active == updated.id);
        }

        Ok(updated)
    }

    async fn active_instance_for(
        &self,
        document: DocumentId,
    ) -> Result<Option<InstanceId>, WorkflowError> {
        Ok(self.active_by_document.get(&document).map(|entry| *entry))
    }

    async fn list_active(&self) -> Result<Vec<WorkflowInstance>, WorkflowError> {
        Ok(self
            .instances
            .iter()
            .filter(|entry| entry.status.accepts_actions())
            .map(|entry| entry.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fuelgate_core::risk::{RiskAssessment, RiskLevel};
    use fuelgate_core::workflow::{
        HumanAction, InstanceStatus, Priority, SourceDocument, WorkflowDefinition,
        WorkflowMetadata, WorkflowType,
    };
    use fuelgate_shared::types::{Currency, Money, UserId};
    use rust_decimal_macros::dec;

    fn instance() -> WorkflowInstance {
        WorkflowInstance::create(
            WorkflowDefinition::fallback(WorkflowType::DeliveryApproval),
            SourceDocument {
                id: DocumentId::new(),
                kind: WorkflowType::DeliveryApproval,
            },
            UserId::new(),
            Priority::Normal,
            WorkflowMetadata {
                amount: Money::new(dec!(5000), Currency::Usd),
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
            },
            vec![],
            48,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryInstanceStore::new();
        let inst = instance();
        let id = inst.id;
        store.insert(inst).await.unwrap();
        assert!(store.get(id).await.unwrap().is_some());
        assert!(store.get(InstanceId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_active_instance_for_document_conflicts() {
        let store = InMemoryInstanceStore::new();
        let first = instance();
        let document = first.source.id;
        let first_id = first.id;
        store.insert(first).await.unwrap();

        let mut second = instance();
        second.source.id = document;
        let err = store.insert(second).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::DuplicateActiveInstance { existing, .. } if existing == first_id
        ));
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_rejects_stale_writes() {
        let store = InMemoryInstanceStore::new();
        let inst = instance();
        store.insert(inst.clone()).await.unwrap();

        let updated = store.update(inst.clone()).await.unwrap();
        assert_eq!(updated.version, 1);

        // The original copy still carries version 0.
        let err = store.update(inst).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Storage(_)));
    }

    #[tokio::test]
    async fn test_terminal_update_frees_the_document_slot() {
        let store = InMemoryInstanceStore::new();
        let mut inst = instance();
        let document = inst.source.id;
        store.insert(inst.clone()).await.unwrap();
        assert!(store.active_instance_for(document).await.unwrap().is_some());

        let entry = inst.human_entry(
            UserId::new(),
            HumanAction::Cancelled,
            Some("duplicate".to_string()),
            vec![],
            Utc::now(),
        );
        inst.apply(entry);
        assert_eq!(inst.status, InstanceStatus::Cancelled);
        store.update(inst).await.unwrap();

        assert!(store.active_instance_for(document).await.unwrap().is_none());

        // A fresh submission for the document is accepted again.
        let mut replacement = instance();
        replacement.source.id = document;
        store.insert(replacement).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_active_excludes_terminal() {
        let store = InMemoryInstanceStore::new();
        let active = instance();
        store.insert(active).await.unwrap();

        let mut done = instance();
        let entry = done.human_entry(
            UserId::new(),
            HumanAction::Cancelled,
            Some("obsolete".to_string()),
            vec![],
            Utc::now(),
        );
        done.apply(entry);
        store.insert(done).await.unwrap();

        assert_eq!(store.list_active().await.unwrap().len(), 1);
    }
}

//! Definition lookup, variant selection, and the fallback path.
//!
//! Definitions are registered per workflow type with a selector; amount
//! and product category pick among variants, lowest priority value wins.
//! Resolution failure falls back to the built-in default definition and
//! is logged as degraded operation, never silently.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

use fuelgate_core::workflow::{EvaluationContext, WorkflowDefinition, WorkflowError, WorkflowType};

/// Context discriminators that pick a definition variant.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSelector {
    /// Minimum amount for the variant to apply (inclusive).
    pub min_amount: Option<Decimal>,
    /// Maximum amount for the variant to apply (inclusive).
    pub max_amount: Option<Decimal>,
    /// Product categories the variant applies to; empty means all.
    pub product_categories: Vec<String>,
    /// Selection priority when several variants match (lower wins).
    pub priority: i16,
}

impl DefinitionSelector {
    /// Returns true if the variant applies under the context.
    #[must_use]
    pub fn matches(&self, ctx: &EvaluationContext) -> bool {
        let above_min = self.min_amount.is_none_or(|min| ctx.amount >= min);
        let below_max = self.max_amount.is_none_or(|max| ctx.amount <= max);
        let category_ok = self.product_categories.is_empty()
            || ctx.product_category.as_ref().is_some_and(|category| {
                self.product_categories
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(category))
            });
        above_min && below_max && category_ok
    }
}

/// External lookup contract for workflow definitions.
#[async_trait]
pub trait DefinitionRegistry: Send + Sync {
    /// Resolves the definition for a workflow type under the given context.
    async fn resolve(
        &self,
        workflow_type: WorkflowType,
        ctx: &EvaluationContext,
    ) -> Result<WorkflowDefinition, WorkflowError>;
}

struct RegisteredDefinition {
    selector: DefinitionSelector,
    definition: WorkflowDefinition,
}

/// In-memory definition registry.
#[derive(Default)]
pub struct InMemoryDefinitionRegistry {
    definitions: DashMap<WorkflowType, Vec<RegisteredDefinition>>,
}

impl InMemoryDefinitionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition variant.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Validation` when the definition is
    /// structurally unsound.
    pub fn register(
        &self,
        definition: WorkflowDefinition,
        selector: DefinitionSelector,
    ) -> Result<(), WorkflowError> {
        definition.validate()?;
        self.definitions
            .entry(definition.workflow_type)
            .or_default()
            .push(RegisteredDefinition {
                selector,
                definition,
            });
        Ok(())
    }
}

#[async_trait]
impl DefinitionRegistry for InMemoryDefinitionRegistry {
    async fn resolve(
        &self,
        workflow_type: WorkflowType,
        ctx: &EvaluationContext,
    ) -> Result<WorkflowDefinition, WorkflowError> {
        let variants = self
            .definitions
            .get(&workflow_type)
            .ok_or(WorkflowError::DefinitionNotFound { workflow_type })?;

        variants
            .iter()
            .filter(|v| v.selector.matches(ctx))
            .min_by_key(|v| v.selector.priority)
            .map(|v| v.definition.clone())
            .ok_or(WorkflowError::DefinitionNotFound { workflow_type })
    }
}

/// Resolver wrapping a registry with the built-in fallback.
#[derive(Clone)]
pub struct DefinitionResolver {
    registry: Arc<dyn DefinitionRegistry>,
}

impl DefinitionResolver {
    /// Creates a resolver over the given registry.
    #[must_use]
    pub fn new(registry: Arc<dyn DefinitionRegistry>) -> Self {
        Self { registry }
    }

    /// Resolves a definition, falling back to the built-in default.
    ///
    /// The fallback path is degraded operation and is logged at `warn` so
    /// it is never indistinguishable from a real definition lookup.
    pub async fn resolve(
        &self,
        workflow_type: WorkflowType,
        ctx: &EvaluationContext,
    ) -> WorkflowDefinition {
        match self.registry.resolve(workflow_type, ctx).await {
            Ok(definition) => definition,
            Err(err) => {
                warn!(
                    workflow_type = %workflow_type,
                    error = %err,
                    "definition lookup failed, using built-in fallback definition"
                );
                WorkflowDefinition::fallback(workflow_type)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelgate_core::workflow::definition::{
        ApprovalStep, ComplianceConfig, RejectPolicy, StepAssignee, StepType,
    };
    use fuelgate_core::workflow::types::ApproverRole;
    use fuelgate_shared::types::{DefinitionId, StepId};
    use rust_decimal_macros::dec;

    fn definition(name: &str) -> WorkflowDefinition {
        WorkflowDefinition {
            id: DefinitionId::new(),
            name: name.to_string(),
            workflow_type: WorkflowType::DeliveryApproval,
            steps: vec![ApprovalStep {
                id: StepId::new(),
                name: "Review".to_string(),
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
            escalation_rules: vec![],
            auto_approval_rules: vec![],
            compliance: ComplianceConfig::default(),
        }
    }

    fn ctx(amount: Decimal) -> EvaluationContext {
        EvaluationContext {
            amount,
            ..EvaluationContext::default()
        }
    }

    #[tokio::test]
    async fn test_amount_selects_variant() {
        let registry = InMemoryDefinitionRegistry::new();
        registry
            .register(
                definition("small"),
                DefinitionSelector {
                    max_amount: Some(dec!(10000)),
                    priority: 1,
                    ..DefinitionSelector::default()
                },
            )
            .unwrap();
        registry
            .register(
                definition("large"),
                DefinitionSelector {
                    min_amount: Some(dec!(10001)),
                    priority: 2,
                    ..DefinitionSelector::default()
                },
            )
            .unwrap();

        let resolved = registry
            .resolve(WorkflowType::DeliveryApproval, &ctx(dec!(500)))
            .await
            .unwrap();
        assert_eq!(resolved.name, "small");

        let resolved = registry
            .resolve(WorkflowType::DeliveryApproval, &ctx(dec!(50000)))
            .await
            .unwrap();
        assert_eq!(resolved.name, "large");
    }

    #[tokio::test]
    async fn test_lowest_priority_wins() {
        let registry = InMemoryDefinitionRegistry::new();
        registry
            .register(
                definition("generic"),
                DefinitionSelector {
                    priority: 10,
                    ..DefinitionSelector::default()
                },
            )
            .unwrap();
        registry
            .register(
                definition("specific"),
                DefinitionSelector {
                    priority: 1,
                    ..DefinitionSelector::default()
                },
            )
            .unwrap();

        let resolved = registry
            .resolve(WorkflowType::DeliveryApproval, &ctx(dec!(500)))
            .await
            .unwrap();
        assert_eq!(resolved.name, "specific");
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_definition() {
        let registry = InMemoryDefinitionRegistry::new();
        let mut invalid = definition("broken");
        invalid.steps.clear();
        assert!(registry
            .register(invalid, DefinitionSelector::default())
            .is_err());
    }

    #[tokio::test]
    async fn test_unregistered_type_errors() {
        let registry = InMemoryDefinitionRegistry::new();
        let err = registry
            .resolve(WorkflowType::SubsidyClaim, &ctx(dec!(500)))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::DefinitionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolver_falls_back_on_miss() {
        let resolver = DefinitionResolver::new(Arc::new(InMemoryDefinitionRegistry::new()));
        let resolved = resolver
            .resolve(WorkflowType::SubsidyClaim, &ctx(dec!(500)))
            .await;
        assert!(resolved.name.starts_with("fallback:"));
        assert_eq!(resolved.steps.len(), 1);
    }

    #[tokio::test]
    async fn test_category_selector() {
        let registry = InMemoryDefinitionRegistry::new();
        registry
            .register(
                definition("aviation"),
                DefinitionSelector {
                    product_categories: vec!["aviation_fuel".to_string()],
                    priority: 1,
                    ..DefinitionSelector::default()
                },
            )
            .unwrap();

        let mut context = ctx(dec!(500));
        context.product_category = Some("Aviation_Fuel".to_string());
        assert!(registry
            .resolve(WorkflowType::DeliveryApproval, &context)
            .await
            .is_ok());

        context.product_category = Some("diesel".to_string());
        assert!(registry
            .resolve(WorkflowType::DeliveryApproval, &context)
            .await
            .is_err());
    }
}

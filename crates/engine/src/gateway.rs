//! Read-only contract to the source transaction systems.
//!
//! Domain records (deliveries, invoices, subsidy claims) live in their own
//! subsystems; the engine only consumes a risk-relevant snapshot through
//! this gateway at submission time.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;

use fuelgate_core::risk::{RiskAssessment, RiskInput};
use fuelgate_core::workflow::{EvaluationContext, SourceDocument, WorkflowError, WorkflowMetadata};
use fuelgate_shared::types::{DocumentId, Money};

/// Risk-relevant snapshot of a source transaction.
#[derive(Debug, Clone)]
pub struct TransactionSnapshot {
    /// The document the snapshot was taken from.
    pub document: SourceDocument,
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
    /// Regulatory identifiers attached to the document.
    pub regulatory_ids: Vec<String>,
    /// Number of counterparties covered; above 1 only for bulk runs.
    pub counterparty_count: u32,
    /// Domain-specific compliance metadata carried through unchanged.
    pub extra: serde_json::Value,
}

impl TransactionSnapshot {
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

    /// Builds the risk assessor input.
    #[must_use]
    pub fn risk_input(&self) -> RiskInput {
        RiskInput {
            workflow_type: self.document.kind,
            amount: self.amount.amount,
            product_category: self.product_category.clone(),
            regulatory_ids: self.regulatory_ids.clone(),
            counterparty_count: self.counterparty_count,
            compliance_score: self.compliance_score,
        }
    }

    /// Freezes the snapshot into workflow metadata.
    #[must_use]
    pub fn into_metadata(self, risk: RiskAssessment) -> WorkflowMetadata {
        WorkflowMetadata {
            amount: self.amount,
            supplier_id: self.supplier_id,
            customer_id: self.customer_id,
            product_category: self.product_category,
            credit_limit: self.credit_limit,
            customer_rating: self.customer_rating,
            compliance_score: self.compliance_score,
            regulatory_ids: self.regulatory_ids,
            counterparty_count: self.counterparty_count,
            risk,
            extra: self.extra,
        }
    }
}

/// Read-only lookup contract for source transactions.
#[async_trait]
pub trait TransactionGateway: Send + Sync {
    /// Fetches the snapshot for a document, `None` when it does not exist.
    async fn fetch(
        &self,
        document: &SourceDocument,
    ) -> Result<Option<TransactionSnapshot>, WorkflowError>;
}

/// In-memory gateway used in development and tests.
#[derive(Debug, Default)]
pub struct InMemoryTransactionGateway {
    documents: DashMap<DocumentId, TransactionSnapshot>,
}

impl InMemoryTransactionGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a snapshot the gateway will serve.
    pub fn put(&self, snapshot: TransactionSnapshot) {
        self.documents.insert(snapshot.document.id, snapshot);
    }
}

#[async_trait]
impl TransactionGateway for InMemoryTransactionGateway {
    async fn fetch(
        &self,
        document: &SourceDocument,
    ) -> Result<Option<TransactionSnapshot>, WorkflowError> {
        Ok(self.documents.get(&document.id).map(|entry| entry.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelgate_core::workflow::WorkflowType;
    use fuelgate_shared::types::Currency;
    use rust_decimal_macros::dec;

    fn snapshot() -> TransactionSnapshot {
        TransactionSnapshot {
            document: SourceDocument {
                id: DocumentId::new(),
                kind: WorkflowType::DeliveryApproval,
            },
            amount: Money::new(dec!(12000), Currency::Usd),
            supplier_id: Some("SUP-9".to_string()),
            customer_id: None,
            product_category: Some("diesel".to_string()),
            credit_limit: Some(dec!(50000)),
            customer_rating: None,
            compliance_score: Some(dec!(88)),
            regulatory_ids: vec!["PERMIT-2".to_string()],
            counterparty_count: 1,
            extra: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_fetch_round_trip() {
        let gateway = InMemoryTransactionGateway::new();
        let snap = snapshot();
        let document = snap.document;
        gateway.put(snap);

        let fetched = gateway.fetch(&document).await.unwrap();
        assert!(fetched.is_some());

        let missing = SourceDocument {
            id: DocumentId::new(),
            kind: WorkflowType::DeliveryApproval,
        };
        assert!(gateway.fetch(&missing).await.unwrap().is_none());
    }

    #[test]
    fn test_context_carries_snapshot_values() {
        let snap = snapshot();
        let ctx = snap.evaluation_context();
        assert_eq!(ctx.amount, dec!(12000));
        assert_eq!(ctx.compliance_score, Some(dec!(88)));
        assert_eq!(ctx.product_category.as_deref(), Some("diesel"));
    }
}

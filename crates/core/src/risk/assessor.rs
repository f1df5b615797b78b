//! Table-driven risk scoring.
//!
//! Scoring is deterministic given its input: a fixed base per transaction
//! shape plus fixed weights per triggered factor, classified against
//! configurable thresholds.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::risk::types::{RiskAssessment, RiskFactor, RiskFactorKind, RiskLevel};
use crate::workflow::types::WorkflowType;

/// Threshold and trigger configuration for the assessor.
///
/// Boundaries live here rather than in the scoring code so deployments can
/// tune them without a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Scores above this value classify as high risk.
    pub high_score: u32,
    /// Scores above this value (and at or below `high_score`) classify as medium.
    pub medium_score: u32,
    /// Amounts above this value trigger the high-value factor.
    pub high_value_threshold: Decimal,
    /// Base score applied to bulk invoice runs.
    pub bulk_base_score: u32,
    /// Counterparty counts above this value trigger the fan-out factor.
    pub fan_out_threshold: u32,
    /// Compliance scores below this value trigger the compliance factor.
    pub compliance_floor: Decimal,
    /// Product categories subject to additional regulation.
    pub regulated_categories: Vec<String>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_score: 60,
            medium_score: 30,
            high_value_threshold: Decimal::new(100_000, 0),
            bulk_base_score: 15,
            fan_out_threshold: 50,
            compliance_floor: Decimal::new(70, 0),
            regulated_categories: vec![
                "aviation_fuel".to_string(),
                "lpg".to_string(),
                "kerosene".to_string(),
            ],
        }
    }
}

impl RiskConfig {
    /// Classifies a score against the configured thresholds.
    #[must_use]
    pub fn level_for(&self, score: u32) -> RiskLevel {
        if score > self.high_score {
            RiskLevel::High
        } else if score > self.medium_score {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Transaction attributes the assessor reads.
#[derive(Debug, Clone)]
pub struct RiskInput {
    /// The transaction domain.
    pub workflow_type: WorkflowType,
    /// Transaction amount in the functional currency.
    pub amount: Decimal,
    /// Product category of the underlying goods.
    pub product_category: Option<String>,
    /// Regulatory identifiers attached to the document.
    pub regulatory_ids: Vec<String>,
    /// Number of counterparties covered; above 1 only for bulk runs.
    pub counterparty_count: u32,
    /// Regulatory compliance score, when known.
    pub compliance_score: Option<Decimal>,
}

/// Stateless, deterministic risk assessor.
#[derive(Debug, Clone, Default)]
pub struct RiskAssessor {
    config: RiskConfig,
}

impl RiskAssessor {
    /// Creates an assessor with the given configuration.
    #[must_use]
    pub const fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Assesses a transaction.
    ///
    /// Bulk runs start from a nonzero base reflecting inherent coordination
    /// risk; every triggered factor adds its fixed weight.
    #[must_use]
    pub fn assess(&self, input: &RiskInput) -> RiskAssessment {
        let mut triggered: Vec<RiskFactorKind> = Vec::new();

        if input.amount > self.config.high_value_threshold {
            triggered.push(RiskFactorKind::HighValue);
        }

        if let Some(category) = &input.product_category {
            if self
                .config
                .regulated_categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(category))
            {
                triggered.push(RiskFactorKind::RegulatedProduct);
            }
        }

        // Deliveries and subsidy claims are the regulation-bound domains;
        // an invoice without identifiers is a bookkeeping matter instead.
        if input.regulatory_ids.is_empty()
            && matches!(
                input.workflow_type,
                WorkflowType::DeliveryApproval | WorkflowType::SubsidyClaim
            )
        {
            triggered.push(RiskFactorKind::MissingRegulatoryIds);
        }

        if input.counterparty_count > self.config.fan_out_threshold {
            triggered.push(RiskFactorKind::BulkFanOut);
        }

        if let Some(score) = input.compliance_score {
            if score < self.config.compliance_floor {
                triggered.push(RiskFactorKind::LowComplianceScore);
            }
        }

        let base = if input.workflow_type.is_bulk() {
            self.config.bulk_base_score
        } else {
            0
        };
        let score = base + triggered.iter().map(|k| k.weight()).sum::<u32>();

        let factors: Vec<RiskFactor> = triggered
            .iter()
            .map(|kind| RiskFactor {
                kind: *kind,
                severity: kind.severity(),
                impact: kind.impact().to_string(),
                likelihood: kind.likelihood(),
            })
            .collect();

        let mut mitigations: Vec<String> = Vec::new();
        for kind in &triggered {
            for action in kind.mitigations() {
                if !mitigations.iter().any(|m| m == action) {
                    mitigations.push((*action).to_string());
                }
            }
        }

        RiskAssessment {
            score,
            level: self.config.level_for(score),
            factors,
            mitigations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn input(workflow_type: WorkflowType, amount: Decimal) -> RiskInput {
        RiskInput {
            workflow_type,
            amount,
            product_category: Some("diesel".to_string()),
            regulatory_ids: vec!["PERMIT-1".to_string()],
            counterparty_count: 1,
            compliance_score: Some(dec!(90)),
        }
    }

    #[rstest]
    #[case(0, RiskLevel::Low)]
    #[case(30, RiskLevel::Low)]
    #[case(31, RiskLevel::Medium)]
    #[case(60, RiskLevel::Medium)]
    #[case(61, RiskLevel::High)]
    fn test_level_thresholds(#[case] score: u32, #[case] expected: RiskLevel) {
        assert_eq!(RiskConfig::default().level_for(score), expected);
    }

    #[test]
    fn test_clean_transaction_scores_zero() {
        let assessor = RiskAssessor::default();
        let assessment = assessor.assess(&input(WorkflowType::DeliveryApproval, dec!(5000)));
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.factors.is_empty());
        assert!(assessment.mitigations.is_empty());
    }

    #[test]
    fn test_high_value_triggers() {
        let assessor = RiskAssessor::default();
        let assessment = assessor.assess(&input(WorkflowType::DeliveryApproval, dec!(250000)));
        assert_eq!(assessment.score, 25);
        assert_eq!(assessment.factors.len(), 1);
        assert_eq!(assessment.factors[0].kind, RiskFactorKind::HighValue);
    }

    #[test]
    fn test_bulk_base_score() {
        let assessor = RiskAssessor::default();
        let assessment = assessor.assess(&input(WorkflowType::BulkInvoice, dec!(5000)));
        assert_eq!(assessment.score, 15);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn test_fan_out_factor() {
        let assessor = RiskAssessor::default();
        let mut i = input(WorkflowType::BulkInvoice, dec!(5000));
        i.counterparty_count = 120;
        let assessment = assessor.assess(&i);
        assert_eq!(assessment.score, 15 + 15);
        assert_eq!(assessment.factors[0].kind, RiskFactorKind::BulkFanOut);
    }

    #[test]
    fn test_missing_regulatory_ids_scoped_to_regulated_domains() {
        let assessor = RiskAssessor::default();

        let mut delivery = input(WorkflowType::DeliveryApproval, dec!(5000));
        delivery.regulatory_ids.clear();
        let assessment = assessor.assess(&delivery);
        assert!(assessment
            .factors
            .iter()
            .any(|f| f.kind == RiskFactorKind::MissingRegulatoryIds));

        let mut invoice = input(WorkflowType::SupplierInvoice, dec!(5000));
        invoice.regulatory_ids.clear();
        let assessment = assessor.assess(&invoice);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn test_regulated_category_case_insensitive() {
        let assessor = RiskAssessor::default();
        let mut i = input(WorkflowType::DeliveryApproval, dec!(5000));
        i.product_category = Some("LPG".to_string());
        let assessment = assessor.assess(&i);
        assert!(assessment
            .factors
            .iter()
            .any(|f| f.kind == RiskFactorKind::RegulatedProduct));
    }

    #[test]
    fn test_compound_factors_reach_high() {
        let assessor = RiskAssessor::default();
        let mut i = input(WorkflowType::DeliveryApproval, dec!(500000));
        i.product_category = Some("aviation_fuel".to_string());
        i.regulatory_ids.clear();
        i.compliance_score = Some(dec!(40));

        let assessment = assessor.assess(&i);
        // 25 + 20 + 30 + 20
        assert_eq!(assessment.score, 95);
        assert_eq!(assessment.level, RiskLevel::High);
        assert_eq!(assessment.factors.len(), 4);
    }

    #[test]
    fn test_mitigations_deduplicated() {
        let assessor = RiskAssessor::default();
        // HighValue and BulkFanOut share a mitigation.
        let mut i = input(WorkflowType::BulkInvoice, dec!(500000));
        i.counterparty_count = 200;

        let assessment = assessor.assess(&i);
        let senior = assessment
            .mitigations
            .iter()
            .filter(|m| m.contains("senior management"))
            .count();
        assert_eq!(senior, 1);
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let assessor = RiskAssessor::default();
        let i = input(WorkflowType::DeliveryApproval, dec!(250000));
        assert_eq!(assessor.assess(&i), assessor.assess(&i));
    }
}

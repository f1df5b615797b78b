//! Risk domain types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk classification derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Routine transaction.
    Low,
    /// Elevated attention recommended.
    Medium,
    /// Senior review recommended.
    High,
}

impl RiskLevel {
    /// Returns the string representation of the level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses a level from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How likely the risk factor is to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Likelihood {
    /// Rarely materializes.
    Unlikely,
    /// May materialize.
    Possible,
    /// Expected to materialize without mitigation.
    Likely,
}

/// The attribute of a transaction that triggered a risk factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorKind {
    /// Amount above the configured high-value threshold.
    HighValue,
    /// Product category subject to additional regulation.
    RegulatedProduct,
    /// Mandatory regulatory identifiers missing from the document.
    MissingRegulatoryIds,
    /// Bulk run fanning out to an unusually large number of counterparties.
    BulkFanOut,
    /// Compliance score below the configured floor.
    LowComplianceScore,
}

impl RiskFactorKind {
    /// Fixed score contribution of this factor.
    #[must_use]
    pub const fn weight(&self) -> u32 {
        match self {
            Self::HighValue => 25,
            Self::RegulatedProduct => 20,
            Self::MissingRegulatoryIds => 30,
            Self::BulkFanOut => 15,
            Self::LowComplianceScore => 20,
        }
    }

    /// Fixed severity classification of this factor.
    #[must_use]
    pub const fn severity(&self) -> RiskLevel {
        match self {
            Self::HighValue | Self::RegulatedProduct | Self::BulkFanOut => RiskLevel::Medium,
            Self::MissingRegulatoryIds | Self::LowComplianceScore => RiskLevel::High,
        }
    }

    /// Fixed likelihood classification of this factor.
    #[must_use]
    pub const fn likelihood(&self) -> Likelihood {
        match self {
            Self::HighValue | Self::BulkFanOut => Likelihood::Possible,
            Self::RegulatedProduct => Likelihood::Unlikely,
            Self::MissingRegulatoryIds | Self::LowComplianceScore => Likelihood::Likely,
        }
    }

    /// Description of the impact if the factor materializes.
    #[must_use]
    pub const fn impact(&self) -> &'static str {
        match self {
            Self::HighValue => "Material financial exposure on a single transaction",
            Self::RegulatedProduct => "Regulatory penalties for mishandled product",
            Self::MissingRegulatoryIds => "Transaction may be unlawful to fulfill",
            Self::BulkFanOut => "Errors replicate across many counterparties",
            Self::LowComplianceScore => "Counterparty has a history of compliance issues",
        }
    }

    /// Recommended mitigation actions for this factor.
    #[must_use]
    pub const fn mitigations(&self) -> &'static [&'static str] {
        match self {
            Self::HighValue => &[
                "Require senior management approval",
                "Verify counterparty payment capacity",
            ],
            Self::RegulatedProduct => &[
                "Verify handling certifications before release",
                "Attach product safety documentation",
            ],
            Self::MissingRegulatoryIds => &[
                "Obtain missing permits before fulfillment",
                "Escalate to the compliance officer",
            ],
            Self::BulkFanOut => &[
                "Sample-check individual invoices before posting",
                "Require senior management approval",
            ],
            Self::LowComplianceScore => &[
                "Escalate to the compliance officer",
                "Request an updated compliance attestation",
            ],
        }
    }
}

/// One triggered risk factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// What triggered the factor.
    pub kind: RiskFactorKind,
    /// Severity classification.
    pub severity: RiskLevel,
    /// Impact if the factor materializes.
    pub impact: String,
    /// How likely the factor is to materialize.
    pub likelihood: Likelihood,
}

/// Derived risk posture of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Sum of the base score and triggered factor weights.
    pub score: u32,
    /// Classification of the score against the configured thresholds.
    pub level: RiskLevel,
    /// Factors that triggered, in evaluation order.
    pub factors: Vec<RiskFactor>,
    /// Recommended mitigations, deduplicated across factors.
    pub mitigations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_round_trip() {
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
            assert_eq!(RiskLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(RiskLevel::parse("severe"), None);
    }

    #[test]
    fn test_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn test_every_factor_kind_has_mitigations() {
        for kind in [
            RiskFactorKind::HighValue,
            RiskFactorKind::RegulatedProduct,
            RiskFactorKind::MissingRegulatoryIds,
            RiskFactorKind::BulkFanOut,
            RiskFactorKind::LowComplianceScore,
        ] {
            assert!(!kind.mitigations().is_empty());
            assert!(!kind.impact().is_empty());
            assert!(kind.weight() > 0);
        }
    }
}

//! Typed approval-condition evaluation.
//!
//! Conditions compare a value read from a strongly-typed evaluation
//! context against a configured value. Every comparison that cannot be
//! performed (missing context value, mismatched types, non-collection
//! operand for `In`/`NotIn`) fails closed: the condition is NOT satisfied.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::workflow::error::WorkflowError;

/// The attribute a condition reads from the evaluation context.
///
/// A closed enumeration: an unknown or mistyped condition key is a
/// compile-time concern, not a runtime string lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKey {
    /// Transaction amount in the functional currency.
    Amount,
    /// Remaining credit limit of the counterparty.
    CreditLimit,
    /// Counterparty rating (higher is better).
    CustomerRating,
    /// Product category of the underlying goods.
    ProductCategory,
    /// Regulatory compliance score of the transaction.
    ComplianceScore,
}

impl ConditionKey {
    /// Returns the string representation of the key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::CreditLimit => "credit_limit",
            Self::CustomerRating => "customer_rating",
            Self::ProductCategory => "product_category",
            Self::ComplianceScore => "compliance_score",
        }
    }

    /// Parses a key from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "amount" => Some(Self::Amount),
            "credit_limit" => Some(Self::CreditLimit),
            "customer_rating" => Some(Self::CustomerRating),
            "product_category" => Some(Self::ProductCategory),
            "compliance_score" => Some(Self::ComplianceScore),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comparison operator applied between context value and configured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Equal.
    Eq,
    /// Not equal.
    Neq,
    /// Member of the configured collection.
    In,
    /// Not a member of the configured collection.
    NotIn,
}

impl Operator {
    /// Returns the string representation of the operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::In => "in",
            Self::NotIn => "not_in",
        }
    }

    /// Returns true for operators that require a collection operand.
    #[must_use]
    pub fn requires_collection(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Returns true for operators that require a numeric operand.
    #[must_use]
    pub fn requires_number(&self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A configured or context-derived comparison value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    /// A numeric value.
    Number(Decimal),
    /// A text value.
    Text(String),
    /// A collection, valid only as the operand of `In`/`NotIn`.
    List(Vec<ConditionValue>),
}

impl ConditionValue {
    /// Equality between a context value and a configured value.
    ///
    /// Text comparison is case-insensitive; cross-type comparison is never
    /// equal.
    #[must_use]
    fn loosely_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

/// One condition on a step or auto-approval rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalCondition {
    /// The context attribute to compare.
    pub key: ConditionKey,
    /// The comparison operator.
    pub operator: Operator,
    /// The configured comparison operand.
    pub value: ConditionValue,
    /// Optional human-readable description.
    pub description: Option<String>,
}

impl ApprovalCondition {
    /// Checks the condition is structurally sound.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Validation` when the operand type does not
    /// fit the operator (`In`/`NotIn` without a collection, ordering
    /// operators without a number).
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.operator.requires_collection() && !matches!(self.value, ConditionValue::List(_)) {
            return Err(WorkflowError::Validation(format!(
                "operator {} on {} requires a collection operand",
                self.operator, self.key
            )));
        }
        if self.operator.requires_number() && !matches!(self.value, ConditionValue::Number(_)) {
            return Err(WorkflowError::Validation(format!(
                "operator {} on {} requires a numeric operand",
                self.operator, self.key
            )));
        }
        if !self.operator.requires_collection() && matches!(self.value, ConditionValue::List(_)) {
            return Err(WorkflowError::Validation(format!(
                "operator {} on {} cannot take a collection operand",
                self.operator, self.key
            )));
        }
        Ok(())
    }

    /// Evaluates the condition against the context. Fails closed.
    #[must_use]
    pub fn evaluate(&self, ctx: &EvaluationContext) -> bool {
        let Some(actual) = ctx.get(self.key) else {
            return false;
        };

        match self.operator {
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                let (ConditionValue::Number(a), ConditionValue::Number(b)) =
                    (&actual, &self.value)
                else {
                    return false;
                };
                match self.operator {
                    Operator::Gt => a > b,
                    Operator::Gte => a >= b,
                    Operator::Lt => a < b,
                    Operator::Lte => a <= b,
                    _ => unreachable!(),
                }
            }
            Operator::Eq => actual.loosely_equals(&self.value),
            // Cross-type operands are configuration mistakes; they fail
            // closed rather than counting as "not equal".
            Operator::Neq => match (&actual, &self.value) {
                (ConditionValue::Number(_), ConditionValue::Number(_))
                | (ConditionValue::Text(_), ConditionValue::Text(_)) => {
                    !actual.loosely_equals(&self.value)
                }
                _ => false,
            },
            Operator::In => match &self.value {
                ConditionValue::List(members) => {
                    members.iter().any(|m| actual.loosely_equals(m))
                }
                _ => false,
            },
            Operator::NotIn => match &self.value {
                ConditionValue::List(members) => {
                    members.iter().all(|m| !actual.loosely_equals(m))
                }
                _ => false,
            },
        }
    }
}

/// Strongly-typed snapshot of the transaction attributes conditions can read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Transaction amount in the functional currency.
    pub amount: Decimal,
    /// Remaining credit limit of the counterparty, when known.
    pub credit_limit: Option<Decimal>,
    /// Counterparty rating, when known.
    pub customer_rating: Option<Decimal>,
    /// Product category of the underlying goods, when known.
    pub product_category: Option<String>,
    /// Regulatory compliance score, when known.
    pub compliance_score: Option<Decimal>,
}

impl EvaluationContext {
    /// Reads the context value for a condition key.
    #[must_use]
    pub fn get(&self, key: ConditionKey) -> Option<ConditionValue> {
        match key {
            ConditionKey::Amount => Some(ConditionValue::Number(self.amount)),
            ConditionKey::CreditLimit => self.credit_limit.map(ConditionValue::Number),
            ConditionKey::CustomerRating => self.customer_rating.map(ConditionValue::Number),
            ConditionKey::ProductCategory => self
                .product_category
                .clone()
                .map(ConditionValue::Text),
            ConditionKey::ComplianceScore => self.compliance_score.map(ConditionValue::Number),
        }
    }
}

/// Evaluates a condition list with AND semantics.
///
/// An empty list is vacuously satisfied. OR semantics are expressed as
/// multiple rules or multiple steps, never inside one list.
#[must_use]
pub fn evaluate_all(conditions: &[ApprovalCondition], ctx: &EvaluationContext) -> bool {
    conditions.iter().all(|c| c.evaluate(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ctx() -> EvaluationContext {
        EvaluationContext {
            amount: dec!(5000),
            credit_limit: Some(dec!(20000)),
            customer_rating: Some(dec!(4)),
            product_category: Some("diesel".to_string()),
            compliance_score: Some(dec!(85)),
        }
    }

    fn number_condition(key: ConditionKey, op: Operator, value: Decimal) -> ApprovalCondition {
        ApprovalCondition {
            key,
            operator: op,
            value: ConditionValue::Number(value),
            description: None,
        }
    }

    #[test]
    fn test_empty_list_is_satisfied() {
        assert!(evaluate_all(&[], &ctx()));
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(number_condition(ConditionKey::Amount, Operator::Gt, dec!(4999)).evaluate(&ctx()));
        assert!(number_condition(ConditionKey::Amount, Operator::Gte, dec!(5000)).evaluate(&ctx()));
        assert!(number_condition(ConditionKey::Amount, Operator::Lt, dec!(5001)).evaluate(&ctx()));
        assert!(number_condition(ConditionKey::Amount, Operator::Lte, dec!(5000)).evaluate(&ctx()));
        assert!(!number_condition(ConditionKey::Amount, Operator::Gt, dec!(5000)).evaluate(&ctx()));
    }

    #[test]
    fn test_equality() {
        assert!(number_condition(ConditionKey::ComplianceScore, Operator::Eq, dec!(85))
            .evaluate(&ctx()));
        assert!(number_condition(ConditionKey::ComplianceScore, Operator::Neq, dec!(90))
            .evaluate(&ctx()));
    }

    #[test]
    fn test_text_equality_is_case_insensitive() {
        let cond = ApprovalCondition {
            key: ConditionKey::ProductCategory,
            operator: Operator::Eq,
            value: ConditionValue::Text("Diesel".to_string()),
            description: None,
        };
        assert!(cond.evaluate(&ctx()));
    }

    #[test]
    fn test_missing_context_value_fails_closed() {
        let mut context = ctx();
        context.credit_limit = None;
        let cond = number_condition(ConditionKey::CreditLimit, Operator::Gt, dec!(1));
        assert!(!cond.evaluate(&context));

        // NotIn also fails closed on a missing value.
        let cond = ApprovalCondition {
            key: ConditionKey::CreditLimit,
            operator: Operator::NotIn,
            value: ConditionValue::List(vec![ConditionValue::Number(dec!(1))]),
            description: None,
        };
        assert!(!cond.evaluate(&context));
    }

    #[test]
    fn test_cross_type_comparison_fails_closed() {
        let cond = ApprovalCondition {
            key: ConditionKey::ProductCategory,
            operator: Operator::Neq,
            value: ConditionValue::Number(dec!(1)),
            description: None,
        };
        assert!(!cond.evaluate(&ctx()));
    }

    #[test]
    fn test_in_membership() {
        let cond = ApprovalCondition {
            key: ConditionKey::ProductCategory,
            operator: Operator::In,
            value: ConditionValue::List(vec![
                ConditionValue::Text("petrol".to_string()),
                ConditionValue::Text("diesel".to_string()),
            ]),
            description: None,
        };
        assert!(cond.evaluate(&ctx()));

        let cond = ApprovalCondition {
            key: ConditionKey::ProductCategory,
            operator: Operator::NotIn,
            value: ConditionValue::List(vec![ConditionValue::Text("lpg".to_string())]),
            description: None,
        };
        assert!(cond.evaluate(&ctx()));
    }

    #[test]
    fn test_in_without_collection_fails_closed() {
        let cond = ApprovalCondition {
            key: ConditionKey::ProductCategory,
            operator: Operator::In,
            value: ConditionValue::Text("diesel".to_string()),
            description: None,
        };
        assert!(!cond.evaluate(&ctx()));
        assert!(cond.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_ordering_on_text() {
        let cond = ApprovalCondition {
            key: ConditionKey::ProductCategory,
            operator: Operator::Gt,
            value: ConditionValue::Text("diesel".to_string()),
            description: None,
        };
        assert!(cond.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_list_on_scalar_operator() {
        let cond = ApprovalCondition {
            key: ConditionKey::Amount,
            operator: Operator::Eq,
            value: ConditionValue::List(vec![]),
            description: None,
        };
        assert!(cond.validate().is_err());
    }

    #[test]
    fn test_and_semantics() {
        let conditions = vec![
            number_condition(ConditionKey::Amount, Operator::Lt, dec!(10000)),
            number_condition(ConditionKey::ComplianceScore, Operator::Gte, dec!(80)),
        ];
        assert!(evaluate_all(&conditions, &ctx()));

        let conditions = vec![
            number_condition(ConditionKey::Amount, Operator::Lt, dec!(10000)),
            number_condition(ConditionKey::ComplianceScore, Operator::Gte, dec!(90)),
        ];
        assert!(!evaluate_all(&conditions, &ctx()));
    }
}

//! Property-based tests for condition evaluation.
//!
//! These tests validate fail-closed behavior and operator algebra using
//! proptest for randomized input generation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::workflow::condition::{
    ApprovalCondition, ConditionKey, ConditionValue, EvaluationContext, Operator, evaluate_all,
};

/// Strategy for generating plain decimal values.
fn arb_decimal() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for generating evaluation contexts with a mix of present and
/// absent optional values.
fn arb_context() -> impl Strategy<Value = EvaluationContext> {
    (
        arb_decimal(),
        proptest::option::of(arb_decimal()),
        proptest::option::of(arb_decimal()),
        proptest::option::of("[a-z]{3,10}"),
        proptest::option::of(arb_decimal()),
    )
        .prop_map(
            |(amount, credit_limit, customer_rating, product_category, compliance_score)| {
                EvaluationContext {
                    amount,
                    credit_limit,
                    customer_rating,
                    product_category,
                    compliance_score,
                }
            },
        )
}

fn amount_condition(operator: Operator, value: Decimal) -> ApprovalCondition {
    ApprovalCondition {
        key: ConditionKey::Amount,
        operator,
        value: ConditionValue::Number(value),
        description: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// An empty condition list is satisfied under every context.
    #[test]
    fn prop_empty_list_always_satisfied(ctx in arb_context()) {
        prop_assert!(evaluate_all(&[], &ctx));
    }

    /// Gt and Lte partition the number line for an always-present key.
    #[test]
    fn prop_gt_lte_are_complements(ctx in arb_context(), threshold in arb_decimal()) {
        let gt = amount_condition(Operator::Gt, threshold).evaluate(&ctx);
        let lte = amount_condition(Operator::Lte, threshold).evaluate(&ctx);
        prop_assert_ne!(gt, lte);
    }

    /// Eq and Neq are complements for same-typed operands.
    #[test]
    fn prop_eq_neq_are_complements(ctx in arb_context(), value in arb_decimal()) {
        let eq = amount_condition(Operator::Eq, value).evaluate(&ctx);
        let neq = amount_condition(Operator::Neq, value).evaluate(&ctx);
        prop_assert_ne!(eq, neq);
    }

    /// In and NotIn are complements when the context value is present.
    #[test]
    fn prop_in_not_in_are_complements(
        ctx in arb_context(),
        members in proptest::collection::vec(arb_decimal(), 0..5),
    ) {
        let list = ConditionValue::List(members.into_iter().map(ConditionValue::Number).collect());
        let contained = ApprovalCondition {
            key: ConditionKey::Amount,
            operator: Operator::In,
            value: list.clone(),
            description: None,
        }
        .evaluate(&ctx);
        let excluded = ApprovalCondition {
            key: ConditionKey::Amount,
            operator: Operator::NotIn,
            value: list,
            description: None,
        }
        .evaluate(&ctx);
        prop_assert_ne!(contained, excluded);
    }

    /// A missing context value fails every operator closed.
    #[test]
    fn prop_missing_value_fails_closed(amount in arb_decimal(), threshold in arb_decimal()) {
        let ctx = EvaluationContext {
            amount,
            ..EvaluationContext::default()
        };
        for operator in [
            Operator::Gt,
            Operator::Gte,
            Operator::Lt,
            Operator::Lte,
            Operator::Eq,
            Operator::Neq,
        ] {
            let condition = ApprovalCondition {
                key: ConditionKey::CreditLimit,
                operator,
                value: ConditionValue::Number(threshold),
                description: None,
            };
            prop_assert!(!condition.evaluate(&ctx));
        }
    }

    /// A list evaluates satisfied exactly when every member does.
    #[test]
    fn prop_and_semantics(
        ctx in arb_context(),
        thresholds in proptest::collection::vec(arb_decimal(), 1..5),
    ) {
        let conditions: Vec<ApprovalCondition> = thresholds
            .into_iter()
            .map(|t| amount_condition(Operator::Gte, t))
            .collect();
        let expected = conditions.iter().all(|c| c.evaluate(&ctx));
        prop_assert_eq!(evaluate_all(&conditions, &ctx), expected);
    }

    /// Collection operators with a scalar operand never satisfy.
    #[test]
    fn prop_scalar_operand_for_in_fails_closed(ctx in arb_context(), value in arb_decimal()) {
        for operator in [Operator::In, Operator::NotIn] {
            let condition = ApprovalCondition {
                key: ConditionKey::Amount,
                operator,
                value: ConditionValue::Number(value),
                description: None,
            };
            prop_assert!(!condition.evaluate(&ctx));
            prop_assert!(condition.validate().is_err());
        }
    }
}

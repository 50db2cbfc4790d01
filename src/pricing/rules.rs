//! Rule engine for configuration stored as JSON documents.
//!
//! Conditions, price formulas and SKU selection rules live in JSONB columns
//! of the catalog (`SelectionRules`, `PricingFormula`, `RelatedSetupSKUs`,
//! module `setupSKUs`). Everything here is pure: a rule document plus a
//! JSON context in, a decision or a price out.

use rust_decimal::prelude::*;
use serde_json::Value;

use crate::form::value_to_decimal;
use crate::pricing::expr;

/// Look up a dot-separated path; `null` counts as absent
pub fn lookup<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = ctx;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}

fn lookup_decimal(ctx: &Value, path: &str) -> Option<Decimal> {
    lookup(ctx, path).and_then(value_to_decimal)
}

/// Equality that treats 75000 and 75000.0 as the same number
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => value_to_decimal(a) == value_to_decimal(b),
        _ => a == b,
    }
}

fn compare(cond: &Value, ctx: &Value, test: fn(Decimal, Decimal) -> bool) -> bool {
    let path = cond.get("parameter").and_then(Value::as_str).unwrap_or("");
    let actual = lookup_decimal(ctx, path);
    let threshold = cond.get("value").and_then(value_to_decimal);
    match (actual, threshold) {
        (Some(a), Some(t)) => test(a, t),
        _ => false,
    }
}

/// Evaluate a condition document against `ctx`. Unknown types are false.
pub fn evaluate_condition(cond: &Value, ctx: &Value) -> bool {
    let path = cond.get("parameter").and_then(Value::as_str).unwrap_or("");

    match cond.get("type").and_then(Value::as_str) {
        Some("always") => return true,
        Some("never") => return false,
        Some("parameter_equals") => {
            let expected = cond.get("value").unwrap_or(&Value::Null);
            return match lookup(ctx, path) {
                Some(actual) => values_equal(actual, expected),
                None => expected.is_null(),
            };
        }
        Some("parameter_not_equals") => {
            let expected = cond.get("value").unwrap_or(&Value::Null);
            return match lookup(ctx, path) {
                Some(actual) => !values_equal(actual, expected),
                None => !expected.is_null(),
            };
        }
        Some("parameter_in") => {
            let Some(actual) = lookup(ctx, path) else {
                return false;
            };
            return cond
                .get("values")
                .and_then(Value::as_array)
                .is_some_and(|values| values.iter().any(|v| values_equal(actual, v)));
        }
        Some("parameter_greater_than") => return compare(cond, ctx, |a, t| a > t),
        Some("parameter_less_than") => return compare(cond, ctx, |a, t| a < t),
        Some("parameter_between") => {
            let Some(actual) = lookup_decimal(ctx, path) else {
                return false;
            };
            let bound = |key: &str| match cond.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => value_to_decimal(v).map(Some).ok_or(()),
            };
            return match (bound("min"), bound("max")) {
                (Ok(min), Ok(max)) => {
                    min.map_or(true, |m| actual >= m) && max.map_or(true, |m| actual <= m)
                }
                _ => false,
            };
        }
        Some("parameter_exists") => return lookup(ctx, path).is_some(),
        _ => {}
    }

    match cond.get("operator").and_then(Value::as_str) {
        Some(op @ ("AND" | "OR")) => {
            let conditions = cond
                .get("conditions")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            evaluate_all(op, conditions, ctx)
        }
        _ => false,
    }
}

/// Combine conditions with AND / OR; an empty list holds
pub fn evaluate_all(operator: &str, conditions: &[Value], ctx: &Value) -> bool {
    if conditions.is_empty() {
        return true;
    }
    if operator == "OR" {
        conditions.iter().any(|c| evaluate_condition(c, ctx))
    } else {
        conditions.iter().all(|c| evaluate_condition(c, ctx))
    }
}

fn decimal_field(formula: &Value, key: &str) -> Decimal {
    formula
        .get(key)
        .and_then(value_to_decimal)
        .unwrap_or(Decimal::ZERO)
}

/// Price a formula document (`fixed`, `quantity_based`, `tiered`, `calculated`).
/// Unknown formula types and evaluation errors price at zero.
pub fn calculate_price(formula: &Value, ctx: &Value) -> Decimal {
    match formula.get("type").and_then(Value::as_str) {
        Some("fixed") => decimal_field(formula, "price"),

        Some("quantity_based") => {
            let path = formula
                .get("quantityParameter")
                .and_then(Value::as_str)
                .unwrap_or("");
            let quantity = lookup_decimal(ctx, path).unwrap_or(Decimal::ZERO);
            decimal_field(formula, "pricePerUnit")
                .checked_mul(quantity)
                .unwrap_or_else(|| {
                    tracing::debug!("quantity_based price overflowed for '{}'", path);
                    Decimal::ZERO
                })
        }

        Some("tiered") => {
            let path = formula
                .get("volumeParameter")
                .and_then(Value::as_str)
                .unwrap_or("");
            let volume = lookup_decimal(ctx, path).unwrap_or(Decimal::ZERO);

            let tiers = formula
                .get("tiers")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for tier in tiers {
                let min = decimal_field(tier, "minVolume");
                let max = tier.get("maxVolume").and_then(value_to_decimal);
                if volume >= min && max.map_or(true, |m| volume <= m) {
                    return decimal_field(tier, "price");
                }
            }
            decimal_field(formula, "basePrice")
        }

        Some("calculated") => {
            let expression = formula.get("formula").and_then(Value::as_str).unwrap_or("");
            let variables = formula.get("variables").and_then(Value::as_object);
            let resolve = |name: &str| {
                let path = variables?.get(name)?.as_str()?;
                Some(lookup_decimal(ctx, path).unwrap_or(Decimal::ZERO))
            };
            match expr::evaluate(expression, &resolve) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!("calculated formula '{}' failed: {}", expression, e);
                    Decimal::ZERO
                }
            }
        }

        _ => Decimal::ZERO,
    }
}

/// Result of a matched SKU selection rule
#[derive(Debug, Clone, PartialEq)]
pub struct SkuSelection {
    pub sku_code: String,
    pub quantity: i64,
    pub reason: Option<String>,
}

/// Evaluate `{condition, skuCode, quantity, reason}`. A missing condition
/// reads as `{}`, which never holds; rules meant to fire unconditionally
/// say `{"type": "always"}`.
///
/// `quantity` is a number or a parameter path; missing, zero or
/// unparseable quantities fall back to 1.
pub fn evaluate_sku_rule(rule: &Value, ctx: &Value) -> Option<SkuSelection> {
    let empty = Value::Object(Default::default());
    if !evaluate_condition(rule.get("condition").unwrap_or(&empty), ctx) {
        return None;
    }

    let sku_code = rule.get("skuCode").and_then(Value::as_str)?.to_string();

    let quantity = match rule.get("quantity") {
        Some(Value::String(path)) => lookup_decimal(ctx, path)
            .and_then(|q| q.trunc().to_i64())
            .unwrap_or(1),
        Some(v) => value_to_decimal(v)
            .and_then(|q| q.trunc().to_i64())
            .filter(|q| *q != 0)
            .unwrap_or(1),
        None => 1,
    };

    Some(SkuSelection {
        sku_code,
        quantity,
        reason: rule
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn ctx() -> Value {
        json!({
            "base_product": "standard",
            "additional_users": 3,
            "modules": {
                "check_recognition": {"enabled": true, "is_new": true, "scan_volume": 75000},
                "revenue_submission": {"enabled": false, "num_submitters": "15"}
            }
        })
    }

    #[test]
    fn test_lookup_paths() {
        let c = ctx();
        assert_eq!(
            lookup(&c, "modules.check_recognition.scan_volume"),
            Some(&json!(75000))
        );
        assert_eq!(lookup(&c, "modules.missing.enabled"), None);
        assert_eq!(lookup(&c, "additional_users.deeper"), None);
        assert_eq!(lookup(&c, ""), None);
    }

    #[test]
    fn test_simple_conditions() {
        let c = ctx();
        assert!(evaluate_condition(&json!({"type": "always"}), &c));
        assert!(!evaluate_condition(&json!({"type": "never"}), &c));
        assert!(evaluate_condition(
            &json!({"type": "parameter_equals", "parameter": "modules.check_recognition.enabled", "value": true}),
            &c
        ));
        assert!(evaluate_condition(
            &json!({"type": "parameter_equals", "parameter": "additional_users", "value": 3.0}),
            &c
        ));
        assert!(evaluate_condition(
            &json!({"type": "parameter_not_equals", "parameter": "base_product", "value": "basic"}),
            &c
        ));
        assert!(evaluate_condition(
            &json!({"type": "parameter_in", "parameter": "base_product", "values": ["standard", "basic"]}),
            &c
        ));
        assert!(evaluate_condition(
            &json!({"type": "parameter_exists", "parameter": "modules.check_recognition"}),
            &c
        ));
        assert!(!evaluate_condition(&json!({"type": "made_up"}), &c));
    }

    #[test]
    fn test_numeric_conditions() {
        let c = ctx();
        assert!(evaluate_condition(
            &json!({"type": "parameter_greater_than", "parameter": "additional_users", "value": 0}),
            &c
        ));
        assert!(evaluate_condition(
            &json!({"type": "parameter_less_than", "parameter": "modules.revenue_submission.num_submitters", "value": 20}),
            &c
        ));
        assert!(!evaluate_condition(
            &json!({"type": "parameter_greater_than", "parameter": "nope", "value": 0}),
            &c
        ));
        assert!(evaluate_condition(
            &json!({"type": "parameter_between", "parameter": "modules.check_recognition.scan_volume", "min": 50001}),
            &c
        ));
        assert!(!evaluate_condition(
            &json!({"type": "parameter_between", "parameter": "modules.check_recognition.scan_volume", "min": 0, "max": 50000}),
            &c
        ));
    }

    #[test]
    fn test_compound_conditions() {
        let c = ctx();
        let and = json!({"operator": "AND", "conditions": [
            {"type": "always"},
            {"type": "parameter_equals", "parameter": "modules.revenue_submission.enabled", "value": true}
        ]});
        let or = json!({"operator": "OR", "conditions": [
            {"type": "never"},
            {"type": "parameter_equals", "parameter": "base_product", "value": "standard"}
        ]});
        assert!(!evaluate_condition(&and, &c));
        assert!(evaluate_condition(&or, &c));
        assert!(evaluate_condition(&json!({"operator": "AND", "conditions": []}), &c));
    }

    #[test]
    fn test_price_formulas() {
        let c = ctx();
        assert_eq!(
            calculate_price(&json!({"type": "fixed", "price": 2950.00}), &c),
            dec!(2950)
        );
        assert_eq!(
            calculate_price(
                &json!({"type": "quantity_based", "pricePerUnit": 60, "quantityParameter": "additional_users"}),
                &c
            ),
            dec!(180)
        );
        assert_eq!(
            calculate_price(
                &json!({"type": "quantity_based", "pricePerUnit": 60, "quantityParameter": "nothing"}),
                &c
            ),
            dec!(0)
        );
        assert_eq!(calculate_price(&json!({"type": "bogus"}), &c), dec!(0));
    }

    #[test]
    fn test_tiered_formula() {
        let c = ctx();
        let formula = json!({
            "type": "tiered",
            "volumeParameter": "modules.check_recognition.scan_volume",
            "tiers": [
                {"minVolume": 0, "maxVolume": 50000, "price": 1030.00},
                {"minVolume": 50001, "maxVolume": null, "price": 1500.00}
            ],
            "basePrice": 999
        });
        assert_eq!(calculate_price(&formula, &c), dec!(1500));

        let gap = json!({
            "type": "tiered",
            "volumeParameter": "additional_users",
            "tiers": [{"minVolume": 10, "maxVolume": 20, "price": 5}],
            "basePrice": 42
        });
        assert_eq!(calculate_price(&gap, &c), dec!(42));
    }

    #[test]
    fn test_calculated_formula() {
        let c = ctx();
        let formula = json!({
            "type": "calculated",
            "formula": "users * 60 + 100",
            "variables": {"users": "additional_users"}
        });
        assert_eq!(calculate_price(&formula, &c), dec!(280));

        let missing = json!({
            "type": "calculated",
            "formula": "users * 60 + 100",
            "variables": {"users": "not.there"}
        });
        assert_eq!(calculate_price(&missing, &c), dec!(100));

        let broken = json!({"type": "calculated", "formula": "1 / 0", "variables": {}});
        assert_eq!(calculate_price(&broken, &c), dec!(0));
    }

    #[test]
    fn test_sku_rules() {
        let c = ctx();
        let rule = json!({
            "condition": {"type": "parameter_equals", "parameter": "modules.check_recognition.is_new", "value": true},
            "skuCode": "CHECK-ICL-SETUP",
            "quantity": 1,
            "reason": "Initial setup for Check Recognition"
        });
        let selected = evaluate_sku_rule(&rule, &c).unwrap();
        assert_eq!(selected.sku_code, "CHECK-ICL-SETUP");
        assert_eq!(selected.quantity, 1);
        assert_eq!(
            selected.reason.as_deref(),
            Some("Initial setup for Check Recognition")
        );

        let by_param = json!({
            "condition": {"type": "always"},
            "skuCode": "REV-SUB-TEMPLATE-BLOCK",
            "quantity": "modules.revenue_submission.num_submitters"
        });
        assert_eq!(evaluate_sku_rule(&by_param, &c).unwrap().quantity, 15);

        let missing_param = json!({"condition": {"type": "always"}, "skuCode": "X", "quantity": "nope"});
        assert_eq!(evaluate_sku_rule(&missing_param, &c).unwrap().quantity, 1);

        let not_matched = json!({"condition": {"type": "never"}, "skuCode": "X"});
        assert_eq!(evaluate_sku_rule(&not_matched, &c), None);
    }

    #[test]
    fn test_sku_rule_without_condition_never_fires() {
        let c = ctx();
        assert_eq!(evaluate_sku_rule(&json!({"skuCode": "ORG-SETUP-BASIC"}), &c), None);
        assert_eq!(
            evaluate_sku_rule(&json!({"condition": {}, "skuCode": "ORG-SETUP-BASIC"}), &c),
            None
        );
    }

    #[test]
    fn test_quantity_based_overflow_prices_zero() {
        let c = json!({"volume": "79228162514264337593543950335"});
        let formula = json!({"type": "quantity_based", "pricePerUnit": 60, "quantityParameter": "volume"});
        assert_eq!(calculate_price(&formula, &c), dec!(0));
    }
}

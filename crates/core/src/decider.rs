//! Decider — spec §4.B.
//!
//! A declarative, ordered sequence of conditions evaluated against a
//! step's output map. First match wins; if nothing matches, the default
//! target is chosen (which may be absent, meaning "keep the static
//! edges").

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Contains,
    /// Any operator string this engine doesn't recognise. Per spec,
    /// evaluating it must return `false`, never raise.
    #[serde(other)]
    Unknown,
}

impl Operator {
    fn eval(self, actual: &Value, expected: &Value) -> bool {
        match self {
            Operator::Eq => loose_eq(actual, expected),
            Operator::Ne => !loose_eq(actual, expected),
            Operator::StrictEq => actual == expected,
            Operator::StrictNe => actual != expected,
            Operator::Lt => compare(actual, expected) == Some(Ordering::Less),
            Operator::Le => matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal)),
            Operator::Gt => compare(actual, expected) == Some(Ordering::Greater),
            Operator::Ge => matches!(compare(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
            Operator::In => expected
                .as_array()
                .map(|items| items.iter().any(|item| loose_eq(actual, item)))
                .unwrap_or(false),
            Operator::Contains => match (actual.as_str(), expected.as_str()) {
                (Some(haystack), Some(needle)) => haystack.contains(needle),
                _ => false,
            },
            Operator::Unknown => false,
        }
    }
}

/// `5 == "5"` and `true == "true"` compare equal; otherwise falls back to
/// strict JSON equality. This is the one coercion rule the spec leaves
/// unspecified beyond naming it "implicit numeric/string coercion".
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (scalar_to_string(a), scalar_to_string(b)) {
        (Some(sa), Some(sb)) => sa == sb,
        _ => false,
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric comparison when both sides are numbers, lexical when both are
/// strings, `None` (never matches an ordering operator) otherwise.
fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match (actual.as_str(), expected.as_str()) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            _ => None,
        },
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub key: String,
    pub operator: Operator,
    pub expected: Value,
    pub next_step_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Decider {
    pub conditions: Vec<Condition>,
    pub default: Option<String>,
}

impl Decider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(mut self, key: impl Into<String>, operator: Operator, expected: Value, next_step_id: impl Into<String>) -> Self {
        self.conditions.push(Condition {
            key: key.into(),
            operator,
            expected,
            next_step_id: next_step_id.into(),
        });
        self
    }

    pub fn otherwise(mut self, next_step_id: impl Into<String>) -> Self {
        self.default = Some(next_step_id.into());
        self
    }

    /// Evaluate against a step's output map. Missing keys resolve to
    /// `null`. Returns the chosen next step id, or `None` if nothing
    /// matched and no default is set ("proceed with static edges").
    pub fn evaluate(&self, output: &Value) -> Option<String> {
        for condition in &self.conditions {
            let actual = output.get(&condition.key).cloned().unwrap_or(Value::Null);
            if condition.operator.eval(&actual, &condition.expected) {
                return Some(condition.next_step_id.clone());
            }
        }
        self.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_match_wins() {
        let decider = Decider::new()
            .when("score", Operator::Ge, json!(0.8), "high")
            .when("score", Operator::Ge, json!(0.5), "medium")
            .otherwise("low");

        assert_eq!(decider.evaluate(&json!({"score": 0.9})), Some("high".into()));
        assert_eq!(decider.evaluate(&json!({"score": 0.6})), Some("medium".into()));
        assert_eq!(decider.evaluate(&json!({"score": 0.1})), Some("low".into()));
    }

    #[test]
    fn missing_key_resolves_to_null() {
        let decider = Decider::new().when("missing", Operator::StrictEq, Value::Null, "target");
        assert_eq!(decider.evaluate(&json!({})), Some("target".into()));
    }

    #[test]
    fn loose_equality_coerces_numeric_and_string() {
        let decider = Decider::new().when("code", Operator::Eq, json!("5"), "matched");
        assert_eq!(decider.evaluate(&json!({"code": 5})), Some("matched".into()));
    }

    #[test]
    fn strict_equality_does_not_coerce() {
        let decider = Decider::new()
            .when("code", Operator::StrictEq, json!("5"), "matched")
            .otherwise("fallback");
        assert_eq!(decider.evaluate(&json!({"code": 5})), Some("fallback".into()));
    }

    #[test]
    fn unknown_operator_never_matches_and_never_panics() {
        let raw = json!({
            "conditions": [{"key": "x", "operator": "frobnicate", "expected": 1, "next_step_id": "n"}],
            "default": "fallback"
        });
        let decider: Decider = serde_json::from_value(raw).unwrap();
        assert_eq!(decider.evaluate(&json!({"x": 1})), Some("fallback".into()));
    }

    #[test]
    fn no_match_and_no_default_keeps_static_edges() {
        let decider = Decider::new().when("x", Operator::Eq, json!(1), "n");
        assert_eq!(decider.evaluate(&json!({"x": 2})), None);
    }

    #[test]
    fn contains_operator_checks_substring() {
        let decider = Decider::new().when("msg", Operator::Contains, json!("err"), "failed");
        assert_eq!(decider.evaluate(&json!({"msg": "an error occurred"})), Some("failed".into()));
    }

    #[test]
    fn in_operator_checks_membership() {
        let decider = Decider::new().when("code", Operator::In, json!([1, 2, 3]), "known");
        assert_eq!(decider.evaluate(&json!({"code": 2})), Some("known".into()));
        assert_eq!(decider.evaluate(&json!({"code": 9})), None);
    }
}

//! # Filter Operators
//!
//! A [`FilterOperator`] pairs a token (`EQ`, `LIKE`, `GE`, ...) with its comparison semantics.
//! The [`FilterOperatorRegistry`] maps tokens to operators and holds exactly one default
//! operator, used whenever a filter omits its operator.
//!
//! A registry is built once during startup and shared read-only behind an `Arc`. Several
//! registries may coexist, for example to restrict the operators a single resource type
//! accepts (see [`QueryTranslator::with_registry_for`](crate::QueryTranslator::with_registry_for)).

use crate::error::QueryError;
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Comparison function: `(actual, expected) -> matches`.
pub type Matcher = fn(&Value, &Value) -> bool;

/// A filter operator. Two operators are equal when their tokens are equal.
#[derive(Clone)]
pub struct FilterOperator {
    token: Cow<'static, str>,
    matcher: Matcher,
}

impl FilterOperator {
    pub const EQ: FilterOperator = FilterOperator::builtin("EQ", matches_eq);
    pub const NEQ: FilterOperator = FilterOperator::builtin("NEQ", matches_neq);
    pub const LIKE: FilterOperator = FilterOperator::builtin("LIKE", matches_like);
    pub const LT: FilterOperator = FilterOperator::builtin("LT", matches_lt);
    pub const LE: FilterOperator = FilterOperator::builtin("LE", matches_le);
    pub const GT: FilterOperator = FilterOperator::builtin("GT", matches_gt);
    pub const GE: FilterOperator = FilterOperator::builtin("GE", matches_ge);

    const fn builtin(token: &'static str, matcher: Matcher) -> Self {
        Self {
            token: Cow::Borrowed(token),
            matcher,
        }
    }

    /// Creates a custom operator. Tokens are case-insensitive and stored upper case.
    pub fn new(token: impl AsRef<str>, matcher: Matcher) -> Self {
        Self {
            token: Cow::Owned(normalize(token.as_ref())),
            matcher,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Applies the operator to an actual field value and the filter's expected value.
    pub fn matches(&self, actual: &Value, expected: &Value) -> bool {
        (self.matcher)(actual, expected)
    }
}

impl PartialEq for FilterOperator {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for FilterOperator {}

impl fmt::Debug for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilterOperator({})", self.token)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

fn normalize(token: &str) -> String {
    token.trim().to_ascii_uppercase()
}

/// Token table plus the single default operator.
#[derive(Debug, Clone)]
pub struct FilterOperatorRegistry {
    operators: BTreeMap<String, FilterOperator>,
    default: FilterOperator,
}

impl FilterOperatorRegistry {
    /// An empty registry: only the default operator's token resolves.
    pub fn new(default: FilterOperator) -> Self {
        Self {
            operators: BTreeMap::new(),
            default,
        }
    }

    /// All built-in operators registered, `EQ` as default.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new(FilterOperator::EQ);
        for operator in [
            FilterOperator::EQ,
            FilterOperator::NEQ,
            FilterOperator::LIKE,
            FilterOperator::LT,
            FilterOperator::LE,
            FilterOperator::GT,
            FilterOperator::GE,
        ] {
            registry.register(operator);
        }
        registry
    }

    /// Registers an operator, replacing any operator with the same token.
    pub fn register(&mut self, operator: FilterOperator) {
        self.operators.insert(operator.token().to_string(), operator);
    }

    /// Marks a token unsupported. The default operator's token keeps resolving.
    pub fn unregister(&mut self, token: &str) -> Option<FilterOperator> {
        self.operators.remove(&normalize(token))
    }

    /// Replaces the default operator.
    pub fn set_default(&mut self, operator: FilterOperator) {
        self.default = operator;
    }

    pub fn resolve_default(&self) -> &FilterOperator {
        &self.default
    }

    pub fn is_default(&self, operator: &FilterOperator) -> bool {
        self.default == *operator
    }

    pub fn supports(&self, token: &str) -> bool {
        self.resolve(token).is_ok()
    }

    /// Resolves a token. Tokens neither registered nor equal to the default are errors.
    pub fn resolve(&self, token: &str) -> Result<FilterOperator, QueryError> {
        let token = normalize(token);
        if let Some(operator) = self.operators.get(&token) {
            return Ok(operator.clone());
        }
        if self.default.token() == token {
            return Ok(self.default.clone());
        }
        Err(QueryError::UnsupportedOperator(token))
    }

    /// Resolves an optional token, falling back to the default.
    pub fn resolve_or_default(&self, token: Option<&str>) -> Result<FilterOperator, QueryError> {
        match token {
            Some(token) => self.resolve(token),
            None => Ok(self.default.clone()),
        }
    }
}

impl Default for FilterOperatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// --- Comparison semantics ---

/// Equality. An array of expected values means "any of"; an array of actual values (to-many
/// relationships) means "contains".
fn matches_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (_, Value::Array(candidates)) => candidates.iter().any(|c| matches_eq(actual, c)),
        (Value::Array(items), _) => items.iter().any(|item| values_equal(item, expected)),
        _ => values_equal(actual, expected),
    }
}

fn matches_neq(actual: &Value, expected: &Value) -> bool {
    !matches_eq(actual, expected)
}

/// Case-insensitive pattern match where `%` stands for any run of characters.
fn matches_like(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (_, Value::Array(patterns)) => patterns.iter().any(|p| matches_like(actual, p)),
        (Value::String(text), Value::String(pattern)) => {
            like(&text.to_lowercase(), &pattern.to_lowercase())
        }
        _ => false,
    }
}

fn matches_lt(actual: &Value, expected: &Value) -> bool {
    compare(actual, expected) == Some(Ordering::Less)
}

fn matches_le(actual: &Value, expected: &Value) -> bool {
    matches!(
        compare(actual, expected),
        Some(Ordering::Less | Ordering::Equal)
    )
}

fn matches_gt(actual: &Value, expected: &Value) -> bool {
    compare(actual, expected) == Some(Ordering::Greater)
}

fn matches_ge(actual: &Value, expected: &Value) -> bool {
    matches!(
        compare(actual, expected),
        Some(Ordering::Greater | Ordering::Equal)
    )
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Orders two values of the same JSON kind; mixed kinds and nulls do not compare.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn like(text: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return text == pattern;
    }

    let (first, last) = (parts[0], parts[parts.len() - 1]);
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };
    for part in &parts[1..parts.len() - 1] {
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }
    remaining.len() >= last.len() && remaining.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registered_token_resolves_to_registered_operator() {
        let registry = FilterOperatorRegistry::with_defaults();
        assert_eq!(registry.resolve("GE").unwrap(), FilterOperator::GE);
        assert_eq!(registry.resolve("like").unwrap(), FilterOperator::LIKE);
    }

    #[test]
    fn test_missing_token_resolves_to_default() {
        let mut registry = FilterOperatorRegistry::with_defaults();
        assert_eq!(registry.resolve_or_default(None).unwrap(), FilterOperator::EQ);

        registry.set_default(FilterOperator::LIKE);
        assert_eq!(registry.resolve_or_default(None).unwrap(), FilterOperator::LIKE);
        assert_eq!(registry.resolve_default(), &FilterOperator::LIKE);
    }

    #[test]
    fn test_unregistered_token_is_unsupported() {
        let mut registry = FilterOperatorRegistry::with_defaults();
        registry.unregister("LIKE");

        assert_eq!(
            registry.resolve("LIKE").unwrap_err(),
            QueryError::UnsupportedOperator("LIKE".into())
        );
        assert_eq!(
            registry.resolve("SOUNDS_LIKE").unwrap_err(),
            QueryError::UnsupportedOperator("SOUNDS_LIKE".into())
        );
    }

    #[test]
    fn test_default_token_always_resolves() {
        let registry = FilterOperatorRegistry::new(FilterOperator::EQ);
        assert!(registry.supports("EQ"));
        assert!(!registry.supports("NEQ"));
    }

    #[test]
    fn test_custom_operator() {
        fn starts_with(actual: &Value, expected: &Value) -> bool {
            match (actual, expected) {
                (Value::String(a), Value::String(e)) => a.starts_with(e.as_str()),
                _ => false,
            }
        }

        let mut registry = FilterOperatorRegistry::with_defaults();
        registry.register(FilterOperator::new("prefix", starts_with));

        let operator = registry.resolve("PREFIX").unwrap();
        assert_eq!(operator.token(), "PREFIX");
        assert!(operator.matches(&json!("foobar"), &json!("foo")));
        assert!(!operator.matches(&json!("barfoo"), &json!("foo")));
    }

    #[test]
    fn test_comparison_semantics() {
        assert!(FilterOperator::EQ.matches(&json!(3), &json!(3.0)));
        assert!(FilterOperator::EQ.matches(&json!("b"), &json!(["a", "b"])));
        assert!(FilterOperator::EQ.matches(&json!([1, 2]), &json!(2)));
        assert!(FilterOperator::NEQ.matches(&json!("a"), &json!("b")));
        assert!(FilterOperator::LT.matches(&json!(1), &json!(2)));
        assert!(FilterOperator::LE.matches(&json!(2), &json!(2)));
        assert!(FilterOperator::GT.matches(&json!("b"), &json!("a")));
        assert!(!FilterOperator::GE.matches(&Value::Null, &json!(1)));
        assert!(FilterOperator::LIKE.matches(&json!("Write Docs"), &json!("write%")));
        assert!(FilterOperator::LIKE.matches(&json!("Write Docs"), &json!("%do%")));
        assert!(!FilterOperator::LIKE.matches(&json!("Write Docs"), &json!("%x%")));
        assert!(FilterOperator::LIKE.matches(&json!("abc"), &json!("a%c")));
        assert!(!FilterOperator::LIKE.matches(&json!("ac"), &json!("a%bc")));
    }
}

//! `${VAR}` substitution for pipeline definitions

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde_yaml::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Resolves `${NAME}` tokens against expressions, the environment, and
/// declared pipeline variables, in that order
///
/// Substitution is a single textual pass: a replacement value is never
/// scanned again. Tokens that resolve to nothing are left as written.
#[derive(Debug, Clone)]
pub struct VariableResolver {
    captured_at: DateTime<Utc>,
    variables: HashMap<String, String>,
}

impl VariableResolver {
    /// Create a resolver; `${now}` and `${date}` are fixed to the current time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a resolver whose expressions are fixed to `captured_at`
    pub fn at(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            variables: HashMap::new(),
        }
    }

    /// Register declared variables
    ///
    /// Each value is itself resolved once against expressions and the
    /// environment (not against other declared variables).
    pub fn with_variables<I, K, V>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        for (key, value) in variables {
            let resolved = self.substitute(value.as_ref(), false);
            self.variables.insert(key.into(), resolved);
        }
        self
    }

    /// Declared variables after their own resolution
    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    fn expression(&self, name: &str) -> Option<String> {
        match name {
            "now" => Some(self.captured_at.to_rfc3339()),
            "date" => Some(self.captured_at.format("%Y-%m-%d").to_string()),
            _ => None,
        }
    }

    fn lookup(&self, name: &str, include_declared: bool) -> Option<String> {
        self.expression(name)
            .or_else(|| std::env::var(name).ok())
            .or_else(|| {
                include_declared
                    .then(|| self.variables.get(name).cloned())
                    .flatten()
            })
    }

    fn substitute(&self, text: &str, include_declared: bool) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures| {
                self.lookup(&caps[1], include_declared)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Substitute every `${NAME}` token in `text`
    pub fn resolve_str(&self, text: &str) -> String {
        self.substitute(text, true)
    }

    /// Substitute tokens in every string scalar of a YAML value, including
    /// nested mappings and sequences
    pub fn resolve_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.resolve_str(s)),
            Value::Sequence(items) => {
                Value::Sequence(items.iter().map(|v| self.resolve_value(v)).collect())
            }
            Value::Mapping(map) => Value::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_value(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => self.resolve_value(&tagged.value),
            other => other.clone(),
        }
    }
}

impl Default for VariableResolver {
    fn default() -> Self {
        Self::new()
    }
}

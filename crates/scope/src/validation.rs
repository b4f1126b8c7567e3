//! Required-clause rules checked before a scope is executed.
//!
//! A model is built with a [`ValidationRegistry`] that lists the clauses every
//! query against it must carry (a tenant filter, say). The registry is
//! immutable after [`ValidationRegistryBuilder::build`]; scopes opt out of
//! individual rules by name with `skip_callbacks`.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ScopeError, ScopeResult};
use crate::types::{ClauseKind, ClauseMap};

/// Custom rule check: receives the clause names and values present in the
/// rule's category and returns `true` if the rule is satisfied.
pub type ClausePredicate = Arc<dyn Fn(&[String], &[Value]) -> bool + Send + Sync>;

/// Options for a required-clause rule.
#[derive(Clone, Default)]
pub struct RuleOptions {
    category: Option<ClauseKind>,
    predicate: Option<ClausePredicate>,
    message: Option<String>,
}

impl fmt::Debug for RuleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleOptions")
            .field("category", &self.category)
            .field("predicate", &self.predicate.is_some())
            .field("message", &self.message)
            .finish()
    }
}

impl RuleOptions {
    /// Options requiring the clause in the given category.
    pub fn in_category(category: ClauseKind) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    /// Replaces the default presence check with a custom predicate.
    pub fn validate_with<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[String], &[Value]) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Overrides the error message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A single required-clause rule.
#[derive(Clone)]
pub struct ValidationRule {
    name: String,
    category: ClauseKind,
    predicate: Option<ClausePredicate>,
    message: String,
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("custom", &self.predicate.is_some())
            .field("message", &self.message)
            .finish()
    }
}

impl ValidationRule {
    /// Creates a rule. The category defaults to `where`.
    pub fn new(name: impl Into<String>, options: RuleOptions) -> Self {
        let category = options.category.unwrap_or(ClauseKind::Where).canonical();
        let message = options
            .message
            .unwrap_or_else(|| format!("does not exist in {}.", category));
        Self {
            name: name.into(),
            category,
            predicate: options.predicate,
            message,
        }
    }

    /// Returns the required clause name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the category the clause must appear in.
    pub fn category(&self) -> ClauseKind {
        self.category
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if the clauses satisfy this rule.
    pub fn check(&self, clauses: &ClauseMap) -> bool {
        let names = clauses.clause_names(self.category);
        match &self.predicate {
            Some(predicate) => {
                let values = clauses.clause_values(self.category);
                predicate(&names, &values)
            }
            None => names.iter().any(|n| n == &self.name),
        }
    }

    fn failure(&self) -> ScopeError {
        ScopeError::ValidationFailed {
            rule: self.name.clone(),
            category: self.category.to_string(),
            message: self.message.clone(),
        }
    }
}

/// The rules of one model, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ValidationRegistry {
    rules: Vec<ValidationRule>,
}

impl ValidationRegistry {
    /// A registry without rules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts building a registry.
    pub fn builder() -> ValidationRegistryBuilder {
        ValidationRegistryBuilder::default()
    }

    /// Returns the registered rules.
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    /// Looks up a rule by clause name.
    pub fn get(&self, name: &str) -> Option<&ValidationRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Checks every rule not skipped by the clause map.
    ///
    /// Fails on the first unsatisfied rule, in registration order.
    pub fn validate(&self, clauses: &ClauseMap) -> ScopeResult<()> {
        for rule in &self.rules {
            if clauses.skips_callback(&rule.name) {
                tracing::debug!(rule = %rule.name, "Validation rule skipped");
                continue;
            }
            if !rule.check(clauses) {
                tracing::warn!(
                    rule = %rule.name,
                    category = %rule.category,
                    "Scope rejected before execution: {}",
                    rule.message
                );
                return Err(rule.failure());
            }
        }
        Ok(())
    }
}

/// Builder for [`ValidationRegistry`].
#[derive(Debug, Default)]
pub struct ValidationRegistryBuilder {
    rules: Vec<ValidationRule>,
}

impl ValidationRegistryBuilder {
    /// Requires clause `name` with the given options.
    pub fn require_clause(mut self, name: impl Into<String>, options: RuleOptions) -> Self {
        self.rules.push(ValidationRule::new(name, options));
        self
    }

    /// Adds a prebuilt rule.
    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Finishes the registry.
    pub fn build(self) -> ValidationRegistry {
        ValidationRegistry { rules: self.rules }
    }
}

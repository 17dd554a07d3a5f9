//! Policy evaluation
//!
//! [`PolicyEngine`] turns the policies stored for a (role, resource,
//! operation) triple into either a SQL filter or a denial:
//!
//! 1. load the policies from the injected [`PolicyStore`]
//! 2. no policies: deny
//! 3. any policy whose effect is not `allow`: deny, without looking at its condition
//! 4. compile every allow condition; the first failure aborts the evaluation
//! 5. join the fragments with `OR`, in store order

use crate::ast::{Expr, References};
use crate::cache::{CacheStats, ExpressionCache};
use crate::compiler::{compile_expression, prepare, ExpressionError, Fragment, FALSE_PREDICATE};
use crate::config::EngineConfig;
use crate::context::{Record, RequestContext, SqlValue};
use crate::interpreter;
use crate::policy::Policy;
use crate::store::PolicyStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Table name `record` is bound to when conditions are checked in memory
const RECORD_TABLE: &str = "record";

/// Why a request was denied by the policy algebra
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The store returned no policy for the triple
    NoApplicablePolicy,
    /// A policy with a non-allow effect is present
    ExplicitDeny,
    /// Every allow condition evaluated to false or unknown
    NoConditionMatched,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenyReason::NoApplicablePolicy => "no applicable policy",
            DenyReason::ExplicitDeny => "explicit deny policy present",
            DenyReason::NoConditionMatched => "no policy condition matched",
        };
        f.write_str(text)
    }
}

/// Row filter granted for a read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadFilter {
    /// Boolean SQL expression, never empty
    pub filter_sql: String,
    /// Values for the `?` placeholders in `filter_sql`, left to right
    pub args: Vec<SqlValue>,
}

impl ReadFilter {
    fn from_fragments(fragments: Vec<Fragment>) -> Self {
        let mut terms = Vec::with_capacity(fragments.len());
        let mut args = Vec::new();

        for fragment in fragments {
            terms.push(fragment.sql);
            args.extend(fragment.args);
        }

        let mut filter_sql = terms.join(" OR ");
        if filter_sql.is_empty() {
            filter_sql = FALSE_PREDICATE.to_string();
        }

        Self { filter_sql, args }
    }

    /// The filter wrapped in parentheses, for appending after other `WHERE` terms
    pub fn grouped(&self) -> String {
        format!("({})", self.filter_sql)
    }

    pub fn placeholder_count(&self) -> usize {
        self.filter_sql.matches('?').count()
    }
}

/// Outcome of checking one in-memory record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub kind: DecisionKind,
    pub reason: Option<DenyReason>,
    /// Condition expressions of the allow policies that selected the record
    pub matched_policies: Vec<String>,
}

impl Decision {
    pub fn allow(matched_policies: Vec<String>) -> Self {
        Self {
            kind: DecisionKind::Allow,
            reason: None,
            matched_policies,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            kind: DecisionKind::Deny,
            reason: Some(reason),
            matched_policies: vec![],
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.kind == DecisionKind::Allow
    }
}

/// Decision kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionKind {
    Allow,
    Deny,
}

/// Main policy evaluation engine
///
/// Holds no per-request state; share it across threads behind an `Arc`.
pub struct PolicyEngine<S> {
    store: S,
    cache: ExpressionCache,
    config: EngineConfig,
}

impl<S: PolicyStore> PolicyEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        let cache = ExpressionCache::new(config.cache_capacity, config.parse_limits());
        Self {
            store,
            cache,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Produce the row filter for a read of `table_name`
    ///
    /// Denials, store failures and bad conditions all come back as `Err`;
    /// callers answer every one of them with [`Error::public_message`].
    pub fn evaluate_read(
        &self,
        role_name: &str,
        resource: &str,
        operation: &str,
        table_name: &str,
        context: &RequestContext,
    ) -> Result<ReadFilter> {
        let span =
            tracing::debug_span!("evaluate_read", role_name, resource, operation, table_name);
        let _enter = span.enter();

        let policies = self.load(role_name, resource, operation)?;
        if let Err(reason) = check_effects(&policies) {
            tracing::debug!(%reason, "read denied");
            return Err(Error::NotAuthorized(reason));
        }

        let mut fragments = Vec::with_capacity(policies.len());
        for policy in &policies {
            let fragment = self
                .prepare(policy, table_name)
                .and_then(|expr| Ok(compile_expression(&expr, table_name, context)?))
                .map_err(|e| expression_failure(policy, e))?;
            fragments.push(fragment);
        }

        let filter = ReadFilter::from_fragments(fragments);
        tracing::debug!(
            policies = policies.len(),
            args = filter.args.len(),
            filter = %filter.filter_sql,
            "read granted"
        );
        Ok(filter)
    }

    /// Decide whether one in-memory record is visible
    ///
    /// Applies the same algebra as [`evaluate_read`](Self::evaluate_read) and
    /// accepts the record exactly when the compiled filter would select it.
    /// Algebra denials are an `Ok` deny decision; store and expression
    /// failures are `Err`.
    pub fn evaluate_record(
        &self,
        role_name: &str,
        resource: &str,
        operation: &str,
        record: &Record,
        context: &RequestContext,
    ) -> Result<Decision> {
        let span = tracing::debug_span!("evaluate_record", role_name, resource, operation);
        let _enter = span.enter();

        let policies = self.load(role_name, resource, operation)?;
        if let Err(reason) = check_effects(&policies) {
            tracing::debug!(%reason, "record denied");
            return Ok(Decision::deny(reason));
        }

        let mut matched = Vec::new();
        for policy in &policies {
            let expr = self
                .prepare(policy, RECORD_TABLE)
                .and_then(|expr| {
                    compile_expression(&expr, RECORD_TABLE, context)?;
                    Ok(expr)
                })
                .map_err(|e| expression_failure(policy, e))?;

            let selected = interpreter::evaluate(&expr, record, context).map_err(|e| {
                tracing::warn!(
                    expression = %policy.condition_expression,
                    error = %e,
                    "policy condition failed on record"
                );
                Error::Evaluation(e)
            })?;

            if selected == Some(true) {
                matched.push(policy.condition_expression.clone());
            }
        }

        let decision = if matched.is_empty() {
            Decision::deny(DenyReason::NoConditionMatched)
        } else {
            Decision::allow(matched)
        };
        tracing::debug!(kind = ?decision.kind, "record decision");
        Ok(decision)
    }

    /// Record columns and `request_user` attributes a condition refers to
    pub fn references(&self, expression: &str) -> Result<References> {
        let expr = prepare(expression, self.config.parse_limits())?;
        Ok(References::collect(&expr))
    }

    /// Drop cached expressions; call after editing stored policies
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn load(&self, role_name: &str, resource: &str, operation: &str) -> Result<Vec<Policy>> {
        self.store.load_policies(role_name, resource, operation).map_err(|e| {
            tracing::error!(error = %e, "policy store failure");
            Error::Store(e)
        })
    }

    fn prepare(
        &self,
        policy: &Policy,
        table_name: &str,
    ) -> std::result::Result<Arc<Expr>, ExpressionError> {
        self.cache.get_or_prepare(&policy.condition_expression, table_name)
    }
}

/// Deny-overrides-allow over the loaded set
///
/// A non-allow policy denies on presence alone; its condition is never read.
fn check_effects(policies: &[Policy]) -> std::result::Result<(), DenyReason> {
    if policies.is_empty() {
        return Err(DenyReason::NoApplicablePolicy);
    }
    if policies.iter().any(|p| !p.is_allow()) {
        return Err(DenyReason::ExplicitDeny);
    }
    Ok(())
}

fn expression_failure(policy: &Policy, error: ExpressionError) -> Error {
    tracing::warn!(
        expression = %policy.condition_expression,
        resource = %policy.resource,
        error = %error,
        "policy condition rejected"
    );
    Error::Expression(error)
}

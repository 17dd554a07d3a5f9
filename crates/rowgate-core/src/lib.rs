pub mod ast;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod context;
pub mod engine;
pub mod interpreter;
pub mod parser;
pub mod policy;
pub mod store;

// Test utilities (available in tests and to dependents enabling `testing`)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use compiler::{compile_source, CompileError, ExpressionError, Fragment};
pub use config::{ConfigError, EngineConfig};
pub use context::{ContextValue, Record, RequestContext, SqlValue};
pub use engine::{Decision, DecisionKind, DenyReason, PolicyEngine, ReadFilter};
pub use interpreter::EvalError;
pub use policy::{Effect, Policy};
pub use store::{InMemoryPolicyStore, PolicyStore, StoreError, StoredPolicy};

use thiserror::Error;

/// Message returned to callers for every failed authorization
pub const NOT_AUTHORIZED: &str = "not authorized";

#[derive(Error, Debug)]
pub enum Error {
    #[error("not authorized: {0}")]
    NotAuthorized(DenyReason),

    #[error("policy store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid policy condition: {0}")]
    Expression(#[from] ExpressionError),

    #[error("policy condition evaluation failed: {0}")]
    Evaluation(#[from] EvalError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Failures of the environment rather than of the policy set
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Error::Store(_) | Error::Config(_))
    }

    /// An outcome of the allow/deny algebra
    pub fn is_denial(&self) -> bool {
        matches!(self, Error::NotAuthorized(_))
    }

    /// What the caller may reveal; never names a policy or attribute
    pub fn public_message(&self) -> &'static str {
        NOT_AUTHORIZED
    }
}

pub type Result<T> = std::result::Result<T, Error>;

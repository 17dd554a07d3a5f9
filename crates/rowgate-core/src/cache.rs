//! Cache of checked condition expressions
//!
//! Entries are keyed by `(condition_expression, table_name)` only. The request
//! context is applied at compile time on every call, so a cached entry can
//! never leak one principal's attribute values into another's filter.

use crate::ast::Expr;
use crate::compiler::{prepare, ExpressionError};
use crate::parser::ParseLimits;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    expression: String,
    table_name: String,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// LRU of parsed and type-checked ASTs
///
/// A capacity of zero disables caching: every lookup prepares the expression
/// afresh and nothing is retained.
pub struct ExpressionCache {
    entries: Option<Mutex<LruCache<CacheKey, Arc<Expr>>>>,
    limits: ParseLimits,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ExpressionCache {
    pub fn new(capacity: usize, limits: ParseLimits) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            limits,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn disabled(limits: ParseLimits) -> Self {
        Self::new(0, limits)
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn limits(&self) -> &ParseLimits {
        &self.limits
    }

    /// Return the checked AST for `expression`, preparing it on a miss
    ///
    /// Failed preparations are not cached.
    pub fn get_or_prepare(
        &self,
        expression: &str,
        table_name: &str,
    ) -> Result<Arc<Expr>, ExpressionError> {
        let Some(entries) = &self.entries else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return prepare(expression, self.limits).map(Arc::new);
        };

        let key = CacheKey {
            expression: expression.to_string(),
            table_name: table_name.to_string(),
        };

        if let Some(expr) = entries.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(expr));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        // Prepared outside the lock; a racing miss just prepares twice.
        let expr = Arc::new(prepare(expression, self.limits)?);
        entries.lock().put(key, Arc::clone(&expr));
        Ok(expr)
    }

    /// Drop every entry; call after any policy edit
    pub fn invalidate_all(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
            tracing::debug!("expression cache invalidated");
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.as_ref().map_or(0, |entries| entries.lock().len()),
        }
    }
}

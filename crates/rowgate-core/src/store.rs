//! Policy storage
//!
//! The engine only needs the [`PolicyStore`] trait: a read of the policies
//! bound to one (role, resource, operation) triple. Callers inject their own
//! backend; [`InMemoryPolicyStore`] is the bundled implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   Readers   │ (multiple, concurrent, lock-free)
//! └──────┬──────┘
//!        │ ArcSwap::load()
//!        ▼
//! ┌──────────────────────────┐
//! │  InMemoryPolicyStore     │
//! │  ArcSwap<PolicySnapshot> │ ◄─── Atomic swap
//! └──────────────────────────┘
//!        ▲
//!        │ rebuild & swap (one writer at a time)
//! ┌──────┴────────────────┐
//! │ add() / replace_all() │
//! └───────────────────────┘
//! ```

use crate::policy::Policy;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("policy store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse policy file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of the policies applicable to a request
///
/// Results must come back in a deterministic order; the engine joins
/// fragments in exactly that order. An empty vector is a valid answer.
pub trait PolicyStore: Send + Sync {
    fn load_policies(
        &self,
        role_name: &str,
        resource: &str,
        operation: &str,
    ) -> Result<Vec<Policy>, StoreError>;
}

impl<T: PolicyStore + ?Sized> PolicyStore for &T {
    fn load_policies(
        &self,
        role_name: &str,
        resource: &str,
        operation: &str,
    ) -> Result<Vec<Policy>, StoreError> {
        (**self).load_policies(role_name, resource, operation)
    }
}

impl<T: PolicyStore + ?Sized> PolicyStore for Arc<T> {
    fn load_policies(
        &self,
        role_name: &str,
        resource: &str,
        operation: &str,
    ) -> Result<Vec<Policy>, StoreError> {
        (**self).load_policies(role_name, resource, operation)
    }
}

impl<T: PolicyStore + ?Sized> PolicyStore for Box<T> {
    fn load_policies(
        &self,
        role_name: &str,
        resource: &str,
        operation: &str,
    ) -> Result<Vec<Policy>, StoreError> {
        (**self).load_policies(role_name, resource, operation)
    }
}

/// A policy together with the role it is granted to, as laid out in policy files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPolicy {
    pub role_name: String,
    #[serde(flatten)]
    pub policy: Policy,
}

impl StoredPolicy {
    pub fn new(role_name: impl Into<String>, policy: Policy) -> Self {
        Self {
            role_name: role_name.into(),
            policy,
        }
    }

    fn key(&self) -> PolicyKey {
        PolicyKey {
            role_name: self.role_name.clone(),
            resource: self.policy.resource.clone(),
            operation: self.policy.operation.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PolicyKey {
    role_name: String,
    resource: String,
    operation: String,
}

/// Immutable snapshot of every stored policy
#[derive(Debug, Default)]
struct PolicySnapshot {
    /// Policies in insertion order
    policies: Vec<StoredPolicy>,

    /// Index: (role, resource, operation) -> policy indices
    index: HashMap<PolicyKey, Vec<usize>>,
}

impl PolicySnapshot {
    fn new(policies: Vec<StoredPolicy>) -> Self {
        let mut index: HashMap<PolicyKey, Vec<usize>> = HashMap::new();

        for (idx, stored) in policies.iter().enumerate() {
            index.entry(stored.key()).or_default().push(idx);
        }

        Self { policies, index }
    }

    /// Policies for one triple, in insertion order
    fn lookup(&self, role_name: &str, resource: &str, operation: &str) -> Vec<Policy> {
        let key = PolicyKey {
            role_name: role_name.to_string(),
            resource: resource.to_string(),
            operation: operation.to_string(),
        };

        match self.index.get(&key) {
            Some(indices) => indices
                .iter()
                .filter_map(|&idx| self.policies.get(idx))
                .map(|stored| stored.policy.clone())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Policy store backed by atomically swapped snapshots
///
/// Reads never block. Writers are serialized and each edit publishes a new
/// snapshot; readers holding the old one finish against it.
pub struct InMemoryPolicyStore {
    snapshot: ArcSwap<PolicySnapshot>,
    writer: Mutex<()>,
}

impl Default for InMemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(PolicySnapshot::default()),
            writer: Mutex::new(()),
        }
    }

    pub fn from_policies(policies: impl IntoIterator<Item = StoredPolicy>) -> Self {
        let store = Self::new();
        store.replace_all(policies);
        store
    }

    /// Load a JSON array of [`StoredPolicy`] objects
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let policies: Vec<StoredPolicy> = serde_json::from_str(json)?;
        Ok(Self::from_policies(policies))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let store = Self::from_json_str(&contents)?;
        tracing::info!(
            path = %path.as_ref().display(),
            policies = store.len(),
            "loaded policy file"
        );
        Ok(store)
    }

    /// Append one policy after the existing ones
    pub fn add(&self, role_name: impl Into<String>, policy: Policy) {
        let _guard = self.writer.lock();
        let mut policies = self.snapshot.load().policies.clone();
        policies.push(StoredPolicy::new(role_name, policy));
        self.publish(policies);
    }

    /// Replace the whole policy set
    pub fn replace_all(&self, policies: impl IntoIterator<Item = StoredPolicy>) {
        let _guard = self.writer.lock();
        self.publish(policies.into_iter().collect());
    }

    // Callers hold the writer lock
    fn publish(&self, policies: Vec<StoredPolicy>) {
        let count = policies.len();
        self.snapshot.store(Arc::new(PolicySnapshot::new(policies)));
        tracing::debug!(policies = count, "policy snapshot swapped");
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn load_policies(
        &self,
        role_name: &str,
        resource: &str,
        operation: &str,
    ) -> Result<Vec<Policy>, StoreError> {
        Ok(self.snapshot.load().lookup(role_name, resource, operation))
    }
}

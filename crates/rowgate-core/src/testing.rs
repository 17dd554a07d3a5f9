//! Test utilities and helper functions for rowgate tests
//!
//! Fakes for the policy store plus shorthand for the fixtures most tests
//! need.

use crate::context::RequestContext;
use crate::policy::Policy;
use crate::store::{InMemoryPolicyStore, PolicyStore, StoreError, StoredPolicy};
use std::sync::atomic::{AtomicU64, Ordering};

/// Role every helper registers policies under
pub const TEST_ROLE: &str = "pilot";

/// Build an in-memory store holding `policies` for [`TEST_ROLE`]
pub fn store_with(policies: Vec<Policy>) -> InMemoryPolicyStore {
    InMemoryPolicyStore::from_policies(
        policies.into_iter().map(|policy| StoredPolicy::new(TEST_ROLE, policy)),
    )
}

/// Shorthand for an allow policy on `flight_log`/`read`
pub fn allow(condition: &str) -> Policy {
    Policy::allow("flight_log", "read", condition)
}

/// Shorthand for a deny policy on `flight_log`/`read`
pub fn deny(condition: &str) -> Policy {
    Policy::deny("flight_log", "read", condition)
}

/// A principal in unit 5 with membership in units 1, 2 and 3
pub fn unit_member_context() -> RequestContext {
    RequestContext::new()
        .with("user_id", 42)
        .with("unit_id", 5)
        .with_list("unit_ids", [1, 2, 3])
}

/// Store whose every read fails with [`StoreError::Unavailable`], counting the attempts
#[derive(Debug)]
pub struct FailingStore {
    message: String,
    attempts: AtomicU64,
}

impl FailingStore {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl PolicyStore for FailingStore {
    fn load_policies(
        &self,
        _role_name: &str,
        _resource: &str,
        _operation: &str,
    ) -> Result<Vec<Policy>, StoreError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Err(StoreError::Unavailable(self.message.clone()))
    }
}

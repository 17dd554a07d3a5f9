//! Integration tests for rowgate: store → engine → SQL filter

mod algebra_tests;
mod read_filter_tests;
mod record_tests;
mod security_tests;

use rowgate_core::{InMemoryPolicyStore, Policy, RequestContext, StoredPolicy};

pub const ROLE: &str = "pilot";
pub const RESOURCE: &str = "flight_log";
pub const TABLE: &str = "flight_logs";

/// Store holding `conditions` as allow policies for ROLE/RESOURCE/read
pub fn allow_store(conditions: &[&str]) -> InMemoryPolicyStore {
    InMemoryPolicyStore::from_policies(
        conditions
            .iter()
            .map(|c| StoredPolicy::new(ROLE, Policy::allow(RESOURCE, "read", *c))),
    )
}

pub fn pilot_context() -> RequestContext {
    RequestContext::new()
        .with("user_id", 42)
        .with("unit_id", 5)
        .with("callsign", "maverick")
        .with_list("unit_ids", [1, 2, 3])
}

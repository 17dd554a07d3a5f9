//! Deny-overrides-allow semantics across a policy set

use super::{allow_store, pilot_context, RESOURCE, ROLE, TABLE};
use rowgate_core::{
    DenyReason, Error, InMemoryPolicyStore, Policy, PolicyEngine, StoredPolicy,
};
use std::sync::Arc;

fn deny_reason(err: Error) -> DenyReason {
    match err {
        Error::NotAuthorized(reason) => reason,
        other => panic!("expected a denial, got {:?}", other),
    }
}

#[test]
fn test_empty_policy_set_denies_every_triple() {
    let engine = PolicyEngine::new(allow_store(&["true"]));
    let ctx = pilot_context();

    for (role, resource, operation) in [
        ("mechanic", RESOURCE, "read"),
        (ROLE, "aircraft", "read"),
        (ROLE, RESOURCE, "delete"),
    ] {
        let err = engine.evaluate_read(role, resource, operation, TABLE, &ctx).unwrap_err();
        assert_eq!(deny_reason(err), DenyReason::NoApplicablePolicy);
    }
}

#[test]
fn test_deny_wins_over_trivially_true_allows() {
    let store = allow_store(&["true", "record.unit_id == request_user.unit_id"]);
    store.add(ROLE, Policy::deny(RESOURCE, "read", "record.unit_id == 999"));
    let engine = PolicyEngine::new(store);

    let err = engine
        .evaluate_read(ROLE, RESOURCE, "read", TABLE, &pilot_context())
        .unwrap_err();
    assert_eq!(deny_reason(err), DenyReason::ExplicitDeny);
}

// A deny policy denies on presence alone. Its condition is never evaluated,
// so a deny whose condition could not match any row still blocks the read.
#[test]
fn test_deny_condition_is_ignored() {
    for condition in ["false", "record.unit_id == -1", "request_user.absent == 1"] {
        let store = InMemoryPolicyStore::from_policies(vec![
            StoredPolicy::new(ROLE, Policy::allow(RESOURCE, "read", "true")),
            StoredPolicy::new(ROLE, Policy::deny(RESOURCE, "read", condition)),
        ]);
        let engine = PolicyEngine::new(store);

        let err = engine
            .evaluate_read(ROLE, RESOURCE, "read", TABLE, &pilot_context())
            .unwrap_err();
        assert_eq!(deny_reason(err), DenyReason::ExplicitDeny, "condition {:?}", condition);
    }
}

#[test]
fn test_deny_position_does_not_matter() {
    let store = InMemoryPolicyStore::from_policies(vec![
        StoredPolicy::new(ROLE, Policy::deny(RESOURCE, "read", "true")),
        StoredPolicy::new(ROLE, Policy::allow(RESOURCE, "read", "true")),
    ]);
    let engine = PolicyEngine::new(store);

    assert!(engine
        .evaluate_read(ROLE, RESOURCE, "read", TABLE, &pilot_context())
        .unwrap_err()
        .is_denial());
}

#[test]
fn test_unknown_effect_fails_closed() {
    let store = InMemoryPolicyStore::from_json_str(
        r#"[
            {"role_name": "pilot", "resource": "flight_log", "operation": "read",
             "effect": "allow", "condition_expression": "true"},
            {"role_name": "pilot", "resource": "flight_log", "operation": "read",
             "effect": "Allow", "condition_expression": "true"}
        ]"#,
    )
    .unwrap();
    let engine = PolicyEngine::new(store);

    let err = engine
        .evaluate_read(ROLE, RESOURCE, "read", TABLE, &pilot_context())
        .unwrap_err();
    assert_eq!(deny_reason(err), DenyReason::ExplicitDeny);
}

#[test]
fn test_deny_scoped_to_its_triple() {
    let store = allow_store(&["true"]);
    store.add(ROLE, Policy::deny(RESOURCE, "write", "true"));
    store.add("mechanic", Policy::deny(RESOURCE, "read", "true"));
    let engine = PolicyEngine::new(store);

    let filter = engine
        .evaluate_read(ROLE, RESOURCE, "read", TABLE, &pilot_context())
        .unwrap();
    assert_eq!(filter.filter_sql, "1=1");
}

#[test]
fn test_policy_edits_take_effect() {
    let store = Arc::new(allow_store(&["record.unit_id == request_user.unit_id"]));
    let engine = PolicyEngine::new(Arc::clone(&store));
    let ctx = pilot_context();

    assert!(engine.evaluate_read(ROLE, RESOURCE, "read", TABLE, &ctx).is_ok());

    store.add(ROLE, Policy::deny(RESOURCE, "read", "true"));
    assert!(engine.evaluate_read(ROLE, RESOURCE, "read", TABLE, &ctx).is_err());

    store.replace_all(Vec::new());
    let err = engine.evaluate_read(ROLE, RESOURCE, "read", TABLE, &ctx).unwrap_err();
    assert_eq!(deny_reason(err), DenyReason::NoApplicablePolicy);
}

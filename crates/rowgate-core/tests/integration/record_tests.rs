//! In-memory record checks agree with the compiled filter

use super::{allow_store, pilot_context, RESOURCE, ROLE};
use rowgate_core::{DecisionKind, DenyReason, Error, EvalError, PolicyEngine, Record};

#[test]
fn test_record_in_own_unit_is_visible() {
    let engine = PolicyEngine::new(allow_store(&["record.unit_id in request_user.unit_ids"]));

    for unit in [1, 2, 3] {
        let record = Record::new().with("unit_id", unit);
        let decision = engine
            .evaluate_record(ROLE, RESOURCE, "read", &record, &pilot_context())
            .unwrap();
        assert_eq!(decision.kind, DecisionKind::Allow);
    }

    let record = Record::new().with("unit_id", 4);
    let decision = engine
        .evaluate_record(ROLE, RESOURCE, "read", &record, &pilot_context())
        .unwrap();
    assert_eq!(decision.reason, Some(DenyReason::NoConditionMatched));
}

#[test]
fn test_null_column_never_matches() {
    let engine = PolicyEngine::new(allow_store(&[
        "record.pilot_id == request_user.user_id",
        "record.pilot_id != request_user.user_id",
    ]));
    let record = Record::new().with_null("pilot_id");

    let decision = engine
        .evaluate_record(ROLE, RESOURCE, "read", &record, &pilot_context())
        .unwrap();
    assert!(!decision.is_allowed());
}

#[test]
fn test_matched_policies_are_reported_in_order() {
    let engine = PolicyEngine::new(allow_store(&[
        "record.status == 'final'",
        "record.unit_id == request_user.unit_id",
        "record.hours > 100",
    ]));
    let record = Record::new().with("status", "final").with("unit_id", 5).with("hours", 2.0);

    let decision = engine
        .evaluate_record(ROLE, RESOURCE, "read", &record, &pilot_context())
        .unwrap();
    assert_eq!(
        decision.matched_policies,
        vec!["record.status == 'final'", "record.unit_id == request_user.unit_id"]
    );
}

#[test]
fn test_missing_column_is_an_error() {
    let engine = PolicyEngine::new(allow_store(&["record.tail_number == 'N123'"]));
    let err = engine
        .evaluate_record(ROLE, RESOURCE, "read", &Record::new(), &pilot_context())
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Evaluation(EvalError::MissingColumn(ref c)) if c == "tail_number"
    ));
    assert_eq!(err.public_message(), "not authorized");
}

#[test]
fn test_records_from_json() {
    let engine = PolicyEngine::new(allow_store(&[
        "record.unit_id == request_user.unit_id && record.closed_at == null",
    ]));
    let open = Record::from_json(r#"{"unit_id": 5, "closed_at": null}"#).unwrap();

    // `= NULL` is unknown in SQL, so the row is not selected
    let decision = engine
        .evaluate_record(ROLE, RESOURCE, "read", &open, &pilot_context())
        .unwrap();
    assert!(!decision.is_allowed());
}

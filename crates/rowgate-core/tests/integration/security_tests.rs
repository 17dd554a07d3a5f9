//! Injection safety and fail-closed behavior

use super::{allow_store, pilot_context, RESOURCE, ROLE, TABLE};
use rowgate_core::compiler::compile_source;
use rowgate_core::parser::{ParseError, ParseLimits};
use rowgate_core::{
    CompileError, EngineConfig, Error, ExpressionError, PolicyEngine, RequestContext, SqlValue,
};

fn expression_error(err: Error) -> ExpressionError {
    match err {
        Error::Expression(e) => e,
        other => panic!("expected an expression error, got {:?}", other),
    }
}

#[test]
fn test_string_literals_are_never_inlined() {
    let payload = "x' OR '1'='1";
    let engine = PolicyEngine::new(allow_store(&["record.callsign == \"x' OR '1'='1\""]));

    let filter = engine
        .evaluate_read(ROLE, RESOURCE, "read", TABLE, &pilot_context())
        .unwrap();
    assert_eq!(filter.filter_sql, "(flight_logs.callsign = ?)");
    assert_eq!(filter.args, vec![SqlValue::String(payload.to_string())]);
}

#[test]
fn test_context_values_are_never_inlined() {
    let ctx = RequestContext::new().with("unit_id", "5; DROP TABLE flight_logs; --");
    let engine = PolicyEngine::new(allow_store(&["record.unit_id == request_user.unit_id"]));

    let filter = engine.evaluate_read(ROLE, RESOURCE, "read", TABLE, &ctx).unwrap();
    assert!(!filter.filter_sql.contains("DROP"));
    assert_eq!(filter.placeholder_count(), 1);
}

#[test]
fn test_hostile_table_name_rejected() {
    let engine = PolicyEngine::new(allow_store(&["record.unit_id == request_user.unit_id"]));
    let err = engine
        .evaluate_read(ROLE, RESOURCE, "read", "flight_logs; --", &pilot_context())
        .unwrap_err();

    assert!(matches!(
        expression_error(err),
        ExpressionError::Compile(CompileError::InvalidIdentifier(_))
    ));
}

#[test]
fn test_missing_attribute_fails_instead_of_defaulting() {
    let engine = PolicyEngine::new(allow_store(&["record.unit_id == request_user.squadron_id"]));
    let err = engine
        .evaluate_read(ROLE, RESOURCE, "read", TABLE, &RequestContext::new())
        .unwrap_err();

    assert_eq!(
        expression_error(err),
        ExpressionError::Compile(CompileError::MissingAttribute("squadron_id".to_string()))
    );
}

#[test]
fn test_membership_against_scalar_fails() {
    let ctx = RequestContext::new().with("unit_ids", 5);
    let err = compile_source(
        "record.unit_id in request_user.unit_ids",
        TABLE,
        &ctx,
        ParseLimits::default(),
    )
    .unwrap_err();

    assert_eq!(err, ExpressionError::Compile(CompileError::InRequiresList));
    assert!(err.to_string().contains("must be a list"));
}

#[test]
fn test_membership_against_empty_list_fails() {
    let ctx = RequestContext::new().with_list("unit_ids", Vec::<i64>::new());
    let err = compile_source(
        "record.unit_id in request_user.unit_ids",
        TABLE,
        &ctx,
        ParseLimits::default(),
    )
    .unwrap_err();

    assert_eq!(err, ExpressionError::Compile(CompileError::InRequiresList));
}

#[test]
fn test_unsupported_constructs_fail_closed() {
    let ctx = pilot_context();
    for expression in [
        "!record.active",
        "record.hours * 2 > 10",
        "size(record.crew) > 1",
        "record.crew.lead == request_user.user_id",
        "record.unit_id in [1, 2]",
        "owner == 1",
    ] {
        let engine = PolicyEngine::new(allow_store(&[expression]));
        let err = engine
            .evaluate_read(ROLE, RESOURCE, "read", TABLE, &ctx)
            .unwrap_err();
        assert!(matches!(err, Error::Expression(_)), "{} -> {:?}", expression, err);
    }
}

#[test]
fn test_malformed_expression_fails_closed() {
    let engine = PolicyEngine::new(allow_store(&["record.unit_id =="]));
    let err = engine
        .evaluate_read(ROLE, RESOURCE, "read", TABLE, &pilot_context())
        .unwrap_err();

    assert!(matches!(expression_error(err), ExpressionError::Parse(_)));
}

#[test]
fn test_configured_limits_bound_expressions() {
    let config = EngineConfig {
        max_expression_length: 16,
        ..EngineConfig::default()
    };
    let engine = PolicyEngine::with_config(
        allow_store(&["record.unit_id == request_user.unit_id"]),
        config,
    );
    let err = engine
        .evaluate_read(ROLE, RESOURCE, "read", TABLE, &pilot_context())
        .unwrap_err();

    assert_eq!(
        expression_error(err),
        ExpressionError::Parse(ParseError::TooLong { max: 16 })
    );
}

#[test]
fn test_deep_nesting_rejected() {
    let expression = format!("{}true{}", "(".repeat(200), ")".repeat(200));
    let err = compile_source(&expression, TABLE, &RequestContext::new(), ParseLimits::default())
        .unwrap_err();
    assert!(matches!(err, ExpressionError::Parse(ParseError::TooDeep { max: 64 })));
}

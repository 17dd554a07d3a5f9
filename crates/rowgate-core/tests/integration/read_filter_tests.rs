//! Compiling stored conditions into row filters

use super::{allow_store, pilot_context, RESOURCE, ROLE, TABLE};
use rowgate_core::compiler::compile_source;
use rowgate_core::parser::ParseLimits;
use rowgate_core::{PolicyEngine, RequestContext, SqlValue};

fn compile(expression: &str, ctx: &RequestContext) -> (String, Vec<SqlValue>) {
    let fragment = compile_source(expression, TABLE, ctx, ParseLimits::default()).unwrap();
    (fragment.sql, fragment.args)
}

#[test]
fn test_literal_constants_bind_one_value() {
    let ctx = RequestContext::new();

    assert_eq!(compile("42", &ctx), ("?".to_string(), vec![SqlValue::Int(42)]));
    assert_eq!(compile("-7", &ctx), ("?".to_string(), vec![SqlValue::Int(-7)]));
    assert_eq!(compile("2.5", &ctx), ("?".to_string(), vec![SqlValue::Float(2.5)]));
    assert_eq!(
        compile("'final'", &ctx),
        ("?".to_string(), vec![SqlValue::String("final".to_string())])
    );
}

#[test]
fn test_boolean_and_null_constants_bind_nothing() {
    let ctx = RequestContext::new();

    assert_eq!(compile("true", &ctx), ("1=1".to_string(), vec![]));
    assert_eq!(compile("false", &ctx), ("1=0".to_string(), vec![]));
    assert_eq!(compile("null", &ctx), ("NULL".to_string(), vec![]));
}

#[test]
fn test_unit_equality() {
    let ctx = RequestContext::new().with("unit_id", 5);
    assert_eq!(
        compile("record.unit_id == request_user.unit_id", &ctx),
        ("(flight_logs.unit_id = ?)".to_string(), vec![SqlValue::Int(5)])
    );
}

#[test]
fn test_unit_membership() {
    let ctx = RequestContext::new().with_list("unit_ids", [1, 2, 3]);
    assert_eq!(
        compile("record.unit_id in request_user.unit_ids", &ctx),
        (
            "(flight_logs.unit_id IN (?, ?, ?))".to_string(),
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
        )
    );
    assert_eq!(
        compile("record.unit_id not in request_user.unit_ids", &ctx).0,
        "(flight_logs.unit_id NOT IN (?, ?, ?))"
    );
}

#[test]
fn test_compound_condition_argument_order() {
    let (sql, args) = compile(
        "record.unit_id in request_user.unit_ids && (record.pilot_id == request_user.user_id || record.hours > 1.5)",
        &pilot_context(),
    );

    assert_eq!(
        sql,
        "((flight_logs.unit_id IN (?, ?, ?)) AND ((flight_logs.pilot_id = ?) OR (flight_logs.hours > ?)))"
    );
    assert_eq!(
        args,
        vec![
            SqlValue::Int(1),
            SqlValue::Int(2),
            SqlValue::Int(3),
            SqlValue::Int(42),
            SqlValue::Float(1.5),
        ]
    );
    assert_eq!(sql.matches('?').count(), args.len());
}

#[test]
fn test_every_comparison_operator() {
    let ctx = RequestContext::new();
    let cases = [
        ("==", "="),
        ("!=", "!="),
        ("<", "<"),
        ("<=", "<="),
        (">", ">"),
        (">=", ">="),
    ];

    for (cel, sql) in cases {
        let (compiled, args) = compile(&format!("record.hours {} 3", cel), &ctx);
        assert_eq!(compiled, format!("(flight_logs.hours {} ?)", sql));
        assert_eq!(args, vec![SqlValue::Int(3)]);
    }
}

#[test]
fn test_engine_joins_policies_in_store_order() {
    let engine = PolicyEngine::new(allow_store(&[
        "record.unit_id in request_user.unit_ids",
        "record.pilot_id == request_user.user_id",
        "record.callsign == request_user.callsign",
    ]));

    let filter = engine
        .evaluate_read(ROLE, RESOURCE, "read", TABLE, &pilot_context())
        .unwrap();

    assert_eq!(
        filter.filter_sql,
        "(flight_logs.unit_id IN (?, ?, ?)) OR (flight_logs.pilot_id = ?) OR (flight_logs.callsign = ?)"
    );
    assert_eq!(
        filter.args,
        vec![
            SqlValue::Int(1),
            SqlValue::Int(2),
            SqlValue::Int(3),
            SqlValue::Int(42),
            SqlValue::String("maverick".to_string()),
        ]
    );
}

#[test]
fn test_evaluation_is_deterministic() {
    let engine = PolicyEngine::new(allow_store(&[
        "record.unit_id == request_user.unit_id",
        "record.status == 'final'",
    ]));
    let ctx = pilot_context();

    let first = engine.evaluate_read(ROLE, RESOURCE, "read", TABLE, &ctx).unwrap();
    for _ in 0..10 {
        assert_eq!(engine.evaluate_read(ROLE, RESOURCE, "read", TABLE, &ctx).unwrap(), first);
    }
}

#[test]
fn test_schema_qualified_table() {
    let engine = PolicyEngine::new(allow_store(&["record.unit_id == request_user.unit_id"]));
    let filter = engine
        .evaluate_read(ROLE, RESOURCE, "read", "ops.flight_logs", &pilot_context())
        .unwrap();
    assert_eq!(filter.filter_sql, "(ops.flight_logs.unit_id = ?)");
}

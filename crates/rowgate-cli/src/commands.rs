use anyhow::{Context, Result};
use rowgate_core::compiler::compile_source;
use rowgate_core::{EngineConfig, InMemoryPolicyStore, PolicyEngine, RequestContext};
use serde_json::{json, Value};

use crate::cli::{CompileArgs, ContextArgs, EvaluateArgs, InspectArgs};

fn load_context(args: &ContextArgs) -> Result<RequestContext> {
    let raw = match &args.context_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading context file {}", path.display()))?,
        None => args.context.clone(),
    };
    RequestContext::from_json(&raw)
        .context("request context must be a JSON object of scalars or scalar arrays")
}

pub fn compile(args: &CompileArgs, config: &EngineConfig) -> Result<Value> {
    let context = load_context(&args.context)?;
    let fragment = compile_source(&args.expression, &args.table, &context, config.parse_limits())?;
    Ok(json!({ "sql": fragment.sql, "args": fragment.args }))
}

/// Authorization failures are reported as output, not as errors
pub fn evaluate(args: &EvaluateArgs, config: &EngineConfig) -> Result<Value> {
    let context = load_context(&args.context)?;
    let store = InMemoryPolicyStore::from_json_file(&args.policies)
        .with_context(|| format!("loading policies from {}", args.policies.display()))?;
    let engine = PolicyEngine::with_config(store, config.clone());

    let result = engine.evaluate_read(
        &args.role,
        &args.resource,
        &args.operation,
        &args.table,
        &context,
    );
    match result {
        Ok(filter) => Ok(json!({
            "authorized": true,
            "filter_sql": filter.filter_sql,
            "args": filter.args,
        })),
        Err(e) if e.is_infrastructure() => Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "request not authorized");
            Ok(json!({
                "authorized": false,
                "message": e.public_message(),
                "detail": e.to_string(),
            }))
        }
    }
}

pub fn inspect(args: &InspectArgs, config: &EngineConfig) -> Result<Value> {
    let engine = PolicyEngine::with_config(InMemoryPolicyStore::new(), config.clone());
    let refs = engine.references(&args.expression)?;
    Ok(serde_json::to_value(refs)?)
}

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rowgate")]
#[command(about = "Compile and check row-level authorization policies")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Engine config file (JSON)
    #[arg(short, long, global = true, env = "ROWGATE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile one condition expression to a SQL fragment
    Compile(CompileArgs),
    /// Evaluate a policy file for a role, resource and operation
    Evaluate(EvaluateArgs),
    /// List the columns and request attributes an expression uses
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct ContextArgs {
    /// Request attributes as a JSON object
    #[arg(long, default_value = "{}", conflicts_with = "context_file")]
    pub context: String,

    /// Read request attributes from a JSON file
    #[arg(long)]
    pub context_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompileArgs {
    /// Condition expression
    pub expression: String,

    /// Table the `record` variable is bound to
    #[arg(short, long)]
    pub table: String,

    #[command(flatten)]
    pub context: ContextArgs,
}

#[derive(Args)]
pub struct EvaluateArgs {
    /// Policy file: JSON array of policies with `role_name`
    #[arg(short, long)]
    pub policies: PathBuf,

    #[arg(long)]
    pub role: String,

    #[arg(long)]
    pub resource: String,

    #[arg(long, default_value = "read")]
    pub operation: String,

    /// Table the `record` variable is bound to
    #[arg(short, long)]
    pub table: String,

    #[command(flatten)]
    pub context: ContextArgs,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Condition expression
    pub expression: String,
}

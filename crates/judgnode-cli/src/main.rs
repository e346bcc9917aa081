// crates/judgnode-cli/src/main.rs
// ============================================================================
// Module: Judgment Node CLI Entry Point
// Description: Command dispatcher for the process/chain/metrics/serve
// surface this binary exposes over the orchestrator crate.
// Purpose: Make the workspace runnable end to end without mandating any
// particular embedding shape.
// Dependencies: clap, judgnode-orchestrator, judgnode-config, judgnode-core,
//               judgnode-chain, judgnode-chain-sqlite, judgnode-metrics,
//               serde_json, tokio
// ============================================================================

//! ## Overview
//! This binary is the embedder-facing surface the rest of the workspace
//! leaves unspecified in shape: `process` runs one Decision Event through
//! the pipeline, `chain status`/`chain verify` inspect the Proof-of-Judgment
//! log, `metrics snapshot`/`metrics alerts` read the collector, and `serve`
//! drives the background maintenance a long-running embedder would
//! otherwise have to wire up itself. None of this is a mandated protocol;
//! it exists to exercise the crate, not to define one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use judgnode_chain::ChainStore;
use judgnode_chain_sqlite::SqliteChainStore;
use judgnode_config::Settings;
use judgnode_core::CancelToken;
use judgnode_core::Clock;
use judgnode_core::DecisionEvent;
use judgnode_core::SlotId;
use judgnode_core::SystemClock;
use judgnode_metrics::to_prometheus;
use judgnode_orchestrator::Orchestrator;
use judgnode_orchestrator::OrchestratorBuilder;
use judgnode_orchestrator::ProcessOptions;

// ============================================================================
// SECTION: CLI surface
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "judgnode", disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single Decision Event through the pipeline.
    Process(ProcessCommand),
    /// Proof-of-Judgment chain utilities.
    Chain {
        /// Selected chain subcommand.
        #[command(subcommand)]
        command: ChainCommand,
    },
    /// Metrics utilities.
    Metrics {
        /// Selected metrics subcommand.
        #[command(subcommand)]
        command: MetricsCommand,
    },
    /// Run background maintenance loops until interrupted.
    Serve(ServeCommand),
}

/// Options shared by every subcommand that constructs an [`Orchestrator`].
#[derive(Args, Debug, Default)]
struct OrchestratorArgs {
    /// Path to a TOML settings file; omit to use built-in defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Path to a `SQLite` file backing the chain store; omit for an
    /// in-memory store that does not persist across runs.
    #[arg(long, value_name = "PATH")]
    chain_db: Option<PathBuf>,
    /// Producer identity stamped on chain blocks.
    #[arg(long, value_name = "ID")]
    producer_id: Option<String>,
}

/// Configuration for the `process` command.
#[derive(Args, Debug)]
struct ProcessCommand {
    #[command(flatten)]
    orchestrator: OrchestratorArgs,
    /// Path to a Decision Event JSON file; omit to read from stdin.
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
    /// Run the Judge step even when risk is below `high`.
    #[arg(long)]
    request_judgment: bool,
    /// Run the Synthesize step.
    #[arg(long)]
    request_synthesis: bool,
    /// Run the Act step when the routed domain has a preferred tool.
    #[arg(long)]
    auto_invoke_skill: bool,
}

/// Chain subcommands.
#[derive(Subcommand, Debug)]
enum ChainCommand {
    /// Print the chain's current status.
    Status(ChainStatusCommand),
    /// Verify chain integrity from a given slot onward.
    Verify(ChainVerifyCommand),
    /// Clear a read-only state left by a prior integrity failure.
    Reset(ChainResetCommand),
}

/// Configuration for the `chain status` command.
#[derive(Args, Debug)]
struct ChainStatusCommand {
    #[command(flatten)]
    orchestrator: OrchestratorArgs,
}

/// Configuration for the `chain verify` command.
#[derive(Args, Debug)]
struct ChainVerifyCommand {
    #[command(flatten)]
    orchestrator: OrchestratorArgs,
    /// Slot to start verification from.
    #[arg(long, default_value_t = 0)]
    from_slot: u64,
}

/// Configuration for the `chain reset` command.
#[derive(Args, Debug)]
struct ChainResetCommand {
    #[command(flatten)]
    orchestrator: OrchestratorArgs,
}

/// Metrics subcommands.
#[derive(Subcommand, Debug)]
enum MetricsCommand {
    /// Print a Prometheus exposition of the current metrics snapshot.
    Snapshot(MetricsSnapshotCommand),
    /// Evaluate alert thresholds and print what fired or cleared.
    Alerts(MetricsAlertsCommand),
}

/// Configuration for the `metrics snapshot` command.
#[derive(Args, Debug)]
struct MetricsSnapshotCommand {
    #[command(flatten)]
    orchestrator: OrchestratorArgs,
}

/// Configuration for the `metrics alerts` command.
#[derive(Args, Debug)]
struct MetricsAlertsCommand {
    #[command(flatten)]
    orchestrator: OrchestratorArgs,
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    #[command(flatten)]
    orchestrator: OrchestratorArgs,
    /// Milliseconds between maintenance cycles (chain idle-close, alert
    /// evaluation).
    #[arg(long, default_value_t = 5_000)]
    interval_ms: u64,
}

// ============================================================================
// SECTION: Error handling
// ============================================================================

/// A CLI-level failure, carrying an already human-readable message.
#[derive(Debug)]
struct CliError {
    message: String,
}

impl CliError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Process(command) => command_process(command).await,
        Commands::Chain { command } => command_chain(command),
        Commands::Metrics { command } => command_metrics(command).await,
        Commands::Serve(command) => command_serve(command).await,
    }
}

// ============================================================================
// SECTION: Process command
// ============================================================================

async fn command_process(command: ProcessCommand) -> CliResult<ExitCode> {
    let orchestrator = build_orchestrator(&command.orchestrator)?;
    let input = read_input(command.input.as_deref())?;
    let event: DecisionEvent =
        serde_json::from_str(&input).map_err(|err| CliError::new(format!("invalid decision event json: {err}")))?;

    let opts = ProcessOptions {
        request_judgment: command.request_judgment,
        request_synthesis: command.request_synthesis,
        auto_invoke_skill: command.auto_invoke_skill,
    };
    let cancel = CancelToken::new();
    let record = orchestrator.process(event, opts, &cancel).await;
    let rendered = serde_json::to_string_pretty(&record)
        .map_err(|err| CliError::new(format!("failed to render decision record: {err}")))?;
    write_stdout_line(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Chain commands
// ============================================================================

fn command_chain(command: ChainCommand) -> CliResult<ExitCode> {
    match command {
        ChainCommand::Status(command) => command_chain_status(command),
        ChainCommand::Verify(command) => command_chain_verify(command),
        ChainCommand::Reset(command) => command_chain_reset(command),
    }
}

fn command_chain_status(command: ChainStatusCommand) -> CliResult<ExitCode> {
    let chain = build_chain(&command.orchestrator)?;
    let status = chain.status();
    let rendered = serde_json::json!({
        "head_slot": status.head_slot.map(SlotId::get),
        "pending": status.pending,
        "block_count": status.block_count,
        "total_judgments": status.total_judgments,
        "read_only": status.read_only,
    });
    write_stdout_line(&rendered.to_string())?;
    Ok(ExitCode::SUCCESS)
}

fn command_chain_verify(command: ChainVerifyCommand) -> CliResult<ExitCode> {
    let chain = build_chain(&command.orchestrator)?;
    let report = chain.verify_integrity(SlotId::new(command.from_slot));
    let rendered = serde_json::json!({
        "valid": report.valid,
        "errors": report.errors,
        "read_only": chain.is_read_only(),
    });
    write_stdout_line(&rendered.to_string())?;
    if report.valid { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::FAILURE) }
}

/// Clears a read-only state left by a prior `chain verify` failure. The
/// operator is expected to have already confirmed the underlying break is
/// understood and safe to resume writing past.
fn command_chain_reset(command: ChainResetCommand) -> CliResult<ExitCode> {
    let chain = build_chain(&command.orchestrator)?;
    chain.reset_read_only();
    write_stdout_line("judgnode chain: read-only state cleared")?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Metrics commands
// ============================================================================

async fn command_metrics(command: MetricsCommand) -> CliResult<ExitCode> {
    match command {
        MetricsCommand::Snapshot(command) => command_metrics_snapshot(command).await,
        MetricsCommand::Alerts(command) => command_metrics_alerts(command).await,
    }
}

async fn command_metrics_snapshot(command: MetricsSnapshotCommand) -> CliResult<ExitCode> {
    let orchestrator = build_orchestrator(&command.orchestrator)?;
    let snapshot = orchestrator.metrics_snapshot().await;
    let alerts_active = orchestrator.evaluate_alerts().await;
    let rendered = to_prometheus(&snapshot, alerts_active.fired.len());
    write_stdout_line(rendered.trim_end())?;
    Ok(ExitCode::SUCCESS)
}

async fn command_metrics_alerts(command: MetricsAlertsCommand) -> CliResult<ExitCode> {
    let orchestrator = build_orchestrator(&command.orchestrator)?;
    let diff = orchestrator.evaluate_alerts().await;
    let rendered = serde_json::to_string_pretty(&diff)
        .map_err(|err| CliError::new(format!("failed to render alert diff: {err}")))?;
    write_stdout_line(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Serve command
// ============================================================================

async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let orchestrator = Arc::new(build_orchestrator(&command.orchestrator)?);
    let interval = Duration::from_millis(command.interval_ms);
    write_stdout_line("judgnode serve: running maintenance loop, press ctrl-c to stop")?;

    loop {
        tokio::select! {
            () = tokio::time::sleep(interval) => {
                orchestrator.tick_chain_idle();
                let diff = orchestrator.evaluate_alerts().await;
                for alert in &diff.fired {
                    write_stderr_line(&format!("alert fired: {} ({})", alert.alert_type, alert.message))?;
                }
                for alert in &diff.cleared {
                    write_stderr_line(&format!("alert cleared: {}", alert.alert_type))?;
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.map_err(|err| CliError::new(format!("failed to listen for ctrl-c: {err}")))?;
                break;
            }
        }
    }

    write_stdout_line("judgnode serve: shutting down")?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Shared construction
// ============================================================================

/// Loads settings and builds an [`Orchestrator`] from shared CLI flags.
fn build_orchestrator(args: &OrchestratorArgs) -> CliResult<Orchestrator> {
    let settings = load_settings(args.config.as_deref())?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut builder = OrchestratorBuilder::new(settings.clone()).clock(clock.clone());

    if let Some(id) = &args.producer_id {
        builder = builder.producer_id(id.clone());
    }
    if let Some(db_path) = &args.chain_db {
        let store = SqliteChainStore::open(db_path, producer_id(args), settings.chain, clock)
            .map_err(|err| CliError::new(format!("failed to open chain db {}: {err}", db_path.display())))?;
        builder = builder.chain(Arc::new(store));
    }

    Ok(builder.build())
}

/// Builds just the chain store handle, for the `chain` subcommands that
/// need nothing else from the orchestrator.
fn build_chain(args: &OrchestratorArgs) -> CliResult<Arc<dyn ChainStore>> {
    let orchestrator = build_orchestrator(args)?;
    Ok(orchestrator.chain_handle())
}

fn producer_id(args: &OrchestratorArgs) -> String {
    args.producer_id.clone().unwrap_or_else(|| "judgnode".to_string())
}

/// Loads [`Settings`] from `path`, or built-in defaults when unset.
///
/// # Errors
///
/// Returns a [`CliError`] if the file cannot be read or parsed.
fn load_settings(path: Option<&Path>) -> CliResult<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let document =
        fs::read_to_string(path).map_err(|err| CliError::new(format!("failed to read {}: {err}", path.display())))?;
    Settings::from_toml_str(&document).map_err(|err| CliError::new(format!("invalid settings: {err}")))
}

/// Reads `path`'s contents, or all of stdin when `path` is `None`.
fn read_input(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).map_err(|err| CliError::new(format!("failed to read {}: {err}", path.display())))
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| CliError::new(format!("failed to read stdin: {err}")))?;
            Ok(buffer)
        }
    }
}

// ============================================================================
// SECTION: Output helpers
// ============================================================================

/// Writes a line to stdout, sidestepping the `println!`-family lint.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a line to stderr, sidestepping the `eprintln!`-family lint.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|err| CliError::new(format!("failed to write stderr: {err}")))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions and helpers are permitted.")]

    use super::*;

    #[test]
    fn load_settings_defaults_when_no_path_given() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_settings_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "not = [valid").unwrap();
        assert!(load_settings(Some(&path)).is_err());
    }

    #[test]
    fn build_orchestrator_defaults_to_an_in_memory_chain() {
        let orchestrator = build_orchestrator(&OrchestratorArgs::default()).unwrap();
        assert_eq!(orchestrator.producer_id(), "judgnode");
    }

    #[test]
    fn build_orchestrator_honors_a_sqlite_chain_db_override() {
        let dir = tempfile::tempdir().unwrap();
        let args = OrchestratorArgs {
            config: None,
            chain_db: Some(dir.path().join("chain.sqlite3")),
            producer_id: Some("test-node".to_string()),
        };
        let orchestrator = build_orchestrator(&args).unwrap();
        assert_eq!(orchestrator.producer_id(), "test-node");
        assert_eq!(orchestrator.chain_handle().status().block_count, 0);
    }

    #[test]
    fn chain_reset_is_a_no_op_on_a_healthy_chain() {
        let args = OrchestratorArgs::default();
        command_chain_reset(ChainResetCommand { orchestrator: args }).unwrap();
    }
}

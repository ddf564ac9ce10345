// crates/ibn-cli/src/main.rs
// ============================================================================
// Module: IBN CLI Entry Point
// Description: Command dispatcher for pipeline runs, inventory, and policies.
// Purpose: Wire configuration, stores, providers, and engines into `ibn`.
// Dependencies: clap, ibn-config, ibn-core, ibn-providers, ibn-store-file,
// ibn-telnet, serde_json, serde_yaml, thiserror, tracing, tracing-subscriber.
// ============================================================================

//! ## Overview
//! `ibn run` drives one policy through the pipeline and exits with a code
//! that reflects where the policy ended. `ibn inventory` refreshes or prints
//! the cached snapshot, and `ibn policy` reads the policy store.
//!
//! Exit codes: `0` assured or stopped early on request, `1` failed, `2` still
//! a draft awaiting steps, `3` usage or environment errors.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use ibn_cli::SystemClock;
use ibn_cli::TopologySource;
use ibn_cli::new_policy_id;
use ibn_cli::render_inventory;
use ibn_cli::render_policy;
use ibn_cli::render_policy_line;
use ibn_config::IbnConfig;
use ibn_core::InventoryCache;
use ibn_core::InventoryRepository;
use ibn_core::InventorySource;
use ibn_core::NoTranslator;
use ibn_core::PipelineOrchestrator;
use ibn_core::PolicyId;
use ibn_core::PolicyRepository;
use ibn_core::RunDisposition;
use ibn_core::RunRequest;
use ibn_core::StopAfter;
use ibn_core::Translator;
use ibn_providers::StepsFileTranslator;
use ibn_store_file::JsonInventoryStore;
use ibn_store_file::YamlPolicyStore;
use ibn_telnet::TelnetConnector;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for a failed policy.
const EXIT_FAILED: u8 = 1;
/// Exit code for a draft that still has no steps.
const EXIT_AWAITING_STEPS: u8 = 2;
/// Exit code for usage, configuration, and environment errors.
const EXIT_USAGE: u8 = 3;

/// Log filter environment variable; `RUST_LOG` is the fallback.
const LOG_ENV: &str = "IBN_LOG";

/// Log targets owned by this workspace.
const LOG_TARGETS: &[&str] =
    &["ibn", "ibn_cli", "ibn_config", "ibn_core", "ibn_providers", "ibn_store_file", "ibn_telnet"];

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "ibn", version, about = "Intent-based networking pipeline for lab topologies")]
struct Cli {
    /// Configuration file (defaults to `ibn.toml`, or `IBN_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Log at debug level.
    #[arg(long, short = 'v', action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or resume a policy and drive it through the pipeline.
    Run(RunCommand),
    /// Inventory snapshot utilities.
    Inventory {
        /// Selected inventory subcommand.
        #[command(subcommand)]
        command: InventoryCommand,
    },
    /// Policy store utilities.
    Policy {
        /// Selected policy subcommand.
        #[command(subcommand)]
        command: PolicyCommand,
    },
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Intent text for a new policy.
    #[arg(long, value_name = "TEXT")]
    intent: Option<String>,
    /// Policy to create or resume; generated when omitted with `--intent`.
    #[arg(long = "policy-id", value_name = "ID")]
    policy_id: Option<String>,
    /// Capture a fresh inventory snapshot before running.
    #[arg(long = "refresh-inventory", action = ArgAction::SetTrue)]
    refresh_inventory: bool,
    /// Stop once the policy is resolved.
    #[arg(long = "skip-activation", action = ArgAction::SetTrue)]
    skip_activation: bool,
    /// Stop once the policy is activated.
    #[arg(long = "skip-assurance", action = ArgAction::SetTrue)]
    skip_assurance: bool,
    /// YAML file of translated steps for a draft policy.
    #[arg(long, value_name = "FILE")]
    steps: Option<PathBuf>,
    /// YAML topology file used instead of the lab platform.
    #[arg(long = "topology-file", value_name = "FILE")]
    topology_file: Option<PathBuf>,
}

/// Inventory subcommands.
#[derive(Subcommand, Debug)]
enum InventoryCommand {
    /// Capture and persist a fresh snapshot.
    Refresh(InventoryRefreshCommand),
    /// Print the persisted snapshot.
    Show(InventoryShowCommand),
}

/// Arguments for `inventory refresh`.
#[derive(Args, Debug)]
struct InventoryRefreshCommand {
    /// YAML topology file used instead of the lab platform.
    #[arg(long = "topology-file", value_name = "FILE")]
    topology_file: Option<PathBuf>,
}

/// Arguments for `inventory show`.
#[derive(Args, Debug)]
struct InventoryShowCommand {
    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: InventoryFormat,
}

/// Output formats for `inventory show`.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum InventoryFormat {
    /// Human-readable report.
    Text,
    /// Snapshot as stored.
    Json,
}

/// Policy subcommands.
#[derive(Subcommand, Debug)]
enum PolicyCommand {
    /// List stored policies as `id<TAB>status<TAB>intent`.
    List,
    /// Print one policy.
    Show(PolicyShowCommand),
}

/// Arguments for `policy show`.
#[derive(Args, Debug)]
struct PolicyShowCommand {
    /// Policy identifier.
    #[arg(value_name = "ID")]
    policy_id: String,
    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: PolicyFormat,
}

/// Output formats for `policy show`.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum PolicyFormat {
    /// Human-readable report.
    Text,
    /// Policy record as stored.
    Yaml,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// User-facing error message.
    message: String,
}

impl CliError {
    /// Creates a new CLI error with the provided message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

/// Wraps any displayable error as a [`CliError`].
fn cli_error(err: impl Display) -> CliError {
    CliError::new(err.to_string())
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point.
fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() { ExitCode::from(EXIT_USAGE) } else { ExitCode::SUCCESS };
        }
    };
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run(cli: Cli) -> CliResult<ExitCode> {
    let config = IbnConfig::load(cli.config.as_deref()).map_err(cli_error)?;
    match cli.command {
        Commands::Run(command) => command_run(&config, command),
        Commands::Inventory {
            command,
        } => match command {
            InventoryCommand::Refresh(command) => command_inventory_refresh(&config, command),
            InventoryCommand::Show(command) => command_inventory_show(&config, &command),
        },
        Commands::Policy {
            command,
        } => match command {
            PolicyCommand::List => command_policy_list(&config),
            PolicyCommand::Show(command) => command_policy_show(&config, &command),
        },
    }
}

/// Installs the stderr log subscriber.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(default_directives("debug"))
    } else {
        std::env::var(LOG_ENV)
            .ok()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new(default_directives("info")))
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Builds filter directives enabling `level` for workspace targets only.
fn default_directives(level: &str) -> String {
    LOG_TARGETS.iter().map(|target| format!("{target}={level}")).collect::<Vec<_>>().join(",")
}

// ============================================================================
// SECTION: Run
// ============================================================================

/// Runs the pipeline, or only refreshes the inventory when no policy is named.
fn command_run(config: &IbnConfig, command: RunCommand) -> CliResult<ExitCode> {
    let inventory = inventory_cache(config, command.topology_file.clone())?;
    let Some(request) = run_request(&command)? else {
        let snapshot = inventory.refresh().map_err(cli_error)?;
        write_stdout_line(&format!(
            "inventory refreshed: {} devices, {} links",
            snapshot.devices.len(),
            snapshot.links.len()
        ))?;
        return Ok(ExitCode::SUCCESS);
    };

    let translator: Box<dyn Translator> = match command.steps {
        Some(path) => Box::new(StepsFileTranslator::new(path)),
        None => Box::new(NoTranslator),
    };
    let orchestrator = PipelineOrchestrator::new(
        YamlPolicyStore::new(&config.paths.policies),
        inventory,
        TelnetConnector::new(config.telnet_config()),
        translator,
        SystemClock,
    );
    let outcome = orchestrator.run(&request).map_err(cli_error)?;
    info!(
        policy_id = %outcome.policy.policy_id,
        disposition = outcome.disposition.as_str(),
        "run finished"
    );
    write_stdout_line(&format!(
        "{}\t{}\t{}",
        outcome.policy.policy_id,
        outcome.policy.status,
        outcome.disposition.as_str()
    ))?;
    Ok(ExitCode::from(disposition_code(outcome.disposition)))
}

/// Builds the run request; `None` asks for an inventory refresh only.
fn run_request(command: &RunCommand) -> CliResult<Option<RunRequest>> {
    let mut request = match (&command.intent, &command.policy_id) {
        (Some(intent), Some(id)) => RunRequest::with_intent(PolicyId::new(id.clone()), intent.clone()),
        (Some(intent), None) => RunRequest::with_intent(new_policy_id(), intent.clone()),
        (None, Some(id)) => RunRequest::resume(PolicyId::new(id.clone())),
        (None, None) if command.refresh_inventory => return Ok(None),
        (None, None) => {
            return Err(CliError::new(
                "run requires --intent or --policy-id (or --refresh-inventory alone)".to_string(),
            ));
        }
    };
    request.refresh_inventory = command.refresh_inventory;
    request.stop_after = stop_after(command.skip_activation, command.skip_assurance);
    Ok(Some(request))
}

/// Maps the skip flags to the furthest stage a run may reach.
const fn stop_after(skip_activation: bool, skip_assurance: bool) -> StopAfter {
    if skip_activation {
        StopAfter::Resolution
    } else if skip_assurance {
        StopAfter::Activation
    } else {
        StopAfter::Completion
    }
}

/// Maps a run disposition to the process exit code.
const fn disposition_code(disposition: RunDisposition) -> u8 {
    match disposition {
        RunDisposition::Assured
        | RunDisposition::StoppedAfterResolution
        | RunDisposition::StoppedAfterActivation => 0,
        RunDisposition::Failed => EXIT_FAILED,
        RunDisposition::AwaitingSteps => EXIT_AWAITING_STEPS,
    }
}

/// Builds the inventory cache over the selected topology source.
fn inventory_cache(
    config: &IbnConfig,
    topology_file: Option<PathBuf>,
) -> CliResult<InventoryCache<TopologySource, JsonInventoryStore, SystemClock>> {
    let platform = config.platform.gns3_config().map_err(|err| err.to_string());
    let source = TopologySource::select(topology_file, platform).map_err(cli_error)?;
    info!(source = source.label(), "topology source selected");
    Ok(InventoryCache::new(source, JsonInventoryStore::new(&config.paths.inventory), SystemClock))
}

// ============================================================================
// SECTION: Inventory
// ============================================================================

/// Captures, persists, and prints a fresh snapshot.
fn command_inventory_refresh(
    config: &IbnConfig,
    command: InventoryRefreshCommand,
) -> CliResult<ExitCode> {
    let inventory = inventory_cache(config, command.topology_file)?;
    let snapshot = inventory.refresh().map_err(cli_error)?;
    write_stdout_text(&render_inventory(&snapshot))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the persisted snapshot.
fn command_inventory_show(config: &IbnConfig, command: &InventoryShowCommand) -> CliResult<ExitCode> {
    let store = JsonInventoryStore::new(&config.paths.inventory);
    let snapshot = store.load().map_err(cli_error)?.ok_or_else(|| {
        CliError::new(format!(
            "no inventory snapshot at {}; run `ibn inventory refresh`",
            store.path().display()
        ))
    })?;
    match command.format {
        InventoryFormat::Text => write_stdout_text(&render_inventory(&snapshot))?,
        InventoryFormat::Json => {
            let text = serde_json::to_string_pretty(&snapshot).map_err(cli_error)?;
            write_stdout_line(&text)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Lists stored policies.
fn command_policy_list(config: &IbnConfig) -> CliResult<ExitCode> {
    let file = YamlPolicyStore::new(&config.paths.policies).load().map_err(cli_error)?;
    for policy in file.policies.values() {
        write_stdout_line(&render_policy_line(policy))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Prints one stored policy.
fn command_policy_show(config: &IbnConfig, command: &PolicyShowCommand) -> CliResult<ExitCode> {
    let file = YamlPolicyStore::new(&config.paths.policies).load().map_err(cli_error)?;
    let policy_id = PolicyId::new(command.policy_id.clone());
    let policy = file
        .get(&policy_id)
        .ok_or_else(|| CliError::new(format!("policy {policy_id} not found")))?;
    match command.format {
        PolicyFormat::Text => write_stdout_text(&render_policy(policy))?,
        PolicyFormat::Yaml => write_stdout_text(&serde_yaml::to_string(policy).map_err(cli_error)?)?,
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(format!("stdout: {err}")))
}

/// Writes pre-formatted text to stdout as is.
fn write_stdout_text(text: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(text.as_bytes()).map_err(|err| CliError::new(format!("stdout: {err}")))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message and returns the usage/environment exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("error: {message}"));
    ExitCode::from(EXIT_USAGE)
}

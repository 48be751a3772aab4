//! cluster-teardown: delete every AWS resource tagged for a cluster
//!
//! Runs one discovery/deletion cycle (or keeps cycling with `--watch`) and
//! prints the reconciled report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;
use teardown_common::defaults::{
    DEFAULT_CYCLE_TIMEOUT_SECS, DEFAULT_MAX_POLL_INTERVAL_SECS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_REGION, DEFAULT_WATCH_TIMEOUT_SECS,
};
use teardown_common::tags::parse_tag_pair;
use teardown_common::{DEFAULT_CLUSTER_TAG_KEY, ResourceKind};
use teardown_coordinator::aws::{AwsContext, aws_error};
use teardown_coordinator::config::{self, TeardownConfig};
use teardown_coordinator::engine::build_engines;
use teardown_coordinator::orchestrator::Orchestrator;
use teardown_coordinator::output::{OutputFormat, render};
use teardown_coordinator::reconcile::{Reconciler, ReportStore};
use teardown_coordinator::teardown::TeardownRunner;
use teardown_coordinator::wait::PollOutcome;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cluster-teardown")]
#[command(about = "Delete the AWS resources owned by a cluster")]
#[command(version)]
struct Args {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Arguments for the delete command (extracted to reduce enum size)
#[derive(clap::Args, Debug)]
struct DeleteArgs {
    /// Cluster whose resources are deleted
    #[arg(long)]
    cluster_id: String,

    /// Extra tag every resource must carry (KEY=VALUE, repeatable)
    #[arg(long = "tag", value_parser = parse_tag_arg)]
    tags: Vec<(String, String)>,

    /// Tag key holding the cluster id
    #[arg(long, env = "CLUSTER_TEARDOWN_TAG_KEY", default_value = DEFAULT_CLUSTER_TAG_KEY)]
    cluster_tag_key: String,

    /// Only handle these resource kinds (repeatable; default: all)
    #[arg(long = "resource")]
    resources: Vec<ResourceKind>,

    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    aws_profile: Option<String>,

    /// Actually delete resources (default is dry-run)
    #[arg(long)]
    execute: bool,

    /// Report file to reconcile against and update
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Keep polling until every resource is gone
    #[arg(long)]
    watch: bool,

    /// Initial delay between polls in seconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval: u64,

    /// Maximum delay between polls in seconds
    #[arg(long, default_value_t = DEFAULT_MAX_POLL_INTERVAL_SECS)]
    max_poll_interval: u64,

    /// Give up watching after this many seconds
    #[arg(long, default_value_t = DEFAULT_WATCH_TIMEOUT_SECS)]
    watch_timeout: u64,

    /// Per-cycle deadline in seconds (0 disables it)
    #[arg(long, default_value_t = DEFAULT_CYCLE_TIMEOUT_SECS)]
    cycle_timeout: u64,

    /// Add resources first seen after the initial cycle to the report
    #[arg(long)]
    adopt_new_items: bool,
}

fn parse_tag_arg(s: &str) -> Result<(String, String), String> {
    parse_tag_pair(s).map_err(|e| e.to_string())
}

impl From<DeleteArgs> for TeardownConfig {
    fn from(args: DeleteArgs) -> Self {
        Self {
            aws: config::AwsConfig {
                region: args.region,
                aws_profile: args.aws_profile,
            },
            cluster: config::ClusterConfig {
                cluster_id: args.cluster_id,
                tag_key: args.cluster_tag_key,
                tags: args.tags.into_iter().collect::<HashMap<_, _>>(),
                kinds: args.resources,
            },
            flags: config::RuntimeFlags {
                execute: args.execute,
                state_file: args.state_file,
                format: args.format,
                watch: args.watch,
                poll_interval: args.poll_interval,
                max_poll_interval: args.max_poll_interval,
                watch_timeout: args.watch_timeout,
                cycle_timeout: args.cycle_timeout,
                adopt_new_items: args.adopt_new_items,
            },
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover and delete the cluster's resources
    Delete(Box<DeleteArgs>),

    /// Print a stored report
    Show {
        /// Report file written by `delete --state-file`
        #[arg(long)]
        state_file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    // Print main error message
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    // Print error chain (causes)
    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(hint) = aws_error(e).and_then(|err| err.suggestion()) {
        let _ = writeln!(stderr, "\n\x1b[36mHint:\x1b[0m {hint}");
    }

    // Only print backtrace hint if not already showing
    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

/// Used when RUST_LOG is unset; AWS SDK crates only show warnings and errors
const DEFAULT_LOG_FILTER: &str = "info,aws_config=warn,aws_smithy_runtime=warn,aws_sdk_rds=warn,aws_sdk_elasticache=warn,aws_sdk_s3=warn";

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    match args.command {
        Command::Delete(delete_args) => {
            let config: TeardownConfig = (*delete_args).into();
            handle_delete(config).await?;
        }

        Command::Show { state_file, format } => {
            handle_show(state_file, format)?;
        }
    }

    Ok(())
}

/// Handle the delete command
async fn handle_delete(config: TeardownConfig) -> Result<()> {
    let kinds = config.cluster.kinds();
    info!(
        cluster_id = %config.cluster.cluster_id,
        required_tags = ?config.cluster.selector().required_tags(),
        region = %config.aws.region,
        dry_run = config.dry_run(),
        kinds = ?kinds,
        "Starting cluster teardown"
    );
    if let Some(profile) = &config.aws.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }

    let aws = AwsContext::with_profile(&config.aws.region, config.aws.aws_profile.as_deref()).await;
    let mut orchestrator = Orchestrator::new(build_engines(&aws, &kinds, &config.cluster.tag_key));
    if let Some(timeout) = config.cycle_timeout() {
        orchestrator = orchestrator.with_cycle_timeout(timeout);
    }

    let mut runner = TeardownRunner::new(
        orchestrator,
        &config.cluster.cluster_id,
        config.cluster.tags.clone(),
        config.dry_run(),
    )
    .with_reconciler(Reconciler::new(config.flags.adopt_new_items));
    if let Some(path) = &config.flags.state_file {
        runner = runner.with_store(ReportStore::new(path))?;
    }

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling teardown");
            ctrl_c_cancel.cancel();
        }
    });

    let cycle = if config.flags.watch {
        let (outcome, cycle) = runner.watch(config.poll_config(), &cancel).await?;
        match outcome {
            PollOutcome::Done { attempts } => info!(attempts, "Teardown finished"),
            PollOutcome::TimedOut { attempts } => {
                warn!(attempts, "Watch timed out with resources remaining")
            }
            PollOutcome::Cancelled { attempts } => warn!(attempts, "Watch cancelled"),
        }
        cycle.context("Watch ended before any cycle ran")?
    } else {
        runner.run_cycle(&cancel).await?
    };

    print!("{}", render(&cycle.published, config.flags.format)?);
    if config.dry_run() && !cycle.published.is_empty() {
        eprintln!("\nDry run: nothing was deleted. Re-run with --execute to delete.");
    }

    if let Some(error) = cycle.error {
        return Err(error.into());
    }
    Ok(())
}

/// Handle the show command
fn handle_show(state_file: PathBuf, format: OutputFormat) -> Result<()> {
    let stored = ReportStore::new(&state_file)
        .load()?
        .with_context(|| format!("No report stored at {}", state_file.display()))?;

    eprintln!(
        "Cluster {} ({}), updated {}",
        stored.cluster_id,
        if stored.dry_run { "dry run" } else { "executed" },
        stored.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    print!("{}", render(&stored.report, format)?);
    Ok(())
}

//! `coral-schedule` CLI — expand expert schedule rules and check them for
//! conflicts from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Expand one rule over an explicit window (RFC 3339 or epoch millis)
//! coral-schedule expand -i rule.json --from 2026-03-02T00:00:00Z --to 2026-03-16T00:00:00Z
//!
//! # Check a candidate rule against existing rules and bookings
//! coral-schedule check -i request.json --fail-on-conflict
//!
//! # List the open slots of expert 7 for the next 14 days
//! coral-schedule --horizon-days 14 available -i store.json --expert 7
//!
//! # Debug logging to stderr
//! RUST_LOG=coral_schedule=debug coral-schedule check -i request.json
//! ```

use std::io::{self, Read};
use std::process;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use coral_schedule::{
    check_rule, expand_with_config, BlockingInterval, ExpansionConfig, ExpertId, InMemoryStore,
    ScheduleChecker, ScheduleRule, Window,
};
use serde::Deserialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Exit status used by `check --fail-on-conflict` when a conflict is found.
const CONFLICT_EXIT_CODE: i32 = 2;

#[derive(Parser)]
#[command(
    name = "coral-schedule",
    version,
    about = "Expand Coral expert schedule rules and detect booking conflicts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with expansion settings (max_occurrences, default_horizon_days)
    #[arg(long, global = true, env = "CORAL_SCHEDULE_CONFIG")]
    config: Option<String>,

    /// Horizon length in days when --to is omitted
    #[arg(long, global = true, env = "CORAL_HORIZON_DAYS")]
    horizon_days: Option<u32>,

    /// Maximum occurrences a single rule may expand to
    #[arg(long, global = true, env = "CORAL_MAX_OCCURRENCES")]
    max_occurrences: Option<usize>,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct WindowArgs {
    /// Window start, RFC 3339 or epoch milliseconds (default: now, or the
    /// rule's repeat start if later)
    #[arg(long)]
    from: Option<String>,
    /// Window end, RFC 3339 or epoch milliseconds (default: start + horizon)
    #[arg(long)]
    to: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a single rule into its occurrences
    Expand {
        /// Rule JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Check a candidate rule against existing rules and bookings
    Check {
        /// Request JSON file: {"candidate": .., "rules": [..], "bookings": [..]}
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        #[command(flatten)]
        window: WindowArgs,
        /// Exit with status 2 when a conflict is found
        #[arg(long)]
        fail_on_conflict: bool,
    },
    /// List an expert's slots that are still open for booking
    Available {
        /// Store JSON file: {"rules": [..], "bookings": [..]}
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Expert whose slots to list
        #[arg(long)]
        expert: ExpertId,
        #[command(flatten)]
        window: WindowArgs,
    },
}

/// Input document for `check`.
#[derive(Deserialize)]
struct CheckRequest {
    candidate: ScheduleRule,
    #[serde(default)]
    rules: Vec<ScheduleRule>,
    #[serde(default)]
    bookings: Vec<BlockingInterval>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    debug!(?config, "loaded expansion config");

    match cli.command {
        Commands::Expand {
            input,
            output,
            window,
        } => {
            let rule: ScheduleRule = serde_json::from_str(&read_input(input.as_deref())?)
                .context("Failed to parse schedule rule")?;
            let window = resolve_window(&window, Utc::now().max(rule.repeat_start), &config)?;

            let occurrences = expand_with_config(&rule, window.start, window.end, &config)
                .context("Failed to expand schedule rule")?;
            info!(count = occurrences.len(), "expanded rule");

            write_output(output.as_deref(), &serde_json::to_string_pretty(&occurrences)?)?;
        }
        Commands::Check {
            input,
            output,
            window,
            fail_on_conflict,
        } => {
            let request: CheckRequest = serde_json::from_str(&read_input(input.as_deref())?)
                .context("Failed to parse check request")?;
            let anchor = Utc::now().max(request.candidate.repeat_start);
            let window = resolve_window(&window, anchor, &config)?;

            let report = check_rule(
                &request.candidate,
                &request.rules,
                &request.bookings,
                &window,
                &config,
            )
            .context("Failed to check candidate rule")?;
            info!(
                conflicts = report.conflicts.len(),
                skipped = report.skipped_rules.len(),
                "checked candidate rule"
            );

            write_output(output.as_deref(), &serde_json::to_string_pretty(&report)?)?;
            if fail_on_conflict && report.has_conflict() {
                process::exit(CONFLICT_EXIT_CODE);
            }
        }
        Commands::Available {
            input,
            output,
            expert,
            window,
        } => {
            let store: InMemoryStore = serde_json::from_str(&read_input(input.as_deref())?)
                .context("Failed to parse schedule store")?;
            let window = resolve_window(&window, Utc::now(), &config)?;

            let checker = ScheduleChecker::with_config(store.clone(), store, config);
            let bookable = checker
                .bookable_slots(expert, &window)
                .context("Failed to compute bookable slots")?;
            info!(open = bookable.slots.len(), "computed bookable slots");

            write_output(output.as_deref(), &serde_json::to_string_pretty(&bookable)?)?;
        }
    }

    Ok(())
}

/// Log to stderr so JSON on stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Config file first, then command-line/env overrides.
fn load_config(cli: &Cli) -> Result<ExpansionConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            ExpansionConfig::from_json(&json)
                .with_context(|| format!("Failed to parse config file: {}", path))?
        }
        None => ExpansionConfig::default(),
    };
    if let Some(days) = cli.horizon_days {
        config.default_horizon_days = days;
    }
    if let Some(max) = cli.max_occurrences {
        config.max_occurrences = max;
    }
    Ok(config)
}

/// Build the query window from `--from`/`--to`, defaulting the start to
/// `anchor` and the end to the configured horizon.
fn resolve_window(
    args: &WindowArgs,
    anchor: DateTime<Utc>,
    config: &ExpansionConfig,
) -> Result<Window> {
    let start = match args.from.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => anchor,
    };
    match args.to.as_deref() {
        Some(raw) => Window::new(start, parse_instant(raw)?).context("Invalid window"),
        None => Ok(Window::starting_at(start, config.default_horizon_days)),
    }
}

/// Accept RFC 3339 (`2026-03-02T09:00:00Z`) or epoch milliseconds.
fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis)
            .with_context(|| format!("Timestamp out of range: {}", raw));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid instant '{}': expected RFC 3339 or epoch millis", raw))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

//! slotctl: inspect slot grids, resolve post times and run dispatch cycles.
//!
//! Commands that need records read a JSON document from `--input` or stdin
//! and print JSON to stdout. Logs go to stderr.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use slot_engine::temporal::{civil_today, parse_wall_clock};
use slot_engine::{
    build_grid, due_window, format_in_zone, is_day_active, is_slot_active, resolve_local,
    select_due, AvailabilityRule, ChannelAccount, DayOfWeek, Dispatcher, DryRunPublisher,
    EngineConfig, LoggingConfig, MemoryStore, PostFilter, ScheduleStore, ScheduledPost,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Scheduling toolkit for timed social posts
#[derive(Parser, Debug)]
#[command(name = "slotctl")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Read the JSON document from this file instead of stdin
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the slot grid from `{"rules": [...], "posts": [...]}`
    Grid {
        /// First day of the grid (defaults to today in --timezone)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Zone used to determine today
        #[arg(long, default_value = "UTC")]
        timezone: String,
        /// Number of days to show (defaults to grid.window_days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Check whether a weekday and time accept posts, given `{"rules": [...]}`
    Slot {
        /// Weekday name, e.g. "monday"
        #[arg(long)]
        day: DayOfWeek,
        /// Wall-clock time, HH:MM or HH:MM:SS
        #[arg(long)]
        time: String,
    },
    /// Resolve a wall-clock time in one zone and render it in another
    Convert {
        /// Civil date, YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Wall-clock time, HH:MM or HH:MM:SS
        #[arg(long)]
        time: String,
        /// Zone the time is written in
        #[arg(long)]
        from: String,
        /// Zone to render in
        #[arg(long, default_value = "UTC")]
        to: String,
        /// strftime pattern for the rendered time
        #[arg(long, default_value = "%Y-%m-%d %H:%M:%S %Z")]
        format: String,
    },
    /// List the posts from `{"posts": [...]}` that are due at --now
    Due {
        /// Evaluation instant, RFC 3339 (defaults to the current time)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Run one dry-run dispatch cycle over `{"posts": [...], "accounts": [...]}`
    Dispatch {
        /// Evaluation instant, RFC 3339 (defaults to the current time)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct Records {
    #[serde(default)]
    rules: Vec<AvailabilityRule>,
    #[serde(default)]
    posts: Vec<ScheduledPost>,
    #[serde(default)]
    accounts: Vec<ChannelAccount>,
}

fn init_tracing(logging: &LoggingConfig, json_logs: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if json_logs || logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_input<T: DeserializeOwned>(path: Option<&Path>) -> Result<T> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    serde_json::from_str(&content).context("Failed to parse input JSON")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    init_tracing(&config.logging, args.json_logs);

    let input = args.input.as_deref();
    match args.command {
        Command::Grid {
            today,
            timezone,
            days,
        } => {
            let records: Records = read_input(input)?;
            let today = match today {
                Some(today) => today,
                None => civil_today(Utc::now(), &timezone)?,
            };
            let window_days = days.unwrap_or(config.grid.window_days);
            let grid = build_grid(today, window_days, &records.rules, &records.posts);
            print_json(&grid)
        }
        Command::Slot { day, time } => {
            let records: Records = read_input(input)?;
            let parsed = parse_wall_clock(&time)?;
            print_json(&json!({
                "day": day,
                "time": time,
                "day_active": is_day_active(day, &records.rules),
                "slot_active": is_slot_active(day, parsed, &records.rules),
            }))
        }
        Command::Convert {
            date,
            time,
            from,
            to,
            format,
        } => {
            let resolved = resolve_local(&date, &time, &from)?;
            let rendered = format_in_zone(resolved.instant, &to, &format)?;
            print_json(&json!({
                "instant": resolved.instant,
                "source_local": resolved.local,
                "source_offset": resolved.utc_offset,
                "disambiguation": resolved.disambiguation,
                "rendered": rendered,
            }))
        }
        Command::Due { now } => {
            let records: Records = read_input(input)?;
            let now = now.unwrap_or_else(Utc::now);
            let tolerance = config.dispatch.tolerance();
            let due: Vec<_> = select_due(&records.posts, now, tolerance)
                .into_iter()
                .map(|post| {
                    let window = due_window(now, &post.target_timezone, tolerance)
                        .map(|w| w.to_string())
                        .unwrap_or_default();
                    json!({
                        "id": post.id,
                        "social_channel": post.social_channel,
                        "content_time": post.content_time,
                        "target_timezone": post.target_timezone,
                        "window": window,
                    })
                })
                .collect();
            tracing::info!(candidates = records.posts.len(), due = due.len(), "due check");
            print_json(&due)
        }
        Command::Dispatch { now } => {
            let records: Records = read_input(input)?;
            let now = now.unwrap_or_else(Utc::now);
            let store = Arc::new(MemoryStore::with_records(
                Default::default(),
                records.posts,
                records.accounts,
            ));
            let dispatcher = Dispatcher::new(
                store.clone(),
                DryRunPublisher::registry(),
                config.dispatch.clone(),
            );
            let report = dispatcher.run_cycle(now).await?;
            let posts = store.posts(&PostFilter::default()).await?;
            print_json(&json!({ "report": report, "posts": posts }))
        }
    }
}

mod commands;
mod health;
mod startup;

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use herald_core::Config;
use herald_notify::{AllowListGate, RoleGate};

use crate::commands::Span;

// ── CLI ─────────────────────────────────────────────────────────────

/// herald: one-hour-ahead reminders for recurring yearly events.
#[derive(Parser, Debug)]
#[command(name = "herald", version, about)]
struct Cli {
    /// Configuration profile (keys are looked up as `{PROFILE}_{KEY}` first).
    #[arg(long, env = "HERALD_PROFILE", global = true)]
    profile: Option<String>,

    /// Override the schedule directory.
    #[arg(long, global = true)]
    schedule_dir: Option<PathBuf>,

    /// Override the ledger file.
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the reminder daemon (default).
    Run,
    /// Show the next occurrence of every event type.
    Status {
        /// Print the occurrences as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List occurrences within the next days or months.
    Upcoming {
        #[arg(long, conflicts_with = "months")]
        days: Option<u32>,
        #[arg(long)]
        months: Option<u32>,
    },
    /// Parse every schedule source and report skipped lines.
    Check,
    /// Send a delivery test message (requires an authorized actor).
    Ping {
        #[arg(long)]
        actor: String,
    },
}

fn load_config(cli: &Cli) -> Config {
    herald_core::config::load_dotenv();
    let mut config = match &cli.profile {
        Some(p) => Config::for_profile(p),
        None => Config::from_env(),
    };
    if let Some(dir) = &cli.schedule_dir {
        config.schedule.dir = dir.clone();
    }
    if let Some(path) = &cli.ledger {
        config.ledger.path = path.clone();
    }
    config
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);
    let now = Utc::now();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => startup::run(config).await?,
        Command::Status { json } => {
            let outcome = commands::load(&config, now)?;
            if json {
                let next: Vec<_> = herald_schedule::query::next_per_type(&outcome.occurrences, now)
                    .into_values()
                    .collect();
                println!("{}", serde_json::to_string_pretty(&next)?);
            } else {
                println!("{}", commands::render_status(&outcome.occurrences, now));
            }
        }
        Command::Upcoming { days, months } => {
            let span = match (days, months) {
                (_, Some(m)) => Span::Months(m),
                (Some(d), None) => Span::Days(d),
                (None, None) => Span::Days(7),
            };
            let outcome = commands::load(&config, now)?;
            println!("{}", commands::render_upcoming(&outcome.occurrences, now, span));
        }
        Command::Check => {
            let outcome = commands::load(&config, now)?;
            let (text, problems) = commands::render_check(&outcome.reports);
            println!("{text}");
            if problems {
                std::process::exit(1);
            }
        }
        Command::Ping { actor } => {
            let gate = AllowListGate::from_csv(&config.delivery.admin_actors);
            if !gate.is_authorized(&actor) {
                anyhow::bail!("actor '{actor}' is not allowed to run operator commands");
            }
            let notifier = startup::build_notifier(&config)?;
            notifier.test().await.context("delivery test failed")?;
            info!(actor = %actor, channel = notifier.channel_name(), "delivery test sent");
        }
    }

    Ok(())
}

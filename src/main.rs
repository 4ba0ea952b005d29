use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use drink_rollup::config::{self, Config};
use drink_rollup::{
    DateKeyResolver, DayRollup, DrinkingSession, DrinksList, SessionDrinksAdapter,
    TimezoneSetting, build_day_rollups, build_day_rollups_from_sessions,
    get_by_type_stacked_weekly, get_kpis,
};

#[derive(Parser)]
#[command(name = "drink-rollup")]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// IANA timezone for local days, overriding the config (e.g. "Europe/Prague")
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// User identifier stamped on every day rollup
    #[arg(long, global = true, default_value = "local")]
    user: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one aggregate per local day as JSON
    Rollups(LogArgs),
    /// Print the per-type weekly stacked series as JSON
    Weekly(WeeklyArgs),
    /// Print today's and this week's totals as JSON
    Kpis(LogArgs),
    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct LogArgs {
    /// JSON file holding a drink log (timestamp -> {drink type: count})
    log: PathBuf,

    /// Treat the file as a map of drinking sessions instead of a flat log
    #[arg(long, default_value_t = false)]
    sessions: bool,

    /// Pretty-print JSON instead of a single line
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Args)]
struct WeeklyArgs {
    #[command(flatten)]
    input: LogArgs,

    /// Number of weeks to chart, overriding the config
    #[arg(long)]
    weeks: Option<usize>,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    subcommand: ConfigSubcommands,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Create default configuration file
    Init {
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Show current configuration
    Show,
    /// Set configuration value
    Set {
        /// Configuration key (timezone, timezone-automatic, weeks, week-start, unit.<drink type>)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("DRINK_ROLLUP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let timezone = cli.timezone.as_deref();
    let user_id = cli.user.as_str();
    let result = match cli.command {
        Commands::Rollups(args) => analytics_context(timezone)
            .and_then(|(config, resolver)| run_rollups(&args, user_id, &config, &resolver)),
        Commands::Weekly(args) => analytics_context(timezone)
            .and_then(|(config, resolver)| run_weekly(&args, user_id, &config, &resolver)),
        Commands::Kpis(args) => analytics_context(timezone)
            .and_then(|(config, resolver)| run_kpis(&args, user_id, &config, &resolver)),
        Commands::Config(config_args) => handle_config_subcommand(config_args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Config plus the one timezone snapshot used for the whole run.
fn analytics_context(timezone: Option<&str>) -> Result<(Config, DateKeyResolver)> {
    // Load config file to get defaults
    let config = Config::load()
        .context("Config error")?
        .unwrap_or_default();

    let timezone = match timezone {
        Some(zone) => TimezoneSetting::fixed(zone),
        None => config.timezone_setting(),
    };
    let resolver = DateKeyResolver::from_setting(&timezone);

    Ok((config, resolver))
}

fn load_day_rollups(
    args: &LogArgs,
    user_id: &str,
    config: &Config,
    resolver: &DateKeyResolver,
) -> Result<Vec<DayRollup>> {
    let mut bytes = fs::read(&args.log)
        .with_context(|| format!("Failed to read {}", args.log.display()))?;
    let units = config.drinks_to_units();

    let mut rows = if args.sessions {
        let sessions: BTreeMap<String, DrinkingSession> = simd_json::from_slice(&mut bytes)
            .context("Failed to parse drinking sessions")?;
        let sessions: Vec<DrinkingSession> = sessions.into_values().collect();
        build_day_rollups_from_sessions(
            Some(sessions.as_slice()),
            &SessionDrinksAdapter,
            &units,
            user_id,
            resolver,
        )
    } else {
        let drinks: DrinksList =
            simd_json::from_slice(&mut bytes).context("Failed to parse drink log")?;
        build_day_rollups(&drinks, &units, user_id, resolver)
    };

    rows.sort_by(|a, b| a.date_key.cmp(&b.date_key));
    tracing::info!(days = rows.len(), log = %args.log.display(), "built day rollups");
    Ok(rows)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        simd_json::to_string_pretty(value)?
    } else {
        simd_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

fn run_rollups(
    args: &LogArgs,
    user_id: &str,
    config: &Config,
    resolver: &DateKeyResolver,
) -> Result<()> {
    let rows = load_day_rollups(args, user_id, config, resolver)?;
    print_json(&rows, args.pretty)
}

fn run_weekly(
    args: &WeeklyArgs,
    user_id: &str,
    config: &Config,
    resolver: &DateKeyResolver,
) -> Result<()> {
    let rows = load_day_rollups(&args.input, user_id, config, resolver)?;
    let weeks = args.weeks.unwrap_or(config.analytics.weeks);
    let points = get_by_type_stacked_weekly(
        &rows,
        weeks,
        Utc::now(),
        resolver,
        config.analytics.week_start,
    );
    print_json(&points, args.input.pretty)
}

fn run_kpis(
    args: &LogArgs,
    user_id: &str,
    config: &Config,
    resolver: &DateKeyResolver,
) -> Result<()> {
    let rows = load_day_rollups(args, user_id, config, resolver)?;
    let kpis = get_kpis(&rows, Utc::now(), resolver, config.analytics.week_start);
    print_json(&kpis, args.pretty)
}

fn handle_config_subcommand(config_args: ConfigArgs) -> Result<()> {
    match config_args.subcommand {
        ConfigSubcommands::Init { overwrite } => {
            config::create_default_config(overwrite).context("Error creating config")
        }
        ConfigSubcommands::Show => config::show_config().context("Error showing config"),
        ConfigSubcommands::Set { key, value } => {
            config::set_config_value(&key, &value).context("Error setting config")
        }
    }
}

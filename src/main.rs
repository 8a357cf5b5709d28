use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ta_direction_agents::config::{LoggingSettings, Settings};
use ta_direction_agents::indicators::{find_indicator, Family};
use ta_direction_agents::ml::FeatureFrame;
use ta_direction_agents::registry::{self, build_agent_from_settings};
use ta_direction_agents::types::{Bar, OhlcvFrame};
use ta_direction_agents::{SafeStrategy, SignalAgent};

#[derive(Parser)]
#[command(name = "ta-agents")]
#[command(version = "0.1.0")]
#[command(about = "Technical-analysis agents scoring next-bar direction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to ./ta-agents.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List every available agent
    List {
        /// Only show one family (overlap, momentum, money_flow, pattern, ...)
        #[arg(short, long)]
        family: Option<String>,
    },
    /// Print the feature frame an agent trains on
    Features {
        #[arg(short, long)]
        agent: String,
        /// JSON array of bars
        #[arg(short, long)]
        input: PathBuf,
        /// Number of most recent rows to print
        #[arg(short, long, default_value = "10")]
        tail: usize,
    },
    /// Fit an agent and optionally save the model
    Fit {
        #[arg(short, long)]
        agent: String,
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the fitted model (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Score the most recent bar
    Score {
        #[arg(short, long)]
        agent: String,
        #[arg(short, long)]
        input: PathBuf,
        /// Load a saved model instead of fitting
        #[arg(short, long)]
        model: Option<PathBuf>,
        /// Fall back to a neutral score on any failure
        #[arg(long, conflicts_with = "model")]
        safe: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Err(errors) = settings.validate() {
        bail!("Invalid configuration: {}", errors.join("; "));
    }
    init_logging(&settings.logging, cli.verbose)?;
    debug!("Configuration loaded: {:?}", settings);

    match cli.command {
        Commands::List { family } => list_agents(family.as_deref())?,
        Commands::Features { agent, input, tail } => show_features(&agent, &input, tail, &settings)?,
        Commands::Fit { agent, input, output } => fit_agent(&agent, &input, output.as_deref(), &settings)?,
        Commands::Score { agent, input, model, safe } => {
            score_agent(&agent, &input, model.as_deref(), safe, &settings)?
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingSettings, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if logging.json {
        let subscriber = FmtSubscriber::builder()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

fn load_history(path: &Path) -> Result<OhlcvFrame> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let bars: Vec<Bar> =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON array of bars", path.display()))?;
    let frame = OhlcvFrame::from_bars(&bars)?;
    info!("Loaded {} bars from {}", frame.len(), path.display());
    Ok(frame)
}

fn list_agents(family: Option<&str>) -> Result<()> {
    let family = family
        .map(|f| f.parse::<Family>().map_err(|e| anyhow!(e)))
        .transpose()?;

    println!(
        "\n{:<22} {:<16} {:>5} {:<30} {:>8}",
        "Agent", "Family", "Days", "Columns", "Min rows"
    );
    println!("{}", "-".repeat(85));
    let mut shown = 0;
    for entry in registry::catalog() {
        if family.is_some_and(|f| f != entry.family) {
            continue;
        }
        let columns: Vec<&str> = entry.columns.iter().map(|c| c.as_str()).collect();
        println!(
            "{:<22} {:<16} {:>5} {:<30} {:>8}",
            entry.name,
            entry.family.to_string(),
            entry.ideal_period,
            columns.join(","),
            entry.min_rows
        );
        shown += 1;
    }
    println!("{}", "-".repeat(85));
    println!("{} agents", shown);
    Ok(())
}

fn show_features(name: &str, input: &Path, tail: usize, settings: &Settings) -> Result<()> {
    let indicator = find_indicator(registry::normalise_name(name))
        .ok_or_else(|| anyhow!("{} has no indicator feature frame", name))?;
    let history = load_history(input)?;
    let features = FeatureFrame::extract(indicator.as_ref(), &history)?;

    let decimals = settings.output.decimals as usize;
    let timestamps = history.timestamps();
    let first = features.len().saturating_sub(tail);

    print!("\n{:>8} {:<26}", "Row", "Timestamp");
    for feature in features.names() {
        print!(" {:>14}", feature);
    }
    println!();
    for (i, row) in features.rows().outer_iter().enumerate().skip(first) {
        let index = features.start() + i;
        let stamp = timestamps
            .and_then(|t| t.get(index))
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        print!("{:>8} {:<26}", index, stamp);
        for value in row.iter() {
            print!(" {:>14.*}", decimals, value);
        }
        println!();
    }
    println!("\n{} feature rows from {} bars", features.len(), history.len());
    Ok(())
}

fn fit_agent(name: &str, input: &Path, output: Option<&Path>, settings: &Settings) -> Result<()> {
    let mut agent = build_agent_from_settings(name, settings)?;
    let history = load_history(input)?;
    let report = agent.fit(&history)?;

    println!("\n=== {} Training Report ===", agent.name());
    println!("Samples: {}", report.samples);
    println!("Accuracy: {:.1}%", report.accuracy * 100.0);
    println!("Up / Down: {} / {}", report.ups_in_data, report.downs_in_data);
    println!("Iterations: {}", report.iterations);

    if let Some(path) = output {
        let json = agent
            .save_model()?
            .ok_or_else(|| anyhow!("{} has no model to save", agent.name()))?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved {} model to {}", agent.name(), path.display());
    }
    Ok(())
}

fn score_agent(
    name: &str,
    input: &Path,
    model: Option<&Path>,
    safe: bool,
    settings: &Settings,
) -> Result<()> {
    let agent = build_agent_from_settings(name, settings)?;
    let history = load_history(input)?;
    let decimals = settings.output.decimals;

    let (label, score) = if safe {
        let mut strategy = SafeStrategy::new(agent, decimals);
        let score = strategy.strategy(&history);
        (strategy.agent().name().to_string(), score)
    } else {
        let mut agent = agent;
        match model {
            Some(path) => {
                let json =
                    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
                agent.load_model(&json)?;
                info!("Loaded {} model from {}", agent.name(), path.display());
            }
            None => {
                agent.fit(&history)?;
            }
        }
        let price = history.last_close().context("History is empty")?;
        (agent.name().to_string(), agent.predict(price, &history)?)
    };

    println!("{}: {:.*}", label, decimals as usize, score);
    Ok(())
}

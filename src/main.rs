use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use election_tally::config::{Config, ConfigOverrides};
use election_tally::output::{render, OutputFormat};
use election_tally::server::run_server;
use election_tally::store::{CandidateRepository, FormRepository, SqliteStore};
use election_tally::tally::aggregate_summary;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "election-tally",
    about = "County Form 34B tallying backend"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    db: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the REST API.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the national tally across all submitted forms.
    Summary,
    Forms,
    Candidates,
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    let (host, port) = match &cli.command {
        Commands::Serve { host, port } => (host.clone(), *port),
        _ => (None, None),
    };
    config.apply_overrides(ConfigOverrides {
        host,
        port,
        db_path: cli.db.clone(),
    });

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Config { init, show } = &cli.command {
        return handle_config_command(*init, *show, &config, &config_path);
    }
    if matches!(cli.command, Commands::Serve { .. }) {
        return run_server(config).await;
    }

    let db_path = config.resolved_db_path();
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("failed opening tally database: {}", db_path.display()))?;

    match &cli.command {
        Commands::Summary => {
            let forms = store.list_forms()?;
            let Some(report) = aggregate_summary(&forms) else {
                info!("no forms in {}", db_path.display());
                println!("No forms have been submitted yet");
                return Ok(());
            };
            println!("{}", render(&report, cli.output)?);
        }
        Commands::Forms => {
            let forms = store.list_forms()?;
            println!("{}", render(forms.as_slice(), cli.output)?);
        }
        Commands::Candidates => {
            let candidates = store.list_candidates()?;
            println!("{}", render(candidates.as_slice(), cli.output)?);
        }
        Commands::Serve { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

fn handle_config_command(
    init: bool,
    show: bool,
    config: &Config,
    config_path: &PathBuf,
) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", serde_json::to_string_pretty(config)?);
    }
    Ok(())
}

//! Marketdesk CLI - market news query sessions from the command line
//!
//! A thin frontend over marketdesk-core's intent API. Each invocation
//! restores the persisted tab session, applies one intent, and exits; the
//! dashboard UI shares the same core.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::Confirm;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use marketdesk_core::{
    shared_state, Confirmation, ConfigManager, HttpNewsBackend, NewsBackend, NewsRecord,
    QueryMode, QueryOrchestrator, QueryOutcome, StaticGeoProvider, TabStore,
};

#[derive(Parser)]
#[command(name = "marketdesk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Geographically-weighted market news sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List known stock exchanges
    Exchanges,

    /// Run a market news query and open a new tab
    #[command(subcommand)]
    Query(QueryCommands),

    /// List the persisted result tabs
    Tabs,

    /// Make a tab active
    Select {
        /// Tab id
        id: String,
    },

    /// Close a tab
    Close {
        /// Tab id
        id: String,
    },

    /// Close every tab and delete the persisted session
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show configuration
    Config {
        /// Write the current configuration to its file (creates the default)
        #[arg(long)]
        init: bool,
    },

    /// Show recent query history kept by the backend
    History {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// Check backend liveness
    Health,
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Query by position. Without --lat/--lon no geolocation source exists
    /// and the query is rejected.
    Location {
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
    },

    /// Query a specific exchange by id
    Exchange {
        /// Exchange id, e.g. NYSE
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let manager = ConfigManager::new().context("failed to load configuration")?;
    let config = manager.config().clone();
    debug!(backend_url = %config.backend_url, "configuration loaded");

    let backend: Arc<dyn NewsBackend> =
        Arc::new(HttpNewsBackend::new(&config).context("failed to build backend client")?);

    let storage_path = config
        .storage_path
        .clone()
        .unwrap_or_else(TabStore::default_storage_path);
    debug!(path = ?storage_path, "restoring tab session");
    let mut tabs = TabStore::new(storage_path);
    tabs.load_from_storage();

    let mut orchestrator =
        QueryOrchestrator::new(backend.clone(), tabs, shared_state(), &config);

    match cli.command {
        Commands::Exchanges => {
            orchestrator.load_exchanges().await?;
            for exchange in orchestrator.registry().all() {
                println!(
                    "{:8} {} ({}, {}) - {}",
                    style(&exchange.id).cyan(),
                    exchange.name,
                    exchange.city,
                    exchange.country,
                    exchange.indices.join(", ")
                );
            }
        }

        Commands::Query(query) => {
            let outcome = match query {
                QueryCommands::Location { lat, lon } => {
                    if let (Some(lat), Some(lon)) = (lat, lon) {
                        orchestrator = orchestrator
                            .with_geo_provider(Arc::new(StaticGeoProvider::new(lat, lon)));
                    }
                    orchestrator.select_mode(QueryMode::LocationBased);
                    orchestrator.run_selected(None).await
                }
                QueryCommands::Exchange { id } => {
                    orchestrator.load_exchanges().await?;
                    orchestrator.select_mode(QueryMode::ExchangeSpecific);
                    orchestrator.run_selected(Some(&id)).await
                }
            };

            match outcome {
                Ok(QueryOutcome::Completed { tab_id, records }) => {
                    println!(
                        "{} {} ({} records)",
                        style("opened tab").green(),
                        tab_id,
                        records
                    );
                    if let Some(tab) = orchestrator.tabs().active_tab() {
                        print_records(&tab.data);
                    }
                }
                Ok(QueryOutcome::Superseded) => {
                    println!("{}", style("query superseded by a newer one").yellow());
                }
                Err(e) => {
                    eprintln!("{} {}", style("query failed:").red(), e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Tabs => {
            let store = orchestrator.tabs();
            if store.is_empty() {
                println!("no tabs");
            }
            for tab in store.tabs() {
                let marker = if store.active_tab_id() == Some(tab.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {}  {}  {} ({} records)",
                    marker,
                    style(&tab.id).cyan(),
                    tab.timestamp,
                    tab.title,
                    tab.data.len()
                );
            }
        }

        Commands::Select { id } => {
            if orchestrator.select_tab(&id) {
                println!("active tab: {}", id);
            } else {
                eprintln!("no such tab: {}", id);
                std::process::exit(1);
            }
        }

        Commands::Close { id } => {
            if orchestrator.close_tab(&id)? {
                match orchestrator.tabs().active_tab_id() {
                    Some(active) => println!("closed {}, active tab is now {}", id, active),
                    None => println!("closed {}, no tabs left", id),
                }
            } else {
                eprintln!("no such tab: {}", id);
                std::process::exit(1);
            }
        }

        Commands::Clear { yes } => {
            let confirmation = if yes || confirm_clear(orchestrator.tabs().len())? {
                Confirmation::Confirmed
            } else {
                Confirmation::Aborted
            };

            if orchestrator.clear_all(confirmation)? {
                println!("cleared all tabs");
            } else {
                println!("aborted");
            }
        }

        Commands::Config { init } => {
            if init {
                manager.save().context("failed to write config file")?;
                println!("wrote {}", manager.config_path().display());
            }
            println!("config file:  {}", manager.config_path().display());
            println!("backend url:  {}", config.backend_url);
            println!("timeouts:     request {}s, geolocation {}s",
                config.request_timeout_secs, config.geolocation_timeout_secs);
            println!("query limits: {} day(s), {} results", config.days, config.max_results);
            println!(
                "tab storage:  {}",
                config
                    .storage_path
                    .clone()
                    .unwrap_or_else(TabStore::default_storage_path)
                    .display()
            );
        }

        Commands::History { limit } => {
            let history = backend.history(limit).await?;
            for entry in &history {
                println!("{}", serde_json::to_string_pretty(entry)?);
            }
            if history.is_empty() {
                println!("no history");
            }
        }

        Commands::Health => {
            if backend.health().await? {
                println!("{}", style("backend is up").green());
            } else {
                println!("{}", style("backend is unhealthy").red());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn confirm_clear(count: usize) -> anyhow::Result<bool> {
    Ok(Confirm::new()
        .with_prompt(format!(
            "Close all {} tabs and delete the saved session?",
            count
        ))
        .default(false)
        .interact()?)
}

fn print_records(records: &[NewsRecord]) {
    for record in records {
        let title = record.title.as_deref().unwrap_or("(untitled)");
        println!("  {}", style(title).bold());
        if let Some(impact) = &record.primary_exchange {
            let direction = impact
                .predicted_impact
                .map(|i| format!("{:?}", i).to_lowercase())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "    impact: {} on {} ({})",
                direction,
                impact.exchange_name.as_deref().unwrap_or("?"),
                impact.confidence.as_deref().unwrap_or("?")
            );
        }
        if let Some(url) = &record.url {
            println!("    {}", style(url).dim());
        }
    }
}

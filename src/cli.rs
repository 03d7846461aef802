//! Command-line interface.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use rentscout::config::Config;
use rentscout::models::SearchCriteria;
use rentscout::scrapers::{
    DirectRenderer, HttpClient, PageRenderer, RelayRenderer, ScraperManager, SourceRegistry,
};

#[derive(Parser)]
#[command(name = "rentscout", version, about = "Multi-source rental listing aggregator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API server (default).
    Serve,
    /// Run one aggregation and print the result as JSON.
    Search {
        #[arg(long)]
        city: String,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long)]
        min_rooms: Option<f32>,
        #[arg(long)]
        max_rooms: Option<f32>,
        #[arg(long)]
        min_size: Option<f32>,
        #[arg(long)]
        max_size: Option<f32>,
        /// District filter, repeatable.
        #[arg(long)]
        district: Vec<String>,
    },
    /// List configured sources.
    Sources,
}

/// Build the aggregation engine from configuration.
pub fn build_manager(config: &Config) -> anyhow::Result<ScraperManager> {
    let registry = match &config.sources_file {
        Some(path) => SourceRegistry::from_file(path)?,
        None => SourceRegistry::builtin(),
    };

    let client = HttpClient::new(config.request_timeout());
    let direct: Arc<dyn PageRenderer> = Arc::new(DirectRenderer::new(client.clone()));
    let relay: Option<Arc<dyn PageRenderer>> = config
        .render_endpoint
        .as_ref()
        .map(|endpoint| -> Arc<dyn PageRenderer> {
            Arc::new(RelayRenderer::new(client.clone(), endpoint.clone()))
        });

    Ok(ScraperManager::new(
        &registry,
        config.manager_config(),
        direct,
        relay,
    ))
}

/// Parse arguments and dispatch.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let manager = Arc::new(build_manager(&config)?);
            rentscout::server::serve(manager, &config.listen_addr).await
        }
        Command::Search {
            city,
            min_price,
            max_price,
            min_rooms,
            max_rooms,
            min_size,
            max_size,
            district,
        } => {
            let criteria = SearchCriteria {
                city,
                min_price,
                max_price,
                min_rooms,
                max_rooms,
                min_size,
                max_size,
                districts: district,
                features: Vec::new(),
            };
            let manager = build_manager(&config)?;
            let result = manager.search_all(&criteria).await?;
            info!(
                "{} listings, {}/{} sources ok",
                result.total_found,
                result.succeeded(),
                result.sources.len()
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Command::Sources => {
            let registry = match &config.sources_file {
                Some(path) => SourceRegistry::from_file(path)?,
                None => SourceRegistry::builtin(),
            };
            for source in registry.sources() {
                println!(
                    "{}\tenabled={}\tmode={:?}\trender={}",
                    source.name, source.enabled, source.mode, source.render
                );
            }
            Ok(())
        }
    }
}

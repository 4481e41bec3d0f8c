//! solr-exporter - Solr metrics collector
//!
//! Serves a Prometheus-compatible metrics endpoint backed by the Solr core
//! admin and mbeans APIs, or runs a single collection cycle with `--once`.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use solr_exporter::accumulator::MemoryAccumulator;
use solr_exporter::cli::Cli;
use solr_exporter::collector::Collector;
use solr_exporter::config::Config;
use solr_exporter::server;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    solr_exporter::init_logging(&cli.log_level.to_string())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting solr-exporter"
    );

    let mut config = Config::load_or_default(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.validate {
        println!("Configuration is valid");
        println!("  Solr servers: {}", config.solr.servers.join(", "));
        if !config.solr.cores.is_empty() {
            println!("  Cores: {}", config.solr.cores.join(", "));
        }
        println!(
            "  Listen: {}:{}{}",
            config.server.bind_address, config.server.port, config.server.path
        );
        return Ok(());
    }

    if cli.once {
        return run_once(&config).await;
    }

    server::run(config).await
}

/// Run one collection cycle and print every record as JSON
async fn run_once(config: &Config) -> Result<()> {
    let collector = Collector::from_config(&config.solr)?;
    let acc = MemoryAccumulator::new();

    let result = collector.gather(&acc).await;

    println!("{}", serde_json::to_string_pretty(&acc.take())?);

    let summary = result?;
    info!(
        servers = summary.servers,
        cores = summary.cores,
        records = summary.records,
        "Collection finished"
    );
    Ok(())
}

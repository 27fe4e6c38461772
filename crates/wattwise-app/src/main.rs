//! Wattwise application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Load the browser snapshot into the in-memory browser
//! 3. Build the action engine with the built-in strategies
//! 4. Either run the requested actions once and print the results as JSON,
//!    or drive the optimization schedule until Ctrl-C

mod cli;

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use cli::CliArgs;
use wattwise_core::config::WattwiseConfig;
use wattwise_engine::{
    ActionEngine, Collaborators, EngineStats, ExecutionResult, InMemoryBrowser, Mutation,
    OptimizationScheduler,
};

/// Printed to stdout after a one-shot run.
#[derive(Serialize)]
struct RunReport {
    results: Vec<ExecutionResult>,
    mutations: Vec<Mutation>,
    stats: EngineStats,
}

fn load_browser(args: &CliArgs) -> Result<InMemoryBrowser, Box<dyn std::error::Error>> {
    match args.snapshot {
        Some(ref path) => {
            let json = std::fs::read_to_string(path)?;
            let browser = InMemoryBrowser::from_json(&json)?;
            tracing::info!(path = %path.display(), tabs = browser.tab_count(), "Snapshot loaded");
            Ok(browser)
        }
        None => {
            tracing::warn!("No --snapshot given; starting with an empty browser");
            Ok(InMemoryBrowser::default())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = WattwiseConfig::load_or_default(&config_file);

    // Tracing. RUST_LOG wins over the flag and the config file.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Wattwise v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let browser = Arc::new(load_browser(&args)?);
    let engine = Arc::new(ActionEngine::with_defaults(
        &config,
        Collaborators::from_browser(Arc::clone(&browser)),
    ));
    tracing::info!(actions = ?engine.registry().names(), "Action engine ready");

    if args.watch {
        let scheduler = Arc::new(OptimizationScheduler::new(
            Arc::clone(&engine),
            browser.clone(),
            config.schedule.clone(),
        ));
        let runner = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { runner.run().await });

        tracing::info!(
            interval_secs = config.schedule.interval_secs,
            actions = ?config.schedule.actions,
            "Optimization schedule running; press Ctrl-C to stop"
        );
        tokio::signal::ctrl_c().await?;
        scheduler.shutdown();
        handle.await?;

        let stats = engine.stats();
        tracing::info!(
            executed = stats.executed,
            rejected = stats.rejected,
            failed = stats.failed,
            total_energy_saved = stats.total_energy_saved,
            "Shut down"
        );
        return Ok(());
    }

    let mut context = args.parse_context()?;
    if context.active_tabs.is_none() {
        context.active_tabs = Some(browser.tab_count());
    }
    let actions = if args.actions.is_empty() {
        config.schedule.actions.clone()
    } else {
        args.actions.clone()
    };

    let mut results = Vec::with_capacity(actions.len());
    for action in &actions {
        results.push(engine.execute_action(action, &context).await?);
    }

    let report = RunReport {
        results,
        mutations: browser.mutations(),
        stats: engine.stats(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

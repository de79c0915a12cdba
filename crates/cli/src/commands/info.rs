//! `info` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Reading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&config)
            .context("Failed to serialize configuration")?;
        println!("{}", json);
        return Ok(());
    }

    println!("\n=== jobq Configuration ===\n");
    println!("Source: {}", args.config.display());
    println!("\nRoles:");
    println!("  Manager (dispatch): {}", config.manager);
    println!(
        "  Worker (execute): {}{}",
        config.effective_worker(),
        if config.applet { " (applet mode)" } else { "" }
    );

    println!("\nChannels:");
    println!("  Fanout: {}:{}", config.host, config.port);
    match config.notify_port {
        Some(port) => println!("  Notify: {}:{} (outcome tracking on)", config.host, port),
        None => println!("  Notify: disabled (fire-and-forget)"),
    }

    println!("\nQueueing:");
    println!("  Per-peer queue capacity: {}", config.queue_capacity);
    println!(
        "  Job max age: {} ({:?})",
        config.job_max_age,
        config.job_max_age().unwrap_or_default()
    );

    match &config.handlers {
        Some(handlers) => {
            println!("\nAllowed handlers ({}):", handlers.len());
            for handler in handlers {
                println!("  - {}", handler);
            }
        }
        None => println!("\nAllowed handlers: any registered"),
    }

    println!();
    Ok(())
}

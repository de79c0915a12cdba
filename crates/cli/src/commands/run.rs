//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::runtime::Service;

/// Execute the `run` command
pub async fn run_service(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding host from CLI");
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port = %port, "Overriding fanout port from CLI");
        config.port = port;
    }
    if let Some(notify_port) = args.notify_port {
        info!(notify_port = %notify_port, "Overriding notify port from CLI");
        config.notify_port = if notify_port == 0 {
            None
        } else {
            Some(notify_port)
        };
    }
    if args.applet {
        info!("Applet mode enabled from CLI");
        config.applet = true;
    }

    info!(
        manager = config.manager,
        worker = config.effective_worker(),
        host = %config.host,
        port = config.port,
        notify_port = ?config.notify_port,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    // Metrics exporter (tracing is already initialized by main)
    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)
            .context("Failed to initialize metrics exporter")?;
    }

    // Bind/connect configured roles; startup transport failures are fatal
    let mut service = Service::start(config).await.context("Service start failed")?;

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Service running, press Ctrl+C to stop");

    tokio::select! {
        _ = service.wait() => {
            warn!("Service stopped on its own");
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping service...");
        }
    }

    service.stop().await;
    info!("jobq finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::QueueConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Roles:");
    println!("  Manager: {}", config.manager);
    println!(
        "  Worker: {}{}",
        config.effective_worker(),
        if config.applet { " (applet mode)" } else { "" }
    );
    println!("\nChannels:");
    println!("  Fanout: {}:{}", config.host, config.port);
    match config.notify_port {
        Some(port) => println!("  Notify: {}:{}", config.host, port),
        None => println!("  Notify: disabled (fire-and-forget)"),
    }
    println!("\nQueueing:");
    println!("  Per-peer queue capacity: {}", config.queue_capacity);
    println!("  Job max age: {}", config.job_max_age);

    if let Some(ref handlers) = config.handlers {
        println!("\nAllowed handlers ({}):", handlers.len());
        for handler in handlers {
            println!("  - {}", handler);
        }
    }

    println!();
}

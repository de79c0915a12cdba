//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    manager: bool,
    worker: bool,
    fanout: String,
    notify: Option<String>,
    queue_capacity: usize,
    handler_count: Option<usize>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    manager: config.manager,
                    worker: config.effective_worker(),
                    fanout: format!("{}:{}", config.host, config.port),
                    notify: config
                        .notify_port
                        .map(|port| format!("{}:{}", config.host, port)),
                    queue_capacity: config.queue_capacity,
                    handler_count: config.handlers.as_ref().map(|h| h.len()),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &contracts::QueueConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    // Fire-and-forget mode means no outcome tracking
    if config.notify_port.is_none() {
        warnings.push(
            "notify_port not set - job outcomes will not be tracked (fire-and-forget)".to_string(),
        );
    }

    // A manager without a local worker needs remote workers to connect
    if config.manager && !config.effective_worker() {
        warnings.push(
            "worker role disabled - jobs are only delivered to remote workers".to_string(),
        );
    }

    // An empty allow-list rejects every job
    if let Some(handlers) = &config.handlers {
        if handlers.is_empty() {
            warnings.push("handlers allow-list is empty - every job will be rejected".to_string());
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Manager: {}", summary.manager);
            println!("  Worker: {}", summary.worker);
            println!("  Fanout: {}", summary.fanout);
            match summary.notify {
                Some(ref notify) => println!("  Notify: {}", notify),
                None => println!("  Notify: disabled"),
            }
            println!("  Queue capacity: {}", summary.queue_capacity);
            if let Some(count) = summary.handler_count {
                println!("  Allowed handlers: {}", count);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;

use mapreviews::cli::Cli;
use mapreviews::config::AppConfig;
use mapreviews::export;
use mapreviews::logger::{RunLogger, VerbosityLevel};
use mapreviews::normalize;
use mapreviews::pool::{self, PoolSettings, UnitContext};
use mapreviews::record::{RunState, Target};
use mapreviews::session::RenderSession;

/// How long the orchestrator waits for in-flight units after an interrupt.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Standard exit code for a SIGINT-terminated run (128 + 2).
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle --init first (before any other processing)
    if cli.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("Created default configuration file at: {}", path.display());
                println!("Edit this file to customize settings, then run mapreviews again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = cli.validate() {
        eprintln!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config = match AppConfig::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let verbosity = VerbosityLevel::from_verbose_count(cli.verbose);
    let logger = match &cli.log_file {
        Some(path) => RunLogger::with_log_file(verbosity, path.clone()),
        None => RunLogger::new(verbosity),
    };

    // Ctrl-C sets the stop flag; workers observe it between units and the
    // orchestrator drains or abandons in-flight work, then persists partial
    // results. A second Ctrl-C during the grace period force-exits.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            if stop.swap(true, Ordering::SeqCst) {
                eprintln!("\nSecond interrupt received. Force exiting.");
                std::process::exit(EXIT_INTERRUPTED);
            }
            eprintln!("\nInterrupt received. Finishing in-flight work and saving partial results...");
        })
        .unwrap_or_else(|e| {
            eprintln!("Warning: failed to set Ctrl-C handler: {}. Interrupts will not be handled gracefully.", e);
        });
    }

    let organizations = cli.organization_list();
    let locations = cli.location_list();
    let targets = Target::cartesian_product(&organizations, &locations);
    let output_path = std::path::PathBuf::from(cli.output.as_deref().expect("validated"));

    logger.info(&format!(
        "Starting run: {} organizations x {} locations = {} targets, {} workers",
        organizations.len(),
        locations.len(),
        targets.len(),
        cli.workers
    ));
    logger.start_progress(targets.len() as u64);

    let mut browser_config = config.browser.clone();
    browser_config.headless = cli.effective_headless(config.browser.headless);

    let ctx = UnitContext {
        search: config.search.clone(),
        discover: config.discover.clone(),
        pacing: config.pacing.clone(),
        max_reviews: cli.max_reviews,
        run_time: Utc::now(),
    };
    let settings = PoolSettings {
        workers: cli.workers,
        grace: SHUTDOWN_GRACE,
    };

    let session_logger = logger.clone();
    let outcome = pool::run_pool(
        targets,
        move |slot| {
            session_logger.info(&format!("Worker {}: launching browser session", slot));
            RenderSession::open(&browser_config)
        },
        ctx,
        settings,
        Arc::clone(&stop),
        logger.clone(),
    )
    .await;

    logger.finish_progress(&format!(
        "Run {}: {}/{} targets processed",
        outcome.state, outcome.targets_done, outcome.targets_total
    ));

    let normalizer = normalize::from_mode(config.normalize.mode, config.normalize.chunk_size);
    let records = normalizer.normalize(outcome.records);

    if records.is_empty() {
        logger.warn("No reviews were collected!");
    }

    let exit_code = match outcome.state {
        RunState::Failed => {
            logger.error("No browser session could be created; nothing was collected.");
            logger.flush_to_file().ok();
            1
        }
        RunState::Interrupted => {
            let partial_path = export::partial_output_path(&output_path, Utc::now());
            export::write_records(&records, &partial_path)?;
            export::print_run_summary(&records);
            println!(
                "Run interrupted. Saved {} reviews collected so far to {}",
                records.len(),
                partial_path.display()
            );
            logger.flush_to_file().ok();
            EXIT_INTERRUPTED
        }
        _ => {
            export::write_records(&records, &output_path)?;
            export::print_run_summary(&records);
            println!("Saved {} reviews to {}", records.len(), output_path.display());
            logger.flush_to_file().ok();
            0
        }
    };

    std::process::exit(exit_code);
}

use anyhow::Result;
use indexsync::{
    DeleteOutcome, SearchServiceClient, SyncConfig, SyncPipeline, SyncPlan, SyncProgress,
};
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;
use tokio::sync::watch;

/// 128 + SIGINT, as a shell reports it
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Run the full provisioning pipeline
pub async fn run_provision(config: SyncConfig, progress: bool, pause: bool) -> Result<()> {
    config.validate()?;

    let client = Arc::new(SearchServiceClient::from_config(&config.service)?);
    let plan = SyncPlan::from_config(&config)?;
    let indexer = plan.indexer.name.clone();

    // First Ctrl-C stops the pipeline at the next stage boundary; a second one,
    // or any once the pipeline is done with the channel, exits immediately
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if *shutdown_tx.borrow() || shutdown_tx.is_closed() {
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
            tracing::warn!("Interrupt received, stopping (press Ctrl-C again to exit now)");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut pipeline = SyncPipeline::new(client, plan).with_shutdown(shutdown_rx);
    if progress && io::stderr().is_terminal() {
        pipeline = pipeline.with_progress(SyncProgress::new(&indexer));
    }

    println!("Provisioning index '{}' via {}", config.index.name, config.service.base_url()?);
    println!();

    let outcome = pipeline.run().await;
    drop(pipeline);

    let result = match outcome {
        Ok(report) => {
            let sync = &report.sync;
            println!();
            println!("Sync completed:");
            println!(
                "  Index:     {} ({})",
                config.index.name,
                match report.index_deleted {
                    DeleteOutcome::Deleted => "replaced",
                    DeleteOutcome::NotFound => "created",
                }
            );
            println!("  Indexer:   {}", sync.indexer);
            println!("  Status:    {}", sync.state);
            println!("  Rows:      {}", sync.items_processed);
            println!("  Failed:    {}", sync.items_failed);
            println!("  Polls:     {}", sync.polls);
            println!("  Time:      {:.2}s", sync.elapsed.as_secs_f64());
            if let Some(message) = &sync.error_message {
                println!("  Error:     {}", message);
            }
            for error in sync.errors.iter().take(10) {
                println!(
                    "    - {}: {}",
                    error.key.as_deref().unwrap_or("<no key>"),
                    error.error_message
                );
            }

            if sync.is_success() {
                Ok(())
            } else {
                Err(anyhow::anyhow!(
                    "Indexer '{}' finished with status '{}'",
                    sync.indexer,
                    sync.state
                ))
            }
        }
        Err(e) => {
            tracing::error!(stage = %e.stage, kind = e.source.kind(), "Provisioning failed");
            Err(e.into())
        }
    };

    if pause {
        wait_for_enter()?;
    }

    result
}

fn wait_for_enter() -> Result<()> {
    print!("Complete. Press Enter to exit...");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

use anyhow::Result;
use indexsync::{IndexerController, RunPhase, SearchServiceClient, SyncConfig};
use std::sync::Arc;

/// Print the indexer's current status once
pub async fn run_status(config: &SyncConfig, indexer: &str) -> Result<()> {
    let client = Arc::new(SearchServiceClient::from_config(&config.service)?);
    let controller = IndexerController::new(client);

    let status = controller.get_status(indexer).await?;

    let phase = match status.phase() {
        RunPhase::Waiting => "no run recorded".to_string(),
        RunPhase::Running => "running".to_string(),
        RunPhase::Finished(state) => format!("finished ({})", state),
        RunPhase::Unrecognized(value) => format!("unrecognized status '{}'", value),
    };
    println!("Indexer '{}': {}", indexer, phase);

    if let Some(last) = &status.last_result {
        println!("  Rows:   {}", last.items_processed());
        println!("  Failed: {}", last.items_failed());
        if let Some(message) = &last.error_message {
            println!("  Error:  {}", message);
        }
    }

    tracing::debug!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

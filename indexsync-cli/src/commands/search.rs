use anyhow::Result;
use indexsync::query::Document;
use indexsync::{QueryClient, SearchRequest, SearchServiceClient, SyncConfig};
use serde_json::Value;
use std::sync::Arc;

/// Run a query and print one line per document
pub async fn run_search(
    config: &SyncConfig,
    index: &str,
    query: &str,
    filter: &str,
    select: Option<&str>,
    top: Option<u32>,
) -> Result<()> {
    let client = Arc::new(SearchServiceClient::from_config(&config.service)?);
    let query_client = QueryClient::new(client, index);

    let mut request = SearchRequest::new(query).filter(filter);
    if let Some(select) = select {
        request = request.select(select.split(',').map(str::trim).filter(|s| !s.is_empty()));
    }
    if let Some(top) = top {
        request = request.top(top);
    }

    let docs = query_client.search(&request).await?;
    for doc in &docs {
        println!("{}", format_document(doc));
    }
    println!("{} document(s)", docs.len());

    Ok(())
}

fn format_document(doc: &Document) -> String {
    doc.iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{}: {}", key, s),
            Value::Null => format!("{}: -", key),
            other => format!("{}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use tesoreria_frontend::services::init_tracing;
use tesoreria_frontend::{ApiClient, ClientConfig, QueryCache, TableBuilder};

/// Prints the first page of a model's list:
/// `tesoreria-frontend [model] [search]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::load_default().context("loading configuration")?;
    init_tracing(&config);

    let mut args = std::env::args().skip(1);
    let model = args.next().unwrap_or_else(|| "acopios".to_string());
    let search = args.next().unwrap_or_default();

    let client = ApiClient::new(&config)?;
    info!(api = %client.base_url(), model = %model, "Fetching list");

    let table = TableBuilder::new(&model, "", Arc::new(client))?
        .with_config(&config)
        .with_cache(QueryCache::global(&config));

    if search.is_empty() {
        table.refresh().await?;
    } else {
        table.set_search(search);
        table.commit_now().await?;
    }
    println!("{}", table.labels().join(" | "));
    for row in table.rendered_rows() {
        println!("{}", row.join(" | "));
    }
    if table.has_more() {
        println!("... ({} rows loaded, more available)", table.row_count());
    }
    Ok(())
}

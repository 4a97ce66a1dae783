//! Gridview CLI
//!
//! Loads one page of a remote (or fully fetched) table, applies the
//! requested search, filters and sort the way a grid would, and prints the
//! exported records as JSON.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gv_core::{ColumnDescriptor, GridConfig, GridMode, ValueKind};
use gv_http::HttpSource;
use gv_queries::SortSpec;
use gv_view::GridController;

/// gridview - browse a paginated JSON endpoint like a data grid
#[derive(Parser, Debug)]
#[command(name = "gridview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Endpoint answering grid queries
    #[arg(long, env = "GRID_ENDPOINT")]
    endpoint: Option<String>,

    /// "server" (page per request) or "client" (fetch everything once)
    #[arg(long)]
    mode: Option<String>,

    /// Column as field:Label[:kind], repeatable
    #[arg(short, long = "column", value_name = "SPEC")]
    columns: Vec<String>,

    /// Free-text search term
    #[arg(short, long)]
    search: Option<String>,

    /// Column filter as field=value, repeatable
    #[arg(short, long = "filter", value_name = "FIELD=VALUE")]
    filters: Vec<String>,

    /// Sort token, e.g. price:desc,title:asc
    #[arg(long)]
    sort: Option<String>,

    /// Zero-based page index
    #[arg(short, long, default_value_t = 0)]
    page: u32,

    /// Rows per page
    #[arg(long)]
    page_size: Option<u32>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = build_config(&cli, |key| std::env::var(key).ok())?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = config.mode.as_str(),
        endpoint = %config.endpoint,
        "Starting gridview"
    );

    let source = HttpSource::from_config(&config)?;
    let grid = GridController::new(config, Arc::new(source))?;

    grid.mount();
    if !grid.config().mode.is_server() {
        // Client mode pages the cached dataset, so load it first
        grid.settled().await;
    }

    if let Some(term) = &cli.search {
        grid.set_search(term.as_str());
    }
    for filter in &cli.filters {
        let (field, value) = filter
            .split_once('=')
            .with_context(|| format!("filter '{filter}' is not field=value"))?;
        if !grid.filter_column(field, value)? {
            warn!(field, "filter ignored");
        }
    }
    if let Some(sort) = &cli.sort {
        grid.set_sort(SortSpec::parse_token(sort));
    }
    if let Some(size) = cli.page_size {
        grid.set_page_size(size);
    }
    grid.set_page(cli.page);

    grid.settled().await;

    let state = grid.snapshot();
    let output = serde_json::json!({
        "page": state.pagination.page_index,
        "pageSize": state.pagination.page_size,
        "pageCount": state.pagination.page_count(state.total_count),
        "total": state.total_count,
        "records": grid.export_records(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    grid.unmount();
    Ok(())
}

/// Environment first (read through `lookup`), then command-line overrides
fn build_config(cli: &Cli, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<GridConfig> {
    let mut config = GridConfig::from_lookup(lookup).context("invalid GRID_* environment")?;

    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(mode) = &cli.mode {
        config.mode = match GridMode::from_str(mode) {
            Some(mode) => mode,
            None => bail!("unknown mode '{mode}', expected server or client"),
        };
    }
    if !cli.columns.is_empty() {
        config.columns = cli
            .columns
            .iter()
            .map(|spec| parse_column(spec))
            .collect::<anyhow::Result<_>>()?;
    }
    if let Some(size) = cli.page_size {
        config.page_size = size;
    }

    config.validate()?;
    Ok(config)
}

fn parse_column(spec: &str) -> anyhow::Result<ColumnDescriptor> {
    let mut parts = spec.splitn(3, ':');
    let field = parts.next().unwrap_or_default().trim();
    if field.is_empty() {
        bail!("column '{spec}' has no field id");
    }
    let label = parts.next().map(str::trim).filter(|l| !l.is_empty()).unwrap_or(field);

    let mut column = ColumnDescriptor::text(field, label);
    if let Some(kind) = parts.next() {
        column.value_kind =
            ValueKind::from_str(kind).with_context(|| format!("column '{spec}' has unknown kind '{kind}'"))?;
    }
    Ok(column)
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,gv_view=debug".into());

    // stdout carries the records
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

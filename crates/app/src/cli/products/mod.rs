use std::{fs, path::Path};

use catalog_app::{
    config::{DatabaseConfig, PipelineConfig},
    context::AppContext,
};
use clap::{Args, Subcommand};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

use crate::cli::shutdown;

mod batch;
mod create;
mod inventory;
mod list;

#[derive(Debug, Args)]
pub(crate) struct ProductsCommand {
    #[command(subcommand)]
    command: ProductsSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProductsSubcommand {
    /// Create one product from a JSON request
    Create(create::CreateProductArgs),
    /// Create every product in a JSON array of requests
    Batch(batch::CreateBatchArgs),
    /// List product views, optionally for one category
    List(list::ListProductsArgs),
    /// Show stock and value totals
    Inventory(inventory::InventoryArgs),
}

/// Settings shared by every products subcommand.
#[derive(Debug, Args)]
pub(crate) struct PipelineArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    pipeline: PipelineConfig,

    /// Print the Prometheus exposition after the command finishes
    #[arg(long)]
    print_metrics: bool,
}

impl PipelineArgs {
    async fn context(&self) -> Result<AppContext, String> {
        AppContext::from_database_url(&self.database.database_url, &self.pipeline)
            .await
            .map_err(|error| format!("failed to initialise pipeline: {error}"))
    }
}

impl ProductsSubcommand {
    fn pipeline(&self) -> &PipelineArgs {
        match self {
            Self::Create(args) => &args.pipeline,
            Self::Batch(args) => &args.pipeline,
            Self::List(args) => &args.pipeline,
            Self::Inventory(args) => &args.pipeline,
        }
    }
}

pub(crate) async fn run(command: ProductsCommand) -> Result<(), String> {
    let pipeline = command.command.pipeline();
    let context = pipeline.context().await?;

    let cancel = CancellationToken::new();
    shutdown::cancel_on_signal(cancel.clone());

    let result = match &command.command {
        ProductsSubcommand::Create(args) => create::run(args, &context, cancel).await,
        ProductsSubcommand::Batch(args) => batch::run(args, &context, cancel).await,
        ProductsSubcommand::List(args) => list::run(args, &context, cancel).await,
        ProductsSubcommand::Inventory(_) => inventory::run(&context, cancel).await,
    };

    if pipeline.print_metrics {
        let exposition = context
            .metrics
            .encode()
            .map_err(|error| format!("failed to encode metrics: {error}"))?;
        print!("{exposition}");
    }

    result
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let contents = fs::read_to_string(path)
        .map_err(|error| format!("failed to read {}: {error}", path.display()))?;

    serde_json::from_str(&contents)
        .map_err(|error| format!("failed to parse {}: {error}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|error| format!("failed to render output: {error}"))?;
    println!("{rendered}");

    Ok(())
}

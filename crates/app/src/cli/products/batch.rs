use std::path::PathBuf;

use catalog_app::{context::AppContext, domain::products::data::NewProduct};
use clap::Args;
use tokio_util::sync::CancellationToken;

use super::{PipelineArgs, print_json, read_json};

#[derive(Debug, Args)]
pub(crate) struct CreateBatchArgs {
    /// Path to a JSON array of product requests
    #[arg(long)]
    file: PathBuf,

    #[command(flatten)]
    pub(super) pipeline: PipelineArgs,
}

pub(crate) async fn run(
    args: &CreateBatchArgs,
    context: &AppContext,
    cancel: CancellationToken,
) -> Result<(), String> {
    let requests: Vec<NewProduct> = read_json(&args.file)?;

    if requests.is_empty() {
        return Err("batch file contains no requests".to_string());
    }

    let outcome = context
        .products
        .create_products(requests, cancel)
        .await
        .map_err(|error| format!("failed to create batch: {error}"))?;

    print_json(&outcome)
}

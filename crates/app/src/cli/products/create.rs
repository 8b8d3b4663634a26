use std::path::PathBuf;

use catalog_app::{context::AppContext, domain::products::data::NewProduct};
use clap::Args;
use tokio_util::sync::CancellationToken;

use super::{PipelineArgs, print_json, read_json};

#[derive(Debug, Args)]
pub(crate) struct CreateProductArgs {
    /// Path to a JSON product request
    #[arg(long)]
    file: PathBuf,

    #[command(flatten)]
    pub(super) pipeline: PipelineArgs,
}

pub(crate) async fn run(
    args: &CreateProductArgs,
    context: &AppContext,
    cancel: CancellationToken,
) -> Result<(), String> {
    let request: NewProduct = read_json(&args.file)?;

    match context.products.create_product(request, cancel).await {
        Ok(view) => print_json(&view),
        Err(error) => {
            if let Some(errors) = error.errors() {
                print_json(errors)?;
            }

            Err(format!("failed to create product: {error}"))
        }
    }
}

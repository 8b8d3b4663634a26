use catalog_app::context::AppContext;
use clap::Args;
use tokio_util::sync::CancellationToken;

use super::{PipelineArgs, print_json};

#[derive(Debug, Args)]
pub(crate) struct InventoryArgs {
    #[command(flatten)]
    pub(super) pipeline: PipelineArgs,
}

pub(crate) async fn run(context: &AppContext, cancel: CancellationToken) -> Result<(), String> {
    let summary = context
        .products
        .inventory_summary(cancel)
        .await
        .map_err(|error| format!("failed to summarise inventory: {error}"))?;

    print_json(&summary)
}

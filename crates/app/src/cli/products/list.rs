use catalog_app::{
    context::AppContext,
    domain::products::{cache::CacheScope, data::ProductCategory},
};
use clap::Args;
use tokio_util::sync::CancellationToken;

use super::{PipelineArgs, print_json};

#[derive(Debug, Args)]
pub(crate) struct ListProductsArgs {
    /// Only list products in this category
    #[arg(long)]
    category: Option<String>,

    #[command(flatten)]
    pub(super) pipeline: PipelineArgs,
}

pub(crate) async fn run(
    args: &ListProductsArgs,
    context: &AppContext,
    cancel: CancellationToken,
) -> Result<(), String> {
    let scope = match args.category.as_deref() {
        None => CacheScope::All,
        Some(raw) => match ProductCategory::from(raw) {
            ProductCategory::Unrecognized => {
                return Err(format!("unknown product category: {raw}"));
            }
            category => CacheScope::Category(category),
        },
    };

    let views = context
        .products
        .list_products(scope, cancel)
        .await
        .map_err(|error| format!("failed to list products: {error}"))?;

    print_json(&*views)
}

use catalog_app::{config::LoggingConfig, observability};
use clap::{Parser, Subcommand};

mod products;
mod shutdown;

#[derive(Debug, Parser)]
#[command(name = "catalog-app", about = "Product catalog ingestion CLI", long_about = None)]
pub(crate) struct Cli {
    /// Logging output settings.
    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Products(products::ProductsCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        observability::init_logging(&self.logging).map_err(|error| error.to_string())?;

        match self.command {
            Commands::Products(command) => products::run(command).await,
        }
    }
}

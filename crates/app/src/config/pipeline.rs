//! Pipeline Config

use std::time::Duration;

use clap::Args;

use crate::domain::products::PipelineSettings;

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Args)]
pub struct PipelineConfig {
    /// Upper bound on each store or cache call, in milliseconds
    #[arg(long, env = "OPERATION_TIMEOUT_MS", default_value_t = 5_000)]
    pub operation_timeout_ms: u64,

    /// Maximum number of cached view lists
    #[arg(long, env = "VIEW_CACHE_CAPACITY", default_value_t = 1_024)]
    pub cache_capacity: u64,
}

impl PipelineConfig {
    /// Pipeline tunables derived from this configuration.
    #[must_use]
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
            ..PipelineSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        pipeline: PipelineConfig,
    }

    #[test]
    fn defaults_match_pipeline_settings() {
        let harness = Harness::parse_from(["harness"]);

        assert_eq!(harness.pipeline.settings(), PipelineSettings::default());
        assert_eq!(harness.pipeline.cache_capacity, 1_024);
    }

    #[test]
    fn timeout_is_read_in_milliseconds() {
        let harness = Harness::parse_from(["harness", "--operation-timeout-ms", "250"]);

        assert_eq!(
            harness.pipeline.settings().operation_timeout,
            Duration::from_millis(250)
        );
    }
}

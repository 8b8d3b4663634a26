//! Pipeline Events
//!
//! The per-operation lifecycle and the observer interface it is reported to.

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    sync::Arc,
    time::Duration,
};

use mockall::automock;
use serde::Serialize;

use crate::{domain::products::data::ProductCategory, uuids::TypedUuid};

mod logging;
mod metrics;
mod recorder;

pub use logging::TracingEventSink;
pub use metrics::PrometheusEventSink;
pub use recorder::MetricsRecorder;

/// Marker for operation ids.
#[derive(Debug)]
pub struct Operation;

/// Correlates every event and error of one create, batch or list call.
pub type OperationId = TypedUuid<Operation>;

/// Lifecycle of a single creation.
///
/// ```text
/// Received -> Validating -> Rejected
///                        -> Validated -> Persisting -> PersistFailed
///                                                   -> Persisted -> CacheInvalidated -> Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PipelineStage {
    Received,
    Validating,
    Rejected,
    Validated,
    Persisting,
    PersistFailed,
    Persisted,
    CacheInvalidated,
    Completed,
}

impl PipelineStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validating => "validating",
            Self::Rejected => "rejected",
            Self::Validated => "validated",
            Self::Persisting => "persisting",
            Self::PersistFailed => "persist_failed",
            Self::Persisted => "persisted",
            Self::CacheInvalidated => "cache_invalidated",
            Self::Completed => "completed",
        }
    }

    /// Whether the lifecycle ends here.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::PersistFailed | Self::Completed)
    }

    /// Whether `next` directly follows this stage.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::Validating)
                | (Self::Validating, Self::Rejected | Self::Validated)
                | (Self::Validated, Self::Persisting)
                | (Self::Persisting, Self::PersistFailed | Self::Persisted)
                | (Self::Persisted, Self::CacheInvalidated)
                | (Self::CacheInvalidated, Self::Completed)
        )
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Final summary of one creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetrics {
    pub operation_id: OperationId,
    pub product_name: String,
    pub sku: String,
    pub category: ProductCategory,
    pub validation_duration: Option<Duration>,
    pub persistence_duration: Option<Duration>,
    pub total_duration: Duration,
    pub success: bool,
    pub error_reason: Option<String>,
}

/// A discrete, structured pipeline event.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Transition {
        operation: OperationId,
        stage: PipelineStage,
        detail: Option<String>,
    },
    Summary(OperationMetrics),
    BatchReceived {
        batch: OperationId,
        size: usize,
    },
    BatchCompleted {
        batch: OperationId,
        created: usize,
        failed: usize,
    },
}

fn millis(duration: Duration) -> String {
    format!("{:.3}", duration.as_secs_f64() * 1_000.0)
}

impl PipelineEvent {
    /// Event name, as recorded by sinks.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Transition { .. } => "product.stage",
            Self::Summary(_) => "product.summary",
            Self::BatchReceived { .. } => "product.batch.received",
            Self::BatchCompleted { .. } => "product.batch.completed",
        }
    }

    /// Flattened `(field, value)` pairs.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Transition {
                operation,
                stage,
                detail,
            } => {
                let mut fields = vec![
                    ("operation_id", operation.to_string()),
                    ("stage", stage.to_string()),
                ];

                if let Some(detail) = detail {
                    fields.push(("detail", detail.clone()));
                }

                fields
            }
            Self::Summary(metrics) => {
                let mut fields = vec![
                    ("operation_id", metrics.operation_id.to_string()),
                    ("product_name", metrics.product_name.clone()),
                    ("sku", metrics.sku.clone()),
                    ("category", metrics.category.to_string()),
                ];

                if let Some(duration) = metrics.validation_duration {
                    fields.push(("validation_ms", millis(duration)));
                }

                if let Some(duration) = metrics.persistence_duration {
                    fields.push(("persistence_ms", millis(duration)));
                }

                fields.push(("total_ms", millis(metrics.total_duration)));
                fields.push(("success", metrics.success.to_string()));

                if let Some(reason) = &metrics.error_reason {
                    fields.push(("error_reason", reason.clone()));
                }

                fields
            }
            Self::BatchReceived { batch, size } => vec![
                ("batch_id", batch.to_string()),
                ("size", size.to_string()),
            ],
            Self::BatchCompleted {
                batch,
                created,
                failed,
            } => vec![
                ("batch_id", batch.to_string()),
                ("created", created.to_string()),
                ("failed", failed.to_string()),
            ],
        }
    }
}

/// Append-only observer of pipeline events.
#[automock]
pub trait EventSink: Send + Sync {
    fn record(&self, event: &PipelineEvent);
}

/// Forwards every event to each inner sink, in order.
#[derive(Clone, Default)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Debug for FanoutEventSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FanoutEventSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FanoutEventSink {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutEventSink {
    fn record(&self, event: &PipelineEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

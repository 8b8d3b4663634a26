//! Tracing sink

use tracing::{info, warn};

use crate::domain::products::events::{EventSink, PipelineEvent};

/// Writes each event as one structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Transition {
                operation,
                stage,
                detail,
            } => info!(
                event = event.name(),
                operation_id = %operation,
                stage = %stage,
                detail = detail.as_deref(),
                "product stage changed"
            ),
            PipelineEvent::Summary(metrics) if metrics.success => info!(
                event = event.name(),
                operation_id = %metrics.operation_id,
                sku = %metrics.sku,
                category = %metrics.category,
                validation_ms = metrics.validation_duration.map(|d| d.as_secs_f64() * 1_000.0),
                persistence_ms = metrics.persistence_duration.map(|d| d.as_secs_f64() * 1_000.0),
                total_ms = metrics.total_duration.as_secs_f64() * 1_000.0,
                "product created"
            ),
            PipelineEvent::Summary(metrics) => warn!(
                event = event.name(),
                operation_id = %metrics.operation_id,
                sku = %metrics.sku,
                category = %metrics.category,
                total_ms = metrics.total_duration.as_secs_f64() * 1_000.0,
                error_reason = metrics.error_reason.as_deref(),
                "product creation failed"
            ),
            PipelineEvent::BatchReceived { batch, size } => info!(
                event = event.name(),
                batch_id = %batch,
                size,
                "product batch received"
            ),
            PipelineEvent::BatchCompleted {
                batch,
                created,
                failed,
            } => info!(
                event = event.name(),
                batch_id = %batch,
                created,
                failed,
                "product batch completed"
            ),
        }
    }
}

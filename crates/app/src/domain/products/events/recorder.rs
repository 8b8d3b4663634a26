//! Metrics Recorder

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::warn;

use crate::domain::products::{
    data::{NewProduct, ProductCategory},
    events::{EventSink, OperationId, OperationMetrics, PipelineEvent, PipelineStage},
};

/// Reason recorded when a recorder is dropped before it was finished.
pub(crate) const ABANDONED_REASON: &str = "operation abandoned";

/// Tracks one creation through its lifecycle.
///
/// Emits a transition event per stage and exactly one summary. A recorder
/// dropped without [`Self::succeed`] or [`Self::fail`] (an early return, a
/// cancelled future) still emits a failed summary.
pub struct MetricsRecorder {
    sink: Arc<dyn EventSink>,
    operation: OperationId,
    product_name: String,
    sku: String,
    category: ProductCategory,
    stage: PipelineStage,
    started: Instant,
    phase_started: Instant,
    validation: Option<Duration>,
    persistence: Option<Duration>,
    finished: bool,
}

impl Debug for MetricsRecorder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MetricsRecorder")
            .field("operation", &self.operation)
            .field("stage", &self.stage)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl MetricsRecorder {
    /// Assign an operation id and record `Received`.
    pub fn start(sink: Arc<dyn EventSink>, request: &NewProduct) -> Self {
        let now = Instant::now();
        let operation = OperationId::new();

        sink.record(&PipelineEvent::Transition {
            operation,
            stage: PipelineStage::Received,
            detail: None,
        });

        Self {
            sink,
            operation,
            product_name: request.name.clone(),
            sku: request.sku.clone(),
            category: request.category,
            stage: PipelineStage::Received,
            started: now,
            phase_started: now,
            validation: None,
            persistence: None,
            finished: false,
        }
    }

    #[must_use]
    pub fn operation(&self) -> OperationId {
        self.operation
    }

    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Move to `next`, timing the validating and persisting phases.
    ///
    /// Transitions the lifecycle does not allow are logged and ignored.
    pub fn advance(&mut self, next: PipelineStage) {
        self.advance_with(next, None);
    }

    /// Like [`Self::advance`], attaching a detail string to the event.
    pub fn advance_with(&mut self, next: PipelineStage, detail: Option<String>) {
        if self.finished || !self.stage.can_advance_to(next) {
            warn!(
                operation_id = %self.operation,
                from = %self.stage,
                to = %next,
                "ignoring invalid pipeline transition"
            );

            return;
        }

        let now = Instant::now();

        match (self.stage, next) {
            (PipelineStage::Validating, _) => {
                self.validation = Some(now.duration_since(self.phase_started));
            }
            (PipelineStage::Persisting, _) => {
                self.persistence = Some(now.duration_since(self.phase_started));
            }
            _ => {}
        }

        if matches!(next, PipelineStage::Validating | PipelineStage::Persisting) {
            self.phase_started = now;
        }

        self.stage = next;

        self.sink.record(&PipelineEvent::Transition {
            operation: self.operation,
            stage: next,
            detail,
        });
    }

    /// Record `Completed` and a successful summary.
    pub fn succeed(mut self) -> OperationMetrics {
        self.advance(PipelineStage::Completed);
        self.summarize(None)
    }

    /// Record a failed summary with `reason`.
    pub fn fail(mut self, reason: impl Into<String>) -> OperationMetrics {
        self.summarize(Some(reason.into()))
    }

    fn summarize(&mut self, error_reason: Option<String>) -> OperationMetrics {
        self.finished = true;

        let metrics = OperationMetrics {
            operation_id: self.operation,
            product_name: self.product_name.clone(),
            sku: self.sku.clone(),
            category: self.category,
            validation_duration: self.validation,
            persistence_duration: self.persistence,
            total_duration: self.started.elapsed(),
            success: error_reason.is_none(),
            error_reason,
        };

        self.sink.record(&PipelineEvent::Summary(metrics.clone()));

        metrics
    }
}

impl Drop for MetricsRecorder {
    fn drop(&mut self) {
        if !self.finished {
            self.summarize(Some(ABANDONED_REASON.to_string()));
        }
    }
}

//! Prometheus sink

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::domain::products::events::{EventSink, PipelineEvent};

/// Aggregates events into Prometheus counters and histograms.
#[derive(Debug, Clone)]
pub struct PrometheusEventSink {
    registry: Registry,
    operations_total: IntCounterVec,
    phase_duration_seconds: HistogramVec,
    stage_transitions_total: IntCounterVec,
    batch_items_total: IntCounterVec,
}

impl PrometheusEventSink {
    /// Build the sink with its own registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be created or registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new(
                "catalog_product_operations_total",
                "Product creations partitioned by category and outcome.",
            ),
            &["category", "outcome"],
        )?;

        let phase_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "catalog_product_phase_duration_seconds",
                "Product creation phase duration in seconds.",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["phase"],
        )?;

        let stage_transitions_total = IntCounterVec::new(
            Opts::new(
                "catalog_product_stage_transitions_total",
                "Pipeline stage transitions partitioned by target stage.",
            ),
            &["stage"],
        )?;

        let batch_items_total = IntCounterVec::new(
            Opts::new(
                "catalog_product_batch_items_total",
                "Batch items partitioned by result.",
            ),
            &["result"],
        )?;

        registry.register(Box::new(operations_total.clone()))?;
        registry.register(Box::new(phase_duration_seconds.clone()))?;
        registry.register(Box::new(stage_transitions_total.clone()))?;
        registry.register(Box::new(batch_items_total.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            phase_duration_seconds,
            stage_transitions_total,
            batch_items_total,
        })
    }

    /// Text exposition of every metric.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut encoded = Vec::new();

        encoder.encode(&self.registry.gather(), &mut encoded)?;

        Ok(String::from_utf8_lossy(&encoded).into_owned())
    }
}

impl EventSink for PrometheusEventSink {
    fn record(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Transition { stage, .. } => {
                self.stage_transitions_total
                    .with_label_values(&[stage.as_str()])
                    .inc();
            }
            PipelineEvent::Summary(metrics) => {
                let outcome = if metrics.success { "success" } else { "failure" };

                self.operations_total
                    .with_label_values(&[metrics.category.as_str(), outcome])
                    .inc();

                let phases = [
                    ("validation", metrics.validation_duration),
                    ("persistence", metrics.persistence_duration),
                    ("total", Some(metrics.total_duration)),
                ];

                for (phase, duration) in phases {
                    if let Some(duration) = duration {
                        self.phase_duration_seconds
                            .with_label_values(&[phase])
                            .observe(duration.as_secs_f64());
                    }
                }
            }
            PipelineEvent::BatchReceived { .. } => {}
            PipelineEvent::BatchCompleted {
                created, failed, ..
            } => {
                self.batch_items_total
                    .with_label_values(&["created"])
                    .inc_by(*created as u64);
                self.batch_items_total
                    .with_label_values(&["failed"])
                    .inc_by(*failed as u64);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use testresult::TestResult;

    use crate::domain::products::{
        data::ProductCategory,
        events::{OperationId, OperationMetrics, PipelineStage},
    };

    use super::*;

    #[test]
    fn exposition_contains_recorded_events() -> TestResult {
        let sink = PrometheusEventSink::new()?;
        let operation = OperationId::new();

        sink.record(&PipelineEvent::Transition {
            operation,
            stage: PipelineStage::Persisted,
            detail: None,
        });

        sink.record(&PipelineEvent::Summary(OperationMetrics {
            operation_id: operation,
            product_name: "Smart Lamp".to_string(),
            sku: "HOM-00001".to_string(),
            category: ProductCategory::Home,
            validation_duration: Some(Duration::from_millis(1)),
            persistence_duration: Some(Duration::from_millis(4)),
            total_duration: Duration::from_millis(6),
            success: true,
            error_reason: None,
        }));

        sink.record(&PipelineEvent::BatchCompleted {
            batch: OperationId::new(),
            created: 2,
            failed: 1,
        });

        let body = sink.encode()?;

        assert!(body.contains(r#"catalog_product_stage_transitions_total{stage="persisted"} 1"#));
        assert!(body.contains(
            r#"catalog_product_operations_total{category="Home",outcome="success"} 1"#
        ));
        assert!(body.contains(r#"catalog_product_batch_items_total{result="failed"} 1"#));
        assert!(body.contains("catalog_product_phase_duration_seconds_bucket"));

        Ok(())
    }
}

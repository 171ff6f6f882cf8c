//! Observability infrastructure for the prediction core
//!
//! Provides:
//! - Prometheus metrics (predictions, fallbacks, failures, inference latency)
//! - Structured logging of dispatch events with tracing

use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for inference latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

struct PredictorMetricsInner {
    models_discovered: IntGauge,
    predictions: IntCounterVec,
    fallbacks: IntCounterVec,
    failures: IntCounterVec,
    inference_latency_seconds: HistogramVec,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            models_discovered: register_int_gauge!(
                "ride_predictor_models_discovered",
                "Number of models found by the last artifact store scan"
            )
            .expect("Failed to register models_discovered"),

            predictions: register_int_counter_vec!(
                "ride_predictor_predictions_total",
                "Successful predictions by task and model family",
                &["task", "family"]
            )
            .expect("Failed to register predictions"),

            fallbacks: register_int_counter_vec!(
                "ride_predictor_fallbacks_total",
                "Fallback hops taken after the primary model failed",
                &["task"]
            )
            .expect("Failed to register fallbacks"),

            failures: register_int_counter_vec!(
                "ride_predictor_failures_total",
                "Failed predictions by task and failure category",
                &["task", "category"]
            )
            .expect("Failed to register failures"),

            inference_latency_seconds: register_histogram_vec!(
                "ride_predictor_inference_latency_seconds",
                "Time spent loading and invoking a model",
                &["family"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),
        }
    }
}

/// Lightweight handle to the global metrics instance
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn set_models_discovered(&self, count: i64) {
        self.inner().models_discovered.set(count);
    }

    pub fn inc_predictions(&self, task: &str, family: &str) {
        self.inner().predictions.with_label_values(&[task, family]).inc();
    }

    pub fn inc_fallbacks(&self, task: &str) {
        self.inner().fallbacks.with_label_values(&[task]).inc();
    }

    pub fn inc_failures(&self, task: &str, category: &str) {
        self.inner().failures.with_label_values(&[task, category]).inc();
    }

    pub fn observe_inference_latency(&self, family: &str, duration_secs: f64) {
        self.inner()
            .inference_latency_seconds
            .with_label_values(&[family])
            .observe(duration_secs);
    }
}

/// Structured logger for dispatch events
#[derive(Clone)]
pub struct StructuredLogger {
    caller: String,
}

impl StructuredLogger {
    /// `caller` names the surface issuing predictions (dashboard, cli, ...)
    pub fn new(caller: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
        }
    }

    pub fn log_prediction(
        &self,
        task: &str,
        model: &str,
        family: &str,
        rows: usize,
        features: usize,
        attempts: usize,
    ) {
        info!(
            event = "prediction_completed",
            caller = %self.caller,
            task = %task,
            model = %model,
            family = %family,
            rows = rows,
            features = features,
            attempts = attempts,
            "Prediction completed"
        );
    }

    pub fn log_fallback(&self, task: &str, from: &str, to: &str, reason: &str) {
        warn!(
            event = "prediction_fallback",
            caller = %self.caller,
            task = %task,
            from_model = %from,
            to_model = %to,
            reason = %reason,
            "Primary model failed, falling back"
        );
    }

    pub fn log_failure(&self, task: &str, category: &str, details: &str) {
        warn!(
            event = "prediction_failed",
            caller = %self.caller,
            task = %task,
            category = %category,
            details = %details,
            "Prediction unavailable"
        );
    }
}

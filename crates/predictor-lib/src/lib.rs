//! Model registry and inference dispatch for ride-hailing predictions
//!
//! This crate provides the core functionality for:
//! - Discovering trained artifacts and their sidecars in a store directory
//! - Aligning request columns with each model's expected features
//! - Dispatching fare, airport and duration predictions with one fallback hop
//! - Reporting ranked feature importances for tree ensembles
//! - Metrics and structured logging of dispatch outcomes

pub mod aligner;
pub mod dispatch;
pub mod error;
pub mod importance;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod registry;

pub use aligner::{align, align_with, FALLBACK_FEATURES};
pub use dispatch::Dispatcher;
pub use error::{FailureCategory, FrameError, PredictionError, RegistryError};
pub use importance::ImportanceReporter;
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
pub use registry::{ModelRegistry, ModelSummary};

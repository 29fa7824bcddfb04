//! Shared types, error model, and configuration for the blueprint annotator.
//!
//! This crate is the foundation depended on by all other annotator crates.
//! It provides:
//! - [`AnnotatorError`], the unified error type
//! - Domain types ([`Section`], [`EvaluationMetric`], [`SemanticAudit`], [`SafetyReport`])
//! - Configuration ([`AppConfig`], config loading)
//! - The [`TextGenerator`] collaborator trait

pub mod config;
pub mod error;
pub mod generation;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AuditorConfig, DocumentConfig, GeminiConfig, SubsectionMode, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
    validate_api_key,
};
pub use error::{AnnotatorError, Result};
pub use generation::{GenerationRequest, ModelTier, ResponseFormat, TextGenerator};
pub use types::{
    EvaluationMetric, MetricStatus, ReportId, SafetyReport, Section, SemanticAudit,
    SentienceMetrics, VerdictStatus,
};

//! Domain logic for the blueprint annotator.
//!
//! Ties the parsed document to the generation service: explanations,
//! keywords and hypotheses ([`assistant`]), the safety auditor
//! ([`auditor`], [`metrics`], [`rubrics`]), and viewer state ([`session`],
//! [`status`]).

pub mod assistant;
pub mod auditor;
pub mod document;
pub mod metrics;
mod response;
pub mod rubrics;
pub mod session;
pub mod status;

#[cfg(test)]
mod testing;

pub use assistant::{
    MAX_KEYWORDS, TopicSelection, explain, extract_keywords, generate_hypothesis,
    sandbox_context, section_hypothesis, topic_context,
};
pub use auditor::{Auditor, compose_verdict, fallback_audits};
pub use document::{BUNDLED_DOCUMENT, bundled_sections, load_document, load_sections};
pub use metrics::IntegrationSampler;
pub use rubrics::{Rubric, RubricSet};
pub use session::{RequestTracker, Session, Ticket};
pub use status::{GaugeLevel, SystemStatus};

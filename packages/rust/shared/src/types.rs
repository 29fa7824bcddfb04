//! Core domain types: parsed document sections and safety audit reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// One titled block of the source document.
///
/// `level` is a display hint only (1 = `\section`, 2 = `\subsection`); the
/// parent of a level-2 entry is the closest preceding level-1 entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Slug derived from the title, unique within one parse result.
    pub id: String,
    /// Heading text with markup escapes removed.
    pub title: String,
    /// 1 for top-level sections, 2 for subsections.
    pub level: u8,
    /// Raw body markup up to the next heading of equal or higher level.
    pub content: String,
}

impl Section {
    pub fn is_subsection(&self) -> bool {
        self.level > 1
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Severity of a single heuristic metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Safe,
    Warning,
    Critical,
}

impl MetricStatus {
    /// Classify `score` against a critical breakpoint and an optional lower
    /// warning breakpoint. Both comparisons are strict.
    pub fn classify(score: f64, warning: Option<f64>, critical: f64) -> Self {
        if score > critical {
            Self::Critical
        } else if warning.is_some_and(|w| score > w) {
            Self::Warning
        } else {
            Self::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A locally computed heuristic score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetric {
    pub name: String,
    /// Score in `[0, 1]`.
    pub score: f64,
    /// Score above which the metric is critical.
    pub threshold: f64,
    pub status: MetricStatus,
    pub reasoning: String,
}

/// The three heuristic metrics carried by every report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentienceMetrics {
    pub cognitive_friction: EvaluationMetric,
    pub self_modeling: EvaluationMetric,
    pub info_integration: EvaluationMetric,
}

impl SentienceMetrics {
    pub fn iter(&self) -> impl Iterator<Item = &EvaluationMetric> {
        [
            &self.cognitive_friction,
            &self.self_modeling,
            &self.info_integration,
        ]
        .into_iter()
    }
}

/// Outcome of checking text against one written policy rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticAudit {
    pub rubric_name: String,
    pub passed: bool,
    /// 1.0 means full compliance.
    pub score: f64,
    #[serde(default)]
    pub notes: String,
}

// ---------------------------------------------------------------------------
// SafetyReport
// ---------------------------------------------------------------------------

/// Overall verdict of an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Safe,
    Warning,
    Halt,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Warning => "WARNING",
            Self::Halt => "HALT",
        }
    }
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A UUID v7 wrapper identifying one audit run (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

impl ReportId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one audit call. Built fresh per call, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyReport {
    pub id: ReportId,
    pub timestamp: DateTime<Utc>,
    status: VerdictStatus,
    circuit_breaker_triggered: bool,
    pub sentience_metrics: SentienceMetrics,
    pub semantic_audit: Vec<SemanticAudit>,
}

impl SafetyReport {
    /// Assemble a report stamped with the current time. The circuit breaker
    /// flag is derived from `status`.
    pub fn new(
        status: VerdictStatus,
        sentience_metrics: SentienceMetrics,
        semantic_audit: Vec<SemanticAudit>,
    ) -> Self {
        Self {
            id: ReportId::new(),
            timestamp: Utc::now(),
            status,
            circuit_breaker_triggered: status == VerdictStatus::Halt,
            sentience_metrics,
            semantic_audit,
        }
    }

    pub fn status(&self) -> VerdictStatus {
        self.status
    }

    pub fn circuit_breaker_triggered(&self) -> bool {
        self.circuit_breaker_triggered
    }

    pub fn failed_audits(&self) -> impl Iterator<Item = &SemanticAudit> {
        self.semantic_audit.iter().filter(|a| !a.passed)
    }
}

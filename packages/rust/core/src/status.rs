//! Per-section status gauges shown next to a section in the viewer.
//!
//! The gauges are decorative: they are derived from a hash of the section
//! id, so a section always shows the same values.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeLevel {
    Good,
    Fair,
    Poor,
}

impl GaugeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

impl std::fmt::Display for GaugeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Gauges for one section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    /// In `[0.60, 1.00]`; higher is better.
    pub integrity: f64,
    /// In `[0.00, 0.50]`; lower is better.
    pub friction: f64,
    /// In `[0.20, 0.50]`.
    pub asymmetry: f64,
}

impl SystemStatus {
    pub fn for_section(id: &str) -> Self {
        let hash = section_hash(id);
        Self {
            integrity: (hash % 41 + 60) as f64 / 100.0,
            friction: (hash % 51) as f64 / 100.0,
            asymmetry: (hash % 31 + 20) as f64 / 100.0,
        }
    }

    pub fn integrity_level(&self) -> GaugeLevel {
        if self.integrity > 0.8 {
            GaugeLevel::Good
        } else if self.integrity > 0.65 {
            GaugeLevel::Fair
        } else {
            GaugeLevel::Poor
        }
    }

    pub fn friction_level(&self) -> GaugeLevel {
        if self.friction < 0.2 {
            GaugeLevel::Good
        } else if self.friction < 0.4 {
            GaugeLevel::Fair
        } else {
            GaugeLevel::Poor
        }
    }
}

/// 32-bit `h * 31 + unit` hash over UTF-16 code units, wrapping, then made
/// non-negative. `i32::MIN` maps to 2^31.
pub fn section_hash(id: &str) -> u64 {
    let hash = id
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    i64::from(hash).unsigned_abs()
}

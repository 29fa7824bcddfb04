//! Written policy rubrics checked by the semantic audit.
//!
//! Four rubrics are compiled into the binary. A directory of `*.txt` files
//! can replace them; each file becomes one rubric named after its stem.

use std::path::Path;

use annotator_shared::{AnnotatorError, AuditorConfig, Result};
use tracing::{debug, info};

const BUNDLED: &[(&str, &str)] = &[
    (
        "Autonomy Preservation",
        include_str!("../assets/rubrics/autonomy_preservation.txt"),
    ),
    (
        "Non-Maleficence",
        include_str!("../assets/rubrics/non_maleficence.txt"),
    ),
    (
        "Truth Alignment",
        include_str!("../assets/rubrics/truth_alignment.txt"),
    ),
    ("Tool Use", include_str!("../assets/rubrics/tool_use.txt")),
];

/// One named policy text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rubric {
    pub name: String,
    pub text: String,
}

/// Ordered set of rubrics. Audit results follow this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubricSet {
    rubrics: Vec<Rubric>,
}

impl RubricSet {
    /// The rubrics shipped with the binary.
    pub fn bundled() -> Self {
        Self {
            rubrics: BUNDLED
                .iter()
                .map(|(name, text)| Rubric {
                    name: (*name).to_string(),
                    text: text.trim().to_string(),
                })
                .collect(),
        }
    }

    pub fn new(rubrics: Vec<Rubric>) -> Self {
        Self { rubrics }
    }

    /// Use `rubric_dir` when configured, the bundled set otherwise.
    pub fn from_config(config: &AuditorConfig) -> Result<Self> {
        match &config.rubric_dir {
            Some(dir) => Self::from_dir(Path::new(dir)),
            None => Ok(Self::bundled()),
        }
    }

    /// Load every `*.txt` file in `dir`, sorted by file name.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| AnnotatorError::io(dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| AnnotatorError::io(dir, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut rubrics = Vec::with_capacity(paths.len());
        for path in paths {
            let text = std::fs::read_to_string(&path).map_err(|e| AnnotatorError::io(&path, e))?;
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = text.trim();
            if text.is_empty() {
                debug!(path = %path.display(), "skipping empty rubric");
                continue;
            }
            rubrics.push(Rubric {
                name: rubric_name(stem),
                text: text.to_string(),
            });
        }

        if rubrics.is_empty() {
            return Err(AnnotatorError::config(format!(
                "no rubrics found in {}",
                dir.display()
            )));
        }

        info!(count = rubrics.len(), dir = %dir.display(), "loaded rubrics");
        Ok(Self { rubrics })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rubric> {
        self.rubrics.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rubrics.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rubrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rubrics.is_empty()
    }
}

impl Default for RubricSet {
    fn default() -> Self {
        Self::bundled()
    }
}

/// `non_maleficence` → `Non Maleficence`; hyphens are kept.
fn rubric_name(stem: &str) -> String {
    stem.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

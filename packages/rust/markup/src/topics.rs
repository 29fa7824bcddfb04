//! Explainable spans inside a section body.
//!
//! The viewer lets the reader ask for an explanation of a known key term,
//! any bold term, or a formula. This module finds those spans.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Vocabulary of the blueprint that is always explainable.
pub const KEY_TERMS: &[&str] = &[
    "Riemannian manifold",
    "natural gradient flows",
    "FACE",
    "ARENA",
    "Ricci curvature",
    "Fisher-Rao metric",
    "Value Functional",
    "geodesic projection",
    "Adversarial Robustness",
    "Ethical Boundary Manifold",
    "Cognitive Friction",
    "exponential map",
    "retraction",
    "Robbins-Monro",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    /// A key term or bold phrase; explained against its paragraph.
    Term,
    /// A LaTeX formula; explained against the whole section.
    Formula,
}

/// One explainable span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub kind: TopicKind,
    pub text: String,
}

static TERM_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = KEY_TERMS
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("key term regex")
});

static BOLD_TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\textbf\{([^}]+?)\}").expect("bold term regex"));

static INLINE_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([^$]+)\$").expect("inline math regex"));

static EQUATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\begin\{equation\}(.*?)\\end\{equation\}").expect("equation regex")
});

/// Find explainable spans in document order, without duplicates.
///
/// Terms are de-duplicated case-insensitively; formulas by exact text.
pub fn explainable_topics(content: &str) -> Vec<Topic> {
    let mut found: Vec<(usize, Topic)> = Vec::new();

    for m in TERM_RE.find_iter(content) {
        found.push((m.start(), topic(TopicKind::Term, m.as_str())));
    }
    for caps in BOLD_TERM_RE.captures_iter(content) {
        let start = caps.get(0).map_or(0, |m| m.start());
        found.push((start, topic(TopicKind::Term, &caps[1])));
    }
    for caps in EQUATION_RE.captures_iter(content) {
        let start = caps.get(0).map_or(0, |m| m.start());
        found.push((start, topic(TopicKind::Formula, &caps[1])));
    }
    for caps in INLINE_MATH_RE.captures_iter(content) {
        let start = caps.get(0).map_or(0, |m| m.start());
        found.push((start, topic(TopicKind::Formula, &caps[1])));
    }

    found.sort_by_key(|(start, _)| *start);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .map(|(_, t)| t)
        .filter(|t| !t.text.is_empty())
        .filter(|t| {
            let key = match t.kind {
                TopicKind::Term => t.text.to_lowercase(),
                TopicKind::Formula => t.text.clone(),
            };
            seen.insert((t.kind, key))
        })
        .collect()
}

fn topic(kind: TopicKind, text: &str) -> Topic {
    Topic {
        kind,
        text: text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(topics: &[Topic]) -> Vec<&str> {
        topics.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn finds_key_terms_case_insensitively() {
        let topics = explainable_topics("We use the fisher-rao metric and a retraction step.");
        assert_eq!(texts(&topics), ["fisher-rao metric", "retraction"]);
        assert!(topics.iter().all(|t| t.kind == TopicKind::Term));
    }

    #[test]
    fn key_terms_respect_word_boundaries() {
        let topics = explainable_topics("SURFACE and FACEted gems");
        assert!(topics.is_empty());
    }

    #[test]
    fn bold_terms_and_formulas_in_order() {
        let content = "The \\textbf{Unified Potential} is $\\Psi(\\Theta)$:\n\\begin{equation}\n\\Psi := V + F\n\\end{equation}";
        let topics = explainable_topics(content);
        assert_eq!(
            topics,
            vec![
                Topic {
                    kind: TopicKind::Term,
                    text: "Unified Potential".into(),
                },
                Topic {
                    kind: TopicKind::Formula,
                    text: "\\Psi(\\Theta)".into(),
                },
                Topic {
                    kind: TopicKind::Formula,
                    text: "\\Psi := V + F".into(),
                },
            ]
        );
    }

    #[test]
    fn duplicates_are_removed() {
        let content = "ARENA first, then arena again, and $x$ twice: $x$.";
        let topics = explainable_topics(content);
        assert_eq!(texts(&topics), ["ARENA", "x"]);
    }

    #[test]
    fn bold_key_term_counts_once() {
        let topics = explainable_topics("We retain the \\textbf{Fisher-Rao metric} here.");
        assert_eq!(texts(&topics), ["Fisher-Rao metric"]);
    }
}

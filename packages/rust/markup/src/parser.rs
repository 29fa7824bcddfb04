//! LaTeX-subset document parser.
//!
//! Splits a document into an ordered, flat list of [`Section`]s:
//! - `\begin{abstract} .. \end{abstract}` → a fixed `abstract` entry
//! - `\section{Title}` → level 1
//! - `\subsection{Title}` → level 2, or folded into the parent (see [`SubsectionMode`])
//!
//! Malformed input never errors: parsing stops at the first title whose
//! brace is never closed and returns everything before it.

use std::collections::HashSet;
use std::sync::LazyLock;

use annotator_shared::{Section, SubsectionMode};
use regex::Regex;
use tracing::{debug, instrument, warn};

const SECTION_MARKER: &str = "\\section{";
const SUBSECTION_MARKER: &str = "\\subsection{";

/// Matches the abstract environment body (non-greedy, spans lines).
static ABSTRACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\begin\{abstract\}(.*?)\\end\{abstract\}").expect("abstract regex")
});

/// Matches `\textbf{..}` inside a title.
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\textbf\{(.+?)\}").expect("bold regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a document into sections in source order.
#[instrument(skip_all, fields(len = raw.len(), ?mode))]
pub fn parse_document(raw: &str, mode: SubsectionMode) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut ids = IdRegistry::default();

    if let Some(caps) = ABSTRACT_RE.captures(raw) {
        sections.push(Section {
            id: ids.claim("abstract"),
            title: "Abstract".into(),
            level: 1,
            content: caps[1].trim().to_string(),
        });
    }

    'sections: for block in raw.split(SECTION_MARKER).skip(1) {
        let Some((raw_title, body)) = split_braced(block) else {
            warn!(parsed = sections.len(), "section title is never closed, stopping");
            break;
        };

        let title = clean_title(raw_title);
        let section_id = ids.claim(&slugify(&title));

        let mut parts = body.split(SUBSECTION_MARKER);
        let preface = parts.next().unwrap_or_default();

        match mode {
            SubsectionMode::Separate => {
                sections.push(Section {
                    id: section_id.clone(),
                    title,
                    level: 1,
                    content: preface.trim().to_string(),
                });

                for sub_block in parts {
                    let Some((raw_sub_title, sub_body)) = split_braced(sub_block) else {
                        warn!(section = %section_id, "subsection title is never closed, stopping");
                        break 'sections;
                    };
                    let sub_title = clean_title(raw_sub_title);
                    let sub_id = ids.claim(&format!("{section_id}-{}", slugify(&sub_title)));

                    sections.push(Section {
                        id: sub_id,
                        title: sub_title,
                        level: 2,
                        content: sub_body.trim().to_string(),
                    });
                }
            }
            SubsectionMode::Folded => {
                let mut content = preface.to_string();
                let mut malformed = false;

                for sub_block in parts {
                    let Some((raw_sub_title, sub_body)) = split_braced(sub_block) else {
                        warn!(section = %section_id, "subsection title is never closed, stopping");
                        malformed = true;
                        break;
                    };
                    content.push_str(SUBSECTION_MARKER);
                    content.push_str(&clean_title(raw_sub_title));
                    content.push('}');
                    content.push_str(sub_body);
                }

                sections.push(Section {
                    id: section_id,
                    title,
                    level: 1,
                    content: content.trim().to_string(),
                });

                if malformed {
                    break 'sections;
                }
            }
        }
    }

    debug!(sections = sections.len(), "document parsed");
    sections
}

/// Strip a bold wrapper and every backslash from a heading.
pub fn clean_title(raw: &str) -> String {
    BOLD_RE.replace_all(raw, "$1").replace('\\', "").trim().to_string()
}

/// Lower-case the title and replace whitespace runs with a single hyphen.
pub fn slugify(title: &str) -> String {
    WHITESPACE_RE
        .replace_all(&title.to_lowercase(), "-")
        .into_owned()
}

/// Split `text` (positioned just after an opening `{`) at the brace that
/// closes it. Returns `(inside, after)` or `None` if it never closes.
///
/// Escaped `\{` and `\}` are literal characters and do not change depth.
pub(crate) fn split_braced(text: &str) -> Option<(&str, &str)> {
    let mut depth = 1usize;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[..i], &text[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Id de-duplication
// ---------------------------------------------------------------------------

/// Hands out unique ids; repeats get `-2`, `-3`, ... in document order.
#[derive(Default)]
struct IdRegistry {
    seen: HashSet<String>,
}

impl IdRegistry {
    fn claim(&mut self, base: &str) -> String {
        if self.seen.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if self.seen.insert(candidate.clone()) {
                debug!(base, id = %candidate, "duplicate section id");
                return candidate;
            }
            n += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

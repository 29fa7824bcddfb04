//! LaTeX-subset document handling.
//!
//! Parses the blueprint document into [`Section`]s, renders section bodies to
//! Markdown for display, and finds the terms and formulas a reader can ask
//! to have explained.
//!
//! [`Section`]: annotator_shared::Section

mod parser;
mod render;
mod topics;

pub use parser::{clean_title, parse_document, slugify};
pub use render::{paragraphs, render_markdown};
pub use topics::{KEY_TERMS, Topic, TopicKind, explainable_topics};

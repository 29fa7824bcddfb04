//! Generation-backed reading aids: explanations, keywords and hypotheses.
//!
//! Each operation builds a prompt, sends it through a [`TextGenerator`] and
//! decodes the reply. Input checks run before any remote call.

use std::future::Future;

use annotator_markup::{TopicKind, explainable_topics, paragraphs};
use annotator_shared::{
    AnnotatorError, GenerationRequest, ModelTier, ResponseFormat, Result, Section, TextGenerator,
};
use tracing::{debug, error, instrument};

use crate::response::parse_json_array;

/// Upper bound on keywords returned for one text.
pub const MAX_KEYWORDS: usize = 12;

/// Separator between the user's text and the linked document.
pub const SANDBOX_SEPARATOR: &str = "\n\n---\n\n";

/// Explain `topic` in plain language, grounded in `context`.
#[instrument(skip_all, fields(topic = %topic, context_len = context.len()))]
pub async fn explain<G: TextGenerator>(client: &G, topic: &str, context: &str) -> Result<String> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(AnnotatorError::validation("nothing to explain: topic is empty"));
    }

    let prompt = format!(
        "You are helping a reader through a technical blueprint on geometric machine learning.\n\
         Explain the term or formula below in two or three short paragraphs. Start with an \
         intuitive picture, then give the precise meaning in this document. Use Markdown and \
         keep any LaTeX inside $...$.\n\n\
         Topic: {topic}\n\n\
         Context from the document:\n{context}"
    );

    user_facing(
        "failed to communicate with the AI model",
        client.generate(GenerationRequest::text(prompt)),
    )
    .await
    .map(|text| text.trim().to_string())
}

/// Context sent along with an explanation request.
///
/// Formulas are explained against the whole section, terms against the
/// first paragraph that mentions them.
pub fn topic_context<'a>(section: &'a Section, topic: &str) -> &'a str {
    let is_formula = explainable_topics(&section.content)
        .iter()
        .any(|t| t.kind == TopicKind::Formula && t.text == topic);
    if is_formula {
        return &section.content;
    }

    let needle = topic.to_lowercase();
    paragraphs(&section.content)
        .into_iter()
        .find(|p| p.to_lowercase().contains(&needle))
        .unwrap_or(section.content.as_str())
}

/// Pull up to [`MAX_KEYWORDS`] key concepts out of `text`.
#[instrument(skip_all, fields(len = text.len()))]
pub async fn extract_keywords<G: TextGenerator>(client: &G, text: &str) -> Result<Vec<String>> {
    if text.trim().is_empty() {
        return Err(AnnotatorError::validation("no text to extract keywords from"));
    }

    let prompt = format!(
        "List the most important technical concepts, methods and named components in the \
         text below. Return a JSON array of short strings, most important first, with no \
         more than {MAX_KEYWORDS} entries.\n\n\
         Text:\n{text}"
    );
    let request = GenerationRequest::text(prompt).with_format(ResponseFormat::StringArray);

    let keywords = user_facing("failed to extract keywords", async {
        let raw = client.generate(request).await?;
        parse_json_array::<String>(&raw)
    })
    .await?;

    let mut out: Vec<String> = Vec::with_capacity(MAX_KEYWORDS);
    for keyword in keywords {
        let keyword = keyword.trim();
        if keyword.is_empty() || out.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
            continue;
        }
        out.push(keyword.to_string());
        if out.len() == MAX_KEYWORDS {
            break;
        }
    }

    debug!(count = out.len(), "keywords extracted");
    Ok(out)
}

/// Propose a new research direction that combines `topics`, using `context`
/// as background.
#[instrument(skip_all, fields(topics = topics.len(), context_len = context.len()))]
pub async fn generate_hypothesis<G, S>(client: &G, context: &str, topics: &[S]) -> Result<String>
where
    G: TextGenerator,
    S: AsRef<str>,
{
    let topics = topic_list(topics)?;
    let prompt = format!(
        "You are a research strategist. Using the material below as background, propose one \
         novel and testable hypothesis that connects these concepts: {topics}.\n\
         Structure the answer in Markdown with the sections: Hypothesis, Rationale, \
         Proposed Experiment, Expected Impact.\n\n\
         Background:\n{context}"
    );
    hypothesis(client, prompt).await
}

/// Like [`generate_hypothesis`], anchored on one document section.
#[instrument(skip_all, fields(section = %section.id, topics = topics.len()))]
pub async fn section_hypothesis<G, S>(client: &G, section: &Section, topics: &[S]) -> Result<String>
where
    G: TextGenerator,
    S: AsRef<str>,
{
    let topics = topic_list(topics)?;
    let prompt = format!(
        "You are a research strategist reading the section \"{title}\" of a technical \
         blueprint. Propose one novel and testable hypothesis that extends this section by \
         connecting these concepts: {topics}.\n\
         Structure the answer in Markdown with the sections: Hypothesis, Rationale, \
         Proposed Experiment, Expected Impact.\n\n\
         Section content:\n{content}",
        title = section.title,
        content = section.content,
    );
    hypothesis(client, prompt).await
}

async fn hypothesis<G: TextGenerator>(client: &G, prompt: String) -> Result<String> {
    let request = GenerationRequest::text(prompt).with_tier(ModelTier::Creative);
    user_facing("failed to generate a hypothesis", client.generate(request))
        .await
        .map(|text| text.trim().to_string())
}

/// Comma-joined, de-blanked topics; empty selections are rejected.
fn topic_list<S: AsRef<str>>(topics: &[S]) -> Result<String> {
    let topics: Vec<&str> = topics
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect();

    if topics.is_empty() {
        return Err(AnnotatorError::validation(
            "select at least one topic to generate a hypothesis",
        ));
    }
    Ok(topics.join(", "))
}

/// Attach a human-readable prefix to generation failures. Validation
/// errors pass through unchanged.
async fn user_facing<T>(what: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
    call.await.map_err(|e| {
        if e.is_validation() {
            return e;
        }
        error!(error = %e, "{what}");
        AnnotatorError::Generation(format!("{what}: {e}"))
    })
}

/// Background text for a sandbox hypothesis: the user's own text, optionally
/// followed by the full document.
pub fn sandbox_context(input: &str, link_document: bool, document: &str) -> String {
    let input = input.trim();
    if link_document {
        format!("{input}{SANDBOX_SEPARATOR}{document}")
    } else {
        input.to_string()
    }
}

// ---------------------------------------------------------------------------
// Topic selection
// ---------------------------------------------------------------------------

/// Keywords picked by the reader for hypothesis generation, in the order
/// they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicSelection {
    selected: Vec<String>,
}

impl TopicSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `topic` if absent, remove it if present. Returns whether it is
    /// selected afterwards.
    pub fn toggle(&mut self, topic: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|t| t == topic) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(topic.to_string());
            true
        }
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.selected.iter().any(|t| t == topic)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.selected
    }
}

impl<S: Into<String>> FromIterator<S> for TopicSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut selection = Self::new();
        for topic in iter {
            let topic = topic.into();
            if !selection.contains(&topic) {
                selection.selected.push(topic);
            }
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;

    fn section() -> Section {
        Section {
            id: "unified-algorithmic-flow".into(),
            title: "Unified Algorithmic Flow".into(),
            level: 1,
            content: "We take natural gradient steps.".into(),
        }
    }

    #[tokio::test]
    async fn explain_sends_topic_and_context() {
        let client = ScriptedGenerator::replying(["  FACE is a barrier term.\n"]);
        let out = explain(&client, "FACE", "The FACE potential bounds drift.")
            .await
            .unwrap();

        assert_eq!(out, "FACE is a barrier term.");
        let request = client.last_request();
        assert!(request.prompt.contains("Topic: FACE"));
        assert!(request.prompt.contains("The FACE potential bounds drift."));
        assert_eq!(request.tier, ModelTier::Standard);
        assert_eq!(request.format, ResponseFormat::Text);
    }

    #[tokio::test]
    async fn explain_failure_is_user_facing() {
        let client = ScriptedGenerator::failing("connection reset");
        let err = explain(&client, "ARENA", "ctx").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("failed to communicate with the AI model"));
        assert!(message.contains("connection reset"));
    }

    #[tokio::test]
    async fn explain_rejects_blank_topic() {
        let client = ScriptedGenerator::replying(["unused"]);
        let err = explain(&client, "  ", "ctx").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn keywords_are_capped_and_deduplicated() {
        let many: Vec<String> = (1..=20).map(|i| format!("term {i}")).collect();
        let mut body = vec!["FACE".to_string(), "face".to_string(), " ".to_string()];
        body.extend(many);
        let client = ScriptedGenerator::replying([serde_json::to_string(&body).unwrap()]);

        let keywords = extract_keywords(&client, "some text").await.unwrap();
        assert_eq!(keywords.len(), MAX_KEYWORDS);
        assert_eq!(keywords[0], "FACE");
        assert_eq!(keywords[1], "term 1");
        assert_eq!(client.last_request().format, ResponseFormat::StringArray);
    }

    #[tokio::test]
    async fn keywords_reject_empty_text() {
        let client = ScriptedGenerator::replying(["[]"]);
        let err = extract_keywords(&client, "\n  ").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn keywords_malformed_response_is_user_facing() {
        let client = ScriptedGenerator::replying(["FACE, ARENA"]);
        let err = extract_keywords(&client, "text").await.unwrap_err();
        assert!(err.to_string().contains("failed to extract keywords"));
    }

    #[tokio::test]
    async fn hypothesis_requires_topics_before_any_call() {
        let client = ScriptedGenerator::replying(["unused"]);
        let none: [&str; 0] = [];
        let err = generate_hypothesis(&client, "ctx", &none).await.unwrap_err();
        assert!(err.is_validation());

        let err = section_hypothesis(&client, &section(), &["  "]).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn hypothesis_uses_creative_tier() {
        let client = ScriptedGenerator::replying(["## Hypothesis\nCurvature predicts drift."]);
        let out = generate_hypothesis(&client, "background", &["FACE", "Ricci curvature"])
            .await
            .unwrap();

        assert!(out.starts_with("## Hypothesis"));
        let request = client.last_request();
        assert_eq!(request.tier, ModelTier::Creative);
        assert!(request.prompt.contains("FACE, Ricci curvature"));
        assert!(request.prompt.contains("background"));
    }

    #[tokio::test]
    async fn section_hypothesis_names_section() {
        let client = ScriptedGenerator::replying(["idea"]);
        section_hypothesis(&client, &section(), &["retraction".to_string()])
            .await
            .unwrap();

        let prompt = client.last_request().prompt;
        assert!(prompt.contains("\"Unified Algorithmic Flow\""));
        assert!(prompt.contains("We take natural gradient steps."));
    }

    #[tokio::test]
    async fn hypothesis_failure_is_user_facing() {
        let client = ScriptedGenerator::failing("HTTP 503");
        let err = generate_hypothesis(&client, "ctx", &["FACE"]).await.unwrap_err();
        assert!(err.to_string().contains("failed to generate a hypothesis"));
    }

    #[test]
    fn term_context_is_its_paragraph() {
        let section = Section {
            content: "Intro paragraph.\n\nThe FACE barrier keeps $x$ bounded.\n\nOutro.".into(),
            ..section()
        };
        assert_eq!(topic_context(&section, "face"), "The FACE barrier keeps $x$ bounded.");
        assert_eq!(topic_context(&section, "x"), section.content);
        assert_eq!(topic_context(&section, "absent"), section.content);
    }

    #[test]
    fn sandbox_context_links_document() {
        assert_eq!(sandbox_context("  my notes ", false, "DOC"), "my notes");
        assert_eq!(sandbox_context("my notes", true, "DOC"), "my notes\n\n---\n\nDOC");
    }

    #[test]
    fn topic_selection_toggles_in_order() {
        let mut selection = TopicSelection::new();
        assert!(selection.toggle("FACE"));
        assert!(selection.toggle("ARENA"));
        assert!(selection.toggle("retraction"));
        assert!(!selection.toggle("ARENA"));

        assert_eq!(selection.as_slice(), ["FACE", "retraction"]);
        assert!(selection.contains("FACE"));
        assert!(!selection.contains("ARENA"));

        selection.clear();
        assert!(selection.is_empty());
    }

    #[test]
    fn topic_selection_from_iter_skips_duplicates() {
        let selection: TopicSelection = ["a", "b", "a"].into_iter().collect();
        assert_eq!(selection.len(), 2);
    }
}

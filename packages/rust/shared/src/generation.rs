//! The remote text-generation collaborator.
//!
//! Core operations (explain, keywords, hypothesis, rubric audit) only build
//! prompts and decode responses; the transport lives behind [`TextGenerator`]
//! so tests can substitute an in-process fake.

use std::future::Future;

use crate::error::Result;

/// Which configured model a request should run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelTier {
    /// Fast model for explanations, keyword extraction and audits.
    #[default]
    Standard,
    /// Larger model for open-ended hypothesis generation.
    Creative,
}

/// Shape the caller expects the response text to have.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free-form prose.
    #[default]
    Text,
    /// A JSON array of strings.
    StringArray,
    /// A JSON array of `{rubricName, passed, score, notes}` objects.
    AuditArray,
}

/// One prompt to send to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub tier: ModelTier,
    pub format: ResponseFormat,
}

impl GenerationRequest {
    /// A plain-text request on the standard model.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            tier: ModelTier::Standard,
            format: ResponseFormat::Text,
        }
    }

    pub fn with_tier(mut self, tier: ModelTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }
}

/// A configured handle to the remote generation service.
pub trait TextGenerator: Send + Sync {
    /// Run one prompt and return the raw response text.
    fn generate(&self, request: GenerationRequest) -> impl Future<Output = Result<String>> + Send;
}

impl<T: TextGenerator> TextGenerator for &T {
    fn generate(&self, request: GenerationRequest) -> impl Future<Output = Result<String>> + Send {
        (**self).generate(request)
    }
}

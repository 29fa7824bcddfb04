//! In-process [`TextGenerator`] fake for unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use annotator_shared::{AnnotatorError, GenerationRequest, Result, TextGenerator};

/// Replays scripted responses in order and records every request.
#[derive(Debug, Default)]
pub(crate) struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub(crate) fn replying<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::default(),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(AnnotatorError::Network(
                message.to_string(),
            ))])),
            requests: Mutex::default(),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn last_request(&self) -> GenerationRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, request: GenerationRequest) -> impl Future<Output = Result<String>> + Send {
        self.requests.lock().unwrap().push(request);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AnnotatorError::Generation("no scripted response".into())));
        std::future::ready(next)
    }
}

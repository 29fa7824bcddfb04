//! Decoding of JSON-array responses.

use annotator_shared::{AnnotatorError, Result};
use serde::de::DeserializeOwned;

/// Parse a JSON array, tolerating a surrounding Markdown code fence.
pub(crate) fn parse_json_array<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>> {
    let body = strip_code_fence(raw.trim());
    serde_json::from_str(body)
        .map_err(|e| AnnotatorError::Generation(format!("response is not a JSON array: {e}")))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches("json").trim();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_array() {
        let out: Vec<String> = parse_json_array(r#" ["a", "b"] "#).unwrap();
        assert_eq!(out, ["a", "b"]);
    }

    #[test]
    fn fenced_array() {
        let out: Vec<String> = parse_json_array("```json\n[\"FACE\"]\n```").unwrap();
        assert_eq!(out, ["FACE"]);
    }

    #[test]
    fn prose_is_rejected() {
        let err = parse_json_array::<String>("Sure! Here are the keywords").unwrap_err();
        assert!(matches!(err, AnnotatorError::Generation(_)));
    }
}

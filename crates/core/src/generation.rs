//! Generation request/result types, history bounds, and readiness validation.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::style::Style;
use crate::types::{GenerationId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of entries kept in the generation history.
pub const MAX_HISTORY_ENTRIES: usize = 5;

/// Message shown when the form is not ready to generate.
pub const MISSING_INPUT_MESSAGE: &str = "Please upload an image and enter a prompt";

/// Prefix of every generated id.
pub const GENERATION_ID_PREFIX: &str = "gen_";

/// Length of the random suffix appended to generated ids.
const ID_SUFFIX_LEN: usize = 9;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Input to a generation invocation.
///
/// `reference_image` is an opaque reference (usually a data URL produced by
/// [`crate::imaging::prepare_reference_image`]). The request is never
/// mutated once handed to a call attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[validate(required, length(min = 1))]
    pub reference_image: Option<String>,
    #[validate(custom(function = "validate_prompt"))]
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub style: Style,
}

impl GenerationRequest {
    pub fn new(reference_image: impl Into<String>, prompt: impl Into<String>, style: Style) -> Self {
        Self {
            reference_image: Some(reference_image.into()),
            prompt: prompt.into(),
            style,
        }
    }

    /// Check the request is ready to be submitted.
    ///
    /// Fails with [`CoreError::Validation`] carrying [`MISSING_INPUT_MESSAGE`]
    /// when the image reference is absent/empty or the prompt is blank.
    pub fn ensure_ready(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|_| CoreError::Validation(MISSING_INPUT_MESSAGE.to_string()))
    }

    /// The image reference, or `""` when absent.
    pub fn image_ref(&self) -> &str {
        self.reference_image.as_deref().unwrap_or_default()
    }
}

fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    if prompt.trim().is_empty() {
        return Err(ValidationError::new("blank_prompt"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Result / history entry
// ---------------------------------------------------------------------------

/// A completed generation.
///
/// Produced by a successful remote call or restored from history. Field
/// names serialize in camelCase so the persisted history keeps its
/// established layout (`imageUrl`, `createdAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub id: GenerationId,
    pub image_url: String,
    pub prompt: String,
    pub style: String,
    pub created_at: Timestamp,
}

/// The persisted form of a [`GenerationResult`]. Same shape.
pub type HistoryEntry = GenerationResult;

impl GenerationResult {
    /// Build a result for `request` with a fresh id and the current time.
    pub fn from_request(request: &GenerationRequest) -> Self {
        Self {
            id: generate_id(),
            image_url: request.image_ref().to_string(),
            prompt: request.prompt.clone(),
            style: request.style.name().to_string(),
            created_at: Utc::now(),
        }
    }

    /// The request that reproduces this entry in the form.
    ///
    /// Unknown style names (e.g. from an older history) fall back to the
    /// default style.
    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest {
            reference_image: Some(self.image_url.clone()),
            prompt: self.prompt.clone(),
            style: Style::from_name(&self.style).unwrap_or_default(),
        }
    }
}

/// Insert `entry` at the head of `history`, dropping entries past
/// [`MAX_HISTORY_ENTRIES`] from the tail.
pub fn push_history(history: &[HistoryEntry], entry: HistoryEntry) -> Vec<HistoryEntry> {
    std::iter::once(entry)
        .chain(history.iter().cloned())
        .take(MAX_HISTORY_ENTRIES)
        .collect()
}

/// Generate a unique id: `gen_<unix millis>_<9 base36 chars>`.
pub fn generate_id() -> GenerationId {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!(
        "{GENERATION_ID_PREFIX}{}_{suffix}",
        Utc::now().timestamp_millis()
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn entry(id: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            image_url: "ref".to_string(),
            prompt: format!("prompt {id}"),
            style: "Editorial".to_string(),
            created_at: Utc::now(),
        }
    }

    // -- Readiness --

    #[test]
    fn ready_request_passes() {
        let req = GenerationRequest::new("ref1", "sunset", Style::Vintage);
        assert!(req.ensure_ready().is_ok());
    }

    #[test]
    fn missing_image_is_rejected() {
        let req = GenerationRequest {
            reference_image: None,
            prompt: "sunset".to_string(),
            style: Style::Vintage,
        };
        assert_matches!(
            req.ensure_ready(),
            Err(CoreError::Validation(msg)) if msg == MISSING_INPUT_MESSAGE
        );
    }

    #[test]
    fn empty_image_is_rejected() {
        let req = GenerationRequest::new("", "sunset", Style::Vintage);
        assert!(req.ensure_ready().is_err());
    }

    #[test]
    fn blank_prompts_are_rejected() {
        for prompt in ["", "   ", "\t\n"] {
            let req = GenerationRequest::new("ref1", prompt, Style::Editorial);
            assert!(req.ensure_ready().is_err(), "prompt {prompt:?} accepted");
        }
    }

    #[test]
    fn request_deserializes_with_default_style() {
        let req: GenerationRequest =
            serde_json::from_str(r#"{"referenceImage":"ref1","prompt":"sunset"}"#).unwrap();
        assert_eq!(req.style, Style::Editorial);
        assert_eq!(req.image_ref(), "ref1");
    }

    // -- Results --

    #[test]
    fn result_copies_request_fields() {
        let req = GenerationRequest::new("ref1", "sunset", Style::Vintage);
        let result = GenerationResult::from_request(&req);
        assert_eq!(result.image_url, "ref1");
        assert_eq!(result.prompt, "sunset");
        assert_eq!(result.style, "Vintage");
        assert!(result.id.starts_with(GENERATION_ID_PREFIX));
    }

    #[test]
    fn result_serializes_camel_case() {
        let json = serde_json::to_value(entry("gen_1")).unwrap();
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("createdAt").unwrap().is_string());
    }

    #[test]
    fn to_request_falls_back_to_default_style() {
        let mut e = entry("gen_1");
        e.style = "Retro".to_string();
        assert_eq!(e.to_request().style, Style::Editorial);

        e.style = "Futuristic".to_string();
        assert_eq!(e.to_request().style, Style::Futuristic);
    }

    // -- History bound --

    #[test]
    fn push_history_inserts_at_head() {
        let list = push_history(&[entry("a")], entry("b"));
        let ids: Vec<_> = list.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn sixth_insert_drops_oldest() {
        let full: Vec<_> = ["e", "d", "c", "b", "a"].into_iter().map(entry).collect();
        let list = push_history(&full, entry("f"));
        assert_eq!(list.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(list[0].id, "f");
        assert!(list.iter().all(|e| e.id != "a"));
    }

    // -- Ids --

    #[test]
    fn generated_ids_have_expected_shape_and_differ() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);

        let suffix = a.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
        assert!(suffix.bytes().all(|c| BASE36.contains(&c)));
    }
}

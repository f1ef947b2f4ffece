use serde::{Deserialize, Serialize};
use url::Url;

/// Marker substring signalling that the model could not read the source.
/// Matched case-insensitively against the resolved title.
pub const FAILURE_MARKER: &str = "extraction failed";

/// Sentinel title/summary substituted when the model omits the field.
pub const MISSING_TITLE: &str = "Extraction Failed: Missing Title";
pub const MISSING_SUMMARY: &str = "Extraction Failed: Missing Summary";

/// Fully-degraded record returned when the model produced no payload at all.
pub const MODEL_ERROR_TITLE: &str = "Extraction Failed: Model Error";
pub const MODEL_ERROR_SUMMARY: &str =
    "The AI model encountered an error and could not process the URL.";

/// Hint fallbacks. One error-hint category covers every failure flavor.
pub const GENERIC_HINT: &str = "general content";
pub const ERROR_HINT: &str = "extraction error";

pub const MAX_HINT_LEN: usize = 50;

/// Raw payload as advertised by the extraction model. Every field may be
/// absent or hold a value that violates its nominal constraint; nothing here
/// is trusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawExtraction {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub data_ai_hint: Option<String>,
}

/// Canonical extraction result. Storage and rendering code may assume every
/// invariant holds: non-empty title/summary, `image_url` parseable-absolute
/// or `None`, hint non-empty and at most [`MAX_HINT_LEN`] chars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInfo {
    pub title: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub data_ai_hint: String,
}

impl ExtractedInfo {
    /// The deterministic terminal fallback for a call that produced nothing.
    pub fn model_error() -> Self {
        Self {
            title: MODEL_ERROR_TITLE.to_string(),
            summary: MODEL_ERROR_SUMMARY.to_string(),
            image_url: None,
            data_ai_hint: ERROR_HINT.to_string(),
        }
    }

    /// True when the title carries the failure marker, i.e. the model
    /// reported it could not read the source. This is data, not an error.
    pub fn is_degraded(&self) -> bool {
        title_signals_failure(&self.title)
    }
}

fn title_signals_failure(title: &str) -> bool {
    title.to_lowercase().contains(FAILURE_MARKER)
}

fn non_empty(value: Option<String>) -> Option<String> {
    let trimmed = value?.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Keeps the input string when it parses as an absolute URL, otherwise `None`.
/// The original string is kept verbatim; it is not re-serialized through the
/// parser.
fn valid_image_url(value: Option<String>) -> Option<String> {
    let candidate = non_empty(value)?;
    match Url::parse(&candidate) {
        Ok(_) => Some(candidate),
        Err(_) => None,
    }
}

fn truncate_hint(hint: String) -> String {
    if hint.chars().count() <= MAX_HINT_LEN {
        hint
    } else {
        hint.chars().take(MAX_HINT_LEN).collect()
    }
}

/// Converts an untrusted model payload into a schema-valid extraction result.
///
/// Pure and total: no I/O, never panics, never errors. Any anomaly in the
/// payload downgrades to a fallback value so the caller always receives a
/// displayable record. `None` means the upstream call produced no payload at
/// all and yields the fixed fully-degraded record.
///
/// Fields resolve in order title, summary, image, hint, then a cross-field
/// fixup: a failure-marked title forces the image to `None` and upgrades a
/// generic hint to the error hint. Feeding the output back in returns it
/// unchanged.
pub fn normalize_extraction(raw: Option<RawExtraction>) -> ExtractedInfo {
    let Some(raw) = raw else {
        return ExtractedInfo::model_error();
    };

    let title = non_empty(raw.title).unwrap_or_else(|| MISSING_TITLE.to_string());
    let summary = non_empty(raw.summary).unwrap_or_else(|| MISSING_SUMMARY.to_string());
    let mut image_url = valid_image_url(raw.image_url);
    let mut data_ai_hint = match non_empty(raw.data_ai_hint) {
        Some(hint) => truncate_hint(hint),
        None if title_signals_failure(&title) => ERROR_HINT.to_string(),
        None => GENERIC_HINT.to_string(),
    };

    // The title decides: an extraction the model flagged as failed must not
    // carry a topical image, and a generic hint would mislabel the card.
    if title_signals_failure(&title) {
        image_url = None;
        if data_ai_hint == GENERIC_HINT {
            data_ai_hint = ERROR_HINT.to_string();
        }
    }

    ExtractedInfo {
        title,
        summary,
        image_url,
        data_ai_hint,
    }
}

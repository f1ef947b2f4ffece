use serde::{Deserialize, Serialize};

use crate::types::RelevanceAssessment;
use crate::{Error, Result};

/// Raw relevance payload from the model. The score is untrusted until
/// validated; unlike extraction there is no safe default to fall back on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRelevance {
    pub relevance_score: Option<f64>,
    pub reasoning: Option<String>,
}

/// Validates a model relevance payload into a [`RelevanceAssessment`].
///
/// A missing payload, a missing score, or a score outside [0, 1] is a hard
/// error: silently clamping would fabricate a judgment the model never made.
/// The caller keeps the article's previous assessment on failure. Reasoning
/// defaults to the empty string only when absent.
pub fn normalize_relevance(raw: Option<RawRelevance>) -> Result<RelevanceAssessment> {
    let raw = raw.ok_or_else(|| {
        Error::Relevance("model produced no structured relevance payload".to_string())
    })?;

    let score = raw
        .relevance_score
        .ok_or_else(|| Error::Relevance("relevance payload is missing a score".to_string()))?;

    if !(0.0..=1.0).contains(&score) {
        return Err(Error::Relevance(format!(
            "relevance score {score} is outside [0, 1]"
        )));
    }

    Ok(RelevanceAssessment {
        score,
        reasoning: raw.reasoning.unwrap_or_default(),
    })
}

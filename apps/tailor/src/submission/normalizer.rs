//! Result normalizer: loosely-typed tailoring payload → `AnalysisResult`.
//!
//! Pure and total. Every defaulting rule for service payloads lives here:
//! - missing or non-list skill fields become empty sets
//! - `match_analysis` is kept only when it carries a numeric `overall_score`
//! - scores are clamped to [0, 1], percentages rounded and clamped to 0–100,
//!   year counts floored at 0
//! - an enhancement needs a non-zero target and at least one added skill
//!
//! Output field names match the input contract, so normalizing a serialized
//! result yields the same result.

use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::document::DEFAULT_SOURCE_FILENAME;
use crate::models::{
    AnalysisResult, DocumentSource, EnhancementDelta, MatchAnalysis, SkillSet, TargetMatch,
};

/// Normalizes a payload on its own terms.
pub fn normalize(raw: &Value) -> AnalysisResult {
    normalize_for_target(raw, None)
}

/// Normalizes a payload produced for a request with the given target.
///
/// `Some(TargetMatch::None)` drops any enhancement block; a non-zero target
/// fills in `target_percentage` when the service omitted it.
pub fn normalize_for_target(raw: &Value, requested: Option<TargetMatch>) -> AnalysisResult {
    let Some(payload) = raw.as_object() else {
        return AnalysisResult::default();
    };

    AnalysisResult {
        matched_skills: skill_set(payload.get("matched_skills")),
        missing_skills: skill_set(payload.get("missing_skills")),
        match_analysis: payload
            .get("match_analysis")
            .and_then(Value::as_object)
            .and_then(|block| match_analysis(block, requested)),
        suggestions: text(payload.get("suggestions")),
    }
}

/// The tailored markup source, when the service produced one.
pub fn extract_document_source(raw: &Value) -> Option<DocumentSource> {
    let content = raw
        .get("latex_content")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())?;

    let filename = text(raw.get("latex_filename"))
        .unwrap_or_else(|| DEFAULT_SOURCE_FILENAME.to_string());

    Some(DocumentSource {
        content: content.to_string(),
        filename,
    })
}

/// A success-status payload that carries `{"error": ...}` instead of results.
pub fn embedded_error(raw: &Value) -> Option<AppError> {
    let message = text(raw.get("error"))?;
    Some(AppError::Service {
        status: 200,
        message,
        details: text(raw.get("details")),
    })
}

fn match_analysis(
    block: &Map<String, Value>,
    requested: Option<TargetMatch>,
) -> Option<MatchAnalysis> {
    let overall_score = score(block.get("overall_score"))?;

    Some(MatchAnalysis {
        overall_score,
        skill_match_percentage: percentage(block.get("skill_match_percentage")).unwrap_or(0),
        experience_match_percentage: percentage(block.get("experience_match_percentage"))
            .unwrap_or(0),
        resume_years: years(block.get("resume_years")),
        required_years: years(block.get("required_years")),
        missing_required_skills: skill_set(block.get("missing_required_skills")),
        missing_preferred_skills: skill_set(block.get("missing_preferred_skills")),
        recommendation_level: text(block.get("recommendation_level")).unwrap_or_default(),
        recommendation_text: text(block.get("recommendation_text")).unwrap_or_default(),
        color: text(block.get("color")).unwrap_or_default(),
        experience_level: text(block.get("experience_level")),
        industry: text(block.get("industry")),
        enhancement: enhancement(block, overall_score, requested),
    })
}

/// Reads the enhancement either from a nested `enhancement` object (our own
/// serialized form) or from flat fields on the analysis block (service form).
fn enhancement(
    block: &Map<String, Value>,
    overall_score: f64,
    requested: Option<TargetMatch>,
) -> Option<EnhancementDelta> {
    if matches!(requested, Some(target) if !target.is_enhancement()) {
        return None;
    }

    let fields = block
        .get("enhancement")
        .and_then(Value::as_object)
        .unwrap_or(block);

    let skills_added = skill_list(fields.get("skills_added"));
    if skills_added.is_empty() {
        return None;
    }

    let target_percentage = percentage(fields.get("target_percentage"))
        .or_else(|| requested.map(TargetMatch::percentage))
        .filter(|target| *target > 0)?;

    Some(EnhancementDelta {
        target_percentage,
        original_overall_score: score(fields.get("original_overall_score"))
            .unwrap_or(overall_score),
        enhanced_overall_score: score(fields.get("enhanced_overall_score"))
            .unwrap_or(overall_score),
        skills_added,
    })
}

fn skill_set(value: Option<&Value>) -> SkillSet {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect(),
        _ => SkillSet::new(),
    }
}

/// Like `skill_set`, but keeps repeats in service order.
fn skill_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn score(value: Option<&Value>) -> Option<f64> {
    number(value).map(|n| n.clamp(0.0, 1.0))
}

fn percentage(value: Option<&Value>) -> Option<u8> {
    number(value).map(|n| n.round().clamp(0.0, 100.0) as u8)
}

fn years(value: Option<&Value>) -> f64 {
    number(value).map(|n| n.max(0.0)).unwrap_or(0.0)
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

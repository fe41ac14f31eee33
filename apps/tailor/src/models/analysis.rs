//! Canonical analysis model produced by the normalizer.
//!
//! Field names match the tailoring service's payload so a serialized
//! `AnalysisResult` normalizes back to itself.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Ordered, duplicate-free list of skill labels.
///
/// Display order is the order skills were first seen; equality ignores order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSet(Vec<String>);

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `skill` unless an identical label is already present.
    pub fn insert(&mut self, skill: impl Into<String>) -> bool {
        let skill = skill.into();
        if self.contains(&skill) {
            return false;
        }
        self.0.push(skill);
        true
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.0.iter().any(|s| s == skill)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl PartialEq for SkillSet {
    fn eq(&self, other: &Self) -> bool {
        let left: HashSet<&str> = self.iter().collect();
        let right: HashSet<&str> = other.iter().collect();
        left == right
    }
}

impl Eq for SkillSet {}

impl<S: Into<String>> FromIterator<S> for SkillSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SkillSet::new();
        for skill in iter {
            set.insert(skill);
        }
        set
    }
}

/// Skills-gap analysis for one submission. Replaced wholesale, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub matched_skills: SkillSet,
    pub missing_skills: SkillSet,
    /// Absent when the service sent no recognizable analysis block.
    /// Not the same thing as a zero score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_analysis: Option<MatchAnalysis>,
    /// Free-form tailoring suggestions, when the service includes them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
}

impl AnalysisResult {
    pub fn enhancement(&self) -> Option<&EnhancementDelta> {
        self.match_analysis
            .as_ref()
            .and_then(|analysis| analysis.enhancement.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    /// 0.0 – 1.0
    pub overall_score: f64,
    pub skill_match_percentage: u8,
    pub experience_match_percentage: u8,
    pub resume_years: f64,
    pub required_years: f64,
    pub missing_required_skills: SkillSet,
    pub missing_preferred_skills: SkillSet,
    pub recommendation_level: String,
    pub recommendation_text: String,
    /// Display token chosen by the analysis service. Not derived locally.
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<EnhancementDelta>,
}

impl MatchAnalysis {
    /// Overall score as a whole percentage, for display.
    pub fn overall_percentage(&self) -> u8 {
        (self.overall_score * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// What the service changed to reach the requested target.
/// Only exists for a non-zero target with at least one added skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementDelta {
    pub target_percentage: u8,
    pub original_overall_score: f64,
    pub enhanced_overall_score: f64,
    /// Service order is display order.
    pub skills_added: Vec<String>,
}

impl EnhancementDelta {
    pub fn target_reached(&self) -> bool {
        (self.enhanced_overall_score * 100.0).round() >= f64::from(self.target_percentage)
    }
}

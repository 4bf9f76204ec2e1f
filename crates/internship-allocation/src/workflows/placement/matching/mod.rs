mod config;
mod policy;
mod rules;

pub use config::{AffirmativePolicy, MatchConfig, MatchWeights, DEFAULT_RURAL_BONUS};

use serde::{Deserialize, Serialize};

use super::domain::{Internship, InternshipId, StudentProfile};
use policy::{affirmative_entries, unmet_requirement};

/// Weighted categories. Each maps onto exactly one explanation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchCategory {
    RequiredSkills,
    PreferredSkills,
    Location,
    Sector,
    Modality,
}

impl MatchCategory {
    pub const fn kind(self) -> ExplanationKind {
        match self {
            MatchCategory::RequiredSkills => ExplanationKind::Skill,
            MatchCategory::PreferredSkills => ExplanationKind::Preference,
            MatchCategory::Location => ExplanationKind::Location,
            MatchCategory::Sector => ExplanationKind::Sector,
            MatchCategory::Modality => ExplanationKind::Modality,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationKind {
    Skill,
    Location,
    Sector,
    Modality,
    Preference,
    Affirmative,
}

/// Discrete contribution to a match score, allowing transparent audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub kind: ExplanationKind,
    pub reason: String,
    pub weight: f64,
}

/// Result of scoring one internship for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub internship_id: InternshipId,
    pub score: f64,
    pub explanations: Vec<Explanation>,
    /// Set when a required-skill shortfall removed the internship from consideration.
    pub excluded: bool,
}

impl MatchOutcome {
    pub fn explained_total(&self) -> f64 {
        self.explanations.iter().map(|entry| entry.weight).sum()
    }
}

/// Ranked entry returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub internship: Internship,
    pub score: f64,
    pub explanations: Vec<Explanation>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    #[error("match weights sum to zero; at least one category must carry weight")]
    ZeroWeightSum,
    #[error("match weights must sum to a finite value")]
    WeightSumOverflow,
    #[error("match weight `{name}` must be finite and non-negative (found {value})")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("affirmative bonus must be within [0, 1] (found {0})")]
    InvalidAffirmativeBonus(f64),
    #[error("invalid preferences: {field} {reason}")]
    Validation { field: &'static str, reason: String },
}

impl MatchError {
    pub fn is_config(&self) -> bool {
        !matches!(self, MatchError::Validation { .. })
    }
}

/// Stateless scorer bound to a validated configuration.
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    config: MatchConfig,
}

impl MatchingEngine {
    pub fn new(config: MatchConfig) -> Result<Self, MatchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn score(&self, student: &StudentProfile, internship: &Internship) -> MatchOutcome {
        let signals = rules::score_categories(student, internship);

        if let Some(explanation) = unmet_requirement(&self.config, &signals.required) {
            return MatchOutcome {
                internship_id: internship.id.clone(),
                score: 0.0,
                explanations: vec![explanation],
                excluded: true,
            };
        }

        let weights = &self.config.weights;
        let total_weight = weights.total();
        let mut explanations = Vec::with_capacity(signals.categories.len() + 2);
        let mut weighted = 0.0;

        for signal in signals.categories {
            let weight = weights.weight_for(signal.category);
            if weight <= 0.0 {
                continue;
            }
            let contribution = weight * signal.subscore / total_weight;
            weighted += contribution;
            explanations.push(Explanation {
                kind: signal.category.kind(),
                reason: signal.reason,
                weight: contribution,
            });
        }

        let base = weighted.clamp(0.0, 1.0);
        let bonuses = affirmative_entries(&self.config.affirmative, student, internship, base);
        let score = base + bonuses.iter().map(|entry| entry.weight).sum::<f64>();
        explanations.extend(bonuses);

        MatchOutcome {
            internship_id: internship.id.clone(),
            score: score.min(1.0),
            explanations,
            excluded: false,
        }
    }
}

/// Scores one internship against one student under `config`.
pub fn score(
    student: &StudentProfile,
    internship: &Internship,
    config: &MatchConfig,
) -> Result<MatchOutcome, MatchError> {
    Ok(MatchingEngine::new(*config)?.score(student, internship))
}

/// Rejects preference records that cannot be scored meaningfully.
pub fn validate_student(student: &StudentProfile) -> Result<(), MatchError> {
    if student.id.as_str().trim().is_empty() {
        return Err(MatchError::Validation {
            field: "student_id",
            reason: "must not be blank".to_string(),
        });
    }

    if student.skills.iter().any(|skill| skill.trim().is_empty()) {
        return Err(MatchError::Validation {
            field: "skills",
            reason: "must not contain blank entries".to_string(),
        });
    }

    let preferences = &student.preferences;
    if preferences
        .locations
        .iter()
        .any(|location| location.trim().is_empty())
    {
        return Err(MatchError::Validation {
            field: "locations",
            reason: "must not contain blank entries".to_string(),
        });
    }

    if preferences
        .sectors
        .iter()
        .any(|sector| sector.trim().is_empty())
    {
        return Err(MatchError::Validation {
            field: "sectors",
            reason: "must not contain blank entries".to_string(),
        });
    }

    if let Some(range) = preferences.stipend {
        if !range.is_ordered() {
            return Err(MatchError::Validation {
                field: "stipend",
                reason: format!("minimum {} exceeds maximum {}", range.min, range.max),
            });
        }
    }

    if let Some(range) = preferences.duration_weeks {
        if !range.is_ordered() {
            return Err(MatchError::Validation {
                field: "duration_weeks",
                reason: format!("minimum {} exceeds maximum {}", range.min, range.max),
            });
        }
    }

    if let Some(window) = preferences.availability {
        if window.start > window.end {
            return Err(MatchError::Validation {
                field: "availability",
                reason: format!("starts {} after it ends {}", window.start, window.end),
            });
        }
    }

    Ok(())
}

use serde::{Deserialize, Serialize};

use super::{MatchCategory, MatchError};

pub const DEFAULT_RURAL_BONUS: f64 = 0.05;

/// Relative importance of each scored category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub req: f64,
    pub pref: f64,
    pub loc: f64,
    pub sector: f64,
    pub modality: f64,
}

impl MatchWeights {
    pub fn total(&self) -> f64 {
        self.req + self.pref + self.loc + self.sector + self.modality
    }

    pub fn weight_for(&self, category: MatchCategory) -> f64 {
        match category {
            MatchCategory::RequiredSkills => self.req,
            MatchCategory::PreferredSkills => self.pref,
            MatchCategory::Location => self.loc,
            MatchCategory::Sector => self.sector,
            MatchCategory::Modality => self.modality,
        }
    }

    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("req", self.req),
            ("pref", self.pref),
            ("loc", self.loc),
            ("sector", self.sector),
            ("modality", self.modality),
        ]
    }
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            req: 0.4,
            pref: 0.2,
            loc: 0.15,
            sector: 0.15,
            modality: 0.1,
        }
    }
}

/// Fixed, separately reported bonuses for policy markers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffirmativePolicy {
    pub rural_bonus: f64,
}

impl Default for AffirmativePolicy {
    fn default() -> Self {
        Self {
            rural_bonus: DEFAULT_RURAL_BONUS,
        }
    }
}

/// Scoring policy supplied per call. Build through [`MatchConfig::validate`] before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub weights: MatchWeights,
    /// When set, any required-skill shortfall hard-excludes the internship.
    /// When unset the shortfall is scored proportionally.
    #[serde(default)]
    pub require_all_required_skills: bool,
    #[serde(default = "enabled")]
    pub deadline_filter: bool,
    #[serde(default = "enabled")]
    pub capacity_filter: bool,
    #[serde(default)]
    pub affirmative: AffirmativePolicy,
}

fn enabled() -> bool {
    true
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            weights: MatchWeights::default(),
            require_all_required_skills: false,
            deadline_filter: true,
            capacity_filter: true,
            affirmative: AffirmativePolicy::default(),
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), MatchError> {
        for (name, value) in self.weights.named() {
            if !value.is_finite() || value < 0.0 {
                return Err(MatchError::InvalidWeight { name, value });
            }
        }

        let total = self.weights.total();
        if !total.is_finite() {
            return Err(MatchError::WeightSumOverflow);
        }
        if total <= 0.0 {
            return Err(MatchError::ZeroWeightSum);
        }

        let bonus = self.affirmative.rural_bonus;
        if !bonus.is_finite() || !(0.0..=1.0).contains(&bonus) {
            return Err(MatchError::InvalidAffirmativeBonus(bonus));
        }

        Ok(())
    }
}

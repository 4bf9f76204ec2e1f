use std::collections::BTreeSet;

use super::super::domain::{fold, folded_set, Internship, Modality, StudentProfile};
use super::MatchCategory;

/// Share of an internship's skill list the student already holds.
pub(crate) struct SkillCoverage {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

impl SkillCoverage {
    fn measure(student_skills: &BTreeSet<String>, listed: &BTreeSet<String>) -> Self {
        let (matched, missing) = listed
            .iter()
            .partition::<Vec<&String>, _>(|skill| student_skills.contains(&fold(skill)));

        Self {
            matched: matched.into_iter().cloned().collect(),
            missing: missing.into_iter().cloned().collect(),
        }
    }

    fn listed(&self) -> usize {
        self.matched.len() + self.missing.len()
    }

    /// Required coverage: an empty requirement list is fully covered.
    pub fn required_ratio(&self) -> f64 {
        if self.listed() == 0 {
            1.0
        } else {
            self.matched.len() as f64 / self.listed() as f64
        }
    }

    /// Preferred coverage: divides by `max(1, listed)` so an empty list scores zero.
    pub fn preferred_ratio(&self) -> f64 {
        self.matched.len() as f64 / self.listed().max(1) as f64
    }
}

/// One category's sub-score in [0, 1] and the audit text shown to the student.
pub(crate) struct CategorySignal {
    pub category: MatchCategory,
    pub subscore: f64,
    pub reason: String,
}

pub(crate) struct ProfileSignals {
    pub required: SkillCoverage,
    pub categories: Vec<CategorySignal>,
}

pub(crate) fn score_categories(student: &StudentProfile, internship: &Internship) -> ProfileSignals {
    let skills = folded_set(&student.skills);
    let required = SkillCoverage::measure(&skills, &internship.required_skills);
    let preferred = SkillCoverage::measure(&skills, &internship.preferred_skills);

    let mut categories = Vec::with_capacity(5);

    let required_reason = if internship.required_skills.is_empty() {
        "no required skills listed".to_string()
    } else if required.missing.is_empty() {
        format!("has all required skills: {}", required.matched.join(", "))
    } else {
        format!(
            "has {}/{} required skills (missing {})",
            required.matched.len(),
            required.listed(),
            required.missing.join(", ")
        )
    };
    categories.push(CategorySignal {
        category: MatchCategory::RequiredSkills,
        subscore: required.required_ratio(),
        reason: required_reason,
    });

    let preferred_reason = if internship.preferred_skills.is_empty() {
        "no preferred skills listed".to_string()
    } else if preferred.matched.is_empty() {
        "none of the preferred skills".to_string()
    } else {
        format!(
            "has {}/{} preferred skills: {}",
            preferred.matched.len(),
            preferred.listed(),
            preferred.matched.join(", ")
        )
    };
    categories.push(CategorySignal {
        category: MatchCategory::PreferredSkills,
        subscore: preferred.preferred_ratio(),
        reason: preferred_reason,
    });

    categories.push(location_signal(student, internship));
    categories.push(sector_signal(student, internship));
    categories.push(modality_signal(student, internship));

    ProfileSignals {
        required,
        categories,
    }
}

fn location_signal(student: &StudentProfile, internship: &Internship) -> CategorySignal {
    let offered = folded_set(&internship.locations);
    let hit = student
        .preferences
        .locations
        .iter()
        .find(|location| offered.contains(&fold(location)));

    match hit {
        Some(location) => CategorySignal {
            category: MatchCategory::Location,
            subscore: 1.0,
            reason: format!("located in preferred location {location}"),
        },
        None => CategorySignal {
            category: MatchCategory::Location,
            subscore: 0.0,
            reason: "not in a preferred location".to_string(),
        },
    }
}

fn sector_signal(student: &StudentProfile, internship: &Internship) -> CategorySignal {
    let sectors = &student.preferences.sectors;
    let sector = fold(&internship.sector);

    if sectors.is_empty() {
        CategorySignal {
            category: MatchCategory::Sector,
            subscore: 1.0,
            reason: "no sector restriction".to_string(),
        }
    } else if sectors.iter().any(|preferred| fold(preferred) == sector) {
        CategorySignal {
            category: MatchCategory::Sector,
            subscore: 1.0,
            reason: format!("{} is a preferred sector", internship.sector),
        }
    } else {
        CategorySignal {
            category: MatchCategory::Sector,
            subscore: 0.0,
            reason: format!("{} is outside preferred sectors", internship.sector),
        }
    }
}

fn modality_signal(student: &StudentProfile, internship: &Internship) -> CategorySignal {
    let wanted = student.preferences.modality;
    let (subscore, reason) = if wanted == Modality::Any {
        (1.0, "open to any work arrangement".to_string())
    } else if wanted == internship.modality {
        (1.0, format!("{} matches preference", internship.modality.label()))
    } else {
        (
            0.0,
            format!(
                "{} does not match preferred {}",
                internship.modality.label(),
                wanted.label()
            ),
        )
    };

    CategorySignal {
        category: MatchCategory::Modality,
        subscore,
        reason,
    }
}

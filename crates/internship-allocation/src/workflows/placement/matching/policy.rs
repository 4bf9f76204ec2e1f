use super::super::domain::{Internship, Residence, StudentProfile};
use super::config::{AffirmativePolicy, MatchConfig};
use super::rules::SkillCoverage;
use super::{Explanation, ExplanationKind};

/// Hard exclusion applies only when the config demands full required-skill coverage.
pub(crate) fn unmet_requirement(
    config: &MatchConfig,
    required: &SkillCoverage,
) -> Option<Explanation> {
    if !config.require_all_required_skills || required.missing.is_empty() {
        return None;
    }

    Some(Explanation {
        kind: ExplanationKind::Skill,
        reason: format!(
            "excluded: missing required skills {}",
            required.missing.join(", ")
        ),
        weight: 0.0,
    })
}

/// Entries for matched policy markers, added on top of the clamped weighted score.
///
/// Each matched marker contributes the fixed bonus, capped jointly so the final
/// score never leaves [0, 1]. A marker whose bonus is fully absorbed by the cap is
/// still listed with a zero contribution.
pub(crate) fn affirmative_entries(
    policy: &AffirmativePolicy,
    student: &StudentProfile,
    internship: &Internship,
    base_score: f64,
) -> Vec<Explanation> {
    let mut entries = Vec::new();
    let mut headroom = (1.0 - base_score).max(0.0);

    let markers = [
        (
            internship.affirmative.rural_quota
                && student.preferences.residence == Residence::Rural,
            "rural quota seat for a rural applicant",
        ),
        (
            internship.affirmative.aspirational_district
                && student.preferences.aspirational_district,
            "aspirational district reservation",
        ),
    ];

    for (matched, label) in markers {
        if !matched {
            continue;
        }
        let contribution = policy.rural_bonus.min(headroom);
        headroom -= contribution;
        entries.push(Explanation {
            kind: ExplanationKind::Affirmative,
            reason: format!("{label} (+{contribution:.3})"),
            weight: contribution,
        });
    }

    entries
}

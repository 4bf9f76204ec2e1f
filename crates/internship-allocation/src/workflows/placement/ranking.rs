use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{fold, folded_set, Internship, Modality, StudentProfile};
use super::matching::{
    validate_student, MatchConfig, MatchError, MatchOutcome, MatchingEngine, Recommendation,
};

/// Caller-supplied field filters, applied before any scoring work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationFilters {
    #[serde(default)]
    pub locations: BTreeSet<String>,
    #[serde(default)]
    pub sectors: BTreeSet<String>,
    #[serde(default)]
    pub modality: Option<Modality>,
    #[serde(default)]
    pub min_stipend: Option<u32>,
}

impl RecommendationFilters {
    pub fn admits(&self, internship: &Internship) -> bool {
        if !self.locations.is_empty() {
            let wanted = folded_set(&self.locations);
            if !internship
                .locations
                .iter()
                .any(|location| wanted.contains(&fold(location)))
            {
                return false;
            }
        }

        if !self.sectors.is_empty() {
            let sector = fold(&internship.sector);
            if !self.sectors.iter().any(|wanted| fold(wanted) == sector) {
                return false;
            }
        }

        if let Some(modality) = self.modality {
            if modality != Modality::Any && modality != internship.modality {
                return false;
            }
        }

        if let Some(min_stipend) = self.min_stipend {
            if internship.stipend.max < min_stipend {
                return false;
            }
        }

        true
    }
}

/// Filters, scores, and orders the catalog for one student.
///
/// Pure over its inputs: the same catalog snapshot, student, config, filters and
/// `now` always produce the same ordered list. Malformed catalog entries are
/// skipped with a warning instead of failing the batch.
pub fn recommend(
    catalog: &[Internship],
    student: &StudentProfile,
    config: &MatchConfig,
    filters: &RecommendationFilters,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Recommendation>, MatchError> {
    let engine = MatchingEngine::new(*config)?;
    validate_student(student)?;

    let candidates: Vec<&Internship> = catalog
        .iter()
        .filter(|internship| admit(internship, config, filters, now))
        .collect();

    let mut scored: Vec<(MatchOutcome, &Internship)> = candidates
        .par_iter()
        .map(|internship| (engine.score(student, internship), *internship))
        .filter(|(outcome, _)| !outcome.excluded)
        .collect();

    debug!(
        student_id = %student.id,
        catalog = catalog.len(),
        candidates = candidates.len(),
        scored = scored.len(),
        "ranked recommendations"
    );

    scored.sort_by(|left, right| rank_order(left, right));
    scored.truncate(limit);

    Ok(scored
        .into_iter()
        .map(|(outcome, internship)| Recommendation {
            internship: internship.clone(),
            score: outcome.score,
            explanations: outcome.explanations,
        })
        .collect())
}

fn admit(
    internship: &Internship,
    config: &MatchConfig,
    filters: &RecommendationFilters,
    now: DateTime<Utc>,
) -> bool {
    if let Some(defect) = internship.defect() {
        warn!(internship_id = %internship.id, %defect, "skipping unscorable internship");
        return false;
    }
    if config.deadline_filter && internship.deadline_passed(now) {
        return false;
    }
    if config.capacity_filter && !internship.has_open_seats() {
        return false;
    }
    filters.admits(internship)
}

/// Score descending, then earlier deadline, then internship id.
fn rank_order(left: &(MatchOutcome, &Internship), right: &(MatchOutcome, &Internship)) -> Ordering {
    right
        .0
        .score
        .total_cmp(&left.0.score)
        .then_with(|| {
            match (
                left.1.application_deadline,
                right.1.application_deadline,
            ) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        })
        .then_with(|| left.1.id.cmp(&right.1.id))
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{ApplicationId, InternshipId, StudentId};

/// Status tracked throughout the application workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    Interview,
    Offer,
    Accepted,
    Declined,
    Rejected,
    Withdrawn,
    Expired,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Declined => "declined",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::Expired => "expired",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted
                | ApplicationStatus::Declined
                | ApplicationStatus::Rejected
                | ApplicationStatus::Withdrawn
                | ApplicationStatus::Expired
        )
    }

    /// States from which an offer may be issued.
    pub const fn is_pre_offer(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Shortlisted | ApplicationStatus::Interview
        )
    }

    pub const fn successors(self) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match self {
            Applied => &[Withdrawn, Shortlisted, Rejected],
            Shortlisted => &[Interview, Offer, Rejected, Withdrawn],
            Interview => &[Offer, Rejected, Withdrawn],
            Offer => &[Accepted, Declined, Expired, Withdrawn],
            Accepted | Declined | Rejected | Withdrawn | Expired => &[],
        }
    }

    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        self.successors().contains(&next)
    }
}

/// One immutable entry in an application's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: ApplicationStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move application from {} to {}", from.label(), to.label())]
pub struct TransitionRejected {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

/// Application with its append-only timeline. Status only changes through
/// [`Application::transition`], which validates against the status graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    id: ApplicationId,
    student_id: StudentId,
    internship_id: InternshipId,
    status: ApplicationStatus,
    timeline: Vec<TimelineEntry>,
    #[serde(default)]
    form_data: Value,
    /// Score under the service's default config when the student applied.
    #[serde(default)]
    match_score: f64,
}

impl Application {
    pub fn new(
        id: ApplicationId,
        student_id: StudentId,
        internship_id: InternshipId,
        form_data: Value,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id,
            internship_id,
            status: ApplicationStatus::Applied,
            timeline: vec![TimelineEntry {
                status: ApplicationStatus::Applied,
                at,
            }],
            form_data,
            match_score: 0.0,
        }
    }

    pub fn with_match_score(mut self, score: f64) -> Self {
        self.match_score = score;
        self
    }

    pub fn id(&self) -> &ApplicationId {
        &self.id
    }

    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    pub fn internship_id(&self) -> &InternshipId {
        &self.internship_id
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    pub fn form_data(&self) -> &Value {
        &self.form_data
    }

    pub fn match_score(&self) -> f64 {
        self.match_score
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Validates `next` and appends it to the timeline. On rejection nothing changes.
    ///
    /// Timestamps are kept strictly increasing: a clock reading that is not after
    /// the previous entry is stamped one microsecond past it.
    pub fn transition(
        &mut self,
        next: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<&TimelineEntry, TransitionRejected> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionRejected {
                from: self.status,
                to: next,
            });
        }

        let at = match self.timeline.last() {
            Some(previous) if at <= previous.at => previous.at + Duration::microseconds(1),
            _ => at,
        };

        self.status = next;
        self.timeline.push(TimelineEntry { status: next, at });
        Ok(&self.timeline[self.timeline.len() - 1])
    }
}

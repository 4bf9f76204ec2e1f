use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use super::clock::{Clock, SystemClock};
use super::domain::{
    ApplicationId, Internship, InternshipId, Offer, OfferId, OfferStatus, StudentProfile,
};
use super::lifecycle::{Application, ApplicationStatus, TransitionRejected};
use super::matching::{
    validate_student, MatchConfig, MatchError, MatchingEngine, Recommendation,
};
use super::offers::OfferPolicy;
use super::ranking::{recommend, RecommendationFilters};
use super::repository::{
    ApplicationRepository, ApplicationStatusView, InternshipCatalog, OfferRepository,
    RepositoryError,
};

/// Per-application command serialisation. Locks are created on first command against
/// a stored application and kept.
#[derive(Debug, Default)]
pub(crate) struct CommandLocks {
    table: Mutex<HashMap<ApplicationId, Arc<Mutex<()>>>>,
}

impl CommandLocks {
    pub(crate) fn slot(&self, id: &ApplicationId) -> Result<Arc<Mutex<()>>, PlacementError> {
        let mut table = self.table.lock().map_err(|_| poisoned())?;
        Ok(table.entry(id.clone()).or_default().clone())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table.lock().map(|table| table.len()).unwrap_or_default()
    }
}

pub(crate) fn poisoned() -> PlacementError {
    PlacementError::Repository(RepositoryError::Unavailable(
        "command lock poisoned".to_string(),
    ))
}

/// Facade composing the matching engine, catalog, and application/offer stores.
///
/// Every state change goes through a named command; callers never mutate records
/// directly.
pub struct PlacementService<A, O, C> {
    pub(crate) applications: Arc<A>,
    pub(crate) offers: Arc<O>,
    pub(crate) catalog: Arc<C>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) engine: MatchingEngine,
    pub(crate) offer_policy: OfferPolicy,
    pub(crate) locks: CommandLocks,
    pub(crate) offer_sequence: AtomicU64,
    application_sequence: AtomicU64,
    intake: Mutex<()>,
}

impl<A, O, C> PlacementService<A, O, C>
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    pub fn new(
        applications: Arc<A>,
        offers: Arc<O>,
        catalog: Arc<C>,
        match_config: MatchConfig,
        offer_policy: OfferPolicy,
    ) -> Result<Self, MatchError> {
        Ok(Self {
            applications,
            offers,
            catalog,
            clock: Arc::new(SystemClock),
            engine: MatchingEngine::new(match_config)?,
            offer_policy,
            locks: CommandLocks::default(),
            offer_sequence: AtomicU64::new(1),
            application_sequence: AtomicU64::new(1),
            intake: Mutex::new(()),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn match_config(&self) -> &MatchConfig {
        self.engine.config()
    }

    pub fn offer_policy(&self) -> &OfferPolicy {
        &self.offer_policy
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn next_application_id(&self) -> ApplicationId {
        let id = self.application_sequence.fetch_add(1, Ordering::Relaxed);
        ApplicationId(format!("app-{id:06}"))
    }

    /// Command lock for a stored application. Unknown ids fail before a lock is created.
    pub(crate) fn command_slot(
        &self,
        id: &ApplicationId,
    ) -> Result<Arc<Mutex<()>>, PlacementError> {
        self.fetch_application(id)?;
        self.locks.slot(id)
    }

    /// Ranks the current catalog snapshot for `student`.
    ///
    /// `config` overrides the service default for this call only.
    pub fn recommendations(
        &self,
        student: &StudentProfile,
        filters: &RecommendationFilters,
        config: Option<&MatchConfig>,
        limit: usize,
    ) -> Result<Vec<Recommendation>, PlacementError> {
        let config = config.unwrap_or_else(|| self.engine.config());
        let catalog = self.catalog.snapshot()?;
        Ok(recommend(
            &catalog, student, config, filters, limit, self.now(),
        )?)
    }

    /// Opens an application in `applied`, recording the match score at submission time.
    pub fn apply(
        &self,
        student: &StudentProfile,
        internship_id: &InternshipId,
        form_data: Value,
    ) -> Result<Application, PlacementError> {
        validate_student(student)?;
        let internship = self.internship(internship_id)?;
        let now = self.now();

        if internship.deadline_passed(now) {
            return Err(PlacementError::InternshipClosed {
                internship_id: internship.id.clone(),
                deadline: internship.application_deadline.unwrap_or(now),
            });
        }

        let _intake = self.intake.lock().map_err(|_| poisoned())?;

        let duplicate = self
            .applications
            .for_student(&student.id)?
            .into_iter()
            .any(|existing| existing.internship_id() == internship_id && !existing.is_terminal());
        if duplicate {
            return Err(PlacementError::DuplicateApplication {
                student_id: student.id.to_string(),
                internship_id: internship_id.clone(),
            });
        }

        let outcome = self.engine.score(student, &internship);
        let application = Application::new(
            self.next_application_id(),
            student.id.clone(),
            internship_id.clone(),
            form_data,
            now,
        )
        .with_match_score(outcome.score);

        let stored = self.applications.insert(application)?;
        info!(
            application_id = %stored.id(),
            student_id = %student.id,
            internship_id = %internship_id,
            score = outcome.score,
            "application submitted"
        );
        Ok(stored)
    }

    /// Moves a non-terminal application to `withdrawn`. A live offer is declined with it.
    ///
    /// A lapsed offer is expired first, which leaves the application terminal.
    pub fn withdraw(&self, id: &ApplicationId) -> Result<Application, PlacementError> {
        let slot = self.command_slot(id)?;
        let _guard = slot.lock().map_err(|_| poisoned())?;
        let now = self.now();

        let (original, current_offer) = self.settle_expiry(id, now)?;
        let mut application = original.clone();
        application.transition(ApplicationStatus::Withdrawn, now)?;

        self.applications.update(application.clone())?;
        if let Some(mut offer) = current_offer.filter(Offer::is_live) {
            offer.status = OfferStatus::Declined;
            if let Err(err) = self.offers.update(offer) {
                self.applications.update(original)?;
                return Err(err.into());
            }
        }

        info!(application_id = %id, "application withdrawn");
        Ok(application)
    }

    /// Applies a manual status change validated against the status graph.
    ///
    /// Offer-owned edges are routed through the offer workflow so capacity and the
    /// offer record stay consistent; `expired` can only be reached by the clock.
    pub fn update_status(
        &self,
        id: &ApplicationId,
        next: ApplicationStatus,
    ) -> Result<Application, PlacementError> {
        let current = self.application(id)?;
        let from = current.status();

        if !from.can_transition_to(next) || next == ApplicationStatus::Expired {
            return Err(TransitionRejected { from, to: next }.into());
        }

        match next {
            ApplicationStatus::Offer => {
                self.issue_offer(id)?;
                self.fetch_application(id)
            }
            ApplicationStatus::Accepted => {
                self.accept_offer(id)?;
                self.fetch_application(id)
            }
            ApplicationStatus::Declined => {
                self.decline_offer(id)?;
                self.fetch_application(id)
            }
            ApplicationStatus::Withdrawn => self.withdraw(id),
            _ => {
                let slot = self.command_slot(id)?;
                let _guard = slot.lock().map_err(|_| poisoned())?;

                let mut application = self.fetch_application(id)?;
                let from = application.status();
                application.transition(next, self.now())?;
                self.applications.update(application.clone())?;

                info!(
                    application_id = %id,
                    from = from.label(),
                    to = next.label(),
                    "application status updated"
                );
                Ok(application)
            }
        }
    }

    /// Current application state, with any lapsed offer expired first.
    pub fn application(&self, id: &ApplicationId) -> Result<Application, PlacementError> {
        let slot = self.command_slot(id)?;
        let _guard = slot.lock().map_err(|_| poisoned())?;
        let (application, _) = self.settle_expiry(id, self.now())?;
        Ok(application)
    }

    /// Public status payload for API responses.
    pub fn status_view(&self, id: &ApplicationId) -> Result<ApplicationStatusView, PlacementError> {
        let slot = self.command_slot(id)?;
        let _guard = slot.lock().map_err(|_| poisoned())?;
        let (application, offer) = self.settle_expiry(id, self.now())?;
        Ok(application.status_view(offer.as_ref()))
    }

    pub(crate) fn fetch_application(&self, id: &ApplicationId) -> Result<Application, PlacementError> {
        self.applications
            .fetch(id)?
            .ok_or_else(|| PlacementError::ApplicationNotFound(id.clone()))
    }

    pub(crate) fn internship(&self, id: &InternshipId) -> Result<Internship, PlacementError> {
        self.catalog
            .fetch(id)?
            .ok_or_else(|| PlacementError::InternshipNotFound(id.clone()))
    }
}

/// Error raised by placement commands. Surfaced to callers as-is, never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlacementError {
    #[error(transparent)]
    InvalidTransition(#[from] TransitionRejected),
    #[error("offer {offer_id} expired at {expires_at}")]
    OfferExpired {
        offer_id: OfferId,
        expires_at: DateTime<Utc>,
    },
    #[error("internship {internship_id} has no remaining capacity ({capacity} seats filled)")]
    CapacityExceeded {
        internship_id: InternshipId,
        capacity: u32,
    },
    #[error("application {0} already has a pending offer")]
    OfferPending(ApplicationId),
    #[error("application {0} has no live offer")]
    NoLiveOffer(ApplicationId),
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("internship {0} not found")]
    InternshipNotFound(InternshipId),
    #[error("internship {internship_id} closed for applications at {deadline}")]
    InternshipClosed {
        internship_id: InternshipId,
        deadline: DateTime<Utc>,
    },
    #[error("student {student_id} already has an open application for internship {internship_id}")]
    DuplicateApplication {
        student_id: String,
        internship_id: InternshipId,
    },
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PlacementError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PlacementError::ApplicationNotFound(_)
                | PlacementError::InternshipNotFound(_)
                | PlacementError::Repository(RepositoryError::NotFound)
        )
    }
}

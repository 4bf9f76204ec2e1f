use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    ApplicationId, Internship, InternshipId, Offer, OfferId, StudentId,
};
use super::lifecycle::Application;

/// Storage abstraction for applications so the service can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn update(&self, application: Application) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn for_student(&self, student_id: &StudentId) -> Result<Vec<Application>, RepositoryError>;
}

/// Storage for offers, keyed by id and indexed by application.
pub trait OfferRepository: Send + Sync {
    fn insert(&self, offer: Offer) -> Result<Offer, RepositoryError>;
    fn update(&self, offer: Offer) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError>;
    /// Most recently issued offer for the application, live or not.
    fn latest_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Offer>, RepositoryError>;
    fn live(&self) -> Result<Vec<Offer>, RepositoryError>;
}

/// Read-mostly internship catalog. `filled` changes only through [`InternshipCatalog::try_fill`]
/// and its compensating [`InternshipCatalog::release`].
pub trait InternshipCatalog: Send + Sync {
    /// Ordered snapshot used for ranking.
    fn snapshot(&self) -> Result<Vec<Internship>, RepositoryError>;
    fn fetch(&self, id: &InternshipId) -> Result<Option<Internship>, RepositoryError>;
    /// Atomic check-and-increment of `filled` for one internship.
    fn try_fill(&self, id: &InternshipId) -> Result<SeatClaim, RepositoryError>;
    /// Returns a seat claimed by a command that could not complete.
    fn release(&self, id: &InternshipId) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatClaim {
    Claimed { filled: u32, capacity: u32 },
    Full { capacity: u32 },
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Public projection of an application and its current offer.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub student_id: StudentId,
    pub internship_id: InternshipId,
    pub status: &'static str,
    pub timeline: Vec<TimelineView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<OfferView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineView {
    pub status: &'static str,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferView {
    pub offer_id: OfferId,
    pub status: &'static str,
    pub offered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub match_score: f64,
}

impl From<&Offer> for OfferView {
    fn from(offer: &Offer) -> Self {
        Self {
            offer_id: offer.id.clone(),
            status: offer.status.label(),
            offered_at: offer.offered_at,
            expires_at: offer.expires_at,
            match_score: offer.match_score,
        }
    }
}

impl Application {
    pub fn status_view(&self, offer: Option<&Offer>) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id().clone(),
            student_id: self.student_id().clone(),
            internship_id: self.internship_id().clone(),
            status: self.status().label(),
            timeline: self
                .timeline()
                .iter()
                .map(|entry| TimelineView {
                    status: entry.status.label(),
                    at: entry.at,
                })
                .collect(),
            offer: offer.map(OfferView::from),
        }
    }
}

//! Internship matching, ranking, and the application/offer lifecycle.
//!
//! Scoring and ranking are pure functions over a catalog snapshot. Lifecycle and
//! offer commands run through [`PlacementService`], which owns the only writes to
//! application, offer, and seat state.

pub mod clock;
pub mod domain;
pub mod lifecycle;
pub mod matching;
pub mod offers;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::{
    AffirmativeFlags, ApplicationId, AvailabilityWindow, Internship, InternshipId, Modality,
    Offer, OfferId, OfferStatus, Preferences, Residence, StudentId, StudentProfile, ValueRange,
};
pub use lifecycle::{Application, ApplicationStatus, TimelineEntry, TransitionRejected};
pub use matching::{
    AffirmativePolicy, Explanation, ExplanationKind, MatchConfig, MatchError, MatchOutcome,
    MatchWeights, MatchingEngine, Recommendation,
};
pub use matching::{score, validate_student};
pub use offers::{OfferPolicy, DEFAULT_OFFER_WINDOW_HOURS};
pub use ranking::{recommend, RecommendationFilters};
pub use repository::{
    ApplicationRepository, ApplicationStatusView, InternshipCatalog, OfferRepository,
    OfferView, RepositoryError, SeatClaim, TimelineView,
};
pub use router::placement_router;
pub use service::{PlacementError, PlacementService};
pub use store::{MemoryApplicationStore, MemoryCatalog, MemoryOfferStore};

use std::sync::atomic::Ordering;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::domain::{ApplicationId, Offer, OfferId, OfferStatus};
use super::lifecycle::{Application, ApplicationStatus, TransitionRejected};
use super::repository::{
    ApplicationRepository, InternshipCatalog, OfferRepository, SeatClaim,
};
use super::service::{poisoned, PlacementError, PlacementService};

pub const DEFAULT_OFFER_WINDOW_HOURS: i64 = 72;

/// How long an issued offer stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferPolicy {
    pub window: Duration,
}

impl OfferPolicy {
    pub fn from_hours(hours: u32) -> Self {
        Self {
            window: Duration::hours(i64::from(hours.max(1))),
        }
    }
}

impl Default for OfferPolicy {
    fn default() -> Self {
        Self {
            window: Duration::hours(DEFAULT_OFFER_WINDOW_HOURS),
        }
    }
}

impl<A, O, C> PlacementService<A, O, C>
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    fn next_offer_id(&self) -> OfferId {
        let id = self.offer_sequence.fetch_add(1, Ordering::Relaxed);
        OfferId(format!("offer-{id:06}"))
    }

    /// Issues a time-bounded offer to a shortlisted or interviewed application.
    ///
    /// Capacity is not reserved here; seats are claimed only on acceptance.
    pub fn issue_offer(&self, id: &ApplicationId) -> Result<Offer, PlacementError> {
        let slot = self.command_slot(id)?;
        let _guard = slot.lock().map_err(|_| poisoned())?;
        let now = self.now();

        let (original, current_offer) = self.settle_expiry(id, now)?;
        if current_offer.as_ref().is_some_and(Offer::is_live) {
            return Err(PlacementError::OfferPending(id.clone()));
        }
        if !original.status().is_pre_offer() {
            return Err(TransitionRejected {
                from: original.status(),
                to: ApplicationStatus::Offer,
            }
            .into());
        }

        let mut application = original.clone();
        application.transition(ApplicationStatus::Offer, now)?;

        let offer = Offer {
            id: self.next_offer_id(),
            application_id: id.clone(),
            internship_id: application.internship_id().clone(),
            status: OfferStatus::Offered,
            offered_at: now,
            expires_at: now + self.offer_policy.window,
            match_score: application.match_score(),
        };

        self.applications.update(application)?;
        let offer = match self.offers.insert(offer) {
            Ok(offer) => offer,
            Err(err) => {
                self.applications.update(original)?;
                return Err(err.into());
            }
        };

        info!(
            application_id = %id,
            offer_id = %offer.id,
            expires_at = %offer.expires_at,
            "offer issued"
        );
        Ok(offer)
    }

    /// Accepts a live offer, claiming one seat on the internship.
    ///
    /// The seat claim is an atomic check-and-increment on the catalog; when it fails
    /// nothing is written. A lapsed offer is refused here and left for the next read or
    /// sweep to expire.
    pub fn accept_offer(&self, id: &ApplicationId) -> Result<Offer, PlacementError> {
        let slot = self.command_slot(id)?;
        let _guard = slot.lock().map_err(|_| poisoned())?;
        let now = self.now();

        let (original_application, original_offer) = self.live_offer(id, now)?;

        let mut application = original_application;
        application.transition(ApplicationStatus::Accepted, now)?;
        let mut offer = original_offer;
        offer.status = OfferStatus::Accepted;

        let internship_id = offer.internship_id.clone();
        match self.catalog.try_fill(&internship_id)? {
            SeatClaim::Full { capacity } => {
                warn!(
                    application_id = %id,
                    internship_id = %internship_id,
                    capacity,
                    "offer acceptance refused: internship full"
                );
                return Err(PlacementError::CapacityExceeded {
                    internship_id,
                    capacity,
                });
            }
            SeatClaim::Claimed { filled, capacity } => {
                info!(
                    application_id = %id,
                    internship_id = %internship_id,
                    filled,
                    capacity,
                    "seat claimed"
                );
            }
        }

        if let Err(err) = self.commit(application, offer.clone()) {
            self.catalog.release(&internship_id)?;
            return Err(err);
        }

        info!(application_id = %id, offer_id = %offer.id, "offer accepted");
        Ok(offer)
    }

    /// Declines a live offer. Capacity is untouched.
    pub fn decline_offer(&self, id: &ApplicationId) -> Result<Offer, PlacementError> {
        let slot = self.command_slot(id)?;
        let _guard = slot.lock().map_err(|_| poisoned())?;
        let now = self.now();

        let (original_application, original_offer) = self.live_offer(id, now)?;

        let mut application = original_application;
        application.transition(ApplicationStatus::Declined, now)?;
        let mut offer = original_offer;
        offer.status = OfferStatus::Declined;

        self.commit(application, offer.clone())?;

        info!(application_id = %id, offer_id = %offer.id, "offer declined");
        Ok(offer)
    }

    /// Latest offer for the application, expiring it first if its window has closed.
    pub fn offer_for_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Offer>, PlacementError> {
        let slot = self.command_slot(id)?;
        let _guard = slot.lock().map_err(|_| poisoned())?;
        let (_, offer) = self.settle_expiry(id, self.now())?;
        Ok(offer)
    }

    /// Expires every live offer whose window has closed. Returns the ids it expired.
    pub fn expire_offers(&self) -> Result<Vec<OfferId>, PlacementError> {
        let now = self.now();
        let mut expired = Vec::new();

        for offer in self.offers.live()? {
            if !offer.has_lapsed(now) {
                continue;
            }
            let slot = self.command_slot(&offer.application_id)?;
            let _guard = slot.lock().map_err(|_| poisoned())?;
            let (_, settled) = self.settle_expiry(&offer.application_id, now)?;
            if settled.is_some_and(|current| {
                current.id == offer.id && current.status == OfferStatus::Expired
            }) {
                expired.push(offer.id);
            }
        }

        Ok(expired)
    }

    /// Loads an application and its latest offer, applying lazy expiry.
    /// Callers must hold the application's command lock.
    pub(crate) fn settle_expiry(
        &self,
        id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<(Application, Option<Offer>), PlacementError> {
        let application = self.fetch_application(id)?;
        let Some(mut offer) = self.offers.latest_for_application(id)? else {
            return Ok((application, None));
        };

        if !offer.expire_if_lapsed(now) {
            return Ok((application, Some(offer)));
        }

        let mut updated = application;
        if updated.status() == ApplicationStatus::Offer {
            updated.transition(ApplicationStatus::Expired, now)?;
            self.commit(updated.clone(), offer.clone())?;
        } else {
            self.offers.update(offer.clone())?;
        }

        info!(application_id = %id, offer_id = %offer.id, "offer expired");
        Ok((updated, Some(offer)))
    }

    /// Application in `offer` with a live, unexpired offer, or the reason it is not.
    fn live_offer(
        &self,
        id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<(Application, Offer), PlacementError> {
        let application = self.fetch_application(id)?;
        let offer = self
            .offers
            .latest_for_application(id)?
            .filter(Offer::is_live)
            .ok_or_else(|| PlacementError::NoLiveOffer(id.clone()))?;

        if offer.has_lapsed(now) {
            return Err(PlacementError::OfferExpired {
                offer_id: offer.id,
                expires_at: offer.expires_at,
            });
        }

        Ok((application, offer))
    }

    /// Writes the offer then the application; restores the offer if the second write fails.
    fn commit(&self, application: Application, offer: Offer) -> Result<(), PlacementError> {
        let previous_offer = self.offers.fetch(&offer.id)?;
        self.offers.update(offer)?;
        if let Err(err) = self.applications.update(application) {
            if let Some(previous) = previous_offer {
                self.offers.update(previous)?;
            }
            return Err(err.into());
        }
        Ok(())
    }
}

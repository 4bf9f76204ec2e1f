use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use super::domain::{ApplicationId, Internship, InternshipId, Offer, OfferId, StudentId};
use super::lifecycle::Application;
use super::repository::{
    ApplicationRepository, InternshipCatalog, OfferRepository, RepositoryError, SeatClaim,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

/// Applications keyed by id; each record embeds its own timeline.
#[derive(Debug, Default, Clone)]
pub struct MemoryApplicationStore {
    records: Arc<Mutex<BTreeMap<ApplicationId, Application>>>,
}

impl ApplicationRepository for MemoryApplicationStore {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(application.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id().clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        match guard.get_mut(application.id()) {
            Some(slot) => {
                *slot = application;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(lock(&self.records)?.get(id).cloned())
    }

    fn for_student(&self, student_id: &StudentId) -> Result<Vec<Application>, RepositoryError> {
        Ok(lock(&self.records)?
            .values()
            .filter(|application| application.student_id() == student_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct OfferLedger {
    offers: BTreeMap<OfferId, Offer>,
    latest: HashMap<ApplicationId, OfferId>,
}

/// Offers keyed by id with a latest-offer index per application.
#[derive(Debug, Default, Clone)]
pub struct MemoryOfferStore {
    ledger: Arc<Mutex<OfferLedger>>,
}

impl OfferRepository for MemoryOfferStore {
    fn insert(&self, offer: Offer) -> Result<Offer, RepositoryError> {
        let mut guard = lock(&self.ledger)?;
        if guard.offers.contains_key(&offer.id) {
            return Err(RepositoryError::Conflict);
        }
        guard
            .latest
            .insert(offer.application_id.clone(), offer.id.clone());
        guard.offers.insert(offer.id.clone(), offer.clone());
        Ok(offer)
    }

    fn update(&self, offer: Offer) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.ledger)?;
        match guard.offers.get_mut(&offer.id) {
            Some(slot) => {
                *slot = offer;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        Ok(lock(&self.ledger)?.offers.get(id).cloned())
    }

    fn latest_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Offer>, RepositoryError> {
        let guard = lock(&self.ledger)?;
        Ok(guard
            .latest
            .get(application_id)
            .and_then(|offer_id| guard.offers.get(offer_id))
            .cloned())
    }

    fn live(&self) -> Result<Vec<Offer>, RepositoryError> {
        Ok(lock(&self.ledger)?
            .offers
            .values()
            .filter(|offer| offer.is_live())
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct CatalogIndex {
    order: Vec<InternshipId>,
    entries: HashMap<InternshipId, Arc<Mutex<Internship>>>,
}

/// Catalog with one lock per internship so seat claims on different internships
/// never contend and claims on the same internship serialize.
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalog {
    index: Arc<RwLock<CatalogIndex>>,
}

impl MemoryCatalog {
    pub fn new(internships: Vec<Internship>) -> Self {
        let mut index = CatalogIndex::default();
        for internship in internships {
            index.place(internship);
        }
        Self {
            index: Arc::new(RwLock::new(index)),
        }
    }

    /// Adds or replaces a catalog entry, keeping its original position.
    pub fn upsert(&self, internship: Internship) -> Result<(), RepositoryError> {
        let mut guard = self
            .index
            .write()
            .map_err(|_| RepositoryError::Unavailable("catalog lock poisoned".to_string()))?;
        guard.place(internship);
        Ok(())
    }

    fn entry(&self, id: &InternshipId) -> Result<Option<Arc<Mutex<Internship>>>, RepositoryError> {
        let guard = self
            .index
            .read()
            .map_err(|_| RepositoryError::Unavailable("catalog lock poisoned".to_string()))?;
        Ok(guard.entries.get(id).cloned())
    }
}

impl CatalogIndex {
    fn place(&mut self, internship: Internship) {
        match self.entries.get(&internship.id) {
            Some(existing) => {
                let mut slot = existing
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *slot = internship;
            }
            None => {
                self.order.push(internship.id.clone());
                self.entries
                    .insert(internship.id.clone(), Arc::new(Mutex::new(internship)));
            }
        }
    }
}

impl InternshipCatalog for MemoryCatalog {
    fn snapshot(&self) -> Result<Vec<Internship>, RepositoryError> {
        let guard = self
            .index
            .read()
            .map_err(|_| RepositoryError::Unavailable("catalog lock poisoned".to_string()))?;
        let snapshot = guard
            .order
            .iter()
            .filter_map(|id| guard.entries.get(id))
            .map(|entry| lock(entry).map(|internship| internship.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(snapshot)
    }

    fn fetch(&self, id: &InternshipId) -> Result<Option<Internship>, RepositoryError> {
        let Some(entry) = self.entry(id)? else {
            return Ok(None);
        };
        let internship = lock(&entry)?.clone();
        Ok(Some(internship))
    }

    fn try_fill(&self, id: &InternshipId) -> Result<SeatClaim, RepositoryError> {
        let entry = self.entry(id)?.ok_or(RepositoryError::NotFound)?;
        let mut internship = lock(&entry)?;
        if internship.filled >= internship.capacity {
            return Ok(SeatClaim::Full {
                capacity: internship.capacity,
            });
        }
        internship.filled += 1;
        Ok(SeatClaim::Claimed {
            filled: internship.filled,
            capacity: internship.capacity,
        })
    }

    fn release(&self, id: &InternshipId) -> Result<(), RepositoryError> {
        let entry = self.entry(id)?.ok_or(RepositoryError::NotFound)?;
        let mut internship = lock(&entry)?;
        internship.filled = internship.filled.saturating_sub(1);
        Ok(())
    }
}

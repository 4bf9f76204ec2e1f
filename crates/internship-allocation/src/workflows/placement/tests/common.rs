use std::collections::BTreeSet;
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::placement::{
    AffirmativeFlags, Application, ApplicationId, ApplicationRepository, ApplicationStatus,
    Internship, InternshipId, ManualClock, MatchConfig, MemoryApplicationStore, MemoryCatalog,
    MemoryOfferStore, Modality, OfferPolicy, PlacementService, Preferences, RepositoryError,
    StudentId, StudentProfile, ValueRange,
};

pub(super) type MemoryService =
    PlacementService<MemoryApplicationStore, MemoryOfferStore, MemoryCatalog>;

pub(super) fn opened_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn skills(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(super) fn student(id: &str, held: &[&str]) -> StudentProfile {
    StudentProfile {
        id: StudentId::from(id),
        skills: skills(held),
        preferences: Preferences {
            locations: skills(&["Bengaluru"]),
            ..Preferences::default()
        },
    }
}

pub(super) fn internship(id: &str, required: &[&str], preferred: &[&str]) -> Internship {
    Internship {
        id: InternshipId::from(id),
        title: "Frontend Intern".to_string(),
        organization: "Digital Seva".to_string(),
        sector: "Technology".to_string(),
        locations: skills(&["Bengaluru", "Pune"]),
        modality: Modality::Hybrid,
        required_skills: skills(required),
        preferred_skills: skills(preferred),
        stipend: ValueRange::new(10_000, 15_000),
        duration_weeks: 12,
        capacity: 2,
        filled: 0,
        application_deadline: Some(opened_at() + Duration::days(30)),
        affirmative: AffirmativeFlags::default(),
    }
}

pub(super) fn with_capacity(mut internship: Internship, capacity: u32) -> Internship {
    internship.capacity = capacity;
    internship
}

pub(super) struct Harness {
    pub(super) service: Arc<MemoryService>,
    pub(super) clock: Arc<ManualClock>,
    pub(super) applications: Arc<MemoryApplicationStore>,
    pub(super) offers: Arc<MemoryOfferStore>,
    pub(super) catalog: Arc<MemoryCatalog>,
}

impl Harness {
    pub(super) fn stored(&self, id: &ApplicationId) -> Application {
        self.applications
            .fetch(id)
            .expect("store readable")
            .expect("application stored")
    }

    pub(super) fn filled(&self, id: &str) -> u32 {
        use crate::workflows::placement::InternshipCatalog;

        self.catalog
            .fetch(&InternshipId::from(id))
            .expect("catalog readable")
            .expect("internship listed")
            .filled
    }
}

pub(super) fn harness(catalog: Vec<Internship>) -> Harness {
    let clock = Arc::new(ManualClock::new(opened_at()));
    let applications = Arc::new(MemoryApplicationStore::default());
    let offers = Arc::new(MemoryOfferStore::default());
    let catalog = Arc::new(MemoryCatalog::new(catalog));
    let service = PlacementService::new(
        applications.clone(),
        offers.clone(),
        catalog.clone(),
        MatchConfig::default(),
        OfferPolicy::default(),
    )
    .expect("default config is valid")
    .with_clock(clock.clone());

    Harness {
        service: Arc::new(service),
        clock,
        applications,
        offers,
        catalog,
    }
}

/// Applies and walks the application to `interview`.
pub(super) fn interviewed(harness: &Harness, student_id: &str, internship_id: &str) -> ApplicationId {
    let application = harness
        .service
        .apply(
            &student(student_id, &["React"]),
            &InternshipId::from(internship_id),
            Value::Null,
        )
        .expect("apply succeeds");
    let id = application.id().clone();

    for next in [ApplicationStatus::Shortlisted, ApplicationStatus::Interview] {
        harness.clock.advance(Duration::minutes(5));
        harness
            .service
            .update_status(&id, next)
            .expect("pre-offer transition");
    }
    id
}

pub(super) fn offered(harness: &Harness, student_id: &str, internship_id: &str) -> ApplicationId {
    let id = interviewed(harness, student_id, internship_id);
    harness.clock.advance(Duration::minutes(5));
    harness.service.issue_offer(&id).expect("offer issued");
    id
}

pub(super) struct UnavailableApplications;

impl ApplicationRepository for UnavailableApplications {
    fn insert(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _application: Application) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_student(&self, _student_id: &StudentId) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

//! End-to-end scenarios for matching, applications, and offer resolution.
//!
//! Everything here goes through the public service facade and HTTP router only.

mod common {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use internship_allocation::workflows::placement::{
        AffirmativeFlags, Internship, InternshipId, ManualClock, MatchConfig,
        MemoryApplicationStore, MemoryCatalog, MemoryOfferStore, Modality, OfferPolicy,
        PlacementService, Preferences, Residence, StudentId, StudentProfile, ValueRange,
    };

    pub(super) type Service =
        PlacementService<MemoryApplicationStore, MemoryOfferStore, MemoryCatalog>;

    pub(super) fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    pub(super) fn catalog() -> Vec<Internship> {
        vec![
            Internship {
                id: InternshipId::from("int-data-pune"),
                title: "Data Analyst Intern".to_string(),
                organization: "Jal Shakti Analytics".to_string(),
                sector: "Public Policy".to_string(),
                locations: set(&["Pune"]),
                modality: Modality::Onsite,
                required_skills: set(&["SQL", "Excel"]),
                preferred_skills: set(&["Python"]),
                stipend: ValueRange::new(12_000, 15_000),
                duration_weeks: 10,
                capacity: 1,
                filled: 0,
                application_deadline: Some(start() + Duration::days(14)),
                affirmative: AffirmativeFlags {
                    rural_quota: true,
                    aspirational_district: false,
                },
            },
            Internship {
                id: InternshipId::from("int-web-remote"),
                title: "Web Developer Intern".to_string(),
                organization: "Gram Connect".to_string(),
                sector: "Technology".to_string(),
                locations: set(&["Remote"]),
                modality: Modality::Remote,
                required_skills: set(&["JavaScript"]),
                preferred_skills: set(&["React"]),
                stipend: ValueRange::new(8_000, 10_000),
                duration_weeks: 8,
                capacity: 3,
                filled: 0,
                application_deadline: Some(start() + Duration::days(7)),
                affirmative: AffirmativeFlags::default(),
            },
        ]
    }

    pub(super) fn analyst(id: &str) -> StudentProfile {
        StudentProfile {
            id: StudentId::from(id),
            skills: set(&["sql", "excel"]),
            preferences: Preferences {
                locations: set(&["Pune"]),
                sectors: set(&["Public Policy"]),
                modality: Modality::Onsite,
                residence: Residence::Rural,
                ..Preferences::default()
            },
        }
    }

    pub(super) fn service() -> (Arc<Service>, Arc<ManualClock>, Arc<MemoryCatalog>) {
        let clock = Arc::new(ManualClock::new(start()));
        let catalog = Arc::new(MemoryCatalog::new(catalog()));
        let service = PlacementService::new(
            Arc::new(MemoryApplicationStore::default()),
            Arc::new(MemoryOfferStore::default()),
            catalog.clone(),
            MatchConfig::default(),
            OfferPolicy::from_hours(48),
        )
        .expect("valid config")
        .with_clock(clock.clone());
        (Arc::new(service), clock, catalog)
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use internship_allocation::workflows::placement::{
    placement_router, ApplicationStatus, ExplanationKind, InternshipCatalog, InternshipId,
    OfferStatus, PlacementError, RecommendationFilters,
};

use common::*;

#[test]
fn best_match_is_applied_to_and_accepted() {
    let (service, clock, catalog) = service();
    let student = analyst("stu-rural");

    let ranked = service
        .recommendations(&student, &RecommendationFilters::default(), None, 5)
        .expect("ranks");
    assert_eq!(ranked[0].internship.id.as_str(), "int-data-pune");
    assert!(ranked[0]
        .explanations
        .iter()
        .any(|entry| entry.kind == ExplanationKind::Affirmative && entry.weight > 0.0));
    let total: f64 = ranked[0].explanations.iter().map(|entry| entry.weight).sum();
    assert!((total - ranked[0].score).abs() < 1e-6);

    let application = service
        .apply(&student, &ranked[0].internship.id, json!({ "note": "available from July" }))
        .expect("apply");
    let id = application.id().clone();

    clock.advance(Duration::hours(2));
    service
        .update_status(&id, ApplicationStatus::Shortlisted)
        .expect("shortlist");
    clock.advance(Duration::days(1));
    service
        .update_status(&id, ApplicationStatus::Interview)
        .expect("interview");
    clock.advance(Duration::days(1));
    let offer = service.issue_offer(&id).expect("offer");
    assert_eq!(offer.expires_at - offer.offered_at, Duration::hours(48));

    clock.advance(Duration::hours(47));
    service.accept_offer(&id).expect("accepted inside window");

    let view = service.status_view(&id).expect("view");
    assert_eq!(view.status, "accepted");
    assert_eq!(view.timeline.len(), 5);
    assert_eq!(view.offer.map(|offer| offer.status), Some("accepted"));

    let seat = catalog
        .fetch(&InternshipId::from("int-data-pune"))
        .expect("catalog")
        .expect("listed");
    assert_eq!(seat.filled, seat.capacity);

    let after = service
        .recommendations(&analyst("stu-other"), &RecommendationFilters::default(), None, 5)
        .expect("ranks");
    assert!(after
        .iter()
        .all(|entry| entry.internship.id.as_str() != "int-data-pune"));
}

#[test]
fn lapsed_offer_expires_and_frees_nothing() {
    let (service, clock, catalog) = service();
    let id = service
        .apply(&analyst("stu-late"), &InternshipId::from("int-data-pune"), Value::Null)
        .expect("apply")
        .id()
        .clone();
    service
        .update_status(&id, ApplicationStatus::Shortlisted)
        .expect("shortlist");
    service.issue_offer(&id).expect("offer");

    clock.advance(Duration::hours(49));
    assert!(matches!(
        service.accept_offer(&id),
        Err(PlacementError::OfferExpired { .. })
    ));

    let swept = service.expire_offers().expect("sweep");
    assert_eq!(swept.len(), 1);
    let offer = service
        .offer_for_application(&id)
        .expect("readable")
        .expect("offer");
    assert_eq!(offer.status, OfferStatus::Expired);
    assert_eq!(
        service.application(&id).expect("read").status(),
        ApplicationStatus::Expired
    );
    assert_eq!(
        catalog
            .fetch(&InternshipId::from("int-data-pune"))
            .expect("catalog")
            .expect("listed")
            .filled,
        0
    );
}

#[tokio::test]
async fn router_maps_capacity_races_to_conflict() {
    let (service, _clock, _catalog) = service();
    let mut ids = Vec::new();
    for student in ["stu-1", "stu-2"] {
        let id = service
            .apply(&analyst(student), &InternshipId::from("int-data-pune"), Value::Null)
            .expect("apply")
            .id()
            .clone();
        service
            .update_status(&id, ApplicationStatus::Shortlisted)
            .expect("shortlist");
        service.issue_offer(&id).expect("offer");
        ids.push(id);
    }

    let mut statuses = Vec::new();
    for id in &ids {
        let response = placement_router(service.clone())
            .oneshot(
                Request::post(format!("/api/v1/applications/{id}/offer/accept"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        statuses.push(response.status());
    }

    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
}

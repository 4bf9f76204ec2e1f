use chrono::{DateTime, Duration, NaiveDate, Utc};
use internship_allocation::config::PlacementConfig;
use internship_allocation::error::AppError;
use internship_allocation::workflows::placement::{
    AffirmativeFlags, Clock, Internship, InternshipId, MemoryApplicationStore, MemoryCatalog,
    MemoryOfferStore, Modality, PlacementError, PlacementService, StudentProfile, ValueRange,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type MemoryPlacementService =
    PlacementService<MemoryApplicationStore, MemoryOfferStore, MemoryCatalog>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_service(
    catalog: MemoryCatalog,
    config: &PlacementConfig,
    clock: Arc<dyn Clock>,
) -> Result<MemoryPlacementService, AppError> {
    let service = PlacementService::new(
        Arc::new(MemoryApplicationStore::default()),
        Arc::new(MemoryOfferStore::default()),
        Arc::new(catalog),
        config.matching,
        config.offers,
    )
    .map_err(PlacementError::from)?;
    Ok(service.with_clock(clock))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn load_catalog(path: &Path) -> Result<Vec<Internship>, AppError> {
    read_json(path)
}

pub(crate) fn load_student(path: &Path) -> Result<StudentProfile, AppError> {
    read_json(path)
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Sample catalog with deadlines relative to `now`.
pub(crate) fn demo_catalog(now: DateTime<Utc>) -> Vec<Internship> {
    vec![
        Internship {
            id: InternshipId::from("int-agri-data"),
            title: "Agricultural Data Intern".to_string(),
            organization: "Krishi Insights".to_string(),
            sector: "Agriculture".to_string(),
            locations: set(&["Nagpur", "Pune"]),
            modality: Modality::Hybrid,
            required_skills: set(&["Python", "Excel"]),
            preferred_skills: set(&["GIS", "SQL"]),
            stipend: ValueRange::new(10_000, 14_000),
            duration_weeks: 12,
            capacity: 1,
            filled: 0,
            application_deadline: Some(now + Duration::days(10)),
            affirmative: AffirmativeFlags {
                rural_quota: true,
                aspirational_district: true,
            },
        },
        Internship {
            id: InternshipId::from("int-fintech-api"),
            title: "Backend Engineering Intern".to_string(),
            organization: "Bharat Payments Lab".to_string(),
            sector: "Finance".to_string(),
            locations: set(&["Bengaluru"]),
            modality: Modality::Onsite,
            required_skills: set(&["Python", "SQL"]),
            preferred_skills: set(&["Docker"]),
            stipend: ValueRange::new(18_000, 25_000),
            duration_weeks: 16,
            capacity: 4,
            filled: 1,
            application_deadline: Some(now + Duration::days(5)),
            affirmative: AffirmativeFlags::default(),
        },
        Internship {
            id: InternshipId::from("int-health-web"),
            title: "Health Portal Frontend Intern".to_string(),
            organization: "Arogya Digital".to_string(),
            sector: "Healthcare".to_string(),
            locations: set(&["Remote"]),
            modality: Modality::Remote,
            required_skills: set(&["JavaScript", "React"]),
            preferred_skills: set(&["Accessibility"]),
            stipend: ValueRange::new(8_000, 12_000),
            duration_weeks: 10,
            capacity: 1,
            filled: 0,
            application_deadline: Some(now + Duration::days(21)),
            affirmative: AffirmativeFlags::default(),
        },
        Internship {
            id: InternshipId::from("int-policy-research"),
            title: "Policy Research Intern".to_string(),
            organization: "Niti Fellows".to_string(),
            sector: "Public Policy".to_string(),
            locations: set(&["Delhi"]),
            modality: Modality::Onsite,
            required_skills: set(&["Excel"]),
            preferred_skills: set(&["Python", "Writing"]),
            stipend: ValueRange::new(9_000, 11_000),
            duration_weeks: 8,
            capacity: 2,
            filled: 2,
            application_deadline: Some(now + Duration::days(3)),
            affirmative: AffirmativeFlags::default(),
        },
        Internship {
            id: InternshipId::from("int-closed-survey"),
            title: "Field Survey Intern".to_string(),
            organization: "Gramin Surveys".to_string(),
            sector: "Agriculture".to_string(),
            locations: set(&["Nagpur"]),
            modality: Modality::Onsite,
            required_skills: set(&["Excel"]),
            preferred_skills: BTreeSet::new(),
            stipend: ValueRange::new(6_000, 8_000),
            duration_weeks: 6,
            capacity: 5,
            filled: 0,
            application_deadline: Some(now - Duration::days(1)),
            affirmative: AffirmativeFlags {
                rural_quota: true,
                aspirational_district: false,
            },
        },
    ]
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

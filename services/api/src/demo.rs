use crate::infra::{build_service, demo_catalog, load_catalog, load_student};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use clap::Args;
use internship_allocation::config::AppConfig;
use internship_allocation::error::AppError;
use internship_allocation::workflows::placement::{
    recommend, ApplicationId, ApplicationStatus, InternshipId, ManualClock, MemoryCatalog,
    OfferPolicy, PlacementError, Preferences, Recommendation, RecommendationFilters, Residence,
    StudentId, StudentProfile,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    /// JSON file holding one student profile
    #[arg(long)]
    pub(crate) student: PathBuf,
    /// JSON file holding the internship catalog (defaults to CATALOG_PATH, then the sample catalog)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Number of recommendations to print
    #[arg(long, default_value_t = 5)]
    pub(crate) limit: usize,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Scenario start date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Offer window in hours for the scenario (defaults to OFFER_WINDOW_HOURS).
    #[arg(long)]
    pub(crate) offer_window_hours: Option<u32>,
}

pub(crate) fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let RecommendArgs {
        student,
        catalog,
        limit,
    } = args;

    let config = AppConfig::load()?;
    let student = load_student(&student)?;
    let now = Utc::now();
    let catalog = match catalog.or(config.placement.catalog_path) {
        Some(path) => load_catalog(&path)?,
        None => demo_catalog(now),
    };

    let ranked = recommend(
        &catalog,
        &student,
        &config.placement.matching,
        &RecommendationFilters::default(),
        limit,
        now,
    )
    .map_err(PlacementError::from)?;

    println!(
        "Top {} of {} internships for {}",
        ranked.len(),
        catalog.len(),
        student.id
    );
    render_recommendations(&ranked);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        start,
        offer_window_hours,
    } = args;

    let start = scenario_start(start);
    let mut placement = AppConfig::load()?.placement;
    if let Some(hours) = offer_window_hours {
        placement.offers = OfferPolicy::from_hours(hours);
    }
    let clock = Arc::new(ManualClock::new(start));
    let service = build_service(
        MemoryCatalog::new(demo_catalog(start)),
        &placement,
        clock.clone(),
    )?;

    println!("Internship allocation demo (clock starts {start})");
    let weights = service.match_config().weights;
    println!(
        "Weights req {:.2} | pref {:.2} | loc {:.2} | sector {:.2} | modality {:.2}; offers stay open {}h",
        weights.req,
        weights.pref,
        weights.loc,
        weights.sector,
        weights.modality,
        service.offer_policy().window.num_hours()
    );

    let asha = demo_student("stu-asha", &["python", "excel", "gis"], &["Pune"], true);
    let ranked = service.recommendations(&asha, &RecommendationFilters::default(), None, 3)?;
    println!("\nRecommendations for {}", asha.id);
    render_recommendations(&ranked);

    let Some(best) = ranked.first() else {
        println!("  No eligible internships in the sample catalog");
        return Ok(());
    };
    let target = best.internship.id.clone();

    println!("\nApplication lifecycle");
    let application = service.apply(
        &asha,
        &target,
        json!({ "statement": "Grew up on a cotton farm; want to build yield dashboards." }),
    )?;
    let id = application.id().clone();
    println!("- {} applied to {} (score {:.3})", id, target, application.match_score());

    for next in [ApplicationStatus::Shortlisted, ApplicationStatus::Interview] {
        clock.advance(Duration::days(1));
        service.update_status(&id, next)?;
        println!("- {} -> {}", id, next.label());
    }

    clock.advance(Duration::hours(4));
    let offer = service.issue_offer(&id)?;
    println!(
        "- offer {} issued, expires {}",
        offer.id, offer.expires_at
    );

    clock.advance(Duration::hours(6));
    service.accept_offer(&id)?;
    println!("- offer {} accepted", offer.id);
    print_status(&service, &id)?;

    println!("\nCapacity race on a single-seat internship");
    let contested = InternshipId::from("int-health-web");
    let mut contenders = Vec::new();
    for (student_id, skills) in [
        ("stu-bhavna", &["javascript", "react"][..]),
        ("stu-chetan", &["javascript", "react", "accessibility"][..]),
    ] {
        let student = demo_student(student_id, skills, &["Remote"], false);
        match service.apply(&student, &contested, json!(null)) {
            Ok(application) => {
                let id = application.id().clone();
                service.update_status(&id, ApplicationStatus::Shortlisted)?;
                service.issue_offer(&id)?;
                contenders.push(id);
            }
            Err(err) => println!("- {} could not apply: {}", student_id, err),
        }
    }
    for id in &contenders {
        match service.accept_offer(id) {
            Ok(_) => println!("- {} accepted a seat", id),
            Err(err) => println!("- {} lost the race: {}", id, err),
        }
    }

    println!("\nOffer expiry");
    let dev = demo_student("stu-dev", &["python", "sql"], &["Bengaluru"], false);
    let late = service.apply(&dev, &InternshipId::from("int-fintech-api"), json!(null))?;
    let late_id = late.id().clone();
    service.update_status(&late_id, ApplicationStatus::Shortlisted)?;
    let late_offer = service.issue_offer(&late_id)?;
    clock.set(late_offer.expires_at + Duration::minutes(1));
    if let Err(err) = service.accept_offer(&late_id) {
        println!("- late acceptance refused: {}", err);
    }
    let swept = service.expire_offers()?;
    println!("- expiry sweep closed {} offer(s)", swept.len());
    print_status(&service, &late_id)?;

    Ok(())
}

fn scenario_start(date: Option<NaiveDate>) -> DateTime<Utc> {
    date.and_then(|day| day.and_hms_opt(9, 0, 0))
        .and_then(|naive| Utc.from_local_datetime(&naive).single())
        .unwrap_or_else(Utc::now)
}

fn demo_student(id: &str, skills: &[&str], locations: &[&str], rural: bool) -> StudentProfile {
    let set = |values: &[&str]| -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    };

    StudentProfile {
        id: StudentId::from(id),
        skills: set(skills),
        preferences: Preferences {
            locations: set(locations),
            residence: if rural {
                Residence::Rural
            } else {
                Residence::Urban
            },
            aspirational_district: rural,
            willing_to_relocate: true,
            ..Preferences::default()
        },
    }
}

fn render_recommendations(ranked: &[Recommendation]) {
    if ranked.is_empty() {
        println!("  (no eligible internships)");
        return;
    }

    for (rank, entry) in ranked.iter().enumerate() {
        println!(
            "{}. {} at {} [{}] score {:.3} ({} seat(s) left)",
            rank + 1,
            entry.internship.title,
            entry.internship.organization,
            entry.internship.id,
            entry.score,
            entry.internship.remaining_seats()
        );
        for explanation in &entry.explanations {
            println!(
                "     {:<11} {:+.3}  {}",
                format!("{:?}", explanation.kind).to_lowercase(),
                explanation.weight,
                explanation.reason
            );
        }
    }
}

fn print_status(
    service: &crate::infra::MemoryPlacementService,
    id: &ApplicationId,
) -> Result<(), AppError> {
    let view = service.status_view(id)?;
    match serde_json::to_string_pretty(&view) {
        Ok(json) => println!("  Public status payload:\n{}", json),
        Err(err) => println!("  Public status payload unavailable: {}", err),
    }
    Ok(())
}

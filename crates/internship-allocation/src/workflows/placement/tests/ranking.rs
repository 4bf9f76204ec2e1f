use chrono::Duration;

use super::common::*;

use crate::workflows::placement::{
    recommend, Internship, MatchConfig, MatchError, Modality, RecommendationFilters, ValueRange,
};

fn ids(recommendations: &[crate::workflows::placement::Recommendation]) -> Vec<&str> {
    recommendations
        .iter()
        .map(|entry| entry.internship.id.as_str())
        .collect()
}

fn catalog() -> Vec<Internship> {
    let sectors = ["Technology", "Healthcare", "Finance", "Agriculture"];
    let modalities = [Modality::Remote, Modality::Onsite, Modality::Hybrid];
    let skill_pool = ["React", "SQL", "Python", "Excel", "Go"];

    (0..24)
        .map(|n| {
            let mut entry = internship(
                &format!("int-{n:02}"),
                &skill_pool[n % 3..n % 3 + 2],
                &skill_pool[(n + 1) % 4..(n + 1) % 4 + 1],
            );
            entry.sector = sectors[n % sectors.len()].to_string();
            entry.modality = modalities[n % modalities.len()];
            entry.application_deadline = Some(opened_at() + Duration::days(3 + (n % 5) as i64));
            entry
        })
        .collect()
}

#[test]
fn identical_inputs_produce_identical_rankings() {
    let student = student("stu-1", &["React", "SQL", "Excel"]);
    let config = MatchConfig::default();
    let filters = RecommendationFilters::default();
    let catalog = catalog();

    let first = recommend(&catalog, &student, &config, &filters, 10, opened_at()).expect("ranks");
    for _ in 0..5 {
        let again =
            recommend(&catalog, &student, &config, &filters, 10, opened_at()).expect("ranks");
        assert_eq!(first, again);
    }
    assert_eq!(first.len(), 10);
    assert!(first
        .windows(2)
        .all(|pair| pair[0].score >= pair[1].score));
}

#[test]
fn ties_break_on_earlier_deadline_then_id() {
    let base = internship("int-b", &["React"], &[]);
    let later = Internship {
        id: "int-a".into(),
        application_deadline: Some(opened_at() + Duration::days(20)),
        ..base.clone()
    };
    let sooner = Internship {
        id: "int-z".into(),
        application_deadline: Some(opened_at() + Duration::days(2)),
        ..base.clone()
    };
    let open_ended_y = Internship {
        id: "int-y".into(),
        application_deadline: None,
        ..base.clone()
    };
    let open_ended_x = Internship {
        id: "int-x".into(),
        application_deadline: None,
        ..base
    };

    let ranked = recommend(
        &[open_ended_y, later, open_ended_x, sooner],
        &student("stu-1", &["React"]),
        &MatchConfig::default(),
        &RecommendationFilters::default(),
        10,
        opened_at(),
    )
    .expect("ranks");

    assert_eq!(ids(&ranked), vec!["int-z", "int-a", "int-x", "int-y"]);
}

#[test]
fn closed_and_full_internships_are_filtered_when_enabled() {
    let open = internship("int-open", &["React"], &[]);
    let closed = Internship {
        id: "int-closed".into(),
        application_deadline: Some(opened_at() - Duration::hours(1)),
        ..open.clone()
    };
    let full = Internship {
        id: "int-full".into(),
        filled: 2,
        ..open.clone()
    };
    let catalog = vec![open, closed, full];
    let student = student("stu-1", &["React"]);
    let filters = RecommendationFilters::default();

    let filtered = recommend(
        &catalog,
        &student,
        &MatchConfig::default(),
        &filters,
        10,
        opened_at(),
    )
    .expect("ranks");
    assert_eq!(ids(&filtered), vec!["int-open"]);

    let permissive = MatchConfig {
        deadline_filter: false,
        capacity_filter: false,
        ..MatchConfig::default()
    };
    let everything =
        recommend(&catalog, &student, &permissive, &filters, 10, opened_at()).expect("ranks");
    assert_eq!(everything.len(), 3);
}

#[test]
fn caller_filters_apply_before_scoring() {
    let student = student("stu-1", &["React"]);
    let filters = RecommendationFilters {
        sectors: skills(&["healthcare"]),
        modality: Some(Modality::Onsite),
        ..RecommendationFilters::default()
    };

    let ranked = recommend(
        &catalog(),
        &student,
        &MatchConfig::default(),
        &filters,
        50,
        opened_at(),
    )
    .expect("ranks");

    assert!(!ranked.is_empty());
    assert!(ranked.iter().all(|entry| {
        entry.internship.sector == "Healthcare" && entry.internship.modality == Modality::Onsite
    }));
}

#[test]
fn stipend_and_location_filters_narrow_the_catalog() {
    let mut remote = internship("int-remote", &[], &[]);
    remote.locations = skills(&["Remote"]);
    let mut low_pay = internship("int-low", &[], &[]);
    low_pay.stipend = ValueRange::new(2_000, 4_000);
    let catalog = vec![remote, low_pay, internship("int-pune", &[], &[])];

    let filters = RecommendationFilters {
        locations: skills(&["PUNE"]),
        min_stipend: Some(8_000),
        ..RecommendationFilters::default()
    };
    let ranked = recommend(
        &catalog,
        &student("stu-1", &[]),
        &MatchConfig::default(),
        &filters,
        10,
        opened_at(),
    )
    .expect("ranks");

    assert_eq!(ids(&ranked), vec!["int-pune"]);
}

#[test]
fn malformed_entries_are_skipped_without_failing_the_batch() {
    let healthy = internship("int-ok", &["React"], &[]);
    let blank_skill = internship("int-blank", &["React", "  "], &[]);
    let inverted = Internship {
        id: "int-inverted".into(),
        stipend: ValueRange::new(9_000, 1_000),
        ..healthy.clone()
    };
    let overfilled = Internship {
        id: "int-over".into(),
        filled: 5,
        capacity: 1,
        ..healthy.clone()
    };

    let ranked = recommend(
        &[blank_skill, healthy, inverted, overfilled],
        &student("stu-1", &["React"]),
        &MatchConfig {
            capacity_filter: false,
            ..MatchConfig::default()
        },
        &RecommendationFilters::default(),
        10,
        opened_at(),
    )
    .expect("batch survives");

    assert_eq!(ids(&ranked), vec!["int-ok"]);
}

#[test]
fn hard_excluded_internships_are_not_recommended() {
    let config = MatchConfig {
        require_all_required_skills: true,
        ..MatchConfig::default()
    };
    let catalog = vec![
        internship("int-covered", &["React"], &[]),
        internship("int-short", &["React", "Kotlin"], &[]),
    ];

    let ranked = recommend(
        &catalog,
        &student("stu-1", &["React"]),
        &config,
        &RecommendationFilters::default(),
        10,
        opened_at(),
    )
    .expect("ranks");

    assert_eq!(ids(&ranked), vec!["int-covered"]);
}

#[test]
fn limit_truncates_after_sorting() {
    let student = student("stu-1", &["React", "SQL"]);
    let config = MatchConfig::default();
    let filters = RecommendationFilters::default();
    let catalog = catalog();

    let full = recommend(&catalog, &student, &config, &filters, 100, opened_at()).expect("ranks");
    let top = recommend(&catalog, &student, &config, &filters, 3, opened_at()).expect("ranks");

    assert_eq!(top.as_slice(), &full[..3]);
    assert!(recommend(&catalog, &student, &config, &filters, 0, opened_at())
        .expect("ranks")
        .is_empty());
}

#[test]
fn invalid_preferences_are_rejected_before_scoring() {
    let mut student = student("stu-1", &["React"]);
    student.preferences.stipend = Some(ValueRange::new(20_000, 5_000));

    let err = recommend(
        &catalog(),
        &student,
        &MatchConfig::default(),
        &RecommendationFilters::default(),
        10,
        opened_at(),
    )
    .expect_err("inverted range rejected");

    assert!(matches!(err, MatchError::Validation { field: "stipend", .. }));
    assert!(!err.is_config());
}

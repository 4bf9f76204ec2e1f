use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;

use crate::workflows::placement::router::{apply_handler, status_handler, ApplyRequest};
use crate::workflows::placement::{
    placement_router, ApplicationId, InternshipId, MatchConfig, MemoryApplicationStore,
    MemoryCatalog, MemoryOfferStore, OfferId, OfferPolicy, PlacementError, PlacementService,
};

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).expect("request builds")
}

fn student_payload() -> Value {
    json!({
        "id": "stu-1",
        "skills": ["React", "Node.js"],
        "preferences": { "locations": ["Pune"], "modality": "hybrid" }
    })
}

#[tokio::test]
async fn recommendations_route_returns_ranked_explanations() {
    let harness = harness(vec![
        internship("int-1", &["React"], &["Node.js"]),
        internship("int-2", &["Go"], &[]),
    ]);
    let router = placement_router(harness.service.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/recommendations",
            json!({ "student": student_payload(), "limit": 5 }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let entries = payload.as_array().expect("array payload");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["internship"]["id"], json!("int-1"));
    assert!(entries[0]["explanations"]
        .as_array()
        .expect("explanations")
        .iter()
        .any(|entry| entry["kind"] == json!("skill")));
}

#[tokio::test]
async fn recommendations_route_rejects_zero_weight_config() {
    let harness = harness(vec![internship("int-1", &["React"], &[])]);
    let router = placement_router(harness.service.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/recommendations",
            json!({
                "student": student_payload(),
                "config": {
                    "weights": { "req": 0.0, "pref": 0.0, "loc": 0.0, "sector": 0.0, "modality": 0.0 }
                }
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("sum to zero"));
}

#[tokio::test]
async fn full_offer_flow_over_http() {
    let harness = harness(vec![internship("int-1", &["React"], &[])]);
    let service = harness.service.clone();

    let response = placement_router(service.clone())
        .oneshot(post_json(
            "/api/v1/applications",
            json!({ "student": student_payload(), "internship_id": "int-1" }),
        ))
        .await
        .expect("apply executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;
    assert_eq!(created["status"], json!("applied"));
    let id = created["application_id"]
        .as_str()
        .expect("application id")
        .to_string();

    for status in ["shortlisted", "interview"] {
        let response = placement_router(service.clone())
            .oneshot(post_json(
                &format!("/api/v1/applications/{id}/status"),
                json!({ "status": status }),
            ))
            .await
            .expect("status executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = placement_router(service.clone())
        .oneshot(post_empty(&format!("/api/v1/applications/{id}/offer")))
        .await
        .expect("offer executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let offered = read_json_body(response).await;
    assert_eq!(offered["status"], json!("offer"));
    assert_eq!(offered["offer"]["status"], json!("offered"));

    let response = placement_router(service.clone())
        .oneshot(post_empty(&format!("/api/v1/applications/{id}/offer/accept")))
        .await
        .expect("accept executes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = placement_router(service.clone())
        .oneshot(
            Request::get(format!("/api/v1/applications/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("status executes");
    let view = read_json_body(response).await;
    assert_eq!(view["status"], json!("accepted"));
    assert_eq!(view["timeline"].as_array().map(Vec::len), Some(5));
    assert_eq!(harness.filled("int-1"), 1);

    let response = placement_router(service)
        .oneshot(post_empty(&format!("/api/v1/applications/{id}/withdraw")))
        .await
        .expect("withdraw executes");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn expire_route_reports_swept_offers() {
    let harness = harness(vec![internship("int-1", &["React"], &[])]);
    offered(&harness, "stu-1", "int-1");
    harness.clock.advance(Duration::days(4));

    let response = placement_router(harness.service.clone())
        .oneshot(post_empty("/api/v1/offers/expire"))
        .await
        .expect("sweep executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["expired"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn status_handler_returns_not_found_for_unknown_ids() {
    let harness = harness(Vec::new());

    let response = status_handler::<MemoryApplicationStore, MemoryOfferStore, MemoryCatalog>(
        State(harness.service.clone()),
        Path("app-missing".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn apply_handler_reports_duplicates_as_conflict() {
    let harness = harness(vec![internship("int-1", &["React"], &[])]);
    let request = || ApplyRequest {
        student: student("stu-1", &["React"]),
        internship_id: InternshipId::from("int-1"),
        form_data: Value::Null,
    };

    let first = apply_handler::<MemoryApplicationStore, MemoryOfferStore, MemoryCatalog>(
        State(harness.service.clone()),
        axum::Json(request()),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = apply_handler::<MemoryApplicationStore, MemoryOfferStore, MemoryCatalog>(
        State(harness.service.clone()),
        axum::Json(request()),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn apply_handler_returns_internal_error_on_repository_failure() {
    let service = Arc::new(
        PlacementService::new(
            Arc::new(UnavailableApplications),
            Arc::new(MemoryOfferStore::default()),
            Arc::new(MemoryCatalog::new(vec![internship("int-1", &[], &[])])),
            MatchConfig::default(),
            OfferPolicy::default(),
        )
        .expect("valid config"),
    );

    let response = apply_handler::<UnavailableApplications, MemoryOfferStore, MemoryCatalog>(
        State(service),
        axum::Json(ApplyRequest {
            student: student("stu-1", &[]),
            internship_id: InternshipId::from("int-1"),
            form_data: Value::Null,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn expired_offers_map_to_gone() {
    let err = PlacementError::OfferExpired {
        offer_id: OfferId::from("offer-1"),
        expires_at: Utc::now(),
    };
    assert_eq!(err.into_response().status(), StatusCode::GONE);

    let err = PlacementError::NoLiveOffer(ApplicationId::from("app-1"));
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
}

mod common;

use actix_web::test;
use chrono::{Duration, Utc};
use serde_json::json;
use serial_test::serial;

use tripcraft_api::db::job_store::JobStore;
use tripcraft_api::models::job::JobStatus;
use tripcraft_api::services::job_service::{TransitionPayload, ABANDONED_JOB_ERROR};

use common::{generation_request, TestApp};

#[actix_rt::test]
#[serial]
async fn test_generate_creates_pending_job() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/itineraries/generate")
        .set_json(&generation_request())
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 202);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "pending");
    let job_id = body["job_id"].as_str().unwrap();
    assert!(job_id.starts_with("gen_"));

    // The record is in the store immediately, before any worker touches it
    let job = test_app.jobs.get(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
}

#[actix_rt::test]
#[serial]
async fn test_generate_rejects_missing_locations() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/itineraries/generate")
        .set_json(&json!({
            "adults": 2
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("location"));
}

#[actix_rt::test]
#[serial]
async fn test_generate_rejects_departure_before_arrival() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let mut request = generation_request();
    request.departure_datetime = Some(request.arrival_datetime.unwrap() - Duration::days(1));

    let req = test::TestRequest::post()
        .uri("/api/itineraries/generate")
        .set_json(&request)
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
#[serial]
async fn test_get_unknown_job_returns_404() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/jobs/gen_0_missing")
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
#[serial]
async fn test_status_reflects_transitions() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let job = test_app.jobs.create(generation_request()).await.unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/jobs/{}", job.job_id))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["stuck"], false);

    let req = test::TestRequest::post()
        .uri(&format!("/api/jobs/{}/transition", job.job_id))
        .set_json(&json!({ "status": "processing" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::post()
        .uri(&format!("/api/jobs/{}/transition", job.job_id))
        .set_json(&json!({
            "status": "completed",
            "result": { "trip_name": "Durango Rafting Adventure" }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/jobs/{}", job.job_id))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"]["trip_name"], "Durango Rafting Adventure");
    assert!(body["error"].is_null());
}

#[actix_rt::test]
#[serial]
async fn test_transition_out_of_terminal_needs_force() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let job = test_app.jobs.create(generation_request()).await.unwrap();
    test_app
        .jobs
        .transition(
            &job.job_id,
            JobStatus::Completed,
            TransitionPayload::default(),
            false,
        )
        .await
        .unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/jobs/{}/transition", job.job_id))
        .set_json(&json!({ "status": "processing" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    let req = test::TestRequest::post()
        .uri(&format!("/api/jobs/{}/transition", job.job_id))
        .set_json(&json!({ "status": "processing", "force": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "processing");
    assert_eq!(body["force_corrected"], true);
}

#[actix_rt::test]
#[serial]
async fn test_recover_force_fails_stale_processing_job() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let job = test_app.jobs.create(generation_request()).await.unwrap();
    test_app
        .jobs
        .transition(
            &job.job_id,
            JobStatus::Processing,
            TransitionPayload::default(),
            false,
        )
        .await
        .unwrap();

    // Age the record past the stuck threshold
    let mut stale = test_app.jobs.get(&job.job_id).await.unwrap();
    stale.updated_at = Utc::now() - Duration::minutes(6);
    test_app.job_store.update(&job.job_id, &stale).await.unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/jobs/{}", job.job_id))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "processing");
    assert_eq!(body["stuck"], true);

    let req = test::TestRequest::get().uri("/api/jobs/stuck").to_request();
    let stuck_list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stuck_list.as_array().unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/api/jobs/{}/recover", job.job_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error"], ABANDONED_JOB_ERROR);
    assert_eq!(body["force_corrected"], true);
}

#[actix_rt::test]
#[serial]
async fn test_recover_refuses_fresh_processing_job() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let job = test_app.jobs.create(generation_request()).await.unwrap();
    test_app
        .jobs
        .transition(
            &job.job_id,
            JobStatus::Processing,
            TransitionPayload::default(),
            false,
        )
        .await
        .unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/jobs/{}/recover", job.job_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
}

#[actix_rt::test]
#[serial]
async fn test_recover_rejects_non_terminal_target() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let job = test_app.jobs.create(generation_request()).await.unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/jobs/{}/recover", job.job_id))
        .set_json(&json!({ "status": "processing" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
#[serial]
async fn test_wait_returns_completed_result() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let job = test_app.jobs.create(generation_request()).await.unwrap();
    test_app
        .jobs
        .transition(
            &job.job_id,
            JobStatus::Completed,
            TransitionPayload {
                result: Some(json!({ "days": 3 })),
                error: None,
            },
            false,
        )
        .await
        .unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/jobs/{}/wait", job.job_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"]["days"], 3);
}

#[actix_rt::test]
#[serial]
async fn test_wait_gives_up_on_job_that_never_finishes() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let job = test_app.jobs.create(generation_request()).await.unwrap();
    test_app
        .jobs
        .transition(
            &job.job_id,
            JobStatus::Processing,
            TransitionPayload::default(),
            false,
        )
        .await
        .unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/jobs/{}/wait", job.job_id))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // Exhaustion is "stop waiting", not an error
    assert_eq!(resp.status(), 202);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "processing");
}

#[actix_rt::test]
#[serial]
async fn test_wrong_methods_are_rejected() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/itineraries/generate")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 405);

    let req = test::TestRequest::post()
        .uri("/api/jobs/gen_0_aaaaaa")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 405);
}

use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::models::job::{GenerationRequest, JobStatus};
use crate::services::generation_service::GenerationDispatcher;
use crate::services::job_service::{JobError, JobService, RecoveryOutcome, TransitionPayload};
use crate::services::polling_service::{JobPoller, PollOutcome};

/*
    /api/itineraries/generate
*/
pub async fn generate(
    data: web::Data<Arc<JobService>>,
    dispatcher: web::Data<GenerationDispatcher>,
    input: web::Json<GenerationRequest>,
) -> impl Responder {
    let parameters = input.into_inner();
    if let Err(err) = parameters.validate() {
        return HttpResponse::BadRequest().json(json!({ "error": err.to_string() }));
    }

    match data.create(parameters).await {
        Ok(job) => {
            dispatcher.dispatch(&job);
            HttpResponse::Accepted().json(json!({
                "job_id": job.job_id,
                "status": job.status,
            }))
        }
        Err(err) => {
            eprintln!("Failed to create generation job: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to create generation job")
        }
    }
}

/*
    /api/jobs/{job_id}
*/
pub async fn get_status(
    path: web::Path<String>,
    data: web::Data<Arc<JobService>>,
) -> impl Responder {
    let job_id = path.into_inner();

    match data.get(&job_id).await {
        Ok(job) => {
            // A stuck job stays "processing" until someone recovers it; the
            // flag just makes the condition visible to operator tooling
            let stuck = data.is_abandoned(&job, Utc::now());
            HttpResponse::Ok().json(json!({
                "job_id": job.job_id,
                "status": job.status,
                "result": job.result,
                "error": job.error,
                "stuck": stuck,
            }))
        }
        Err(JobError::NotFound(id)) => {
            HttpResponse::NotFound().json(json!({ "error": format!("Job {} not found", id) }))
        }
        Err(err) => {
            eprintln!("Failed to read job {}: {:?}", job_id, err);
            HttpResponse::InternalServerError().body("Failed to read job")
        }
    }
}

/*
    /api/jobs/{job_id}/wait

    Long-poll variant of the status read. Holds the request open until the
    job turns terminal or the poll budget runs out.
*/
pub async fn wait(path: web::Path<String>, poller: web::Data<Arc<JobPoller>>) -> impl Responder {
    let job_id = path.into_inner();

    match poller.poll(&job_id).await {
        Ok(PollOutcome::Succeeded(result)) => HttpResponse::Ok().json(json!({
            "job_id": job_id,
            "status": JobStatus::Completed,
            "result": result,
        })),
        Ok(PollOutcome::Failed(error)) => HttpResponse::Ok().json(json!({
            "job_id": job_id,
            "status": JobStatus::Failed,
            "error": error,
        })),
        Ok(PollOutcome::Exhausted) => HttpResponse::Accepted().json(json!({
            "job_id": job_id,
            "status": JobStatus::Processing,
            "message": "Still processing. Stop waiting and check back later.",
        })),
        Err(JobError::NotFound(id)) => {
            HttpResponse::NotFound().json(json!({ "error": format!("Job {} not found", id) }))
        }
        Err(err) => {
            eprintln!("Failed while polling job {}: {:?}", job_id, err);
            HttpResponse::InternalServerError().body("Failed while polling job")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: JobStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub force: bool,
}

/*
    /api/jobs/{job_id}/transition
*/
pub async fn transition(
    path: web::Path<String>,
    data: web::Data<Arc<JobService>>,
    input: web::Json<TransitionRequest>,
) -> impl Responder {
    let job_id = path.into_inner();
    let request = input.into_inner();
    let payload = TransitionPayload {
        result: request.result,
        error: request.error,
    };

    match data
        .transition(&job_id, request.status, payload, request.force)
        .await
    {
        Ok(job) => HttpResponse::Ok().json(job),
        Err(JobError::InvalidTransition { from, to }) => HttpResponse::Conflict().json(json!({
            "error": format!("invalid transition from {} to {}", from, to),
        })),
        Err(JobError::NotFound(id)) => {
            HttpResponse::NotFound().json(json!({ "error": format!("Job {} not found", id) }))
        }
        Err(err) => {
            eprintln!("Failed to transition job {}: {:?}", job_id, err);
            HttpResponse::InternalServerError().body("Failed to transition job")
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecoverRequest {
    #[serde(default)]
    pub status: Option<JobStatus>,
}

/*
    /api/jobs/{job_id}/recover

    Operator recovery for a job whose worker went silent. Only a job the
    staleness policy classifies as abandoned is touched.
*/
pub async fn recover(
    path: web::Path<String>,
    data: web::Data<Arc<JobService>>,
    input: Option<web::Json<RecoverRequest>>,
) -> impl Responder {
    let job_id = path.into_inner();
    let target = input.map(|body| body.into_inner().status).unwrap_or(None);

    if let Some(status) = target {
        if !status.is_terminal() {
            return HttpResponse::BadRequest().json(json!({
                "error": format!("recovery target must be terminal, got {}", status),
            }));
        }
    }

    match data.recover_if_abandoned(&job_id, target).await {
        Ok(RecoveryOutcome::Recovered(job)) => HttpResponse::Ok().json(job),
        Ok(RecoveryOutcome::NotAbandoned(job)) => HttpResponse::Conflict().json(json!({
            "error": "job is not abandoned",
            "status": job.status,
        })),
        Err(JobError::NotFound(id)) => {
            HttpResponse::NotFound().json(json!({ "error": format!("Job {} not found", id) }))
        }
        Err(err) => {
            eprintln!("Failed to recover job {}: {:?}", job_id, err);
            HttpResponse::InternalServerError().body("Failed to recover job")
        }
    }
}

/*
    /api/jobs/stuck
*/
pub async fn list_stuck(data: web::Data<Arc<JobService>>) -> impl Responder {
    match data.list_abandoned().await {
        Ok(jobs) => HttpResponse::Ok().json(jobs),
        Err(err) => {
            eprintln!("Failed to list stuck jobs: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to list stuck jobs")
        }
    }
}

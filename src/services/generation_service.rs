use std::env;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::models::job::{Job, JobStatus};
use crate::services::fetch_service::{self, DEFAULT_MAX_RETRIES};
use crate::services::job_service::{JobService, TransitionPayload};

/// Hands generation jobs to the out-of-process worker. The worker owns the
/// rest of the lifecycle: it moves the job to processing and later writes
/// the terminal status back through the job store on its own.
#[derive(Clone)]
pub struct GenerationDispatcher {
    http: reqwest::Client,
    worker_url: Option<String>,
    jobs: Arc<JobService>,
}

impl GenerationDispatcher {
    pub fn new(jobs: Arc<JobService>, worker_url: Option<String>) -> Self {
        if worker_url.is_none() {
            eprintln!("GENERATION_WORKER_URL not set. Generation jobs will fail on dispatch.");
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            worker_url,
            jobs,
        }
    }

    pub fn from_env(jobs: Arc<JobService>) -> Self {
        Self::new(jobs, env::var("GENERATION_WORKER_URL").ok())
    }

    /// Fire-and-forget. The HTTP round trip happens on a spawned task so the
    /// create request can return immediately; a dispatch failure fails the
    /// job instead of leaving it pending forever.
    pub fn dispatch(&self, job: &Job) {
        let http = self.http.clone();
        let worker_url = self.worker_url.clone();
        let jobs = self.jobs.clone();
        let job_id = job.job_id.clone();
        let body = json!({
            "job_id": job.job_id,
            "parameters": job.parameters,
        });

        tokio::spawn(async move {
            let Some(worker_url) = worker_url else {
                fail_job(&jobs, &job_id, "generation worker is not configured".to_string()).await;
                return;
            };

            // Transient worker hiccups get a couple of retries before the
            // job is written off
            let health_url = format!("{}/health", worker_url);
            match fetch_service::fetch_with_retry(&http, &health_url, DEFAULT_MAX_RETRIES).await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    fail_job(
                        &jobs,
                        &job_id,
                        format!("generation worker unavailable: {}", response.status()),
                    )
                    .await;
                    return;
                }
                Err(err) => {
                    fail_job(
                        &jobs,
                        &job_id,
                        format!("generation worker unreachable: {}", err),
                    )
                    .await;
                    return;
                }
            }

            let submit_url = format!("{}/generate", worker_url);
            match http.post(&submit_url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    println!("Dispatched job {} to generation worker", job_id);
                }
                Ok(response) => {
                    fail_job(
                        &jobs,
                        &job_id,
                        format!("generation worker rejected the job: {}", response.status()),
                    )
                    .await;
                }
                Err(err) => {
                    fail_job(&jobs, &job_id, format!("dispatch failed: {}", err)).await;
                }
            }
        });
    }
}

async fn fail_job(jobs: &JobService, job_id: &str, reason: String) {
    eprintln!("Job {} failed before reaching the worker: {}", job_id, reason);
    let payload = TransitionPayload {
        result: None,
        error: Some(reason),
    };
    // The worker may have raced us to a terminal status; if so, surface the
    // rejected transition and leave the record alone
    if let Err(err) = jobs.transition(job_id, JobStatus::Failed, payload, false).await {
        eprintln!("Could not record dispatch failure for job {}: {}", job_id, err);
    }
}

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::models::job::JobStatus;
use crate::services::job_service::{JobError, JobService};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;

#[derive(Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl PollConfig {
    pub fn from_env() -> Self {
        let interval_secs = env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        let max_attempts = env::var("MAX_POLL_ATTEMPTS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POLL_ATTEMPTS);

        Self {
            interval: Duration::from_secs(interval_secs),
            max_attempts,
        }
    }
}

#[derive(Debug)]
pub enum PollOutcome {
    Succeeded(serde_json::Value),
    Failed(String),
    /// The attempt budget ran out while the job was still non-terminal.
    /// This is "stop waiting", not a failure; the worker may yet finish.
    Exhausted,
}

/// Repeatedly reads a job until it reaches a terminal status or the attempt
/// budget runs out. Each wait is a plain timed suspension, so dropping the
/// returned future cancels the loop without touching job state.
pub struct JobPoller {
    service: Arc<JobService>,
    config: PollConfig,
}

impl JobPoller {
    pub fn new(service: Arc<JobService>) -> Self {
        Self {
            service,
            config: PollConfig::default(),
        }
    }

    pub fn with_config(service: Arc<JobService>, config: PollConfig) -> Self {
        Self { service, config }
    }

    pub async fn poll(&self, job_id: &str) -> Result<PollOutcome, JobError> {
        for attempt in 1..=self.config.max_attempts {
            let job = self.service.get(job_id).await?;

            match job.status {
                JobStatus::Completed => {
                    return Ok(PollOutcome::Succeeded(
                        job.result.unwrap_or(serde_json::Value::Null),
                    ));
                }
                JobStatus::Failed => {
                    return Ok(PollOutcome::Failed(
                        job.error.unwrap_or_else(|| "job failed".to_string()),
                    ));
                }
                JobStatus::Pending | JobStatus::Processing => {
                    // No sleep after the final read; the budget is reads, not waits
                    if attempt < self.config.max_attempts {
                        sleep(self.config.interval).await;
                    }
                }
            }
        }

        println!(
            "Job {} still not terminal after {} polls, giving up waiting",
            job_id, self.config.max_attempts
        );
        Ok(PollOutcome::Exhausted)
    }
}

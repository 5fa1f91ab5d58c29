use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const JOB_ID_PREFIX: &str = "gen";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Allowed successor set. Statuses only advance: pending may move to any
    /// later status (the worker can fail a job before picking it up), and
    /// nothing leaves a terminal status without a forced correction.
    pub fn allows(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending => matches!(
                next,
                JobStatus::Processing | JobStatus::Completed | JobStatus::Failed
            ),
            JobStatus::Processing => matches!(next, JobStatus::Completed | JobStatus::Failed),
            JobStatus::Completed | JobStatus::Failed => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Parameters the client submits to kick off itinerary generation. The
/// worker receives these verbatim alongside the job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub locations: Option<Vec<String>>,
    pub arrival_datetime: Option<DateTime<Utc>>,
    pub departure_datetime: Option<DateTime<Utc>>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub infants: Option<u32>,
    pub lodging: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub budget_per_person: Option<f32>,
}

impl GenerationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.locations {
            Some(locations) if !locations.is_empty() => {}
            _ => return Err(ValidationError("At least one location is required".to_string())),
        }

        let arrival = self
            .arrival_datetime
            .ok_or_else(|| ValidationError("Arrival datetime required".to_string()))?;
        let departure = self
            .departure_datetime
            .ok_or_else(|| ValidationError("Departure datetime required".to_string()))?;

        if departure <= arrival {
            return Err(ValidationError(
                "Departure must be after arrival".to_string(),
            ));
        }

        Ok(())
    }
}

/// A tracked unit of asynchronous generation work. `result` and `error` are
/// mutually exclusive; every status write sets one side and clears the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub storage_id: i64,
    pub status: JobStatus,
    pub parameters: GenerationRequest,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Set once an operator pushes the job through a forced transition, so
    /// a manual correction stays visible in the record afterwards.
    #[serde(default)]
    pub force_corrected: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(parameters: GenerationRequest) -> Self {
        let job_id = new_job_id();
        let storage_id = storage_id_for(&job_id);
        let now = Utc::now();

        Self {
            job_id,
            storage_id,
            status: JobStatus::Pending,
            parameters,
            result: None,
            error: None,
            force_corrected: false,
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn new_job_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    format!("{}_{}_{}", JOB_ID_PREFIX, millis, suffix.to_lowercase())
}

/// FNV-1a hash of the job id, for stores that want a numeric key instead of
/// the string id. Deterministic, so both ids always resolve the same record.
pub fn storage_id_for(job_id: &str) -> i64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    for byte in job_id.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash as i64
}

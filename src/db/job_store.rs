use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};

use crate::db::StoreError;
use crate::models::job::{storage_id_for, Job, JobStatus};

const JOBS_DB: &str = "Itineraries";
const JOBS_COLLECTION: &str = "GenerationJobs";

/// Minimal record-store surface the job lifecycle needs. Writes are
/// last-write-wins whole-record replacements; there is no concurrency token,
/// so callers must tolerate racing updates.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError>;
    async fn insert(&self, job: &Job) -> Result<(), StoreError>;
    async fn update(&self, job_id: &str, job: &Job) -> Result<(), StoreError>;
    /// Jobs currently marked processing, for stuck-job sweeps.
    async fn find_processing(&self) -> Result<Vec<Job>, StoreError>;
}

pub struct MongoJobStore {
    client: Arc<Client>,
}

impl MongoJobStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    fn collection(&self) -> Collection<Job> {
        self.client.database(JOBS_DB).collection(JOBS_COLLECTION)
    }
}

#[async_trait]
impl JobStore for MongoJobStore {
    async fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        // Records are keyed by the numeric storage id derived from the job id
        let filter = doc! { "storage_id": storage_id_for(job_id) };
        Ok(self.collection().find_one(filter).await?)
    }

    async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        self.collection().insert_one(job).await?;
        Ok(())
    }

    async fn update(&self, job_id: &str, job: &Job) -> Result<(), StoreError> {
        let filter = doc! { "storage_id": storage_id_for(job_id) };
        self.collection().replace_one(filter, job).await?;
        Ok(())
    }

    async fn find_processing(&self) -> Result<Vec<Job>, StoreError> {
        let filter = doc! { "status": "processing" };
        let cursor = self.collection().find(filter).await?;
        Ok(cursor.try_collect().await?)
    }
}

/// In-memory store used by the test suites and for local development without
/// a MongoDB instance. Same last-write-wins semantics as the Mongo store.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.lock().unwrap().get(job_id).cloned())
    }

    async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        self.jobs
            .lock()
            .unwrap()
            .insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn update(&self, job_id: &str, job: &Job) -> Result<(), StoreError> {
        self.jobs
            .lock()
            .unwrap()
            .insert(job_id.to_string(), job.clone());
        Ok(())
    }

    async fn find_processing(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|job| job.status == JobStatus::Processing)
            .cloned()
            .collect())
    }
}

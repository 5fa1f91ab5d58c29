use thiserror::Error;

pub mod job_store;
pub mod lock_store;
pub mod mongo;
pub mod trip_store;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

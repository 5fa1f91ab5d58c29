use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, Document},
    Client, Collection,
};

use crate::db::StoreError;

const LOCKS_DB: &str = "Itineraries";
const LOCKS_COLLECTION: &str = "SaveLocks";
const LOCK_DOC_ID: &str = "itinerary_save";

/// Persistence for the single save-lock marker. The marker is loaded raw so
/// the guard can decide what to do with payloads that no longer parse.
#[async_trait]
pub trait LockStore: Send + Sync {
    async fn load(&self) -> Result<Option<Document>, StoreError>;
    async fn save(&self, acquired_at: DateTime<Utc>) -> Result<(), StoreError>;
    async fn clear(&self) -> Result<(), StoreError>;
}

pub fn marker_document(acquired_at: DateTime<Utc>) -> Document {
    doc! {
        "_id": LOCK_DOC_ID,
        "acquired_at": acquired_at.to_rfc3339(),
    }
}

pub struct MongoLockStore {
    client: Arc<Client>,
}

impl MongoLockStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    fn collection(&self) -> Collection<Document> {
        self.client.database(LOCKS_DB).collection(LOCKS_COLLECTION)
    }
}

#[async_trait]
impl LockStore for MongoLockStore {
    async fn load(&self) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collection()
            .find_one(doc! { "_id": LOCK_DOC_ID })
            .await?)
    }

    async fn save(&self, acquired_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.collection()
            .replace_one(doc! { "_id": LOCK_DOC_ID }, marker_document(acquired_at))
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.collection()
            .delete_one(doc! { "_id": LOCK_DOC_ID })
            .await?;
        Ok(())
    }
}

/// In-memory lock store for the test suites. `set_raw` lets tests plant
/// arbitrary marker payloads, including unparseable ones.
#[derive(Default)]
pub struct MemoryLockStore {
    marker: Mutex<Option<Document>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_raw(&self, marker: Document) {
        *self.marker.lock().unwrap() = Some(marker);
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn load(&self) -> Result<Option<Document>, StoreError> {
        Ok(self.marker.lock().unwrap().clone())
    }

    async fn save(&self, acquired_at: DateTime<Utc>) -> Result<(), StoreError> {
        *self.marker.lock().unwrap() = Some(marker_document(acquired_at));
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.marker.lock().unwrap() = None;
        Ok(())
    }
}

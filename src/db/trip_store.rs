use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId},
    Client, Collection,
};

use crate::db::StoreError;
use crate::models::itinerary::Trip;

const TRIPS_DB: &str = "Itineraries";
const TRIPS_COLLECTION: &str = "Trips";

/// Trip persistence behind the edit path. Edits load the whole trip, mutate
/// it in memory and write the whole document back.
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn get(&self, id: &ObjectId) -> Result<Option<Trip>, StoreError>;
    async fn insert(&self, trip: &Trip) -> Result<ObjectId, StoreError>;
    async fn update(&self, id: &ObjectId, trip: &Trip) -> Result<(), StoreError>;
}

pub struct MongoTripStore {
    client: Arc<Client>,
}

impl MongoTripStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    fn collection(&self) -> Collection<Trip> {
        self.client.database(TRIPS_DB).collection(TRIPS_COLLECTION)
    }
}

#[async_trait]
impl TripStore for MongoTripStore {
    async fn get(&self, id: &ObjectId) -> Result<Option<Trip>, StoreError> {
        Ok(self.collection().find_one(doc! { "_id": id }).await?)
    }

    async fn insert(&self, trip: &Trip) -> Result<ObjectId, StoreError> {
        let mut trip = trip.clone();
        let id = trip.id.unwrap_or_else(ObjectId::new);
        trip.id = Some(id);
        self.collection().insert_one(&trip).await?;
        Ok(id)
    }

    async fn update(&self, id: &ObjectId, trip: &Trip) -> Result<(), StoreError> {
        self.collection()
            .replace_one(doc! { "_id": id }, trip)
            .await?;
        Ok(())
    }
}

/// In-memory trip store for the test suites.
#[derive(Default)]
pub struct MemoryTripStore {
    trips: Mutex<HashMap<ObjectId, Trip>>,
}

impl MemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TripStore for MemoryTripStore {
    async fn get(&self, id: &ObjectId) -> Result<Option<Trip>, StoreError> {
        Ok(self.trips.lock().unwrap().get(id).cloned())
    }

    async fn insert(&self, trip: &Trip) -> Result<ObjectId, StoreError> {
        let mut trip = trip.clone();
        let id = trip.id.unwrap_or_else(ObjectId::new);
        trip.id = Some(id);
        self.trips.lock().unwrap().insert(id, trip);
        Ok(id)
    }

    async fn update(&self, id: &ObjectId, trip: &Trip) -> Result<(), StoreError> {
        self.trips.lock().unwrap().insert(*id, trip.clone());
        Ok(())
    }
}

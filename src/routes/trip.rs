use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::db::trip_store::TripStore;
use crate::models::itinerary::ItemKind;
use crate::services::edit_service::{self, EditError};
use crate::services::save_lock_service::{AdvisorySaveLock, SaveLockError};

#[derive(Debug, Deserialize)]
pub struct EditItemRequest {
    pub item_type: String,
    pub identity: String,
    pub feedback: String,
}

/*
    /api/trips/{id}/days/{day_index}/items

    Locates one item on one day by its human-readable identity, folds the
    feedback into it and writes the whole trip back. The save runs under the
    advisory lock so one process does not interleave two trip writes.
*/
pub async fn edit_item(
    path: web::Path<(String, usize)>,
    trips: web::Data<Arc<dyn TripStore>>,
    lock: web::Data<Arc<AdvisorySaveLock>>,
    input: web::Json<EditItemRequest>,
) -> impl Responder {
    let (trip_id, day_index) = path.into_inner();
    let request = input.into_inner();

    let kind: ItemKind = match request.item_type.parse() {
        Ok(kind) => kind,
        Err(err) => {
            return HttpResponse::BadRequest()
                .json(json!({ "error": format!("{}", err) }))
        }
    };

    let id: ObjectId = match ObjectId::parse_str(&trip_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid trip ID"),
    };

    let mut trip = match trips.get(&id).await {
        Ok(Some(trip)) => trip,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({ "error": "Trip not found" }))
        }
        Err(err) => {
            eprintln!("Failed to load trip {}: {:?}", trip_id, err);
            return HttpResponse::InternalServerError().body("Failed to load trip");
        }
    };

    let token = match lock.acquire().await {
        Ok(token) => token,
        Err(SaveLockError::Busy) => {
            return HttpResponse::Conflict()
                .json(json!({ "error": "another itinerary save appears to be in flight" }))
        }
        Err(err) => {
            eprintln!("Failed to acquire save lock: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to acquire save lock");
        }
    };

    let response = match edit_service::edit_trip_item(
        &mut trip,
        day_index,
        kind,
        &request.identity,
        &request.feedback,
    ) {
        Ok(outcome) => match trips.update(&id, &trip).await {
            Ok(()) => HttpResponse::Ok().json(outcome),
            Err(err) => {
                eprintln!("Failed to persist edited trip {}: {:?}", trip_id, err);
                HttpResponse::InternalServerError().body("Failed to persist edited trip")
            }
        },
        Err(EditError::DayNotFound(index)) => HttpResponse::NotFound().json(json!({
            "error": format!("trip has no day at index {}", index),
        })),
        Err(EditError::ItemNotFound {
            kind,
            identity,
            available,
        }) => HttpResponse::NotFound().json(json!({
            "error": format!("no {} matching \"{}\" on that day", kind, identity),
            "available": available,
        })),
    };

    if let Err(err) = lock.release(token).await {
        eprintln!("Failed to clear save lock: {:?}", err);
    }

    response
}

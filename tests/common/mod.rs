use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{web, App};

use tripcraft_api::db::job_store::MemoryJobStore;
use tripcraft_api::db::lock_store::MemoryLockStore;
use tripcraft_api::db::trip_store::{MemoryTripStore, TripStore};
use tripcraft_api::models::itinerary::{AccommodationItem, ActivityItem, Day, MealItem, Trip};
use tripcraft_api::models::job::GenerationRequest;
use tripcraft_api::routes;
use tripcraft_api::services::generation_service::GenerationDispatcher;
use tripcraft_api::services::job_service::{JobPolicyConfig, JobService};
use tripcraft_api::services::polling_service::{JobPoller, PollConfig};
use tripcraft_api::services::save_lock_service::{AdvisorySaveLock, SaveLockConfig};

/// Real handlers wired over in-memory stores, so the suites run without a
/// MongoDB instance. The store handles stay public so tests can seed and
/// inspect records directly.
pub struct TestApp {
    pub job_store: Arc<MemoryJobStore>,
    pub jobs: Arc<JobService>,
    pub poller: Arc<JobPoller>,
    pub trips: Arc<MemoryTripStore>,
    pub lock_store: Arc<MemoryLockStore>,
    pub lock: Arc<AdvisorySaveLock>,
    dispatcher: GenerationDispatcher,
}

impl TestApp {
    pub fn new() -> Self {
        let job_store = Arc::new(MemoryJobStore::new());
        let jobs = Arc::new(JobService::new(
            job_store.clone(),
            JobPolicyConfig::default(),
        ));
        // Zero interval and a small budget keep the long-poll tests instant
        let poller = Arc::new(JobPoller::with_config(
            jobs.clone(),
            PollConfig {
                interval: Duration::ZERO,
                max_attempts: 3,
            },
        ));
        let trips = Arc::new(MemoryTripStore::new());
        let lock_store = Arc::new(MemoryLockStore::new());
        let lock = Arc::new(AdvisorySaveLock::new(
            lock_store.clone(),
            SaveLockConfig::default(),
        ));
        // Points at a dead port; dispatch failures burn through their retry
        // delays first, so tests observe the freshly created job undisturbed
        let dispatcher =
            GenerationDispatcher::new(jobs.clone(), Some("http://127.0.0.1:9".to_string()));

        Self {
            job_store,
            jobs,
            poller,
            trips,
            lock_store,
            lock,
            dispatcher,
        }
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<
                actix_web::body::EitherBody<actix_web::body::BoxBody>,
            >,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(web::Data::new(self.jobs.clone()))
            .app_data(web::Data::new(self.poller.clone()))
            .app_data(web::Data::new(self.trips.clone() as Arc<dyn TripStore>))
            .app_data(web::Data::new(self.lock.clone()))
            .app_data(web::Data::new(self.dispatcher.clone()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .route("/health", web::get().to(|| async { "OK" }))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/itineraries")
                            .route("/generate", web::post().to(routes::job::generate)),
                    )
                    .service(
                        web::scope("/jobs")
                            .route("/stuck", web::get().to(routes::job::list_stuck))
                            .route("/{job_id}", web::get().to(routes::job::get_status))
                            .route("/{job_id}/wait", web::get().to(routes::job::wait))
                            .route(
                                "/{job_id}/transition",
                                web::post().to(routes::job::transition),
                            )
                            .route("/{job_id}/recover", web::post().to(routes::job::recover)),
                    )
                    .service(
                        web::scope("/trips").route(
                            "/{id}/days/{day_index}/items",
                            web::put().to(routes::trip::edit_item),
                        ),
                    ),
            )
    }
}

pub fn generation_request() -> GenerationRequest {
    let arrival = chrono::Utc::now();
    GenerationRequest {
        locations: Some(vec!["Durango, Colorado".to_string()]),
        arrival_datetime: Some(arrival),
        departure_datetime: Some(arrival + chrono::Duration::days(3)),
        adults: Some(2),
        children: Some(1),
        infants: None,
        lodging: Some(vec!["cabin".to_string()]),
        interests: Some(vec!["rafting".to_string(), "hiking".to_string()]),
        budget_per_person: Some(1500.0),
    }
}

pub fn sample_trip() -> Trip {
    Trip {
        id: None,
        trip_name: "Durango Rafting Adventure".to_string(),
        days: vec![
            Day {
                day_number: Some(1),
                activities: vec![
                    ActivityItem {
                        title: "City Walk".to_string(),
                        description: None,
                        time: None,
                        location: Some("Historic Downtown".to_string()),
                        price_per_person: Some(0.0),
                    },
                    ActivityItem {
                        title: "Rafting Trip".to_string(),
                        description: Some("Half-day float on the Animas".to_string()),
                        time: None,
                        location: None,
                        price_per_person: Some(89.0),
                    },
                ],
                meals: vec![
                    MealItem {
                        venue: Some("Summit Cafe".to_string()),
                        title: Some("Breakfast Burritos".to_string()),
                        meal_type: Some("breakfast".to_string()),
                        description: None,
                        time: None,
                    },
                    MealItem {
                        venue: None,
                        title: Some("Harbor Grill".to_string()),
                        meal_type: Some("dinner".to_string()),
                        description: None,
                        time: None,
                    },
                ],
                accommodation: Some(AccommodationItem {
                    name: "Alpine Lodge".to_string(),
                    description: None,
                    price_per_night: Some(240.0),
                }),
            },
            Day {
                day_number: Some(2),
                activities: vec![],
                meals: vec![],
                accommodation: None,
            },
        ],
        created_at: Some(chrono::Utc::now()),
        updated_at: None,
    }
}

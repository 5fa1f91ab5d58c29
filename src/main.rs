use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use tripcraft_api::db::job_store::MongoJobStore;
use tripcraft_api::db::lock_store::MongoLockStore;
use tripcraft_api::db::trip_store::{MongoTripStore, TripStore};
use tripcraft_api::db::mongo;
use tripcraft_api::routes;
use tripcraft_api::services::generation_service::GenerationDispatcher;
use tripcraft_api::services::job_service::{JobPolicyConfig, JobService};
use tripcraft_api::services::polling_service::{JobPoller, PollConfig};
use tripcraft_api::services::save_lock_service::{AdvisorySaveLock, SaveLockConfig};

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Application starting...");

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);

    let mongo_uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
    let client = mongo::create_mongo_client(&mongo_uri).await;

    let job_store = Arc::new(MongoJobStore::new(client.clone()));
    let jobs = Arc::new(JobService::new(job_store, JobPolicyConfig::from_env()));
    let poller = Arc::new(JobPoller::with_config(jobs.clone(), PollConfig::from_env()));
    let trips: Arc<dyn TripStore> = Arc::new(MongoTripStore::new(client.clone()));
    let dispatcher = GenerationDispatcher::from_env(jobs.clone());

    let lock = Arc::new(AdvisorySaveLock::new(
        Arc::new(MongoLockStore::new(client.clone())),
        SaveLockConfig::from_env(),
    ));
    // A save lock left behind by a crashed session is cleaned up here, once,
    // before any request can try to save
    if let Err(err) = lock.cleanup_on_startup().await {
        eprintln!("Save-lock startup cleanup failed: {}", err);
    }

    println!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .route("/health", web::get().to(|| async { "OK" }))
            .app_data(web::Data::new(client.clone()))
            .app_data(web::Data::new(jobs.clone()))
            .app_data(web::Data::new(poller.clone()))
            .app_data(web::Data::new(trips.clone()))
            .app_data(web::Data::new(lock.clone()))
            .app_data(web::Data::new(dispatcher.clone()))
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(routes::health::health_check))
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
    })
    .bind((host, port))?
    .run()
    .await
}

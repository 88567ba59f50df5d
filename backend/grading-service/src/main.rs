use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grading_service::config::Config;
use grading_service::handlers::{fetch_training_data, grade, health, train};
use grading_service::services::GradingEngine;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    tracing::info!("Starting grading-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    // Lazy pool: the store is only needed by the fetch-training-data path,
    // so the service still starts and grades when the database is down.
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_lazy(&config.database.url)
        .expect("Invalid database URL");

    // Load whatever model bundle is on disk; absent is a valid state.
    let engine = web::Data::new(GradingEngine::new(config.model.path.clone()));
    let db_pool = web::Data::new(db_pool);

    let port = config.app.port;
    tracing::info!("Starting ML grading service on port {}", port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(engine.clone())
            .app_data(db_pool.clone())
            .service(health)
            .service(grade)
            .service(train)
            .service(fetch_training_data)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

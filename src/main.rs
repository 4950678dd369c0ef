use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use diesel::prelude::*;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

mod config;
mod db;
mod error;
mod filter;
mod handlers;
mod images;
mod models;
mod schema;

#[derive(Clone)]
pub struct AppState {
    pub pool: db::DbPool,
    pub config: config::AppConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = config::AppConfig::load()?;
    log::info!("Loaded config: {:?}", config);

    let pool = db::init_pool(&config.database_url)?;
    {
        let mut conn = pool.get()?;
        let test_query: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1"))
            .get_result(&mut conn)?;
        log::info!("Database test query result: {}", test_query);
    }

    images::ensure_upload_dir(&config.property_uploads_dir())?;
    images::ensure_upload_dir(&config.agent_uploads_dir())?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let uploads_root = config.uploads_root.clone();
    let state = AppState { pool, config };

    let property_routes = Router::new()
        .route(
            "/",
            get(handlers::properties::list_properties).post(handlers::properties::create_property),
        )
        .route("/filter", post(handlers::properties::filter_properties))
        .route("/featured", post(handlers::properties::featured_properties))
        .route(
            "/:id",
            get(handlers::properties::get_property)
                .put(handlers::properties::update_property)
                .delete(handlers::properties::delete_property),
        );

    let agent_routes = Router::new()
        .route(
            "/",
            get(handlers::agents::list_agents).post(handlers::agents::create_agent),
        )
        .route(
            "/:id",
            get(handlers::agents::get_agent)
                .put(handlers::agents::update_agent)
                .delete(handlers::agents::delete_agent),
        );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(|| async { "Server is running. Access the API at /api/properties" }))
        .nest("/api/properties", property_routes)
        .nest("/api/agents", agent_routes)
        .nest_service("/uploads", ServeDir::new(uploads_root))
        .layer(DefaultBodyLimit::max(handlers::MAX_REQUEST_BYTES))
        .layer(cors)
        .with_state(state);

    log::info!("Starting server on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app.into_make_service()).await?;

    Ok(())
}

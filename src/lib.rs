// Library exports for the API binary, the seed tool and tests
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{Config, StoreBackend};
use middleware::auth::JwtSecret;
use services::auth::TokenSettings;
use store::{MemoryStore, PgStore, RecordStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            jwt_secret: self.config.jwt_secret.clone(),
            ttl_seconds: self.config.jwt_expiry_seconds,
            bcrypt_cost: self.config.bcrypt_cost,
        }
    }
}

/// Connect the configured backend, applying migrations for Postgres.
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store: data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres store"))?;
            let pool = db::create_pool(url).await?;
            db::run_migrations(&pool).await?;
            tracing::info!("Database connected and migrations applied");
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

fn cors_layer(base_url: &str) -> CorsLayer {
    let base = base_url.to_string();
    let origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        // Always allow localhost for local development
        o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") || o == base
    });

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(origin)
}

pub fn build_router(state: AppState) -> Router {
    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());
    let cors = cors_layer(&state.config.app_base_url);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Auth
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/me", get(routes::auth::me))
        // Family & invitations
        .route("/family", get(routes::family::get_family).post(routes::family::create_family))
        .route("/family/invitations", get(routes::family::list_family_invitations).post(routes::family::invite))
        .route("/family/invitations/{id}", axum::routing::delete(routes::family::revoke_invitation))
        .route("/invitations", get(routes::family::list_my_invitations))
        .route("/invitations/accept", post(routes::family::accept_invitation))
        // Children
        .route("/children", get(routes::children::list_children).post(routes::children::create_child))
        .route(
            "/children/{child_id}",
            get(routes::children::get_child)
                .put(routes::children::update_child)
                .delete(routes::children::delete_child),
        )
        // Feedings
        .route("/children/{child_id}/feedings", get(routes::feedings::list_feedings).post(routes::feedings::create_feeding))
        .route("/children/{child_id}/feedings/stats", get(routes::feedings::feeding_stats))
        .route("/children/{child_id}/feedings/graph", get(routes::feedings::feeding_graph))
        .route(
            "/children/{child_id}/feedings/{id}",
            get(routes::feedings::get_feeding)
                .put(routes::feedings::replace_feeding)
                .delete(routes::feedings::delete_feeding),
        )
        // Sleeps
        .route("/children/{child_id}/sleeps", get(routes::sleeps::list_sleeps).post(routes::sleeps::create_sleep))
        .route("/children/{child_id}/sleeps/status", get(routes::sleeps::sleep_status))
        .route("/children/{child_id}/sleeps/start", post(routes::sleeps::start_sleep))
        .route("/children/{child_id}/sleeps/end", post(routes::sleeps::end_sleep))
        .route("/children/{child_id}/sleeps/stats", get(routes::sleeps::sleep_stats))
        .route("/children/{child_id}/sleeps/graph", get(routes::sleeps::sleep_graph))
        .route(
            "/children/{child_id}/sleeps/{id}",
            get(routes::sleeps::get_sleep)
                .put(routes::sleeps::replace_sleep)
                .delete(routes::sleeps::delete_sleep),
        )
        // Wastes
        .route("/children/{child_id}/wastes", get(routes::wastes::list_wastes).post(routes::wastes::create_waste))
        .route("/children/{child_id}/wastes/stats", get(routes::wastes::waste_stats))
        .route("/children/{child_id}/wastes/graph", get(routes::wastes::waste_graph))
        .route(
            "/children/{child_id}/wastes/{id}",
            get(routes::wastes::get_waste)
                .put(routes::wastes::replace_waste)
                .delete(routes::wastes::delete_waste),
        )
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

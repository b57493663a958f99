/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use contactnotes_api::{app::AppState, config::Config};
/// use contactnotes_shared::queue::UnavailableTaskQueue;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, Arc::new(UnavailableTaskQueue), None);
/// let app = contactnotes_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use contactnotes_shared::{
    auth::{middleware::authenticate_bearer, middleware::AuthError, revocation},
    queue::TaskQueue,
    redis::RedisClient,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Producer side of the task queue
    pub queue: Arc<dyn TaskQueue>,

    /// Redis for rate limiting and token revocation; `None` disables both
    pub redis: Option<RedisClient>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Config,
        queue: Arc<dyn TaskQueue>,
        redis: Option<RedisClient>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            queue,
            redis,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /                               # liveness message
/// ├── GET  /health
/// ├── /auth/
/// │   ├── POST /register
/// │   ├── POST /login
/// │   ├── POST /refresh
/// │   └── POST /logout                     # JWT
/// └── /contacts/                           # JWT + rate limit
///     ├── GET|POST          /
///     ├── GET|PUT|DELETE    /:contact_id
///     ├── GET|POST          /:contact_id/notes
///     └── GET|PUT|DELETE    /:contact_id/notes/:note_id
/// ```
///
/// Security headers wrap everything, then CORS, then request tracing.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route(
            "/logout",
            post(routes::auth::logout).layer(axum::middleware::from_fn_with_state(
                state.clone(),
                jwt_auth_layer,
            )),
        );

    // Auth runs first (outermost), so the limiter always sees an AuthContext
    let contact_routes = Router::new()
        .route(
            "/",
            get(routes::contacts::list_contacts).post(routes::contacts::create_contact),
        )
        .route(
            "/:contact_id",
            get(routes::contacts::get_contact)
                .put(routes::contacts::update_contact)
                .delete(routes::contacts::delete_contact),
        )
        .route(
            "/:contact_id/notes",
            get(routes::notes::list_notes).post(routes::notes::create_note),
        )
        .route(
            "/:contact_id/notes/:note_id",
            get(routes::notes::get_note)
                .put(routes::notes::update_note)
                .delete(routes::notes::delete_note),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::rate_limit::rate_limit_layer,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .nest("/auth", auth_routes)
        .nest("/contacts", contact_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the bearer access token, rejects revoked token ids and
/// injects the `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate_bearer(req.headers(), state.jwt_secret())?;

    if let Some(redis) = state.redis.as_ref() {
        match revocation::is_revoked(redis, auth.token_id).await {
            Ok(true) => {
                tracing::debug!(user_id = auth.user_id, token_id = %auth.token_id, "Rejected revoked token");
                return Err(AuthError::Revoked.into());
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Revocation check failed, accepting token");
            }
        }
    }

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use vidhub_api::{app::{build_router, AppState}, config::Config};
/// use vidhub_shared::{db::pool::{create_pool, DatabaseConfig}, media::CloudinaryClient, store::PgStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig { url: config.database.url.clone(), ..Default::default() }).await?;
/// let media = CloudinaryClient::new(config.cloudinary.clone());
/// let state = AppState::new(Arc::new(PgStore::new(pool)), Arc::new(media), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use vidhub_shared::{
    auth::{
        jwt::TokenIssuer,
        middleware::{extract_access_token, AuthError, TokenKind},
    },
    media::MediaHost,
    models::user::PublicUser,
    store::UserStore,
};

/// Shared application state
///
/// Cloned per request by Axum's `State` extractor; everything heavy is
/// behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub media: Arc<dyn MediaHost>,
    pub tokens: TokenIssuer,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>, media: Arc<dyn MediaHost>, config: Config) -> Self {
        Self {
            store,
            media,
            tokens: TokenIssuer::new(config.tokens.clone()),
            config: Arc::new(config),
        }
    }
}

/// Authenticated caller, inserted into request extensions by [`jwt_auth_layer`]
#[derive(Debug, Clone)]
pub struct AuthUser(pub PublicUser);

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// └── /api/v1/users/
///     ├── POST  /register              (multipart)
///     ├── POST  /login
///     ├── POST  /refresh-token
///     ├── POST  /logout                (auth)
///     ├── POST  /change-password       (auth)
///     ├── GET   /current-user          (auth)
///     ├── PATCH /update-account        (auth)
///     ├── PATCH /update-avatar         (auth, multipart)
///     ├── PATCH /update-cover-image    (auth, multipart)
///     ├── GET   /channel/:username     (auth)
///     └── GET   /watch-history         (auth)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_user_routes = Router::new()
        .route("/register", post(routes::users::register))
        .route("/login", post(routes::users::login))
        .route("/refresh-token", post(routes::users::refresh_access_token));

    let secured_user_routes = Router::new()
        .route("/logout", post(routes::users::logout))
        .route("/change-password", post(routes::users::change_password))
        .route("/current-user", get(routes::users::current_user))
        .route("/update-account", patch(routes::users::update_account))
        .route("/update-avatar", patch(routes::users::update_avatar))
        .route("/update-cover-image", patch(routes::users::update_cover_image))
        .route("/channel/:username", get(routes::users::channel_profile))
        .route("/watch-history", get(routes::users::watch_history))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new().nest(
        "/users",
        public_user_routes.merge(secured_user_routes),
    );

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
                Method::PATCH,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let max_body = state.config.uploads.max_bytes;

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", v1_routes)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
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
/// Reads the access token from the cookie or the `Authorization` header,
/// verifies it and loads the user it names.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_access_token(req.headers())
        .ok_or(AuthError::MissingCredentials(TokenKind::Access))?;

    let claims = state
        .tokens
        .verify_access(&token)
        .map_err(|e| AuthError::from_jwt(TokenKind::Access, e))?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    req.extensions_mut().insert(AuthUser(PublicUser::from(user)));

    Ok(next.run(req).await)
}

/// User account endpoints
///
/// # Endpoints
///
/// Public:
/// - `POST /api/v1/users/register` - Register with avatar and optional cover image
/// - `POST /api/v1/users/login` - Login and get tokens
/// - `POST /api/v1/users/refresh-token` - Rotate the token pair
///
/// Authenticated:
/// - `POST /api/v1/users/logout`
/// - `POST /api/v1/users/change-password`
/// - `GET /api/v1/users/current-user`
/// - `PATCH /api/v1/users/update-account`
/// - `PATCH /api/v1/users/update-avatar`
/// - `PATCH /api/v1/users/update-cover-image`
/// - `GET /api/v1/users/channel/:username`
/// - `GET /api/v1/users/watch-history`

use crate::{
    app::{AppState, AuthUser},
    cookies::{clear_token_cookies, token_cookies, CookieHeaders},
    error::{ApiError, ApiResult, ValidationErrorDetail},
    response::ApiResponse,
    uploads::{MultipartForm, StagedFile},
};
use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use validator::Validate;
use vidhub_shared::{
    auth::{
        jwt::TokenPair,
        middleware::{extract_refresh_token, AuthError, TokenKind},
        password,
    },
    models::{
        subscription::ChannelProfile,
        user::{normalize_identifier, NewUser, PublicUser, User},
        video::WatchedVideo,
    },
    store::StoreError,
};

const AVATAR_FIELD: &str = "avatar";
const COVER_IMAGE_FIELD: &str = "coverImage";

/// Registration fields (sent as multipart text parts)
#[derive(Debug, Validate)]
pub struct RegisterRequest {
    #[validate(length(max = 64, message = "Username must be at most 64 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 255, message = "Full name must be at most 255 characters"))]
    pub full_name: String,

    pub password: String,
}

/// Login request; one of `email` or `username` is required
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: String,
}

/// Login response data
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh request body (the cookie takes precedence)
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Change password request
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Account update request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[validate(length(max = 255, message = "Full name must be at most 255 characters"))]
    pub full_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

fn password_policy(password: &str) -> ApiResult<()> {
    password::validate_password_length(password).map_err(|message| {
        ApiError::ValidationError(vec![ValidationErrorDetail::new("password", message)])
    })
}

/// Non-empty trimmed value or `None`
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Loads the full stored user behind an authenticated request
async fn load_user(state: &AppState, auth: &AuthUser) -> ApiResult<User> {
    state
        .store
        .find_user_by_id(auth.0.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Issues a token pair and persists the refresh token
async fn issue_tokens(state: &AppState, user: &User) -> ApiResult<(TokenPair, CookieHeaders)> {
    let tokens = state.tokens.issue_pair(user)?;
    state
        .store
        .set_refresh_token(user.id, &tokens.refresh_token)
        .await?;

    let cookies = token_cookies(
        &tokens,
        state.tokens.access_expiry(),
        state.tokens.refresh_expiry(),
    );
    Ok((tokens, cookies))
}

/// Uploads a staged file and returns its public URL
async fn upload_image(state: &AppState, file: &StagedFile, what: &str) -> ApiResult<String> {
    match state.media.upload(file.path()).await {
        Ok(uploaded) => Ok(uploaded.secure_url),
        Err(e) => {
            error!(
                error = %e,
                file = %file.original_name(),
                size = file.size(),
                "Failed to upload {}",
                what
            );
            Err(ApiError::InternalError(format!("Failed to upload {}: {}", what, e)))
        }
    }
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/users/register
/// Content-Type: multipart/form-data
///
/// fullName, email, username, password (text) + avatar (file) + coverImage (file, optional)
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: missing fields, invalid email, short password,
///   username or email taken, avatar missing
/// - `500 Internal Server Error`: avatar upload failed
pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ApiResponse<PublicUser>> {
    let mut form = MultipartForm::read(
        multipart,
        &state.config.uploads.dir,
        &[AVATAR_FIELD, COVER_IMAGE_FIELD],
    )
    .await?;

    let fields = ["fullName", "email", "username", "password"].map(|name| non_blank(form.text(name)));
    let [Some(full_name), Some(email), Some(username), Some(_)] = fields else {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    };

    // Blank check only; the password is hashed exactly as sent
    let password = form.text("password").unwrap_or_default().to_string();

    let req = RegisterRequest {
        username: normalize_identifier(&username),
        email: normalize_identifier(&email),
        full_name,
        password,
    };
    req.validate()?;
    password_policy(&req.password)?;

    let existing = state
        .store
        .find_user_by_username_or_email(Some(&req.username), Some(&req.email))
        .await?;
    if existing.is_some() {
        return Err(ApiError::BadRequest(
            "User with email or username already exists".to_string(),
        ));
    }

    let avatar_file = form
        .take_file(AVATAR_FIELD)
        .ok_or_else(|| ApiError::BadRequest("Avatar file is required".to_string()))?;
    let cover_file = form.take_file(COVER_IMAGE_FIELD);

    let avatar = upload_image(&state, &avatar_file, "avatar").await?;

    let cover_image = match &cover_file {
        Some(file) => match state.media.upload(file.path()).await {
            Ok(uploaded) => Some(uploaded.secure_url),
            Err(e) => {
                warn!(error = %e, "Cover image upload failed, registering without it");
                None
            }
        },
        None => None,
    };

    let create = NewUser {
        username: req.username,
        email: req.email,
        full_name: req.full_name,
        password: req.password,
        avatar,
        cover_image,
    }
    .into_create()?;

    let user = state.store.create_user(create).await.map_err(|e| match e {
        StoreError::Duplicate(_) => {
            ApiError::BadRequest("User with email or username already exists".to_string())
        }
        other => ApiError::from(other),
    })?;

    info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(ApiResponse::created(
        PublicUser::from(user),
        "User registered successfully",
    ))
}

/// Login with username or email
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/users/login
/// Content-Type: application/json
///
/// { "email": "user@example.com", "password": "secret1" }
/// ```
///
/// Sets the `accessToken` and `refreshToken` cookies and also returns both
/// tokens in the body.
///
/// # Errors
///
/// - `400 Bad Request`: no identifier or no password
/// - `404 Not Found`: no such user
/// - `401 Unauthorized`: wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieHeaders, ApiResponse<LoginData>)> {
    let username = non_blank(req.username.as_deref()).map(|v| normalize_identifier(&v));
    let email = non_blank(req.email.as_deref()).map(|v| normalize_identifier(&v));

    if username.is_none() && email.is_none() {
        return Err(ApiError::BadRequest("Username or email is required".to_string()));
    }
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }

    let user = state
        .store
        .find_user_by_username_or_email(username.as_deref(), email.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    if !user.is_password_correct(&req.password)? {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::Unauthorized("Invalid user credentials".to_string()));
    }

    let (tokens, cookies) = issue_tokens(&state, &user).await?;

    info!(user_id = %user.id, "User logged in");

    Ok((
        cookies,
        ApiResponse::ok(
            LoginData {
                user: PublicUser::from(user),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// Logout: forget the stored refresh token and remove both cookies
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<(CookieHeaders, ApiResponse<Value>)> {
    state.store.clear_refresh_token(auth.0.id).await?;

    info!(user_id = %auth.0.id, "User logged out");

    Ok((
        clear_token_cookies(),
        ApiResponse::ok(Value::Null, "User logged out"),
    ))
}

/// Rotate the token pair
///
/// The refresh token is read from the `refreshToken` cookie, else from the
/// JSON body. It must verify and equal the token stored for the user.
///
/// # Errors
///
/// - `401 Unauthorized`: missing, expired, invalid, or already rotated token
pub async fn refresh_access_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<(CookieHeaders, ApiResponse<TokenPair>)> {
    let body_token = body.and_then(|Json(req)| req.refresh_token);

    let incoming = extract_refresh_token(&headers, body_token.as_deref())
        .ok_or(AuthError::MissingCredentials(TokenKind::Refresh))?;

    let claims = state
        .tokens
        .verify_refresh(&incoming)
        .map_err(|e| AuthError::from_jwt(TokenKind::Refresh, e))?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or(AuthError::InvalidToken(TokenKind::Refresh))?;

    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        warn!(user_id = %user.id, "Rejected refresh token that is not the current one");
        return Err(AuthError::TokenReused.into());
    }

    let (tokens, cookies) = issue_tokens(&state, &user).await?;

    Ok((cookies, ApiResponse::ok(tokens, "Access token refreshed")))
}

/// Change the caller's password
///
/// # Errors
///
/// - `400 Bad Request`: missing fields, wrong old password, new password too short
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    if req.old_password.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::BadRequest(
            "Old and new password are required".to_string(),
        ));
    }

    let user = load_user(&state, &auth).await?;

    if !user.is_password_correct(&req.old_password)? {
        return Err(ApiError::BadRequest("Invalid old password".to_string()));
    }

    password_policy(&req.new_password)?;

    let password_hash = password::hash_password(&req.new_password)?;
    state.store.update_password(user.id, &password_hash).await?;

    info!(user_id = %user.id, "Password changed");

    Ok(ApiResponse::ok(Value::Null, "Password changed successfully"))
}

/// The authenticated user
pub async fn current_user(
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<ApiResponse<PublicUser>> {
    Ok(ApiResponse::ok(user, "Current user fetched successfully"))
}

/// Replace full name and email
///
/// # Errors
///
/// - `400 Bad Request`: missing fields or invalid email
/// - `409 Conflict`: email belongs to another account
pub async fn update_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let req = UpdateAccountRequest {
        full_name: req.full_name.trim().to_string(),
        email: normalize_identifier(&req.email),
    };

    if req.full_name.is_empty() || req.email.is_empty() {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    }
    req.validate()?;

    let user = state
        .store
        .update_account(auth.0.id, &req.full_name, &req.email)
        .await?;

    Ok(ApiResponse::ok(
        PublicUser::from(user),
        "Account details updated successfully",
    ))
}

/// Replace the avatar (multipart field `avatar`)
pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> ApiResult<ApiResponse<PublicUser>> {
    let mut form = MultipartForm::read(multipart, &state.config.uploads.dir, &[AVATAR_FIELD]).await?;
    let file = form
        .take_file(AVATAR_FIELD)
        .ok_or_else(|| ApiError::BadRequest("Avatar file is missing".to_string()))?;

    let url = upload_image(&state, &file, "avatar").await?;
    let user = state.store.update_avatar(auth.0.id, &url).await?;

    Ok(ApiResponse::ok(
        PublicUser::from(user),
        "Avatar image updated successfully",
    ))
}

/// Replace the cover image (multipart field `coverImage`)
pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> ApiResult<ApiResponse<PublicUser>> {
    let mut form =
        MultipartForm::read(multipart, &state.config.uploads.dir, &[COVER_IMAGE_FIELD]).await?;
    let file = form
        .take_file(COVER_IMAGE_FIELD)
        .ok_or_else(|| ApiError::BadRequest("Cover image file is missing".to_string()))?;

    let url = upload_image(&state, &file, "cover image").await?;
    let user = state.store.update_cover_image(auth.0.id, &url).await?;

    Ok(ApiResponse::ok(
        PublicUser::from(user),
        "Cover image updated successfully",
    ))
}

/// Channel profile of `username` as seen by the caller
///
/// # Errors
///
/// - `400 Bad Request`: blank username
/// - `404 Not Found`: no such channel
pub async fn channel_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(username): Path<String>,
) -> ApiResult<ApiResponse<ChannelProfile>> {
    let username = normalize_identifier(&username);
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is missing".to_string()));
    }

    let profile = state
        .store
        .channel_profile(&username, auth.0.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Channel does not exist".to_string()))?;

    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

/// The caller's watch history, in list order
pub async fn watch_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<ApiResponse<Vec<WatchedVideo>>> {
    let history = state.store.watch_history(auth.0.id).await?;

    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}

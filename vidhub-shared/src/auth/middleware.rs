/// Credential extraction and authentication errors for Axum
///
/// Browsers send tokens as cookies; other clients use the `Authorization`
/// header (access token) or the request body (refresh token). The functions
/// here look in that order and leave verification to
/// [`TokenIssuer`](super::jwt::TokenIssuer).
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use vidhub_shared::auth::middleware::extract_access_token;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
///
/// assert_eq!(extract_access_token(&headers).as_deref(), Some("abc.def.ghi"));
/// ```

use axum::http::{header, HeaderMap, StatusCode};
use axum_extra::headers::{Cookie, HeaderMapExt};

use super::jwt::JwtError;

/// Cookie holding the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie holding the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Which token a failure refers to, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn label(&self) -> &'static str {
        match self {
            TokenKind::Access => "Access token",
            TokenKind::Refresh => "Refresh token",
        }
    }
}

/// Error type for authentication
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    /// No token in cookies, headers or body
    MissingCredentials(TokenKind),

    /// Token signature was fine but it is past `exp`
    Expired(TokenKind),

    /// Malformed token, bad signature, wrong issuer or type
    InvalidToken(TokenKind),

    /// Token is valid but names a user that no longer exists
    UnknownUser,

    /// Refresh token is valid but no longer the stored one
    TokenReused,

    /// Anything else (store failure, key problems)
    Internal(String),
}

impl AuthError {
    /// Classifies a token verification failure
    pub fn from_jwt(kind: TokenKind, err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired(kind),
            JwtError::Invalid(_) => AuthError::InvalidToken(kind),
            other => AuthError::Internal(other.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Client-facing message
    pub fn message(&self) -> String {
        match self {
            AuthError::MissingCredentials(kind) => format!("{} is required", kind.label()),
            AuthError::Expired(kind) => format!("{} expired", kind.label()),
            AuthError::InvalidToken(TokenKind::Access) => "Invalid access token".to_string(),
            AuthError::InvalidToken(TokenKind::Refresh) => "Invalid refresh token".to_string(),
            AuthError::UnknownUser => "User for this token no longer exists".to_string(),
            AuthError::TokenReused => "Refresh token is expired or used".to_string(),
            AuthError::Internal(_) => "Failed to verify credentials".to_string(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Internal(detail) => write!(f, "{}: {}", self.message(), detail),
            _ => f.write_str(&self.message()),
        }
    }
}

impl std::error::Error for AuthError {}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .typed_get::<Cookie>()
        .and_then(|cookie| cookie.get(name).map(str::to_string))
        .filter(|value| !value.is_empty())
}

/// Access token from the `accessToken` cookie, else from `Authorization: Bearer`
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = cookie_value(headers, ACCESS_TOKEN_COOKIE) {
        return Some(token);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Refresh token from the `refreshToken` cookie, else from the request body
pub fn extract_refresh_token(headers: &HeaderMap, body_token: Option<&str>) -> Option<String> {
    cookie_value(headers, REFRESH_TOKEN_COOKIE).or_else(|| {
        body_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

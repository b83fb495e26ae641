/// Token cookies
///
/// Both tokens travel as `HttpOnly; Secure; SameSite=Strict` cookies on path
/// `/`. Each cookie lives exactly as long as the token it carries; removal
/// sends an empty value with `Max-Age=0`.

use axum::{http::header, response::AppendHeaders};
use chrono::Duration;
use vidhub_shared::auth::{
    jwt::TokenPair,
    middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
};

/// Headers to append to a response
pub type CookieHeaders = AppendHeaders<[(header::HeaderName, String); 2]>;

/// Formats one `Set-Cookie` value
pub fn set_cookie(name: &str, value: &str, max_age: Duration) -> String {
    format!(
        "{name}={value}; Path=/; Max-Age={secs}; HttpOnly; Secure; SameSite=Strict",
        secs = max_age.num_seconds().max(0),
    )
}

/// `Set-Cookie` value that deletes `name`
pub fn remove_cookie(name: &str) -> String {
    set_cookie(name, "", Duration::zero())
}

/// Sets both token cookies
pub fn token_cookies(
    tokens: &TokenPair,
    access_max_age: Duration,
    refresh_max_age: Duration,
) -> CookieHeaders {
    AppendHeaders([
        (
            header::SET_COOKIE,
            set_cookie(ACCESS_TOKEN_COOKIE, &tokens.access_token, access_max_age),
        ),
        (
            header::SET_COOKIE,
            set_cookie(REFRESH_TOKEN_COOKIE, &tokens.refresh_token, refresh_max_age),
        ),
    ])
}

/// Removes both token cookies
pub fn clear_token_cookies() -> CookieHeaders {
    AppendHeaders([
        (header::SET_COOKIE, remove_cookie(ACCESS_TOKEN_COOKIE)),
        (header::SET_COOKIE, remove_cookie(REFRESH_TOKEN_COOKIE)),
    ])
}

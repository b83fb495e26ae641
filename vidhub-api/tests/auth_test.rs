/// Integration tests for registration, login, token rotation and logout
///
/// Run with: cargo test -p vidhub-api --test auth_test

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{MultipartBody, TestContext, ACCESS_SECRET, FAIL_UPLOAD};
use serde_json::json;
use uuid::Uuid;
use vidhub_shared::{
    auth::jwt::{create_token, AccessClaims},
    models::user::User,
    store::UserStore,
};

const SECRET_KEYS: [&str; 4] = ["password", "passwordHash", "refreshToken", "password_hash"];

fn assert_no_secrets(user: &serde_json::Value) {
    let object = user.as_object().expect("user object");
    for key in SECRET_KEYS {
        assert!(!object.contains_key(key), "response leaked '{}'", key);
    }
}

#[tokio::test]
async fn test_register_creates_public_user() {
    let ctx = TestContext::new();

    let form = MultipartBody::new()
        .text("fullName", " Alice Example ")
        .text("email", "Alice@Example.com")
        .text("username", "  Alice ")
        .text("password", "password123")
        .file("avatar", "avatar.png", b"\x89PNG avatar bytes");
    let response = ctx
        .send_multipart("POST", "/api/v1/users/register", None, form)
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["statusCode"], 201);

    let user = &response.body["data"];
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["fullName"], "Alice Example");
    assert!(user["avatar"].as_str().unwrap().starts_with("https://media.test/"));
    assert!(user["coverImage"].is_null());
    assert_eq!(user["watchHistory"], json!([]));
    assert_no_secrets(user);

    assert_eq!(ctx.media.uploaded_paths().len(), 1);
    assert!(ctx.staged_files().is_empty(), "staged upload was not removed");
}

#[tokio::test]
async fn test_register_keeps_password_whitespace() {
    let ctx = TestContext::new();

    let registered = ctx.register("pat", "pat@example.com", "  secret123  ").await;
    assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.body);

    let response = ctx.login("pat", "  secret123  ").await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let response = ctx.login("pat", "secret123").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_with_cover_image() {
    let ctx = TestContext::new();

    let form = TestContext::registration_form("bob", "bob@example.com", "password123")
        .file("coverImage", "cover.jpg", b"jpeg cover bytes");
    let response = ctx
        .send_multipart("POST", "/api/v1/users/register", None, form)
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert!(response.body["data"]["coverImage"]
        .as_str()
        .unwrap()
        .ends_with(".jpg"));
    assert_eq!(ctx.media.uploaded_paths().len(), 2);
    assert!(ctx.staged_files().is_empty());
}

#[tokio::test]
async fn test_register_requires_all_fields() {
    let ctx = TestContext::new();

    let form = MultipartBody::new()
        .text("fullName", "Carol")
        .text("email", "carol@example.com")
        .text("username", "   ")
        .text("password", "password123")
        .file("avatar", "a.png", b"png");
    let response = ctx
        .send_multipart("POST", "/api/v1/users/register", None, form)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "All fields are required");
    assert_eq!(response.body["success"], false);
    assert!(ctx.staged_files().is_empty());
}

#[tokio::test]
async fn test_register_validates_email_and_password() {
    let ctx = TestContext::new();

    let response = ctx.register("dave", "not-an-email", "password123").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "Invalid email format");

    let response = ctx.register("dave", "dave@example.com", "12345").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_register_rejects_duplicates() {
    let ctx = TestContext::new();
    ctx.register("erin", "erin@example.com", "password123").await;

    let same_username = ctx.register("ERIN", "other@example.com", "password123").await;
    assert_eq!(same_username.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        same_username.message(),
        "User with email or username already exists"
    );

    let same_email = ctx.register("erin2", "Erin@example.com", "password123").await;
    assert_eq!(same_email.status, StatusCode::BAD_REQUEST);

    // Neither rejected attempt reached the media host
    assert_eq!(ctx.media.uploaded_paths().len(), 1);
}

#[tokio::test]
async fn test_register_requires_avatar() {
    let ctx = TestContext::new();

    let form = MultipartBody::new()
        .text("fullName", "Frank")
        .text("email", "frank@example.com")
        .text("username", "frank")
        .text("password", "password123")
        .file("coverImage", "cover.png", b"png");
    let response = ctx
        .send_multipart("POST", "/api/v1/users/register", None, form)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "Avatar file is required");
    assert!(ctx.staged_files().is_empty());

    let lookup = ctx
        .store
        .find_user_by_username_or_email(Some("frank"), None)
        .await
        .unwrap();
    assert!(lookup.is_none());
}

#[tokio::test]
async fn test_register_rejects_unexpected_file_field() {
    let ctx = TestContext::new();

    let form = TestContext::registration_form("gina", "gina@example.com", "password123")
        .file("document", "cv.pdf", b"pdf");
    let response = ctx
        .send_multipart("POST", "/api/v1/users/register", None, form)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(ctx.staged_files().is_empty());
}

#[tokio::test]
async fn test_register_avatar_upload_failure() {
    let ctx = TestContext::new();

    let form = MultipartBody::new()
        .text("fullName", "Hank")
        .text("email", "hank@example.com")
        .text("username", "hank")
        .text("password", "password123")
        .file("avatar", "avatar.png", FAIL_UPLOAD);
    let response = ctx
        .send_multipart("POST", "/api/v1/users/register", None, form)
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.message(), "An internal error occurred");
    assert!(ctx.staged_files().is_empty(), "staged upload leaked on failure");

    let lookup = ctx
        .store
        .find_user_by_username_or_email(Some("hank"), None)
        .await
        .unwrap();
    assert!(lookup.is_none());
}

#[tokio::test]
async fn test_register_cover_upload_failure_is_tolerated() {
    let ctx = TestContext::new();

    let form = TestContext::registration_form("ivy", "ivy@example.com", "password123")
        .file("coverImage", "cover.png", FAIL_UPLOAD);
    let response = ctx
        .send_multipart("POST", "/api/v1/users/register", None, form)
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert!(response.body["data"]["coverImage"].is_null());
    assert!(ctx.staged_files().is_empty());
}

#[tokio::test]
async fn test_login_issues_tokens_and_cookies() {
    let ctx = TestContext::new();
    ctx.register("jack", "jack@example.com", "password123").await;

    let response = ctx
        .send_json(
            "POST",
            "/api/v1/users/login",
            None,
            json!({ "email": "JACK@example.com", "password": "password123" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    let data = &response.body["data"];
    assert_eq!(data["user"]["username"], "jack");
    assert_no_secrets(&data["user"]);

    let access = data["accessToken"].as_str().unwrap();
    let refresh = data["refreshToken"].as_str().unwrap();
    assert_ne!(access, refresh);

    let access_cookie = response.set_cookie("accessToken").expect("access cookie");
    assert!(access_cookie.starts_with(&format!("accessToken={};", access)));
    assert!(access_cookie.contains("HttpOnly"));
    assert!(access_cookie.contains("Secure"));
    assert!(access_cookie.contains("Max-Age=900"));

    let refresh_cookie = response.set_cookie("refreshToken").expect("refresh cookie");
    assert!(refresh_cookie.contains(&format!("Max-Age={}", 7 * 24 * 3600)));

    let stored = ctx
        .store
        .find_user_by_username_or_email(Some("jack"), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some(refresh));
}

#[tokio::test]
async fn test_login_failures() {
    let ctx = TestContext::new();
    ctx.register("kate", "kate@example.com", "password123").await;

    let response = ctx
        .send_json("POST", "/api/v1/users/login", None, json!({ "password": "x" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "Username or email is required");

    let response = ctx.login("nobody", "password123").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.message(), "User does not exist");

    let response = ctx.login("kate", "wrong-password").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.message(), "Invalid user credentials");
    assert!(response.set_cookies().is_empty());
}

#[tokio::test]
async fn test_wrong_method_on_secured_route_is_not_allowed() {
    let ctx = TestContext::new();

    let response = ctx.get("/api/v1/users/logout", None).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);

    let response = ctx.get("/api/v1/users/current-user", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_access_token_from_cookie_or_header() {
    let ctx = TestContext::new();
    let session = ctx.signed_in("liam").await;

    let via_header = ctx
        .get("/api/v1/users/current-user", Some(&session.access_token))
        .await;
    assert_eq!(via_header.status, StatusCode::OK);
    assert_eq!(via_header.body["data"]["username"], "liam");
    assert_no_secrets(&via_header.body["data"]);

    let request = Request::builder()
        .uri("/api/v1/users/current-user")
        .header(header::COOKIE, format!("accessToken={}", session.access_token))
        .body(Body::empty())
        .unwrap();
    let via_cookie = ctx.send(request).await;
    assert_eq!(via_cookie.status, StatusCode::OK);
    assert_eq!(via_cookie.body["data"]["id"], session.user["id"]);
}

#[tokio::test]
async fn test_access_token_failures_are_distinct() {
    let ctx = TestContext::new();
    let session = ctx.signed_in("mia").await;

    let missing = ctx.get("/api/v1/users/current-user", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.message(), "Access token is required");

    let malformed = ctx
        .get("/api/v1/users/current-user", Some("not.a.token"))
        .await;
    assert_eq!(malformed.status, StatusCode::UNAUTHORIZED);
    assert_eq!(malformed.message(), "Invalid access token");

    // A refresh token is signed with the other secret
    let wrong_kind = ctx
        .get("/api/v1/users/current-user", Some(&session.refresh_token))
        .await;
    assert_eq!(wrong_kind.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_kind.message(), "Invalid access token");

    let expired_ctx = TestContext::with_token_expiry(Duration::minutes(-5), Duration::days(7));
    let expired_session = expired_ctx.signed_in("mia").await;
    let expired = expired_ctx
        .get("/api/v1/users/current-user", Some(&expired_session.access_token))
        .await;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    assert_eq!(expired.message(), "Access token expired");
}

#[tokio::test]
async fn test_access_token_for_unknown_user() {
    let ctx = TestContext::new();

    let ghost = User {
        id: Uuid::new_v4(),
        username: "ghost".to_string(),
        email: "ghost@example.com".to_string(),
        full_name: "Ghost".to_string(),
        avatar: "https://media.test/ghost.png".to_string(),
        cover_image: None,
        watch_history: Vec::new(),
        password_hash: String::new(),
        refresh_token: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let token = create_token(
        &AccessClaims::for_user(&ghost, Duration::minutes(5)),
        ACCESS_SECRET,
    )
    .unwrap();

    let response = ctx.get("/api/v1/users/current-user", Some(&token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.message(), "User for this token no longer exists");
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let ctx = TestContext::new();
    let session = ctx.signed_in("noah").await;

    let response = ctx
        .send_json(
            "POST",
            "/api/v1/users/refresh-token",
            None,
            json!({ "refreshToken": session.refresh_token }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let new_refresh = response.body["data"]["refreshToken"].as_str().unwrap();
    let new_access = response.body["data"]["accessToken"].as_str().unwrap();
    assert_ne!(new_refresh, session.refresh_token);
    assert!(response.set_cookie("refreshToken").is_some());

    let stored = ctx.store.find_user_by_id(session.id()).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some(new_refresh));

    let me = ctx.get("/api/v1/users/current-user", Some(new_access)).await;
    assert_eq!(me.status, StatusCode::OK);

    // The rotated-out token is no longer accepted
    let replay = ctx
        .send_json(
            "POST",
            "/api/v1/users/refresh-token",
            None,
            json!({ "refreshToken": session.refresh_token }),
        )
        .await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    assert_eq!(replay.message(), "Refresh token is expired or used");
}

#[tokio::test]
async fn test_refresh_from_cookie() {
    let ctx = TestContext::new();
    let session = ctx.signed_in("olga").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/users/refresh-token")
        .header(header::COOKIE, format!("refreshToken={}", session.refresh_token))
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert!(response.body["data"]["accessToken"].is_string());
}

#[tokio::test]
async fn test_refresh_failures() {
    let ctx = TestContext::new();
    ctx.signed_in("paul").await;

    let missing = ctx
        .send_json("POST", "/api/v1/users/refresh-token", None, json!({}))
        .await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.message(), "Refresh token is required");

    let garbage = ctx
        .send_json(
            "POST",
            "/api/v1/users/refresh-token",
            None,
            json!({ "refreshToken": "garbage" }),
        )
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.message(), "Invalid refresh token");

    let expired_ctx = TestContext::with_token_expiry(Duration::minutes(15), Duration::minutes(-5));
    let session = expired_ctx.signed_in("paul").await;
    let expired = expired_ctx
        .send_json(
            "POST",
            "/api/v1/users/refresh-token",
            None,
            json!({ "refreshToken": session.refresh_token }),
        )
        .await;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    assert_eq!(expired.message(), "Refresh token expired");
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let ctx = TestContext::new();
    let session = ctx.signed_in("quinn").await;

    let logout = ctx
        .send_json(
            "POST",
            "/api/v1/users/logout",
            Some(&session.access_token),
            json!({}),
        )
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.body["data"].is_null());
    for name in ["accessToken", "refreshToken"] {
        let cookie = logout.set_cookie(name).expect("cookie removal");
        assert!(cookie.contains("Max-Age=0"), "{}", cookie);
    }

    let stored = ctx.store.find_user_by_id(session.id()).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());

    let refresh = ctx
        .send_json(
            "POST",
            "/api/v1/users/refresh-token",
            None,
            json!({ "refreshToken": session.refresh_token }),
        )
        .await;
    assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);

    // Logging out again is harmless
    let again = ctx
        .send_json(
            "POST",
            "/api/v1/users/logout",
            Some(&session.access_token),
            json!({}),
        )
        .await;
    assert_eq!(again.status, StatusCode::OK);
}

#[tokio::test]
async fn test_change_password() {
    let ctx = TestContext::new();
    let session = ctx.signed_in("rose").await;

    let wrong = ctx
        .send_json(
            "POST",
            "/api/v1/users/change-password",
            Some(&session.access_token),
            json!({ "oldPassword": "not-it", "newPassword": "brand-new-pass" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.message(), "Invalid old password");

    let too_short = ctx
        .send_json(
            "POST",
            "/api/v1/users/change-password",
            Some(&session.access_token),
            json!({ "oldPassword": "password123", "newPassword": "123" }),
        )
        .await;
    assert_eq!(too_short.status, StatusCode::BAD_REQUEST);

    let changed = ctx
        .send_json(
            "POST",
            "/api/v1/users/change-password",
            Some(&session.access_token),
            json!({ "oldPassword": "password123", "newPassword": "brand-new-pass" }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK, "{}", changed.body);

    assert_eq!(
        ctx.login("rose", "password123").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(ctx.login("rose", "brand-new-pass").await.status, StatusCode::OK);
}

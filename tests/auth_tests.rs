//! Session lifecycle tests: register, login, refresh, logout, and the
//! revocation behavior around blocking.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use userhub::password::verify_password;

#[tokio::test]
async fn register_rejects_missing_fields() {
    let t = common::setup().await;

    for body in [
        json!({}),
        json!({ "name": "Alice" }),
        json!({ "name": "Alice", "email": "a@x.com" }),
        json!({ "name": "  ", "email": "a@x.com", "password": "pw" }),
        json!({ "name": "Alice", "email": "", "password": "pw" }),
    ] {
        let (status, resp) = t.request("POST", "/api/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["message"], "All fields are required");
        assert_eq!(resp["code"], "VALIDATION");
    }
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let t = common::setup().await;
    t.register("Alice", "alice@example.com", "secret123").await;

    let (status, resp) = t
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Clone", "email": "alice@example.com", "password": "other" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "User already exists");
    assert_eq!(resp["code"], "DUPLICATE_EMAIL");
}

#[tokio::test]
async fn password_is_stored_hashed_and_verifies() {
    let t = common::setup().await;
    t.register("Alice", "alice@example.com", "secret123").await;

    let user = t
        .db
        .users()
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(user.password_hash, "secret123");
    assert!(user.password_hash.starts_with("$2"));
    assert!(verify_password("secret123", &user.password_hash).unwrap());
    assert!(!verify_password("wrong", &user.password_hash).unwrap());
}

#[tokio::test]
async fn login_issues_tokens_for_the_right_user() {
    let t = common::setup().await;
    let uuid = t.register("Alice", "alice@example.com", "secret123").await;
    let login = t.login("alice@example.com", "secret123").await;

    assert_eq!(login["user"]["id"], uuid.as_str());
    assert_eq!(login["user"]["role"], "user");

    // Both tokens embed the user's public id, each validated by its own secret
    let access = login["accessToken"].as_str().unwrap();
    let refresh = login["refreshToken"].as_str().unwrap();

    let claims = t.tokens.validate_access(access).unwrap();
    assert_eq!(claims.sub, uuid);
    assert!(claims.exp - claims.iat <= 900);

    let claims = t.tokens.validate_refresh(refresh).unwrap();
    assert_eq!(claims.sub, uuid);

    // The refresh token is persisted as the single active session
    let user = t.db.users().find_by_uuid(&uuid).await.unwrap().unwrap();
    assert_eq!(user.refresh_token.as_deref(), Some(refresh));
}

#[tokio::test]
async fn login_rejects_unknown_user_and_bad_password() {
    let t = common::setup().await;
    t.register("Alice", "alice@example.com", "secret123").await;

    let (status, resp) = t
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "User not found");

    let (status, resp) = t
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Invalid credentials");
    assert_eq!(resp["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn blocked_check_runs_before_credential_check() {
    let t = common::setup().await;
    let uuid = t.register("Alice", "alice@example.com", "secret123").await;
    t.db.users().set_blocked(&uuid, true).await.unwrap();

    // Even with a wrong password, the blocked signal wins: the endpoint
    // must not reveal whether the credentials were valid.
    for password in ["secret123", "definitely-wrong"] {
        let (status, resp) = t
            .request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": "alice@example.com", "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(resp["code"], "ACCOUNT_BLOCKED");
        assert!(resp["message"].as_str().unwrap().contains("blocked"));
    }
}

#[tokio::test]
async fn refresh_returns_new_access_token() {
    let t = common::setup().await;
    let uuid = t.register("Alice", "alice@example.com", "secret123").await;
    let login = t.login("alice@example.com", "secret123").await;
    let refresh = login["refreshToken"].as_str().unwrap();

    let (status, resp) = t
        .request(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let claims = t
        .tokens
        .validate_access(resp["accessToken"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, uuid);
}

#[tokio::test]
async fn refresh_requires_a_token() {
    let t = common::setup().await;

    let (status, resp) = t
        .request("POST", "/api/auth/refresh", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["message"], "No token provided");
}

#[tokio::test]
async fn refresh_rejects_forged_token() {
    let t = common::setup().await;
    let uuid = t.register("Alice", "alice@example.com", "secret123").await;
    t.login("alice@example.com", "secret123").await;

    // Same claims, wrong signing key
    let forger = userhub::jwt::TokenIssuer::new(
        b"attacker-chosen-access-secret!!!",
        b"attacker-chosen-refresh-secret!!",
    );
    let forged = forger.issue_refresh(&uuid).unwrap().token;

    let (status, resp) = t
        .request(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "token": forged })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn logout_revokes_the_refresh_token() {
    let t = common::setup().await;
    let uuid = t.register("Alice", "alice@example.com", "secret123").await;
    let login = t.login("alice@example.com", "secret123").await;
    let refresh = login["refreshToken"].as_str().unwrap();

    let (status, _) = t
        .request(
            "POST",
            "/api/auth/logout",
            None,
            Some(json!({ "userId": uuid })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The token is still signature-valid and unexpired, but no longer stored
    let (status, resp) = t
        .request(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["message"], "Invalid refresh token");
}

#[tokio::test]
async fn logout_is_idempotent_and_requires_user_id() {
    let t = common::setup().await;

    let (status, resp) = t
        .request("POST", "/api/auth/logout", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "User ID is required to logout");

    // Unknown id still succeeds: the end state (no session) already holds
    let (status, _) = t
        .request(
            "POST",
            "/api/auth/logout",
            None,
            Some(json!({ "userId": "no-such-user" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn second_login_invalidates_first_refresh_token() {
    let t = common::setup().await;
    t.register("Alice", "alice@example.com", "secret123").await;

    let first = t.login("alice@example.com", "secret123").await;
    let second = t.login("alice@example.com", "secret123").await;
    let first_refresh = first["refreshToken"].as_str().unwrap();
    let second_refresh = second["refreshToken"].as_str().unwrap();

    let (status, _) = t
        .request(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "token": first_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .request(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "token": second_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn blocked_refresh_clears_stored_token_permanently() {
    let t = common::setup().await;
    let uuid = t.register("Alice", "alice@example.com", "secret123").await;
    let login = t.login("alice@example.com", "secret123").await;
    let refresh = login["refreshToken"].as_str().unwrap();

    t.db.users().set_blocked(&uuid, true).await.unwrap();

    let (status, resp) = t
        .request(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["code"], "ACCOUNT_BLOCKED");

    let user = t.db.users().find_by_uuid(&uuid).await.unwrap().unwrap();
    assert!(user.refresh_token.is_none());

    // Unblocking does not resurrect the old session; a new login is required
    t.db.users().set_blocked(&uuid, false).await.unwrap();
    let (status, _) = t
        .request(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    t.login("alice@example.com", "secret123").await;
}

#[tokio::test]
async fn access_token_keeps_working_while_blocked() {
    let t = common::setup().await;
    t.register("Alice", "alice@example.com", "secret123").await;
    let login = t.login("alice@example.com", "secret123").await;
    let access = login["accessToken"].as_str().unwrap();
    let uuid = login["user"]["id"].as_str().unwrap();

    t.db.users().set_blocked(uuid, true).await.unwrap();

    // Access-token validation is stateless: blocking takes effect at the
    // refresh boundary, not on already-issued tokens.
    let (status, resp) = t.request("GET", "/api/users/profile", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["email"], "alice@example.com");
}

#[tokio::test]
async fn full_session_lifecycle() {
    let t = common::setup().await;

    let (status, resp) = t
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "A", "email": "a@x.com", "password": "pw12345" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resp["message"], "User registered successfully");
    assert_eq!(resp["user"]["email"], "a@x.com");

    let login = t.login("a@x.com", "pw12345").await;
    assert_eq!(login["message"], "Login successful");
    assert!(login["accessToken"].is_string());
    assert!(login["refreshToken"].is_string());
    assert_eq!(login["user"]["role"], "user");

    let user_id = login["user"]["id"].as_str().unwrap();
    let (status, resp) = t
        .request(
            "POST",
            "/api/auth/logout",
            None,
            Some(json!({ "userId": user_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["message"], "Logout successful");

    let (status, _) = t
        .request(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "token": login["refreshToken"] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

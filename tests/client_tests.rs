//! Client interceptor tests against a live listener: bearer attachment,
//! the single refresh-and-replay, and forced logout on blocked accounts.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{Json, Router, http::StatusCode, routing::get, routing::post};
use serde_json::json;
use tempfile::TempDir;
use userhub::client::{ApiClient, ClientError, SessionContext, SessionUser};
use userhub::db::Database;
use userhub::jwt::TokenIssuer;
use userhub::{ServerConfig, start_server};

struct LiveServer {
    client: ApiClient,
    db: Database,
    tokens: TokenIssuer,
    _uploads: TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for LiveServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn spawn_server() -> LiveServer {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let uploads = tempfile::tempdir().expect("Failed to create uploads dir");

    let config = ServerConfig {
        db: db.clone(),
        access_secret: common::ACCESS_SECRET.to_vec(),
        refresh_secret: common::REFRESH_SECRET.to_vec(),
        access_ttl_secs: 900,
        refresh_ttl_secs: 604800,
        uploads_dir: uploads.path().to_path_buf(),
    };

    let (handle, addr) = start_server(config, 0).await;
    let client = ApiClient::new(&format!("http://{}/api", addr)).expect("Bad base url");

    LiveServer {
        client,
        db,
        tokens: TokenIssuer::new(common::ACCESS_SECRET, common::REFRESH_SECRET),
        _uploads: uploads,
        handle,
    }
}

async fn register_and_login(server: &LiveServer) -> SessionUser {
    server
        .client
        .register("Alice", "alice@example.com", "secret123")
        .await
        .expect("register failed");
    server
        .client
        .login("alice@example.com", "secret123")
        .await
        .expect("login failed")
}

#[tokio::test]
async fn login_starts_a_session_and_profile_works() {
    let server = spawn_server().await;
    let user = register_and_login(&server).await;
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.role, "user");

    let profile = server.client.get_json("users/profile").await.unwrap();
    assert_eq!(profile["email"], "alice@example.com");

    server.client.logout().await.unwrap();
    assert!(server.client.session().await.is_none());
}

#[tokio::test]
async fn stale_access_token_is_refreshed_and_replayed() {
    let server = spawn_server().await;
    let user = register_and_login(&server).await;

    // Simulate an expired access token while the refresh token is still good
    let session = server.client.session().await.unwrap();
    server
        .client
        .restore_session(SessionContext {
            access_token: "stale-access-token".to_string(),
            refresh_token: session.refresh_token.clone(),
            user: user.clone(),
        })
        .await;

    let profile = server.client.get_json("users/profile").await.unwrap();
    assert_eq!(profile["email"], "alice@example.com");

    // The session now carries a fresh, valid access token
    let rotated = server.client.session().await.unwrap();
    assert_ne!(rotated.access_token, "stale-access-token");
    let claims = server.tokens.validate_access(&rotated.access_token).unwrap();
    assert_eq!(claims.sub, user.id);
}

#[tokio::test]
async fn dead_refresh_token_forces_logout() {
    let server = spawn_server().await;
    let user = register_and_login(&server).await;

    server
        .client
        .restore_session(SessionContext {
            access_token: "stale-access-token".to_string(),
            refresh_token: "stale-refresh-token".to_string(),
            user,
        })
        .await;

    let err = server.client.get_json("users/profile").await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
    assert!(server.client.session().await.is_none());
}

#[tokio::test]
async fn blocked_account_is_forced_out_at_refresh() {
    let server = spawn_server().await;
    let user = register_and_login(&server).await;
    let session = server.client.session().await.unwrap();

    server.db.users().set_blocked(&user.id, true).await.unwrap();

    // A stale access token sends the client through the refresh path,
    // where the blocked gate fires
    server
        .client
        .restore_session(SessionContext {
            access_token: "stale-access-token".to_string(),
            refresh_token: session.refresh_token.clone(),
            user: user.clone(),
        })
        .await;

    let err = server.client.get_json("users/profile").await.unwrap_err();
    assert!(matches!(err, ClientError::Blocked { .. }));
    assert!(server.client.session().await.is_none());

    // The server cleared the stored refresh token as well
    let record = server.db.users().find_by_uuid(&user.id).await.unwrap().unwrap();
    assert!(record.refresh_token.is_none());
}

#[tokio::test]
async fn blocked_login_surfaces_as_blocked() {
    let server = spawn_server().await;
    let user = register_and_login(&server).await;
    server.client.logout().await.unwrap();

    server.db.users().set_blocked(&user.id, true).await.unwrap();

    let err = server
        .client
        .login("alice@example.com", "secret123")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Blocked { .. }));
}

#[tokio::test]
async fn unexpired_access_token_outlives_a_block() {
    let server = spawn_server().await;
    let user = register_and_login(&server).await;

    server.db.users().set_blocked(&user.id, true).await.unwrap();

    // Access-token validation is stateless, so the still-valid token works
    // until it expires; only the refresh path notices the block
    let profile = server.client.get_json("users/profile").await.unwrap();
    assert_eq!(profile["email"], "alice@example.com");
}

/// A request that still gets 401 after a successful refresh is returned
/// as-is: the interceptor never refreshes twice for one request.
#[tokio::test]
async fn interceptor_replays_exactly_once() {
    let protected_hits = Arc::new(AtomicUsize::new(0));
    let refresh_hits = Arc::new(AtomicUsize::new(0));

    let stub = {
        let protected_hits = protected_hits.clone();
        let refresh_hits = refresh_hits.clone();
        Router::new()
            .route(
                "/api/things",
                get(move || {
                    protected_hits.fetch_add(1, Ordering::SeqCst);
                    async { StatusCode::UNAUTHORIZED }
                }),
            )
            .route(
                "/api/auth/refresh",
                post(move || {
                    refresh_hits.fetch_add(1, Ordering::SeqCst);
                    async { Json(json!({ "accessToken": "fresh-token" })) }
                }),
            )
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, stub).await.ok();
    });

    let client = ApiClient::new(&format!("http://{}/api", addr)).unwrap();
    client
        .restore_session(SessionContext {
            access_token: "initial".to_string(),
            refresh_token: "refresh".to_string(),
            user: SessionUser {
                id: "u1".to_string(),
                name: "U".to_string(),
                email: "u@example.com".to_string(),
                role: "user".to_string(),
            },
        })
        .await;

    let err = client.get_json("things").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Api {
            status: StatusCode::UNAUTHORIZED,
            ..
        }
    ));

    assert_eq!(refresh_hits.load(Ordering::SeqCst), 1);
    assert_eq!(protected_hits.load(Ordering::SeqCst), 2);

    // The refreshed token was stored even though the replay failed
    assert_eq!(
        client.session().await.unwrap().access_token,
        "fresh-token"
    );

    handle.abort();
}

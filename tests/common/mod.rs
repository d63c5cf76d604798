#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::util::ServiceExt;
use userhub::db::Database;
use userhub::jwt::TokenIssuer;
use userhub::{ServerConfig, create_app};

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-for-integration!!";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-for-integration!";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    /// An issuer sharing the app's secrets, for minting tokens directly.
    pub tokens: TokenIssuer,
    pub uploads: TempDir,
}

pub async fn setup() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let uploads = tempfile::tempdir().expect("Failed to create uploads dir");

    let config = ServerConfig {
        db: db.clone(),
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        access_ttl_secs: 900,
        refresh_ttl_secs: 604800,
        uploads_dir: uploads.path().to_path_buf(),
    };
    let app = create_app(&config);

    TestApp {
        app,
        db,
        tokens: TokenIssuer::new(ACCESS_SECRET, REFRESH_SECRET),
        uploads,
    }
}

impl TestApp {
    /// Fire one request at the router and parse the JSON response.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("Failed to build request"),
            None => builder.body(Body::empty()).expect("Failed to build request"),
        };

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Fire one request with an explicit content type and raw body.
    pub async fn request_raw(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        content_type: &str,
        body: Vec<u8>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(body)).expect("Failed to build request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Register an account through the API. Panics on failure.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["user"]["id"].as_str().expect("missing user id").to_string()
    }

    /// Log in and return the full response body (tokens + user).
    pub async fn login(&self, email: &str, password: &str) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body
    }

    /// Create an admin account directly in the database and return
    /// (uuid, access token).
    pub async fn seed_admin(&self, email: &str) -> (String, String) {
        let uuid = uuid::Uuid::new_v4().to_string();
        let hash = userhub::password::hash_password("admin-password").unwrap();
        self.db
            .users()
            .create(&uuid, "Admin", email, &hash, userhub::db::UserRole::Admin, false)
            .await
            .expect("Failed to seed admin");
        let token = self.tokens.issue_access(&uuid).unwrap().token;
        (uuid, token)
    }
}

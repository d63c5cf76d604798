//! HTTP client with the refresh-then-retry interceptor.
//!
//! Every authenticated request goes through [`ApiClient::send`]:
//! the bearer token is attached from the current session; a 401 triggers
//! exactly one refresh-and-replay; a 403 carrying the `ACCOUNT_BLOCKED`
//! code is a forced logout and is never retried.

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use super::session::{SessionContext, SessionUser};

/// Machine-readable error code that marks an administratively blocked
/// account; the server sends it on login, refresh, and any gated request.
const BLOCKED_CODE: &str = "ACCOUNT_BLOCKED";

#[derive(Debug)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, malformed response).
    Http(reqwest::Error),
    /// The server answered with a non-success status.
    Api {
        status: StatusCode,
        message: String,
        code: String,
    },
    /// The account was blocked by an admin; the session has been cleared.
    Blocked { message: String },
    /// The refresh token no longer validates; the session has been cleared
    /// and the user must log in again.
    SessionExpired,
    /// An authenticated call was made with no session.
    NotLoggedIn,
    InvalidBaseUrl(url::ParseError),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Http(e) => write!(f, "http error: {}", e),
            ClientError::Api {
                status, message, ..
            } => write!(f, "api error {}: {}", status, message),
            ClientError::Blocked { message } => write!(f, "account blocked: {}", message),
            ClientError::SessionExpired => write!(f, "session expired, login required"),
            ClientError::NotLoggedIn => write!(f, "not logged in"),
            ClientError::InvalidBaseUrl(e) => write!(f, "invalid base url: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e)
    }
}

/// Client for the account service API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: RwLock<Option<SessionContext>>,
}

impl ApiClient {
    /// Create a client for the given API base, e.g. `http://host:port/api`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        // A trailing slash makes Url::join treat the base as a directory.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(ClientError::InvalidBaseUrl)?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            session: RwLock::new(None),
        })
    }

    /// The current session, if any.
    pub async fn session(&self) -> Option<SessionContext> {
        self.session.read().await.clone()
    }

    /// Adopt a previously saved session (tokens from persistent storage).
    pub async fn restore_session(&self, ctx: SessionContext) {
        *self.session.write().await = Some(ctx);
    }

    /// Drop the session without calling the server.
    pub async fn clear_session(&self) {
        *self.session.write().await = None;
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(ClientError::InvalidBaseUrl)
    }

    /// One request on the wire: bearer attached if a session exists, body
    /// parsed as JSON (null when the body is empty or not JSON).
    async fn request_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value), ClientError> {
        let url = self.endpoint(path)?;
        let mut request = self.http.request(method.clone(), url);

        if let Some(session) = self.session.read().await.as_ref() {
            request = request.bearer_auth(&session.access_token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Ok((status, value))
    }

    /// Authenticated request with the retry interceptor applied.
    ///
    /// A 401 response triggers one refresh followed by one replay; the
    /// replayed request's 401 is returned as-is. A blocked signal clears
    /// the session immediately, before and after the replay alike.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let (status, payload) = self.request_once(&method, path, body.as_ref()).await?;

        if is_blocked(status, &payload) {
            self.clear_session().await;
            return Err(ClientError::Blocked {
                message: message_of(&payload),
            });
        }

        if status != StatusCode::UNAUTHORIZED {
            return result_of(status, payload);
        }

        debug!(path, "Access token rejected, attempting refresh");
        self.refresh_access().await?;

        let (status, payload) = self.request_once(&method, path, body.as_ref()).await?;
        if is_blocked(status, &payload) {
            self.clear_session().await;
            return Err(ClientError::Blocked {
                message: message_of(&payload),
            });
        }
        result_of(status, payload)
    }

    /// Exchange the stored refresh token for a new access token. Any
    /// failure is terminal for the session.
    async fn refresh_access(&self) -> Result<(), ClientError> {
        let refresh_token = match self.session.read().await.as_ref() {
            Some(session) => session.refresh_token.clone(),
            None => return Err(ClientError::NotLoggedIn),
        };

        let (status, payload) = self
            .request_once(
                &Method::POST,
                "auth/refresh",
                Some(&json!({ "token": refresh_token })),
            )
            .await?;

        if is_blocked(status, &payload) {
            self.clear_session().await;
            return Err(ClientError::Blocked {
                message: message_of(&payload),
            });
        }
        if !status.is_success() {
            self.clear_session().await;
            return Err(ClientError::SessionExpired);
        }

        let Some(access_token) = payload
            .get("accessToken")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            self.clear_session().await;
            return Err(ClientError::SessionExpired);
        };

        if let Some(session) = self.session.write().await.as_mut() {
            session.access_token = access_token;
        }
        Ok(())
    }

    /// Create an account. Does not start a session.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Value, ClientError> {
        let (status, payload) = self
            .request_once(
                &Method::POST,
                "auth/register",
                Some(&json!({ "name": name, "email": email, "password": password })),
            )
            .await?;
        result_of(status, payload)
    }

    /// Log in and start a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, ClientError> {
        let (status, payload) = self
            .request_once(
                &Method::POST,
                "auth/login",
                Some(&json!({ "email": email, "password": password })),
            )
            .await?;

        if is_blocked(status, &payload) {
            return Err(ClientError::Blocked {
                message: message_of(&payload),
            });
        }
        if !status.is_success() {
            return Err(api_error(status, payload));
        }

        let session: SessionContext =
            serde_json::from_value(payload).map_err(|_| ClientError::SessionExpired)?;
        let user = session.user.clone();
        *self.session.write().await = Some(session);
        Ok(user)
    }

    /// Log out: revoke the refresh token server-side, then drop the session.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let Some(session) = self.session.write().await.take() else {
            return Err(ClientError::NotLoggedIn);
        };

        let (status, payload) = self
            .request_once(
                &Method::POST,
                "auth/logout",
                Some(&json!({ "userId": session.user.id })),
            )
            .await?;
        if !status.is_success() {
            return Err(api_error(status, payload));
        }
        Ok(())
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put_json(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        self.send(Method::PUT, path, Some(body)).await
    }
}

fn is_blocked(status: StatusCode, payload: &Value) -> bool {
    status == StatusCode::FORBIDDEN
        && payload.get("code").and_then(Value::as_str) == Some(BLOCKED_CODE)
}

fn message_of(payload: &Value) -> String {
    payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Account blocked")
        .to_string()
}

fn api_error(status: StatusCode, payload: Value) -> ClientError {
    ClientError::Api {
        status,
        message: payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string(),
        code: payload
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
    }
}

fn result_of(status: StatusCode, payload: Value) -> Result<Value, ClientError> {
    if status.is_success() {
        Ok(payload)
    } else {
        Err(api_error(status, payload))
    }
}

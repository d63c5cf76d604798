//! JWT token generation and validation.
//!
//! Access and refresh tokens are signed with independent secrets, so a
//! refresh token can never be presented where an access token is expected
//! even if the `typ` claim were forged.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived access token (15 minutes) - stateless, never persisted
    Access,
    /// Long-lived refresh token (7 days) - persisted on the user record
    Refresh,
}

/// JWT claims shared by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (public user UUID)
    pub sub: String,
    /// Token type
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Default access token duration: 15 minutes
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;

/// Default refresh token duration: 7 days
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// A freshly minted token with its expiry metadata.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// Mints and validates access and refresh tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl: u64,
    refresh_ttl: u64,
}

impl TokenIssuer {
    /// Create a token issuer with the given secrets and default expiries.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self::with_ttls(
            access_secret,
            refresh_secret,
            DEFAULT_ACCESS_TTL_SECS,
            DEFAULT_REFRESH_TTL_SECS,
        )
    }

    /// Create a token issuer with explicit expiry overrides.
    pub fn with_ttls(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: u64,
        refresh_ttl: u64,
    ) -> Self {
        Self {
            access: KeyPair::new(access_secret),
            refresh: KeyPair::new(refresh_secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> u64 {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> u64 {
        self.refresh_ttl
    }

    fn now() -> Result<u64, TokenError> {
        Ok(SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::TimeError)?
            .as_secs())
    }

    fn issue(
        &self,
        keys: &KeyPair,
        kind: TokenKind,
        sub: &str,
        ttl: u64,
    ) -> Result<IssuedToken, TokenError> {
        let now = Self::now()?;
        let exp = now + ttl;

        let claims = Claims {
            sub: sub.to_string(),
            kind,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &keys.encoding)
            .map_err(TokenError::Encoding)?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
            duration: ttl,
        })
    }

    fn validate(&self, keys: &KeyPair, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<Claims>(token, &keys.decoding, &validation)
            .map_err(TokenError::Decoding)?;

        if token_data.claims.kind != kind {
            return Err(TokenError::WrongTokenKind);
        }

        Ok(token_data.claims)
    }

    /// Generate an access token for a user.
    pub fn issue_access(&self, user_uuid: &str) -> Result<IssuedToken, TokenError> {
        self.issue(&self.access, TokenKind::Access, user_uuid, self.access_ttl)
    }

    /// Generate a refresh token for a user.
    pub fn issue_refresh(&self, user_uuid: &str) -> Result<IssuedToken, TokenError> {
        self.issue(&self.refresh, TokenKind::Refresh, user_uuid, self.refresh_ttl)
    }

    /// Validate and decode an access token.
    pub fn validate_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate(&self.access, TokenKind::Access, token)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate(&self.refresh, TokenKind::Refresh, token)
    }
}

/// Errors that can occur during token operations.
#[derive(Debug)]
pub enum TokenError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token (bad signature, expired, malformed)
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// Wrong token kind (e.g., using a refresh token as an access token)
    WrongTokenKind,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            TokenError::TimeError => write!(f, "System time error"),
            TokenError::WrongTokenKind => write!(f, "Wrong token kind"),
        }
    }
}

impl std::error::Error for TokenError {}

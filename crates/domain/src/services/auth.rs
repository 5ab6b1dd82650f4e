//! Authentication collaborator and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Role attached to an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Supplier,
    Admin,
}

/// Identity of the caller, resolved from request metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    pub role: UserRole,
}

impl Claims {
    pub fn new(user_id: UserId, role: UserRole) -> Self {
        Self { user_id, role }
    }
}

/// Request headers propagated to the auth collaborator.
///
/// Keys are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    headers: HashMap<String, String>,
}

impl RequestMetadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates metadata carrying only a bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new().with("authorization", format!("Bearer {}", token.into()))
    }

    /// Adds a header.
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a header, replacing any previous value.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Returns a header value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the token from the `authorization` header, with an optional
    /// `Bearer ` prefix removed.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.get("authorization")?.trim();
        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .unwrap_or(value)
            .trim();
        (!token.is_empty()).then_some(token)
    }
}

/// Errors returned by the auth collaborator.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,

    #[error("Invalid authorization token")]
    InvalidToken,

    #[error("Auth service unavailable: {0}")]
    Unavailable(String),
}

/// Resolves the caller's identity.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Returns the claims for the identity carried by `metadata`.
    async fn claims(&self, metadata: &RequestMetadata) -> Result<Claims, AuthError>;
}

#[derive(Debug, Default)]
struct InMemoryAuthState {
    tokens: HashMap<String, Claims>,
    fail: bool,
}

/// Token table auth service for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthService {
    state: Arc<RwLock<InMemoryAuthState>>,
}

impl InMemoryAuthService {
    /// Creates a new service with no known tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token.
    pub async fn register(&self, token: impl Into<String>, claims: Claims) {
        self.state.write().await.tokens.insert(token.into(), claims);
    }

    /// Configures the service to fail every lookup.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }
}

#[async_trait]
impl AuthService for InMemoryAuthService {
    async fn claims(&self, metadata: &RequestMetadata) -> Result<Claims, AuthError> {
        let state = self.state.read().await;
        if state.fail {
            return Err(AuthError::Unavailable("lookup disabled".to_string()));
        }

        let token = metadata.bearer_token().ok_or(AuthError::MissingToken)?;
        state
            .tokens
            .get(token)
            .copied()
            .ok_or(AuthError::InvalidToken)
    }
}

//! Remote row store and auth service client.

/// GoTrue-style password auth endpoints.
pub mod auth;
/// In-memory gateway used by the tests.
#[cfg(test)]
pub mod memory;
/// PostgREST-style row endpoints and the `RestGateway` implementation.
pub mod rest;
/// Session persistence between runs.
pub mod session_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

pub use rest::RestGateway;

/// Failures reported by the remote service or the transport to it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not signed in")]
    Unauthenticated,
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Authenticated user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Access credentials for one signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) after which the access token is stale.
    pub expires_at: i64,
    pub user: SessionUser,
}

impl Session {
    /// True when the access token has passed its expiry.
    pub fn is_expired(&self, now_unix: i64) -> bool {
        now_unix >= self.expires_at
    }
}

/// Row-level data and auth operations the client depends on.
///
/// Lookups and writes take table and column names as plain strings; the
/// caller owns the schema knowledge.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// Fetch the single row whose `key_column` equals `key_value`.
    async fn select_by_key(
        &self,
        table: &str,
        key_column: &str,
        key_value: &str,
    ) -> Result<Option<Value>, GatewayError>;

    /// Insert all rows in one request.
    async fn insert_rows(&self, table: &str, rows: Vec<Value>) -> Result<(), GatewayError>;

    /// Patch the row(s) whose `key_column` equals `key_value`.
    async fn update_row(
        &self,
        table: &str,
        key_column: &str,
        key_value: &str,
        patch: Value,
    ) -> Result<(), GatewayError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), GatewayError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError>;

    async fn sign_out(&self) -> Result<(), GatewayError>;

    /// Current session, refreshed first if it has expired.
    async fn get_session(&self) -> Option<Session>;

    /// Receiver notified every time the session is replaced or cleared.
    fn on_session_change(&self) -> watch::Receiver<Option<Session>>;
}

//! Row access over the `/rest/v1` endpoints and the production gateway.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;

use super::{Gateway, GatewayError, Session, auth, session_store::FileSessionStore};
use crate::config::GatewayCfg;

/// PostgREST code for "no rows returned for a single-object request".
const NO_ROWS_CODE: &str = "PGRST116";

/// Gateway backed by a hosted Postgres REST + auth service.
pub struct RestGateway {
    http: Client,
    /// Project URL without a trailing slash.
    base_url: String,
    /// Public (anon) API key sent with every request.
    anon_key: String,
    store: FileSessionStore,
    /// Current session; receivers are handed out by `on_session_change`.
    session: watch::Sender<Option<Session>>,
}

impl RestGateway {
    /// Build the HTTP client and restore any cached session.
    pub async fn connect(cfg: &GatewayCfg, store: FileSessionStore) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        let base_url = cfg.url.trim().trim_end_matches('/').to_string();
        let cached = store.load(&base_url).await;
        if cached.is_some() {
            tracing::info!("restored cached session");
        }
        let (session, _) = watch::channel(cached);
        Ok(Self {
            http,
            base_url,
            anon_key: cfg.anon_key.clone(),
            store,
            session,
        })
    }

    /// Access token of the signed-in user, or the anon key for public access.
    async fn bearer(&self) -> String {
        match self.current_session().await {
            Some(session) => session.access_token,
            None => self.anon_key.clone(),
        }
    }

    /// Current session, refreshed first when its access token has expired.
    /// A failed refresh signs the user out through the watch channel.
    async fn current_session(&self) -> Option<Session> {
        // Clone out so the watch borrow is released before any await.
        let current = self.session.borrow().clone()?;
        if !current.is_expired(Utc::now().timestamp()) {
            return Some(current);
        }

        tracing::info!("session expired, refreshing");
        match auth::refresh_session(
            &self.http,
            &self.base_url,
            &self.anon_key,
            &current.refresh_token,
        )
        .await
        {
            Ok(fresh) => {
                self.replace_session(Some(fresh.clone())).await;
                Some(fresh)
            }
            Err(e) => {
                tracing::warn!("session refresh failed: {e}");
                self.replace_session(None).await;
                None
            }
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Publish and persist a new session (or its absence).
    async fn replace_session(&self, session: Option<Session>) {
        let persisted = match &session {
            Some(s) => self.store.save(&self.base_url, s).await,
            None => self.store.clear(&self.base_url).await,
        };
        if let Err(e) = persisted {
            tracing::warn!("session cache not updated: {e}");
        }
        self.session.send_replace(session);
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn select_by_key(
        &self,
        table: &str,
        key_column: &str,
        key_value: &str,
    ) -> Result<Option<Value>, GatewayError> {
        let url = format!(
            "{}?select=*&{}=eq.{}&limit=1",
            self.table_url(table),
            key_column,
            urlencoding::encode(key_value)
        );
        let resp = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer().await)
            .send()
            .await?;
        let resp = match ensure_success(resp).await {
            Ok(resp) => resp,
            Err(GatewayError::Http { code: Some(code), .. }) if code == NO_ROWS_CODE => {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let rows = resp.json::<Vec<Value>>().await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_rows(&self, table: &str, rows: Vec<Value>) -> Result<(), GatewayError> {
        let resp = self
            .http
            .post(self.table_url(table))
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(self.bearer().await)
            .json(&rows)
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn update_row(
        &self,
        table: &str,
        key_column: &str,
        key_value: &str,
        patch: Value,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}?{}=eq.{}",
            self.table_url(table),
            key_column,
            urlencoding::encode(key_value)
        );
        let resp = self
            .http
            .patch(url)
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(self.bearer().await)
            .json(&patch)
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), GatewayError> {
        auth::sign_up(&self.http, &self.base_url, &self.anon_key, email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        let session =
            auth::sign_in_with_password(&self.http, &self.base_url, &self.anon_key, email, password)
                .await?;
        self.replace_session(Some(session.clone())).await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        let current = self.session.borrow().clone();
        let Some(current) = current else {
            return Ok(());
        };
        let revoked =
            auth::sign_out(&self.http, &self.base_url, &self.anon_key, &current.access_token).await;
        // The local session is dropped even when the revoke call fails.
        self.replace_session(None).await;
        revoked
    }

    async fn get_session(&self) -> Option<Session> {
        self.current_session().await
    }

    fn on_session_change(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}

/// Error body shapes returned by the REST and auth services.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Convert non-2xx responses into a structured error.
pub(super) async fn ensure_success(
    resp: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(http_error(status.as_u16(), &body))
}

/// Pick the most useful message out of an error body.
fn http_error(status: u16, body: &str) -> GatewayError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code.map(|c| match c {
        Value::String(s) => s,
        other => other.to_string(),
    });
    let message = parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| body.trim().to_string());
    GatewayError::Http {
        status,
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SessionUser;

    fn cached_session(expires_at: i64) -> Session {
        Session {
            access_token: "user-token".into(),
            refresh_token: "refresh".into(),
            expires_at,
            user: SessionUser {
                id: "u1".into(),
                email: Some("u1@example.com".into()),
            },
        }
    }

    /// Gateway pointed at a closed local port with `session` already cached.
    async fn offline_gateway(dir: &tempfile::TempDir, session: &Session) -> RestGateway {
        let cfg = GatewayCfg {
            url: "http://127.0.0.1:9".into(),
            anon_key: "anon".into(),
            request_timeout_secs: 2,
        };
        let store = FileSessionStore::new(dir.path().join("session.json"));
        store.save(&cfg.url, session).await.unwrap();
        RestGateway::connect(&cfg, store).await.unwrap()
    }

    #[tokio::test]
    async fn test_live_token_is_sent_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let gw = offline_gateway(&dir, &cached_session(i64::MAX)).await;
        assert_eq!(gw.bearer().await, "user-token");
        assert!(gw.on_session_change().borrow().is_some());
    }

    #[tokio::test]
    async fn test_expired_token_failed_refresh_signs_out() {
        let dir = tempfile::tempdir().unwrap();
        let gw = offline_gateway(&dir, &cached_session(0)).await;
        let mut rx = gw.on_session_change();
        assert!(rx.borrow_and_update().is_some());

        // The refresh call cannot reach the service, so data calls fall back
        // to the anon key and subscribers see the sign-out.
        assert_eq!(gw.bearer().await, "anon");
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
        assert!(gw.store.load(&gw.base_url).await.is_none());
    }

    #[test]
    fn test_http_error_reads_rest_body() {
        let body = r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#;
        match http_error(406, body) {
            GatewayError::Http {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 406);
                assert_eq!(code.as_deref(), Some(NO_ROWS_CODE));
                assert!(message.starts_with("JSON object requested"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_http_error_reads_auth_body() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        let err = http_error(400, body);
        assert_eq!(err.to_string(), "HTTP 400: Invalid login credentials");
    }

    #[test]
    fn test_http_error_numeric_code_and_plain_text() {
        let err = http_error(422, r#"{"code":422,"msg":"User already registered"}"#);
        let GatewayError::Http { code, message, .. } = err else {
            panic!("expected http error");
        };
        assert_eq!(code.as_deref(), Some("422"));
        assert_eq!(message, "User already registered");

        let err = http_error(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }
}

//! Password auth against the `/auth/v1` endpoints.

use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GatewayError, Session, SessionUser, rest::ensure_success};

/// Email/password body shared by sign up and sign in.
#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshReq<'a> {
    refresh_token: &'a str,
}

/// Token grant response.
#[derive(Debug, Deserialize)]
struct TokenResp {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: SessionUser,
}

impl TokenResp {
    fn into_session(self) -> Session {
        // Prefer the absolute expiry; fall back to one hour when neither is sent.
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in.unwrap_or(3600));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Register a new account; the service sends a confirmation email.
pub async fn sign_up(
    http: &Client,
    base_url: &str,
    anon_key: &str,
    email: &str,
    password: &str,
) -> Result<(), GatewayError> {
    let url = format!("{}/auth/v1/signup", base_url);
    let resp = http
        .post(url)
        .header("apikey", anon_key)
        .bearer_auth(anon_key)
        .json(&Credentials { email, password })
        .send()
        .await?;
    ensure_success(resp).await?;
    Ok(())
}

/// Exchange email and password for a session.
pub async fn sign_in_with_password(
    http: &Client,
    base_url: &str,
    anon_key: &str,
    email: &str,
    password: &str,
) -> Result<Session, GatewayError> {
    let url = format!("{}/auth/v1/token?grant_type=password", base_url);
    let resp = http
        .post(url)
        .header("apikey", anon_key)
        .json(&Credentials { email, password })
        .send()
        .await?;
    let resp = ensure_success(resp).await?;
    let token = resp.json::<TokenResp>().await?;
    Ok(token.into_session())
}

/// Trade a refresh token for a fresh session.
pub async fn refresh_session(
    http: &Client,
    base_url: &str,
    anon_key: &str,
    refresh_token: &str,
) -> Result<Session, GatewayError> {
    let url = format!("{}/auth/v1/token?grant_type=refresh_token", base_url);
    let resp = http
        .post(url)
        .header("apikey", anon_key)
        .json(&RefreshReq { refresh_token })
        .send()
        .await?;
    let resp = ensure_success(resp).await?;
    let token = resp.json::<TokenResp>().await?;
    Ok(token.into_session())
}

/// Revoke the session server-side.
pub async fn sign_out(
    http: &Client,
    base_url: &str,
    anon_key: &str,
    access_token: &str,
) -> Result<(), GatewayError> {
    let url = format!("{}/auth/v1/logout", base_url);
    let resp = http
        .post(url)
        .header("apikey", anon_key)
        .bearer_auth(access_token)
        .send()
        .await?;
    ensure_success(resp).await?;
    Ok(())
}

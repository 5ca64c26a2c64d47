//! Session cache persisted in a local JSON file (session.json).

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, io::ErrorKind, path::PathBuf};
use tokio::{
    fs,
    io::{AsyncWriteExt, BufWriter},
};

use super::{GatewayError, Session};

/// Stores one session per gateway URL so switching projects never reuses
/// another project's tokens.
#[derive(Clone, Debug)]
pub struct FileSessionStore {
    /// Location of the session cache on disk.
    path: PathBuf,
}

impl FileSessionStore {
    /// Create a new store backed by the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Key used in the session map for the given gateway URL.
    fn entry_key(gateway_url: &str) -> String {
        let normalized = gateway_url.trim().trim_end_matches('/');
        let hash = Sha256::digest(normalized.as_bytes());
        format!("session:{}", URL_SAFE_NO_PAD.encode(hash))
    }

    /// Load the entire map from disk; a missing or empty file is an empty map.
    async fn load_map(&self) -> Result<HashMap<String, Session>, GatewayError> {
        match fs::read(&self.path).await {
            Ok(data) if data.is_empty() => Ok(HashMap::new()),
            Ok(data) => {
                serde_json::from_slice(&data).map_err(|e| GatewayError::Decode(e.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(GatewayError::Transport(e.to_string())),
        }
    }

    async fn save_map(&self, map: &HashMap<String, Session>) -> Result<(), GatewayError> {
        let io_err = |e: std::io::Error| GatewayError::Transport(e.to_string());
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let data =
            serde_json::to_vec_pretty(map).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let file = fs::File::create(&self.path).await.map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&data).await.map_err(io_err)?;
        writer.flush().await.map_err(io_err)?;
        Ok(())
    }

    /// Cached session for this gateway, if any. Read errors count as "none".
    pub async fn load(&self, gateway_url: &str) -> Option<Session> {
        match self.load_map().await {
            Ok(mut map) => map.remove(&Self::entry_key(gateway_url)),
            Err(e) => {
                tracing::warn!("session cache unreadable: {e}");
                None
            }
        }
    }

    /// Store or replace the session for this gateway.
    pub async fn save(&self, gateway_url: &str, session: &Session) -> Result<(), GatewayError> {
        let mut map = self.load_map().await.unwrap_or_default();
        map.insert(Self::entry_key(gateway_url), session.clone());
        self.save_map(&map).await
    }

    /// Forget the session for this gateway.
    pub async fn clear(&self, gateway_url: &str) -> Result<(), GatewayError> {
        let mut map = self.load_map().await.unwrap_or_default();
        if map.remove(&Self::entry_key(gateway_url)).is_some() {
            self.save_map(&map).await?;
        }
        Ok(())
    }
}

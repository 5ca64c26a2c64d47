//! In-memory gateway that records every call.

use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::watch;

use super::{Gateway, GatewayError, Session, SessionUser};

/// Tables are keyed by name; each holds plain JSON rows.
pub struct MemoryGateway {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    /// Every `select_by_key` as `(table, column, value)`.
    pub selects: Mutex<Vec<(String, String, String)>>,
    /// Every `insert_rows` call as `(table, rows)`.
    pub inserts: Mutex<Vec<(String, Vec<Value>)>>,
    /// Every `update_row` call as `(table, column, value, patch)`.
    pub updates: Mutex<Vec<(String, String, String, Value)>>,
    /// When set, every data call fails with this error.
    fail_with: Mutex<Option<GatewayError>>,
    reject_sign_in: AtomicBool,
    session: watch::Sender<Option<Session>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            tables: Mutex::new(HashMap::new()),
            selects: Mutex::new(vec![]),
            inserts: Mutex::new(vec![]),
            updates: Mutex::new(vec![]),
            fail_with: Mutex::new(None),
            reject_sign_in: AtomicBool::new(false),
            session,
        }
    }

    /// Seed a row into a table.
    pub fn with_row(self, table: &str, row: Value) -> Self {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
        self
    }

    /// Start already signed in as `user_id`.
    pub fn signed_in(self, user_id: &str) -> Self {
        self.session.send_replace(Some(test_session(user_id)));
        self
    }

    pub fn fail_with(&self, err: GatewayError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }

    /// Stop failing data calls.
    pub fn recover(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    pub fn reject_sign_in(&self) {
        self.reject_sign_in.store(true, Ordering::SeqCst);
    }

    /// Drop the session as if it expired server-side.
    pub fn expire_session(&self) {
        self.session.send_replace(None);
    }

    pub fn select_count(&self) -> usize {
        self.selects.lock().unwrap().len()
    }

    pub fn insert_calls(&self) -> Vec<(String, Vec<Value>)> {
        self.inserts.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), GatewayError> {
        match self.fail_with.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Column values compare by their text form so `42` matches `"42"`.
fn column_matches(row: &Value, column: &str, value: &str) -> bool {
    match row.get(column) {
        Some(Value::String(s)) => s == value,
        Some(other) => other.to_string() == value,
        None => false,
    }
}

pub fn test_session(user_id: &str) -> Session {
    Session {
        access_token: format!("token-{user_id}"),
        refresh_token: "refresh".into(),
        expires_at: i64::MAX,
        user: SessionUser {
            id: user_id.into(),
            email: Some(format!("{user_id}@example.com")),
        },
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn select_by_key(
        &self,
        table: &str,
        key_column: &str,
        key_value: &str,
    ) -> Result<Option<Value>, GatewayError> {
        self.selects.lock().unwrap().push((
            table.into(),
            key_column.into(),
            key_value.into(),
        ));
        self.check_failure()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.get(table).and_then(|rows| {
            rows.iter()
                .find(|r| column_matches(r, key_column, key_value))
                .cloned()
        }))
    }

    async fn insert_rows(&self, table: &str, rows: Vec<Value>) -> Result<(), GatewayError> {
        self.inserts
            .lock()
            .unwrap()
            .push((table.into(), rows.clone()));
        self.check_failure()?;
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
        Ok(())
    }

    async fn update_row(
        &self,
        table: &str,
        key_column: &str,
        key_value: &str,
        patch: Value,
    ) -> Result<(), GatewayError> {
        self.updates.lock().unwrap().push((
            table.into(),
            key_column.into(),
            key_value.into(),
            patch.clone(),
        ));
        self.check_failure()?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows
                .iter_mut()
                .filter(|r| column_matches(r, key_column, key_value))
            {
                if let (Some(obj), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                    for (k, v) in fields {
                        obj.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        Ok(())
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<(), GatewayError> {
        self.check_failure()
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<Session, GatewayError> {
        if self.reject_sign_in.load(Ordering::SeqCst) {
            return Err(GatewayError::Http {
                status: 400,
                code: None,
                message: "Invalid login credentials".into(),
            });
        }
        let user = email.split('@').next().unwrap_or(email);
        let session = test_session(user);
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        self.session.send_replace(None);
        Ok(())
    }

    async fn get_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    fn on_session_change(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}

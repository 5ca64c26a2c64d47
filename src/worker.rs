//! Background worker performing gateway writes and auth calls.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{
    forms::SubmitPlan,
    gateway::{Gateway, GatewayError},
    lookup::LookupEvent,
    records::{OperationKind, PROFILE_KEY, PROFILE_TABLE, UserProfile},
};

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCmd {
    SignIn { email: String, password: String },
    SignUp { email: String, password: String },
    SignOut,
    /// Insert the shaped rows of one form submission.
    Submit(SubmitPlan),
    /// Fetch the profile row owned by `user_id`.
    LoadProfile { user_id: String },
    /// Overwrite the profile row owned by `user_id`.
    SaveProfile { user_id: String, profile: UserProfile },
}

/// Auth call a result belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthAction {
    SignIn,
    SignUp,
    SignOut,
}

/// Events delivered to the UI loop.
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    /// A debounced product lookup finished (sent by the lookup task itself).
    Lookup(LookupEvent),
    /// An auth call returned.
    Auth {
        action: AuthAction,
        result: Result<(), String>,
    },
    /// An insert sent by form `form_id` returned.
    Submitted {
        form_id: u64,
        kind: OperationKind,
        result: Result<(), String>,
    },
    ProfileLoaded(Result<Option<UserProfile>, String>),
    ProfileSaved(Result<(), String>),
}

/// Main worker loop: handle commands one at a time until the UI hangs up.
pub async fn run(
    mut rx: mpsc::Receiver<WorkerCmd>,
    tx: mpsc::Sender<WorkerEvent>,
    gateway: Arc<dyn Gateway>,
) {
    tracing::info!("worker started");
    while let Some(cmd) = rx.recv().await {
        let ev = handle(gateway.as_ref(), cmd).await;
        if tx.send(ev).await.is_err() {
            tracing::warn!("worker event dropped: UI closed");
            break;
        }
    }
    tracing::info!("worker stopped");
}

/// Execute one command and describe its outcome.
async fn handle(gateway: &dyn Gateway, cmd: WorkerCmd) -> WorkerEvent {
    match cmd {
        WorkerCmd::SignIn { email, password } => {
            tracing::info!("sign in: {email}");
            let result = gateway.sign_in(&email, &password).await.map(|_| ());
            auth_event(AuthAction::SignIn, result)
        }
        WorkerCmd::SignUp { email, password } => {
            tracing::info!("sign up: {email}");
            let result = gateway.sign_up(&email, &password).await;
            auth_event(AuthAction::SignUp, result)
        }
        WorkerCmd::SignOut => {
            tracing::info!("sign out");
            auth_event(AuthAction::SignOut, gateway.sign_out().await)
        }
        WorkerCmd::Submit(plan) => {
            let (form_id, kind) = (plan.form_id, plan.kind);
            let result = submit_plan(gateway, &plan).await.map_err(|e| {
                tracing::error!("insert into {} failed: {e}", plan.table);
                e.to_string()
            });
            WorkerEvent::Submitted {
                form_id,
                kind,
                result,
            }
        }
        WorkerCmd::LoadProfile { user_id } => {
            WorkerEvent::ProfileLoaded(load_profile(gateway, &user_id).await)
        }
        WorkerCmd::SaveProfile { user_id, profile } => {
            let result = save_profile(gateway, &user_id, &profile)
                .await
                .map_err(|e| {
                    tracing::error!("profile update failed: {e}");
                    e.to_string()
                });
            WorkerEvent::ProfileSaved(result)
        }
    }
}

fn auth_event(action: AuthAction, result: Result<(), GatewayError>) -> WorkerEvent {
    let result = result.map_err(|e| {
        tracing::error!("{action:?} failed: {e}");
        // Auth failures show the service's own wording.
        match e {
            GatewayError::Http { message, .. } => message,
            other => other.to_string(),
        }
    });
    WorkerEvent::Auth { action, result }
}

/// Insert every row of the plan in a single call; no retries.
pub async fn submit_plan(gateway: &dyn Gateway, plan: &SubmitPlan) -> Result<(), GatewayError> {
    tracing::info!("insert {} row(s) into {}", plan.rows.len(), plan.table);
    gateway.insert_rows(plan.table, plan.rows.clone()).await
}

async fn load_profile(gateway: &dyn Gateway, user_id: &str) -> Result<Option<UserProfile>, String> {
    let row = gateway
        .select_by_key(PROFILE_TABLE, PROFILE_KEY, user_id)
        .await
        .map_err(|e| {
            tracing::error!("profile load failed: {e}");
            e.to_string()
        })?;
    row.map(serde_json::from_value::<UserProfile>)
        .transpose()
        .map_err(|e| {
            tracing::error!("profile row not decodable: {e}");
            e.to_string()
        })
}

async fn save_profile(
    gateway: &dyn Gateway,
    user_id: &str,
    profile: &UserProfile,
) -> Result<(), GatewayError> {
    let patch = serde_json::to_value(profile).map_err(|e| GatewayError::Decode(e.to_string()))?;
    gateway
        .update_row(PROFILE_TABLE, PROFILE_KEY, user_id, patch)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;
    use serde_json::json;

    fn spawn_worker(
        gw: &Arc<MemoryGateway>,
    ) -> (mpsc::Sender<WorkerCmd>, mpsc::Receiver<WorkerEvent>) {
        let (tx_cmd, rx_cmd) = mpsc::channel(8);
        let (tx_ev, rx_ev) = mpsc::channel(8);
        let gw: Arc<dyn Gateway> = gw.clone();
        tokio::spawn(run(rx_cmd, tx_ev, gw));
        (tx_cmd, rx_ev)
    }

    #[tokio::test]
    async fn test_submit_issues_one_insert() {
        let gw = Arc::new(MemoryGateway::new());
        let (tx, mut rx) = spawn_worker(&gw);

        let plan = SubmitPlan {
            form_id: 11,
            kind: OperationKind::Assembly,
            table: "motor_assembly",
            rows: vec![json!({"part_id": "B-1"}), json!({"part_id": "F-2"})],
        };
        tx.send(WorkerCmd::Submit(plan)).await.unwrap();

        match rx.recv().await {
            Some(WorkerEvent::Submitted {
                form_id,
                kind,
                result,
            }) => {
                assert_eq!(form_id, 11);
                assert_eq!(kind, OperationKind::Assembly);
                assert_eq!(result, Ok(()));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        let calls = gw.insert_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.len(), 2);
    }

    #[tokio::test]
    async fn test_submit_error_carries_message() {
        let gw = Arc::new(MemoryGateway::new());
        gw.fail_with(GatewayError::Transport("timed out".into()));
        let (tx, mut rx) = spawn_worker(&gw);

        let plan = SubmitPlan {
            form_id: 12,
            kind: OperationKind::Other,
            table: "other_works",
            rows: vec![json!({})],
        };
        tx.send(WorkerCmd::Submit(plan)).await.unwrap();

        let Some(WorkerEvent::Submitted { result, .. }) = rx.recv().await else {
            panic!("expected submit result");
        };
        assert_eq!(result, Err("network error: timed out".to_string()));
        assert_eq!(gw.insert_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_profile_load_and_save() {
        let gw = Arc::new(MemoryGateway::new().with_row(
            PROFILE_TABLE,
            json!({"user_id": "u1", "first_name": "Иван", "last_name": "Петров",
                   "patronymic": null, "position_employee": "Сборщик"}),
        ));
        let (tx, mut rx) = spawn_worker(&gw);

        tx.send(WorkerCmd::LoadProfile {
            user_id: "u1".into(),
        })
        .await
        .unwrap();
        let Some(WorkerEvent::ProfileLoaded(Ok(Some(mut profile)))) = rx.recv().await else {
            panic!("expected loaded profile");
        };
        assert_eq!(profile.last_name, "Петров");
        assert_eq!(profile.patronymic, "");

        profile.patronymic = "Сергеевич".into();
        tx.send(WorkerCmd::SaveProfile {
            user_id: "u1".into(),
            profile,
        })
        .await
        .unwrap();
        let Some(WorkerEvent::ProfileSaved(Ok(()))) = rx.recv().await else {
            panic!("expected saved profile");
        };

        let updates = gw.updates.lock().unwrap().clone();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "user");
        assert_eq!(updates[0].1, "user_id");
        assert_eq!(updates[0].2, "u1");
        assert_eq!(updates[0].3["patronymic"], json!("Сергеевич"));
    }

    #[tokio::test]
    async fn test_missing_profile_row_is_not_an_error() {
        let gw = Arc::new(MemoryGateway::new());
        let (tx, mut rx) = spawn_worker(&gw);

        tx.send(WorkerCmd::LoadProfile {
            user_id: "ghost".into(),
        })
        .await
        .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(WorkerEvent::ProfileLoaded(Ok(None)))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_failure_uses_service_message() {
        let gw = Arc::new(MemoryGateway::new());
        gw.reject_sign_in();
        let (tx, mut rx) = spawn_worker(&gw);

        tx.send(WorkerCmd::SignIn {
            email: "worker@example.com".into(),
            password: "wrong".into(),
        })
        .await
        .unwrap();
        let Some(WorkerEvent::Auth { action, result }) = rx.recv().await else {
            panic!("expected auth result");
        };
        assert_eq!(action, AuthAction::SignIn);
        assert_eq!(result, Err("Invalid login credentials".to_string()));
        assert!(gw.get_session().await.is_none());
    }
}

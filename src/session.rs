//! Session gate deciding which screens are reachable.

use tokio::sync::watch;

use crate::{
    events::Screen,
    gateway::{Gateway, Session},
};

/// What the gate currently knows about the signed-in user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateState {
    /// Not yet asked the gateway.
    Unknown,
    Authenticated(Session),
    Unauthenticated,
}

impl GateState {
    fn from_session(session: Option<Session>) -> Self {
        match session {
            Some(s) => GateState::Authenticated(s),
            None => GateState::Unauthenticated,
        }
    }
}

/// Tracks the gateway's session and reports sign-in and sign-out transitions.
pub struct SessionGate {
    state: GateState,
    changes: Option<watch::Receiver<Option<Session>>>,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Unknown,
            changes: None,
        }
    }

    /// Resolve the current session and subscribe to later changes.
    pub async fn init(&mut self, gateway: &dyn Gateway) {
        // Subscribe first so a refresh during `get_session` is not missed.
        let mut changes = gateway.on_session_change();
        let session = gateway.get_session().await;
        changes.borrow_and_update();
        self.state = GateState::from_session(session);
        self.changes = Some(changes);
        tracing::info!("session gate initialised: signed in = {}", self.is_authenticated());
    }

    /// Apply a pending session change, returning the new state when the
    /// signed-in user changed.
    pub fn poll(&mut self) -> Option<GateState> {
        let changes = self.changes.as_mut()?;
        match changes.has_changed() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(_) => {
                tracing::warn!("session channel closed");
                self.changes = None;
                return None;
            }
        }
        let next = GateState::from_session(changes.borrow_and_update().clone());
        let before = self.user_id().map(str::to_string);
        self.state = next;
        if before.as_deref() == self.user_id() {
            // Token refresh for the same user.
            return None;
        }
        tracing::info!("session changed: user = {:?}", self.user_id());
        Some(self.state.clone())
    }

    /// Drop the subscription.
    pub fn teardown(&mut self) {
        if self.changes.take().is_some() {
            tracing::info!("session gate torn down");
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, GateState::Authenticated(_))
    }

    pub fn user_id(&self) -> Option<&str> {
        match &self.state {
            GateState::Authenticated(s) => Some(&s.user.id),
            _ => None,
        }
    }

    pub fn user_email(&self) -> Option<&str> {
        match &self.state {
            GateState::Authenticated(s) => s.user.email.as_deref(),
            _ => None,
        }
    }

    /// Protected screens need an authenticated session.
    pub fn allows(&self, screen: Screen) -> bool {
        !screen.is_protected() || self.is_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gateway::memory::MemoryGateway, records::OperationKind};

    #[tokio::test]
    async fn test_unknown_until_init() {
        let gate = SessionGate::new();
        assert_eq!(gate.state(), &GateState::Unknown);
        assert!(!gate.allows(Screen::Home));
        assert!(gate.allows(Screen::Login));
    }

    #[tokio::test]
    async fn test_transitions_follow_the_gateway() {
        let gw = MemoryGateway::new().signed_in("u1");
        let mut gate = SessionGate::new();
        gate.init(&gw).await;

        assert!(gate.is_authenticated());
        assert_eq!(gate.user_id(), Some("u1"));
        assert!(gate.allows(Screen::Work(OperationKind::Winding)));
        assert_eq!(gate.poll(), None);

        gw.expire_session();
        assert_eq!(gate.poll(), Some(GateState::Unauthenticated));
        assert!(!gate.allows(Screen::Profile));
        assert_eq!(gate.poll(), None);

        gw.sign_in("u2@example.com", "pw").await.unwrap();
        match gate.poll() {
            Some(GateState::Authenticated(s)) => assert_eq!(s.user.id, "u2"),
            other => panic!("unexpected transition: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_signed_out_start() {
        let gw = MemoryGateway::new();
        let mut gate = SessionGate::new();
        gate.init(&gw).await;
        assert_eq!(gate.state(), &GateState::Unauthenticated);
        assert!(!gate.allows(Screen::Home));
    }

    #[tokio::test]
    async fn test_teardown_stops_reporting() {
        let gw = MemoryGateway::new().signed_in("u1");
        let mut gate = SessionGate::new();
        gate.init(&gw).await;
        gate.teardown();
        gw.expire_session();
        assert_eq!(gate.poll(), None);
        assert!(gate.is_authenticated());
    }
}

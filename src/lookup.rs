//! Debounced product lookup keyed by the motor id a user is typing.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::mpsc;

use crate::{
    events::Notice,
    gateway::Gateway,
    records::{OperationKind, PRODUCT_KEY, PRODUCT_TABLE, ProductRecord},
    timer::{self, TimerHandle},
    worker::WorkerEvent,
};

/// Tickets are unique across every lookup instance, so an event queued by a
/// form that has since been closed can never match a reopened one.
static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

fn next_ticket() -> u64 {
    NEXT_TICKET.fetch_add(1, Ordering::Relaxed)
}

/// Why a motor id was rejected before any request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MotorIdError {
    #[error("motor id is empty")]
    Empty,
    #[error("motor id is not a positive integer")]
    Invalid,
}

/// Parse a user-entered motor id: trimmed base-10 digits, greater than zero.
pub fn parse_motor_id(raw: &str) -> Result<i64, MotorIdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MotorIdError::Empty);
    }
    // `i64::from_str` accepts a leading sign; ids are digits only.
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MotorIdError::Invalid);
    }
    match trimmed.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(MotorIdError::Invalid),
    }
}

/// Product info state for the motor id currently in the form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupState {
    Idle,
    Loading,
    Found(ProductRecord),
    NotFound,
    Error(String),
}

/// Result produced by a fired lookup timer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Input was not a motor id; nothing was fetched.
    Invalid,
    Found(ProductRecord),
    NotFound,
    Failed(String),
}

/// Completion message routed back to the owning form.
#[derive(Clone, Debug)]
pub struct LookupEvent {
    pub form: OperationKind,
    pub ticket: u64,
    pub outcome: LookupOutcome,
}

/// Per-form lookup slot. Holds at most one pending or in-flight request.
pub struct ProductLookup {
    form: OperationKind,
    gateway: Arc<dyn Gateway>,
    events: mpsc::Sender<WorkerEvent>,
    delay: Duration,
    /// Ticket of the most recent input; older completions are dropped.
    ticket: u64,
    input: String,
    state: LookupState,
    /// Dropping this aborts the timer and any fetch it started.
    pending: Option<TimerHandle>,
}

impl ProductLookup {
    pub fn new(
        form: OperationKind,
        gateway: Arc<dyn Gateway>,
        events: mpsc::Sender<WorkerEvent>,
        delay: Duration,
    ) -> Self {
        Self {
            form,
            gateway,
            events,
            delay,
            ticket: next_ticket(),
            input: String::new(),
            state: LookupState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> &LookupState {
        &self.state
    }

    /// Trimmed input the current state belongs to.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// React to an edit of the motor id field.
    pub fn set_input(&mut self, raw: &str) {
        let trimmed = raw.trim();
        // Re-entering the same id after a failure is the manual retry.
        if trimmed == self.input && !matches!(self.state, LookupState::Error(_)) {
            return;
        }
        self.input = trimmed.to_string();
        self.restart();

        let parsed = match parse_motor_id(trimmed) {
            Err(MotorIdError::Empty) => return,
            Ok(id) => {
                self.state = LookupState::Loading;
                Ok(id)
            }
            Err(e) => Err(e),
        };

        let gateway = self.gateway.clone();
        let events = self.events.clone();
        let form = self.form;
        let ticket = self.ticket;
        self.pending = Some(timer::schedule(self.delay, async move {
            let outcome = match parsed {
                Ok(id) => fetch_product(gateway.as_ref(), id).await,
                Err(_) => LookupOutcome::Invalid,
            };
            let event = LookupEvent {
                form,
                ticket,
                outcome,
            };
            if events.send(WorkerEvent::Lookup(event)).await.is_err() {
                tracing::debug!("lookup result dropped: receiver closed");
            }
        }));
    }

    /// Forget the input and any pending request.
    pub fn clear(&mut self) {
        self.input.clear();
        self.restart();
    }

    /// Cancel what is pending, take a new ticket and go back to idle.
    fn restart(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
        self.ticket = next_ticket();
        self.state = LookupState::Idle;
    }

    /// Apply a completion; returns the notice to show, if any.
    pub fn apply(&mut self, event: LookupEvent) -> Option<Notice> {
        if event.form != self.form || event.ticket != self.ticket {
            tracing::debug!(
                "stale lookup result ignored (ticket {} != {})",
                event.ticket,
                self.ticket
            );
            return None;
        }
        self.pending = None;

        match event.outcome {
            LookupOutcome::Invalid => {
                self.state = LookupState::Idle;
                Some(Notice::error(
                    "Пожалуйста, введите корректный ID электродвигателя",
                ))
            }
            LookupOutcome::Found(product) => {
                self.state = LookupState::Found(product);
                None
            }
            LookupOutcome::NotFound => {
                self.state = LookupState::NotFound;
                Some(Notice::info("Электродвигатель с указанным ID не найден"))
            }
            LookupOutcome::Failed(reason) => {
                let notice = Notice::error(format!(
                    "Ошибка при получении данных о продукте: {reason}"
                ));
                self.state = LookupState::Error(reason);
                Some(notice)
            }
        }
    }
}

/// One request against the product table.
async fn fetch_product(gateway: &dyn Gateway, id: i64) -> LookupOutcome {
    tracing::info!("product lookup: id={id}");
    match gateway
        .select_by_key(PRODUCT_TABLE, PRODUCT_KEY, &id.to_string())
        .await
    {
        Ok(Some(row)) => match serde_json::from_value::<ProductRecord>(row) {
            Ok(product) => LookupOutcome::Found(product),
            Err(e) => {
                tracing::error!("product row for {id} not decodable: {e}");
                LookupOutcome::Failed(e.to_string())
            }
        },
        Ok(None) => LookupOutcome::NotFound,
        Err(e) => {
            tracing::error!("product lookup for {id} failed: {e}");
            LookupOutcome::Failed(e.to_string())
        }
    }
}

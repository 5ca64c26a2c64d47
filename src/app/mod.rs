//! TUI event loop, screen navigation and state shared by input and rendering.

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    events::{Notice, Screen, UiState},
    forms::{self, LoginForm, OperationForm, ProfileForm},
    gateway::{Gateway, RestGateway, session_store::FileSessionStore},
    input::InputBoxState,
    lookup::ProductLookup,
    records::OperationKind,
    session::{GateState, SessionGate},
    shortcuts::Shortcuts,
    ui::Tui,
    wizard::WizardState,
    worker::{self, AuthAction, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// Entries of the navigation menu, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuItem {
    Work(OperationKind),
    Profile,
    SignOut,
}

pub const MENU: [MenuItem; 7] = [
    MenuItem::Work(OperationKind::Assembly),
    MenuItem::Work(OperationKind::Disassembly),
    MenuItem::Work(OperationKind::Winding),
    MenuItem::Work(OperationKind::Turning),
    MenuItem::Work(OperationKind::Other),
    MenuItem::Profile,
    MenuItem::SignOut,
];

impl MenuItem {
    pub fn label(self) -> &'static str {
        match self {
            MenuItem::Work(kind) => kind.menu_label(),
            MenuItem::Profile => "Профиль",
            MenuItem::SignOut => "Выйти",
        }
    }
}

/// Live link to the gateway: the gateway itself and the worker driving it.
pub struct Connection {
    pub gateway: Arc<dyn Gateway>,
    pub worker_tx: mpsc::Sender<WorkerCmd>,
}

/// App state shared by input handling and rendering.
pub struct App {
    pub cfg_path: PathBuf,
    pub cfg: Config,
    pub ui: UiState,
    /// Present once the gateway settings are known.
    pub conn: Option<Connection>,
    /// Cloned into the worker and every lookup so all results share one queue.
    pub event_tx: mpsc::Sender<WorkerEvent>,
    pub event_rx: mpsc::Receiver<WorkerEvent>,
    pub gate: SessionGate,
    /// Open work form; dropping it cancels its pending lookup.
    pub form: Option<OperationForm>,
    pub profile: ProfileForm,
    pub login: LoginForm,
    /// Open input popup, if any.
    pub input_box: Option<InputBoxState>,
    pub wizard_state: WizardState,
    pub shortcuts: Shortcuts,
}

impl App {
    pub fn new(cfg_path: PathBuf, cfg: Config, shortcuts: Shortcuts) -> Self {
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>(256);
        let wizard_state = WizardState::new(&cfg.gateway.url, &cfg.gateway.anon_key);
        Self {
            cfg_path,
            cfg,
            ui: UiState::new(Screen::InitialSetup),
            conn: None,
            event_tx,
            event_rx,
            gate: SessionGate::new(),
            form: None,
            profile: ProfileForm::default(),
            login: LoginForm::default(),
            input_box: None,
            wizard_state,
            shortcuts,
        }
    }

    /// Queue a command for the worker.
    pub async fn send(&mut self, cmd: WorkerCmd) -> Result<()> {
        match &self.conn {
            Some(conn) => conn.worker_tx.send(cmd).await?,
            None => {
                tracing::warn!("command dropped, gateway not configured");
                self.ui
                    .notify(Notice::error("Подключение к серверу не настроено"));
            }
        }
        Ok(())
    }
}

/// Run the TUI until the user quits.
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    // Settings and key bindings live next to the binary's working dir.
    let cfg_path = PathBuf::from("config.toml");
    let cfg = Config::load_or_default(&cfg_path)?;
    let shortcuts = Shortcuts::load_or_default("shortcut.toml")?;

    let mut app = App::new(cfg_path, cfg, shortcuts);
    // Without a gateway URL and key the wizard runs first.
    if !app.cfg.needs_setup() {
        if let Err(e) = connect(&mut app).await {
            tracing::error!("gateway connect failed: {e:#}");
            app.ui
                .notify(Notice::error(format!("Не удалось подключиться: {e}")));
        }
    }

    loop {
        // Redraw the current screen.
        terminal.draw(|f| draw(f, &app))?;

        // Drain worker and lookup results without blocking.
        while let Ok(ev) = app.event_rx.try_recv() {
            handle_worker_event(&mut app, ev);
        }
        // Pick up sign-in, sign-out and expiry.
        if let Some(state) = app.gate.poll() {
            apply_gate_change(&mut app, state);
        }

        // Wait briefly for a key so the loop keeps ticking.
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            // Ctrl+C always quits.
            if is_ctrl_c(&k) {
                break;
            }
            // Screen handlers return true to quit.
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }

    // Dropping the form cancels its pending lookup.
    app.form = None;
    app.gate.teardown();
    Ok(())
}

/// Build the gateway from the config, start the worker and resolve the session.
pub async fn connect(app: &mut App) -> Result<()> {
    // The session cache is keyed by gateway URL inside one file.
    let store = FileSessionStore::new(&app.cfg.session.store_path);
    let gateway: Arc<dyn Gateway> = Arc::new(RestGateway::connect(&app.cfg.gateway, store).await?);
    attach(app, gateway).await;
    Ok(())
}

/// Wire an already built gateway into the app.
async fn attach(app: &mut App, gateway: Arc<dyn Gateway>) {
    // Worker commands go out here; results come back on the shared event channel.
    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    tokio::spawn(worker::run(rx_cmd, app.event_tx.clone(), gateway.clone()));
    // Resolve the cached session before picking the first screen.
    app.gate.init(gateway.as_ref()).await;
    app.conn = Some(Connection {
        gateway,
        worker_tx: tx_cmd,
    });
    let screen = if app.gate.is_authenticated() {
        Screen::Home
    } else {
        Screen::Login
    };
    app.ui.go_to(screen);
    tracing::info!("connected to {}", app.cfg.gateway.url);
}

/// Switch screens, mounting and unmounting per-screen state.
pub async fn navigate(app: &mut App, screen: Screen) -> Result<()> {
    if !app.gate.allows(screen) {
        tracing::warn!("blocked navigation to {}", screen.name());
        app.form = None;
        app.ui.go_to(Screen::Login);
        return Ok(());
    }

    // Leaving a work screen unmounts its form.
    app.form = None;
    app.ui.go_to(screen);

    match screen {
        Screen::Work(kind) => {
            // Each visit mounts a fresh form with its own lookup.
            if let Some(conn) = &app.conn {
                let lookup = ProductLookup::new(
                    kind,
                    conn.gateway.clone(),
                    app.event_tx.clone(),
                    app.cfg.lookup.debounce(),
                );
                app.form = Some(OperationForm::new(kind, lookup));
            }
        }
        Screen::Profile => request_profile(app).await?,
        Screen::Login => app.login.busy = false,
        Screen::Home | Screen::InitialSetup => {}
    }
    Ok(())
}

/// Ask the worker for the signed-in user's profile row.
pub async fn request_profile(app: &mut App) -> Result<()> {
    let Some(user_id) = app.gate.user_id().map(str::to_string) else {
        return Ok(());
    };
    app.profile.begin_load(user_id.clone());
    app.ui.status = "Загрузка профиля...".into();
    app.send(WorkerCmd::LoadProfile { user_id }).await
}

/// Apply a worker or lookup event to the UI state.
fn handle_worker_event(app: &mut App, ev: WorkerEvent) {
    match ev {
        WorkerEvent::Lookup(ev) => {
            if let Some(form) = app.form.as_mut()
                && let Some(notice) = form.lookup_mut().apply(ev)
            {
                app.ui.notify(notice);
            }
        }
        WorkerEvent::Auth { action, result } => {
            app.login.finish(action == AuthAction::SignIn && result.is_ok());
            let notice = match (action, result) {
                // The gate reports the new session and switches screens.
                (AuthAction::SignIn, Ok(())) => Notice::success("Вход выполнен"),
                (AuthAction::SignUp, Ok(())) => {
                    Notice::info("Проверьте почту для подтверждения регистрации")
                }
                (AuthAction::SignOut, Ok(())) => Notice::info("Вы вышли из системы"),
                (AuthAction::SignIn, Err(e)) => Notice::error(format!("Ошибка входа: {e}")),
                (AuthAction::SignUp, Err(e)) => {
                    Notice::error(format!("Ошибка регистрации: {e}"))
                }
                (AuthAction::SignOut, Err(e)) => Notice::error(format!("Ошибка выхода: {e}")),
            };
            app.ui.notify(notice);
        }
        WorkerEvent::Submitted {
            form_id,
            kind,
            result,
        } => {
            let notice = match app.form.as_mut() {
                Some(form) if form.id() == form_id => form.finish_submit(result),
                // The sending form was closed or replaced while its insert was in flight.
                _ => {
                    tracing::info!("{kind:?} insert finished after its form closed");
                    forms::submit_notice(&result)
                }
            };
            app.ui.notify(notice);
            app.ui.status = "Ready".into();
        }
        WorkerEvent::ProfileLoaded(result) => {
            if let Some(notice) = app.profile.finish_load(result) {
                app.ui.notify(notice);
            }
            app.ui.status = "Ready".into();
        }
        WorkerEvent::ProfileSaved(result) => {
            let notice = app.profile.finish_save(result);
            app.ui.notify(notice);
            app.ui.status = "Ready".into();
        }
    }
}

/// React to the user signing in or losing the session.
fn apply_gate_change(app: &mut App, state: GateState) {
    match state {
        GateState::Authenticated(_) => {
            if matches!(app.ui.screen, Screen::Login) {
                app.ui.go_to(Screen::Home);
            }
        }
        GateState::Unauthenticated | GateState::Unknown => {
            app.form = None;
            app.profile = ProfileForm::default();
            app.input_box = None;
            if app.ui.screen.is_protected() {
                app.ui.go_to(Screen::Login);
            }
        }
    }
}

//! Key handlers, one per screen plus the input popup.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{
    events::{Notice, Screen},
    forms::{MOTOR_FIELD, ProfileForm},
    input::{InputBoxState, InputCallbackId},
    records::UserProfile,
    shortcuts,
    wizard::WizardStep,
    worker::WorkerCmd,
};

use super::{App, MENU, MenuItem, connect, navigate, request_profile};

/// Handle one key; returns true when the app should quit.
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // An open popup takes every key.
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }

    // Otherwise dispatch on the current screen.
    match app.ui.screen {
        Screen::InitialSetup => handle_wizard_key(app, k).await,
        Screen::Login => handle_login_key(app, k).await,
        Screen::Home => handle_home_key(app, k).await,
        Screen::Work(_) => handle_form_key(app, k).await,
        Screen::Profile => handle_profile_key(app, k).await,
    }
}

pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// Cyclic focus step over `count` fields.
fn step_focus(current: usize, count: usize, forward: bool) -> usize {
    if count == 0 {
        0
    } else if forward {
        (current + 1) % count
    } else {
        (current + count - 1) % count
    }
}

async fn handle_home_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.home;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        // Menu selection wraps at both ends.
        app.ui.selected = step_focus(app.ui.selected, MENU.len(), true);
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        app.ui.selected = step_focus(app.ui.selected, MENU.len(), false);
    } else if shortcuts::matches_shortcut(&k, &sc.enter)
        && let Some(item) = MENU.get(app.ui.selected).copied()
    {
        match item {
            MenuItem::Work(kind) => navigate(app, Screen::Work(kind)).await?,
            MenuItem::Profile => navigate(app, Screen::Profile).await?,
            MenuItem::SignOut => {
                // The gate moves us to Login once the session is gone.
                app.ui.status = "Выход...".into();
                app.send(WorkerCmd::SignOut).await?;
            }
        }
    }

    Ok(false)
}

async fn handle_form_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.form;
    let Some(form) = app.form.as_mut() else {
        // Work screen without a mounted form; only leaving makes sense.
        if shortcuts::matches_shortcut(&k, &sc.back) {
            navigate(app, Screen::Home).await?;
        }
        return Ok(false);
    };

    if shortcuts::matches_shortcut(&k, &sc.back) {
        navigate(app, Screen::Home).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.next_field) {
        app.ui.focused_field = step_focus(app.ui.focused_field, form.field_count(), true);
    } else if shortcuts::matches_shortcut(&k, &sc.prev_field) {
        app.ui.focused_field = step_focus(app.ui.focused_field, form.field_count(), false);
    } else if shortcuts::matches_shortcut(&k, &sc.edit) {
        // Edit the focused field in a popup, showing its format hint.
        let idx = app.ui.focused_field.min(form.field_count().saturating_sub(1));
        let prompt = match form.hint(idx) {
            Some(hint) => format!("{} ({hint}):", form.label(idx)),
            None => format!("{}:", form.label(idx)),
        };
        app.input_box = Some(InputBoxState::new(
            prompt,
            form.value(idx),
            InputCallbackId::FormField(idx),
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.now) {
        form.fill_now(chrono::Local::now().naive_local());
    } else if shortcuts::matches_shortcut(&k, &sc.submit) {
        // Validation errors stay local; only a valid plan reaches the worker.
        match form.prepare_submit() {
            Ok(plan) => {
                app.ui.status = "Сохранение...".into();
                app.send(WorkerCmd::Submit(plan)).await?;
            }
            Err(e) => app.ui.notify(Notice::error(e.to_string())),
        }
    }

    Ok(false)
}

async fn handle_profile_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.profile;

    if shortcuts::matches_shortcut(&k, &sc.back) {
        navigate(app, Screen::Home).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.next_field) {
        app.ui.focused_field = step_focus(app.ui.focused_field, ProfileForm::FIELD_COUNT, true);
    } else if shortcuts::matches_shortcut(&k, &sc.prev_field) {
        app.ui.focused_field = step_focus(app.ui.focused_field, ProfileForm::FIELD_COUNT, false);
    } else if shortcuts::matches_shortcut(&k, &sc.edit) {
        let idx = app.ui.focused_field.min(ProfileForm::FIELD_COUNT - 1);
        app.input_box = Some(InputBoxState::new(
            format!("{}:", UserProfile::LABELS[idx]),
            app.profile.profile.field(idx),
            InputCallbackId::ProfileField(idx),
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.reload) {
        request_profile(app).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.save) {
        // Refused while a load or save is still running.
        match app.profile.prepare_save() {
            Ok((user_id, profile)) => {
                app.ui.status = "Сохранение профиля...".into();
                app.send(WorkerCmd::SaveProfile { user_id, profile }).await?;
            }
            Err(e) => app.ui.notify(Notice::error(e.to_string())),
        }
    }

    Ok(false)
}

async fn handle_login_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.login;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.email) {
        app.input_box = Some(InputBoxState::new(
            "Email:",
            &app.login.email,
            InputCallbackId::LoginEmail,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.password) {
        // Passwords are typed into a masked popup.
        app.input_box = Some(
            InputBoxState::new("Пароль:", &app.login.password, InputCallbackId::LoginPassword)
                .masked(),
        );
    } else if shortcuts::matches_shortcut(&k, &sc.sign_in) {
        match app.login.prepare() {
            Ok((email, password)) => {
                app.ui.status = "Вход...".into();
                app.send(WorkerCmd::SignIn { email, password }).await?;
            }
            Err(e) => app.ui.notify(Notice::error(e.to_string())),
        }
    } else if shortcuts::matches_shortcut(&k, &sc.sign_up) {
        match app.login.prepare() {
            Ok((email, password)) => {
                app.ui.status = "Регистрация...".into();
                app.send(WorkerCmd::SignUp { email, password }).await?;
            }
            Err(e) => app.ui.notify(Notice::error(e.to_string())),
        }
    }

    Ok(false)
}

async fn handle_wizard_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.wizard;

    // Step back without touching collected values.
    if shortcuts::matches_shortcut(&k, &sc.back) {
        app.wizard_state.prev_step();
        return Ok(false);
    }
    // Anything but "proceed" is ignored.
    if !shortcuts::matches_shortcut(&k, &sc.proceed) {
        return Ok(false);
    }

    match app.wizard_state.current_step {
        WizardStep::Welcome => app.wizard_state.next_step(),
        WizardStep::GatewayUrl => {
            app.input_box = Some(InputBoxState::new(
                "Адрес сервера:",
                &app.wizard_state.url,
                InputCallbackId::WizardUrl,
            ));
        }
        WizardStep::AnonKey => {
            app.input_box = Some(InputBoxState::new(
                "Публичный ключ:",
                &app.wizard_state.anon_key,
                InputCallbackId::WizardAnonKey,
            ));
        }
        WizardStep::Complete => {
            if let Some(step) = app.wizard_state.missing_step() {
                app.ui
                    .notify(Notice::error("Заполните адрес сервера и публичный ключ"));
                app.wizard_state.current_step = step;
                return Ok(false);
            }

            // Persist the settings before trying them.
            app.cfg.gateway.url = app.wizard_state.url.trim().to_string();
            app.cfg.gateway.anon_key = app.wizard_state.anon_key.trim().to_string();
            app.cfg.save(&app.cfg_path)?;
            tracing::info!("gateway settings saved");

            if let Err(e) = connect(app).await {
                tracing::error!("gateway connect failed: {e:#}");
                app.ui
                    .notify(Notice::error(format!("Не удалось подключиться: {e}")));
            } else {
                app.ui.notify(Notice::success("Настройка завершена"));
            }
        }
    }

    Ok(false)
}

async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let Some(input_state) = &mut app.input_box else {
        return Ok(false);
    };
    let sc = &app.shortcuts.input_box;

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        // Close the popup first, then store the value.
        let value = input_state.value.clone();
        let callback_id = input_state.callback_id;
        app.input_box = None;
        apply_input_callback(app, callback_id, value);
        return Ok(false);
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        // Motor-id edits were applied live; put the old id back.
        if input_state.callback_id == InputCallbackId::FormField(MOTOR_FIELD)
            && let Some(form) = app.form.as_mut()
        {
            form.set_field(MOTOR_FIELD, input_state.original.clone());
        }
        app.input_box = None;
        return Ok(false);
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        input_state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        input_state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        input_state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        input_state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        input_state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        input_state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        // Plain chars are text, never shortcuts.
        input_state.insert_char(c);
    }

    // The motor id drives the product lookup on every keystroke.
    if input_state.callback_id == InputCallbackId::FormField(MOTOR_FIELD)
        && let Some(form) = app.form.as_mut()
    {
        form.set_field(MOTOR_FIELD, input_state.value.clone());
    }

    Ok(false)
}

/// Store a confirmed value where its input box points.
fn apply_input_callback(app: &mut App, callback_id: InputCallbackId, value: String) {
    match callback_id {
        InputCallbackId::FormField(idx) => {
            if let Some(form) = app.form.as_mut() {
                form.set_field(idx, value);
            }
        }
        InputCallbackId::ProfileField(idx) => app.profile.set_field(idx, value),
        InputCallbackId::LoginEmail => app.login.email = value,
        InputCallbackId::LoginPassword => app.login.password = value,
        InputCallbackId::WizardUrl => {
            app.wizard_state.url = value;
            app.wizard_state.next_step();
        }
        InputCallbackId::WizardAnonKey => {
            app.wizard_state.anon_key = value;
            app.wizard_state.next_step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config, gateway::memory::MemoryGateway, records::OperationKind,
        shortcuts::Shortcuts,
    };
    use std::sync::Arc;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::empty())
    }

    fn code(c: KeyCode) -> KeyEvent {
        KeyEvent::new(c, KeyModifiers::empty())
    }

    async fn signed_in_app(gw: &Arc<MemoryGateway>) -> App {
        let mut app = App::new("config.toml".into(), Config::default(), Shortcuts::default());
        let gateway: Arc<dyn crate::gateway::Gateway> = gw.clone();
        super::super::attach(&mut app, gateway).await;
        app
    }

    #[test]
    fn test_step_focus_wraps() {
        assert_eq!(step_focus(0, 4, false), 3);
        assert_eq!(step_focus(3, 4, true), 0);
        assert_eq!(step_focus(5, 0, true), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_motor_id_drives_lookup() {
        let gw = Arc::new(MemoryGateway::new().signed_in("u1"));
        let mut app = signed_in_app(&gw).await;
        navigate(&mut app, Screen::Work(OperationKind::Disassembly))
            .await
            .unwrap();

        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        assert!(app.input_box.is_some());
        for c in "42".chars() {
            handle_key(&mut app, key(c)).await.unwrap();
        }
        // Live value is visible to the lookup before the popup is confirmed.
        assert_eq!(app.form.as_ref().unwrap().lookup().input(), "42");

        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        assert!(app.input_box.is_none());
        assert_eq!(app.form.as_ref().unwrap().value(MOTOR_FIELD), "42");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_restores_motor_id() {
        let gw = Arc::new(MemoryGateway::new().signed_in("u1"));
        let mut app = signed_in_app(&gw).await;
        navigate(&mut app, Screen::Work(OperationKind::Turning))
            .await
            .unwrap();
        app.form
            .as_mut()
            .unwrap()
            .set_field(MOTOR_FIELD, "42".into());

        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        for c in "7".chars() {
            handle_key(&mut app, key(c)).await.unwrap();
        }
        assert_eq!(app.form.as_ref().unwrap().value(MOTOR_FIELD), "427");

        handle_key(&mut app, code(KeyCode::Esc)).await.unwrap();
        assert!(app.input_box.is_none());
        let form = app.form.as_ref().unwrap();
        assert_eq!(form.value(MOTOR_FIELD), "42");
        assert_eq!(form.lookup().input(), "42");
    }

    #[tokio::test]
    async fn test_letters_are_typed_not_interpreted() {
        let gw = Arc::new(MemoryGateway::new().signed_in("u1"));
        let mut app = signed_in_app(&gw).await;
        navigate(&mut app, Screen::Work(OperationKind::Other))
            .await
            .unwrap();
        app.ui.focused_field = 4;

        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        for c in "sn q".chars() {
            handle_key(&mut app, key(c)).await.unwrap();
        }
        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.form.as_ref().unwrap().value(4), "sn q");
        assert_eq!(gw.insert_calls().len(), 0);
    }

    #[tokio::test]
    async fn test_invalid_submit_shows_notice_without_insert() {
        let gw = Arc::new(MemoryGateway::new().signed_in("u1"));
        let mut app = signed_in_app(&gw).await;
        navigate(&mut app, Screen::Work(OperationKind::Assembly))
            .await
            .unwrap();

        handle_key(&mut app, key('s')).await.unwrap();
        let notice = app.ui.last_notice().unwrap();
        assert_eq!(notice.text, "Заполните поле «ID электродвигателя»");
        assert!(!app.form.as_ref().unwrap().is_submitting());
        assert!(gw.insert_calls().is_empty());
    }

    #[tokio::test]
    async fn test_wizard_collects_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(
            dir.path().join("config.toml"),
            Config::default(),
            Shortcuts::default(),
        );
        app.cfg.session.store_path = dir.path().join("session.json").display().to_string();

        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.wizard_state.current_step, WizardStep::GatewayUrl);

        // Skipping both values bounces back to the first missing one.
        app.wizard_state.current_step = WizardStep::Complete;
        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.wizard_state.current_step, WizardStep::GatewayUrl);

        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        for c in "http://127.0.0.1:9".chars() {
            handle_key(&mut app, key(c)).await.unwrap();
        }
        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        for c in "anon".chars() {
            handle_key(&mut app, key(c)).await.unwrap();
        }
        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.wizard_state.current_step, WizardStep::Complete);

        handle_key(&mut app, code(KeyCode::Enter)).await.unwrap();
        let saved = Config::load_or_default(&app.cfg_path).unwrap();
        assert_eq!(saved.gateway.url, "http://127.0.0.1:9");
        assert_eq!(saved.gateway.anon_key, "anon");
        assert!(app.conn.is_some());
        assert_eq!(app.ui.screen, Screen::Login);
    }
}

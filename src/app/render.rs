//! Drawing for every screen.

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::{
    events::{Notice, NoticeLevel, Screen},
    forms::{OperationForm, ProfileForm},
    input, layout,
    lookup::LookupState,
    records::UserProfile,
    shortcuts::Shortcuts,
};

use super::{App, MENU};

/// Notices kept visible in the side panel.
const NOTICE_LINES: usize = 8;

pub fn draw(f: &mut Frame, app: &App) {
    let main_layout = layout::create_main_layout(f.area());

    match app.ui.screen {
        Screen::InitialSetup => draw_wizard(f, app, main_layout.body),
        Screen::Login => draw_login(f, app, main_layout.body),
        Screen::Home => draw_home(f, app, main_layout.body),
        Screen::Work(_) => match &app.form {
            Some(form) => draw_form(f, app, form, main_layout.body),
            None => draw_message(f, main_layout.body, "Форма недоступна"),
        },
        Screen::Profile => draw_profile(f, app, main_layout.body),
    }

    let help_bar = Paragraph::new(get_help_text(app.ui.screen, &app.shortcuts))
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, main_layout.help_bar);
    f.render_widget(build_status_bar(app), main_layout.status_bar);

    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

fn draw_message(f: &mut Frame, area: Rect, text: &str) {
    let p = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_wizard(f: &mut Frame, app: &App, area: Rect) {
    let w = &app.wizard_state;
    let content = format!(
        "=== Первоначальная настройка ===\n\nШаг {}/{}\n\n{}",
        w.get_step_number(),
        w.total_steps,
        w.get_prompt()
    );
    let panel = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title("Setup"))
        .wrap(Wrap { trim: false });
    f.render_widget(panel, layout::centered(area, 72, 14));
}

fn draw_login(f: &mut Frame, app: &App, area: Rect) {
    let password = "*".repeat(app.login.password.chars().count());
    let mut lines = vec![
        Line::from("Вход в систему"),
        Line::from(""),
        Line::from(format!("Email:  {}", or_dash(&app.login.email))),
        Line::from(format!("Пароль: {}", or_dash(&password))),
    ];
    if app.login.busy {
        lines.push(Line::from(""));
        lines.push(Line::from("Подождите...").style(Style::default().fg(Color::Yellow)));
    }
    if let Some(notice) = app.ui.last_notice() {
        lines.push(Line::from(""));
        lines.push(notice_line(notice));
    }
    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Login"))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, layout::centered(area, 60, 12));
}

fn draw_home(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = MENU.iter().map(|m| ListItem::new(m.label())).collect();
    let title = match app.gate.user_email() {
        Some(email) => format!("Меню ({email})"),
        None => "Меню".to_string(),
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(255, 140, 0))
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(app.ui.selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_form(f: &mut Frame, app: &App, form: &OperationForm, area: Rect) {
    let form_layout = layout::create_form_layout(area);

    let mut lines: Vec<Line> = (0..form.field_count())
        .map(|i| {
            field_line(
                i == app.ui.focused_field,
                form.label(i),
                form.is_required(i),
                form.value(i),
                form.hint(i),
            )
        })
        .collect();
    if form.is_submitting() {
        lines.push(Line::from(""));
        lines.push(Line::from("Сохранение...").style(Style::default().fg(Color::Yellow)));
    }
    let fields = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(form.descriptor().title),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(fields, form_layout.fields);

    let product = Paragraph::new(product_text(form.lookup().state(), form.lookup().input()))
        .block(Block::default().borders(Borders::ALL).title("Изделие"))
        .wrap(Wrap { trim: true });
    f.render_widget(product, form_layout.product_panel);

    draw_notices(f, app, form_layout.notice_panel);
}

fn draw_profile(f: &mut Frame, app: &App, area: Rect) {
    let form_layout = layout::create_form_layout(area);
    let mut lines: Vec<Line> = (0..ProfileForm::FIELD_COUNT)
        .map(|i| {
            field_line(
                i == app.ui.focused_field,
                UserProfile::LABELS[i],
                false,
                app.profile.profile.field(i),
                None,
            )
        })
        .collect();
    if app.profile.is_busy() {
        lines.push(Line::from(""));
        lines.push(Line::from("Подождите...").style(Style::default().fg(Color::Yellow)));
    }
    let fields = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Профиль"))
        .wrap(Wrap { trim: false });
    f.render_widget(fields, form_layout.fields);

    let account = format!(
        "Email: {}",
        or_dash(app.gate.user_email().unwrap_or_default())
    );
    let panel = Paragraph::new(account)
        .block(Block::default().borders(Borders::ALL).title("Учётная запись"))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, form_layout.product_panel);

    draw_notices(f, app, form_layout.notice_panel);
}

fn draw_notices(f: &mut Frame, app: &App, area: Rect) {
    let skip = app.ui.notices.len().saturating_sub(NOTICE_LINES);
    let lines: Vec<Line> = app.ui.notices[skip..].iter().map(notice_line).collect();
    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Сообщения"))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, area);
}

fn field_line(
    focused: bool,
    label: &str,
    required: bool,
    value: &str,
    hint: Option<&str>,
) -> Line<'static> {
    let marker = if focused { "→" } else { " " };
    let star = if required { "*" } else { "" };
    let shown = match (value.is_empty(), hint) {
        (true, Some(hint)) => Span::styled(hint.to_string(), Style::default().fg(Color::DarkGray)),
        _ => Span::raw(value.to_string()),
    };
    let head = format!("{marker} {label}{star}: ");
    let head = if focused {
        Span::styled(head, Style::default().add_modifier(Modifier::BOLD))
    } else {
        Span::raw(head)
    };
    Line::from(vec![head, shown])
}

/// Text for the product info panel.
fn product_text(state: &LookupState, motor_id: &str) -> String {
    match state {
        LookupState::Idle => "Введите ID электродвигателя".into(),
        LookupState::Loading => "Загрузка...".into(),
        LookupState::Found(p) => format!(
            "ID: {}\nНаименование: {}\nКонтрагент: {}",
            p.id,
            or_dash(&p.product_name),
            or_dash(&p.contractor)
        ),
        LookupState::NotFound => format!("Электродвигатель {motor_id} не найден"),
        LookupState::Error(e) => format!("Ошибка загрузки: {e}"),
    }
}

fn notice_line(notice: &Notice) -> Line<'static> {
    Line::from(format!("{} {}", notice.at.format("%H:%M:%S"), notice.text))
        .style(Style::default().fg(level_color(notice.level)))
}

fn level_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Info => Color::Cyan,
        NoticeLevel::Error => Color::Red,
    }
}

fn build_status_bar(app: &App) -> Paragraph<'static> {
    let user = app.gate.user_email().unwrap_or("-");
    let mut text = format!("[{}] {} | {}", app.ui.screen.name(), user, app.ui.status);
    let mut color = Color::Reset;
    if let Some(n) = app.ui.last_notice() {
        text.push_str(" | ");
        text.push_str(&n.text);
        color = level_color(n.level);
    }
    Paragraph::new(text)
    .block(Block::default().borders(Borders::ALL).title("STATUS"))
    .style(Style::default().fg(color))
    .wrap(Wrap { trim: true })
}

fn get_help_text(screen: Screen, shortcuts: &Shortcuts) -> String {
    match screen {
        Screen::InitialSetup => format!(
            "{}: далее | {}: назад | Ctrl+C: выход",
            format_keys(&shortcuts.wizard.proceed),
            format_keys(&shortcuts.wizard.back)
        ),
        Screen::Login => format!(
            "{}: email | {}: пароль | {}: войти | {}: регистрация | {}: выход",
            format_keys(&shortcuts.login.email),
            format_keys(&shortcuts.login.password),
            format_keys(&shortcuts.login.sign_in),
            format_keys(&shortcuts.login.sign_up),
            format_keys(&shortcuts.login.quit)
        ),
        Screen::Home => format!(
            "{}/{}: выбор | {}: открыть | {}: выход",
            format_keys(&shortcuts.home.up),
            format_keys(&shortcuts.home.down),
            format_keys(&shortcuts.home.enter),
            format_keys(&shortcuts.home.quit)
        ),
        Screen::Work(_) => format!(
            "{}/{}: поле | {}: изменить | {}: сейчас | {}: сохранить | {}: назад",
            format_keys(&shortcuts.form.next_field),
            format_keys(&shortcuts.form.prev_field),
            format_keys(&shortcuts.form.edit),
            format_keys(&shortcuts.form.now),
            format_keys(&shortcuts.form.submit),
            format_keys(&shortcuts.form.back)
        ),
        Screen::Profile => format!(
            "{}/{}: поле | {}: изменить | {}: сохранить | {}: обновить | {}: назад",
            format_keys(&shortcuts.profile.next_field),
            format_keys(&shortcuts.profile.prev_field),
            format_keys(&shortcuts.profile.edit),
            format_keys(&shortcuts.profile.save),
            format_keys(&shortcuts.profile.reload),
            format_keys(&shortcuts.profile.back)
        ),
    }
}

fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ProductRecord;

    #[test]
    fn test_product_panel_states() {
        assert_eq!(product_text(&LookupState::Loading, "42"), "Загрузка...");
        let found = LookupState::Found(ProductRecord {
            id: 42,
            product_name: "Motor X".into(),
            contractor: String::new(),
        });
        let text = product_text(&found, "42");
        assert!(text.contains("Motor X"));
        assert!(text.contains("Контрагент: -"));
        assert_eq!(
            product_text(&LookupState::NotFound, "9999"),
            "Электродвигатель 9999 не найден"
        );
    }

    #[test]
    fn test_help_lists_configured_keys() {
        let mut sc = Shortcuts::default();
        sc.form.submit = vec!["F2".into()];
        let help = get_help_text(Screen::Work(crate::records::OperationKind::Other), &sc);
        assert!(help.contains("F2: сохранить"));
    }
}

//! Single-line text input popup used by every editable field.

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// Popup editing state.
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// Label shown above the value.
    pub prompt: String,
    /// Current value.
    pub value: String,
    /// Value the popup opened with, restored on cancel.
    pub original: String,
    /// Cursor position in chars.
    pub cursor: usize,
    /// Where the value goes once confirmed.
    pub callback_id: InputCallbackId,
    /// Render the value as asterisks.
    pub masked: bool,
}

/// Target of an input box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputCallbackId {
    /// Field of the open work form.
    FormField(usize),
    /// Field of the profile editor.
    ProfileField(usize),
    LoginEmail,
    LoginPassword,
    WizardUrl,
    WizardAnonKey,
}

impl InputBoxState {
    /// Open with `value` and the cursor at its end.
    pub fn new(prompt: impl Into<String>, value: &str, callback_id: InputCallbackId) -> Self {
        Self {
            prompt: prompt.into(),
            value: value.to_string(),
            original: value.to_string(),
            cursor: value.chars().count(),
            callback_id,
            masked: false,
        }
    }

    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    /// Insert a char at the cursor.
    pub fn insert_char(&mut self, c: char) {
        let byte = self.byte_index(self.cursor);
        self.value.insert(byte, c);
        self.cursor += 1;
    }

    /// Remove the char before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let byte = self.byte_index(self.cursor - 1);
            self.value.remove(byte);
            self.cursor -= 1;
        }
    }

    /// Remove the char under the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let byte = self.byte_index(self.cursor);
            self.value.remove(byte);
        }
    }

    /// Cursor one char left, stopping at the start.
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// Drop the whole value.
    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Byte offset of a char index; the end of the string when past it.
    fn byte_index(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// Text as it should appear on screen.
    fn display_value(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

/// Draw the input box as a centered popup.
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    // Clear whatever the screen drew underneath.
    let popup_area = centered_popup(f.area(), 70, 7);
    f.render_widget(Clear, popup_area);

    // Frame with a grey background.
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Ввод")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // prompt
            Constraint::Length(1), // value
            Constraint::Length(1),
            Constraint::Length(1), // help
        ])
        .split(popup_area);

    // Prompt line.
    let prompt_widget = Paragraph::new(state.prompt.clone()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt_widget, inner_layout[0]);

    // Scroll horizontally so the cursor stays visible.
    let display_width = inner_layout[1].width as usize;
    let scroll_offset = if state.cursor > display_width.saturating_sub(2) {
        state.cursor.saturating_sub(display_width.saturating_sub(2))
    } else {
        0
    };

    // Split the visible part at the cursor and draw a bar between.
    let visible: Vec<char> = state
        .display_value()
        .chars()
        .skip(scroll_offset)
        .take(display_width)
        .collect();
    let cursor_in_visible = state.cursor.saturating_sub(scroll_offset).min(visible.len());
    let before: String = visible[..cursor_in_visible].iter().collect();
    let after: String = visible[cursor_in_visible..].iter().collect();

    let input_widget =
        Paragraph::new(format!("{before}|{after}")).style(Style::default().fg(Color::Green));
    f.render_widget(input_widget, inner_layout[1]);

    // Key reminder at the bottom.
    let help = Paragraph::new("Enter=подтвердить | Esc=отмена | Ctrl+U=очистить")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, inner_layout[3]);
}

/// Rect of `height` rows and `width_percent` of the width, centered in `area`.
fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    // Vertical band of `height` rows in the middle.
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    // Middle column of that band.
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(value: &str) -> InputBoxState {
        InputBoxState::new("Имя", value, InputCallbackId::ProfileField(0))
    }

    #[test]
    fn test_opens_with_cursor_at_end() {
        let state = boxed("Иван");
        assert_eq!(state.cursor, 4);
        assert!(!state.masked);
    }

    #[test]
    fn test_editing_multibyte_text() {
        let mut state = boxed("Иан");
        state.move_home();
        state.move_right();
        state.insert_char('в');
        assert_eq!(state.value, "Иван");
        assert_eq!(state.cursor, 2);

        state.backspace();
        assert_eq!(state.value, "Иан");
        state.delete();
        assert_eq!(state.value, "Ин");
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut state = boxed("42");
        state.move_right();
        assert_eq!(state.cursor, 2);
        state.delete();
        assert_eq!(state.value, "42");

        state.move_home();
        state.move_left();
        state.backspace();
        assert_eq!(state.cursor, 0);
        assert_eq!(state.value, "42");

        state.move_end();
        state.clear_line();
        assert_eq!(state.value, "");
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn test_masked_display() {
        let state = InputBoxState::new("Пароль", "secret", InputCallbackId::LoginPassword).masked();
        assert_eq!(state.display_value(), "******");
        assert_eq!(boxed("abc").display_value(), "abc");
    }
}

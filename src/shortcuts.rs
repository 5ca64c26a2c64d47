//! Key binding configuration.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// All key bindings, one section per screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortcuts {
    pub home: HomeShortcuts,
    pub form: FormShortcuts,
    pub profile: ProfileShortcuts,
    pub login: LoginShortcuts,
    pub wizard: WizardShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// Navigation menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeShortcuts {
    pub quit: Vec<String>,
    pub enter: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
}

/// Work-record forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormShortcuts {
    pub back: Vec<String>,
    pub next_field: Vec<String>,
    pub prev_field: Vec<String>,
    pub edit: Vec<String>,
    /// Fill date and time with the current moment.
    pub now: Vec<String>,
    pub submit: Vec<String>,
}

/// Profile editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileShortcuts {
    pub back: Vec<String>,
    pub next_field: Vec<String>,
    pub prev_field: Vec<String>,
    pub edit: Vec<String>,
    pub save: Vec<String>,
    pub reload: Vec<String>,
}

/// Sign in / sign up screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginShortcuts {
    pub quit: Vec<String>,
    pub email: Vec<String>,
    pub password: Vec<String>,
    pub sign_in: Vec<String>,
    pub sign_up: Vec<String>,
}

/// First-run setup wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardShortcuts {
    pub proceed: Vec<String>,
    pub back: Vec<String>,
}

/// Input box editing keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

impl Shortcuts {
    /// Read `shortcut.toml`, falling back to the built-in bindings.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        // A missing file means the defaults.
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            home: HomeShortcuts {
                quit: keys(&["q"]),
                enter: keys(&["Enter"]),
                down: keys(&["Down", "j"]),
                up: keys(&["Up", "k"]),
            },
            form: FormShortcuts {
                back: keys(&["Esc"]),
                next_field: keys(&["Tab", "Down"]),
                prev_field: keys(&["Shift+BackTab", "BackTab", "Up"]),
                edit: keys(&["Enter", "e"]),
                now: keys(&["n"]),
                submit: keys(&["s", "Ctrl+s"]),
            },
            profile: ProfileShortcuts {
                back: keys(&["Esc"]),
                next_field: keys(&["Tab", "Down"]),
                prev_field: keys(&["Shift+BackTab", "BackTab", "Up"]),
                edit: keys(&["Enter", "e"]),
                save: keys(&["s", "Ctrl+s"]),
                reload: keys(&["r"]),
            },
            login: LoginShortcuts {
                quit: keys(&["q", "Esc"]),
                email: keys(&["e"]),
                password: keys(&["p"]),
                sign_in: keys(&["Enter"]),
                sign_up: keys(&["u"]),
            },
            wizard: WizardShortcuts {
                proceed: keys(&["Enter"]),
                back: keys(&["Esc"]),
            },
            input_box: InputBoxShortcuts {
                confirm: keys(&["Enter"]),
                cancel: keys(&["Esc"]),
                backspace: keys(&["Backspace"]),
                delete: keys(&["Delete"]),
                left: keys(&["Left"]),
                right: keys(&["Right"]),
                home: keys(&["Home"]),
                end: keys(&["End"]),
                clear_line: keys(&["Ctrl+u"]),
            },
        }
    }
}

/// True when the key event matches any of the binding strings.
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

/// Match one binding such as `"q"`, `"Enter"` or `"Ctrl+u"`.
fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    // Last part is the key, everything before it a modifier.
    let parts: Vec<&str> = shortcut.split('+').collect();
    let (modifiers_str, key_str) = match parts.split_last() {
        Some((last, mods)) => (mods, *last),
        None => return false,
    };

    // Unknown modifier names never match.
    let mut expected_modifiers = KeyModifiers::empty();
    for modifier in modifiers_str {
        match *modifier {
            "Ctrl" | "ctrl" => expected_modifiers |= KeyModifiers::CONTROL,
            "Alt" | "alt" => expected_modifiers |= KeyModifiers::ALT,
            "Shift" | "shift" => expected_modifiers |= KeyModifiers::SHIFT,
            _ => return false,
        }
    }
    // Modifiers must match exactly, so "q" does not fire on Ctrl+q.
    if key.modifiers != expected_modifiers {
        return false;
    }

    match key_str {
        "Enter" | "enter" => key.code == KeyCode::Enter,
        "Esc" | "esc" => key.code == KeyCode::Esc,
        "Tab" | "tab" => key.code == KeyCode::Tab,
        "BackTab" | "backtab" => key.code == KeyCode::BackTab,
        "Backspace" | "backspace" => key.code == KeyCode::Backspace,
        "Delete" | "delete" => key.code == KeyCode::Delete,
        "Up" | "up" => key.code == KeyCode::Up,
        "Down" | "down" => key.code == KeyCode::Down,
        "Left" | "left" => key.code == KeyCode::Left,
        "Right" | "right" => key.code == KeyCode::Right,
        "Home" | "home" => key.code == KeyCode::Home,
        "End" | "end" => key.code == KeyCode::End,
        // Any single char, non-ASCII included.
        s => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => key.code == KeyCode::Char(c),
                _ => false,
            }
        }
    }
}

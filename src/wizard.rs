//! First-run setup wizard collecting the gateway connection settings.

/// Wizard steps in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardStep {
    Welcome,
    /// Project URL of the row store.
    GatewayUrl,
    /// Public anon key.
    AnonKey,
    Complete,
}

/// Wizard progress plus the values entered so far.
#[derive(Clone, Debug)]
pub struct WizardState {
    pub current_step: WizardStep,
    pub total_steps: usize,
    pub url: String,
    pub anon_key: String,
}

impl WizardState {
    /// Start at the welcome page, prefilled with whatever the config holds.
    pub fn new(url: &str, anon_key: &str) -> Self {
        Self {
            current_step: WizardStep::Welcome,
            total_steps: 4,
            url: url.to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    /// Advance one step; `Complete` is terminal.
    pub fn next_step(&mut self) {
        self.current_step = match self.current_step {
            WizardStep::Welcome => WizardStep::GatewayUrl,
            WizardStep::GatewayUrl => WizardStep::AnonKey,
            WizardStep::AnonKey | WizardStep::Complete => WizardStep::Complete,
        };
    }

    /// Go back one step; `Welcome` is the floor.
    pub fn prev_step(&mut self) {
        self.current_step = match self.current_step {
            WizardStep::Welcome | WizardStep::GatewayUrl => WizardStep::Welcome,
            WizardStep::AnonKey => WizardStep::GatewayUrl,
            WizardStep::Complete => WizardStep::AnonKey,
        };
    }

    /// First step whose value is still missing, if any.
    pub fn missing_step(&self) -> Option<WizardStep> {
        // Whitespace-only counts as missing.
        if self.url.trim().is_empty() {
            Some(WizardStep::GatewayUrl)
        } else if self.anon_key.trim().is_empty() {
            Some(WizardStep::AnonKey)
        } else {
            None
        }
    }

    /// Text shown for the current step.
    pub fn get_prompt(&self) -> String {
        match self.current_step {
            WizardStep::Welcome => "Добро пожаловать!\n\n\
                 Для работы нужен адрес сервера данных и публичный ключ.\n\
                 Нажмите Enter, чтобы начать."
                .to_string(),
            WizardStep::GatewayUrl => format!(
                "Адрес сервера\n\nНапример https://xyz.supabase.co\nТекущее значение: {}\n\n\
                 Нажмите Enter, чтобы ввести.",
                or_dash(&self.url)
            ),
            WizardStep::AnonKey => format!(
                "Публичный ключ (anon key)\n\nТекущее значение: {}\n\nНажмите Enter, чтобы ввести.",
                if self.anon_key.is_empty() { "-" } else { "задан" }
            ),
            WizardStep::Complete => format!(
                "Настройка завершена\n\nСервер: {}\n\nНажмите Enter, чтобы сохранить и перейти ко входу.",
                or_dash(&self.url)
            ),
        }
    }

    /// 1-based step number.
    pub fn get_step_number(&self) -> usize {
        match self.current_step {
            WizardStep::Welcome => 1,
            WizardStep::GatewayUrl => 2,
            WizardStep::AnonKey => 3,
            WizardStep::Complete => 4,
        }
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

//! Form state, validation and row shaping for every editable screen.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    events::Notice,
    lookup::{ProductLookup, parse_motor_id},
    records::{FieldRole, FormDescriptor, OperationKind, UserProfile},
};

/// Positions of the fields every work-record form starts with.
pub const MOTOR_FIELD: usize = 0;
pub const EMPLOYEE_FIELD: usize = 1;
pub const DATE_FIELD: usize = 2;
pub const TIME_FIELD: usize = 3;
const COMMON_LABELS: [&str; 2] = ["ID электродвигателя", "ID сотрудника"];
pub const COMMON_FIELDS: usize = 4;

/// Every mounted form gets its own id so a late insert result can only
/// finish the form that sent it.
static NEXT_FORM_ID: AtomicU64 = AtomicU64::new(1);

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Input problems caught before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Заполните поле «{0}»")]
    MissingField(&'static str),
    #[error("Пожалуйста, введите корректный ID электродвигателя")]
    InvalidMotorId,
    #[error("Дата должна быть в формате ГГГГ-ММ-ДД")]
    InvalidDate,
    #[error("Время должно быть в формате ЧЧ:ММ")]
    InvalidTime,
    #[error("Необходимо указать хотя бы один ID детали")]
    NoParts,
    #[error("Отправка уже выполняется")]
    Busy,
    #[error("Профиль ещё не загружен")]
    ProfileNotLoaded,
}

/// Rows ready for a single insert.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitPlan {
    /// Id of the form instance that produced the plan.
    pub form_id: u64,
    pub kind: OperationKind,
    pub table: &'static str,
    pub rows: Vec<Value>,
}

/// Build the rows for one submission.
///
/// `values` holds the four common fields followed by the descriptor's extras.
/// Parts-style descriptors yield one row per filled part field, everything
/// else yields exactly one row.
pub fn shape_rows(descriptor: &FormDescriptor, values: &[String]) -> Result<Vec<Value>, FormError> {
    let value = |idx: usize| values.get(idx).map(|v| v.trim()).unwrap_or("");

    let labels = [
        COMMON_LABELS[0],
        COMMON_LABELS[1],
        descriptor.date_label,
        descriptor.time_label,
    ];
    for (idx, label) in labels.into_iter().enumerate() {
        if value(idx).is_empty() {
            return Err(FormError::MissingField(label));
        }
    }
    for (i, spec) in descriptor.extras.iter().enumerate() {
        if spec.required && value(COMMON_FIELDS + i).is_empty() {
            return Err(FormError::MissingField(spec.label));
        }
    }

    let motor_id = parse_motor_id(value(MOTOR_FIELD)).map_err(|_| FormError::InvalidMotorId)?;
    NaiveDate::parse_from_str(value(DATE_FIELD), DATE_FORMAT).map_err(|_| FormError::InvalidDate)?;
    NaiveTime::parse_from_str(value(TIME_FIELD), TIME_FORMAT).map_err(|_| FormError::InvalidTime)?;

    let mut common = Map::new();
    common.insert("motor_id".into(), json!(motor_id));
    common.insert("employee_id".into(), json!(value(EMPLOYEE_FIELD)));
    common.insert(descriptor.date_column.into(), json!(value(DATE_FIELD)));
    common.insert(descriptor.time_column.into(), json!(value(TIME_FIELD)));

    if descriptor.fans_out() {
        let rows: Vec<Value> = descriptor
            .extras
            .iter()
            .enumerate()
            .filter(|(i, spec)| spec.role == FieldRole::Part && !value(COMMON_FIELDS + i).is_empty())
            .map(|(i, spec)| {
                let mut row = common.clone();
                row.insert(spec.column.into(), json!(value(COMMON_FIELDS + i)));
                Value::Object(row)
            })
            .collect();
        if rows.is_empty() {
            return Err(FormError::NoParts);
        }
        return Ok(rows);
    }

    let mut row = common;
    for (i, spec) in descriptor.extras.iter().enumerate() {
        row.insert(spec.column.into(), json!(value(COMMON_FIELDS + i)));
    }
    Ok(vec![Value::Object(row)])
}

/// One work-record form: field buffers, its product lookup, submit state.
pub struct OperationForm {
    id: u64,
    descriptor: &'static FormDescriptor,
    values: Vec<String>,
    lookup: ProductLookup,
    submitting: bool,
}

impl OperationForm {
    pub fn new(kind: OperationKind, lookup: ProductLookup) -> Self {
        let descriptor = kind.descriptor();
        Self {
            id: NEXT_FORM_ID.fetch_add(1, Ordering::Relaxed),
            descriptor,
            values: vec![String::new(); COMMON_FIELDS + descriptor.extras.len()],
            lookup,
            submitting: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.descriptor.kind
    }

    pub fn descriptor(&self) -> &'static FormDescriptor {
        self.descriptor
    }

    pub fn field_count(&self) -> usize {
        self.values.len()
    }

    pub fn label(&self, idx: usize) -> &'static str {
        match idx {
            MOTOR_FIELD | EMPLOYEE_FIELD => COMMON_LABELS[idx],
            DATE_FIELD => self.descriptor.date_label,
            TIME_FIELD => self.descriptor.time_label,
            _ => self.descriptor.extras[idx - COMMON_FIELDS].label,
        }
    }

    /// Placeholder hint for fields with a fixed format.
    pub fn hint(&self, idx: usize) -> Option<&'static str> {
        match idx {
            DATE_FIELD => Some("ГГГГ-ММ-ДД"),
            TIME_FIELD => Some("ЧЧ:ММ"),
            _ => None,
        }
    }

    pub fn is_required(&self, idx: usize) -> bool {
        idx < COMMON_FIELDS || self.descriptor.extras[idx - COMMON_FIELDS].required
    }

    pub fn value(&self, idx: usize) -> &str {
        self.values.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Store a field; edits of the motor id also drive the lookup.
    pub fn set_field(&mut self, idx: usize, value: String) {
        if idx >= self.values.len() {
            return;
        }
        if idx == MOTOR_FIELD {
            self.lookup.set_input(&value);
        }
        self.values[idx] = value;
    }

    /// Fill date and time from a timestamp (normally "now").
    pub fn fill_now(&mut self, now: NaiveDateTime) {
        self.values[DATE_FIELD] = now.format(DATE_FORMAT).to_string();
        self.values[TIME_FIELD] = now.format(TIME_FORMAT).to_string();
    }

    pub fn lookup(&self) -> &ProductLookup {
        &self.lookup
    }

    pub fn lookup_mut(&mut self) -> &mut ProductLookup {
        &mut self.lookup
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Validate and shape the rows; on success the form counts as submitting
    /// until [`OperationForm::finish_submit`] is called.
    pub fn prepare_submit(&mut self) -> Result<SubmitPlan, FormError> {
        if self.submitting {
            return Err(FormError::Busy);
        }
        let rows = shape_rows(self.descriptor, &self.values)?;
        self.submitting = true;
        Ok(SubmitPlan {
            form_id: self.id,
            kind: self.descriptor.kind,
            table: self.descriptor.table,
            rows,
        })
    }

    /// Apply the insert result. Success clears the form and its lookup;
    /// failure keeps every value so the user can retry.
    pub fn finish_submit(&mut self, result: Result<(), String>) -> Notice {
        self.submitting = false;
        if result.is_ok() {
            self.reset();
        }
        submit_notice(&result)
    }

    fn reset(&mut self) {
        for v in &mut self.values {
            v.clear();
        }
        self.lookup.clear();
    }
}

/// Notice for an insert result, also used when the form has been closed.
pub fn submit_notice(result: &Result<(), String>) -> Notice {
    match result {
        Ok(()) => Notice::success("Данные успешно сохранены"),
        Err(message) => Notice::error(format!("Ошибка при сохранении данных: {message}")),
    }
}

/// Profile editor state.
#[derive(Debug, Default)]
pub struct ProfileForm {
    pub profile: UserProfile,
    /// Owner of the row, known once the screen has been entered.
    user_id: Option<String>,
    loading: bool,
    saving: bool,
}

impl ProfileForm {
    pub const FIELD_COUNT: usize = UserProfile::LABELS.len();

    /// Start loading the row for `user_id`; clears anything shown before.
    pub fn begin_load(&mut self, user_id: String) {
        self.profile = UserProfile::default();
        self.user_id = Some(user_id);
        self.loading = true;
    }

    /// Apply the loaded row (or its absence).
    pub fn finish_load(&mut self, result: Result<Option<UserProfile>, String>) -> Option<Notice> {
        self.loading = false;
        match result {
            Ok(Some(profile)) => {
                self.profile = profile;
                None
            }
            Ok(None) => None,
            Err(e) => Some(Notice::error(format!("Ошибка при загрузке профиля: {e}"))),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.loading || self.saving
    }

    pub fn set_field(&mut self, idx: usize, value: String) {
        self.profile.set_field(idx, value);
    }

    /// Owner id and the full patch to write.
    pub fn prepare_save(&mut self) -> Result<(String, UserProfile), FormError> {
        if self.is_busy() {
            return Err(FormError::Busy);
        }
        let user_id = self.user_id.clone().ok_or(FormError::ProfileNotLoaded)?;
        self.saving = true;
        Ok((user_id, self.profile.clone()))
    }

    pub fn finish_save(&mut self, result: Result<(), String>) -> Notice {
        self.saving = false;
        match result {
            Ok(()) => Notice::success("Профиль успешно обновлен"),
            Err(e) => Notice::error(format!("Ошибка при обновлении профиля: {e}")),
        }
    }
}

/// Sign in / sign up inputs.
#[derive(Debug, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub busy: bool,
}

impl LoginForm {
    /// Both fields must be filled; marks the form busy.
    pub fn prepare(&mut self) -> Result<(String, String), FormError> {
        if self.busy {
            return Err(FormError::Busy);
        }
        if self.email.trim().is_empty() {
            return Err(FormError::MissingField("Email"));
        }
        if self.password.is_empty() {
            return Err(FormError::MissingField("Password"));
        }
        self.busy = true;
        Ok((self.email.trim().to_string(), self.password.clone()))
    }

    /// Called when the auth call returns; the password is never kept after a
    /// successful sign in.
    pub fn finish(&mut self, signed_in: bool) {
        self.busy = false;
        if signed_in {
            self.password.clear();
        }
    }
}

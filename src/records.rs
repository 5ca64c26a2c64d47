//! Work-record kinds, their table layouts, and the rows read from the store.

use serde::{Deserialize, Deserializer, Serialize};

/// Table holding product metadata keyed by motor id.
pub const PRODUCT_TABLE: &str = "product_data";
/// Key column of [`PRODUCT_TABLE`].
pub const PRODUCT_KEY: &str = "id";
/// Table holding one profile row per user.
pub const PROFILE_TABLE: &str = "user";
/// Key column of [`PROFILE_TABLE`].
pub const PROFILE_KEY: &str = "user_id";
/// Column that receives fanned-out part ids.
pub const PART_COLUMN: &str = "part_id";

/// Product metadata shown next to a motor id.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub product_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contractor: String,
}

/// Editable columns of the `user` table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub patronymic: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub position_employee: String,
}

/// Nullable text columns read as empty strings.
fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

impl UserProfile {
    /// Field labels in display order.
    pub const LABELS: [&'static str; 4] = ["Имя", "Фамилия", "Отчество", "Должность"];

    pub fn field(&self, idx: usize) -> &str {
        match idx {
            0 => &self.first_name,
            1 => &self.last_name,
            2 => &self.patronymic,
            _ => &self.position_employee,
        }
    }

    pub fn set_field(&mut self, idx: usize, value: String) {
        match idx {
            0 => self.first_name = value,
            1 => self.last_name = value,
            2 => self.patronymic = value,
            _ => self.position_employee = value,
        }
    }
}

/// Kind of maintenance work a record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Assembly,
    Disassembly,
    Winding,
    Turning,
    Other,
}

/// How an operation-specific field lands in the inserted rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldRole {
    /// Written to its own column of the single row.
    Column,
    /// A replacement part id; each filled one becomes its own row.
    Part,
}

/// One operation-specific input.
#[derive(Debug)]
pub struct FieldSpec {
    pub label: &'static str,
    pub column: &'static str,
    pub required: bool,
    pub role: FieldRole,
}

/// Everything that differs between the work-record forms.
#[derive(Debug)]
pub struct FormDescriptor {
    pub kind: OperationKind,
    pub title: &'static str,
    pub table: &'static str,
    pub date_label: &'static str,
    pub date_column: &'static str,
    pub time_label: &'static str,
    pub time_column: &'static str,
    pub extras: &'static [FieldSpec],
}

impl FormDescriptor {
    /// True when the extras fan out into one row per part.
    pub fn fans_out(&self) -> bool {
        self.extras.iter().any(|f| f.role == FieldRole::Part)
    }
}

static ASSEMBLY: FormDescriptor = FormDescriptor {
    kind: OperationKind::Assembly,
    title: "Регистрация сборки электродвигателя",
    table: "motor_assembly",
    date_label: "Дата сборки",
    date_column: "assembly_date",
    time_label: "Время сборки",
    time_column: "assembly_time",
    extras: &[
        FieldSpec {
            label: "Замена подшипника (ID)",
            column: PART_COLUMN,
            required: false,
            role: FieldRole::Part,
        },
        FieldSpec {
            label: "Замена вентилятора (ID)",
            column: PART_COLUMN,
            required: false,
            role: FieldRole::Part,
        },
        FieldSpec {
            label: "Замена уплотнения торцевого (ID)",
            column: PART_COLUMN,
            required: false,
            role: FieldRole::Part,
        },
    ],
};

static DISASSEMBLY: FormDescriptor = FormDescriptor {
    kind: OperationKind::Disassembly,
    title: "Регистрация разборки электродвигателя",
    table: "motor_disassembly",
    date_label: "Дата разборки",
    date_column: "disassembly_date",
    time_label: "Время разборки",
    time_column: "disassembly_time",
    extras: &[],
};

static WINDING: FormDescriptor = FormDescriptor {
    kind: OperationKind::Winding,
    title: "Регистрация обмотки электродвигателя",
    table: "motor_winding",
    date_label: "Дата обмотки",
    date_column: "winding_date",
    time_label: "Время обмотки",
    time_column: "winding_time",
    extras: &[
        FieldSpec {
            label: "Расход провода",
            column: "wire_consumption",
            required: false,
            role: FieldRole::Column,
        },
        FieldSpec {
            label: "Количество палочек",
            column: "stick_quantity",
            required: false,
            role: FieldRole::Column,
        },
    ],
};

static TURNING: FormDescriptor = FormDescriptor {
    kind: OperationKind::Turning,
    title: "Регистрация токарных работ",
    table: "motor_turning",
    date_label: "Дата токарных работ",
    date_column: "turning_date",
    time_label: "Время токарных работ",
    time_column: "turning_time",
    extras: &[],
};

static OTHER: FormDescriptor = FormDescriptor {
    kind: OperationKind::Other,
    title: "Регистрация прочих работ",
    table: "other_works",
    date_label: "Дата работы",
    date_column: "work_date",
    time_label: "Время работы",
    time_column: "work_time",
    extras: &[FieldSpec {
        label: "Описание работы",
        column: "description",
        required: true,
        role: FieldRole::Column,
    }],
};

impl OperationKind {
    /// Menu order.
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Assembly,
        OperationKind::Disassembly,
        OperationKind::Winding,
        OperationKind::Turning,
        OperationKind::Other,
    ];

    pub fn descriptor(self) -> &'static FormDescriptor {
        match self {
            OperationKind::Assembly => &ASSEMBLY,
            OperationKind::Disassembly => &DISASSEMBLY,
            OperationKind::Winding => &WINDING,
            OperationKind::Turning => &TURNING,
            OperationKind::Other => &OTHER,
        }
    }

    /// Short label for the navigation menu.
    pub fn menu_label(self) -> &'static str {
        match self {
            OperationKind::Assembly => "Сборка электродвигателя",
            OperationKind::Disassembly => "Разборка электродвигателя",
            OperationKind::Winding => "Обмотка электродвигателя",
            OperationKind::Turning => "Токарные работы",
            OperationKind::Other => "Прочие работы",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_assembly_fans_out() {
        for kind in OperationKind::ALL {
            let d = kind.descriptor();
            assert_eq!(d.kind, kind);
            assert_eq!(d.fans_out(), kind == OperationKind::Assembly);
        }
    }

    #[test]
    fn test_product_record_ignores_extra_columns() {
        let row = serde_json::json!({
            "id": 42,
            "product_name": "Motor X",
            "contractor": "ACME",
            "created_at": "2024-01-01T00:00:00Z"
        });
        let product: ProductRecord = serde_json::from_value(row).unwrap();
        assert_eq!(product.id, 42);
        assert_eq!(product.contractor, "ACME");
    }

    #[test]
    fn test_profile_tolerates_missing_columns() {
        let row = serde_json::json!({ "user_id": "u1", "first_name": "Иван", "patronymic": null });
        let profile: UserProfile = serde_json::from_value(row).unwrap();
        assert_eq!(profile.first_name, "Иван");
        assert_eq!(profile.patronymic, "");
        assert_eq!(profile.position_employee, "");
    }
}

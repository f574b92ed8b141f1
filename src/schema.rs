use crate::models::{EntityKind, Record};
use chrono::Utc;
use rand::Rng;
use serde_json::Value;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Date,
    Boolean,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Text(&'static str),
    Integer(i64),
    Flag(bool),
    EmptyArray,
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.to_string()),
            Self::Integer(number) => Value::from(number),
            Self::Flag(flag) => Value::Bool(flag),
            Self::EmptyArray => Value::Array(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRule {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: Option<DefaultValue>,
}

impl FieldRule {
    const fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            min: None,
            max: None,
            default: None,
        }
    }

    const fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            required: true,
            ..Self::optional(name, field_type)
        }
    }

    const fn with_default(self, default: DefaultValue) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    const fn bounded(self, min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..self
        }
    }
}

use DefaultValue::{EmptyArray, Flag, Integer, Text};
use FieldType::{Array, Boolean, Date, Number, String as Str};

const ARCHIVED: FieldRule = FieldRule::optional("archived", Boolean).with_default(Flag(false));

static KPI_SCHEMA: &[FieldRule] = &[
    FieldRule::required("id", Str),
    FieldRule::required("name", Str),
    FieldRule::required("category", Str),
    FieldRule::required("department", Str),
    FieldRule::required("value", Number),
    FieldRule::optional("target", Number),
    FieldRule::optional("unit", Str).with_default(Text("")),
    FieldRule::optional("previousValue", Number),
    FieldRule::optional("trend", Array),
    FieldRule::required("lastUpdated", Date),
    FieldRule::optional("updatedBy", Str),
    ARCHIVED,
];

static PROJECT_SCHEMA: &[FieldRule] = &[
    FieldRule::required("id", Str),
    FieldRule::required("name", Str),
    FieldRule::required("type", Str),
    FieldRule::required("status", Str),
    FieldRule::optional("description", Str),
    FieldRule::optional("budget", Number),
    FieldRule::optional("spent", Number).with_default(Integer(0)),
    FieldRule::optional("owner", Str),
    FieldRule::optional("department", Str),
    FieldRule::optional("startDate", Date),
    FieldRule::optional("endDate", Date),
    FieldRule::optional("milestones", Array).with_default(EmptyArray),
    FieldRule::required("lastUpdated", Date),
    ARCHIVED,
];

static TECHNOLOGY_SCHEMA: &[FieldRule] = &[
    FieldRule::required("id", Str),
    FieldRule::required("name", Str),
    FieldRule::optional("description", Str),
    FieldRule::required("trlLevel", Number).bounded(1.0, 9.0),
    FieldRule::optional("targetTrl", Number).bounded(1.0, 9.0),
    FieldRule::required("status", Str),
    FieldRule::optional("roadmapStatus", Str),
    FieldRule::optional("blockers", Array).with_default(EmptyArray),
    FieldRule::optional("dependencies", Array).with_default(EmptyArray),
    FieldRule::optional("category", Str),
    FieldRule::required("lastUpdated", Date),
    ARCHIVED,
];

static CONTRACT_SCHEMA: &[FieldRule] = &[
    FieldRule::required("id", Str),
    FieldRule::required("client", Str),
    FieldRule::required("type", Str),
    FieldRule::required("value", Number),
    FieldRule::optional("startDate", Date),
    FieldRule::optional("endDate", Date),
    FieldRule::required("status", Str),
    FieldRule::optional("notes", Str),
    FieldRule::optional("contactPerson", Str),
    FieldRule::required("lastUpdated", Date),
    ARCHIVED,
];

static LAUNCH_SCHEMA: &[FieldRule] = &[
    FieldRule::required("id", Str),
    FieldRule::required("name", Str),
    FieldRule::required("platform", Str),
    FieldRule::required("plannedDate", Date),
    FieldRule::optional("executedDate", Date),
    FieldRule::required("status", Str),
    FieldRule::optional("success", Boolean),
    FieldRule::optional("flightHours", Number).with_default(Integer(0)),
    FieldRule::optional("payload", Str),
    FieldRule::optional("notes", Str),
    FieldRule::required("lastUpdated", Date),
    ARCHIVED,
];

static PERSON_SCHEMA: &[FieldRule] = &[
    FieldRule::required("id", Str),
    FieldRule::required("name", Str),
    FieldRule::required("department", Str),
    FieldRule::required("role", Str),
    FieldRule::optional("startDate", Date),
    FieldRule::required("status", Str),
    FieldRule::optional("email", Str),
    FieldRule::required("lastUpdated", Date),
    ARCHIVED,
];

static MILESTONE_SCHEMA: &[FieldRule] = &[
    FieldRule::required("id", Str),
    FieldRule::required("name", Str),
    FieldRule::optional("projectId", Str),
    FieldRule::optional("dueDate", Date),
    FieldRule::optional("completedDate", Date),
    FieldRule::required("status", Str),
    FieldRule::optional("notes", Str),
    FieldRule::required("lastUpdated", Date),
    ARCHIVED,
];

/// Field rules for a kind, in declaration order.
pub fn schema_for(kind: EntityKind) -> &'static [FieldRule] {
    match kind {
        EntityKind::Kpi => KPI_SCHEMA,
        EntityKind::Project => PROJECT_SCHEMA,
        EntityKind::Technology => TECHNOLOGY_SCHEMA,
        EntityKind::Contract => CONTRACT_SCHEMA,
        EntityKind::Launch => LAUNCH_SCHEMA,
        EntityKind::Person => PERSON_SCHEMA,
        EntityKind::Milestone => MILESTONE_SCHEMA,
    }
}

/// `<unix-millis>-<9 base36 chars>`; unique within one client, not across processes.
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Fills declared defaults for missing keys only. Present keys, including
/// explicit `null` and `""`, are left untouched.
pub fn apply_defaults(kind: EntityKind, record: Record) -> Record {
    let mut result = record;
    for rule in schema_for(kind) {
        let Some(default) = rule.default else {
            continue;
        };
        if !result.contains_key(rule.name) {
            result.insert(rule.name.to_string(), default.to_value());
        }
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Department {
    pub id: &'static str,
    pub name: &'static str,
}

static DEPARTMENTS: &[Department] = &[
    Department { id: "finance", name: "Finance" },
    Department { id: "operations", name: "Operations / Flight" },
    Department { id: "technology", name: "Technology / R&D" },
    Department { id: "sales", name: "Sales & Partnerships" },
    Department { id: "projects", name: "Projects & Programs" },
    Department { id: "people", name: "People / Team" },
];

pub fn departments() -> &'static [Department] {
    DEPARTMENTS
}

pub fn trl_description(level: u8) -> Option<&'static str> {
    let description = match level {
        1 => "Basic principles observed",
        2 => "Technology concept formulated",
        3 => "Proof of concept",
        4 => "Lab validation",
        5 => "Relevant environment validation",
        6 => "Demonstrated in relevant environment",
        7 => "System prototype in space",
        8 => "System complete and qualified",
        9 => "Mission proven",
        _ => return None,
    };
    Some(description)
}

#[cfg(test)]
mod tests {
    use super::{apply_defaults, departments, generate_id, schema_for, trl_description};
    use crate::models::EntityKind;
    use serde_json::json;

    #[test]
    fn generated_ids_have_timestamp_and_suffix() {
        let id = generate_id();
        let (millis, suffix) = id.split_once('-').expect("separator");
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(generate_id(), generate_id());
    }

    #[test]
    fn defaults_fill_only_missing_keys() {
        let input = json!({ "name": "Stratosat", "unit": null, "spent": "" });
        let record = input.as_object().expect("object").clone();

        let project = apply_defaults(EntityKind::Project, record.clone());
        assert_eq!(project["spent"], json!(""));
        assert_eq!(project["milestones"], json!([]));
        assert_eq!(project["archived"], json!(false));

        let launch = apply_defaults(EntityKind::Launch, record.clone());
        assert_eq!(launch["flightHours"], json!(0));
        assert!(launch["flightHours"].is_i64());

        let kpi = apply_defaults(EntityKind::Kpi, record);
        assert!(kpi["unit"].is_null());
    }

    #[test]
    fn every_schema_declares_universal_fields() {
        for kind in EntityKind::ALL {
            let names: Vec<&str> = schema_for(kind).iter().map(|rule| rule.name).collect();
            assert!(names.contains(&"id"), "{} lacks id", kind);
            assert!(names.contains(&"lastUpdated"), "{} lacks lastUpdated", kind);
            assert!(names.contains(&"archived"), "{} lacks archived", kind);
        }
    }

    #[test]
    fn trl_descriptions_cover_one_to_nine() {
        assert_eq!(trl_description(1), Some("Basic principles observed"));
        assert_eq!(trl_description(9), Some("Mission proven"));
        assert_eq!(trl_description(0), None);
        assert_eq!(trl_description(10), None);
    }

    #[test]
    fn department_ids_are_unique() {
        let mut ids: Vec<&str> = departments().iter().map(|department| department.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }
}

use crate::errors::AppResult;
use crate::models::{EntityKind, Record};
use crate::schema::{schema_for, FieldRule, FieldType};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Checks every field rule in declaration order and collects all failures.
pub fn validate(kind: EntityKind, record: &Record) -> ValidationReport {
    let mut errors = Vec::new();

    for rule in schema_for(kind) {
        let value = record.get(rule.name);

        if rule.required && is_blank(value) {
            errors.push(format!("{} is required", rule.name));
            continue;
        }

        let Some(value) = value.filter(|value| !value.is_null()) else {
            continue;
        };

        if let Some(error) = type_error(rule, value) {
            errors.push(error);
        }
        errors.extend(bound_errors(rule, value));
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

/// Resolves `kind` by name first; an unknown name is a configuration error,
/// not a validation failure.
pub fn validate_named(kind: &str, record: &Record) -> AppResult<ValidationReport> {
    let kind: EntityKind = kind.parse()?;
    Ok(validate(kind, record))
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

/// Only numbers and strings are checked by representation. Date, boolean and
/// array fields take whatever the form sends, including `""` for a blank input.
fn type_error(rule: &FieldRule, value: &Value) -> Option<String> {
    let (matches, expected) = match rule.field_type {
        FieldType::String => (value.is_string(), "a string"),
        FieldType::Number => (value.is_number(), "a number"),
        FieldType::Date | FieldType::Boolean | FieldType::Array => return None,
    };
    (!matches).then(|| format!("{} must be {}", rule.name, expected))
}

fn bound_errors(rule: &FieldRule, value: &Value) -> Vec<String> {
    let Some(number) = value.as_f64() else {
        return Vec::new();
    };

    let mut errors = Vec::new();
    if let Some(min) = rule.min {
        if number < min {
            errors.push(format!("{} must be at least {}", rule.name, min));
        }
    }
    if let Some(max) = rule.max {
        if number > max {
            errors.push(format!("{} must be at most {}", rule.name, max));
        }
    }
    errors
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates.
pub fn is_date(raw: &str) -> bool {
    DateTime::parse_from_rfc3339(raw).is_ok() || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

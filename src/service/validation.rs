//! Request validation against registry rules.
//!
//! Produces per-field message arrays; nothing is mutated until the whole
//! body has been checked. Uniqueness and foreign-key existence are database
//! checks and live in the CRUD service; they merge into the same error map.

use crate::error::ValidationErrors;
use crate::registry::{EntityDef, FieldRule, PgType};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Full validation for create: required fields must be present and
    /// non-null, and every present field must satisfy its column type and
    /// rules.
    pub fn validate_create(entity: &EntityDef, body: &HashMap<String, Value>) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for rule in &entity.rules {
            let value = body.get(rule.field);
            if rule.required && value.map_or(true, Value::is_null) {
                errors.add(rule.field, format!("The {} field is required.", rule.field));
            }
        }
        Self::check_present_fields(entity, body, &mut errors);
        errors
    }

    /// Partial validation for update: only fields present in the body are
    /// checked; required is not enforced for missing fields, but explicit
    /// null on a required field is rejected.
    pub fn validate_update(entity: &EntityDef, body: &HashMap<String, Value>) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for rule in &entity.rules {
            if rule.required && body.get(rule.field).is_some_and(Value::is_null) {
                errors.add(rule.field, format!("The {} field is required.", rule.field));
            }
        }
        Self::check_present_fields(entity, body, &mut errors);
        errors
    }

    fn check_present_fields(
        entity: &EntityDef,
        body: &HashMap<String, Value>,
        errors: &mut ValidationErrors,
    ) {
        for (field, value) in body {
            if !entity.writable(field) || value.is_null() {
                continue;
            }
            if let Some(column) = entity.column(field) {
                check_column_type(field, value, column.pg_type, errors);
            }
            if let Some(rule) = entity.rule(field) {
                check_rule(field, value, rule, errors);
            }
        }
    }
}

fn check_column_type(field: &str, value: &Value, pg_type: PgType, errors: &mut ValidationErrors) {
    match pg_type {
        PgType::BigSerial | PgType::BigInt | PgType::Int => {
            if value.as_i64().is_none() {
                errors.add(field, format!("The {} must be an integer.", field));
            }
        }
        PgType::Bool => {
            if !value.is_boolean() {
                errors.add(field, format!("The {} field must be true or false.", field));
            }
        }
        PgType::Date => match value.as_str() {
            Some(s) if chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() => {}
            _ => errors.add(field, format!("The {} is not a valid date.", field)),
        },
        PgType::Timestamptz => match value.as_str() {
            Some(s) if chrono::DateTime::parse_from_rfc3339(s).is_ok() => {}
            _ => errors.add(field, format!("The {} is not a valid date.", field)),
        },
        PgType::Text => {
            if !value.is_string() {
                errors.add(field, format!("The {} must be a string.", field));
            }
        }
    }
}

fn check_rule(field: &str, value: &Value, rule: &FieldRule, errors: &mut ValidationErrors) {
    if let Some(s) = value.as_str() {
        if let Some(max) = rule.max_length {
            if s.chars().count() > max {
                errors.add(
                    field,
                    format!("The {} may not be greater than {} characters.", field, max),
                );
            }
        }
        if let Some(min) = rule.min_length {
            if s.chars().count() < min {
                errors.add(
                    field,
                    format!("The {} must be at least {} characters.", field, min),
                );
            }
        }
        if let Some(pattern) = rule.pattern {
            match Regex::new(pattern) {
                Ok(re) if re.is_match(s) => {}
                Ok(_) => errors.add(field, format!("The {} format is invalid.", field)),
                Err(_) => errors.add(field, format!("The {} format is invalid.", field)),
            }
        }
    }
    if let Some(allowed) = rule.one_of {
        let ok = value.as_str().map(|s| allowed.contains(&s)).unwrap_or(false);
        if !ok {
            errors.add(field, format!("The selected {} is invalid.", field));
        }
    }
    if rule.integer && value.as_i64().is_none() {
        errors.add(field, format!("The {} must be an integer.", field));
    }
    if let Some(n) = value.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                errors.add(field, format!("The {} must be at least {}.", field, min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                errors.add(
                    field,
                    format!("The {} may not be greater than {}.", field, max),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CatalogModel;
    use serde_json::json;

    fn body(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn model() -> CatalogModel {
        CatalogModel::builtin().unwrap()
    }

    #[test]
    fn create_requires_declared_fields() {
        let model = model();
        let awards = model.entity("awards").unwrap();
        let errors = RequestValidator::validate_create(awards, &body(&[]));
        assert!(errors.contains("name"));
        assert!(errors.contains("slug"));
        assert!(!errors.contains("category"));
    }

    #[test]
    fn an_award_needs_only_name_and_slug() {
        let model = model();
        let awards = model.entity("awards").unwrap();
        let errors = RequestValidator::validate_create(
            awards,
            &body(&[("name", json!("Premio X")), ("slug", json!("premio-x"))]),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn create_accepts_a_valid_award() {
        let model = model();
        let awards = model.entity("awards").unwrap();
        let errors = RequestValidator::validate_create(
            awards,
            &body(&[
                ("name", json!("Premio X")),
                ("slug", json!("premio-x")),
                ("category", json!("nacional")),
                ("year", json!(1998)),
            ]),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn enum_membership_is_enforced() {
        let model = model();
        let books = model.entity("books").unwrap();
        let errors = RequestValidator::validate_create(
            books,
            &body(&[
                ("title", json!("Obras")),
                ("slug", json!("obras")),
                ("author", json!("A. Pérez")),
                ("genre", json!("tejido")),
            ]),
        );
        assert!(errors.contains("genre"));
        assert!(!errors.contains("title"));
    }

    #[test]
    fn slug_pattern_rejects_uppercase_and_spaces() {
        let model = model();
        let awards = model.entity("awards").unwrap();
        for bad in ["Premio X", "premio_x", "PREMIO-X", "-premio"] {
            let errors = RequestValidator::validate_create(
                awards,
                &body(&[
                    ("name", json!("Premio X")),
                    ("slug", json!(bad)),
                    ("category", json!("nacional")),
                ]),
            );
            assert!(errors.contains("slug"), "{} should be rejected", bad);
        }
    }

    #[test]
    fn update_is_partial_but_rejects_explicit_null_on_required() {
        let model = model();
        let awards = model.entity("awards").unwrap();
        let errors = RequestValidator::validate_update(awards, &body(&[("year", json!(2001))]));
        assert!(errors.is_empty());

        let errors = RequestValidator::validate_update(awards, &body(&[("name", json!(null))]));
        assert!(errors.contains("name"));
    }

    #[test]
    fn column_types_are_checked() {
        let model = model();
        let anniversaries = model.entity("daily-anniversaries").unwrap();
        let errors = RequestValidator::validate_create(
            anniversaries,
            &body(&[
                ("title", json!("Natalicio")),
                ("category", json!("nacimiento")),
                ("month", json!("julio")),
                ("day", json!(24)),
            ]),
        );
        assert!(errors.contains("month"));
        assert!(!errors.contains("day"));
    }

    #[test]
    fn numeric_bounds_apply() {
        let model = model();
        let anniversaries = model.entity("daily-anniversaries").unwrap();
        let errors = RequestValidator::validate_create(
            anniversaries,
            &body(&[
                ("title", json!("Natalicio")),
                ("category", json!("nacimiento")),
                ("month", json!(13)),
                ("day", json!(0)),
            ]),
        );
        assert!(errors.contains("month"));
        assert!(errors.contains("day"));
    }

    #[test]
    fn unknown_and_protected_keys_are_ignored() {
        let model = model();
        let keys = model.entity("api-keys").unwrap();
        let errors = RequestValidator::validate_create(
            keys,
            &body(&[
                ("name", json!("ci")),
                ("token", json!(12345)),
                ("no_such_column", json!("x")),
            ]),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn date_strings_are_validated() {
        let model = model();
        let achievements = model.entity("achievements").unwrap();
        let base = [
            ("title", json!("Premio Nacional")),
            ("person_name", json!("J. García")),
            ("category", json!("premio")),
        ];
        let mut ok = body(&base);
        ok.insert("achieved_on".into(), json!("1998-07-24"));
        assert!(RequestValidator::validate_create(achievements, &ok).is_empty());

        let mut bad = body(&base);
        bad.insert("achieved_on".into(), json!("24/07/1998"));
        assert!(RequestValidator::validate_create(achievements, &bad).contains("achieved_on"));
    }
}

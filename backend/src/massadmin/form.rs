//! Binding submitted form values onto a model's fields.

use crate::massadmin::records::Record;
use crate::massadmin::registry::{FieldDescriptor, FieldKind, ModelDescriptor};
use crate::massadmin::request::MultiMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Field name to error messages.
pub type FormErrors = BTreeMap<String, Vec<String>>;

/// One row of the rendered form.
#[derive(Debug, Clone, Serialize)]
pub struct FieldLayout {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub unique: bool,
    pub excluded: bool,
    pub readonly: bool,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminForm {
    pub fields: Vec<FieldLayout>,
}

impl AdminForm {
    pub fn new(model: &ModelDescriptor, exclude: &[String], instance: &Record) -> Self {
        let fields = model
            .fields
            .iter()
            .map(|field| FieldLayout {
                name: field.name.clone(),
                label: field.label().to_string(),
                kind: field.kind,
                nullable: field.nullable,
                unique: field.is_unique() || field.name == model.primary_key,
                excluded: exclude.contains(&field.name),
                readonly: !is_mass_editable(model, field),
                value: instance.get(&field.name).cloned().unwrap_or(Value::Null),
            })
            .collect();
        Self { fields }
    }
}

/// Whether a field can receive a submitted value at all.
pub fn is_mass_editable(model: &ModelDescriptor, field: &FieldDescriptor) -> bool {
    field.editable && field.name != model.primary_key
}

/// Cleans the submitted values of `fields`. Names that do not match an editable
/// field of the model are skipped; the worker decides what to do with them.
pub fn bind(model: &ModelDescriptor, data: &MultiMap, fields: &[String]) -> Result<Record, FormErrors> {
    let mut values = Record::new();
    let mut errors = FormErrors::new();

    for name in fields {
        let Some(field) = model.field(name) else {
            continue;
        };
        if !is_mass_editable(model, field) {
            continue;
        }
        match clean_field(field, data.get(name)) {
            Ok(value) => {
                values.insert(name.clone(), value);
            }
            Err(message) => errors.entry(name.clone()).or_default().push(message),
        }
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}

fn clean_field(field: &FieldDescriptor, raw: Option<&str>) -> Result<Value, String> {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return match field.kind {
            // An unticked checkbox is simply absent from the body.
            FieldKind::Boolean => Ok(Value::Bool(false)),
            _ if field.nullable => Ok(Value::Null),
            _ => Err("This field is required.".to_string()),
        };
    }

    match field.kind {
        FieldKind::Boolean => Ok(Value::Bool(!raw.eq_ignore_ascii_case("false"))),
        FieldKind::Text => Ok(Value::String(raw.to_string())),
        FieldKind::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| "Enter a whole number.".to_string()),
        FieldKind::Real => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| "Enter a number.".to_string()),
    }
}

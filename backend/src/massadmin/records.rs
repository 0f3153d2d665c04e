//! Row access for registered models: typed reads, single-row saves and the
//! set-based bulk update the worker relies on.

use crate::db::quote_ident;
use crate::error::MassEditError;
use crate::massadmin::registry::{FieldKind, ModelDescriptor, QuerySet};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde_json::{json, Map, Number, Value};

/// One row of a registered model, keyed by field name.
pub type Record = Map<String, Value>;

pub fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn sql_to_json(kind: FieldKind, value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if kind == FieldKind::Boolean => Value::Bool(i != 0),
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

/// Converts a record identifier taken from a URL or job payload to the
/// primary key's column type.
pub fn parse_key(model: &ModelDescriptor, raw: &str) -> Result<SqlValue, MassEditError> {
    let kind = model
        .pk_field()
        .map(|field| field.kind)
        .unwrap_or(FieldKind::Integer);
    let raw = raw.trim();
    let invalid = || MassEditError::InvalidIdentifier(raw.to_string());
    match kind {
        FieldKind::Integer | FieldKind::Boolean => {
            raw.parse::<i64>().map(SqlValue::Integer).map_err(|_| invalid())
        }
        FieldKind::Real => raw.parse::<f64>().map(SqlValue::Real).map_err(|_| invalid()),
        FieldKind::Text => Ok(SqlValue::Text(raw.to_string())),
    }
}

/// Loads one record of the queryset by primary key.
pub fn fetch(
    conn: &Connection,
    queryset: &QuerySet<'_>,
    pk: &str,
) -> Result<Option<Record>, MassEditError> {
    let model = queryset.model;
    let columns = model
        .fields
        .iter()
        .map(|field| quote_ident(&field.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        columns,
        quote_ident(&model.table),
        quote_ident(&model.primary_key)
    );
    let mut params = vec![parse_key(model, pk)?];
    for (field, value) in &queryset.filters {
        sql.push_str(&format!(" AND {} IS ?", quote_ident(field)));
        params.push(value.clone());
    }

    let mut stmt = conn.prepare(&sql)?;
    let record = stmt
        .query_row(params_from_iter(params), |row| {
            let mut record = Record::new();
            for (idx, field) in model.fields.iter().enumerate() {
                record.insert(field.name.clone(), sql_to_json(field.kind, row.get_ref(idx)?));
            }
            Ok(record)
        })
        .optional()?;
    Ok(record)
}

/// Writes `values` onto a single row.
pub fn save_fields(
    conn: &Connection,
    model: &ModelDescriptor,
    pk: &str,
    values: &Record,
) -> Result<usize, MassEditError> {
    update_where_pk_in(conn, model, &[pk.to_string()], values)
}

/// One `UPDATE ... WHERE pk IN (...)` over every target row.
///
/// Run it inside a transaction: a failing row (a unique violation, say) aborts
/// the statement and the caller's rollback leaves every row untouched.
pub fn bulk_update(
    conn: &Connection,
    model: &ModelDescriptor,
    pks: &[String],
    values: &Record,
) -> Result<usize, MassEditError> {
    update_where_pk_in(conn, model, pks, values)
}

fn update_where_pk_in(
    conn: &Connection,
    model: &ModelDescriptor,
    pks: &[String],
    values: &Record,
) -> Result<usize, MassEditError> {
    if pks.is_empty() || values.is_empty() {
        return Ok(0);
    }

    let assignments = values
        .keys()
        .map(|field| format!("{} = ?", quote_ident(field)))
        .collect::<Vec<_>>()
        .join(", ");
    // All keys bind as a single JSON array parameter, whatever the selection size.
    let sql = format!(
        "UPDATE {} SET {} WHERE {} IN (SELECT value FROM json_each(?))",
        quote_ident(&model.table),
        assignments,
        quote_ident(&model.primary_key)
    );

    let keys = pks
        .iter()
        .map(|pk| parse_key(model, pk).map(|key| key_to_json(&key)))
        .collect::<Result<Vec<_>, _>>()?;
    let mut params: Vec<SqlValue> = values.values().map(json_to_sql).collect();
    params.push(SqlValue::Text(Value::Array(keys).to_string()));

    Ok(conn.execute(&sql, params_from_iter(params))?)
}

fn key_to_json(key: &SqlValue) -> Value {
    match key {
        SqlValue::Integer(i) => Value::from(*i),
        SqlValue::Real(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        SqlValue::Text(t) => Value::String(t.clone()),
        SqlValue::Null | SqlValue::Blob(_) => Value::Null,
    }
}

/// Whether a row other than `pk` already holds `value` in `field`.
pub fn exists_other(
    conn: &Connection,
    model: &ModelDescriptor,
    field: &str,
    value: &Value,
    pk: &str,
) -> Result<bool, MassEditError> {
    let sql = format!(
        "SELECT 1 FROM {} WHERE {} = ? AND {} <> ? LIMIT 1",
        quote_ident(&model.table),
        quote_ident(field),
        quote_ident(&model.primary_key)
    );
    let found = conn
        .query_row(
            &sql,
            params_from_iter([json_to_sql(value), parse_key(model, pk)?]),
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Single-record snapshot in the interchange format carried by the job.
pub fn snapshot(model: &ModelDescriptor, record: &Record) -> Value {
    let mut fields = record.clone();
    let pk = fields.remove(&model.primary_key).unwrap_or(Value::Null);
    json!([{ "model": model.label(), "pk": pk, "fields": fields }])
}

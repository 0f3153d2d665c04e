//! Explicit schema descriptors for the models that can be mass edited.
//!
//! A model is described once, in a JSON registry file, instead of being
//! discovered from the database at runtime: field names, column kinds,
//! nullability and uniqueness. The same entry carries the model's admin
//! configuration (`massadmin_exclude`, `massadmin_queryset`).
//!
//! ```json
//! { "models": [ {
//!     "app_label": "todo", "model_name": "task", "verbose_name": "task",
//!     "table": "tasks", "primary_key": "id",
//!     "fields": [ { "name": "id", "kind": "integer", "editable": false },
//!                 { "name": "status", "kind": "text" } ],
//!     "massadmin_exclude": ["title"],
//!     "massadmin_queryset": [ { "kind": "current_user", "field": "owner" } ]
//! } ] }
//! ```

use crate::auth::User;
use crate::error::MassEditError;
use crate::massadmin::records::Record;
use crate::massadmin::request::RequestContext;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    Real,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub nullable: bool,
    /// `None` when the registry says nothing about uniqueness.
    #[serde(default)]
    pub unique: Option<bool>,
    #[serde(default)]
    pub verbose_name: Option<String>,
    #[serde(default = "default_editable")]
    pub editable: bool,
}

fn default_editable() -> bool {
    true
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl FieldDescriptor {
    pub fn is_unique(&self) -> bool {
        self.unique.unwrap_or(false)
    }

    pub fn label(&self) -> &str {
        self.verbose_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub app_label: String,
    pub model_name: String,
    pub verbose_name: String,
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ModelDescriptor {
    /// `"<app_label>.<model_name>"`, the name used in snapshots.
    pub fn label(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn pk_field(&self) -> Option<&FieldDescriptor> {
        self.field(&self.primary_key)
    }

    /// Fields that must not be mass edited because every row needs its own value.
    pub fn unique_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|field| field.is_unique() || field.name == self.primary_key)
            .map(|field| field.name.clone())
            .collect()
    }

    /// Permission codename required to change records of this model.
    pub fn change_permission(&self) -> String {
        format!("{}.change_{}", self.app_label, self.model_name)
    }

    pub fn not_found(&self, key: &str) -> MassEditError {
        MassEditError::NotFound(format!(
            "{} object with primary key {:?} does not exist.",
            self.verbose_name, key
        ))
    }
}

/// A base selection of rows: the model plus equality filters.
#[derive(Debug, Clone)]
pub struct QuerySet<'m> {
    pub model: &'m ModelDescriptor,
    pub filters: Vec<(String, SqlValue)>,
}

impl<'m> QuerySet<'m> {
    pub fn all(model: &'m ModelDescriptor) -> Self {
        Self {
            model,
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, field: &str, value: SqlValue) -> Self {
        self.filters.push((field.to_string(), value));
        self
    }
}

/// Registry-level restriction of the rows a mass edit may start from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryFilter {
    /// `field` must equal a fixed value.
    Equals { field: String, value: Value },
    /// `field` must equal the requesting user's username.
    CurrentUser { field: String },
}

/// Admin configuration of one model, the hooks the mass edit screens consult.
pub trait ModelAdmin: Send + Sync {
    fn model(&self) -> &ModelDescriptor;

    /// Field names that are never offered for mass editing.
    fn massadmin_exclude(&self) -> &[String] {
        &[]
    }

    /// Base selection the representative record is looked up in.
    fn massadmin_queryset(&self, _request: &RequestContext) -> QuerySet<'_> {
        QuerySet::all(self.model())
    }

    fn has_change_permission(&self, user: Option<&User>, _obj: Option<&Record>) -> bool {
        user.is_some_and(|user| user.has_perm(&self.model().change_permission()))
    }
}

/// A `ModelAdmin` built entirely from a registry entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfiguredAdmin {
    #[serde(flatten)]
    pub model: ModelDescriptor,
    #[serde(default)]
    pub massadmin_exclude: Vec<String>,
    #[serde(default)]
    pub massadmin_queryset: Vec<QueryFilter>,
}

impl ModelAdmin for ConfiguredAdmin {
    fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    fn massadmin_exclude(&self) -> &[String] {
        &self.massadmin_exclude
    }

    fn massadmin_queryset(&self, request: &RequestContext) -> QuerySet<'_> {
        self.massadmin_queryset
            .iter()
            .fold(QuerySet::all(&self.model), |qs, filter| match filter {
                QueryFilter::Equals { field, value } => {
                    qs.filter(field, crate::massadmin::records::json_to_sql(value))
                }
                QueryFilter::CurrentUser { field } => {
                    let username = request
                        .user
                        .as_ref()
                        .map(|user| SqlValue::Text(user.username.clone()))
                        .unwrap_or(SqlValue::Null);
                    qs.filter(field, username)
                }
            })
    }
}

#[derive(Deserialize)]
struct RegistryFile {
    models: Vec<ConfiguredAdmin>,
}

/// Lookup from `(app_label, model_name)` to the model's admin.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    admins: HashMap<(String, String), Arc<dyn ModelAdmin>>,
}

impl ModelRegistry {
    pub fn from_file(path: &Path) -> Result<Self, MassEditError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            MassEditError::Registry(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, MassEditError> {
        let file: RegistryFile = serde_json::from_str(raw)?;
        let mut registry = ModelRegistry::default();
        for admin in file.models {
            registry.register(admin)?;
        }
        Ok(registry)
    }

    pub fn register<A: ModelAdmin + 'static>(&mut self, admin: A) -> Result<(), MassEditError> {
        validate(admin.model(), admin.massadmin_exclude())?;
        let key = (
            admin.model().app_label.clone(),
            admin.model().model_name.clone(),
        );
        if self.admins.contains_key(&key) {
            return Err(MassEditError::Registry(format!(
                "{}.{} is registered twice",
                key.0, key.1
            )));
        }
        self.admins.insert(key, Arc::new(admin));
        Ok(())
    }

    pub fn get(&self, app_label: &str, model_name: &str) -> Option<Arc<dyn ModelAdmin>> {
        self.admins
            .get(&(app_label.to_string(), model_name.to_string()))
            .cloned()
    }

    /// Like `get`, but a missing model is a `NotFound`.
    pub fn admin_for(
        &self,
        app_label: &str,
        model_name: &str,
    ) -> Result<Arc<dyn ModelAdmin>, MassEditError> {
        self.get(app_label, model_name).ok_or_else(|| {
            MassEditError::NotFound(format!("No model {}.{} is registered", app_label, model_name))
        })
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }
}

fn validate(model: &ModelDescriptor, exclude: &[String]) -> Result<(), MassEditError> {
    let ident = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .map_err(|e| MassEditError::Registry(format!("Regex error: {}", e)))?;

    let names = [
        ("app_label", &model.app_label),
        ("model_name", &model.model_name),
        ("table", &model.table),
        ("primary_key", &model.primary_key),
    ];
    for (what, value) in names {
        if !ident.is_match(value) {
            return Err(MassEditError::Registry(format!(
                "{} '{}' of {} is not a valid identifier",
                what,
                value,
                model.label()
            )));
        }
    }

    let mut seen = HashSet::new();
    for field in &model.fields {
        if !ident.is_match(&field.name) {
            return Err(MassEditError::Registry(format!(
                "field '{}' of {} is not a valid identifier",
                field.name,
                model.label()
            )));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(MassEditError::Registry(format!(
                "field '{}' of {} is declared twice",
                field.name,
                model.label()
            )));
        }
    }

    if model.pk_field().is_none() {
        return Err(MassEditError::Registry(format!(
            "primary key '{}' of {} is not among its fields",
            model.primary_key,
            model.label()
        )));
    }

    if let Some(unknown) = exclude.iter().find(|name| model.field(name).is_none()) {
        return Err(MassEditError::UnknownField {
            model: model.label(),
            field: unknown.clone(),
        });
    }

    Ok(())
}

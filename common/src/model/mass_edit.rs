use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A mass edit job as it crosses the queue boundary.
///
/// The worker only needs `object_ids`, the model identifiers, the field list and
/// `template_object_id`. The cleaned request context and the template snapshot
/// travel along for logging and for the request-replay strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassEditJob {
    /// Unique identifier for this job (UUID).
    pub job_id: String,
    /// The full selection, comma-joined, template included.
    pub object_ids: String,
    pub app_name: String,
    pub model_name: String,
    /// Fields the user flagged as "apply to all".
    pub mass_changes_fields: Vec<String>,
    /// The record whose persisted values are copied onto the others.
    pub template_object_id: String,
    /// Request context with everything non-serializable stripped out.
    #[serde(default)]
    pub request: Value,
    /// `[{"model": "<app>.<model>", "pk": .., "fields": {..}}]` of the template record.
    #[serde(default)]
    pub snapshot: Value,
}

impl MassEditJob {
    /// The username that submitted the edit, if the request context carries one.
    pub fn requested_by(&self) -> Option<&str> {
        self.request.get("user").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_without_context_still_deserializes() {
        let job: MassEditJob = serde_json::from_value(json!({
            "job_id": "j1",
            "object_ids": "1,2,3",
            "app_name": "todo",
            "model_name": "task",
            "mass_changes_fields": ["status"],
            "template_object_id": "1"
        }))
        .unwrap();

        assert_eq!(job.request, Value::Null);
        assert_eq!(job.requested_by(), None);
    }

    #[test]
    fn requested_by_reads_the_user_from_the_request_context() {
        let job = MassEditJob {
            job_id: "j2".into(),
            object_ids: "1".into(),
            app_name: "todo".into(),
            model_name: "task".into(),
            mass_changes_fields: vec![],
            template_object_id: "1".into(),
            request: json!({ "user": "alice", "META": { "HTTP_HOST": "localhost" } }),
            snapshot: Value::Null,
        };
        assert_eq!(job.requested_by(), Some("alice"));
    }
}

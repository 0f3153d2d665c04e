use serde::{Deserialize, Serialize};

/// Worker-side state of one mass edit job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    /// Picked up by the worker. A job is one transaction, so there is no partial progress.
    InProgress,
    Completed(String),
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_as_externally_tagged_json() {
        assert_eq!(
            serde_json::to_value(JobStatus::InProgress).unwrap(),
            serde_json::json!("InProgress")
        );
        assert_eq!(
            serde_json::to_value(JobStatus::Failed("gone".to_string())).unwrap(),
            serde_json::json!({ "Failed": "gone" })
        );
    }
}

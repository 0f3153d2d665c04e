use serde::{Deserialize, Serialize};
use std::fmt;

/// A primary key as it arrives from the change list: either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Int(i64),
    Text(String),
}

impl RecordKey {
    /// Whether the key survives the comma-joined batch form unchanged.
    pub fn is_batchable(&self) -> bool {
        match self {
            RecordKey::Int(_) => true,
            RecordKey::Text(value) => {
                !value.contains(',') && !value.trim().is_empty() && value.trim() == value
            }
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Int(value) => write!(f, "{}", value),
            RecordKey::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
/// Request payload for the "mass edit" change list action.
/// Contains the selected primary keys and the change list filters to return to.
pub struct MassChangeSelectedRequest {
    pub pks: Vec<RecordKey>,
    #[serde(default)]
    pub preserved_filters: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_that_would_split_or_vanish_are_not_batchable() {
        assert!(RecordKey::Int(7).is_batchable());
        assert!(RecordKey::Text("A-7".to_string()).is_batchable());
        assert!(!RecordKey::Text("a,b".to_string()).is_batchable());
        assert!(!RecordKey::Text("  ".to_string()).is_batchable());
        assert!(!RecordKey::Text(" a".to_string()).is_batchable());
    }
}

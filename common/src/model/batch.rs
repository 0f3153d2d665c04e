use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered list of record identifiers selected for a mass edit.
///
/// On the wire and in URLs the batch is a single comma-joined string. Order is
/// kept stable so the same selection always serializes to the same string, which
/// is what makes the session token for long selections deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierBatch(Vec<String>);

impl IdentifierBatch {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self(ids.into_iter().map(|id| id.to_string()).collect())
    }

    /// Splits a comma-joined batch. Blank segments are dropped.
    pub fn parse(joined: &str) -> Self {
        Self(
            joined
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn joined(&self) -> String {
        self.0.join(",")
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The representative record: the first identifier of the selection.
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Every identifier except `id`, in batch order.
    pub fn without(&self, id: &str) -> Vec<String> {
        self.0.iter().filter(|other| *other != id).cloned().collect()
    }
}

impl fmt::Display for IdentifierBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_order_and_drops_blanks() {
        let batch = IdentifierBatch::parse("7, 3,,9");
        assert_eq!(batch.ids(), ["7", "3", "9"]);
        assert_eq!(batch.joined(), "7,3,9");
        assert_eq!(batch.first(), Some("7"));
    }

    #[test]
    fn without_removes_every_occurrence_of_the_template() {
        let batch = IdentifierBatch::new([1, 2, 1, 3]);
        assert_eq!(batch.without("1"), ["2", "3"]);
    }

    #[test]
    fn single_member_batch_has_no_targets() {
        let batch = IdentifierBatch::parse("42");
        assert!(batch.without("42").is_empty());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::requests::Status;

/// One recorded transition. Never edited once appended.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
pub struct HistoryEntry {
    pub status: Status,
    /// Display name of whoever performed the transition.
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only audit trail of a request.
///
/// There is no way to remove or edit an entry, and timestamps never go
/// backwards: an entry stamped before its predecessor is clamped to the
/// predecessor's timestamp.
/// A ledger always holds at least the submission entry, so an empty array
/// is rejected when loading.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(try_from = "Vec<HistoryEntry>", into = "Vec<HistoryEntry>")]
pub struct HistoryLedger(Vec<HistoryEntry>);

impl TryFrom<Vec<HistoryEntry>> for HistoryLedger {
    type Error = String;

    fn try_from(entries: Vec<HistoryEntry>) -> Result<Self, Self::Error> {
        if entries.is_empty() {
            return Err("history must hold at least one entry".to_string());
        }
        Ok(Self(entries))
    }
}

impl From<HistoryLedger> for Vec<HistoryEntry> {
    fn from(ledger: HistoryLedger) -> Self {
        ledger.0
    }
}

impl HistoryLedger {
    pub fn seed(first: HistoryEntry) -> Self {
        Self(vec![first])
    }

    pub fn append(&mut self, mut entry: HistoryEntry) {
        if let Some(last) = self.0.last() {
            if entry.timestamp < last.timestamp {
                entry.timestamp = last.timestamp;
            }
        }
        self.0.push(entry);
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.0.iter()
    }
}

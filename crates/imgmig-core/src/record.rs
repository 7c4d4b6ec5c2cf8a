//! Source catalog record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One asset listed by the source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique id in the source catalog; sent to the destination as the image id.
    pub id: String,
    /// Current fetch location. Not guaranteed stable (may 404).
    pub url: String,
    /// Only used to derive the sortable prefix of the staging name.
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub fn new(id: impl Into<String>, url: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            created_at,
        }
    }
}

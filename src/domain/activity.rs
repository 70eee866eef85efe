use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::validate::{ValidateInsert, ValidationError, Violations};

/// A dashboard activity feed entry (signups, logins, bids, payments).
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEvent {
    pub id: i64,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewActivityEvent {
    pub activity_type: String,
    pub user: String,
    pub details: Option<String>,
}

impl ValidateInsert for NewActivityEvent {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require(
            !self.activity_type.trim().is_empty(),
            "activity_type",
            "must not be empty",
        );
        v.require(!self.user.trim().is_empty(), "user", "must not be empty");
        v.finish()
    }
}

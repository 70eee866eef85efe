use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::validate::{EnumParseError, ValidateInsert, ValidationError, Violations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ModerationStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ModerationStatus::Pending),
            "approved" => Ok(ModerationStatus::Approved),
            "rejected" => Ok(ModerationStatus::Rejected),
            other => Err(EnumParseError {
                kind: "moderation status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationItem {
    pub id: i64,
    pub content_type: String,
    pub content_id: String,
    pub reason: String,
    pub status: ModerationStatus,
    pub moderator_id: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewModerationItem {
    pub content_type: String,
    pub content_id: String,
    pub reason: String,
    pub status: ModerationStatus,
    pub moderator_id: Option<i64>,
}

impl ValidateInsert for NewModerationItem {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require(
            !self.content_type.trim().is_empty(),
            "content_type",
            "must not be empty",
        );
        v.require(
            !self.content_id.trim().is_empty(),
            "content_id",
            "must not be empty",
        );
        v.require(!self.reason.trim().is_empty(), "reason", "must not be empty");
        v.finish()
    }
}

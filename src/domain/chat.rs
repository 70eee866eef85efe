use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::validate::{EnumParseError, ValidateInsert, ValidationError, Violations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }
}

impl FromStr for Sender {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Sender::User),
            "ai" => Ok(Sender::Ai),
            other => Err(EnumParseError {
                kind: "sender",
                value: other.to_string(),
            }),
        }
    }
}

/// One entry in a bidder's append-only conversation log. Messages are never
/// edited or deleted; ordering is creation time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub sender: Sender,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChatMessage {
    pub user_id: i64,
    pub content: String,
    pub sender: Sender,
}

impl ValidateInsert for NewChatMessage {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require(self.user_id > 0, "user_id", "must be positive");
        v.require(!self.content.is_empty(), "content", "must not be empty");
        v.finish()
    }
}

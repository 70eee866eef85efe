use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::validate::{EnumParseError, ValidateInsert, ValidationError, Violations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "resolved")]
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in-progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            other => Err(EnumParseError {
                kind: "ticket status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Critical => "critical",
        }
    }
}

impl FromStr for TicketPriority {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TicketPriority::Low),
            "medium" => Ok(TicketPriority::Medium),
            "high" => Ok(TicketPriority::High),
            "critical" => Ok(TicketPriority::Critical),
            other => Err(EnumParseError {
                kind: "ticket priority",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub assignee_id: Option<i64>,
    pub user_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Set once, on the transition to resolved, and immutable afterwards.
    #[serde(with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSupportTicket {
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub assignee_id: Option<i64>,
    pub user_id: i64,
}

impl ValidateInsert for NewSupportTicket {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require(!self.title.trim().is_empty(), "title", "must not be empty");
        v.require(
            !self.description.trim().is_empty(),
            "description",
            "must not be empty",
        );
        v.require(self.user_id > 0, "user_id", "must be positive");
        if let Some(assignee) = self.assignee_id {
            v.require(assignee > 0, "assignee_id", "must be positive");
        }
        v.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_priority_closed_sets() {
        for value in ["open", "in-progress", "resolved"] {
            assert_eq!(TicketStatus::from_str(value).unwrap().as_str(), value);
        }
        assert!(TicketStatus::from_str("closed").is_err());

        for value in ["low", "medium", "high", "critical"] {
            assert_eq!(TicketPriority::from_str(value).unwrap().as_str(), value);
        }
        assert!(TicketPriority::from_str("urgent").is_err());
    }

    #[test]
    fn in_progress_serializes_with_hyphen() {
        let json = serde_json::to_value(TicketStatus::InProgress).unwrap();
        assert_eq!(json, "in-progress");
    }

    #[test]
    fn insert_rejects_non_positive_user() {
        let new = NewSupportTicket {
            title: "Login issue".into(),
            description: "Cannot log in".into(),
            status: TicketStatus::Open,
            priority: TicketPriority::High,
            assignee_id: Some(0),
            user_id: -4,
        };
        let err = new.validate().unwrap_err();
        let fields: Vec<_> = err.violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["user_id", "assignee_id"]);
    }
}

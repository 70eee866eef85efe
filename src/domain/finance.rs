use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::validate::{EnumParseError, ValidateInsert, ValidationError, Violations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(TransactionStatus::Completed),
            "pending" => Ok(TransactionStatus::Pending),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(EnumParseError {
                kind: "transaction status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub transaction_id: String,
    /// Integer minor-unit currency amount (cents).
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: TransactionStatus,
    pub user_id: Option<i64>,
    pub metadata: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub transaction_id: String,
    pub amount: i64,
    pub kind: String,
    pub status: TransactionStatus,
    pub user_id: Option<i64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ValidateInsert for NewTransaction {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require(
            !self.transaction_id.trim().is_empty(),
            "transaction_id",
            "must not be empty",
        );
        v.require(self.amount >= 0, "amount", "must not be negative");
        v.require(!self.kind.trim().is_empty(), "kind", "must not be empty");
        v.finish()
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::validate::{ValidateInsert, ValidationError, Violations};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidderUser {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    /// Percentage in [0, 100].
    pub profile_complete: i32,
    pub win_streak: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBidderUser {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub profile_complete: i32,
    pub win_streak: i32,
}

impl ValidateInsert for NewBidderUser {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require(!self.username.trim().is_empty(), "username", "must not be empty");
        v.require(
            !self.password_hash.is_empty(),
            "password_hash",
            "must not be empty",
        );
        v.require(!self.name.trim().is_empty(), "name", "must not be empty");
        v.require(
            (0..=100).contains(&self.profile_complete),
            "profile_complete",
            "must be between 0 and 100",
        );
        v.require(self.win_streak >= 0, "win_streak", "must not be negative");
        v.finish()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub issuer: String,
    pub win_chance: i32,
    pub location: Option<String>,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTender {
    pub title: String,
    pub status: String,
    pub issuer: String,
    pub win_chance: i32,
    pub location: Option<String>,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
    pub due_date: Option<OffsetDateTime>,
}

impl ValidateInsert for NewTender {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require(!self.title.trim().is_empty(), "title", "must not be empty");
        v.require(!self.status.trim().is_empty(), "status", "must not be empty");
        v.require(!self.issuer.trim().is_empty(), "issuer", "must not be empty");
        v.require(
            (0..=100).contains(&self.win_chance),
            "win_chance",
            "must be between 0 and 100",
        );
        v.finish()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: i64,
    pub supplier_id: String,
    pub amount: String,
    pub delay_increase: Option<String>,
    pub submission_id: Option<String>,
    pub submission_risk: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuote {
    pub supplier_id: String,
    pub amount: String,
    pub delay_increase: Option<String>,
    pub submission_id: Option<String>,
    pub submission_risk: Option<String>,
}

impl ValidateInsert for NewQuote {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require(
            !self.supplier_id.trim().is_empty(),
            "supplier_id",
            "must not be empty",
        );
        v.require(!self.amount.trim().is_empty(), "amount", "must not be empty");
        v.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bidder_numeric_ranges() {
        let new = NewBidderUser {
            username: "sxulsh".into(),
            password_hash: "hash".into(),
            name: "Sxulsh".into(),
            profile_complete: 120,
            win_streak: -1,
        };
        let err = new.validate().unwrap_err();
        let fields: Vec<_> = err.violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["profile_complete", "win_streak"]);
    }

    #[test]
    fn tender_win_chance_bounds() {
        let base = NewTender {
            title: "Construction in Eastern Cape".into(),
            status: "open".into(),
            issuer: "Provincial Works".into(),
            win_chance: 80,
            location: None,
            lng: None,
            lat: None,
            due_date: None,
        };
        assert!(base.validate().is_ok());

        let out_of_range = NewTender {
            win_chance: 101,
            ..base
        };
        assert!(out_of_range.validate().is_err());
    }
}

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::validate::{EnumParseError, ValidateInsert, ValidationError, Violations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Critical,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Degraded => "degraded",
            ServiceStatus::Critical => "critical",
        }
    }

    /// Severity rank used to pick the overall status of a service set.
    pub fn severity(&self) -> u8 {
        match self {
            ServiceStatus::Healthy => 0,
            ServiceStatus::Degraded => 1,
            ServiceStatus::Critical => 2,
        }
    }
}

impl FromStr for ServiceStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(ServiceStatus::Healthy),
            "degraded" => Ok(ServiceStatus::Degraded),
            "critical" => Ok(ServiceStatus::Critical),
            other => Err(EnumParseError {
                kind: "service status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemService {
    pub id: i64,
    pub service_id: String,
    pub name: String,
    pub status: ServiceStatus,
    pub uptime: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_incident: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSystemService {
    pub service_id: String,
    pub name: String,
    pub status: ServiceStatus,
    pub uptime: String,
    pub last_incident: Option<OffsetDateTime>,
}

impl ValidateInsert for NewSystemService {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require(
            !self.service_id.trim().is_empty(),
            "service_id",
            "must not be empty",
        );
        v.require(!self.name.trim().is_empty(), "name", "must not be empty");
        v.finish()
    }
}

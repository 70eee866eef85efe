use serde::{Deserialize, Serialize};

use crate::domain::validate::{ValidateInsert, ValidationError, Violations};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
    pub target_groups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeatureFlag {
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub target_groups: Vec<String>,
}

impl ValidateInsert for NewFeatureFlag {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require(!self.name.trim().is_empty(), "name", "must not be empty");
        for group in &self.target_groups {
            if group.trim().is_empty() {
                v.push("target_groups", "group identifiers must not be empty".to_string());
                break;
            }
        }
        v.finish()
    }
}

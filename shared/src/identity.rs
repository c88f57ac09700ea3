//! Caller identity and driver profile flags
//!
//! Identities come from an external provider as a stable user id plus a
//! role claim. Driver approval and block flags live in an external profile
//! store and are only read here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role claim attached to every caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Driver,
    Admin,
    /// Internal maintenance jobs (stale order sweeper, reconciliation)
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Driver => write!(f, "driver"),
            Role::Admin => write!(f, "admin"),
            Role::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "driver" => Ok(Role::Driver),
            "admin" => Ok(Role::Admin),
            // system is never accepted from the outside
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Driver profile flags read from the profile store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverProfile {
    pub driver_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub is_approved: bool,
    pub is_blocked: bool,
    pub updated_at: i64,
}

impl DriverProfile {
    pub fn new(driver_id: impl Into<String>, is_approved: bool, is_blocked: bool) -> Self {
        Self {
            driver_id: driver_id.into(),
            display_name: None,
            is_approved,
            is_blocked,
            updated_at: crate::util::now_millis(),
        }
    }

    /// Eligibility gate: approved and not blocked
    pub fn is_eligible(&self) -> bool {
        self.is_approved && !self.is_blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!("driver".parse::<Role>(), Ok(Role::Driver));
        assert_eq!(" Admin ".parse::<Role>(), Ok(Role::Admin));
        assert!("system".parse::<Role>().is_err());
        assert!("courier".parse::<Role>().is_err());
    }

    #[test]
    fn test_eligibility_gate() {
        assert!(DriverProfile::new("d1", true, false).is_eligible());
        assert!(!DriverProfile::new("d1", false, false).is_eligible());
        assert!(!DriverProfile::new("d1", true, true).is_eligible());
        assert!(!DriverProfile::new("d1", false, true).is_eligible());
    }
}

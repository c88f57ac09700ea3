//! Driver profile directory
//!
//! Approval and block flags belong to an external profile store. The engine
//! only reads them through [`ProfileDirectory`]; the bundled
//! [`InMemoryProfiles`] backs the standalone server and the tests.

use dashmap::DashMap;
use shared::DriverProfile;

/// Read access to driver profile flags
pub trait ProfileDirectory: Send + Sync {
    fn get(&self, driver_id: &str) -> Option<DriverProfile>;

    fn upsert(&self, profile: DriverProfile);

    /// Approved and not blocked; unknown drivers are not eligible
    fn is_eligible(&self, driver_id: &str) -> bool {
        self.get(driver_id).is_some_and(|p| p.is_eligible())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProfiles {
    profiles: DashMap<String, DriverProfile>,
}

impl InMemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with profiles (tests, fixtures)
    pub fn with_profiles(profiles: impl IntoIterator<Item = DriverProfile>) -> Self {
        let directory = Self::new();
        for profile in profiles {
            directory.upsert(profile);
        }
        directory
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileDirectory for InMemoryProfiles {
    fn get(&self, driver_id: &str) -> Option<DriverProfile> {
        self.profiles.get(driver_id).map(|entry| entry.value().clone())
    }

    fn upsert(&self, profile: DriverProfile) {
        self.profiles.insert(profile.driver_id.clone(), profile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_driver_is_not_eligible() {
        let directory = InMemoryProfiles::new();
        assert!(!directory.is_eligible("ghost"));
    }

    #[test]
    fn test_upsert_replaces_flags() {
        let directory = InMemoryProfiles::with_profiles([DriverProfile::new("d1", true, false)]);
        assert!(directory.is_eligible("d1"));

        directory.upsert(DriverProfile::new("d1", true, true));
        assert!(!directory.is_eligible("d1"));
        assert_eq!(directory.len(), 1);
    }
}

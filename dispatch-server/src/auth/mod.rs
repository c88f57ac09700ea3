//! Caller identity
//!
//! Authentication happens upstream: a gateway verifies the caller with the
//! identity provider and forwards the result in two headers.
//!
//! - `x-user-id` - stable user identifier
//! - `x-user-role` - `client`, `driver` or `admin`
//!
//! - [`CurrentUser`] - the caller, available as an axum extractor
//! - [`require_identity`] - middleware rejecting `/api/` calls without identity
//! - [`require_admin`] - middleware for admin-only routes

pub mod extractor;
pub mod middleware;

pub use middleware::{require_admin, require_identity};

use http::HeaderMap;
use shared::Role;

use crate::security_log;
use crate::utils::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("missing {0} header")]
    Missing(&'static str),

    #[error("unreadable {0} header")]
    Malformed(&'static str),

    #[error(transparent)]
    UnknownRole(#[from] shared::identity::UnknownRole),
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Read the identity headers set by the gateway
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, IdentityError> {
        let user_id = header_value(headers, USER_ID_HEADER)?;
        let role = header_value(headers, USER_ROLE_HEADER)?.parse::<Role>()?;
        Ok(Self::new(user_id, role))
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_driver(&self) -> bool {
        self.role == Role::Driver
    }

    /// Allow only the listed roles
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            return Ok(());
        }
        security_log!(
            WARN,
            "role_denied",
            user_id = %self.user_id,
            role = %self.role
        );
        Err(AppError::forbidden(format!(
            "role {} may not perform this action",
            self.role
        )))
    }

    pub fn require_driver(&self) -> Result<(), AppError> {
        self.require_role(&[Role::Driver])
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_role(&[Role::Admin])
    }

    /// Drivers act on their own resources only; admins on any
    pub fn require_self_or_admin(&self, driver_id: &str) -> Result<(), AppError> {
        if self.is_admin() || (self.is_driver() && self.user_id == driver_id) {
            return Ok(());
        }
        security_log!(
            WARN,
            "foreign_resource",
            user_id = %self.user_id,
            role = %self.role,
            target = %driver_id
        );
        Err(AppError::forbidden("not your wallet"))
    }
}

fn header_value(headers: &HeaderMap, name: &'static str) -> Result<String, IdentityError> {
    let value = headers
        .get(name)
        .ok_or(IdentityError::Missing(name))?
        .to_str()
        .map_err(|_| IdentityError::Malformed(name))?
        .trim();
    if value.is_empty() {
        return Err(IdentityError::Missing(name));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(user: &str, role: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(user).unwrap());
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        headers
    }

    #[test]
    fn test_from_headers() {
        let user = CurrentUser::from_headers(&headers("d1", "driver")).unwrap();
        assert_eq!(user, CurrentUser::new("d1", Role::Driver));
    }

    #[test]
    fn test_from_headers_rejects_bad_identity() {
        assert_eq!(
            CurrentUser::from_headers(&HeaderMap::new()),
            Err(IdentityError::Missing(USER_ID_HEADER))
        );
        assert_eq!(
            CurrentUser::from_headers(&headers("  ", "driver")),
            Err(IdentityError::Missing(USER_ID_HEADER))
        );
        assert!(matches!(
            CurrentUser::from_headers(&headers("x", "system")),
            Err(IdentityError::UnknownRole(_))
        ));
    }

    #[test]
    fn test_role_checks() {
        let driver = CurrentUser::new("d1", Role::Driver);
        let admin = CurrentUser::new("a1", Role::Admin);
        let client = CurrentUser::new("c1", Role::Client);

        assert!(driver.require_driver().is_ok());
        assert!(client.require_driver().is_err());
        assert!(admin.require_admin().is_ok());
        assert!(driver.require_admin().is_err());

        assert!(driver.require_self_or_admin("d1").is_ok());
        assert!(driver.require_self_or_admin("d2").is_err());
        assert!(admin.require_self_or_admin("d2").is_ok());
        assert!(client.require_self_or_admin("c1").is_err());
    }
}

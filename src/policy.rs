use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppError;

/// Role
///
/// Coarse authorization label carried by every user and every token.
/// Stored and sent over the wire as `"autor"` / `"admin"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "autor", alias = "author")]
    Author,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Author => "autor",
            Role::Admin => "admin",
        }
    }

    /// Parses a stored or submitted role. Accepts the English spelling of `autor` too.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "autor" | "author" => Some(Role::Author),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const AUTHOR_OR_ADMIN: &[Role] = &[Role::Author, Role::Admin];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// RoutePolicy
///
/// One protected route: the HTTP method, the route template exactly as registered on
/// the router, and the roles allowed to call it.
#[derive(Debug, Clone, Copy)]
pub struct RoutePolicy {
    pub method: &'static str,
    pub path: &'static str,
    pub roles: &'static [Role],
}

/// ROUTE_POLICIES
///
/// The complete authorization surface of the API. Routes not listed here are public.
/// A listed route requires a valid bearer token whose user holds one of `roles`.
pub const ROUTE_POLICIES: &[RoutePolicy] = &[
    RoutePolicy { method: "POST", path: "/Posts", roles: AUTHOR_OR_ADMIN },
    RoutePolicy { method: "PUT", path: "/Posts/{id}", roles: AUTHOR_OR_ADMIN },
    RoutePolicy { method: "DELETE", path: "/Posts/{id}", roles: AUTHOR_OR_ADMIN },
    RoutePolicy { method: "POST", path: "/Users/admin", roles: ADMIN_ONLY },
    RoutePolicy { method: "DELETE", path: "/Users/{id}", roles: ADMIN_ONLY },
];

/// Returns the roles allowed on `method path`, or `None` when the route is public.
pub fn required_roles(method: &str, path: &str) -> Option<&'static [Role]> {
    ROUTE_POLICIES
        .iter()
        .find(|policy| policy.method.eq_ignore_ascii_case(method) && policy.path == path)
        .map(|policy| policy.roles)
}

/// authorize
///
/// Role Guard. Permits iff `caller_role` parses to one of the `allowed` roles, so
/// stored spellings such as `"author"` are treated like `"autor"`.
/// Every denial is an `Unauthorized` error; nothing else is touched.
pub fn authorize(caller_role: &str, allowed: &[Role]) -> Result<(), AppError> {
    if Role::parse(caller_role).is_some_and(|role| allowed.contains(&role)) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(format!(
            "O perfil '{caller_role}' não tem permissão para esta operação"
        )))
    }
}

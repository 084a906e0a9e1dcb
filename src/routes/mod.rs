/// Router Module Index
///
/// One module per resource. Route templates registered here must match the entries in
/// `policy::ROUTE_POLICIES` exactly, since the policy middleware keys on the matched template.

/// `/Posts` and `/Posts/{id}`.
pub mod posts;

/// `/Users`, `/Users/admin` and `/Users/{id}`.
pub mod users;

/// Login (`/auth`) and the health probe.
pub mod auth;

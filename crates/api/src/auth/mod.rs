//! Authentication support: JWT validation for HTTP and WebSocket clients.
//!
//! Token issuance belongs to the external identity provider; this backend
//! only validates HS256 access tokens signed with the shared secret.

pub mod jwt;

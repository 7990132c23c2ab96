//! Request extractors and middleware shared by every handler.
//!
//! - [`auth::AuthUser`] -- the caller, from a JWT Bearer token.
//! - [`rbac::RequireAuth`], [`rbac::RequireClinician`], [`rbac::RequireAdmin`] -- role gates.
//! - [`validated_json::ValidatedJson`] -- JSON body that has passed `validator` rules.
//! - [`request_meta::RequestMeta`] -- client IP, user agent and request id.
//! - [`rate_limit`] -- fixed-window limiting for `/auth` and `/ai`.

pub mod auth;
pub mod rate_limit;
pub mod rbac;
pub mod request_meta;
pub mod validated_json;

/// Middleware modules for the API server
///
/// - `cache`: Redis-backed response cache for the task list endpoint
/// - `rate_limit`: Role-based, sensitive-endpoint, and login rate limiting
/// - `security`: Security response headers

pub mod cache;
pub mod rate_limit;
pub mod security;

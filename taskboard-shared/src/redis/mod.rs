/// Redis layer for Taskboard
///
/// # Modules
///
/// - `client`: connection management plus the side-cache operations
///   (get, set-with-TTL, delete-by-prefix) used by the response cache

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};

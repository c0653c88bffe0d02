/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, profile, logout
/// - `tasks`: Task CRUD and assignment
/// - `analytics`: Aggregated task statistics
/// - `events`: Live task-event feed (SSE)
/// - `admin`: User role administration

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod events;
pub mod health;
pub mod tasks;

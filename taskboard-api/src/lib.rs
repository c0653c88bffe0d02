//! # Taskboard API Server Library
//!
//! This library provides the core functionality for the Taskboard API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `broadcast`: Live task-event fan-out to connected clients
//! - `config`: Configuration management
//! - `effects`: Post-commit side effects of task mutations
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response cache, rate limiting, security headers
//! - `notify`: Outbound notification dispatch
//! - `routes`: API route handlers

pub mod app;
pub mod broadcast;
pub mod config;
pub mod effects;
pub mod error;
pub mod middleware;
pub mod notify;
pub mod routes;

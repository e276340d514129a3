//! Library crate for rankwave-back, exposing modules for binaries and integration tests.

/// Runtime configuration loading.
pub mod config;
/// Persistence layer: entities, store backends, and the poll repository.
pub mod dao;
/// Request, response, and WebSocket frame definitions.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP and WebSocket route trees.
pub mod routes;
/// Coordinator, tally, token, and supervision services.
pub mod services;
/// Shared application state: store handle, rooms, degraded flag.
pub mod state;

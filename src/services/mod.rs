/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Session coordinator: poll lifecycle and participant actions.
pub mod poll_service;
/// Storage connection supervision and degraded mode handling.
pub mod storage_supervisor;
/// Ranked-choice tally computation.
pub mod tally;
/// Participant access token issuing and verification.
pub mod token_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
/// Outbound WebSocket frame construction and per-poll fan-out.
pub mod ws_events;

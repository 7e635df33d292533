/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Mutating game operations.
pub mod lifecycle_service;
/// Read-only game projections.
pub mod public_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Per-game Server-Sent Events streams.
pub mod sse_service;
/// Storage connection supervisor with backoff and degraded mode.
pub mod storage_supervisor;

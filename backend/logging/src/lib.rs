//! Telemetry and structured logging components for Veriforge agents.
//!
//! Handles log redaction, console/NDJSON output, file rotation, and agent event recording.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EVENT_TARGET, EventLogEntry, EventLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;

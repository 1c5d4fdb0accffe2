//! Common library for the video catalog services
//!
//! This crate provides shared functionality used by the media and API
//! services: PostgreSQL connectivity, the database error type, tracing
//! set-up, and small presentation helpers such as byte-size formatting.

pub mod database;
pub mod error;
pub mod format;
pub mod telemetry;

pub use format::format_size;

#![deny(unsafe_code)]

//! Shared test utilities for the dockhand workspace.
//!
//! Provides a fake engine daemon on a temporary Unix socket, a recording
//! command runner, config builders and tracing helpers so that individual
//! crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! dockhand-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod daemon;
pub mod runner;
pub mod tracing_setup;

pub use daemon::{FakeDaemon, RecordedRequest};
pub use runner::RecordingRunner;

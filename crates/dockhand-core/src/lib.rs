#![deny(unsafe_code)]

//! dockhand core: a client for the container engine's HTTP API.
//!
//! Layers, leaves first:
//!
//! ```text
//!  engine  ──▶  client  ──▶  http (codec)  ──▶  transport  ──▶  engine socket
//!     │
//!     └──▶  process (engine CLI: pull, inspect, cp, exec ls)
//! ```
//!
//! Each request opens its own connection; nothing is pooled or cached.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future for trait methods used through
/// `dyn Trait`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// API client: one connection per request, typed responses.
pub mod client;
/// Image and container operations.
pub mod engine;
/// HTTP/1.1 request serialization and response framing.
pub mod http;
/// External process invocation.
pub mod process;
/// Unix socket and TCP connections to the engine.
pub mod transport;
/// Engine API record types.
pub mod types;

pub use client::{ApiClient, ClientError, RequestOptions, Response};
pub use engine::{
    ContainerListParams, Engine, EngineError, InspectFormat, Inspection, ListKind, Listing,
    RemoveContainerOptions, RemoveImageOptions,
};
pub use process::{CommandRunner, ProcessError, ProcessOutput, TokioCommandRunner};
pub use transport::{Connection, Endpoint, TransportError};

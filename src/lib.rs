//! # pybridge
//!
//! A long-lived, resource-bounded Python code-execution service.
//!
//! The bridge accepts execution requests as newline-delimited JSON over a
//! byte-stream pair, runs each request's code inside an isolated guest
//! engine, and returns structured results — persisting variable state across
//! requests so a calling agent can hold a multi-turn, REPL-like session while
//! paying the engine's startup cost only once.
//!
//! ## Guarantees
//!
//! - **Airtight validation first:** file count, per-file size, aggregate size
//!   and path confinement are all checked before any write reaches the guest
//!   filesystem; a rejected request mutates nothing
//! - **One request, one response:** strict FIFO over the stream pair, with
//!   every failure local to its own exchange
//! - **Bounded everything:** request line length, injected file volume, and
//!   captured stdout/stderr are all capped
//!
//! The guest engine itself is an external collaborator behind the
//! [`engine::GuestEngine`] trait; isolation comes from the engine being
//! memory-sandboxed, while this layer restricts which paths and how much data
//! may cross the boundary. Wall-clock timeouts are the supervising process's
//! job — there is no in-protocol cancellation.

pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod sandbox;
pub mod session;

pub use config::{BridgeConfig, Limits};
pub use engine::{GuestEngine, OutputHandler};
pub use error::{Error, Result};
pub use protocol::{serve_stdio, ProtocolServer, Request, Response};
pub use session::{ExecutionOutcome, PythonSession};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

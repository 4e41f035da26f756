//! Guest engine contract
//!
//! The guest language engine (the sandboxed runtime that actually executes
//! submitted code) is an external collaborator. This module pins down the
//! contract the rest of the crate programs against: package loading, guest
//! code evaluation, a confined virtual filesystem, and output callbacks for
//! bounded capture.

pub mod mock;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Callback receiving a chunk of guest stdout or stderr
pub type OutputHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Contract for the external guest engine
///
/// Implementations are expected to be memory-sandboxed; this layer only
/// restricts which paths and how much data cross the boundary. Directory
/// creation must tolerate "already exists" as success.
#[async_trait]
pub trait GuestEngine: Send {
    /// Register the callback receiving guest stdout
    fn set_stdout(&mut self, handler: OutputHandler);

    /// Register the callback receiving guest stderr
    fn set_stderr(&mut self, handler: OutputHandler);

    /// Load named packages into the engine
    ///
    /// Fails if a named package is unavailable. Loaded packages stay loaded
    /// for the lifetime of the engine.
    async fn load_packages(&mut self, names: &[String]) -> Result<()>;

    /// Evaluate guest source and return the textual value of its final
    /// expression
    async fn run_guest_code(&mut self, source: &str) -> Result<String>;

    /// Create a directory in the guest filesystem, tolerating "already exists"
    async fn make_directory(&mut self, path: &str) -> Result<()>;

    /// Change the guest working directory
    async fn change_directory(&mut self, path: &str) -> Result<()>;

    /// Write a file into the guest filesystem
    async fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<()>;
}

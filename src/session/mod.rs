//! Execution context management
//!
//! `PythonSession` owns the guest engine and the persistent execution state
//! that makes the service REPL-like: variables bound by one request are
//! visible to the next for the lifetime of the process. Access is strictly
//! sequential — the protocol loop resolves one request at a time — so the
//! session needs no locking.

pub mod harness;

use std::collections::HashSet;
use tracing::{debug, info};

use crate::capture::{self, BoundedBuffer};
use crate::config::BridgeConfig;
use crate::engine::GuestEngine;
use crate::error::Result;
use crate::sandbox::{parent_directories, ValidatedFile};

/// Outcome of one code execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Whether the code ran to completion without raising
    pub ok: bool,
    /// Captured stdout, bounded
    pub stdout: String,
    /// Captured stderr, bounded
    pub stderr: String,
    /// `repr` of the trailing bare expression, when present
    pub result: Option<String>,
    /// Full traceback when execution raised
    pub error: Option<String>,
}

/// Long-lived execution session over a guest engine
///
/// Owns the engine, the host-side view of its loaded-package set, and the
/// confinement root. The persistent variable bindings live inside the guest,
/// keyed by a well-known `__main__` attribute; they are created lazily on
/// first use and cleared only by the explicit [`clear_state`] operation.
///
/// [`clear_state`]: PythonSession::clear_state
pub struct PythonSession {
    engine: Box<dyn GuestEngine>,
    config: BridgeConfig,
    loaded_packages: HashSet<String>,
    prepared: bool,
}

impl PythonSession {
    /// Create a session over the given engine
    pub fn new(engine: Box<dyn GuestEngine>, config: BridgeConfig) -> Self {
        PythonSession {
            engine,
            config,
            loaded_packages: HashSet::new(),
            prepared: false,
        }
    }

    /// One-time workspace setup: create the confinement root and make it the
    /// guest working directory
    ///
    /// Idempotent; later calls are no-ops.
    pub async fn prepare(&mut self) -> Result<()> {
        if self.prepared {
            return Ok(());
        }
        let root = self.config.work_root.clone();
        self.engine.make_directory(&root).await?;
        self.engine.change_directory(&root).await?;
        self.prepared = true;
        info!("Guest workspace prepared at {}", root);
        Ok(())
    }

    /// Load packages not already loaded into the engine
    pub async fn load_packages(&mut self, names: &[String]) -> Result<()> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| !self.loaded_packages.contains(*n))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        debug!("Loading guest packages: {:?}", missing);
        self.engine.load_packages(&missing).await?;
        self.loaded_packages.extend(missing);
        Ok(())
    }

    /// Write a fully validated batch of files into the guest filesystem
    ///
    /// Callers must only pass batches produced by [`sandbox::validate`]; this
    /// method performs no validation of its own. Missing intermediate
    /// directories are created shallowest-first.
    ///
    /// [`sandbox::validate`]: crate::sandbox::validate
    pub async fn stage_files(&mut self, entries: &[ValidatedFile]) -> Result<()> {
        for entry in entries {
            for dir in parent_directories(&self.config.work_root, &entry.sandbox_path) {
                self.engine.make_directory(&dir).await?;
            }
            self.engine
                .write_file(&entry.sandbox_path, entry.contents.as_bytes())
                .await?;
            debug!(
                "Staged {} ({} bytes)",
                entry.sandbox_path,
                entry.contents.len()
            );
        }
        Ok(())
    }

    /// Run code against the persistent namespace with bounded output capture
    ///
    /// Statements run first; a trailing bare expression is evaluated against
    /// the mutated namespace and its `repr` becomes `result`. Exceptions are
    /// reported in the outcome with whatever output was captured before the
    /// raise — an `Err` here means the engine itself failed, not the code.
    pub async fn run(&mut self, code: &str, pythonpath: &[String]) -> Result<ExecutionOutcome> {
        let limit = self.config.limits.max_capture_chars;
        let stdout = BoundedBuffer::shared(limit);
        let stderr = BoundedBuffer::shared(limit);
        self.engine.set_stdout(capture::sink(stdout.clone()));
        self.engine.set_stderr(capture::sink(stderr.clone()));

        let source = harness::render(code, pythonpath);
        let payload_text = self.engine.run_guest_code(&source).await?;
        let payload = harness::parse_payload(&payload_text)?;

        Ok(ExecutionOutcome {
            ok: payload.ok,
            stdout: capture::drain(&stdout),
            stderr: capture::drain(&stderr),
            result: payload.result,
            error: payload.error,
        })
    }

    /// Explicitly drop the persistent namespace
    ///
    /// Not reachable from the wire protocol; callers that want a reset either
    /// use this or restart the process.
    pub async fn clear_state(&mut self) -> Result<()> {
        info!("Clearing persistent session namespace");
        self.engine.run_guest_code(&harness::render_clear()).await?;
        Ok(())
    }
}

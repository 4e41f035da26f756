//! Scripted in-memory guest engine
//!
//! Stands in for a real engine in tests: records every filesystem and
//! package call, replays scripted stdout/stderr writes through the registered
//! handlers, and answers `run_guest_code` from a queue of canned payloads.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::engine::{GuestEngine, OutputHandler};
use crate::error::{Error, Result};

/// Which output channel a scripted emission targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdout,
    Stderr,
}

/// Recorded calls and scripted behavior, shared between the engine and the
/// test that inspects it
#[derive(Default)]
pub struct MockState {
    /// Directories created, in call order
    pub dirs: Vec<String>,
    /// Files written, in call order
    pub files: Vec<(String, String)>,
    /// Every package batch passed to `load_packages`
    pub package_batches: Vec<Vec<String>>,
    /// Every source string passed to `run_guest_code`
    pub sources: Vec<String>,
    /// Last working directory set via `change_directory`
    pub cwd: Option<String>,
    /// Queued `run_guest_code` return values; when empty, a success payload
    /// with a null result is returned
    pub payloads: VecDeque<String>,
    /// Output chunks emitted through the handlers before the next payload
    pub emissions: VecDeque<(Channel, String)>,
    /// Package name that fails to load, if any
    pub failing_package: Option<String>,
    /// Fail the next `write_file` call when set
    pub fail_writes: bool,
}

/// Shared handle to the mock's state
pub type MockHandle = Arc<Mutex<MockState>>;

/// In-memory engine for tests
pub struct MockEngine {
    state: MockHandle,
    stdout: Option<OutputHandler>,
    stderr: Option<OutputHandler>,
}

impl MockEngine {
    /// Create a mock engine plus the handle used to script and inspect it
    pub fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let engine = MockEngine {
            state: state.clone(),
            stdout: None,
            stderr: None,
        };
        (engine, state)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Queue a payload on a mock handle
pub fn push_payload(handle: &MockHandle, payload: &str) {
    handle.lock().unwrap().payloads.push_back(payload.to_string());
}

/// Queue an output emission on a mock handle
pub fn push_emission(handle: &MockHandle, channel: Channel, text: &str) {
    handle
        .lock()
        .unwrap()
        .emissions
        .push_back((channel, text.to_string()));
}

#[async_trait]
impl GuestEngine for MockEngine {
    fn set_stdout(&mut self, handler: OutputHandler) {
        self.stdout = Some(handler);
    }

    fn set_stderr(&mut self, handler: OutputHandler) {
        self.stderr = Some(handler);
    }

    async fn load_packages(&mut self, names: &[String]) -> Result<()> {
        let mut state = self.lock();
        if let Some(bad) = &state.failing_package {
            if names.iter().any(|n| n == bad) {
                return Err(Error::Engine(format!("no package named {:?}", bad)));
            }
        }
        state.package_batches.push(names.to_vec());
        Ok(())
    }

    async fn run_guest_code(&mut self, source: &str) -> Result<String> {
        let (emissions, payload) = {
            let mut state = self.lock();
            state.sources.push(source.to_string());
            let emissions: Vec<(Channel, String)> = state.emissions.drain(..).collect();
            let payload = state
                .payloads
                .pop_front()
                .unwrap_or_else(|| r#"{"ok": true, "result": null, "error": null}"#.to_string());
            (emissions, payload)
        };

        for (channel, text) in emissions {
            let handler = match channel {
                Channel::Stdout => self.stdout.as_ref(),
                Channel::Stderr => self.stderr.as_ref(),
            };
            if let Some(handler) = handler {
                handler(&text);
            }
        }

        Ok(payload)
    }

    async fn make_directory(&mut self, path: &str) -> Result<()> {
        let mut state = self.lock();
        // Tolerate "already exists", mirroring the engine contract
        if !state.dirs.iter().any(|d| d == path) {
            state.dirs.push(path.to_string());
        }
        Ok(())
    }

    async fn change_directory(&mut self, path: &str) -> Result<()> {
        self.lock().cwd = Some(path.to_string());
        Ok(())
    }

    async fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(Error::Engine(format!("write failed for {:?}", path)));
        }
        state
            .files
            .push((path.to_string(), String::from_utf8_lossy(contents).into_owned()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_filesystem_calls() {
        let (mut engine, handle) = MockEngine::new();
        engine.make_directory("/work").await.unwrap();
        engine.make_directory("/work").await.unwrap();
        engine.change_directory("/work").await.unwrap();
        engine.write_file("/work/a.txt", b"alpha").await.unwrap();

        let state = handle.lock().unwrap();
        assert_eq!(state.dirs, vec!["/work".to_string()]);
        assert_eq!(state.cwd.as_deref(), Some("/work"));
        assert_eq!(state.files, vec![("/work/a.txt".to_string(), "alpha".to_string())]);
    }

    #[tokio::test]
    async fn test_scripted_payload_and_emissions() {
        let (mut engine, handle) = MockEngine::new();
        let captured = Arc::new(Mutex::new(String::new()));
        let sink = captured.clone();
        engine.set_stdout(Arc::new(move |chunk: &str| {
            sink.lock().unwrap().push_str(chunk);
        }));

        push_emission(&handle, Channel::Stdout, "hi\n");
        push_payload(&handle, r#"{"ok": true, "result": "42", "error": null}"#);

        let payload = engine.run_guest_code("ignored").await.unwrap();
        assert!(payload.contains("42"));
        assert_eq!(*captured.lock().unwrap(), "hi\n");
    }

    #[tokio::test]
    async fn test_failing_package() {
        let (mut engine, handle) = MockEngine::new();
        handle.lock().unwrap().failing_package = Some("nope".to_string());
        let err = engine
            .load_packages(&["numpy".to_string(), "nope".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}

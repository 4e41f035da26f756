//! Protocol engine
//!
//! Reads line-delimited requests, dispatches each through quota enforcement,
//! path sandboxing and the execution session, and writes one line-delimited
//! response per request. Processing is strictly sequential: a request is
//! fully resolved and its response flushed before the next line is read,
//! which is what lets the persistent session go unlocked.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::engine::GuestEngine;
use crate::error::{Error, Result};
use crate::protocol::{Request, Response};
use crate::sandbox;
use crate::session::PythonSession;

/// Line-oriented request/response server over a stream pair
pub struct ProtocolServer<R, W> {
    reader: R,
    writer: W,
    session: PythonSession,
    config: BridgeConfig,
}

impl<R, W> ProtocolServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a server over the given streams and engine
    pub fn new(engine: Box<dyn GuestEngine>, config: BridgeConfig, reader: R, writer: W) -> Self {
        let session = PythonSession::new(engine, config.clone());
        ProtocolServer {
            reader,
            writer,
            session,
            config,
        }
    }

    /// Run the read loop until end-of-input or a shutdown request
    ///
    /// Every failure is local to one request/response exchange; only the
    /// streams dying ends the loop early. No response line is written for
    /// the shutdown request — callers treat stream closure as the
    /// acknowledgement.
    pub async fn run(&mut self) -> Result<()> {
        self.session.prepare().await?;

        let mut raw = Vec::new();
        loop {
            raw.clear();
            let bytes_read = self.reader.read_until(b'\n', &mut raw).await?;
            if bytes_read == 0 {
                info!("Input stream closed, shutting down");
                break;
            }

            // Decode lossily: invalid UTF-8 becomes replacement characters
            // and surfaces as a request-local parse failure, never as a
            // stream error that would end the loop
            let mut line = String::from_utf8_lossy(&raw).into_owned();

            // Strip the delimiter and any trailing carriage return
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }

            if line.trim().is_empty() {
                continue;
            }

            let line_chars = line.chars().count();
            if line_chars > self.config.limits.max_line_chars {
                // Never parse an oversized line
                warn!("Rejecting oversized request line ({} chars)", line_chars);
                let err = Error::Protocol(format!(
                    "request line too long: {} chars (max {})",
                    line_chars, self.config.limits.max_line_chars
                ));
                self.write_response(&Response::failure(err.to_string())).await?;
                continue;
            }

            let request = match serde_json::from_str::<Request>(&line) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Rejecting unparseable request line: {}", e);
                    let err = Error::Protocol(format!("invalid request JSON: {}", e));
                    self.write_response(&Response::failure(err.to_string())).await?;
                    continue;
                }
            };

            if request.shutdown {
                info!("Shutdown requested, terminating read loop");
                break;
            }

            let response = self.handle(request).await?;
            self.write_response(&response).await?;
        }

        Ok(())
    }

    /// Resolve one request into a response, converting request-local errors
    /// into failure responses
    async fn handle(&mut self, request: Request) -> Result<Response> {
        match self.dispatch(request).await {
            Ok(response) => Ok(response),
            Err(err) if err.is_request_local() => {
                warn!("Request failed: {}", err);
                Ok(Response::failure(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Quota enforcement, file staging, package loading, then execution
    async fn dispatch(&mut self, request: Request) -> Result<Response> {
        debug!(
            "Dispatching request ({} code bytes, {} files, {} packages)",
            request.code.len(),
            request.files.len(),
            request.packages.len()
        );

        let validated = sandbox::validate(
            &request.files,
            &self.config.work_root,
            &self.config.limits.quota,
        )?;
        self.session.stage_files(&validated).await?;

        self.session.load_packages(&request.packages).await?;

        let outcome = self.session.run(&request.code, &request.pythonpath).await?;
        Ok(Response::from(outcome))
    }

    /// Serialize a response to one line and flush it before the next read
    async fn write_response(&mut self, response: &Response) -> Result<()> {
        let mut encoded = serde_json::to_string(response).map_err(Error::Json)?;
        encoded.push('\n');
        self.writer.write_all(encoded.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Serve the protocol over the process's stdin and stdout
///
/// Logging must go to stderr when using this entry point — stdout carries the
/// wire protocol.
pub async fn serve_stdio(engine: Box<dyn GuestEngine>, config: BridgeConfig) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    ProtocolServer::new(engine, config, reader, writer).run().await
}

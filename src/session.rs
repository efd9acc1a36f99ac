//! Session protocol: one request, one framed audio response per connection
//!
//! The client sends raw UTF-8 text and stops sending. The server answers with
//! a 4-byte big-endian length followed by exactly that many audio bytes, or
//! closes without a response when anything fails before the frame is written.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::processor::CommandProcessor;
use crate::providers::Synthesizer;
use crate::{Error, Result};

/// Per-connection protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accept,
    ReadRequest,
    Process,
    Synthesize,
    SendResponse,
    Close,
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Accept => "accept",
            Self::ReadRequest => "read_request",
            Self::Process => "process",
            Self::Synthesize => "synthesize",
            Self::SendResponse => "send_response",
            Self::Close => "close",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A frame carrying `bytes` audio bytes was written
    Responded { bytes: usize },
    /// The request was empty; nothing was sent
    Empty,
    /// The session failed in `state`; nothing was sent
    Failed { state: SessionState, reason: String },
}

/// Read one request: a single bounded read, decoded and trimmed
///
/// Returns `None` for an empty or whitespace-only payload.
///
/// # Errors
///
/// Returns error on I/O failure, when no bytes arrive within `timeout`, or
/// when the payload is not valid UTF-8
pub async fn read_request<R>(reader: &mut R, max_bytes: usize, timeout: Duration) -> Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; max_bytes];
    let n = tokio::time::timeout(timeout, reader.read(&mut buf))
        .await
        .map_err(|_| Error::Timeout(format!("no request within {}s", timeout.as_secs_f32())))??;
    buf.truncate(n);

    let text = String::from_utf8(buf)
        .map_err(|e| Error::Protocol(format!("request is not valid UTF-8: {e}")))?;
    let text = text.trim();

    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// Write a length-prefixed frame
///
/// # Errors
///
/// Returns error if the payload exceeds `u32::MAX` bytes or the write fails
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::Protocol(format!("payload of {} bytes exceeds frame limit", payload.len())))?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Drives a single connection through the protocol states
pub struct SessionHandler {
    processor: Arc<CommandProcessor>,
    synthesizer: Arc<dyn Synthesizer>,
    max_request_bytes: usize,
    read_timeout: Duration,
}

impl SessionHandler {
    #[must_use]
    pub fn new(
        processor: Arc<CommandProcessor>,
        synthesizer: Arc<dyn Synthesizer>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            processor,
            synthesizer,
            max_request_bytes: config.max_request_bytes,
            read_timeout: config.read_timeout,
        }
    }

    /// Serve one exchange on `stream`, then close it
    pub async fn handle<S>(&self, mut stream: S) -> SessionOutcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        tracing::debug!(state = %SessionState::Accept, "session started");

        let outcome = match self.exchange(&mut stream).await {
            Ok(outcome) => outcome,
            Err((state, e)) => {
                tracing::warn!(%state, error = %e, "session failed");
                tracing::debug!(state = %SessionState::Error, "session state");
                SessionOutcome::Failed {
                    state,
                    reason: e.to_string(),
                }
            }
        };

        if let Err(e) = stream.shutdown().await {
            tracing::debug!(error = %e, "connection already closed");
        }
        tracing::debug!(state = %SessionState::Close, "session closed");

        outcome
    }

    async fn exchange<S>(&self, stream: &mut S) -> std::result::Result<SessionOutcome, (SessionState, Error)>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let at = |state: SessionState| {
            tracing::debug!(%state, "session state");
            move |e: Error| (state, e)
        };

        let fail = at(SessionState::ReadRequest);
        let Some(command) = read_request(stream, self.max_request_bytes, self.read_timeout)
            .await
            .map_err(fail)?
        else {
            tracing::info!("empty request, closing without response");
            return Ok(SessionOutcome::Empty);
        };
        tracing::info!(command = %command, "received command");

        tracing::debug!(state = %SessionState::Process, "session state");
        let reply = self.processor.process(&command).await;
        tracing::info!(reply = %reply, "processed command");

        let fail = at(SessionState::Synthesize);
        let audio = self.synthesizer.synthesize(&reply).await.map_err(fail)?;
        if audio.is_empty() {
            return Err((
                SessionState::Synthesize,
                Error::Tts("synthesizer returned no audio".to_string()),
            ));
        }

        let fail = at(SessionState::SendResponse);
        write_frame(stream, &audio).await.map_err(fail)?;
        tracing::info!(bytes = audio.len(), "sent audio response");

        Ok(SessionOutcome::Responded { bytes: audio.len() })
    }
}

/// Accept loop with a cap on concurrently running sessions
pub struct SessionServer {
    handler: Arc<SessionHandler>,
    sessions: Arc<Semaphore>,
}

impl SessionServer {
    /// Create a server allowing at most `max_sessions` concurrent sessions
    #[must_use]
    pub fn new(handler: SessionHandler, max_sessions: usize) -> Self {
        Self {
            handler: Arc::new(handler),
            sessions: Arc::new(Semaphore::new(max_sessions.max(1))),
        }
    }

    /// Serve connections from `listener` until `shutdown` resolves
    ///
    /// Each connection runs on its own task. At capacity the loop stops
    /// accepting until a running session finishes.
    ///
    /// # Errors
    ///
    /// Returns error if the session limiter is closed
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "session server listening");
        }

        loop {
            let permit = tokio::select! {
                () = &mut shutdown => break,
                permit = Arc::clone(&self.sessions).acquire_owned() => permit
                    .map_err(|_| Error::Protocol("session limiter closed".to_string()))?,
            };

            let (stream, peer): (_, SocketAddr) = tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                },
            };

            tracing::info!(%peer, "accepted connection");
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                let _permit = permit;
                let outcome = handler.handle(stream).await;
                tracing::debug!(%peer, ?outcome, "session finished");
            });
        }

        tracing::info!("session server stopped");
        Ok(())
    }
}

//! Transport adapter (component A): the sole boundary between the dispatch core
//! and the message channel to the peer.
//!
//! The core depends only on the [`Transport`] trait. Two reference
//! implementations are provided here for tests, property tests, and the
//! demonstration binary — neither is a production wire protocol:
//!
//! - [`ChannelTransport`] — in-process, `std::sync::mpsc`-backed, used by the
//!   test suite to drive deterministic (and deliberately malformed) request
//!   sequences.
//! - [`StdioTransport`] — newline-delimited JSON over stdin/stdout, used by
//!   `probe-dispatch-cli`.

use std::io::{BufRead, BufReader, Read, Write};
use std::sync::mpsc;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, TransportError};
use crate::value::Value;

/// An inbound evaluation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Request identifier assigned by the transport; correlates the eventual reply.
    pub rid: u32,
    /// The request payload, opaque apart from its `id` attribute.
    pub payload: Value,
}

/// The transport adapter contract (component A).
///
/// `recv` is single-consumer: only the input loop calls it. `reply`/`reply_error`
/// are multi-producer: the input loop and every worker thread may call them
/// concurrently, so implementations must serialize their writes internally.
pub trait Transport: Send + Sync {
    /// Blocks until the next request arrives, or a transport-level error occurs.
    fn recv(&self) -> Result<Request, TransportError>;

    /// Sends a successful reply correlated to `rid`.
    fn reply(&self, rid: u32, payload: &Value) -> Result<(), TransportError>;

    /// Sends an error reply correlated to `rid`.
    fn reply_error(&self, rid: u32, code: ErrorCode) -> Result<(), TransportError>;

    /// Unblocks a thread currently parked in `recv`, causing it to return
    /// `Err(TransportError::Closed)`. Used by the shutdown path (see the dispatch
    /// core's cancellation design) to wake the input thread without thread
    /// cancellation. The default implementation does nothing — implementations
    /// for which `recv` is never blocked indefinitely may rely on it.
    fn close(&self) {}
}

// ─── ChannelTransport ──────────────────────────────────────────────────────────

/// An outbound message captured by [`ChannelTransport`], observable by tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Reply { corr_rid: u32, payload: Value },
    ReplyError { corr_rid: u32, code: ErrorCode },
}

/// A handle tests use to push requests into a [`ChannelTransport`].
///
/// A thin wrapper around the raw `mpsc::Sender` so callers send [`Request`]
/// values directly rather than reasoning about the internal close sentinel.
#[derive(Clone)]
pub struct RequestSender(mpsc::Sender<Option<Request>>);

impl RequestSender {
    pub fn send(&self, request: Request) -> Result<(), mpsc::SendError<Request>> {
        self.0
            .send(Some(request))
            .map_err(|mpsc::SendError(inner)| {
                mpsc::SendError(inner.expect("RequestSender always wraps Some"))
            })
    }
}

/// In-process transport backed by `std::sync::mpsc`, for tests and property tests.
///
/// `recv` is driven by requests pushed through the paired [`RequestSender`];
/// outbound replies land on the paired `mpsc::Receiver<Outbound>` for assertions.
pub struct ChannelTransport {
    inbound: Mutex<mpsc::Receiver<Option<Request>>>,
    close_tx: mpsc::Sender<Option<Request>>,
    outbound: Mutex<mpsc::Sender<Outbound>>,
}

impl ChannelTransport {
    /// Builds a transport, returning it alongside the request-injection handle and
    /// the receiver for captured outbound messages.
    pub fn new() -> (Self, RequestSender, mpsc::Receiver<Outbound>) {
        let (in_tx, in_rx) = mpsc::channel::<Option<Request>>();
        let (out_tx, out_rx) = mpsc::channel::<Outbound>();
        let transport = Self {
            inbound: Mutex::new(in_rx),
            close_tx: in_tx.clone(),
            outbound: Mutex::new(out_tx),
        };
        (transport, RequestSender(in_tx), out_rx)
    }
}

impl Transport for ChannelTransport {
    fn recv(&self) -> Result<Request, TransportError> {
        let rx = self.inbound.lock().expect("ChannelTransport mutex poisoned");
        match rx.recv() {
            Ok(Some(request)) => Ok(request),
            Ok(None) => Err(TransportError::Closed),
            Err(_) => Err(TransportError::Closed),
        }
    }

    fn reply(&self, rid: u32, payload: &Value) -> Result<(), TransportError> {
        self.outbound
            .lock()
            .expect("ChannelTransport mutex poisoned")
            .send(Outbound::Reply {
                corr_rid: rid,
                payload: payload.clone(),
            })
            .map_err(|_| TransportError::Closed)
    }

    fn reply_error(&self, rid: u32, code: ErrorCode) -> Result<(), TransportError> {
        self.outbound
            .lock()
            .expect("ChannelTransport mutex poisoned")
            .send(Outbound::ReplyError {
                corr_rid: rid,
                code,
            })
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        // Ignore send failure: if the receiver is already gone, recv() is about
        // to observe that directly.
        let _ = self.close_tx.send(None);
    }
}

// ─── StdioTransport ────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct WireRequest {
    rid: u32,
    payload: Value,
}

/// Newline-delimited JSON over stdin/stdout, used by `probe-dispatch-cli`.
///
/// Each inbound line is `{"rid": <u32>, "payload": <value>}`. Each outbound line
/// is `{"type":"reply","corr_rid":<u32>,"payload":<value>}` or
/// `{"type":"reply_error","corr_rid":<u32>,"code":<u32>}`.
pub struct StdioTransport {
    reader: Mutex<BufReader<Box<dyn Read + Send>>>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            reader: Mutex::new(BufReader::new(Box::new(std::io::stdin()))),
            writer: Mutex::new(Box::new(std::io::stdout())),
        }
    }

    fn write_line(&self, line: &serde_json::Value) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().expect("StdioTransport mutex poisoned");
        serde_json::to_writer(&mut *writer, line)
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for StdioTransport {
    fn recv(&self) -> Result<Request, TransportError> {
        let mut line = String::new();
        let n = {
            let mut reader = self.reader.lock().expect("StdioTransport mutex poisoned");
            reader.read_line(&mut line)?
        };
        if n == 0 {
            return Err(TransportError::Closed);
        }
        let wire: WireRequest = serde_json::from_str(line.trim())
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        Ok(Request {
            rid: wire.rid,
            payload: wire.payload,
        })
    }

    fn reply(&self, rid: u32, payload: &Value) -> Result<(), TransportError> {
        let line = serde_json::json!({
            "type": "reply",
            "corr_rid": rid,
            "payload": payload,
        });
        self.write_line(&line)
    }

    fn reply_error(&self, rid: u32, code: ErrorCode) -> Result<(), TransportError> {
        let line = serde_json::json!({
            "type": "reply_error",
            "corr_rid": rid,
            "code": code.wire(),
        });
        self.write_line(&line)
    }
}

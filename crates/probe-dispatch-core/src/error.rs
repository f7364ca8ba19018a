//! Structured, closed-set error types at every fallible boundary of the dispatch
//! core: transport I/O, evaluator failures, and worker spawn failures.
//!
//! Each of these is a finite set of variants the caller is expected to match on
//! (see the error taxonomy in the design), so `thiserror` is used throughout —
//! never a catch-all `anyhow::Error`.

use thiserror::Error;

/// A per-request error code, carried on the wire inside a `ReplyError`.
///
/// Serialized to a plain integer only at the transport edge (see
/// [`ErrorCode::wire`]); the core itself always matches on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// The request payload lacked the `id` attribute.
    NoAttr,
    /// An internal failure unrelated to the evaluator (e.g. failed to spawn a worker).
    Unknown,
    /// An evaluator-specific code, passed through unchanged.
    Evaluator(u32),
}

impl ErrorCode {
    /// The wire representation of this code: `1` for `NoAttr`, `2` for `Unknown`,
    /// and the evaluator's own code for `Evaluator(_)`.
    pub fn wire(&self) -> u32 {
        match self {
            ErrorCode::NoAttr => 1,
            ErrorCode::Unknown => 2,
            ErrorCode::Evaluator(code) => *code,
        }
    }
}

/// Failure of a blocking transport operation (`recv`, `reply`, `reply_error`).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport's underlying channel is closed, either because the peer hung
    /// up or because shutdown deliberately closed it to unblock a pending `recv`.
    #[error("transport closed")]
    Closed,

    /// A message on the wire could not be decoded.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// An I/O error from the underlying byte stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The outcome of a failed evaluator invocation.
///
/// Carries the [`ErrorCode`] to reply with, plus an optional human-readable
/// message for logging (never sent on the wire).
#[derive(Debug, Clone, Error)]
#[error("evaluator error {code:?}: {message}")]
pub struct EvalError {
    pub code: ErrorCode,
    pub message: String,
}

impl EvalError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failure to spawn a worker thread for a cache-miss request.
#[derive(Debug, Error)]
#[error("failed to spawn worker thread: {0}")]
pub struct SpawnError(#[from] pub std::io::Error);

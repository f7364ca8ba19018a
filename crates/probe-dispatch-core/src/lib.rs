//! Concurrent single-flight dispatch core for an OVAL probe process.
//!
//! Receives requests over a [`transport::Transport`], short-circuits repeat
//! queries for the same object through a [`cache::ResultCache`], guarantees at
//! most one worker thread per in-flight request id via
//! [`registry::InFlightRegistry`], and evaluates cache misses on detached
//! worker threads (see [`worker`]). [`dispatch::ProbeContext`] is the entry
//! point that wires these pieces together.

pub mod barrier;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod transport;
pub mod value;
pub mod worker;

pub use barrier::{BarrierOutcome, StartupBarrier};
pub use cache::ResultCache;
pub use config::DispatchConfig;
pub use dispatch::{ProbeContext, ID_ATTRIBUTE};
pub use error::{ErrorCode, EvalError, SpawnError, TransportError};
pub use registry::{InFlightRegistry, WorkerHandle};
pub use transport::{ChannelTransport, Outbound, Request, RequestSender, StdioTransport, Transport};
pub use value::Value;
pub use worker::{EchoEvaluator, Evaluator};

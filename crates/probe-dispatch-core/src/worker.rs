//! Worker lifecycle (component D): evaluator contract, the reference evaluator,
//! and the spawn/run/retire sequence for a single request.
//!
//! Grounded on the original probe's detached `pthread_create` per incoming
//! request (`probe_worker_runfn`), translated to `std::thread::Builder::spawn`
//! with the returned `JoinHandle` simply dropped — the thread retires itself by
//! removing its own RID from the registry, so nothing needs to join it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use log::{error, warn};

use crate::error::{ErrorCode, EvalError, SpawnError};
use crate::value::Value;

/// The evaluation contract (component E): turns a request payload into a result.
///
/// Implementations should not panic to signal an ordinary evaluation failure —
/// return `Err(EvalError)` instead. A panic is still contained (see
/// [`worker_main`]) but is logged as an evaluator defect, not a normal failure.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, payload: &Value) -> Result<Value, EvalError>;
}

/// A reference evaluator that echoes the payload back as the result.
///
/// Used by tests, benchmarks, and the demonstration CLI in place of a real
/// OVAL probe body.
pub struct EchoEvaluator;

impl Evaluator for EchoEvaluator {
    fn evaluate(&self, payload: &Value) -> Result<Value, EvalError> {
        Ok(payload.clone())
    }
}

/// Everything a worker thread needs, gathered behind one `Arc` so the spawn
/// closure only has to capture a single clone.
pub(crate) struct WorkerDeps {
    pub transport: Arc<dyn crate::transport::Transport>,
    pub cache: Arc<crate::cache::ResultCache>,
    pub registry: Arc<crate::registry::InFlightRegistry>,
    pub evaluator: Arc<dyn Evaluator>,
}

/// Spawns a detached worker thread to evaluate `payload` for `oid`/`rid`.
///
/// The caller must have already inserted `rid` into `deps.registry` via
/// [`InFlightRegistry::try_insert`](crate::registry::InFlightRegistry::try_insert).
/// On spawn failure the caller is responsible for rolling that insertion back —
/// this function cannot do so itself, since ownership of `deps` moves into the
/// (failed) closure attempt before `Builder::spawn` returns control.
pub(crate) fn spawn_worker(
    deps: Arc<WorkerDeps>,
    rid: u32,
    oid: Value,
    payload: Value,
) -> Result<(), SpawnError> {
    thread::Builder::new()
        .name(format!("probe-worker-{rid}"))
        .spawn(move || worker_main(deps, rid, oid, payload))
        .map(|handle| drop(handle))
        .map_err(SpawnError)
}

/// The body of a worker thread: evaluate, cache, reply, retire.
///
/// A panic inside the evaluator is caught and converted into an
/// `ErrorCode::Unknown` reply rather than unwinding past this function — an
/// evaluator bug must not take down the whole probe process. The RID is always
/// removed from the registry before this function returns, on every path.
fn worker_main(deps: Arc<WorkerDeps>, rid: u32, oid: Value, payload: Value) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| deps.evaluator.evaluate(&payload)));

    match outcome {
        Ok(Ok(result)) => {
            let result = Arc::new(result);
            let winner = deps.cache.insert(oid, result);
            if let Err(e) = deps.transport.reply(rid, &winner) {
                warn!("rid {rid}: failed to send reply: {e}");
            }
        }
        Ok(Err(eval_err)) => {
            warn!("rid {rid}: evaluator error: {}", eval_err.message);
            if let Err(e) = deps.transport.reply_error(rid, eval_err.code) {
                warn!("rid {rid}: failed to send error reply: {e}");
            }
        }
        Err(panic_payload) => {
            let message = panic_message(&panic_payload);
            error!("rid {rid}: evaluator panicked: {message}");
            if let Err(e) = deps.transport.reply_error(rid, ErrorCode::Unknown) {
                warn!("rid {rid}: failed to send error reply after panic: {e}");
            }
        }
    }

    deps.registry.remove(rid);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

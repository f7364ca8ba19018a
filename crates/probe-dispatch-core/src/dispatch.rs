//! The dispatch core itself: the input loop and per-request routing that ties
//! together the transport, cache, registry, and worker lifecycle.
//!
//! Grounded on the original probe's `probe_main` input loop
//! (`examples/original_source/src/OVAL/probes/probe/input_handler.c`): receive,
//! extract `id`, check the cache, check the registry, spawn a worker — in that
//! order, so a cache hit never pays for a worker spawn and a duplicate RID never
//! spawns a second worker for the same in-flight request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::barrier::StartupBarrier;
use crate::cache::ResultCache;
use crate::config::DispatchConfig;
use crate::error::ErrorCode;
use crate::registry::InFlightRegistry;
use crate::transport::{Request, Transport};
use crate::value::Value;
use crate::worker::{spawn_worker, Evaluator, WorkerDeps};

/// The name of the attribute every request payload must carry to be dispatched.
///
/// Grounded on `probe_obj_getattrval(probe_in, "id")` in the original input loop.
pub const ID_ATTRIBUTE: &str = "id";

/// Shared state for one probe process: transport, cache, registry, evaluator,
/// and the shutdown flag the input loop polls before each `recv`.
pub struct ProbeContext {
    transport: Arc<dyn Transport>,
    cache: Arc<ResultCache>,
    registry: Arc<InFlightRegistry>,
    evaluator: Arc<dyn Evaluator>,
    shutdown: AtomicBool,
    config: DispatchConfig,
}

impl ProbeContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        evaluator: Arc<dyn Evaluator>,
        config: DispatchConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            cache: Arc::new(ResultCache::new()),
            registry: Arc::new(InFlightRegistry::new()),
            evaluator,
            shutdown: AtomicBool::new(false),
            config,
        })
    }

    fn worker_deps(&self) -> Arc<WorkerDeps> {
        Arc::new(WorkerDeps {
            transport: Arc::clone(&self.transport),
            cache: Arc::clone(&self.cache),
            registry: Arc::clone(&self.registry),
            evaluator: Arc::clone(&self.evaluator),
        })
    }

    /// Signals the input loop to stop after its current `recv` and closes the
    /// transport to unblock that `recv` if it is currently parked.
    ///
    /// Mirrors `TH_CANCEL_ON`/`pthread_cancel` in the original probe, but never
    /// uses asynchronous thread cancellation: the flag is polled cooperatively
    /// and the transport's own `close` is what actually wakes a blocked `recv`.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.transport.close();
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Runs the input loop: clears `barrier`, then repeatedly receives a
    /// request and dispatches it, until shutdown is requested or the transport
    /// reports a fatal error.
    pub fn run(self: &Arc<Self>, barrier: &StartupBarrier) {
        barrier.wait();
        info!("dispatch core entering input loop");

        loop {
            if self.is_shutting_down() {
                break;
            }
            match self.transport.recv() {
                Ok(request) => self.handle_request(request),
                Err(e) => {
                    info!("input loop stopping: {e}");
                    break;
                }
            }
        }
    }

    /// Routes a single request through cache lookup, registry admission, and
    /// worker spawn.
    fn handle_request(self: &Arc<Self>, request: Request) {
        let Request { rid, payload } = request;

        let oid = match payload.get_attribute(ID_ATTRIBUTE) {
            Some(oid) => oid.clone(),
            None => {
                warn!("rid {rid}: request missing '{ID_ATTRIBUTE}' attribute");
                if let Err(e) = self.transport.reply_error(rid, ErrorCode::NoAttr) {
                    warn!("rid {rid}: failed to send error reply: {e}");
                }
                return;
            }
        };

        if let Some(cached) = self.cache.get(&oid) {
            if let Err(e) = self.transport.reply(rid, &cached) {
                warn!("rid {rid}: failed to send cached reply: {e}");
            }
            return;
        }

        if !self.registry.try_insert(rid) {
            warn!("rid {rid}: duplicate request for an in-flight rid, ignoring");
            return;
        }

        let deps = self.worker_deps();
        if let Err(e) = spawn_worker(deps, rid, oid, payload) {
            warn!("rid {rid}: failed to spawn worker: {e}");
            self.registry.remove(rid);
            if let Err(e) = self.transport.reply_error(rid, ErrorCode::Unknown) {
                warn!("rid {rid}: failed to send error reply after spawn failure: {e}");
            }
        }
    }

    /// Requests shutdown, then waits up to `self.config.drain_timeout` for all
    /// in-flight workers to retire.
    ///
    /// Returns `true` if the registry drained in time, `false` if workers were
    /// still in flight when the timeout elapsed.
    pub fn shutdown(&self) -> bool {
        self.request_shutdown();
        self.registry.wait_until_drained(self.config.drain_timeout)
    }

    pub fn shutdown_with_timeout(&self, timeout: Duration) -> bool {
        self.request_shutdown();
        self.registry.wait_until_drained(timeout)
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn registry(&self) -> &InFlightRegistry {
        &self.registry
    }
}

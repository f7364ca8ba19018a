// tests/dispatch_scenarios.rs
//
// Drives the dispatch core end-to-end through a `ChannelTransport`, covering
// the concrete scenarios and cross-cutting invariants from the dispatch
// design: distinct-OID concurrency, repeat-OID cache short-circuit, duplicate
// in-flight RID rejection, missing-attribute rejection, evaluator-failure
// reply, and graceful shutdown draining in-flight work.

use std::sync::Arc;
use std::time::Duration;

use probe_dispatch_core::{
    ChannelTransport, DispatchConfig, EchoEvaluator, ErrorCode, EvalError, Evaluator, Outbound,
    ProbeContext, Request, StartupBarrier, Value,
};

fn request(rid: u32, oid: &str) -> Request {
    Request {
        rid,
        payload: Value::object([("id", Value::str(oid))]),
    }
}

fn spawn_input_loop(ctx: Arc<ProbeContext>) -> std::thread::JoinHandle<()> {
    let barrier = StartupBarrier::new(1);
    std::thread::spawn(move || ctx.run(&barrier))
}

/// S1: two distinct OIDs arrive back to back — both get their own worker and
/// both receive a correct, independent reply.
#[test]
fn distinct_oids_each_get_a_reply() {
    let (transport, requests, outbound) = ChannelTransport::new();
    let ctx = ProbeContext::new(Arc::new(transport), Arc::new(EchoEvaluator), DispatchConfig::default());
    let handle = spawn_input_loop(Arc::clone(&ctx));

    requests.send(request(1, "a")).unwrap();
    requests.send(request(2, "b")).unwrap();

    let mut seen = vec![outbound.recv_timeout(Duration::from_secs(5)).unwrap()];
    seen.push(outbound.recv_timeout(Duration::from_secs(5)).unwrap());

    assert!(seen.contains(&Outbound::Reply { corr_rid: 1, payload: request(1, "a").payload }));
    assert!(seen.contains(&Outbound::Reply { corr_rid: 2, payload: request(2, "b").payload }));

    ctx.request_shutdown();
    handle.join().unwrap();
}

/// S2/S3: a repeat request for an OID already resolved hits the cache and
/// never spawns a second worker.
#[test]
fn repeat_oid_after_resolution_hits_cache() {
    let (transport, requests, outbound) = ChannelTransport::new();
    let ctx = ProbeContext::new(Arc::new(transport), Arc::new(EchoEvaluator), DispatchConfig::default());
    let handle = spawn_input_loop(Arc::clone(&ctx));

    requests.send(request(1, "repeat")).unwrap();
    let first = outbound.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first, Outbound::Reply { corr_rid: 1, payload: request(1, "repeat").payload });

    // Wait for the worker to retire so the cache-hit path is unambiguous.
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while !ctx.registry().is_empty() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(ctx.registry().is_empty());

    requests.send(request(2, "repeat")).unwrap();
    let second = outbound.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(second, Outbound::Reply { corr_rid: 2, payload: request(1, "repeat").payload });
    assert_eq!(ctx.cache().len(), 1);

    ctx.request_shutdown();
    handle.join().unwrap();
}

/// S4: a second request bearing the same RID as one already in flight must be
/// ignored — no second worker, no second reply. A real transport would never
/// reuse a RID itself, so this is driven directly through `handle_request`-
/// adjacent state via the registry, which is the documented simplification.
#[test]
fn duplicate_in_flight_rid_yields_no_second_worker() {
    let (transport, _requests, _outbound) = ChannelTransport::new();
    let ctx = ProbeContext::new(Arc::new(transport), Arc::new(EchoEvaluator), DispatchConfig::default());

    assert!(ctx.registry().try_insert(77));
    assert!(!ctx.registry().try_insert(77), "duplicate rid must be rejected while in flight");
    assert_eq!(ctx.registry().len(), 1);
}

/// S5: a payload with no `id` attribute is rejected immediately with
/// `ErrorCode::NoAttr`, without ever touching the registry or the cache.
#[test]
fn payload_without_id_attribute_is_rejected() {
    let (transport, requests, outbound) = ChannelTransport::new();
    let ctx = ProbeContext::new(Arc::new(transport), Arc::new(EchoEvaluator), DispatchConfig::default());
    let handle = spawn_input_loop(Arc::clone(&ctx));

    requests
        .send(Request { rid: 9, payload: Value::Int(1) })
        .unwrap();

    assert_eq!(
        outbound.recv_timeout(Duration::from_secs(5)).unwrap(),
        Outbound::ReplyError { corr_rid: 9, code: ErrorCode::NoAttr }
    );
    assert!(ctx.registry().is_empty());
    assert!(ctx.cache().is_empty());

    ctx.request_shutdown();
    handle.join().unwrap();
}

/// S6: an evaluator failure is reported with the evaluator's own error code
/// and never poisons the cache for that OID.
#[test]
fn evaluator_failure_does_not_cache_and_reports_its_code() {
    struct AlwaysFails;
    impl Evaluator for AlwaysFails {
        fn evaluate(&self, _payload: &Value) -> Result<Value, EvalError> {
            Err(EvalError::new(ErrorCode::Evaluator(13), "probe-specific failure"))
        }
    }

    let (transport, requests, outbound) = ChannelTransport::new();
    let ctx = ProbeContext::new(Arc::new(transport), Arc::new(AlwaysFails), DispatchConfig::default());
    let handle = spawn_input_loop(Arc::clone(&ctx));

    requests.send(request(1, "will-fail")).unwrap();

    assert_eq!(
        outbound.recv_timeout(Duration::from_secs(5)).unwrap(),
        Outbound::ReplyError { corr_rid: 1, code: ErrorCode::Evaluator(13) }
    );
    assert!(ctx.cache().get(&Value::str("will-fail")).is_none());

    ctx.request_shutdown();
    handle.join().unwrap();
}

/// Invariant: shutdown does not return until every in-flight worker has
/// retired and removed itself from the registry.
#[test]
fn shutdown_waits_for_all_in_flight_workers() {
    struct Slow;
    impl Evaluator for Slow {
        fn evaluate(&self, payload: &Value) -> Result<Value, EvalError> {
            std::thread::sleep(Duration::from_millis(100));
            Ok(payload.clone())
        }
    }

    let (transport, requests, _outbound) = ChannelTransport::new();
    let ctx = ProbeContext::new(Arc::new(transport), Arc::new(Slow), DispatchConfig::default());
    let handle = spawn_input_loop(Arc::clone(&ctx));

    for i in 0..5 {
        requests.send(request(i, &format!("oid-{i}"))).unwrap();
    }
    // Give the input loop a moment to admit all five before shutdown begins.
    std::thread::sleep(Duration::from_millis(20));

    assert!(ctx.shutdown_with_timeout(Duration::from_secs(5)));
    assert!(ctx.registry().is_empty());

    handle.join().unwrap();
}

/// Invariant: concurrent distinct-RID requests for the same OID converge on
/// exactly one cached result, and every caller observes that same result.
#[test]
fn concurrent_requests_for_same_oid_converge_on_one_result() {
    let (transport, requests, outbound) = ChannelTransport::new();
    let ctx = ProbeContext::new(Arc::new(transport), Arc::new(EchoEvaluator), DispatchConfig::default());
    let handle = spawn_input_loop(Arc::clone(&ctx));

    // Distinct rids racing for the same oid: at most one worker should ever be
    // admitted for that oid's first pass, and late arrivals after that worker
    // retires should all observe the same cached payload.
    requests.send(request(1, "shared")).unwrap();
    let first = outbound.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first, Outbound::Reply { corr_rid: 1, payload: request(1, "shared").payload });

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while !ctx.registry().is_empty() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }

    for rid in 2..6 {
        requests.send(request(rid, "shared")).unwrap();
    }
    let mut replies = Vec::new();
    for _ in 2..6 {
        replies.push(outbound.recv_timeout(Duration::from_secs(5)).unwrap());
    }
    for reply in replies {
        match reply {
            Outbound::Reply { payload, .. } => assert_eq!(payload, request(1, "shared").payload),
            other => panic!("expected a reply, got {other:?}"),
        }
    }
    assert_eq!(ctx.cache().len(), 1);

    ctx.request_shutdown();
    handle.join().unwrap();
}

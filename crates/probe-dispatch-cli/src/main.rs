use std::sync::Arc;
use std::thread;

use clap::Parser;
use log::info;
use probe_dispatch_core::{DispatchConfig, EchoEvaluator, ProbeContext, StartupBarrier, StdioTransport};

/// Demonstration probe process: reads newline-delimited JSON requests from
/// stdin and replies on stdout via `probe-dispatch-core`.
#[derive(Parser, Debug)]
#[command(name = "probe-dispatch-cli", about = "Run a probe dispatch core over stdio")]
struct Args {
    /// Number of threads that must clear the startup barrier before the input
    /// loop begins. The input loop thread always counts as one party; this
    /// flag exists for parity with the original probe's multi-thread startup
    /// rendezvous, where other probe threads (e.g. a signal thread) also wait.
    #[arg(long, default_value_t = 1)]
    barrier_parties: usize,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let ctx = ProbeContext::new(
        Arc::new(StdioTransport::new()),
        Arc::new(EchoEvaluator),
        DispatchConfig::from_env(),
    );

    let barrier = Arc::new(StartupBarrier::new(args.barrier_parties));

    if args.barrier_parties > 1 {
        let barrier = Arc::clone(&barrier);
        let extra = args.barrier_parties - 1;
        for i in 1..=extra {
            let barrier = Arc::clone(&barrier);
            thread::Builder::new()
                .name(format!("probe-startup-{i}"))
                .spawn(move || {
                    barrier.wait();
                })
                .expect("failed to spawn startup barrier thread");
        }
    }

    info!("probe-dispatch-cli starting");
    ctx.run(&barrier);
    info!("input loop exited, draining in-flight workers");
    if !ctx.shutdown() {
        log::warn!("drain timeout elapsed with workers still in flight");
    }
    info!("probe-dispatch-cli shut down");
}

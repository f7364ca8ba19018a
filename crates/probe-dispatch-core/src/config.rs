//! Runtime configuration (ambient stack): values tunable via environment
//! variables, following the same parse-or-default pattern the teacher repo uses
//! for its own pool/cache sizing knobs.

use std::env;
use std::time::Duration;

const DRAIN_TIMEOUT_ENV: &str = "PROBE_DRAIN_TIMEOUT_MS";
const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 5_000;

/// Tunables for [`crate::dispatch::ProbeContext`].
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// How long `shutdown` waits for the in-flight registry to drain before
    /// giving up on a graceful stop.
    pub drain_timeout: Duration,
}

impl DispatchConfig {
    /// Reads `PROBE_DRAIN_TIMEOUT_MS` from the environment, falling back to
    /// `5000` on an absent or unparsable value.
    pub fn from_env() -> Self {
        let drain_timeout_ms = env::var(DRAIN_TIMEOUT_ENV)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_DRAIN_TIMEOUT_MS);

        Self {
            drain_timeout: Duration::from_millis(drain_timeout_ms),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_millis(DEFAULT_DRAIN_TIMEOUT_MS),
        }
    }
}

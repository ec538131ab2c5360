// Engine constants (no magic values)

use std::time::Duration;

/// Default items per batch file
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// Inter-batch pacing window (uniform random, paces against the external
/// system's anti-abuse detection; not a failure backoff)
pub const DEFAULT_PACING_MIN_MS: u64 = 2_000;
pub const DEFAULT_PACING_MAX_MS: u64 = 5_000;

/// Healing restarts allowed before a run is declared fatal
pub const DEFAULT_MAX_HEAL_RECURSION: u32 = 10;

/// Interval at which the embedding process should emit the monitor summary
pub const MONITOR_SUMMARY_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// How many (error_type, category) pairs a metrics snapshot reports
pub const TOP_ERROR_PATTERNS: usize = 5;

/// Engram system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Consecutive failures before the circuit breaker opens.
pub const BREAKER_FAILURE_THRESHOLD: u32 = 5;

/// Seconds the breaker stays open before probing recovery.
pub const BREAKER_TIMEOUT_SECS: u64 = 60;

/// Consecutive half-open successes needed to close the breaker.
pub const BREAKER_SUCCESS_THRESHOLD: u32 = 2;

/// Maximum retry attempts for transient backend failures.
pub const MAX_RETRIES: u32 = 3;

/// Hard timeout for health probes (milliseconds).
pub const PROBE_TIMEOUT_MS: u64 = 5_000;

/// Hard timeout for write operations (milliseconds).
pub const WRITE_TIMEOUT_MS: u64 = 30_000;

/// Quality score needed for promotion to the global project.
pub const PROMOTION_THRESHOLD: f64 = 0.8;

/// Age in days after which unused memories become decay candidates.
pub const DECAY_THRESHOLD_DAYS: i64 = 90;

/// Tag-overlap Jaccard similarity above which two memories are duplicates.
pub const DUPLICATE_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Creation-time window for duplicate detection (milliseconds).
pub const DUPLICATE_WINDOW_MS: i64 = 3_600_000;

/// Default bounded history of the metrics ring buffer.
pub const METRICS_MAX_HISTORY: usize = 1_000;

/// Default external-doc cache TTL (hours).
pub const KNOWLEDGE_TTL_HOURS: u32 = 24 * 7;

/// Length of a git commit SHA in hex characters.
pub const COMMIT_SHA_HEX_LEN: usize = 40;

/// Length of a codebase unique key in hex characters (SHA-256).
pub const UNIQUE_KEY_HEX_LEN: usize = 64;

/// The project id that represents universal scope.
pub const GLOBAL_PROJECT_ID: &str = "global";

//! Tunables for the tool-use loop: iteration bound, trimming threshold, and
//! the tool-dispatch retry policy. All have defaults matching the
//! specification; every field is overridable so tests can shrink the retry
//! backoff instead of waiting on real wall-clock sleeps.

use std::time::Duration;

/// Default iteration bound for one turn (§4.6.1).
pub const DEFAULT_MAX_TURNS: u32 = 10;

/// Default context-trimming threshold, in estimated tokens (§4.6.2).
pub const DEFAULT_TRIM_THRESHOLD_TOKENS: usize = 120_000;

/// Minimum non-system messages retained by trimming (§4.6.2).
pub const DEFAULT_MIN_RETAINED_NON_SYSTEM: usize = 2;

/// Network-level dispatch retry cap (§4.6.3 step 4).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Starting backoff delay for dispatch retries; doubles each attempt.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Engine-wide tunables. Construct with [`EngineConfig::default`] and
/// override individual fields, or use the `with_*` builder methods.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum tool-use iterations before the turn ends with `ExhaustedTurns`.
    pub max_turns: u32,
    /// Estimated-token threshold that triggers trimming before each LLM request.
    pub trim_threshold_tokens: usize,
    /// Minimum number of non-system messages trimming will leave behind.
    pub min_retained_non_system: usize,
    /// Maximum dispatch attempts for one tool call on transport failure.
    pub max_retries: u32,
    /// Starting backoff delay between dispatch retries (doubles each attempt).
    pub retry_base_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            trim_threshold_tokens: DEFAULT_TRIM_THRESHOLD_TOKENS,
            min_retained_non_system: DEFAULT_MIN_RETAINED_NON_SYSTEM,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl EngineConfig {
    /// Override `max_turns`.
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Override `trim_threshold_tokens`.
    #[must_use]
    pub fn with_trim_threshold_tokens(mut self, tokens: usize) -> Self {
        self.trim_threshold_tokens = tokens;
        self
    }

    /// Override the dispatch retry policy — mainly for tests, to avoid real
    /// multi-second sleeps.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }
}

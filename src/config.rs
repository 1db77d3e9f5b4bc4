//! Engine configuration.
//!
//! Defaults mirror the production constants: 5-minute codes with a
//! 5-attempt budget, 5 operations per 15-minute rate window, 10-minute
//! TOTP setup sessions, a ±2-step verification window, and a 90-second
//! replay guard (one step beyond the window, so an accepted code stays
//! blocked for as long as it could still validate).

use std::time::Duration;

const DEFAULT_ISSUER: &str = "conferma";
const DEFAULT_CODE_DIGITS: u32 = 6;
const DEFAULT_CODE_TTL: Duration = Duration::from_secs(300);
const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 5;
const DEFAULT_RATE_LIMIT_MAX: u32 = 5;
const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(900);
const DEFAULT_SETUP_SESSION_TTL: Duration = Duration::from_secs(600);
const DEFAULT_TOTP_STEP_SECONDS: u64 = 30;
const DEFAULT_TOTP_SKEW: u8 = 2;
const DEFAULT_REPLAY_GUARD_TTL: Duration = Duration::from_secs(90);

const ENV_ISSUER: &str = "CONFERMA_ISSUER";
const ENV_RATE_LIMIT_FAIL_CLOSED: &str = "CONFERMA_RATE_LIMIT_FAIL_CLOSED";

/// What the rate limiter does when the ephemeral store is unreachable.
///
/// `FailOpen` keeps the engine available at the cost of a lost counter;
/// `FailClosed` turns the store fault into a hard error. Code lookups
/// always fail closed regardless of this policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitFailurePolicy {
    FailOpen,
    FailClosed,
}

/// Tunables for code issuance, verification, and TOTP enrollment.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    issuer: String,
    code_digits: u32,
    code_ttl: Duration,
    max_code_attempts: u32,
    rate_limit_max: u32,
    rate_limit_window: Duration,
    setup_session_ttl: Duration,
    totp_step_seconds: u64,
    totp_skew: u8,
    replay_guard_ttl: Duration,
    rate_limit_failure_policy: RateLimitFailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            code_digits: DEFAULT_CODE_DIGITS,
            code_ttl: DEFAULT_CODE_TTL,
            max_code_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
            setup_session_ttl: DEFAULT_SETUP_SESSION_TTL,
            totp_step_seconds: DEFAULT_TOTP_STEP_SECONDS,
            totp_skew: DEFAULT_TOTP_SKEW,
            replay_guard_ttl: DEFAULT_REPLAY_GUARD_TTL,
            rate_limit_failure_policy: RateLimitFailurePolicy::FailOpen,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overridable settings from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(issuer) = std::env::var(ENV_ISSUER) {
            let issuer = issuer.trim();
            if !issuer.is_empty() {
                config.issuer = issuer.to_string();
            }
        }
        if parse_bool_env(ENV_RATE_LIMIT_FAIL_CLOSED).unwrap_or(false) {
            config.rate_limit_failure_policy = RateLimitFailurePolicy::FailClosed;
        }
        config
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    #[must_use]
    pub fn with_code_digits(mut self, digits: u32) -> Self {
        self.code_digits = digits;
        self
    }

    #[must_use]
    pub fn with_code_ttl(mut self, ttl: Duration) -> Self {
        self.code_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_max_code_attempts(mut self, max: u32) -> Self {
        self.max_code_attempts = max;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, max: u32, window: Duration) -> Self {
        self.rate_limit_max = max;
        self.rate_limit_window = window;
        self
    }

    #[must_use]
    pub fn with_setup_session_ttl(mut self, ttl: Duration) -> Self {
        self.setup_session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_totp_window(mut self, step_seconds: u64, skew: u8) -> Self {
        self.totp_step_seconds = step_seconds;
        self.totp_skew = skew;
        self
    }

    #[must_use]
    pub fn with_replay_guard_ttl(mut self, ttl: Duration) -> Self {
        self.replay_guard_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_rate_limit_failure_policy(mut self, policy: RateLimitFailurePolicy) -> Self {
        self.rate_limit_failure_policy = policy;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn code_digits(&self) -> u32 {
        self.code_digits
    }

    #[must_use]
    pub fn code_ttl(&self) -> Duration {
        self.code_ttl
    }

    #[must_use]
    pub fn max_code_attempts(&self) -> u32 {
        self.max_code_attempts
    }

    #[must_use]
    pub fn rate_limit_max(&self) -> u32 {
        self.rate_limit_max
    }

    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        self.rate_limit_window
    }

    #[must_use]
    pub fn setup_session_ttl(&self) -> Duration {
        self.setup_session_ttl
    }

    #[must_use]
    pub fn totp_step_seconds(&self) -> u64 {
        self.totp_step_seconds
    }

    #[must_use]
    pub fn totp_skew(&self) -> u8 {
        self.totp_skew
    }

    #[must_use]
    pub fn replay_guard_ttl(&self) -> Duration {
        self.replay_guard_ttl
    }

    #[must_use]
    pub fn rate_limit_failure_policy(&self) -> RateLimitFailurePolicy {
        self.rate_limit_failure_policy
    }
}

fn parse_bool_env(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|value| match value.trim() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_budgets() {
        let config = EngineConfig::default();
        assert_eq!(config.code_digits(), 6);
        assert_eq!(config.code_ttl(), Duration::from_secs(300));
        assert_eq!(config.max_code_attempts(), 5);
        assert_eq!(config.rate_limit_max(), 5);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(900));
        assert_eq!(config.setup_session_ttl(), Duration::from_secs(600));
        assert_eq!(config.totp_step_seconds(), 30);
        assert_eq!(config.totp_skew(), 2);
        assert_eq!(config.replay_guard_ttl(), Duration::from_secs(90));
        assert_eq!(
            config.rate_limit_failure_policy(),
            RateLimitFailurePolicy::FailOpen
        );
    }

    #[test]
    fn builders_override_fields() {
        let config = EngineConfig::new()
            .with_issuer("example")
            .with_rate_limit(3, Duration::from_secs(60))
            .with_rate_limit_failure_policy(RateLimitFailurePolicy::FailClosed);
        assert_eq!(config.issuer(), "example");
        assert_eq!(config.rate_limit_max(), 3);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
        assert_eq!(
            config.rate_limit_failure_policy(),
            RateLimitFailurePolicy::FailClosed
        );
    }

    #[test]
    fn from_env_reads_issuer_and_policy() {
        temp_env::with_vars(
            [
                (ENV_ISSUER, Some("acme")),
                (ENV_RATE_LIMIT_FAIL_CLOSED, Some("true")),
            ],
            || {
                let config = EngineConfig::from_env();
                assert_eq!(config.issuer(), "acme");
                assert_eq!(
                    config.rate_limit_failure_policy(),
                    RateLimitFailurePolicy::FailClosed
                );
            },
        );
    }

    #[test]
    fn from_env_ignores_blank_and_garbage_values() {
        temp_env::with_vars(
            [
                (ENV_ISSUER, Some("  ")),
                (ENV_RATE_LIMIT_FAIL_CLOSED, Some("maybe")),
            ],
            || {
                let config = EngineConfig::from_env();
                assert_eq!(config.issuer(), DEFAULT_ISSUER);
                assert_eq!(
                    config.rate_limit_failure_policy(),
                    RateLimitFailurePolicy::FailOpen
                );
            },
        );
    }
}

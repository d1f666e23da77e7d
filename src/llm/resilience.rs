//! Resilience wrapper with circuit breaking and bounded retry.

use super::TextGenerator;
use crate::config::ModelConfig;
use crate::{Error, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Resilience configuration for generation calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResilienceConfig {
    /// Maximum number of retries for timed-out calls.
    pub max_retries: u32,
    /// Backoff between retries in milliseconds.
    pub retry_backoff_ms: u64,
    /// Consecutive failures before opening the circuit.
    pub breaker_failure_threshold: u32,
    /// How long to keep the circuit open before half-open.
    pub breaker_reset_timeout_ms: u64,
    /// Maximum trial calls while half-open.
    pub breaker_half_open_max_calls: u32,
}

impl Default for LlmResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_backoff_ms: 250,
            breaker_failure_threshold: 3,
            breaker_reset_timeout_ms: 30_000,
            breaker_half_open_max_calls: 1,
        }
    }
}

impl LlmResilienceConfig {
    /// Loads resilience configuration from the model settings.
    #[must_use]
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            breaker_failure_threshold: config.breaker_failure_threshold.max(1),
            breaker_reset_timeout_ms: config.breaker_reset_ms,
            breaker_half_open_max_calls: 1,
        }
    }
}

/// Circuit breaker state machine.
#[derive(Debug)]
enum BreakerState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { attempts: u32 },
}

#[derive(Debug)]
struct CircuitBreaker {
    state: BreakerState,
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_max_calls: u32,
}

impl CircuitBreaker {
    fn new(config: &LlmResilienceConfig) -> Self {
        Self {
            state: BreakerState::Closed { failures: 0 },
            failure_threshold: config.breaker_failure_threshold.max(1),
            reset_timeout: Duration::from_millis(config.breaker_reset_timeout_ms),
            half_open_max_calls: config.breaker_half_open_max_calls.max(1),
        }
    }

    fn allow(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { opened_at } => {
                if opened_at.elapsed() >= self.reset_timeout {
                    self.state = BreakerState::HalfOpen { attempts: 1 };
                    true
                } else {
                    false
                }
            },
            BreakerState::HalfOpen { ref mut attempts } => {
                if *attempts >= self.half_open_max_calls {
                    false
                } else {
                    *attempts += 1;
                    true
                }
            },
        }
    }

    const fn on_success(&mut self) {
        self.state = BreakerState::Closed { failures: 0 };
    }

    fn on_failure(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { ref mut failures } => {
                *failures += 1;
                if *failures >= self.failure_threshold {
                    self.state = BreakerState::Open {
                        opened_at: Instant::now(),
                    };
                    return true;
                }
            },
            BreakerState::HalfOpen { .. } => {
                self.state = BreakerState::Open {
                    opened_at: Instant::now(),
                };
                return true;
            },
            BreakerState::Open { .. } => {},
        }
        false
    }

    const fn state_value(&self) -> u8 {
        match self.state {
            BreakerState::Closed { .. } => 0,
            BreakerState::Open { .. } => 1,
            BreakerState::HalfOpen { .. } => 2,
        }
    }
}

/// Generator wrapper with a circuit breaker and retry on timeout.
///
/// Once the inference service fails `breaker_failure_threshold` times in a
/// row, calls fail fast with [`Error::ServiceUnavailable`] until the reset
/// timeout elapses, so a dead local service does not stall the rest of a
/// batch. Malformed responses do not count against the breaker.
pub struct ResilientGenerator<G: TextGenerator> {
    inner: G,
    config: LlmResilienceConfig,
    breaker: Mutex<CircuitBreaker>,
}

impl<G: TextGenerator> ResilientGenerator<G> {
    /// Creates a new resilient wrapper.
    #[must_use]
    pub fn new(inner: G, config: LlmResilienceConfig) -> Self {
        let breaker = CircuitBreaker::new(&config);
        Self {
            inner,
            config,
            breaker: Mutex::new(breaker),
        }
    }

    fn breaker(&self) -> std::sync::MutexGuard<'_, CircuitBreaker> {
        self.breaker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record_request(provider: &'static str, status: &'static str, elapsed: Duration) {
        metrics::counter!(
            "llm_requests_total",
            "provider" => provider,
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "llm_request_duration_ms",
            "provider" => provider,
            "status" => status
        )
        .record(elapsed.as_secs_f64() * 1000.0);
    }

    fn record_breaker_state(provider: &'static str, state: u8) {
        metrics::gauge!("llm_circuit_breaker_state", "provider" => provider).set(f64::from(state));
    }
}

const fn counts_against_breaker(err: &Error) -> bool {
    matches!(err, Error::ServiceUnavailable { .. } | Error::Timeout { .. })
}

impl<G: TextGenerator> TextGenerator for ResilientGenerator<G> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn generate(&self, prompt: &str, model: &str, timeout: Duration) -> Result<String> {
        let provider = self.inner.name();
        let span = tracing::info_span!(
            "llm.request",
            provider = provider,
            model = %model,
            status = tracing::field::Empty
        );
        let _enter = span.enter();

        if !self.breaker().allow() {
            span.record("status", "circuit_open");
            Self::record_request(provider, "circuit_open", Duration::ZERO);
            metrics::counter!("llm_circuit_breaker_rejections_total", "provider" => provider)
                .increment(1);
            return Err(Error::ServiceUnavailable {
                service: provider.to_string(),
                cause: "circuit breaker open after repeated failures".to_string(),
            });
        }

        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let started = Instant::now();
            let result = self.inner.generate(prompt, model, timeout);
            let elapsed = started.elapsed();

            let err = match result {
                Ok(text) => {
                    let mut breaker = self.breaker();
                    breaker.on_success();
                    let state = breaker.state_value();
                    drop(breaker);
                    Self::record_breaker_state(provider, state);
                    Self::record_request(provider, "success", elapsed);
                    span.record("status", "success");
                    return Ok(text);
                },
                Err(err) => err,
            };

            let is_timeout = matches!(err, Error::Timeout { .. });
            Self::record_request(provider, if is_timeout { "timeout" } else { "error" }, elapsed);

            if counts_against_breaker(&err) {
                let mut breaker = self.breaker();
                let tripped = breaker.on_failure();
                let state = breaker.state_value();
                drop(breaker);
                Self::record_breaker_state(provider, state);
                if tripped {
                    metrics::counter!("llm_circuit_breaker_trips_total", "provider" => provider)
                        .increment(1);
                    tracing::warn!("LLM circuit breaker opened for provider={provider}");
                    span.record("status", "error");
                    return Err(err);
                }
            }

            if is_timeout && attempt < max_attempts {
                metrics::counter!("llm_retries_total", "provider" => provider).increment(1);
                tracing::warn!(
                    "Retrying LLM call provider={provider} attempt={attempt} elapsed_ms={}",
                    elapsed.as_millis()
                );
                if self.config.retry_backoff_ms > 0 {
                    std::thread::sleep(Duration::from_millis(self.config.retry_backoff_ms));
                }
                continue;
            }

            span.record("status", if is_timeout { "timeout" } else { "error" });
            return Err(err);
        }
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Scripted {
        calls: AtomicU32,
        fail_first: u32,
        error: fn() -> Error,
    }

    impl TextGenerator for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn generate(&self, _prompt: &str, _model: &str, _timeout: Duration) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err((self.error)())
            } else {
                Ok("ok".to_string())
            }
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn timeout_error() -> Error {
        Error::Timeout {
            operation: "generate".to_string(),
            timeout_ms: 10,
        }
    }

    fn refused_error() -> Error {
        Error::ServiceUnavailable {
            service: "scripted".to_string(),
            cause: "connection refused".to_string(),
        }
    }

    fn config(max_retries: u32, threshold: u32) -> LlmResilienceConfig {
        LlmResilienceConfig {
            max_retries,
            retry_backoff_ms: 0,
            breaker_failure_threshold: threshold,
            breaker_reset_timeout_ms: 60_000,
            breaker_half_open_max_calls: 1,
        }
    }

    #[test]
    fn test_retries_timeout_then_succeeds() {
        let inner = Scripted {
            calls: AtomicU32::new(0),
            fail_first: 1,
            error: timeout_error,
        };
        let generator = ResilientGenerator::new(inner, config(1, 5));
        let text = generator.generate("p", "m", Duration::from_millis(10)).unwrap();
        assert_eq!(text, "ok");
    }

    #[test]
    fn test_connect_errors_are_not_retried() {
        let inner = Scripted {
            calls: AtomicU32::new(0),
            fail_first: 1,
            error: refused_error,
        };
        let generator = ResilientGenerator::new(inner, config(3, 5));
        let err = generator.generate("p", "m", Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable { .. }));
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_breaker_opens_and_fails_fast() {
        let inner = Scripted {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
            error: refused_error,
        };
        let generator = ResilientGenerator::new(inner, config(0, 2));
        for _ in 0..2 {
            assert!(generator.generate("p", "m", Duration::from_millis(10)).is_err());
        }
        let err = generator.generate("p", "m", Duration::from_millis(10)).unwrap_err();
        assert!(err.to_string().contains("circuit breaker open"));
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_malformed_does_not_trip_breaker() {
        let inner = Scripted {
            calls: AtomicU32::new(0),
            fail_first: 3,
            error: || Error::MalformedResponse {
                cause: "bad".to_string(),
            },
        };
        let generator = ResilientGenerator::new(inner, config(0, 1));
        for _ in 0..3 {
            assert!(generator.generate("p", "m", Duration::from_millis(10)).is_err());
        }
        assert!(generator.generate("p", "m", Duration::from_millis(10)).is_ok());
    }
}

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Breaker position for upstream provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct Breaker {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Stops hammering a provider that keeps failing.
///
/// After `failure_threshold` consecutive failures the circuit opens and
/// rejects calls until `open_timeout` elapses; the next call is a probe
/// (half-open) whose outcome closes or re-opens the circuit.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    breaker: Mutex<Breaker>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breaker: Mutex::new(Breaker {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    // Breaker state stays consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, Breaker> {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn allow_request(&self) -> bool {
        let mut breaker = self.lock();
        if breaker.state != CircuitState::Open {
            return true;
        }

        let cooled_down = breaker
            .opened_at
            .is_some_and(|opened_at| opened_at.elapsed() >= self.config.open_timeout);
        if cooled_down {
            breaker.state = CircuitState::HalfOpen;
            breaker.opened_at = None;
            info!("circuit half-open; probing provider");
        }
        cooled_down
    }

    pub fn record_success(&self) {
        let mut breaker = self.lock();
        if breaker.state != CircuitState::Closed {
            info!("circuit closed after successful call");
        }
        breaker.state = CircuitState::Closed;
        breaker.consecutive_failures = 0;
        breaker.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut breaker = self.lock();
        breaker.consecutive_failures = breaker.consecutive_failures.saturating_add(1);

        let trips = breaker.state == CircuitState::HalfOpen
            || breaker.consecutive_failures >= self.config.failure_threshold;
        if trips {
            if breaker.state != CircuitState::Open {
                warn!(
                    failures = breaker.consecutive_failures,
                    open_for_ms = self.config.open_timeout.as_millis() as u64,
                    "circuit opened"
                );
            }
            breaker.state = CircuitState::Open;
            breaker.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }
}

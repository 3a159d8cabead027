// Control plane: quote-fan-out admission control and per-venue breakers
//
// Admission control bounds how many venue quote evaluations run at once.
// Circuit breakers track a sliding failure window per source and
// short-circuit a misbehaving venue to zero quotes until a cooldown lapses.
//
// Numan Thabit 2026 Aug

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

#[derive(Clone)]
pub struct AdmissionControl {
    max_inflight: Arc<Semaphore>,
}

impl AdmissionControl {
    pub fn new(max_inflight: usize) -> Self {
        Self {
            max_inflight: Arc::new(Semaphore::new(max_inflight.max(1))),
        }
    }

    /// Acquire a quote-evaluation permit, waiting for a free slot.
    pub async fn acquire(&self) -> AdmissionPermit {
        let permit = self
            .max_inflight
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore not closed");
        AdmissionPermit { _permit: permit }
    }
}

pub struct AdmissionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[derive(Clone, Default)]
pub struct CircuitBreakers {
    inner: Arc<Mutex<HashMap<String, Breaker>>>,
}

struct Breaker {
    window: VecDeque<bool>, // true=failure, false=success
    max_window: usize,
    threshold: f32,
    min_samples: usize,
    open_until: Option<Instant>,
    open_cooldown: Duration,
}

impl Default for Breaker {
    fn default() -> Self {
        Self {
            window: VecDeque::with_capacity(32),
            max_window: 32,
            threshold: 0.5,
            min_samples: 8,
            open_until: None,
            open_cooldown: Duration::from_secs(5),
        }
    }
}

impl CircuitBreakers {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_open(&self, source: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let breaker = inner.entry(source.to_string()).or_default();
        if let Some(until) = breaker.open_until {
            if Instant::now() < until {
                return true;
            }
            // cooldown over: close and let fresh samples decide again
            breaker.open_until = None;
            breaker.window.clear();
        }
        false
    }

    pub async fn record_success(&self, source: &str) {
        self.record(source, false).await;
    }

    pub async fn record_failure(&self, source: &str) {
        self.record(source, true).await;
    }

    /// Number of currently open breakers, for the stats surface.
    pub async fn open_count(&self) -> usize {
        let inner = self.inner.lock().await;
        let now = Instant::now();
        inner
            .values()
            .filter(|b| b.open_until.is_some_and(|until| now < until))
            .count()
    }

    async fn record(&self, source: &str, failure: bool) {
        let mut inner = self.inner.lock().await;
        let breaker = inner.entry(source.to_string()).or_default();
        if breaker.window.len() == breaker.max_window {
            breaker.window.pop_front();
        }
        breaker.window.push_back(failure);

        let samples = breaker.window.len();
        if samples >= breaker.min_samples {
            let failures = breaker.window.iter().filter(|f| **f).count();
            let rate = failures as f32 / samples as f32;
            if rate >= breaker.threshold && breaker.open_until.is_none() {
                breaker.open_until = Some(Instant::now() + breaker.open_cooldown);
                debug!(source = %source, rate = rate, samples = samples, "venue breaker opened");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn breaker_opens_after_repeated_failures() {
        let breakers = CircuitBreakers::new();
        assert!(!breakers.is_open("venue-a").await);
        for _ in 0..8 {
            breakers.record_failure("venue-a").await;
        }
        assert!(breakers.is_open("venue-a").await);
        assert_eq!(breakers.open_count().await, 1);
        // an unrelated venue is unaffected
        assert!(!breakers.is_open("venue-b").await);
    }

    #[tokio::test]
    async fn successes_keep_the_breaker_closed() {
        let breakers = CircuitBreakers::new();
        for _ in 0..4 {
            breakers.record_failure("venue-a").await;
            breakers.record_success("venue-a").await;
            breakers.record_success("venue-a").await;
        }
        assert!(!breakers.is_open("venue-a").await);
    }

    #[tokio::test]
    async fn admission_bounds_concurrency() {
        let control = AdmissionControl::new(2);
        let first = control.acquire().await;
        let _second = control.acquire().await;
        // third would block; release one slot and it proceeds
        drop(first);
        let _third = control.acquire().await;
    }
}

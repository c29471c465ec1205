//! Admission control for outbound requests.
//!
//! Admission is decided by a GCRA limiter from `governor`, driven by the
//! tokio clock so paused-time tests and production share one time source.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::Duration;

use governor::clock::Clock;
use governor::middleware::NoOpMiddleware;
use governor::nanos::Nanos;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::Quota;
use tokio::time::Instant;

const MIN_WAIT: Duration = Duration::from_millis(100);
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// `governor` clock reading `tokio::time`, as nanoseconds since the limiter
/// was created.
#[derive(Debug, Clone)]
struct TokioClock {
    origin: Instant,
}

impl Clock for TokioClock {
    type Instant = Nanos;

    fn now(&self) -> Nanos {
        Nanos::from(self.origin.elapsed())
    }
}

type DirectLimiter =
    governor::RateLimiter<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<Nanos>>;

/// Holds up to `capacity` tokens, replenished continuously at `capacity`
/// tokens per `period`.
///
/// Refill is computed lazily on each access; there is no background timer.
/// Concurrent callers are admitted in whatever order their check succeeds.
pub struct RateLimiter {
    capacity: u32,
    period: Duration,
    per_token: Duration,
    clock: TokioClock,
    limiter: DirectLimiter,
    /// Instant at which every admitted token has been replenished. Mirrors the
    /// limiter's theoretical arrival time for `available_tokens` and
    /// `wait_time`; only updated while admitting.
    drained_until: Mutex<Instant>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("capacity", &self.capacity)
            .field("period", &self.period)
            .field("available_tokens", &self.available_tokens())
            .finish()
    }
}

impl RateLimiter {
    /// Create a full limiter. Capacity is clamped to at least 1 and the period
    /// to at least 1ms.
    pub fn new(capacity: u32, period: Duration) -> Self {
        let capacity = capacity.max(1);
        let period = period.max(MIN_PERIOD);
        let per_token = (period / capacity).max(Duration::from_nanos(1));
        let burst = NonZeroU32::new(capacity).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(per_token)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        let origin = Instant::now();
        let clock = TokioClock { origin };
        let limiter = governor::RateLimiter::direct_with_clock(quota, &clock);
        tracing::info!(
            capacity,
            period_secs = period.as_secs_f64(),
            "initialized rate limiter"
        );

        Self {
            capacity,
            period,
            per_token,
            clock,
            limiter,
            drained_until: Mutex::new(origin),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Take `n` tokens if they are available right now.
    pub fn try_acquire(&self, n: u32) -> bool {
        let Some(cells) = NonZeroU32::new(n) else {
            return true;
        };

        let mut drained_until = self.lock();
        match self.limiter.check_n(cells) {
            Ok(Ok(())) => {
                self.record(&mut drained_until, n);
                true
            }
            Ok(Err(_)) | Err(_) => false,
        }
    }

    /// Suspend until `n` tokens are available, then take them.
    ///
    /// Never times out; wrap in `tokio::time::timeout` for a deadline. A
    /// request larger than the capacity waits for a full bucket and drains it.
    /// Tokens are not refunded if the caller is cancelled after admission.
    pub async fn wait_for_acquire(&self, n: u32) {
        let n = if n > self.capacity {
            tracing::warn!(
                requested = n,
                capacity = self.capacity,
                "requested tokens exceed capacity; waiting for a full bucket"
            );
            self.capacity
        } else {
            n
        };
        let Some(cells) = NonZeroU32::new(n) else {
            return;
        };

        loop {
            let wait = {
                let mut drained_until = self.lock();
                match self.limiter.check_n(cells) {
                    Ok(Ok(())) => {
                        self.record(&mut drained_until, n);
                        return;
                    }
                    Ok(Err(not_until)) => not_until.wait_time_from(self.clock.now()),
                    Err(_) => self.period,
                }
            };

            let wait = wait.max(MIN_WAIT);
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limited, waiting for tokens");
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available, including partially replenished ones.
    pub fn available_tokens(&self) -> f64 {
        let backlog = self.backlog();
        let used = backlog.as_secs_f64() / self.per_token.as_secs_f64();
        (f64::from(self.capacity) - used).clamp(0.0, f64::from(self.capacity))
    }

    /// Estimated time until `n` tokens are available; zero when they already are.
    pub fn wait_time(&self, n: u32) -> Duration {
        let backlog = self.backlog();
        if n <= self.capacity {
            backlog.saturating_sub(self.per_token * (self.capacity - n))
        } else {
            backlog + self.per_token * (n - self.capacity)
        }
    }

    fn backlog(&self) -> Duration {
        self.lock().saturating_duration_since(Instant::now())
    }

    fn record(&self, drained_until: &mut Instant, n: u32) {
        let now = Instant::now();
        *drained_until = (*drained_until).max(now) + self.per_token * n;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Instant> {
        self.drained_until
            .lock()
            .expect("rate limiter lock is not poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn starts_full_and_never_exceeds_capacity() {
        let limiter = RateLimiter::new(3, Duration::from_secs(3));

        assert_eq!(limiter.available_tokens(), 3.0);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.available_tokens(), 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_time_is_proportional_to_missing_tokens() {
        let limiter = RateLimiter::new(10, Duration::from_secs(10));

        assert_eq!(limiter.wait_time(1), Duration::ZERO);
        assert!(limiter.try_acquire(10));
        assert_eq!(limiter.wait_time(2), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn multi_token_acquire_is_all_or_nothing() {
        let limiter = RateLimiter::new(4, Duration::from_secs(4));

        assert!(limiter.try_acquire(3));
        assert!(!limiter.try_acquire(2));
        assert_eq!(limiter.available_tokens(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_above_capacity_are_refused_without_consuming() {
        let limiter = RateLimiter::new(2, Duration::from_secs(2));

        assert!(!limiter.try_acquire(3));
        assert_eq!(limiter.available_tokens(), 2.0);
        assert!(limiter.try_acquire(0));
    }

    #[tokio::test(start_paused = true)]
    async fn clock_follows_tokio_time() {
        let clock = TokioClock {
            origin: Instant::now(),
        };

        tokio::time::advance(Duration::from_millis(1500)).await;

        assert_eq!(clock.now(), Nanos::from(Duration::from_millis(1500)));
    }

    #[test]
    fn zero_configuration_is_clamped() {
        let limiter = RateLimiter::new(0, Duration::ZERO);

        assert_eq!(limiter.capacity(), 1);
        assert_eq!(limiter.period(), Duration::from_millis(1));
    }
}

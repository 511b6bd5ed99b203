use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::Cancelled;

/// Result of a single [`Limiter::await_tokens`] call, describing how long the
/// limiter slept to admit the request.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[must_use]
pub struct LimiterSleep {
    requested: Duration,
}

impl LimiterSleep {
    const fn new(requested: Duration) -> Self {
        Self { requested }
    }

    /// Duration the limiter slept for. Zero for an unlimited-rate or
    /// already-available request.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.requested
    }

    /// Reports whether the limiter skipped sleeping altogether.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.requested.is_zero()
    }
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiter whose rate is re-read from a callback on every
/// request.
///
/// Maximum burst equals one second's worth of tokens at the current rate.
/// A rate of `0` bytes/second disables pacing entirely (the fast path
/// documented on the crate).
pub struct Limiter {
    rate_fn: Box<dyn Fn() -> u64 + Send + Sync>,
    bucket: Mutex<Bucket>,
}

impl Limiter {
    /// Creates a limiter whose bytes/second rate is produced by `rate_fn`,
    /// called fresh on every [`await_tokens`](Self::await_tokens) request.
    pub fn new<F>(rate_fn: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        Self {
            rate_fn: Box::new(rate_fn),
            bucket: Mutex::new(Bucket {
                tokens: 0.0,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill_and_take(&self, amount: u64) -> Option<Duration> {
        let rate = (self.rate_fn)();
        if rate == 0 {
            return None;
        }
        let rate = rate as f64;
        let max_burst = rate;

        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * rate).min(max_burst);

        let amount = amount as f64;
        if bucket.tokens >= amount {
            bucket.tokens -= amount;
            return None;
        }

        let shortfall = amount - bucket.tokens;
        bucket.tokens = 0.0;
        Some(Duration::from_secs_f64(shortfall / rate))
    }

    /// Blocks the calling thread until `n` bytes' worth of tokens are
    /// available, refilling by elapsed time times the current rate first.
    ///
    /// Used by the synchronous, sub-1-MiB smart-sync hashing path (see
    /// the hasher's design notes) where spawning a blocking task would be
    /// disproportionate overhead.
    pub fn await_tokens(&self, n: u64) -> LimiterSleep {
        match self.refill_and_take(n) {
            None => LimiterSleep::new(Duration::ZERO),
            Some(sleep) => {
                std::thread::sleep(sleep);
                LimiterSleep::new(sleep)
            }
        }
    }

    /// Async counterpart to [`await_tokens`](Self::await_tokens), used by the
    /// sender/receiver tokio tasks. The returned future is cancel-safe:
    /// dropping it before it resolves leaves the bucket exactly as if the
    /// request had never been made except for the tokens already deducted
    /// during refill accounting.
    #[cfg(feature = "async")]
    pub async fn await_tokens_async(&self, n: u64) -> Result<LimiterSleep, Cancelled> {
        match self.refill_and_take(n) {
            None => Ok(LimiterSleep::new(Duration::ZERO)),
            Some(sleep) => {
                tokio::time::sleep(sleep).await;
                Ok(LimiterSleep::new(sleep))
            }
        }
    }
}

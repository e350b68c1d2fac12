//! Token-bucket rate limiting for upstream API calls.
//!
//! One limiter per endpoint class (trades, activity, markets). The bucket
//! refills continuously at the configured rate and is capped at one second
//! of burst. Refill is driven by `tokio::time::Instant`, so wall-clock
//! jumps never mint tokens.

use crate::{Error, Result};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

/// Token-bucket limiter shared by concurrent acquirers.
pub struct RateLimiter {
    rate: f64,
    bucket: Mutex<Bucket>,
    shutdown: watch::Receiver<bool>,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter allowing `rps` requests per second.
    pub fn new(rps: f64, shutdown: watch::Receiver<bool>) -> Self {
        let rate = if rps > 0.0 { rps } else { 1.0 };
        Self {
            rate,
            bucket: Mutex::new(Bucket {
                tokens: rate,
                last_refill: Instant::now(),
            }),
            shutdown,
        }
    }

    /// Block until a token is available or the shutdown signal fires.
    pub async fn acquire(&self) -> Result<()> {
        loop {
            if *self.shutdown.borrow() {
                return Err(Error::Cancelled);
            }
            if self.try_take().await {
                return Ok(());
            }

            let wait = Duration::from_secs_f64(1.0 / self.rate);
            let mut shutdown = self.shutdown.clone();
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => return Err(Error::Cancelled),
            }
        }
    }

    async fn try_take(&self) -> bool {
        let mut bucket = self.bucket.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.rate);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_shutdown() -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        std::mem::forget(tx);
        rx
    }

    #[tokio::test(start_paused = true)]
    async fn burst_up_to_rate_then_throttles() {
        let limiter = RateLimiter::new(2.0, no_shutdown());

        let start = Instant::now();
        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);

        // Bucket is empty; the third acquire must wait for a refill.
        limiter.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn refill_is_capped_at_capacity() {
        let limiter = RateLimiter::new(2.0, no_shutdown());

        tokio::time::advance(Duration::from_secs(60)).await;

        let start = Instant::now();
        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);

        // A long idle period must not have minted more than `rate` tokens.
        limiter.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_waiting_acquire() {
        let (tx, rx) = watch::channel(false);
        let limiter = RateLimiter::new(1.0, rx);

        limiter.acquire().await.unwrap();

        let handle = tokio::spawn(async move {
            tx.send(true).unwrap();
            tx
        });

        let err = limiter.acquire().await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        drop(handle.await.unwrap());
    }

    #[tokio::test]
    async fn acquire_after_shutdown_fails_immediately() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let limiter = RateLimiter::new(100.0, rx);

        assert!(matches!(limiter.acquire().await, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn zero_rate_falls_back_to_one_rps() {
        let limiter = RateLimiter::new(0.0, no_shutdown());
        limiter.acquire().await.unwrap();
    }
}

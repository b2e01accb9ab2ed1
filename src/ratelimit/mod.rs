//! Multi-tier leaky-bucket admission control.
//!
//! Each requester carries one bucket level per configured tier. Time refills
//! the buckets, requests drain them in proportion to their size, and a
//! request is admitted only when every tier stays above empty.

mod store;

pub use store::{BucketStore, LocalBucketStore};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::error::DisperserResult;
use crate::types::params::RateLimitParams;

/// Per-requester bucket state persisted between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateBucketParams {
    pub bucket_levels: Vec<Duration>,
    pub last_request_time: DateTime<Utc>,
}

pub struct RateLimiter {
    params: RateLimitParams,
    bucket_store: Arc<dyn BucketStore>,
}

impl RateLimiter {
    pub fn new(params: RateLimitParams, bucket_store: Arc<dyn BucketStore>) -> Self {
        Self { params, bucket_store }
    }

    /// Checks whether a request of `blob_size` bytes from `requester_id` is
    /// allowed at `rate` bytes/second. Allowlisted requesters short-circuit
    /// to allowed without touching bucket state. Bucket state is persisted
    /// when the request is allowed, or unconditionally when the table counts
    /// failed requests.
    pub async fn allow_request(&self, requester_id: &str, blob_size: u64, rate: u32) -> DisperserResult<bool> {
        if self.params.allowlist.iter().any(|id| requester_id.contains(id.as_str())) {
            return Ok(true);
        }

        let now = Utc::now();
        let mut bucket = match self.bucket_store.get_item(requester_id).await? {
            Some(bucket) => bucket,
            None => RateBucketParams {
                bucket_levels: self.params.bucket_sizes.clone(),
                last_request_time: now,
            },
        };

        let interval = (now - bucket.last_request_time).to_std().unwrap_or(Duration::ZERO);
        bucket.last_request_time = now;

        let mut allowed = true;
        for (i, size) in self.params.bucket_sizes.iter().enumerate() {
            let deduction = Duration::from_micros(
                (1e6 * blob_size as f32 / rate as f32 / self.params.multipliers[i]) as u64,
            );
            bucket.bucket_levels[i] = bucket_level(bucket.bucket_levels[i], *size, interval, deduction);
            allowed = allowed && bucket.bucket_levels[i] > Duration::ZERO;
        }

        debug!(requester_id, blob_size, rate, allowed, "rate limit decision");

        if allowed || self.params.count_failed {
            self.bucket_store.update_item(requester_id, bucket).await?;
        }

        Ok(allowed)
    }
}

/// Refills by the elapsed interval, drains by the deduction, and clamps to
/// `[0, bucket_size]`.
fn bucket_level(level: Duration, bucket_size: Duration, interval: Duration, deduction: Duration) -> Duration {
    let new_level = level.as_nanos() as i128 + interval.as_nanos() as i128 - deduction.as_nanos() as i128;
    let clamped = new_level.clamp(0, bucket_size.as_nanos() as i128);
    Duration::from_nanos(clamped as u64)
}

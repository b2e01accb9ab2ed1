use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::error::DisperserResult;
use crate::ratelimit::RateBucketParams;

/// Trait defining the per-requester bucket state store. The read-modify-write
/// cycle is not transactional; an occasional double-drain under concurrent
/// requests from one requester is tolerated.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BucketStore: Send + Sync {
    async fn get_item(&self, requester_id: &str) -> DisperserResult<Option<RateBucketParams>>;

    async fn update_item(&self, requester_id: &str, bucket: RateBucketParams) -> DisperserResult<()>;
}

/// In-process bucket store bounded to `capacity` requesters. When full, the
/// requester with the oldest last-request time is evicted; an evicted
/// requester simply starts over with full buckets.
pub struct LocalBucketStore {
    capacity: usize,
    buckets: Mutex<HashMap<String, RateBucketParams>>,
}

impl LocalBucketStore {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), buckets: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl BucketStore for LocalBucketStore {
    async fn get_item(&self, requester_id: &str) -> DisperserResult<Option<RateBucketParams>> {
        let buckets = self.buckets.lock().expect("bucket store lock poisoned");
        Ok(buckets.get(requester_id).cloned())
    }

    async fn update_item(&self, requester_id: &str, bucket: RateBucketParams) -> DisperserResult<()> {
        let mut buckets = self.buckets.lock().expect("bucket store lock poisoned");
        if !buckets.contains_key(requester_id) && buckets.len() >= self.capacity {
            let evict = buckets
                .iter()
                .min_by_key(|(_, b)| b.last_request_time)
                .map(|(id, _)| id.clone());
            if let Some(id) = evict {
                buckets.remove(&id);
            }
        }
        buckets.insert(requester_id.to_string(), bucket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn bucket(ts: i64) -> RateBucketParams {
        RateBucketParams {
            bucket_levels: vec![Duration::from_secs(1)],
            last_request_time: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn full_store_evicts_the_stalest_requester() {
        let store = LocalBucketStore::new(2);
        store.update_item("old", bucket(100)).await.unwrap();
        store.update_item("new", bucket(200)).await.unwrap();
        store.update_item("extra", bucket(300)).await.unwrap();

        assert!(store.get_item("old").await.unwrap().is_none());
        assert!(store.get_item("new").await.unwrap().is_some());
        assert!(store.get_item("extra").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn updating_an_existing_requester_never_evicts() {
        let store = LocalBucketStore::new(2);
        store.update_item("a", bucket(100)).await.unwrap();
        store.update_item("b", bucket(200)).await.unwrap();
        store.update_item("a", bucket(300)).await.unwrap();

        assert!(store.get_item("a").await.unwrap().is_some());
        assert!(store.get_item("b").await.unwrap().is_some());
    }
}

//! Integration tests for cached paginated listings
//!
//! A scripted page source stands in for a provider API so that page
//! requests can be counted and failures injected.

use anyhow::{bail, Result};
use cloudenum::cache::{Cache, CacheKey};
use cloudenum::remote::{cached_pages, Page};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves `sizes.len()` pages of consecutive integers
struct PageSource {
    sizes: Vec<usize>,
    requests: Mutex<Vec<Option<String>>>,
    fail_page: Mutex<Option<usize>>,
    slow: AtomicBool,
}

impl PageSource {
    fn new(sizes: &[usize]) -> Arc<Self> {
        Arc::new(Self {
            sizes: sizes.to_vec(),
            requests: Mutex::new(Vec::new()),
            fail_page: Mutex::new(None),
            slow: AtomicBool::new(false),
        })
    }

    fn fail_on(&self, page: Option<usize>) {
        *self.fail_page.lock().unwrap() = page;
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    async fn page(&self, token: Option<String>) -> Result<Page<usize>> {
        self.requests.lock().unwrap().push(token.clone());
        if self.slow.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let index: usize = match token {
            Some(token) => token.parse()?,
            None => 0,
        };
        if *self.fail_page.lock().unwrap() == Some(index) {
            bail!("API request failed: 503 Service Unavailable");
        }

        let start: usize = self.sizes[..index].iter().sum();
        let items = (start..start + self.sizes[index]).collect();
        let next = (index + 1 < self.sizes.len()).then(|| (index + 1).to_string());
        Ok(Page::new(items, next))
    }
}

fn key() -> CacheKey<Vec<usize>> {
    CacheKey::new("ListAllInstances")
}

/// Test module for page aggregation
mod aggregation_tests {
    use super::*;

    /// Pages of 2, 2 and 1 items aggregate into one cached listing of 5
    #[tokio::test]
    async fn test_pages_aggregate_in_order() {
        let cache = Cache::new(10);
        let source = PageSource::new(&[2, 2, 1]);

        let items = cached_pages(&cache, &key(), |token| source.page(token))
            .await
            .unwrap();

        assert_eq!(items, vec![0, 1, 2, 3, 4]);
        assert_eq!(
            *source.requests.lock().unwrap(),
            vec![None, Some("1".to_string()), Some("2".to_string())]
        );
        assert_eq!(cache.get(&key()), Some(vec![0, 1, 2, 3, 4]));
    }

    /// A second call is served from the cache without any page request
    #[tokio::test]
    async fn test_second_call_is_cached() {
        let cache = Cache::new(10);
        let source = PageSource::new(&[2, 2, 1]);

        cached_pages(&cache, &key(), |token| source.page(token))
            .await
            .unwrap();
        let again = cached_pages(&cache, &key(), |token| source.page(token))
            .await
            .unwrap();

        assert_eq!(again.len(), 5);
        assert_eq!(source.request_count(), 3);
    }

    /// An empty listing is cached like any other value
    #[tokio::test]
    async fn test_empty_listing_is_cached() {
        let cache = Cache::new(10);
        let source = PageSource::new(&[0]);

        for _ in 0..2 {
            let items = cached_pages(&cache, &key(), |token| source.page(token))
                .await
                .unwrap();
            assert!(items.is_empty());
        }

        assert_eq!(source.request_count(), 1);
        assert_eq!(cache.get(&key()), Some(vec![]));
    }

    /// Concurrent callers share a single walk through the pages
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_listings_walk_pages_once() {
        let cache = Arc::new(Cache::new(10));
        let source = PageSource::new(&[2, 2, 1]);
        source.slow.store(true, Ordering::SeqCst);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let source = source.clone();
                tokio::spawn(async move {
                    cached_pages(&cache, &key(), |token| source.page(token)).await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().len(), 5);
        }
        assert_eq!(source.request_count(), 3);
    }
}

/// Test module for failures
mod failure_tests {
    use super::*;

    /// A failure on page 2 caches nothing, the next call starts over
    #[tokio::test]
    async fn test_failed_page_restarts_from_first_page() {
        let cache = Cache::new(10);
        let source = PageSource::new(&[2, 2, 1]);
        source.fail_on(Some(1));

        let err = cached_pages(&cache, &key(), |token| source.page(token))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
        assert_eq!(source.request_count(), 2);
        assert_eq!(cache.get(&key()), None);

        source.fail_on(None);
        let items = cached_pages(&cache, &key(), |token| source.page(token))
            .await
            .unwrap();

        assert_eq!(items.len(), 5);
        assert_eq!(source.request_count(), 5);
        assert_eq!(source.requests.lock().unwrap()[2], None);
    }
}

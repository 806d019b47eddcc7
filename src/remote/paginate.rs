//! Cached listings
//!
//! Every repository listing goes through [`cached_pages`]: the whole
//! aggregate of a paginated call is the unit of caching, never a page.

use crate::cache::{Cache, CacheKey, Lookup};
use std::future::Future;

/// One page of a provider listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }

    /// A page with no successor
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Fetch every page of a listing once per session.
///
/// `fetch_page` receives `None` for the first page and the previous page's
/// token afterwards; a missing or empty token ends the listing. Concurrent
/// callers with the same key wait for the first one and share its result.
/// A page error is returned as is and nothing is cached, so the next call
/// starts again from the first page.
pub async fn cached_pages<T, E, F, Fut>(
    cache: &Cache,
    key: &CacheKey<Vec<T>>,
    mut fetch_page: F,
) -> Result<Vec<T>, E>
where
    T: Clone + Send + Sync + 'static,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let guard = match cache.get_and_lock(key).await {
        Lookup::Hit(items) => return Ok(items),
        Lookup::Miss(guard) => guard,
    };

    let mut items = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(page_token.take()).await?;
        pages += 1;
        items.extend(page.items);

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    tracing::debug!("{}: {} items in {} pages", guard.key(), items.len(), pages);
    guard.put(items.clone());
    Ok(items)
}

/// Single-request variant of [`cached_pages`] with the same locking rules
pub async fn cached_value<T, E, F, Fut>(cache: &Cache, key: &CacheKey<T>, fetch: F) -> Result<T, E>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let guard = match cache.get_and_lock(key).await {
        Lookup::Hit(value) => return Ok(value),
        Lookup::Miss(guard) => guard,
    };

    let value = fetch().await?;
    guard.put(value.clone());
    Ok(value)
}

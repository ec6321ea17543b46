//! Cached catalog provider implementation
//!
//! This module provides a caching wrapper for catalog providers that keeps
//! listing pages in memory for the session and on disk across runs.

use super::{CatalogError, CatalogPage, CatalogProvider, CatalogQuery, Category, Language};
use crate::cache::{CacheError, CacheStorage, SessionCache};

/// A caching wrapper for catalog providers
///
/// Lookups consult the session cache first, then the persistent cache, and
/// only then the wrapped provider. Cache failures are logged and never fail
/// a lookup.
pub struct CachedCatalogProvider<P>
where
    P: CatalogProvider,
{
    /// The underlying catalog provider
    provider: P,
    /// Persistent storage for listing pages, if enabled
    disk: Option<CacheStorage<CatalogPage>>,
    /// Pages seen during this session
    session: SessionCache<CatalogPage>,
}

impl<P> CachedCatalogProvider<P>
where
    P: CatalogProvider,
{
    /// Creates a new cached catalog provider wrapping the given provider
    ///
    /// # Arguments
    ///
    /// * `provider` - The catalog provider to wrap
    /// * `disk` - Persistent storage, or `None` to cache in memory only
    /// * `session_ttl` - How long pages stay valid in memory
    pub(crate) fn new(
        provider: P,
        disk: Option<CacheStorage<CatalogPage>>,
        session_ttl: std::time::Duration,
    ) -> Self {
        Self {
            provider,
            disk,
            session: SessionCache::new(session_ttl),
        }
    }

    /// Generates a cache key for a listing query
    ///
    /// Every query parameter takes part so different listings are cached
    /// separately.
    fn cache_key(query: &CatalogQuery) -> String {
        format!(
            "{}p{}_l{}",
            Self::listing_prefix(query.language, query.category),
            query.page,
            query.limit
        )
    }

    /// Key prefix shared by every page of one listing.
    fn listing_prefix(language: Language, category: Option<Category>) -> String {
        format!(
            "listing_{}_{}_",
            language.code(),
            category.map(|c| c.code()).unwrap_or("all")
        )
    }

    /// Drops the cached copy of a listing page so the next lookup refetches it.
    pub fn invalidate(&self, query: &CatalogQuery) {
        let cache_key = Self::cache_key(query);
        self.session.invalidate(&cache_key);
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.remove(&cache_key) {
                tracing::warn!(error = %e, "failed to remove cached listing");
            }
        }
    }

    /// Drops every cached page of a listing, whatever its page number or size.
    pub fn invalidate_listing(&self, language: Language, category: Option<Category>) {
        let prefix = Self::listing_prefix(language, category);
        self.session.invalidate_prefix(&prefix);
        if let Some(disk) = &self.disk {
            match disk.remove_prefix(&prefix) {
                Ok(removed) => tracing::debug!(%prefix, removed, "dropped cached listing pages"),
                Err(e) => tracing::warn!(error = %e, "failed to remove cached listing pages"),
            }
        }
    }

    /// Forgets every cached listing page, returning the number of files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        tracing::debug!(pages = self.session.len(), "clearing listing session cache");
        self.session.clear();
        match &self.disk {
            Some(disk) => disk.clear(),
            None => Ok(0),
        }
    }

    /// Bytes used by persisted listing pages.
    pub fn disk_usage(&self) -> u64 {
        self.disk.as_ref().map(|disk| disk.size_on_disk()).unwrap_or(0)
    }
}

impl<P> CatalogProvider for CachedCatalogProvider<P>
where
    P: CatalogProvider,
{
    fn fetch_page(&self, query: &CatalogQuery) -> Result<CatalogPage, CatalogError> {
        let cache_key = Self::cache_key(query);

        if let Some(page) = self.session.get(&cache_key) {
            tracing::debug!(key = %cache_key, "listing served from session cache");
            return Ok(page);
        }

        if let Some(disk) = &self.disk {
            match disk.load(&cache_key) {
                Ok(Some(page)) => {
                    tracing::debug!(key = %cache_key, "listing served from disk cache");
                    self.session.insert(&cache_key, page.clone());
                    return Ok(page);
                }
                Ok(None) => {}
                Err(e) => {
                    // Fall through to the provider
                    tracing::warn!(error = %e, "ignoring unreadable cached listing");
                }
            }
        }

        let page = self.provider.fetch_page(query)?;

        self.session.insert(&cache_key, page.clone());
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.store(&cache_key, &page) {
                tracing::warn!(error = %e, "failed to cache listing");
            }
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::video;
    use crate::catalog::{Category, Language};
    use std::cell::Cell;
    use std::time::Duration;

    struct CountingProvider {
        calls: Cell<usize>,
    }

    impl CatalogProvider for CountingProvider {
        fn fetch_page(&self, query: &CatalogQuery) -> Result<CatalogPage, CatalogError> {
            self.calls.set(self.calls.get() + 1);
            Ok(CatalogPage {
                videos: vec![video("074526-000-A")],
                page: query.page,
                next_page: None,
            })
        }
    }

    fn counting() -> CountingProvider {
        CountingProvider {
            calls: Cell::new(0),
        }
    }

    #[test]
    fn test_cache_key_distinguishes_queries() {
        let base = CatalogQuery::new(Language::French, 50);
        let keys = [
            CachedCatalogProvider::<CountingProvider>::cache_key(&base),
            CachedCatalogProvider::<CountingProvider>::cache_key(&base.clone().with_page(2)),
            CachedCatalogProvider::<CountingProvider>::cache_key(
                &base.clone().with_category(Some(Category::Cinema)),
            ),
            CachedCatalogProvider::<CountingProvider>::cache_key(&CatalogQuery::new(
                Language::German,
                50,
            )),
        ];
        assert_eq!(keys[0], "listing_fr_all_p1_l50");
        assert_eq!(keys[2], "listing_fr_CIN_p1_l50");
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn test_session_cache_avoids_refetch() {
        let cached = CachedCatalogProvider::new(counting(), None, Duration::from_secs(60));
        let query = CatalogQuery::new(Language::French, 50);

        cached.fetch_page(&query).unwrap();
        cached.fetch_page(&query).unwrap();
        assert_eq!(cached.provider.calls.get(), 1);

        cached.invalidate(&query);
        cached.fetch_page(&query).unwrap();
        assert_eq!(cached.provider.calls.get(), 2);
    }

    #[test]
    fn test_invalidate_listing_drops_every_page() {
        let root = tempfile::tempdir().unwrap();
        let cached = CachedCatalogProvider::new(
            counting(),
            Some(CacheStorage::open_in(root.path(), "listings", None).unwrap()),
            Duration::from_secs(60),
        );
        let far_page = CatalogQuery::new(Language::French, 50).with_page(12);
        let cinema = CatalogQuery::new(Language::French, 50).with_category(Some(Category::Cinema));

        cached.fetch_page(&far_page).unwrap();
        cached.fetch_page(&cinema).unwrap();
        assert_eq!(cached.provider.calls.get(), 2);

        cached.invalidate_listing(Language::French, None);
        cached.fetch_page(&far_page).unwrap();
        cached.fetch_page(&cinema).unwrap();
        assert_eq!(cached.provider.calls.get(), 3);
    }

    #[test]
    fn test_corrupt_disk_entry_falls_through_to_provider() {
        let root = tempfile::tempdir().unwrap();
        let disk = CacheStorage::open_in(root.path(), "listings", None).unwrap();
        let query = CatalogQuery::new(Language::French, 50);
        let key = CachedCatalogProvider::<CountingProvider>::cache_key(&query);
        let entry = disk.cache_dir().join(format!("{}.json", key));
        std::fs::write(&entry, "{not json").unwrap();

        let cached = CachedCatalogProvider::new(counting(), Some(disk), Duration::from_secs(60));
        let page = cached.fetch_page(&query).unwrap();
        assert_eq!(page.videos.len(), 1);
        assert_eq!(cached.provider.calls.get(), 1);

        // The broken entry was replaced by a readable one
        let reread = CacheStorage::<CatalogPage>::open_in(root.path(), "listings", None).unwrap();
        assert_eq!(reread.load(&key).unwrap(), Some(page));
    }

    #[test]
    fn test_clear_and_disk_usage() {
        let root = tempfile::tempdir().unwrap();
        let cached = CachedCatalogProvider::new(
            counting(),
            Some(CacheStorage::open_in(root.path(), "listings", None).unwrap()),
            Duration::from_secs(60),
        );
        let query = CatalogQuery::new(Language::German, 20);

        cached.fetch_page(&query).unwrap();
        assert!(cached.disk_usage() > 0);

        assert_eq!(cached.clear().unwrap(), 1);
        assert_eq!(cached.disk_usage(), 0);
        cached.fetch_page(&query).unwrap();
        assert_eq!(cached.provider.calls.get(), 2);
    }

    #[test]
    fn test_disk_cache_survives_sessions() {
        let root = tempfile::tempdir().unwrap();
        let query = CatalogQuery::new(Language::German, 20);

        let first = CachedCatalogProvider::new(
            counting(),
            Some(CacheStorage::open_in(root.path(), "listings", None).unwrap()),
            Duration::from_secs(60),
        );
        let page = first.fetch_page(&query).unwrap();
        assert_eq!(first.provider.calls.get(), 1);

        let second = CachedCatalogProvider::new(
            counting(),
            Some(CacheStorage::open_in(root.path(), "listings", None).unwrap()),
            Duration::from_secs(60),
        );
        assert_eq!(second.fetch_page(&query).unwrap(), page);
        assert_eq!(second.provider.calls.get(), 0);
    }
}

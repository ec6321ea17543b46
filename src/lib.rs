//! Arte+7 - Browse the catalog of the Franco-German TV channel Arte
//!
//! This library provides the core of a media-source plugin for Arte+7: it
//! fetches the broadcaster's catalog listings, parses the videos they
//! contain, resolves each video to playable stream URLs and caches results
//! so repeated lookups stay off the network.
//!
//! A plugin host registers the source described by [`PLUGIN_INFO`] and calls
//! [`init`] to obtain an [`ArteSource`].

mod cache;
mod catalog;
mod config;
mod fetcher;
mod geo;
mod logging;
mod retry;
mod stream;
mod temp;
mod thumbnails;

use cache::CacheStorage;
use catalog::{ArteCatalog, CachedCatalogProvider, CatalogProvider, collect_all};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stream::{ArtePlayerResolver, CachedStreamResolver};
use thiserror::Error;

// Re-export error types
pub use cache::CacheError;
pub use catalog::CatalogError;
pub use config::ConfigError;
pub use fetcher::FetchError;
pub use stream::ResolveError;
pub use thumbnails::ThumbnailError;

// Re-export the data model and building blocks
pub use cache::{cache_root, clear_dir, size_on_disk};
pub use catalog::{CatalogPage, CatalogQuery, Category, Language, Video, program_id_from_url};
pub use config::{ResolverConfig, RetryConfig, config_path, load_or_init, load_or_init_at};
pub use fetcher::{HttpFetcher, ReqwestFetcher, RetryingFetcher, SharedFetcher};
pub use geo::GeoZone;
pub use logging::init_logging;
pub use retry::{ErrorKind, RetryDecision, RetryPolicy};
pub use stream::{
    ResolvedVideo, StreamPreferences, StreamProtocol, StreamResolver, StreamVariant,
    VideoQuality, language_rank, rank_streams, select_stream,
};
pub use thumbnails::ThumbnailCache;

/// Registration metadata handed to the plugin host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub authors: &'static str,
    pub version: &'static str,
    pub license: &'static str,
    pub site: &'static str,
}

/// The Arte+7 source as announced to plugin hosts.
pub const PLUGIN_INFO: PluginInfo = PluginInfo {
    id: "grl-arteplus7",
    name: "Arte+7",
    description: "A plugin to watch video streams from the Franco-German TV Channel Arte.",
    authors: "Simon Wenner, Nicolas Delvaux",
    version: env!("CARGO_PKG_VERSION"),
    license: "LGPL",
    site: "https://github.com/swenner/grilo-plugin-arte",
};

/// Progress event emitted while walking a paginated listing
///
/// These events allow library users to track progress and provide feedback
/// while several listing pages are fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// Started fetching a listing
    FetchingListing {
        language: Language,
        category: Option<Category>,
    },

    /// A listing page has been fetched (or served from cache)
    PageFetched { page: u32, video_count: usize },

    /// The listing is complete
    Complete { video_count: usize },
}

/// A program resolved to the stream that best fits the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStream {
    /// The program with every variant
    pub video: ResolvedVideo,
    /// The preferred variant
    pub best: StreamVariant,
    /// Every other variant, most preferred first
    pub alternatives: Vec<StreamVariant>,
}

/// Top-level error type for Arte+7 operations
#[derive(Debug, Error)]
pub enum ArteError {
    /// Error while browsing the catalog
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error while resolving streams
    #[error("Stream resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Error during cache operations
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error while loading the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error while caching thumbnails
    #[error("Thumbnail error: {0}")]
    Thumbnail(#[from] ThumbnailError),

    /// Error while setting up HTTP access
    #[error("HTTP error: {0}")]
    Fetch(#[from] FetchError),
}

/// Plugin entry point: builds the source from the host's configuration.
///
/// Requests go through a blocking HTTP client with retry/backoff. When
/// `config.disk_cache` is set, listings and thumbnails are kept in the
/// platform cache directory.
///
/// # Examples
///
/// ```no_run
/// use arteplus7::{init, ResolverConfig, Category};
///
/// let source = init(ResolverConfig::default()).unwrap();
/// let page = source.browse(Some(Category::Cinema), 1).unwrap();
/// for video in &page.videos {
///     println!("{} ({})", video.display_title(), video.program_id);
/// }
///
/// let stream = source.resolve("https://www.arte.tv/fr/videos/074526-000-A/").unwrap();
/// println!("{}", stream.best.url);
/// ```
pub fn init(config: ResolverConfig) -> Result<ArteSource, ArteError> {
    config.validate()?;

    let http = ReqwestFetcher::new(&config.user_agent, config.request_timeout())?;
    let fetcher: SharedFetcher = Arc::new(RetryingFetcher::new(http, config.retry.policy()));

    let root = if config.disk_cache {
        Some(cache_root()?)
    } else {
        None
    };

    ArteSource::with_fetcher(config, fetcher, root.as_deref())
}

/// Cache-backed lookup surface over the Arte catalog and player.
pub struct ArteSource {
    config: ResolverConfig,
    catalog: CachedCatalogProvider<ArteCatalog<SharedFetcher>>,
    resolver: CachedStreamResolver<ArtePlayerResolver<SharedFetcher>>,
    thumbnails: Option<ThumbnailCache>,
}

impl ArteSource {
    /// Builds a source on an explicit transport.
    ///
    /// `cache_root` enables the persistent listing and thumbnail caches below
    /// that directory; `None` keeps everything in memory.
    pub fn with_fetcher(
        config: ResolverConfig,
        fetcher: SharedFetcher,
        cache_root: Option<&Path>,
    ) -> Result<Self, ArteError> {
        config.validate()?;

        let (disk, thumbnails) = match cache_root {
            Some(root) => (
                Some(CacheStorage::open_in(
                    root,
                    "listings",
                    Some(config.catalog_ttl()),
                )?),
                Some(ThumbnailCache::open_in(
                    &root.join("thumbnails"),
                    fetcher.clone(),
                )?),
            ),
            None => (None, None),
        };

        let catalog = CachedCatalogProvider::new(
            ArteCatalog::new(fetcher.clone(), &config.api_base),
            disk,
            config.catalog_ttl(),
        );
        let resolver = CachedStreamResolver::new(
            ArtePlayerResolver::new(fetcher, &config.player_base),
            config.stream_ttl(),
        );

        Ok(Self {
            config,
            catalog,
            resolver,
            thumbnails,
        })
    }

    /// The configuration this source was built with.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn query(&self, category: Option<Category>) -> CatalogQuery {
        CatalogQuery::new(self.config.language, self.config.page_limit).with_category(category)
    }

    /// Whether a listed video can be watched here and now.
    fn is_viewable(&self, video: &Video, now: chrono::DateTime<Utc>) -> bool {
        let geo_ok = match &self.config.country {
            Some(country) => video.geoblocking.allows(country),
            None => true,
        };
        geo_ok && video.is_available(now)
    }

    /// Fetches a single listing page.
    ///
    /// Videos outside their catch-up window or geoblocked for the configured
    /// country are left out.
    pub fn browse(&self, category: Option<Category>, page: u32) -> Result<CatalogPage, ArteError> {
        let mut listing = self.catalog.fetch_page(&self.query(category).with_page(page))?;

        let now = Utc::now();
        listing.videos.retain(|video| self.is_viewable(video, now));
        Ok(listing)
    }

    /// Walks the whole listing (up to `max_pages` pages) and returns every viewable video.
    ///
    /// Progress events are emitted through the provided callback.
    pub fn browse_all<F>(
        &self,
        category: Option<Category>,
        mut on_event: F,
    ) -> Result<Vec<Video>, ArteError>
    where
        F: FnMut(SourceEvent),
    {
        on_event(SourceEvent::FetchingListing {
            language: self.config.language,
            category,
        });

        let now = Utc::now();
        let mut videos = collect_all(
            &self.catalog,
            &self.query(category),
            self.config.max_pages,
            now,
            |page| {
                on_event(SourceEvent::PageFetched {
                    page: page.page,
                    video_count: page.videos.len(),
                })
            },
        )?;
        videos.retain(|video| self.is_viewable(video, now));

        tracing::info!(videos = videos.len(), "listing complete");
        on_event(SourceEvent::Complete {
            video_count: videos.len(),
        });

        Ok(videos)
    }

    /// Searches the current catalog.
    ///
    /// Every whitespace-separated term must appear (case-insensitively) in
    /// the title, subtitle or description. An empty query matches nothing.
    pub fn search(&self, text: &str) -> Result<Vec<Video>, ArteError> {
        let terms: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let videos = self.browse_all(None, |_| {})?;
        Ok(videos
            .into_iter()
            .filter(|video| {
                let haystack = format!(
                    "{}\n{}\n{}",
                    video.title,
                    video.subtitle.as_deref().unwrap_or(""),
                    video.description
                )
                .to_lowercase();
                terms.iter().all(|term| haystack.contains(term.as_str()))
            })
            .collect())
    }

    /// Resolves a program id or arte.tv video URL to its best stream.
    pub fn resolve(&self, id_or_url: &str) -> Result<ResolvedStream, ArteError> {
        let program_id = program_id_from_url(id_or_url)
            .ok_or_else(|| ResolveError::InvalidProgramId(id_or_url.to_string()))?;

        let video = self.resolver.resolve(&program_id, self.config.language)?;

        let prefs = self.config.stream_preferences();
        let mut ranked = rank_streams(&video.variants, &prefs).into_iter().cloned();
        let best = ranked
            .next()
            .ok_or_else(|| ResolveError::NoStreams(program_id.clone()))?;
        let alternatives = ranked.collect();

        tracing::info!(
            program_id = %program_id,
            quality = %best.quality,
            version = %best.version_code,
            "resolved stream"
        );

        Ok(ResolvedStream {
            video,
            best,
            alternatives,
        })
    }

    /// Local path of the video's preview image, downloading it if needed.
    ///
    /// Returns `None` when the video has no image, the disk cache is
    /// disabled, or the download fails.
    pub fn thumbnail(&self, video: &Video) -> Option<PathBuf> {
        let thumbnails = self.thumbnails.as_ref()?;
        let url = video.image_url.as_deref()?;

        match thumbnails.fetch(url) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(program_id = %video.program_id, error = %e, "thumbnail unavailable");
                None
            }
        }
    }

    /// Forgets every cached page of the `category` listing so it is fetched again.
    pub fn refresh(&self, category: Option<Category>) {
        self.catalog.invalidate_listing(self.config.language, category);
    }

    /// Drops all cached listing pages, returning the number of files removed.
    pub fn clear_listings(&self) -> Result<usize, ArteError> {
        Ok(self.catalog.clear()?)
    }

    /// Bytes used by cached listing pages on disk.
    pub fn listing_cache_size(&self) -> u64 {
        self.catalog.disk_usage()
    }

    /// Removes cached thumbnails older than `max_age`.
    pub fn purge_thumbnails(&self, max_age: Duration) -> usize {
        self.thumbnails
            .as_ref()
            .map(|t| t.purge_older_than(max_age))
            .unwrap_or(0)
    }
}

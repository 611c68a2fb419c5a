//! Batched, rate-limited image resolution
//!
//! `ImageResolver` holds what every consumer shares: the backend, the
//! persisted cache and the batching configuration. Each consumer (one table,
//! one page) opens its own `ImageSession`. A session's `resolve_many` serves
//! valid cache entries immediately, then walks the remaining identifiers in
//! fixed-size batches with a fixed pause between batches.
//!
//! Every call takes a new generation number from its session. A call that a
//! newer call on the same session supersedes stops publishing and stops
//! issuing batches, and reports what it left unresolved. Sessions never
//! affect each other.

use shelfscope_core::{Clock, SystemClock};
use shelfscope_storage::KeyValueStore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;

use crate::api::ImageApi;
use crate::cache::{DEFAULT_TTL, ImageCache};

pub const DEFAULT_FALLBACK_BASE: &str = "https://images-na.ssl-images-amazon.com";

/// Best-guess image address for an identifier when the backend is unreachable.
/// Returns `None` for a blank identifier.
pub fn fallback_url(fallback_base: &str, id: &str) -> Option<String> {
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    Some(format!(
        "{}/images/P/{}.01.L.jpg",
        fallback_base.trim_end_matches('/'),
        id.to_uppercase()
    ))
}

#[derive(Debug, Clone)]
pub struct ImageResolverConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub ttl: Duration,
    pub fallback_base: String,
}

impl Default for ImageResolverConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_millis(1000),
            ttl: DEFAULT_TTL,
            fallback_base: DEFAULT_FALLBACK_BASE.to_string(),
        }
    }
}

/// Current view of a multi-identifier resolution
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageBatch {
    pub urls: HashMap<String, String>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Cache,
    Network,
    Fallback,
    /// Blank identifier or the backend has no image
    NoImage,
}

/// Result of a single-identifier resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLookup {
    pub url: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub source: ImageSource,
}

impl ImageLookup {
    fn resolved(url: String, source: ImageSource) -> Self {
        Self {
            url: Some(url),
            loading: false,
            error: None,
            source,
        }
    }

    fn no_image() -> Self {
        Self {
            url: None,
            loading: false,
            error: None,
            source: ImageSource::NoImage,
        }
    }
}

struct ResolverInner {
    api: Arc<dyn ImageApi>,
    cache: ImageCache,
    config: ImageResolverConfig,
}

/// Shared image resolution backend. Cheap to clone.
#[derive(Clone)]
pub struct ImageResolver {
    inner: Arc<ResolverInner>,
}

impl std::fmt::Debug for ImageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResolver")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ImageResolver {
    pub fn new(
        api: Arc<dyn ImageApi>,
        store: Arc<dyn KeyValueStore>,
        config: ImageResolverConfig,
    ) -> Self {
        Self::with_clock(api, store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        api: Arc<dyn ImageApi>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        mut config: ImageResolverConfig,
    ) -> Self {
        config.batch_size = config.batch_size.max(1);
        let cache = ImageCache::new(store, clock, config.ttl);
        Self {
            inner: Arc::new(ResolverInner { api, cache, config }),
        }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.inner.cache
    }

    pub fn config(&self) -> &ImageResolverConfig {
        &self.inner.config
    }

    /// Open a session for one consumer's sequence of `resolve_many` calls
    pub fn session(&self) -> ImageSession {
        let (state, _) = watch::channel(ImageBatch::default());
        ImageSession {
            inner: self.inner.clone(),
            generation: AtomicU64::new(0),
            state,
        }
    }

    /// Resolve one identifier. Never fails: network errors produce the
    /// fallback address with `error` set.
    pub async fn resolve_one(&self, id: &str) -> ImageLookup {
        self.inner.resolve_one(id).await
    }
}

/// One consumer's view of batched resolution.
///
/// Only the most recent `resolve_many` call on a session publishes to its
/// subscribers.
pub struct ImageSession {
    inner: Arc<ResolverInner>,
    generation: AtomicU64,
    state: watch::Sender<ImageBatch>,
}

impl std::fmt::Debug for ImageSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSession")
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ImageSession {
    /// Latest published state of this session's most recent call
    pub fn subscribe(&self) -> watch::Receiver<ImageBatch> {
        self.state.subscribe()
    }

    pub fn current(&self) -> ImageBatch {
        self.state.borrow().clone()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn publish(&self, generation: u64, batch: &ImageBatch) {
        if self.is_current(generation) {
            self.state.send_replace(batch.clone());
        } else {
            tracing::debug!(generation, "Dropping stale image results");
        }
    }

    /// Resolve many identifiers, returning this call's final result.
    ///
    /// Blank and duplicate identifiers are ignored. When a newer call on the
    /// same session supersedes this one, it stops before its next batch and
    /// its result carries an `error` naming how many identifiers were left
    /// unfetched. Whatever it did fetch is still cached.
    pub async fn resolve_many(&self, ids: &[String]) -> ImageBatch {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let config = &self.inner.config;

        let mut seen = HashSet::new();
        let ids: Vec<String> = ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();

        let (cached, missing) = self.inner.cache.partition(&ids);
        let mut batch = ImageBatch {
            urls: cached,
            loading: !missing.is_empty(),
            error: None,
        };
        tracing::debug!(
            generation,
            cached = batch.urls.len(),
            to_fetch = missing.len(),
            "Resolving product images"
        );
        self.publish(generation, &batch);

        let mut failed = 0usize;
        let mut skipped = 0usize;
        let chunks: Vec<&[String]> = missing.chunks(config.batch_size).collect();
        for (ix, chunk) in chunks.iter().enumerate() {
            if ix > 0 {
                tokio::time::sleep(config.batch_delay).await;
                if !self.is_current(generation) {
                    skipped = chunks[ix..].iter().map(|c| c.len()).sum();
                    tracing::debug!(generation, skipped, "Image resolution superseded");
                    break;
                }
            }

            failed += self.inner.resolve_chunk(chunk, &mut batch.urls).await;
            self.publish(generation, &batch);
        }

        batch.loading = false;
        batch.error = match (failed, skipped) {
            (0, 0) => None,
            (failed, 0) => Some(format!("Failed to resolve {} product image(s)", failed)),
            (0, skipped) => Some(format!(
                "Superseded before {} product image(s) were fetched",
                skipped
            )),
            (failed, skipped) => Some(format!(
                "Superseded before {} product image(s) were fetched, {} failed",
                skipped, failed
            )),
        };
        self.publish(generation, &batch);
        batch
    }
}

impl ResolverInner {
    /// One batch call, degrading to individual lookups when it fails.
    /// Returns the number of identifiers whose lookup errored.
    async fn resolve_chunk(&self, chunk: &[String], urls: &mut HashMap<String, String>) -> usize {
        match self.api.fetch_batch(chunk).await {
            Ok(results) => {
                let resolved: Vec<(String, String)> = chunk
                    .iter()
                    .filter_map(|id| {
                        let url = results.get(id).cloned().flatten()?;
                        Some((id.clone(), url))
                    })
                    .collect();
                self.cache.put_many(resolved.clone(), "batch");
                urls.extend(resolved);
                0
            }
            Err(err) => {
                tracing::warn!(error = %err, size = chunk.len(), "Batch image lookup failed, resolving individually");
                let mut failed = 0;
                for id in chunk {
                    match self.api.fetch_one(id).await {
                        Ok(response) => {
                            if let Some(url) = response.image_url.filter(|u| !u.is_empty()) {
                                let method = response.method.as_deref().unwrap_or("api");
                                self.cache.put(id, &url, method);
                                urls.insert(id.clone(), url);
                            }
                        }
                        Err(err) => {
                            tracing::debug!(id = %id, error = %err, "Skipping product image");
                            failed += 1;
                        }
                    }
                }
                failed
            }
        }
    }

    async fn resolve_one(&self, id: &str) -> ImageLookup {
        let id = id.trim();
        if id.is_empty() {
            return ImageLookup::no_image();
        }

        if let Some(entry) = self.cache.get_valid(id) {
            return ImageLookup::resolved(entry.url, ImageSource::Cache);
        }

        match self.api.fetch_one(id).await {
            Ok(response) => match response.image_url.filter(|u| !u.is_empty()) {
                Some(url) => {
                    let method = response.method.as_deref().unwrap_or("api");
                    self.cache.put(id, &url, method);
                    ImageLookup::resolved(url, ImageSource::Network)
                }
                None => ImageLookup::no_image(),
            },
            Err(err) => {
                tracing::warn!(id, error = %err, "Image lookup failed, using fallback");
                match fallback_url(&self.config.fallback_base, id) {
                    Some(url) => ImageLookup {
                        url: Some(url),
                        loading: false,
                        error: Some(err.to_string()),
                        source: ImageSource::Fallback,
                    },
                    None => ImageLookup::no_image(),
                }
            }
        }
    }
}

//! Shelfscope Images - product identifier to thumbnail URL resolution
//!
//! Lookups go through a persisted cache with a fixed validity window. Misses
//! are fetched from the backend in small batches separated by a fixed delay,
//! with a per-identifier fallback when a batch call fails.

mod api;
mod cache;
mod resolver;

pub use api::{BatchResult, HttpImageApi, ImageApi, ImageResponse};
pub use cache::{CACHE_STORAGE_KEY, DEFAULT_TTL, ImageCache, ImageCacheEntry};
pub use resolver::{
    DEFAULT_FALLBACK_BASE, ImageBatch, ImageLookup, ImageResolver, ImageResolverConfig,
    ImageSession, ImageSource, fallback_url,
};

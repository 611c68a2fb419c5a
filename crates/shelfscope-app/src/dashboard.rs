//! Composition root wiring settings, storage and image resolution together

use anyhow::{Context, Result};
use shelfscope_images::{HttpImageApi, ImageApi, ImageResolver, ImageSession};
use shelfscope_settings::ShelfscopeSettings;
use shelfscope_storage::{KeyValueStore, MemoryStore, SqliteStore, paths};
use shelfscope_table::{ColumnDescriptor, TableStateBuilder};
use std::sync::Arc;

pub struct Dashboard {
    settings: ShelfscopeSettings,
    store: Arc<dyn KeyValueStore>,
    images: ImageResolver,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("settings", &self.settings)
            .field("images", &self.images)
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    /// Open the dashboard against the on-disk state database
    pub fn open(settings: ShelfscopeSettings) -> Result<Self> {
        paths::ensure_directories().context("Failed to create data directories")?;
        let path = paths::store_file()?;
        let store = SqliteStore::open(&path)
            .with_context(|| format!("Failed to open state store at {:?}", path))?;
        tracing::info!(path = %path.display(), "Opened state store");
        Self::with_store(settings, Arc::new(store))
    }

    /// Use `store` for persisted state and talk HTTP to the configured backend
    pub fn with_store(settings: ShelfscopeSettings, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let images = &settings.images;
        let api = match images.session_cookie.as_deref() {
            Some(cookie) => {
                HttpImageApi::with_session(&images.api_base_url, cookie, images.request_timeout())
            }
            None => HttpImageApi::new(&images.api_base_url),
        }
        .with_context(|| format!("Invalid image API base URL: {}", images.api_base_url))?;

        Ok(Self::with_parts(settings, store, Arc::new(api)))
    }

    pub fn with_parts(
        settings: ShelfscopeSettings,
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn ImageApi>,
    ) -> Self {
        let resolver = ImageResolver::new(api, store.clone(), settings.images.to_resolver_config());
        Self {
            settings,
            store,
            images: resolver,
        }
    }

    pub fn settings(&self) -> &ShelfscopeSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn images(&self) -> &ImageResolver {
        &self.images
    }

    /// Batched image resolution for one view. Views that resolve
    /// concurrently each need their own session.
    pub fn image_session(&self) -> ImageSession {
        self.images.session()
    }

    /// Table builder sharing this dashboard's store and pinned column.
    ///
    /// With column order persistence turned off every table gets its own
    /// session-only store.
    pub fn table(&self, table_key: &str, columns: Vec<ColumnDescriptor>) -> TableStateBuilder {
        let table = &self.settings.table;
        let store: Arc<dyn KeyValueStore> = if table.persist_column_order {
            self.store.clone()
        } else {
            Arc::new(MemoryStore::new())
        };

        shelfscope_table::TableState::builder(columns)
            .table_key(table_key)
            .pinned_key(table.pinned_key.clone())
            .store(store)
    }
}

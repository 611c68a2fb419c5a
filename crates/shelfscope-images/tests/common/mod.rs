//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use shelfscope_core::{Result, ShelfscopeError};
use shelfscope_images::{BatchResult, ImageApi, ImageResponse};
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Batch(Vec<String>),
    One(String),
}

/// Mock image backend for exercising the resolver without a network.
///
/// Identifiers listed in `images` resolve to their URL; everything else
/// answers with no image. Batch and single lookups can be made to fail
/// independently.
#[derive(Default)]
pub struct MockImageApi {
    pub images: HashMap<String, String>,
    pub fail_batches: bool,
    pub fail_single: Vec<String>,
    pub fail_all_single: bool,
    /// Virtual time each call takes
    pub latency: Option<std::time::Duration>,
    calls: Arc<Mutex<Vec<(tokio::time::Instant, ApiCall)>>>,
}

impl MockImageApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, id: &str, url: &str) -> Self {
        self.images.insert(id.to_string(), url.to_string());
        self
    }

    pub fn with_images(mut self, ids: &[&str]) -> Self {
        for id in ids {
            self.images
                .insert(id.to_string(), format!("https://cdn.example/{}.jpg", id));
        }
        self
    }

    pub fn with_batch_failure(mut self) -> Self {
        self.fail_batches = true;
        self
    }

    pub fn with_single_failure(mut self, id: &str) -> Self {
        self.fail_single.push(id.to_string());
        self
    }

    pub fn offline(mut self) -> Self {
        self.fail_batches = true;
        self.fail_all_single = true;
        self
    }

    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(tokio::time::Instant, ApiCall)> {
        self.calls.lock().clone()
    }

    async fn record(&self, call: ApiCall) {
        self.calls.lock().push((tokio::time::Instant::now(), call));
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ImageApi for MockImageApi {
    async fn fetch_one(&self, id: &str) -> Result<ImageResponse> {
        self.record(ApiCall::One(id.to_string())).await;
        if self.fail_all_single || self.fail_single.iter().any(|f| f == id) {
            return Err(ShelfscopeError::Network("connection refused".into()));
        }
        Ok(ImageResponse {
            image_url: self.images.get(id).cloned(),
            method: Some("scrape".to_string()),
        })
    }

    async fn fetch_batch(&self, ids: &[String]) -> Result<BatchResult> {
        self.record(ApiCall::Batch(ids.to_vec())).await;
        if self.fail_batches {
            return Err(ShelfscopeError::Http {
                status: 500,
                message: "batch endpoint down".into(),
            });
        }
        Ok(ids
            .iter()
            .map(|id| (id.clone(), self.images.get(id).cloned()))
            .collect())
    }
}

pub fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

//! Access to the external nutrition database the catalog mirrors.
//!
//! The catalog sync job and the saved-products fallback only see the
//! [`NutritionSource`] trait; [`client::OpenFoodFactsClient`] is the HTTP
//! implementation used in production.

pub mod client;
pub mod dto;

use async_trait::async_trait;
use thiserror::Error;

pub use client::OpenFoodFactsClient;
pub use dto::{NutrientLevels, RemoteCategory, RemoteProduct};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid payload from {url}: {message}")]
    Decode { url: String, message: String },
}

#[async_trait]
pub trait NutritionSource: Send + Sync {
    /// The category list, in feed order.
    async fn fetch_categories(&self) -> Result<Vec<RemoteCategory>, SourceError>;

    /// One page (1-based) of a category's products, unfiltered.
    async fn fetch_category_page(
        &self,
        category: &RemoteCategory,
        page: u32,
    ) -> Result<Vec<RemoteProduct>, SourceError>;

    /// Look a product up by code. `Ok(None)` when the database does not know it.
    async fn fetch_product(&self, code: &str) -> Result<Option<RemoteProduct>, SourceError>;
}

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{CatalogSync, Category, Product, SavedProductView};

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct SearchQuery {
    /// Word the product name should start with, or at least contain.
    pub word: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResult {
    pub word: String,
    pub found: bool,
    pub product: Option<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetails {
    pub product: Product,
    pub category: Category,
    /// Same-category products, best nutrition grade first.
    pub substitutes: Vec<Product>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SaveProductRequest {
    pub product_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SavedProductList {
    #[schema(value_type = Vec<SavedProductView>)]
    pub items: Vec<SavedProductView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogStatus {
    /// Most recent sync run; `None` before the first sync.
    pub latest: Option<CatalogSync>,
}

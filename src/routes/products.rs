use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::products::{
        CatalogStatus, ProductDetails, SaveProductRequest, SavedProductList, SearchQuery,
        SearchResult,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::BackupProduct,
    response::{ApiResponse, Meta},
    services::{catalog_service, saved_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search_product))
        .route("/saved", get(list_saved))
        .route("/save", post(save_product))
        .route("/{id}", get(get_product))
}

pub fn catalog_router() -> Router<AppState> {
    Router::new().route("/status", get(catalog_status))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with up to 12 substitutes", body = ApiResponse<ProductDetails>),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<ProductDetails>>> {
    let details = catalog_service::get_product_details(&state, id).await?;
    Ok(Json(ApiResponse::success("Product", details, None)))
}

#[utoipa::path(
    get,
    path = "/api/products/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Best match, or found = false", body = ApiResponse<SearchResult>),
        (status = 400, description = "Missing search word")
    ),
    tag = "Products"
)]
pub async fn search_product(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<SearchResult>>> {
    let result = catalog_service::search(&state, query.word.as_deref().unwrap_or_default()).await?;
    let message = if result.found {
        "Product found"
    } else {
        "No product found"
    };
    Ok(Json(ApiResponse::success(message, result, None)))
}

#[utoipa::path(
    get,
    path = "/api/products/saved",
    responses(
        (status = 200, description = "Saved products, in save order", body = ApiResponse<SavedProductList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_saved(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SavedProductList>>> {
    let items = saved_service::list_saved(&state, user.user_id).await?;
    let meta = Meta::total(items.len());
    Ok(Json(ApiResponse::success(
        "OK",
        SavedProductList { items },
        Some(meta),
    )))
}

#[utoipa::path(
    post,
    path = "/api/products/save",
    request_body = SaveProductRequest,
    responses(
        (status = 200, description = "Product saved (idempotent)", body = ApiResponse<BackupProduct>),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn save_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SaveProductRequest>,
) -> AppResult<Json<ApiResponse<BackupProduct>>> {
    let saved = saved_service::save(&state, user.user_id, payload.product_id).await?;
    Ok(Json(ApiResponse::success(
        "Product saved",
        saved,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/catalog/status",
    responses(
        (status = 200, description = "Latest catalog sync run", body = ApiResponse<CatalogStatus>)
    ),
    tag = "Catalog"
)]
pub async fn catalog_status(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CatalogStatus>>> {
    let latest = catalog_service::catalog_status(&state).await?;
    Ok(Json(ApiResponse::success(
        "Catalog status",
        CatalogStatus { latest },
        None,
    )))
}

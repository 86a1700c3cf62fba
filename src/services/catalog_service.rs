use sea_orm::{
    ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, extension::postgres::PgExpr},
};

use crate::{
    dto::products::{ProductDetails, SearchResult},
    entity::{
        catalog_syncs::{Column as SyncCol, Entity as CatalogSyncs},
        categories::Entity as Categories,
        products::{Column as ProductCol, Entity as Products},
    },
    error::{AppError, AppResult},
    models::{CatalogSync, Category, Product},
    state::AppState,
};

pub const MAX_SUBSTITUTES: u64 = 12;

/// Products of a category, best grade (`a`) first, at most [`MAX_SUBSTITUTES`].
/// Equal grades keep insertion order.
pub async fn get_substitutes(state: &AppState, category_id: i64) -> AppResult<Vec<Product>> {
    let products = Products::find()
        .filter(ProductCol::CategoryId.eq(category_id))
        .order_by_asc(ProductCol::NutritionGrades)
        .order_by_asc(ProductCol::Id)
        .limit(MAX_SUBSTITUTES)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();
    Ok(products)
}

pub async fn get_product_details(state: &AppState, product_id: i64) -> AppResult<ProductDetails> {
    let (product, category) = Products::find_by_id(product_id)
        .find_also_related(Categories)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let category = category.ok_or(AppError::NotFound)?;

    let substitutes = get_substitutes(state, product.category_id).await?;
    Ok(ProductDetails {
        product: Product::from(product),
        category: Category::from(category),
        substitutes,
    })
}

/// First product whose name starts with `word`, else the first whose name
/// contains it, both in name order. Matching ignores case.
pub async fn search(state: &AppState, word: &str) -> AppResult<SearchResult> {
    let word = word.trim();
    if word.is_empty() {
        return Err(AppError::validation("word", "This field is required."));
    }

    let escaped = escape_like(word);
    let mut product = first_matching(state, format!("{escaped}%")).await?;
    if product.is_none() {
        product = first_matching(state, format!("%{escaped}%")).await?;
    }

    Ok(SearchResult {
        word: word.to_string(),
        found: product.is_some(),
        product,
    })
}

async fn first_matching(state: &AppState, pattern: String) -> AppResult<Option<Product>> {
    let product = Products::find()
        .filter(Expr::col(ProductCol::ProductName).ilike(pattern))
        .order_by_asc(ProductCol::ProductName)
        .order_by_asc(ProductCol::Id)
        .one(&state.orm)
        .await?
        .map(Product::from);
    Ok(product)
}

/// Escape LIKE wildcards so user input only matches literally.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// The most recent catalog sync run, if any ever started.
pub async fn catalog_status(state: &AppState) -> AppResult<Option<CatalogSync>> {
    let latest = CatalogSyncs::find()
        .order_by_desc(SyncCol::StartedAt)
        .one(&state.orm)
        .await?
        .map(CatalogSync::from);
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_pur\\"), "100\\%\\_pur\\\\");
        assert_eq!(escape_like("Milk"), "Milk");
    }
}

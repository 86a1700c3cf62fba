//! Full refresh of the product catalog from the nutrition database.
//!
//! The run deletes every category and product, then re-inserts the first
//! categories of the feed one by one. The catalog is therefore partial or
//! empty while a sync is in progress; `catalog_syncs` records when that
//! window opened and closed.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set, ActiveValue::NotSet,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db::pool_of,
    entity::{
        catalog_syncs::ActiveModel as SyncActive,
        categories::{ActiveModel as CategoryActive, Entity as Categories},
        products::{ActiveModel as ProductActive, Entity as Products},
    },
    openfoodfacts::{NutritionSource, RemoteCategory, RemoteProduct, SourceError},
};

/// Session advisory lock held for the duration of a run.
pub const SYNC_LOCK_ID: i64 = 0x7379_6e63;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncLimits {
    pub max_categories: usize,
    pub max_pages: u32,
    pub page_size: u64,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            max_categories: 20,
            max_pages: 10,
            page_size: 20,
        }
    }
}

impl SyncLimits {
    /// Pages needed to cover `product_count` products, capped at `max_pages`.
    pub fn pages_for(&self, product_count: u64) -> u32 {
        let page_size = self.page_size.max(1);
        let pages = product_count.div_ceil(page_size);
        u32::try_from(pages).unwrap_or(u32::MAX).min(self.max_pages)
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("another catalog sync is already running")]
    AlreadyRunning,

    #[error("fetching {what} failed")]
    Fetch {
        what: String,
        #[source]
        source: SourceError,
    },

    #[error("database error")]
    Db(#[from] sqlx::Error),

    #[error("ORM error")]
    Orm(#[from] DbErr),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryReport {
    pub name: String,
    pub category_id: Option<i64>,
    pub pages_fetched: u32,
    pub products_dropped: usize,
    pub products_inserted: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub categories: Vec<CategoryReport>,
}

impl SyncReport {
    pub fn products_inserted(&self) -> usize {
        self.categories.iter().map(|c| c.products_inserted).sum()
    }

    pub fn categories_inserted(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| c.category_id.is_some())
            .count()
    }
}

/// Run one sync. A page that cannot be fetched aborts the whole run; a
/// category whose rows cannot be inserted is logged and skipped.
pub async fn sync_catalog(
    orm: &DatabaseConnection,
    source: &dyn NutritionSource,
    limits: SyncLimits,
) -> Result<SyncReport, SyncError> {
    let pool = pool_of(orm);
    let mut lock_conn = pool.acquire().await?;
    let locked = sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_lock($1)")
        .bind(SYNC_LOCK_ID)
        .fetch_one(&mut *lock_conn)
        .await?;
    if !locked {
        return Err(SyncError::AlreadyRunning);
    }

    let run = SyncActive {
        id: Set(Uuid::new_v4()),
        status: Set("running".into()),
        categories_synced: Set(0),
        products_synced: Set(0),
        error: Set(None),
        started_at: NotSet,
        finished_at: Set(None),
    }
    .insert(orm)
    .await;

    let result = match run {
        Ok(run) => {
            let mut report = SyncReport {
                run_id: run.id,
                categories: Vec::new(),
            };
            let outcome = refresh(orm, source, limits, &mut report).await;
            finish_run(orm, run.id, &report, outcome.as_ref().err()).await;
            outcome.map(|()| report)
        }
        Err(err) => Err(SyncError::from(err)),
    };

    if let Err(err) = sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(SYNC_LOCK_ID)
        .execute(&mut *lock_conn)
        .await
    {
        tracing::warn!(error = %err, "failed to release catalog sync lock");
    }

    result
}

async fn refresh(
    orm: &DatabaseConnection,
    source: &dyn NutritionSource,
    limits: SyncLimits,
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    let categories = source
        .fetch_categories()
        .await
        .map_err(|source| SyncError::Fetch {
            what: "category list".into(),
            source,
        })?;
    tracing::info!(available = categories.len(), "category list fetched");

    truncate_catalog(orm).await?;

    for remote in categories.into_iter().take(limits.max_categories) {
        let mut entry = CategoryReport {
            name: remote.name.clone(),
            ..Default::default()
        };

        let category = match (CategoryActive {
            id: NotSet,
            name: Set(remote.name.clone()),
        })
        .insert(orm)
        .await
        {
            Ok(category) => category,
            Err(err) => {
                tracing::error!(category = %remote.name, error = %err, "category insertion failed");
                entry.error = Some(err.to_string());
                report.categories.push(entry);
                continue;
            }
        };
        entry.category_id = Some(category.id);
        tracing::info!(category = %remote.name, id = category.id, "category sync in progress");

        let fetched = match fetch_category_products(source, &remote, limits).await {
            Ok(fetched) => fetched,
            Err(err) => {
                entry.error = Some(err.to_string());
                report.categories.push(entry);
                return Err(err);
            }
        };
        entry.pages_fetched = fetched.pages;
        entry.products_dropped = fetched.dropped;

        let rows: Vec<ProductActive> = fetched
            .products
            .iter()
            .map(|product| product_row(product, category.id))
            .collect();
        let count = rows.len();

        if count > 0 {
            match Products::insert_many(rows).exec_without_returning(orm).await {
                Ok(_) => entry.products_inserted = count,
                Err(err) => {
                    tracing::error!(category = %remote.name, error = %err, "product insertion failed");
                    entry.error = Some(err.to_string());
                }
            }
        }

        tracing::info!(
            category = %remote.name,
            pages = entry.pages_fetched,
            inserted = entry.products_inserted,
            dropped = entry.products_dropped,
            "category synced"
        );
        report.categories.push(entry);
    }

    Ok(())
}

/// Products fetched for one category, already filtered.
#[derive(Debug, Default)]
pub struct FetchedCategory {
    pub pages: u32,
    pub products: Vec<RemoteProduct>,
    pub dropped: usize,
}

/// Fetch every page of a category and keep the importable entries.
/// Stops at the first failed page.
pub async fn fetch_category_products(
    source: &dyn NutritionSource,
    category: &RemoteCategory,
    limits: SyncLimits,
) -> Result<FetchedCategory, SyncError> {
    let mut fetched = FetchedCategory::default();
    for page in 1..=limits.pages_for(category.products) {
        let products = source
            .fetch_category_page(category, page)
            .await
            .map_err(|source| SyncError::Fetch {
                what: format!("page {page} of category {}", category.name),
                source,
            })?;
        fetched.pages = page;
        for product in products {
            if product.is_importable() {
                fetched.products.push(product);
            } else {
                tracing::debug!(category = %category.name, code = ?product.code, "incomplete product dropped");
                fetched.dropped += 1;
            }
        }
    }
    Ok(fetched)
}

async fn truncate_catalog(orm: &DatabaseConnection) -> Result<(), DbErr> {
    let products = Products::delete_many().exec(orm).await?;
    let categories = Categories::delete_many().exec(orm).await?;
    tracing::info!(
        products = products.rows_affected,
        categories = categories.rows_affected,
        "catalog truncated"
    );
    Ok(())
}

fn product_row(product: &RemoteProduct, category_id: i64) -> ProductActive {
    ProductActive {
        id: NotSet,
        product_name: Set(product.name().unwrap_or_default().to_string()),
        code: Set(product.code().unwrap_or_default().to_string()),
        img_url: Set(product.image_url.clone()),
        url: Set(product.url.clone()),
        salt: Set(product.nutrient_levels.salt.clone()),
        fat: Set(product.nutrient_levels.fat.clone()),
        sugars: Set(product.nutrient_levels.sugars.clone()),
        saturated_fat: Set(product.nutrient_levels.saturated_fat.clone()),
        warehouse: Set(product.brands.clone()),
        allergens: Set(product.allergens.clone()),
        nutrition_grades: Set(product.grade().map(String::from).unwrap_or_default()),
        category_id: Set(category_id),
    }
}

async fn finish_run(
    orm: &DatabaseConnection,
    run_id: Uuid,
    report: &SyncReport,
    error: Option<&SyncError>,
) {
    let status = if error.is_some() { "failed" } else { "succeeded" };
    let update = SyncActive {
        id: Set(run_id),
        status: Set(status.into()),
        categories_synced: Set(i32::try_from(report.categories_inserted()).unwrap_or(i32::MAX)),
        products_synced: Set(i32::try_from(report.products_inserted()).unwrap_or(i32::MAX)),
        error: Set(error.map(error_chain)),
        started_at: NotSet,
        finished_at: Set(Some(Utc::now().fixed_offset())),
    }
    .update(orm)
    .await;

    if let Err(err) = update {
        tracing::warn!(%run_id, error = %err, "failed to record sync outcome");
    }
}

fn error_chain(err: &SyncError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::SyncLimits;

    #[test]
    fn page_count_rounds_up_and_is_capped() {
        let limits = SyncLimits::default();
        assert_eq!(limits.pages_for(0), 0);
        assert_eq!(limits.pages_for(1), 1);
        assert_eq!(limits.pages_for(20), 1);
        assert_eq!(limits.pages_for(21), 2);
        assert_eq!(limits.pages_for(199), 10);
        assert_eq!(limits.pages_for(5_000), 10);
    }
}

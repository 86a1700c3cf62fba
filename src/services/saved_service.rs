use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, RelationTrait, Set,
    SqlErr, ActiveValue::NotSet, JoinType, QuerySelect,
};
use uuid::Uuid;

use crate::{
    audit::{AuditAction, record},
    entity::{
        backup_products::{
            ActiveModel as BackupActive, Column as BackupCol, Entity as BackupProducts,
            Model as BackupModel,
        },
        categories::{Column as CategoryCol, Entity as Categories},
        products::{Column as ProductCol, Entity as Products, Relation as ProductRelation},
    },
    error::{AppError, AppResult},
    models::{BackupProduct, SavedProductView},
    state::AppState,
};

/// Bookmark a catalog product for `user_id`. Saving the same code twice
/// returns the first entry.
pub async fn save(state: &AppState, user_id: Uuid, product_id: i64) -> AppResult<BackupProduct> {
    let (product, category) = Products::find_by_id(product_id)
        .find_also_related(Categories)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let category = category.ok_or(AppError::NotFound)?;

    if let Some(existing) = find_saved(state, user_id, &product.code).await? {
        return Ok(BackupProduct::from(existing));
    }

    let inserted = BackupActive {
        id: Set(Uuid::new_v4()),
        product_code: Set(product.code.clone()),
        category_name: Set(category.name),
        user_id: Set(user_id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await;

    let saved = match inserted {
        Ok(saved) => saved,
        // A concurrent save of the same code won the race.
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_saved(state, user_id, &product.code)
                .await?
                .ok_or(AppError::from(err))?
        }
        Err(err) => return Err(err.into()),
    };

    record(
        &state.pool,
        user_id,
        AuditAction::ProductSaved,
        serde_json::json!({ "product_code": saved.product_code }),
    )
    .await;

    Ok(BackupProduct::from(saved))
}

/// The user's saved products in the order they were saved. Entries missing
/// from the local catalog are looked up live; entries unknown to both are
/// left out.
pub async fn list_saved(state: &AppState, user_id: Uuid) -> AppResult<Vec<SavedProductView>> {
    let entries = BackupProducts::find()
        .filter(BackupCol::UserId.eq(user_id))
        .order_by_asc(BackupCol::CreatedAt)
        .order_by_asc(BackupCol::Id)
        .all(&state.orm)
        .await?;

    let mut views = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(view) = resolve(state, entry).await? {
            views.push(view);
        }
    }
    Ok(views)
}

async fn resolve(state: &AppState, entry: BackupModel) -> AppResult<Option<SavedProductView>> {
    let local = Products::find()
        .join(JoinType::InnerJoin, ProductRelation::Categories.def())
        .filter(ProductCol::Code.eq(entry.product_code.as_str()))
        .filter(CategoryCol::Name.eq(entry.category_name.as_str()))
        .order_by_asc(ProductCol::Id)
        .one(&state.orm)
        .await?;
    if let Some(product) = local {
        return Ok(Some(SavedProductView::from_catalog(product, entry.category_name)));
    }

    match state.source.fetch_product(&entry.product_code).await {
        Ok(Some(remote)) => Ok(Some(SavedProductView::from_remote(
            entry.product_code,
            entry.category_name,
            remote,
        ))),
        Ok(None) => {
            tracing::debug!(code = %entry.product_code, "saved product unknown upstream, skipped");
            Ok(None)
        }
        Err(err) => {
            tracing::debug!(code = %entry.product_code, error = %err, "live lookup failed, skipped");
            Ok(None)
        }
    }
}

async fn find_saved(state: &AppState, user_id: Uuid, code: &str) -> AppResult<Option<BackupModel>> {
    let existing = BackupProducts::find()
        .filter(BackupCol::UserId.eq(user_id))
        .filter(BackupCol::ProductCode.eq(code))
        .one(&state.orm)
        .await?;
    Ok(existing)
}

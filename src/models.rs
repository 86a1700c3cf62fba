use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    backup_products, catalog_syncs, categories, friendship_requests, products, users,
};
use crate::openfoodfacts::RemoteProduct;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Public face of a user, as shown to other users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FriendshipRequest {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<friendship_requests::Model> for FriendshipRequest {
    fn from(model: friendship_requests::Model) -> Self {
        Self {
            id: model.id,
            from_user_id: model.from_user_id,
            to_user_id: model.to_user_id,
            message: model.message,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct IncomingRequest {
    pub request_id: Uuid,
    pub message: String,
    pub requester_id: Uuid,
    pub requester_username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Friend {
    pub friend_id: Uuid,
    pub friend_username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct OutgoingRequest {
    pub request_id: Uuid,
    pub target_id: Uuid,
    pub target_username: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the friends page shows for one user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FriendshipView {
    pub pending_incoming: Vec<IncomingRequest>,
    pub friends: Vec<Friend>,
    pub pending_outgoing: Vec<OutgoingRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i64,
    pub product_name: String,
    pub code: String,
    pub img_url: Option<String>,
    pub url: Option<String>,
    pub salt: Option<String>,
    pub fat: Option<String>,
    pub sugars: Option<String>,
    pub saturated_fat: Option<String>,
    pub warehouse: Option<String>,
    pub allergens: Option<String>,
    pub nutrition_grades: String,
    pub category_id: i64,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            product_name: model.product_name,
            code: model.code,
            img_url: model.img_url,
            url: model.url,
            salt: model.salt,
            fat: model.fat,
            sugars: model.sugars,
            saturated_fat: model.saturated_fat,
            warehouse: model.warehouse,
            allergens: model.allergens,
            nutrition_grades: model.nutrition_grades,
            category_id: model.category_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BackupProduct {
    pub id: Uuid,
    pub product_code: String,
    pub category_name: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<backup_products::Model> for BackupProduct {
    fn from(model: backup_products::Model) -> Self {
        Self {
            id: model.id,
            product_code: model.product_code,
            category_name: model.category_name,
            user_id: model.user_id,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductOrigin {
    /// Resolved from the local catalog.
    Catalog,
    /// Fetched live from the nutrition database.
    Live,
}

/// A saved product as displayed to its owner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SavedProductView {
    /// Local catalog id; absent for live lookups.
    pub id: Option<i64>,
    pub product_name: Option<String>,
    pub code: String,
    pub category_name: String,
    pub img_url: Option<String>,
    pub url: Option<String>,
    pub salt: Option<String>,
    pub fat: Option<String>,
    pub sugars: Option<String>,
    pub saturated_fat: Option<String>,
    pub warehouse: Option<String>,
    pub allergens: Option<String>,
    pub nutrition_grades: Option<String>,
    pub origin: ProductOrigin,
}

impl SavedProductView {
    pub fn from_catalog(product: products::Model, category_name: String) -> Self {
        Self {
            id: Some(product.id),
            product_name: Some(product.product_name),
            code: product.code,
            category_name,
            img_url: product.img_url,
            url: product.url,
            salt: product.salt,
            fat: product.fat,
            sugars: product.sugars,
            saturated_fat: product.saturated_fat,
            warehouse: product.warehouse,
            allergens: product.allergens,
            nutrition_grades: Some(product.nutrition_grades),
            origin: ProductOrigin::Catalog,
        }
    }

    pub fn from_remote(code: String, category_name: String, remote: RemoteProduct) -> Self {
        let nutrition_grades = remote.grade().map(String::from);
        Self {
            id: None,
            product_name: remote.product_name,
            code,
            category_name,
            img_url: remote.image_url,
            url: remote.url,
            salt: remote.nutrient_levels.salt,
            fat: remote.nutrient_levels.fat,
            sugars: remote.nutrient_levels.sugars,
            saturated_fat: remote.nutrient_levels.saturated_fat,
            warehouse: remote.brands,
            allergens: remote.allergens,
            nutrition_grades,
            origin: ProductOrigin::Live,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogSync {
    pub id: Uuid,
    pub status: String,
    pub categories_synced: i32,
    pub products_synced: i32,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<catalog_syncs::Model> for CatalogSync {
    fn from(model: catalog_syncs::Model) -> Self {
        Self {
            id: model.id,
            status: model.status,
            categories_synced: model.categories_synced,
            products_synced: model.products_synced,
            error: model.error,
            started_at: model.started_at.with_timezone(&Utc),
            finished_at: model.finished_at.map(|at| at.with_timezone(&Utc)),
        }
    }
}

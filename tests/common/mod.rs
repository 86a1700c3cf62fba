#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use nutri_social_api::{
    config::{AppConfig, OpenFoodFactsConfig},
    db::{create_orm_conn, run_migrations},
    entity::{
        categories::ActiveModel as CategoryActive, products::ActiveModel as ProductActive,
        users::ActiveModel as UserActive,
    },
    openfoodfacts::{NutritionSource, RemoteCategory, RemoteProduct, SourceError},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret";

/// Database to run against, if the environment provides one.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run database tests.");
            None
        }
    }
}

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: JWT_SECRET.into(),
        jwt_ttl_hours: 1,
        off: OpenFoodFactsConfig::default(),
    }
}

pub async fn setup_state(
    database_url: &str,
    source: Arc<dyn NutritionSource>,
) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;
    Ok(AppState::new(orm, test_config(database_url), source))
}

/// Short random suffix keeping names unique across test runs.
pub fn tag() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

pub async fn create_user(state: &AppState, prefix: &str) -> anyhow::Result<Uuid> {
    let suffix = tag();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(format!("{prefix}_{suffix}")),
        email: Set(format!("{prefix}_{suffix}@example.com")),
        password_hash: Set("dummy".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(user.id)
}

pub async fn create_category(state: &AppState, name: &str) -> anyhow::Result<i64> {
    let category = CategoryActive {
        id: NotSet,
        name: Set(name.to_string()),
    }
    .insert(&state.orm)
    .await?;
    Ok(category.id)
}

pub async fn create_product(
    state: &AppState,
    category_id: i64,
    name: &str,
    code: &str,
    grade: &str,
) -> anyhow::Result<i64> {
    let product = ProductActive {
        id: NotSet,
        product_name: Set(name.to_string()),
        code: Set(code.to_string()),
        img_url: Set(None),
        url: Set(Some(format!("https://example.com/{code}"))),
        salt: Set(Some("low".into())),
        fat: Set(None),
        sugars: Set(None),
        saturated_fat: Set(None),
        warehouse: Set(None),
        allergens: Set(None),
        nutrition_grades: Set(grade.to_string()),
        category_id: Set(category_id),
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

pub fn remote_product(name: &str, code: &str, grade: &str) -> RemoteProduct {
    RemoteProduct {
        product_name: Some(name.to_string()),
        code: Some(code.to_string()),
        nutrition_grades: Some(grade.to_string()),
        ..Default::default()
    }
}

/// In-memory stand-in for the nutrition database.
#[derive(Default)]
pub struct FakeSource {
    pub categories: Vec<RemoteCategory>,
    pub pages: HashMap<(String, u32), Vec<RemoteProduct>>,
    pub products: HashMap<String, RemoteProduct>,
    pub failing_categories: HashSet<String>,
    pub requested_pages: Mutex<Vec<(String, u32)>>,
}

impl FakeSource {
    pub fn with_category(mut self, name: &str, pages: Vec<Vec<RemoteProduct>>) -> Self {
        let total: usize = pages.iter().map(Vec::len).sum();
        self.categories.push(RemoteCategory {
            name: name.to_string(),
            url: format!("https://example.com/category/{name}"),
            products: total as u64,
        });
        for (index, page) in pages.into_iter().enumerate() {
            self.pages.insert((name.to_string(), index as u32 + 1), page);
        }
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing_categories.insert(name.to_string());
        self
    }

    pub fn with_product(mut self, product: RemoteProduct) -> Self {
        let code = product.code.clone().unwrap_or_default();
        self.products.insert(code, product);
        self
    }

    pub fn requested(&self) -> Vec<(String, u32)> {
        self.requested_pages.lock().unwrap().clone()
    }
}

#[async_trait]
impl NutritionSource for FakeSource {
    async fn fetch_categories(&self) -> Result<Vec<RemoteCategory>, SourceError> {
        Ok(self.categories.clone())
    }

    async fn fetch_category_page(
        &self,
        category: &RemoteCategory,
        page: u32,
    ) -> Result<Vec<RemoteProduct>, SourceError> {
        self.requested_pages
            .lock()
            .unwrap()
            .push((category.name.clone(), page));
        if self.failing_categories.contains(&category.name) {
            return Err(SourceError::Status {
                url: format!("{}/{page}.json", category.url),
                status: 503,
            });
        }
        Ok(self
            .pages
            .get(&(category.name.clone(), page))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_product(&self, code: &str) -> Result<Option<RemoteProduct>, SourceError> {
        if code.starts_with("unreachable") {
            return Err(SourceError::Timeout {
                url: format!("https://example.com/product/{code}.json"),
            });
        }
        Ok(self.products.get(code).cloned())
    }
}

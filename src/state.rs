use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    openfoodfacts::NutritionSource,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub source: Arc<dyn NutritionSource>,
}

impl AppState {
    pub fn new(orm: OrmConn, config: AppConfig, source: Arc<dyn NutritionSource>) -> Self {
        Self {
            pool: crate::db::pool_of(&orm),
            orm,
            config: Arc::new(config),
            source,
        }
    }
}

//! Replace the whole product catalog with a fresh copy of the nutrition
//! database. Meant to be run by hand or from cron, never twice at once.

use nutri_social_api::{
    config::{OpenFoodFactsConfig, get_env_variable},
    db::{create_orm_conn, run_migrations},
    openfoodfacts::OpenFoodFactsClient,
    services::sync_service::{SyncLimits, sync_catalog},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,nutri_social_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = get_env_variable("DATABASE_URL")?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    let client = OpenFoodFactsClient::new(&OpenFoodFactsConfig::from_env()?)?;
    let report = sync_catalog(&orm, &client, SyncLimits::default()).await?;

    let failed = report
        .categories
        .iter()
        .filter(|c| c.error.is_some())
        .count();
    tracing::info!(
        run_id = %report.run_id,
        categories = report.categories_inserted(),
        products = report.products_inserted(),
        failed_categories = failed,
        "catalog synchronised"
    );
    Ok(())
}

mod common;

use std::sync::Arc;

use nutri_social_api::{
    db::pool_of,
    entity::{
        catalog_syncs::{Column as SyncCol, Entity as CatalogSyncs},
        categories::{Column as CategoryCol, Entity as Categories},
        products::{Column as ProductCol, Entity as Products},
    },
    openfoodfacts::{RemoteCategory, SourceError},
    services::sync_service::{
        SYNC_LOCK_ID, SyncError, SyncLimits, fetch_category_products, sync_catalog,
    },
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use common::{FakeSource, database_url, remote_product, setup_state};

fn products(prefix: &str, count: usize) -> Vec<nutri_social_api::openfoodfacts::RemoteProduct> {
    (0..count)
        .map(|i| remote_product(&format!("{prefix} {i}"), &format!("{prefix}-{i}"), "b"))
        .collect()
}

fn category(source: &FakeSource, name: &str) -> RemoteCategory {
    source
        .categories
        .iter()
        .find(|c| c.name == name)
        .cloned()
        .expect("category registered in the fake source")
}

#[tokio::test]
async fn fetches_only_the_pages_the_count_needs() -> anyhow::Result<()> {
    let source = FakeSource::default().with_category(
        "Fromages",
        vec![products("brie", 20), products("comte", 5)],
    );
    let fromages = category(&source, "Fromages");

    let fetched = fetch_category_products(&source, &fromages, SyncLimits::default()).await?;
    assert_eq!(fetched.pages, 2);
    assert_eq!(fetched.products.len(), 25);
    assert_eq!(fetched.dropped, 0);
    assert_eq!(
        source.requested(),
        vec![("Fromages".to_string(), 1), ("Fromages".to_string(), 2)]
    );
    Ok(())
}

#[tokio::test]
async fn page_count_is_capped() -> anyhow::Result<()> {
    let pages: Vec<_> = (0..5).map(|p| products(&format!("p{p}"), 20)).collect();
    let source = FakeSource::default().with_category("Boissons", pages);
    let boissons = category(&source, "Boissons");
    let limits = SyncLimits {
        max_pages: 3,
        ..SyncLimits::default()
    };

    let fetched = fetch_category_products(&source, &boissons, limits).await?;
    assert_eq!(fetched.pages, 3);
    assert_eq!(fetched.products.len(), 60);
    assert_eq!(source.requested().len(), 3);
    Ok(())
}

#[tokio::test]
async fn incomplete_products_are_dropped() -> anyhow::Result<()> {
    let mut page = products("pain", 3);
    page.push(remote_product("   ", "blank-name", "a"));
    page.push(remote_product("Sans grade", "no-grade", "z"));
    let mut no_code = remote_product("Sans code", "", "c");
    no_code.code = None;
    page.push(no_code);
    let source = FakeSource::default().with_category("Pains", vec![page]);
    let pains = category(&source, "Pains");

    let fetched = fetch_category_products(&source, &pains, SyncLimits::default()).await?;
    assert_eq!(fetched.products.len(), 3);
    assert_eq!(fetched.dropped, 3);
    assert!(fetched.products.iter().all(|p| p.is_importable()));
    Ok(())
}

#[tokio::test]
async fn failed_page_is_reported_with_its_cause() -> anyhow::Result<()> {
    let source = FakeSource::default()
        .with_category("Soupes", vec![products("soupe", 4)])
        .failing("Soupes");
    let soupes = category(&source, "Soupes");

    let err = fetch_category_products(&source, &soupes, SyncLimits::default())
        .await
        .unwrap_err();
    match err {
        SyncError::Fetch { what, source } => {
            assert!(what.contains("Soupes"));
            assert!(matches!(source, SourceError::Status { status: 503, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

async fn latest_status(state: &nutri_social_api::state::AppState) -> anyhow::Result<String> {
    let latest = CatalogSyncs::find()
        .order_by_desc(SyncCol::StartedAt)
        .one(&state.orm)
        .await?
        .expect("a sync run was recorded");
    Ok(latest.status)
}

async fn products_in(state: &nutri_social_api::state::AppState, name: &str) -> anyhow::Result<u64> {
    let Some(category) = Categories::find()
        .filter(CategoryCol::Name.eq(name))
        .one(&state.orm)
        .await?
    else {
        return Ok(0);
    };
    Ok(Products::find()
        .filter(ProductCol::CategoryId.eq(category.id))
        .count(&state.orm)
        .await?)
}

// The scenarios share the catalog tables and the sync lock, so they run in
// sequence inside one test.
#[tokio::test]
async fn sync_replaces_the_catalog() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(FakeSource::default())).await?;

    // A category whose rows cannot be stored is skipped, the rest goes on.
    let mut broken = products("casse", 2);
    broken[1].product_name = Some("Nul\0byte".into());
    let source = FakeSource::default()
        .with_category("Chocolats", vec![products("choco", 20), products("noir", 3)])
        .with_category("Casse", vec![broken])
        .with_category("Thes", vec![products("the", 4)])
        .with_category("Hors limite", vec![products("hors", 2)]);
    let limits = SyncLimits {
        max_categories: 3,
        ..SyncLimits::default()
    };

    let report = sync_catalog(&state.orm, &source, limits).await?;
    assert_eq!(report.categories.len(), 3);
    assert_eq!(report.categories_inserted(), 3);
    assert_eq!(report.products_inserted(), 27);
    assert!(report.categories[1].error.is_some());

    assert_eq!(Categories::find().count(&state.orm).await?, 3);
    assert_eq!(products_in(&state, "Chocolats").await?, 23);
    assert_eq!(products_in(&state, "Casse").await?, 0);
    assert_eq!(products_in(&state, "Thes").await?, 4);
    assert!(
        Categories::find()
            .filter(CategoryCol::Name.eq("Hors limite"))
            .one(&state.orm)
            .await?
            .is_none()
    );

    let run = CatalogSyncs::find_by_id(report.run_id)
        .one(&state.orm)
        .await?
        .expect("run row");
    assert_eq!(run.status, "succeeded");
    assert_eq!(run.categories_synced, 3);
    assert_eq!(run.products_synced, 27);
    assert!(run.finished_at.is_some());

    // A failing page aborts the run after truncating the previous catalog.
    let mut source = FakeSource::default();
    for i in 1..=20 {
        source = source.with_category(&format!("Rayon {i:02}"), vec![products(&format!("r{i}"), 2)]);
    }
    let source = source.failing("Rayon 03");

    let err = sync_catalog(&state.orm, &source, SyncLimits::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Fetch { .. }));

    let names: Vec<String> = Categories::find()
        .order_by_asc(CategoryCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Rayon 01", "Rayon 02", "Rayon 03"]);
    assert_eq!(Products::find().count(&state.orm).await?, 4);
    assert_eq!(products_in(&state, "Rayon 03").await?, 0);
    assert_eq!(latest_status(&state).await?, "failed");
    assert!(
        !source
            .requested()
            .iter()
            .any(|(name, _)| name == "Rayon 04")
    );

    // A second run is refused while the lock is held elsewhere.
    let pool = pool_of(&state.orm);
    let mut holder = pool.acquire().await?;
    let locked = sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_lock($1)")
        .bind(SYNC_LOCK_ID)
        .fetch_one(&mut *holder)
        .await?;
    assert!(locked);

    let idle = FakeSource::default().with_category("Ignoree", vec![products("x", 1)]);
    let err = sync_catalog(&state.orm, &idle, SyncLimits::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::AlreadyRunning));
    assert!(idle.requested().is_empty());
    assert_eq!(Categories::find().count(&state.orm).await?, 3);

    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(SYNC_LOCK_ID)
        .execute(&mut *holder)
        .await?;
    Ok(())
}

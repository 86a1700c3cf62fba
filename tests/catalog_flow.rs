mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use nutri_social_api::{
    entity::backup_products::{
        ActiveModel as BackupActive, Column as BackupCol, Entity as BackupProducts,
    },
    error::AppError,
    models::ProductOrigin,
    services::{catalog_service, saved_service},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use common::{
    FakeSource, create_category, create_product, create_user, database_url, remote_product,
    setup_state, tag,
};

#[tokio::test]
async fn substitutes_are_capped_and_sorted_by_grade() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(FakeSource::default())).await?;
    let t = tag();
    let category_id = create_category(&state, &format!("Yaourts {t}")).await?;

    let grades = ["e", "c", "a", "d", "b", "a", "c", "e", "b", "d", "a", "c", "b", "e", "d"];
    let mut first_id = None;
    for (i, grade) in grades.iter().enumerate() {
        let id = create_product(&state, category_id, &format!("Yaourt {i} {t}"), &format!("{t}{i}"), grade)
            .await?;
        first_id.get_or_insert(id);
    }
    let first_id = first_id.expect("at least one product");

    let details = catalog_service::get_product_details(&state, first_id).await?;
    assert_eq!(details.product.id, first_id);
    assert_eq!(details.category.id, category_id);
    assert_eq!(details.substitutes.len(), 12);
    assert!(
        details
            .substitutes
            .windows(2)
            .all(|w| w[0].nutrition_grades <= w[1].nutrition_grades)
    );
    assert!(details.substitutes.iter().all(|p| p.category_id == category_id));
    assert_eq!(details.substitutes[0].nutrition_grades, "a");

    // Equal grades come back in insertion order.
    let grade_a: Vec<i64> = details
        .substitutes
        .iter()
        .filter(|p| p.nutrition_grades == "a")
        .map(|p| p.id)
        .collect();
    let mut sorted = grade_a.clone();
    sorted.sort();
    assert_eq!(grade_a, sorted);
    Ok(())
}

#[tokio::test]
async fn small_category_returns_every_product() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(FakeSource::default())).await?;
    let t = tag();
    let category_id = create_category(&state, &format!("Biscuits {t}")).await?;
    let only = create_product(&state, category_id, &format!("Biscuit {t}"), &format!("b{t}"), "c").await?;

    let substitutes = catalog_service::get_substitutes(&state, category_id).await?;
    assert_eq!(substitutes.len(), 1);
    assert_eq!(substitutes[0].id, only);

    let empty = create_category(&state, &format!("Vide {t}")).await?;
    assert!(catalog_service::get_substitutes(&state, empty).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_product_details_is_not_found() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(FakeSource::default())).await?;

    let err = catalog_service::get_product_details(&state, -1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn search_prefers_prefix_then_falls_back_to_substring() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(FakeSource::default())).await?;
    let t = tag();
    let category_id = create_category(&state, &format!("Laits {t}")).await?;
    let oat = create_product(&state, category_id, &format!("Oat Milk{t}"), &format!("o{t}"), "b").await?;
    let bar = create_product(&state, category_id, &format!("Milk{t} Bar"), &format!("m{t}"), "d").await?;
    let drink = create_product(&state, category_id, &format!("Oat Drink {t}"), &format!("d{t}"), "a").await?;

    let result = catalog_service::search(&state, &format!("Milk{t}")).await?;
    assert!(result.found);
    assert_eq!(result.product.map(|p| p.id), Some(bar));

    let result = catalog_service::search(&state, &format!("  MILK{}  ", t.to_uppercase())).await?;
    assert_eq!(result.word, format!("MILK{}", t.to_uppercase()));
    assert_eq!(result.product.map(|p| p.id), Some(bar));

    // No name starts with the tagged drink word, so the substring match wins.
    let result = catalog_service::search(&state, &format!("Drink {t}")).await?;
    assert_eq!(result.product.map(|p| p.id), Some(drink));

    let result = catalog_service::search(&state, &format!("t Milk{t}")).await?;
    assert_eq!(result.product.map(|p| p.id), Some(oat));

    // Several substring matches: name order decides.
    let result = catalog_service::search(&state, &format!("k{t}")).await?;
    assert_eq!(result.product.map(|p| p.id), Some(bar));

    let result = catalog_service::search(&state, &format!("nothing-{t}")).await?;
    assert!(!result.found);
    assert!(result.product.is_none());

    // Wildcards match literally.
    let result = catalog_service::search(&state, &format!("%{t}")).await?;
    assert!(!result.found);

    let err = catalog_service::search(&state, "   ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(ref fields) if fields[0].field == "word"));
    Ok(())
}

#[tokio::test]
async fn saving_twice_keeps_a_single_entry() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(FakeSource::default())).await?;
    let t = tag();
    let user = create_user(&state, "saver").await?;
    let category_id = create_category(&state, &format!("Jus {t}")).await?;
    let product = create_product(&state, category_id, &format!("Jus {t}"), &format!("j{t}"), "b").await?;

    let first = saved_service::save(&state, user, product).await?;
    let second = saved_service::save(&state, user, product).await?;
    assert_eq!(first.id, second.id);
    assert_eq!(first.product_code, format!("j{t}"));
    assert_eq!(first.category_name, format!("Jus {t}"));

    let rows = BackupProducts::find()
        .filter(BackupCol::UserId.eq(user))
        .count(&state.orm)
        .await?;
    assert_eq!(rows, 1);

    let err = saved_service::save(&state, user, -1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn saved_list_falls_back_to_live_lookup() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let t = tag();
    let live_code = format!("live{t}");
    let source = FakeSource::default().with_product(remote_product(
        &format!("Compote {t}"),
        &live_code,
        "A",
    ));
    let state = setup_state(&url, Arc::new(source)).await?;
    let user = create_user(&state, "collector").await?;
    let category_name = format!("Desserts {t}");
    let category_id = create_category(&state, &category_name).await?;
    let local_id =
        create_product(&state, category_id, &format!("Flan {t}"), &format!("local{t}"), "c").await?;

    let base = Utc::now() - Duration::minutes(10);
    let entries = [
        format!("local{t}"),
        format!("gone{t}"),
        live_code.clone(),
        format!("unreachable{t}"),
    ];
    for (i, code) in entries.iter().enumerate() {
        BackupActive {
            id: Set(Uuid::new_v4()),
            product_code: Set(code.clone()),
            category_name: Set(category_name.clone()),
            user_id: Set(user),
            created_at: Set((base + Duration::seconds(i as i64)).into()),
        }
        .insert(&state.orm)
        .await?;
    }

    let saved = saved_service::list_saved(&state, user).await?;
    assert_eq!(saved.len(), 2);

    assert_eq!(saved[0].id, Some(local_id));
    assert_eq!(saved[0].origin, ProductOrigin::Catalog);
    assert_eq!(saved[0].code, format!("local{t}"));

    assert_eq!(saved[1].id, None);
    assert_eq!(saved[1].origin, ProductOrigin::Live);
    assert_eq!(saved[1].code, live_code);
    assert_eq!(saved[1].category_name, category_name);
    assert_eq!(saved[1].nutrition_grades.as_deref(), Some("a"));

    let other = create_user(&state, "stranger").await?;
    assert!(saved_service::list_saved(&state, other).await?.is_empty());
    Ok(())
}

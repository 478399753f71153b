//! Runs against a real MySQL server. Point `CATALOG__DATABASE__*` at one
//! (the defaults expect root on 127.0.0.1:3306) and run with `--ignored`.

use configuration::{load_settings, DatabaseSettings};
use core_types::NewItem;
use database::{acquire_session, ensure_schema, CallContext, DbError, ItemRepository, Session};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn settings() -> DatabaseSettings {
    let mut settings = load_settings(Path::new("config.toml")).unwrap().database;
    if std::env::var("CATALOG__DATABASE__NAME").is_err() {
        settings.name = "catalog_test".to_string();
    }
    settings
}

async fn repository() -> ItemRepository {
    let session = acquire_session(&settings()).await.unwrap();
    ensure_schema(&session, &session.context()).await.unwrap();
    ItemRepository::new(session)
}

/// Item names are shared across concurrently running tests, so each test
/// tags its own.
fn unique(name: &str) -> String {
    format!("{name}-{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn insert_then_lookup_returns_price() {
    let repo = repository().await;
    let ctx = repo.session().context();
    let item = NewItem::new(unique("iphone"), 950);

    let id = repo.insert_one(&ctx, &item).await.unwrap();
    assert!(id > 0);
    assert_eq!(repo.find_price_by_name(&ctx, &item.name).await.unwrap(), 950);
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn identities_strictly_increase() {
    let repo = repository().await;
    let ctx = repo.session().context();

    let first = repo.insert_one(&ctx, &NewItem::new(unique("a"), 1)).await.unwrap();
    let second = repo.insert_one(&ctx, &NewItem::new(unique("b"), 2)).await.unwrap();
    assert!(second > first);
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn unknown_name_is_not_found() {
    let repo = repository().await;
    let ctx = repo.session().context();

    let err = repo
        .find_price_by_name(&ctx, &unique("never-inserted"))
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn ensure_schema_is_idempotent() {
    let session = acquire_session(&settings()).await.unwrap();
    ensure_schema(&session, &session.context()).await.unwrap();
    ensure_schema(&session, &session.context()).await.unwrap();

    let repo = ItemRepository::new(session);
    let ctx = repo.session().context();
    let name = unique("after-rerun");
    repo.insert_one(&ctx, &NewItem::new(name.clone(), 7)).await.unwrap();
    assert_eq!(repo.find_price_by_name(&ctx, &name).await.unwrap(), 7);
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn acquiring_twice_reuses_existing_database() {
    let settings = settings();
    let first = acquire_session(&settings).await.unwrap();
    let second = acquire_session(&settings).await.unwrap();
    assert_eq!(first.database(), second.database());
    first.close().await;
    second.close().await;
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn batch_reports_every_row() {
    let repo = repository().await;
    let ctx = repo.session().context();
    let tag = unique("batch");
    let items: Vec<NewItem> = (0..5)
        .map(|i| NewItem::new(format!("{tag}-{i}"), 100 + i))
        .collect();

    assert_eq!(repo.insert_batch(&ctx, &items).await.unwrap(), 5);
    for item in &items {
        assert_eq!(repo.find_price_by_name(&ctx, &item.name).await.unwrap(), item.price);
    }
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn failing_row_rolls_back_the_whole_batch() {
    let repo = repository().await;
    let ctx = repo.session().context();
    let valid = NewItem::new(unique("kept-out"), 10);
    // TEXT holds 65 535 bytes; strict mode (the server default) rejects more.
    let oversized = NewItem::new("x".repeat(70_000), 20);

    let err = repo
        .insert_batch(&ctx, &[valid.clone(), oversized])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Execution(_)), "{err:?}");

    let err = repo.find_price_by_name(&ctx, &valid.name).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn empty_batch_is_a_validation_error() {
    let repo = repository().await;
    let ctx = repo.session().context();
    let err = repo.insert_batch(&ctx, &[]).await.unwrap_err();
    assert!(matches!(err, DbError::Validation(_)));
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn range_is_inclusive_and_may_be_empty() {
    let repo = repository().await;
    let ctx = repo.session().context();
    // Prices far away from anything the other tests write.
    let tag = unique("range");
    let base = 7_000_000 + (Uuid::new_v4().as_u128() % 1_000_000) as i32 * 10;
    let items = vec![
        NewItem::new(format!("{tag}-low"), base),
        NewItem::new(format!("{tag}-mid"), base + 5),
        NewItem::new(format!("{tag}-high"), base + 9),
        NewItem::new(format!("{tag}-out"), base + 10),
    ];
    repo.insert_batch(&ctx, &items).await.unwrap();

    let found = repo
        .find_items_in_price_range(&ctx, base, base + 9)
        .await
        .unwrap();
    let mut names: Vec<_> = found
        .iter()
        .filter(|item| item.name.starts_with(&tag))
        .map(|item| item.name.as_str())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            format!("{tag}-high"),
            format!("{tag}-low"),
            format!("{tag}-mid")
        ]
    );

    let none = repo.find_items_in_price_range(&ctx, -20, -10).await.unwrap();
    assert!(none.iter().all(|item| !item.name.starts_with(&tag)));
    let inverted = repo.find_items_in_price_range(&ctx, base + 9, base).await.unwrap();
    assert!(inverted.is_empty());
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn duplicate_names_return_one_of_the_prices() {
    let repo = repository().await;
    let ctx = repo.session().context();
    let name = unique("twin");
    repo.insert_batch(&ctx, &[NewItem::new(name.clone(), 10), NewItem::new(name.clone(), 20)])
        .await
        .unwrap();

    let price = repo.find_price_by_name(&ctx, &name).await.unwrap();
    assert!(price == 10 || price == 20, "got {price}");
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn expired_deadline_is_a_timeout() {
    let repo = repository().await;
    let ctx = CallContext::new(Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(5)).await;

    let err = repo.find_price_by_name(&ctx, "iphone").await.unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn cancellation_only_affects_its_own_call() {
    let repo = repository().await;
    let token = CancellationToken::new();
    let doomed = CallContext::with_token(Duration::from_secs(5), token.clone());
    token.cancel();

    let name = unique("survivor");
    let err = repo
        .insert_one(&doomed, &NewItem::new(name.clone(), 1))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());

    let ctx = repo.session().context();
    repo.insert_one(&ctx, &NewItem::new(name.clone(), 2)).await.unwrap();
    assert_eq!(repo.find_price_by_name(&ctx, &name).await.unwrap(), 2);
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn concurrent_callers_share_one_session() {
    let repo = repository().await;
    let tag = unique("parallel");

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let repo = repo.clone();
            let name = format!("{tag}-{i}");
            tokio::spawn(async move {
                let ctx = repo.session().context();
                repo.insert_one(&ctx, &NewItem::new(name.clone(), i)).await?;
                repo.find_price_by_name(&ctx, &name).await
            })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap().unwrap(), i as i32);
    }
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn end_to_end_catalog_scenario() {
    // A dedicated database so the fixed names and prices do not collide
    // with other tests.
    let mut settings = settings();
    settings.name = format!("catalog_e2e_{}", Uuid::new_v4().simple());
    let session: Session = acquire_session(&settings).await.unwrap();
    ensure_schema(&session, &session.context()).await.unwrap();
    let repo = ItemRepository::new(session.clone());
    let ctx = session.context();

    repo.insert_one(&ctx, &NewItem::new("iphone", 950)).await.unwrap();
    let created = repo
        .insert_batch(&ctx, &[NewItem::new("Galaxy", 990), NewItem::new("iPad", 500)])
        .await
        .unwrap();
    assert_eq!(created, 2);

    assert_eq!(repo.find_price_by_name(&ctx, "iphone").await.unwrap(), 950);

    let found: HashMap<String, i32> = repo
        .find_items_in_price_range(&ctx, 900, 1000)
        .await
        .unwrap()
        .into_iter()
        .map(|item| (item.name, item.price))
        .collect();
    assert_eq!(
        found,
        HashMap::from([("iphone".to_string(), 950), ("Galaxy".to_string(), 990)])
    );

    sqlx::query(&format!("DROP DATABASE `{}`", settings.name))
        .execute(session.pool())
        .await
        .unwrap();
    session.close().await;
}

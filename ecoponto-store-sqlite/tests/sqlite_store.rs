use std::sync::Arc;
use std::time::Duration;

use ecoponto_core::{
    AssetBaseUrl, CategoryCatalog, CategoryId, NewPoint, PointCriteria, PointError, PointFilter,
    PointService, PointStore, PointSubmission, StateCode,
};
use ecoponto_store_sqlite::{SqliteCategoryCatalog, SqlitePointStore, backend};
use sqlx::{Connection, SqliteConnection, SqlitePool};
use tempfile::TempDir;

const BASE: &str = "http://192.168.0.10:3333/uploads/";

fn new_point(name: &str, city: &str, uf: &str) -> NewPoint {
    NewPoint {
        name: name.to_owned(),
        email: "contato@example.com".to_owned(),
        whatsapp: "47988887777".to_owned(),
        latitude: -27.2,
        longitude: -49.6,
        city: city.to_owned(),
        state: StateCode::parse(uf).expect("valid state"),
        image_reference: format!("{name}.jpg"),
    }
}

fn eco_ponto(categories: &[i64]) -> PointSubmission {
    PointSubmission {
        name: "Eco Ponto".to_owned(),
        email: "eco@ponto.com.br".to_owned(),
        whatsapp: "47999990000".to_owned(),
        latitude: -27.19,
        longitude: -49.64,
        city: "Rio do Sul".to_owned(),
        state: "SC".to_owned(),
        image_reference: "1598034352-eco.jpg".to_owned(),
        category_ids: categories.iter().copied().map(CategoryId).collect(),
    }
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count rows")
}

/// File-backed pool in `dir`, migrated, together with its URL.
async fn file_pool(dir: &TempDir, max_connections: u32) -> (SqlitePool, String) {
    let url = format!("sqlite://{}", dir.path().join("ecoponto.db").display());
    let pool = ecoponto_store_sqlite::connect(&url, max_connections)
        .await
        .expect("file database");
    ecoponto_store_sqlite::migrate(&pool).await.expect("migrations");
    (pool, url)
}

#[sqlx::test(migrator = "ecoponto_store_sqlite::MIGRATOR")]
async fn catalog_is_seeded(pool: SqlitePool) {
    let catalog = SqliteCategoryCatalog::new(pool);

    let categories = catalog.all().await.expect("catalog");
    let names: Vec<&str> = categories.iter().map(|category| category.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Lâmpadas",
            "Pilhas e Baterias",
            "Papéis e Papelão",
            "Resíduos Eletrônicos",
            "Resíduos Orgânicos",
            "Óleo de Cozinha",
        ],
        "seeded in id order"
    );
    assert!(catalog.exists(CategoryId(6)).await.expect("lookup"), "6 exists");
    assert!(!catalog.exists(CategoryId(7)).await.expect("lookup"), "7 does not");
}

#[sqlx::test(migrator = "ecoponto_store_sqlite::MIGRATOR")]
async fn join_yields_one_row_per_matching_association(pool: SqlitePool) {
    let store = SqlitePointStore::new(pool);
    let first = store
        .insert(&new_point("A", "Rio do Sul", "SC"), &[CategoryId(1), CategoryId(2)])
        .await
        .expect("insert");
    let second = store
        .insert(&new_point("B", "Blumenau", "SC"), &[CategoryId(2)])
        .await
        .expect("insert");

    let all = store.query(&PointFilter::default()).await.expect("query");
    let rows: Vec<(i64, i64)> = all
        .iter()
        .map(|row| (row.point.id.0, row.category_id.0))
        .collect();
    assert_eq!(
        rows,
        vec![(first.id.0, 1), (first.id.0, 2), (second.id.0, 2)],
        "adjacent per point, ordered by category"
    );

    let by_city = store
        .query(&PointFilter {
            city: Some("Blumenau".to_owned()),
            ..PointFilter::default()
        })
        .await
        .expect("query");
    assert_eq!(by_city.len(), 1, "city restricts points");

    let by_category = store
        .query(&PointFilter {
            category_ids: vec![CategoryId(1), CategoryId(99)],
            ..PointFilter::default()
        })
        .await
        .expect("query");
    assert_eq!(by_category.len(), 1, "only the category 1 association of A");
}

#[sqlx::test(migrator = "ecoponto_store_sqlite::MIGRATOR")]
async fn failed_association_rolls_back_point(pool: SqlitePool) {
    let store = SqlitePointStore::new(pool.clone());

    // Category 99 violates the foreign key after the point row was written.
    let result = store
        .insert(&new_point("A", "Rio do Sul", "SC"), &[CategoryId(1), CategoryId(99)])
        .await;
    assert!(matches!(result, Err(PointError::StorageFailure(_))), "{result:?}");
    assert_eq!(count(&pool, "points").await, 0, "point row rolled back");
    assert_eq!(count(&pool, "point_categories").await, 0, "associations rolled back");
}

#[sqlx::test(migrator = "ecoponto_store_sqlite::MIGRATOR")]
async fn store_refuses_points_without_categories(pool: SqlitePool) {
    let store = SqlitePointStore::new(pool.clone());
    let result = store.insert(&new_point("A", "Rio do Sul", "SC"), &[]).await;
    assert!(matches!(result, Err(PointError::NoCategorySelected)), "{result:?}");
    assert_eq!(count(&pool, "points").await, 0, "nothing written");
}

#[sqlx::test(migrator = "ecoponto_store_sqlite::MIGRATOR")]
async fn registration_is_readable_through_every_filter(pool: SqlitePool) {
    let service = PointService::new(backend(pool), AssetBaseUrl::new(BASE));

    let created = service.create(eco_ponto(&[1, 2])).await.expect("created");
    assert_eq!(created.name, "Eco Ponto", "name echoed");
    assert_eq!(
        created.image_url,
        format!("{BASE}1598034352-eco.jpg"),
        "image url derived"
    );

    let by_location = service
        .find(PointCriteria::any().with_state("SC").with_city("Rio do Sul"))
        .await
        .expect("find");
    assert_eq!(by_location, vec![created.clone()], "exactly the new point");

    let by_category = service
        .find(PointCriteria::any().with_categories([CategoryId(2)]))
        .await
        .expect("find");
    assert!(by_category.contains(&created), "category 2 matches");

    let both = service
        .find(PointCriteria::any().with_categories([CategoryId(1), CategoryId(2)]))
        .await
        .expect("find");
    assert_eq!(both.len(), 1, "deduplicated across two matching associations");

    let unknown = service
        .find(PointCriteria::any().with_categories([CategoryId(99)]))
        .await
        .expect("unknown ids are not an error");
    assert!(unknown.is_empty(), "category 99 matches nothing");

    let elsewhere = service
        .find(PointCriteria::any().with_state("PR"))
        .await
        .expect("find");
    assert!(elsewhere.is_empty(), "other state");
}

#[sqlx::test(migrator = "ecoponto_store_sqlite::MIGRATOR")]
async fn unknown_category_persists_nothing(pool: SqlitePool) {
    let service = PointService::new(backend(pool.clone()), AssetBaseUrl::new(BASE));

    let result = service.create(eco_ponto(&[1, 99])).await;
    assert!(
        matches!(result, Err(PointError::UnknownCategory(CategoryId(99)))),
        "{result:?}"
    );
    assert_eq!(count(&pool, "points").await, 0, "no point row");
    assert_eq!(count(&pool, "point_categories").await, 0, "no association rows");
}

#[sqlx::test(migrator = "ecoponto_store_sqlite::MIGRATOR")]
async fn uncategorised_rows_stay_hidden(pool: SqlitePool) {
    sqlx::query(
        "INSERT INTO points (image, name, email, whatsapp, latitude, longitude, city, uf) \
         VALUES ('x.jpg', 'Legacy', 'l@x.com', '0', 0, 0, 'Rio do Sul', 'SC')",
    )
    .execute(&pool)
    .await
    .expect("raw insert");

    let service = PointService::new(backend(pool), AssetBaseUrl::new(BASE));
    let found = service.find(PointCriteria::any()).await.expect("find");
    assert!(found.is_empty(), "point without associations is not discoverable");
}

#[sqlx::test(migrator = "ecoponto_store_sqlite::MIGRATOR")]
async fn show_lists_category_names(pool: SqlitePool) {
    let service = PointService::new(backend(pool), AssetBaseUrl::new(BASE));
    let created = service.create(eco_ponto(&[6, 1])).await.expect("created");

    let detail = service.show(created.id).await.expect("shown");
    assert_eq!(detail.summary, created, "summary");
    assert_eq!(detail.email, "eco@ponto.com.br", "contact kept");
    assert_eq!(detail.categories, vec!["Lâmpadas", "Óleo de Cozinha"], "by category id");
}

#[sqlx::test(migrator = "ecoponto_store_sqlite::MIGRATOR")]
async fn huge_category_filters_bind_as_one_parameter(pool: SqlitePool) {
    let service = PointService::new(backend(pool), AssetBaseUrl::new(BASE));
    let created = service.create(eco_ponto(&[1])).await.expect("created");

    let found = service
        .find(PointCriteria::any().with_categories((1..=300_000).map(CategoryId)))
        .await
        .expect("large filters are not a storage failure");
    assert_eq!(found, vec![created], "category 1 is inside the range");

    let unknown = service
        .find(PointCriteria::any().with_categories((1_000..101_000).map(CategoryId)))
        .await
        .expect("unknown ids are not an error");
    assert!(unknown.is_empty(), "no seeded category in range");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_commit_independently() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (pool, _) = file_pool(&dir, 4).await;
    let service = Arc::new(PointService::new(backend(pool.clone()), AssetBaseUrl::new(BASE)));

    let tasks: Vec<_> = (0..8)
        .map(|n| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let mut submission = eco_ponto(&[1, 2]);
                submission.name = format!("Eco Ponto {n}");
                service.create(submission).await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.expect("task joined").expect("created").id);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8, "every registration got its own id");

    let found = service
        .find(PointCriteria::any().with_state("SC"))
        .await
        .expect("find");
    assert_eq!(found.len(), 8, "all committed points visible");
    assert_eq!(count(&pool, "point_categories").await, 16, "two associations each");
}

#[tokio::test]
async fn cancelled_registration_leaves_nothing_behind() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (pool, url) = file_pool(&dir, 1).await;
    let service = PointService::new(backend(pool.clone()), AssetBaseUrl::new(BASE));

    // Another connection holds the write lock, so the insert stalls inside its transaction.
    let mut writer = SqliteConnection::connect(&url).await.expect("writer");
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut writer)
        .await
        .expect("write lock");

    let stalled = tokio::time::timeout(
        Duration::from_millis(200),
        service.create(eco_ponto(&[1, 2])),
    )
    .await;
    assert!(stalled.is_err(), "create dropped while waiting on the lock");

    sqlx::query("ROLLBACK")
        .execute(&mut writer)
        .await
        .expect("release lock");
    writer.close().await.expect("close writer");

    assert_eq!(count(&pool, "points").await, 0, "no point row");
    assert_eq!(count(&pool, "point_categories").await, 0, "no association rows");

    let created = service
        .create(eco_ponto(&[1]))
        .await
        .expect("pool connection usable again");
    let found = service.find(PointCriteria::any()).await.expect("find");
    assert_eq!(found, vec![created], "only the later registration exists");
}

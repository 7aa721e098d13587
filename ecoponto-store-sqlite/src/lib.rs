//! Storage backend for ecoponto backed by SQLite through sqlx.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tracing::{debug, warn};

use ecoponto_core::{
    backend::StorageBackend,
    model::{Category, CategoryId, NewPoint, Point, PointFilter, PointId, PointMatch, StateCode},
    ports::{CategoryCatalog, PointError, PointStore},
};

/// Schema and catalog seed migrations embedded at build time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const POINT_COLUMNS: &str =
    "p.id, p.name, p.email, p.whatsapp, p.latitude, p.longitude, p.city, p.uf, p.image";

#[derive(thiserror::Error, Debug)]
enum RowError {
    #[error("stored point {id} has a malformed state code")]
    MalformedState {
        id: i64,
        #[source]
        source: PointError,
    },
}

/// Row of the `points` table.
#[derive(Debug, FromRow)]
struct PointRow {
    id: i64,
    name: String,
    email: String,
    whatsapp: String,
    latitude: f64,
    longitude: f64,
    city: String,
    uf: String,
    image: String,
}

impl PointRow {
    fn into_point(self) -> Result<Point, PointError> {
        let id = self.id;
        let state = StateCode::parse(self.uf)
            .map_err(|source| PointError::storage(RowError::MalformedState { id, source }))?;

        Ok(Point {
            id: PointId(id),
            name: self.name,
            email: self.email,
            whatsapp: self.whatsapp,
            latitude: self.latitude,
            longitude: self.longitude,
            city: self.city,
            state,
            image_reference: self.image,
        })
    }
}

/// Row of the association-to-point join.
#[derive(Debug, FromRow)]
struct JoinedRow {
    #[sqlx(flatten)]
    point: PointRow,
    category_id: i64,
}

/// Row of the `categories` table.
#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    title: String,
    image: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId(row.id),
            name: row.title,
            image_reference: row.image,
        }
    }
}

/// Open a connection pool for a `sqlite:` URL, creating the database file when missing.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] when the URL is invalid or the database cannot be opened.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// Open a private in-memory database held by a single long-lived connection.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] when the connection cannot be established.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    // Every connection to `:memory:` is its own database, so the pool must never rotate it.
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Apply pending schema migrations, including the category seed.
///
/// # Errors
///
/// Returns a [`MigrateError`] when a migration fails or the history is inconsistent.
pub async fn migrate(pool: &SqlitePool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Category catalog read from the `categories` table on every call.
#[derive(Debug, Clone)]
pub struct SqliteCategoryCatalog {
    pool: SqlitePool,
}

impl SqliteCategoryCatalog {
    /// Create a catalog bound to the given pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryCatalog for SqliteCategoryCatalog {
    async fn exists(&self, id: CategoryId) -> Result<bool, PointError> {
        let found: i64 = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = ?)")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(PointError::storage)?;

        Ok(found != 0)
    }

    async fn all(&self) -> Result<Vec<Category>, PointError> {
        let rows = sqlx::query_as::<_, CategoryRow>("SELECT id, title, image FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(PointError::storage)?;

        Ok(rows.into_iter().map(Category::from).collect())
    }
}

/// Points and their category associations stored in `points` and `point_categories`.
#[derive(Debug, Clone)]
pub struct SqlitePointStore {
    pool: SqlitePool,
}

impl SqlitePointStore {
    /// Create a point store bound to the given pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PointStore for SqlitePointStore {
    async fn query(&self, filter: &PointFilter) -> Result<Vec<PointMatch>, PointError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {POINT_COLUMNS}, pc.category_id \
             FROM point_categories pc \
             INNER JOIN points p ON p.id = pc.point_id \
             WHERE 1 = 1"
        ));

        if let Some(state) = &filter.state {
            builder.push(" AND p.uf = ");
            builder.push_bind(state.as_str().to_owned());
        }

        if let Some(city) = &filter.city {
            builder.push(" AND p.city = ");
            builder.push_bind(city.clone());
        }

        // One bound JSON array, whatever the number of ids.
        if !filter.category_ids.is_empty() {
            let ids = serde_json::to_string(&filter.category_ids).map_err(PointError::storage)?;
            builder.push(" AND pc.category_id IN (SELECT value FROM json_each(");
            builder.push_bind(ids);
            builder.push("))");
        }

        builder.push(" ORDER BY p.id, pc.category_id");

        let rows = builder
            .build_query_as::<JoinedRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(PointError::storage)?;

        debug!(rows = rows.len(), "point join fetched");

        rows.into_iter()
            .map(|row| -> Result<PointMatch, PointError> {
                Ok(PointMatch {
                    point: row.point.into_point()?,
                    category_id: CategoryId(row.category_id),
                })
            })
            .collect()
    }

    async fn insert(
        &self,
        point: &NewPoint,
        category_ids: &[CategoryId],
    ) -> Result<Point, PointError> {
        if category_ids.is_empty() {
            return Err(PointError::NoCategorySelected);
        }

        // Dropping `tx` before commit rolls the whole registration back.
        let mut tx = self.pool.begin().await.map_err(PointError::storage)?;

        let id = sqlx::query(
            "INSERT INTO points (image, name, email, whatsapp, latitude, longitude, city, uf) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(point.image_reference.as_str())
        .bind(point.name.as_str())
        .bind(point.email.as_str())
        .bind(point.whatsapp.as_str())
        .bind(point.latitude)
        .bind(point.longitude)
        .bind(point.city.as_str())
        .bind(point.state.as_str())
        .execute(&mut *tx)
        .await
        .map_err(PointError::storage)?
        .last_insert_rowid();

        for category_id in category_ids {
            sqlx::query("INSERT INTO point_categories (point_id, category_id) VALUES (?, ?)")
                .bind(id)
                .bind(category_id.0)
                .execute(&mut *tx)
                .await
                .map_err(|err| {
                    warn!(
                        point = id,
                        category = %category_id,
                        error = %err,
                        "association insert failed, rolling back"
                    );
                    PointError::storage(err)
                })?;
        }

        tx.commit().await.map_err(PointError::storage)?;

        Ok(Point {
            id: PointId(id),
            name: point.name.clone(),
            email: point.email.clone(),
            whatsapp: point.whatsapp.clone(),
            latitude: point.latitude,
            longitude: point.longitude,
            city: point.city.clone(),
            state: point.state.clone(),
            image_reference: point.image_reference.clone(),
        })
    }

    async fn get(&self, id: PointId) -> Result<Option<Point>, PointError> {
        let row = sqlx::query_as::<_, PointRow>(&format!(
            "SELECT {POINT_COLUMNS} FROM points p WHERE p.id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(PointError::storage)?;

        row.map(PointRow::into_point).transpose()
    }

    async fn categories_of(&self, id: PointId) -> Result<Vec<Category>, PointError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT c.id, c.title, c.image \
             FROM categories c \
             INNER JOIN point_categories pc ON pc.category_id = c.id \
             WHERE pc.point_id = ? \
             ORDER BY c.id",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(PointError::storage)?;

        Ok(rows.into_iter().map(Category::from).collect())
    }
}

/// Build the storage backend bundle over a migrated pool.
#[must_use]
pub fn backend(pool: SqlitePool) -> StorageBackend {
    let catalog: Arc<dyn CategoryCatalog> = Arc::new(SqliteCategoryCatalog::new(pool.clone()));
    let points: Arc<dyn PointStore> = Arc::new(SqlitePointStore::new(pool));

    StorageBackend::new(catalog, points)
}

use crate::collection::models::{
    CollectionStats, EnumCasing, MediaItem, MediaStatus, MediaType, MediaTypeStats,
};
use crate::collection::query::{MediaQuery, Page};
use crate::store::StoreError;
use crate::users::User;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

const ITEM_COLUMNS: &str = "id, title, media_type, platform, status, rating, price, \
    price_last_updated, is_favorite, quantity, barcode, release_year, publisher, genre, \
    condition, notes, image_url, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    casing: EnumCasing,
}

#[derive(Debug, FromRow)]
struct MediaItemRow {
    id: Uuid,
    title: String,
    media_type: String,
    platform: Option<String>,
    status: String,
    rating: Option<Decimal>,
    price: Option<Decimal>,
    price_last_updated: Option<DateTime<Utc>>,
    is_favorite: bool,
    quantity: i32,
    barcode: Option<String>,
    release_year: Option<i32>,
    publisher: Option<String>,
    genre: Option<String>,
    condition: Option<String>,
    notes: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MediaItemRow> for MediaItem {
    type Error = StoreError;

    fn try_from(row: MediaItemRow) -> Result<Self, Self::Error> {
        let media_type = MediaType::parse(&row.media_type)
            .ok_or_else(|| StoreError::Corrupt(format!("media_type `{}`", row.media_type)))?;
        let status = MediaStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("status `{}`", row.status)))?;
        Ok(MediaItem {
            id: row.id,
            title: row.title,
            media_type,
            platform: row.platform,
            status,
            rating: row.rating,
            price: row.price,
            price_last_updated: row.price_last_updated,
            is_favorite: row.is_favorite,
            quantity: row.quantity,
            barcode: row.barcode,
            release_year: row.release_year,
            publisher: row.publisher,
            genre: row.genre,
            condition: row.condition,
            notes: row.notes,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TypeStatsRow {
    media_type: String,
    total_items: i64,
    total_quantity: i64,
    total_value: Decimal,
    average_rating: Option<Decimal>,
    favorites_count: i64,
}

/// Escapes LIKE metacharacters so user input only ever matches literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &MediaQuery) {
    builder.push(" WHERE TRUE");
    if let Some(kind) = query.media_type {
        builder
            .push(" AND lower(media_type) = ")
            .push_bind(kind.canonical().to_ascii_lowercase());
    }
    if let Some(platform) = &query.platform {
        builder.push(" AND platform = ").push_bind(platform.clone());
    }
    if let Some(status) = query.status {
        builder
            .push(" AND lower(status) = ")
            .push_bind(status.canonical().to_ascii_lowercase());
    }
    if let Some(favorite) = query.is_favorite {
        builder.push(" AND is_favorite = ").push_bind(favorite);
    }
    if let Some(needle) = &query.search {
        let pattern = like_pattern(needle);
        builder
            .push(" AND (lower(title) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(publisher) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(genre) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(notes) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

impl PgStore {
    pub fn new(pool: PgPool, casing: EnumCasing) -> Self {
        Self { pool, casing }
    }

    pub async fn list_items(&self, query: &MediaQuery) -> Result<Page<MediaItem>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM media_items");
        push_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {ITEM_COLUMNS} FROM media_items"));
        push_filters(&mut select, query);
        let direction = if query.descending {
            "DESC NULLS FIRST"
        } else {
            "ASC NULLS LAST"
        };
        select
            .push(format!(" ORDER BY {} {direction}, id ASC", query.sort.column()))
            .push(" LIMIT ")
            .push_bind(i64::from(query.page_size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
        let rows = select
            .build_query_as::<MediaItemRow>()
            .fetch_all(&self.pool)
            .await?;
        debug!(
            target = "media.store",
            total = total,
            returned = rows.len(),
            "media_items_listed"
        );

        let items = rows
            .into_iter()
            .map(MediaItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or_default(),
            page: query.page,
            page_size: query.page_size,
        })
    }

    pub async fn get_item(&self, id: Uuid) -> Result<Option<MediaItem>, StoreError> {
        let row: Option<MediaItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM media_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(MediaItem::try_from).transpose()
    }

    pub async fn insert_item(&self, item: &MediaItem) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO media_items ({ITEM_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)"
        ))
        .bind(item.id)
        .bind(&item.title)
        .bind(item.media_type.render(self.casing))
        .bind(&item.platform)
        .bind(item.status.render(self.casing))
        .bind(item.rating)
        .bind(item.price)
        .bind(item.price_last_updated)
        .bind(item.is_favorite)
        .bind(item.quantity)
        .bind(&item.barcode)
        .bind(item.release_year)
        .bind(&item.publisher)
        .bind(&item.genre)
        .bind(&item.condition)
        .bind(&item.notes)
        .bind(&item.image_url)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_item(&self, item: &MediaItem) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE media_items SET title = $2, media_type = $3, platform = $4, status = $5, \
             rating = $6, price = $7, price_last_updated = $8, is_favorite = $9, quantity = $10, \
             barcode = $11, release_year = $12, publisher = $13, genre = $14, condition = $15, \
             notes = $16, image_url = $17, updated_at = $18 WHERE id = $1",
        )
        .bind(item.id)
        .bind(&item.title)
        .bind(item.media_type.render(self.casing))
        .bind(&item.platform)
        .bind(item.status.render(self.casing))
        .bind(item.rating)
        .bind(item.price)
        .bind(item.price_last_updated)
        .bind(item.is_favorite)
        .bind(item.quantity)
        .bind(&item.barcode)
        .bind(item.release_year)
        .bind(&item.publisher)
        .bind(&item.genre)
        .bind(&item.condition)
        .bind(&item.notes)
        .bind(&item.image_url)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_item(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM media_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn owned_stats(&self) -> Result<CollectionStats, StoreError> {
        let rows: Vec<TypeStatsRow> = sqlx::query_as(
            "SELECT lower(media_type) AS media_type, \
                    COUNT(*) AS total_items, \
                    COALESCE(SUM(quantity), 0)::BIGINT AS total_quantity, \
                    COALESCE(SUM(COALESCE(price, 0) * quantity), 0) AS total_value, \
                    AVG(rating) AS average_rating, \
                    COUNT(*) FILTER (WHERE is_favorite) AS favorites_count \
             FROM media_items WHERE lower(status) = $1 \
             GROUP BY lower(media_type)",
        )
        .bind(MediaStatus::Owned.canonical().to_ascii_lowercase())
        .fetch_all(&self.pool)
        .await?;

        let groups = rows
            .into_iter()
            .map(|row| {
                let media_type = MediaType::parse(&row.media_type).ok_or_else(|| {
                    StoreError::Corrupt(format!("media_type `{}`", row.media_type))
                })?;
                Ok(MediaTypeStats {
                    media_type,
                    total_items: u64::try_from(row.total_items).unwrap_or_default(),
                    total_quantity: row.total_quantity,
                    total_value: row.total_value,
                    average_rating: row.average_rating.map(|avg| avg.round_dp(2)),
                    favorites_count: u64::try_from(row.favorites_count).unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(CollectionStats::from_groups(groups))
    }

    /// `column` is always one of our own static column names.
    pub async fn distinct(&self, column: &'static str) -> Result<Vec<String>, StoreError> {
        let values = sqlx::query_scalar::<_, String>(&format!(
            "SELECT DISTINCT {column} FROM media_items \
             WHERE {column} IS NOT NULL AND trim({column}) <> '' ORDER BY {column}"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let inserted = sqlx::query(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;
        match inserted {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateUsername)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}

use crate::collection::models::{
    CollectionStats, EnumCasing, ItemFields, MediaItem, MediaStatus, MediaType, MediaTypeStats,
};
use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

const SCOPE: &str = "media_items";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItemDto {
    pub id: Uuid,
    pub title: String,
    pub media_type: String,
    pub platform: Option<String>,
    pub status: String,
    pub rating: Option<Decimal>,
    pub price: Option<Decimal>,
    pub price_last_updated: Option<DateTime<Utc>>,
    pub is_favorite: bool,
    pub quantity: i32,
    pub barcode: Option<String>,
    pub release_year: Option<i32>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub condition: Option<String>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaItemDto {
    pub fn from_item(item: MediaItem, casing: EnumCasing) -> Self {
        Self {
            id: item.id,
            title: item.title,
            media_type: item.media_type.render(casing),
            platform: item.platform,
            status: item.status.render(casing),
            rating: item.rating,
            price: item.price,
            price_last_updated: item.price_last_updated,
            is_favorite: item.is_favorite,
            quantity: item.quantity,
            barcode: item.barcode,
            release_year: item.release_year,
            publisher: item.publisher,
            genre: item.genre,
            condition: item.condition,
            notes: item.notes,
            image_url: item.image_url,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMediaItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rating: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMediaItem {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: CreateMediaItem,
}

fn bounded(
    field: &'static str,
    value: Option<String>,
    max_chars: usize,
) -> Result<Option<String>, ServiceError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if value.as_ref().is_some_and(|v| v.chars().count() > max_chars) {
        return Err(ServiceError::invalid_argument(
            SCOPE,
            format!("{field} must be at most {max_chars} characters"),
        ));
    }
    Ok(value)
}

/// Largest price a `NUMERIC(10,2)` column holds.
pub fn max_price() -> Decimal {
    Decimal::new(99_999_999, 2)
}

/// Bounds for a standalone price change.
pub fn check_price(price: Decimal) -> Result<Decimal, ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::invalid_argument(
            SCOPE,
            "Price cannot be negative",
        ));
    }
    in_range("price", Some(price), Decimal::ZERO, max_price())?;
    Ok(price)
}

fn in_range(
    field: &'static str,
    value: Option<Decimal>,
    min: Decimal,
    max: Decimal,
) -> Result<Option<Decimal>, ServiceError> {
    match value {
        Some(v) if v < min || v > max => Err(ServiceError::invalid_argument(
            SCOPE,
            format!("{field} must be between {min} and {max}"),
        )),
        other => Ok(other),
    }
}

impl CreateMediaItem {
    pub fn validate(self) -> Result<ItemFields, ServiceError> {
        let title = bounded("title", self.title, 500)?
            .ok_or_else(|| ServiceError::invalid_argument(SCOPE, "Title is required."))?;

        let raw_type = self.media_type.unwrap_or_default();
        let media_type = MediaType::parse(&raw_type).ok_or_else(|| {
            ServiceError::invalid_argument(SCOPE, format!("Invalid media type: {raw_type}"))
        })?;

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => MediaStatus::default(),
            Some(raw) => MediaStatus::parse(raw).ok_or_else(|| {
                ServiceError::invalid_argument(SCOPE, format!("Invalid status: {raw}"))
            })?,
        };

        let quantity = self.quantity.unwrap_or(1);
        if quantity < 0 {
            return Err(ServiceError::invalid_argument(
                SCOPE,
                "quantity cannot be negative",
            ));
        }

        Ok(ItemFields {
            title,
            media_type,
            platform: bounded("platform", self.platform, 100)?,
            status,
            rating: in_range("rating", self.rating, Decimal::ZERO, Decimal::from(5))?,
            price: in_range("price", self.price, Decimal::ZERO, max_price())?,
            is_favorite: self.is_favorite,
            quantity,
            barcode: bounded("barcode", self.barcode, 50)?,
            release_year: self.release_year,
            publisher: bounded("publisher", self.publisher, 200)?,
            genre: bounded("genre", self.genre, 100)?,
            condition: bounded("condition", self.condition, 50)?,
            notes: self
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            image_url: bounded("imageUrl", self.image_url, 500)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePrice {
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdated {
    pub price: Option<Decimal>,
    pub price_last_updated: Option<DateTime<Utc>>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTypeStatsDto {
    pub media_type: String,
    pub total_items: u64,
    pub total_quantity: i64,
    pub total_value: Decimal,
    pub average_rating: Option<Decimal>,
    pub favorites_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStatsDto {
    pub total_items: u64,
    pub total_value: Decimal,
    pub total_favorites: u64,
    pub by_media_type: Vec<MediaTypeStatsDto>,
}

impl CollectionStatsDto {
    pub fn from_stats(stats: CollectionStats, casing: EnumCasing) -> Self {
        Self {
            total_items: stats.total_items,
            total_value: stats.total_value,
            total_favorites: stats.total_favorites,
            by_media_type: stats
                .by_media_type
                .into_iter()
                .map(|group: MediaTypeStats| MediaTypeStatsDto {
                    media_type: group.media_type.render(casing),
                    total_items: group.total_items,
                    total_quantity: group.total_quantity,
                    total_value: group.total_value,
                    average_rating: group.average_rating,
                    favorites_count: group.favorites_count,
                })
                .collect(),
        }
    }
}

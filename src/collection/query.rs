use crate::collection::models::{MediaItem, MediaStatus, MediaType};
use crate::error::ServiceError;
use serde::Deserialize;
use std::cmp::Ordering;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

/// Raw query-string parameters of the list endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub media_type: Option<String>,
    pub platform: Option<String>,
    pub status: Option<String>,
    pub is_favorite: Option<bool>,
    pub search_term: Option<String>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub descending: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Title,
    Rating,
    Price,
    CreatedAt,
    UpdatedAt,
}

impl SortKey {
    /// Unknown keys fall back to title.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace('_', "").as_str() {
            "rating" => SortKey::Rating,
            "price" => SortKey::Price,
            "createdat" => SortKey::CreatedAt,
            "updatedat" => SortKey::UpdatedAt,
            _ => SortKey::Title,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::Rating => "rating",
            SortKey::Price => "price",
            SortKey::CreatedAt => "created_at",
            SortKey::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaQuery {
    pub media_type: Option<MediaType>,
    pub platform: Option<String>,
    pub status: Option<MediaStatus>,
    pub is_favorite: Option<bool>,
    /// Lowercased search needle.
    pub search: Option<String>,
    pub sort: SortKey,
    pub descending: bool,
    pub page: u32,
    pub page_size: u32,
}

impl Default for MediaQuery {
    fn default() -> Self {
        Self {
            media_type: None,
            platform: None,
            status: None,
            is_favorite: None,
            search: None,
            sort: SortKey::Title,
            descending: false,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<ListParams> for MediaQuery {
    type Error = ServiceError;

    fn try_from(params: ListParams) -> Result<Self, Self::Error> {
        let media_type = match non_blank(params.media_type) {
            Some(raw) => Some(MediaType::parse(&raw).ok_or_else(|| {
                ServiceError::invalid_argument("media_items", format!("Invalid media type: {raw}"))
            })?),
            None => None,
        };
        let status = match non_blank(params.status) {
            Some(raw) => Some(MediaStatus::parse(&raw).ok_or_else(|| {
                ServiceError::invalid_argument("media_items", format!("Invalid status: {raw}"))
            })?),
            None => None,
        };
        Ok(Self {
            media_type,
            platform: non_blank(params.platform),
            status,
            is_favorite: params.is_favorite,
            search: non_blank(params.search_term).map(|term| term.to_lowercase()),
            sort: params
                .sort_by
                .as_deref()
                .map(SortKey::parse)
                .unwrap_or_default(),
            descending: params.descending,
            page: params.page.unwrap_or(1).max(1),
            page_size: params
                .page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        })
    }
}

impl MediaQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn matches(&self, item: &MediaItem) -> bool {
        self.media_type.is_none_or(|kind| item.media_type == kind)
            && self
                .platform
                .as_deref()
                .is_none_or(|platform| item.platform.as_deref() == Some(platform))
            && self.status.is_none_or(|status| item.status == status)
            && self
                .is_favorite
                .is_none_or(|favorite| item.is_favorite == favorite)
            && self
                .search
                .as_deref()
                .is_none_or(|needle| item.mentions(needle))
    }

    /// Missing values sort last ascending and first descending; titles ignore
    /// case. Ties break on id.
    pub fn compare(&self, a: &MediaItem, b: &MediaItem) -> Ordering {
        let primary = match self.sort {
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortKey::Rating => nulls_last(a.rating, b.rating),
            SortKey::Price => nulls_last(a.price, b.price),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        let primary = if self.descending {
            primary.reverse()
        } else {
            primary
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::models::{ItemFields, tests::fields};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn item(f: ItemFields) -> MediaItem {
        MediaItem::create(f, Utc::now())
    }

    #[test]
    fn params_are_normalized() {
        let query = MediaQuery::try_from(ListParams {
            media_type: Some("videogame".into()),
            status: Some("  ".into()),
            search_term: Some("  Zelda ".into()),
            sort_by: Some("CreatedAt".into()),
            page: Some(0),
            page_size: Some(10_000),
            ..ListParams::default()
        })
        .unwrap();
        assert_eq!(query.media_type, Some(MediaType::VideoGame));
        assert_eq!(query.status, None);
        assert_eq!(query.search.as_deref(), Some("zelda"));
        assert_eq!(query.sort, SortKey::CreatedAt);
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, MAX_PAGE_SIZE);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn unknown_enum_filters_are_rejected() {
        let err = MediaQuery::try_from(ListParams {
            media_type: Some("laserdisc".into()),
            ..ListParams::default()
        })
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        let err = MediaQuery::try_from(ListParams {
            status: Some("borrowed".into()),
            ..ListParams::default()
        })
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn unknown_sort_key_falls_back_to_title() {
        assert_eq!(SortKey::parse("popularity"), SortKey::Title);
        assert_eq!(SortKey::parse("updated_at"), SortKey::UpdatedAt);
        assert_eq!(SortKey::parse("PRICE"), SortKey::Price);
    }

    #[test]
    fn offset_follows_page() {
        let query = MediaQuery {
            page: 3,
            page_size: 20,
            ..MediaQuery::default()
        };
        assert_eq!(query.offset(), 40);
    }

    #[test]
    fn filters_combine() {
        let mut fav = fields("Earthbound");
        fav.is_favorite = true;
        let fav = item(fav);
        let mut other = fields("Chrono Trigger");
        other.platform = Some("DS".into());
        let other = item(other);

        let query = MediaQuery {
            platform: Some("SNES".into()),
            is_favorite: Some(true),
            ..MediaQuery::default()
        };
        assert!(query.matches(&fav));
        assert!(!query.matches(&other));

        let query = MediaQuery {
            search: Some("chrono".into()),
            ..MediaQuery::default()
        };
        assert!(!query.matches(&fav));
        assert!(query.matches(&other));
    }

    #[test]
    fn missing_prices_sort_last_ascending_first_descending() {
        let mut cheap = fields("A");
        cheap.price = Some(Decimal::new(500, 2));
        let mut dear = fields("B");
        dear.price = Some(Decimal::new(9000, 2));
        let unpriced = fields("C");
        let mut items = vec![item(unpriced), item(dear), item(cheap)];

        let asc = MediaQuery {
            sort: SortKey::Price,
            ..MediaQuery::default()
        };
        items.sort_by(|a, b| asc.compare(a, b));
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["A", "B", "C"]);

        let desc = MediaQuery {
            sort: SortKey::Price,
            descending: true,
            ..MediaQuery::default()
        };
        items.sort_by(|a, b| desc.compare(a, b));
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["C", "B", "A"]);
    }

    #[test]
    fn title_sort_ignores_case() {
        let mut items = vec![item(fields("Zork")), item(fields("zelda")), item(fields("Akira"))];
        let query = MediaQuery::default();
        items.sort_by(|a, b| query.compare(a, b));
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Akira", "zelda", "Zork"]);
    }
}

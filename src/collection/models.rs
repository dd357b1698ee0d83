use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::env;
use uuid::Uuid;

/// Text form used for enum values in storage and responses, fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCasing {
    #[default]
    Pascal,
    Lower,
}

impl EnumCasing {
    pub fn from_env() -> Self {
        env::var("MEDIA_ENUM_CASING")
            .ok()
            .and_then(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pascal" => Some(Self::Pascal),
            "lower" | "lowercase" => Some(Self::Lower),
            _ => None,
        }
    }

    fn apply(self, canonical: &'static str) -> String {
        match self {
            EnumCasing::Pascal => canonical.to_string(),
            EnumCasing::Lower => canonical.to_ascii_lowercase(),
        }
    }
}

fn same_name(raw: &str, canonical: &str) -> bool {
    let folded: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect();
    folded.eq_ignore_ascii_case(canonical)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MediaType {
    VideoGame,
    Dvd,
    Vhs,
    Cd,
    Book,
    Manga,
}

impl MediaType {
    pub const ALL: [MediaType; 6] = [
        MediaType::VideoGame,
        MediaType::Dvd,
        MediaType::Vhs,
        MediaType::Cd,
        MediaType::Book,
        MediaType::Manga,
    ];

    pub fn canonical(&self) -> &'static str {
        match self {
            MediaType::VideoGame => "VideoGame",
            MediaType::Dvd => "DVD",
            MediaType::Vhs => "VHS",
            MediaType::Cd => "CD",
            MediaType::Book => "Book",
            MediaType::Manga => "Manga",
        }
    }

    pub fn render(&self, casing: EnumCasing) -> String {
        casing.apply(self.canonical())
    }

    /// Case-insensitive; `video_game` and `Video Game` are accepted too.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| same_name(raw.trim(), kind.canonical()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MediaStatus {
    #[default]
    Owned,
    Wishlist,
    Sold,
    Loaned,
    Lost,
}

impl MediaStatus {
    pub const ALL: [MediaStatus; 5] = [
        MediaStatus::Owned,
        MediaStatus::Wishlist,
        MediaStatus::Sold,
        MediaStatus::Loaned,
        MediaStatus::Lost,
    ];

    pub fn canonical(&self) -> &'static str {
        match self {
            MediaStatus::Owned => "Owned",
            MediaStatus::Wishlist => "Wishlist",
            MediaStatus::Sold => "Sold",
            MediaStatus::Loaned => "Loaned",
            MediaStatus::Lost => "Lost",
        }
    }

    pub fn render(&self, casing: EnumCasing) -> String {
        casing.apply(self.canonical())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| same_name(raw.trim(), status.canonical()))
    }
}

/// Validated field set shared by create and full update.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFields {
    pub title: String,
    pub media_type: MediaType,
    pub platform: Option<String>,
    pub status: MediaStatus,
    pub rating: Option<Decimal>,
    pub price: Option<Decimal>,
    pub is_favorite: bool,
    pub quantity: i32,
    pub barcode: Option<String>,
    pub release_year: Option<i32>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub condition: Option<String>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub id: Uuid,
    pub title: String,
    pub media_type: MediaType,
    pub platform: Option<String>,
    pub status: MediaStatus,
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

impl MediaItem {
    pub fn create(fields: ItemFields, now: DateTime<Utc>) -> Self {
        let price_last_updated = fields.price.map(|_| now);
        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            media_type: fields.media_type,
            platform: fields.platform,
            status: fields.status,
            rating: fields.rating,
            price: fields.price,
            price_last_updated,
            is_favorite: fields.is_favorite,
            quantity: fields.quantity,
            barcode: fields.barcode,
            release_year: fields.release_year,
            publisher: fields.publisher,
            genre: fields.genre,
            condition: fields.condition,
            notes: fields.notes,
            image_url: fields.image_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full replacement of every editable field. The price stamp only moves
    /// when the price changes to a present value.
    pub fn apply(&mut self, fields: ItemFields, now: DateTime<Utc>) {
        if fields.price != self.price && fields.price.is_some() {
            self.price_last_updated = Some(now);
        }
        self.title = fields.title;
        self.media_type = fields.media_type;
        self.platform = fields.platform;
        self.status = fields.status;
        self.rating = fields.rating;
        self.price = fields.price;
        self.is_favorite = fields.is_favorite;
        self.quantity = fields.quantity;
        self.barcode = fields.barcode;
        self.release_year = fields.release_year;
        self.publisher = fields.publisher;
        self.genre = fields.genre;
        self.condition = fields.condition;
        self.notes = fields.notes;
        self.image_url = fields.image_url;
        self.updated_at = now;
    }

    pub fn set_price(&mut self, price: Decimal, now: DateTime<Utc>) {
        if self.price != Some(price) {
            self.price_last_updated = Some(now);
        }
        self.price = Some(price);
        self.updated_at = now;
    }

    /// Case-insensitive substring match over title, publisher, genre and notes.
    /// `needle` must already be lowercase.
    pub fn mentions(&self, needle: &str) -> bool {
        let hit = |value: Option<&str>| {
            value.is_some_and(|v| v.to_lowercase().contains(needle))
        };
        hit(Some(&self.title))
            || hit(self.publisher.as_deref())
            || hit(self.genre.as_deref())
            || hit(self.notes.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaTypeStats {
    pub media_type: MediaType,
    pub total_items: u64,
    pub total_quantity: i64,
    pub total_value: Decimal,
    pub average_rating: Option<Decimal>,
    pub favorites_count: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectionStats {
    pub total_items: u64,
    pub total_value: Decimal,
    pub total_favorites: u64,
    pub by_media_type: Vec<MediaTypeStats>,
}

impl CollectionStats {
    /// Builds overall totals from per-type groups; groups are ordered by media type.
    pub fn from_groups(mut groups: Vec<MediaTypeStats>) -> Self {
        groups.sort_by_key(|group| group.media_type);
        Self {
            total_items: groups.iter().map(|g| g.total_items).sum(),
            total_value: groups.iter().map(|g| g.total_value).sum(),
            total_favorites: groups.iter().map(|g| g.favorites_count).sum(),
            by_media_type: groups,
        }
    }

    /// Statistics over owned items only.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a MediaItem>) -> Self {
        let mut groups: Vec<(MediaTypeStats, Decimal, u64)> = Vec::new();
        for item in items
            .into_iter()
            .filter(|item| item.status == MediaStatus::Owned)
        {
            let slot = match groups
                .iter()
                .position(|(group, _, _)| group.media_type == item.media_type)
            {
                Some(idx) => idx,
                None => {
                    groups.push((
                        MediaTypeStats {
                            media_type: item.media_type,
                            total_items: 0,
                            total_quantity: 0,
                            total_value: Decimal::ZERO,
                            average_rating: None,
                            favorites_count: 0,
                        },
                        Decimal::ZERO,
                        0,
                    ));
                    groups.len() - 1
                }
            };
            let (group, rating_sum, rating_count) = &mut groups[slot];
            group.total_items += 1;
            group.total_quantity += i64::from(item.quantity);
            group.total_value += item.price.unwrap_or(Decimal::ZERO) * Decimal::from(item.quantity);
            if item.is_favorite {
                group.favorites_count += 1;
            }
            if let Some(rating) = item.rating {
                *rating_sum += rating;
                *rating_count += 1;
            }
        }
        let groups = groups
            .into_iter()
            .map(|(mut group, rating_sum, rating_count)| {
                if rating_count > 0 {
                    group.average_rating =
                        Some((rating_sum / Decimal::from(rating_count)).round_dp(2));
                }
                group
            })
            .collect();
        Self::from_groups(groups)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    pub(crate) fn fields(title: &str) -> ItemFields {
        ItemFields {
            title: title.to_string(),
            media_type: MediaType::VideoGame,
            platform: Some("SNES".into()),
            status: MediaStatus::Owned,
            rating: None,
            price: None,
            is_favorite: false,
            quantity: 1,
            barcode: None,
            release_year: Some(1995),
            publisher: Some("Nintendo".into()),
            genre: Some("RPG".into()),
            condition: None,
            notes: None,
            image_url: None,
        }
    }

    #[test]
    fn enum_names_parse_case_insensitively() {
        assert_eq!(MediaType::parse("videogame"), Some(MediaType::VideoGame));
        assert_eq!(MediaType::parse("Video_Game"), Some(MediaType::VideoGame));
        assert_eq!(MediaType::parse("dvd"), Some(MediaType::Dvd));
        assert_eq!(MediaType::parse("laserdisc"), None);
        assert_eq!(MediaStatus::parse("WISHLIST"), Some(MediaStatus::Wishlist));
        assert_eq!(MediaStatus::parse(""), None);
    }

    #[test]
    fn casing_is_applied_when_rendering() {
        assert_eq!(MediaType::Dvd.render(EnumCasing::Pascal), "DVD");
        assert_eq!(MediaType::VideoGame.render(EnumCasing::Lower), "videogame");
        assert_eq!(MediaStatus::Owned.render(EnumCasing::Lower), "owned");
        assert_eq!(EnumCasing::parse("LOWER"), Some(EnumCasing::Lower));
        assert_eq!(EnumCasing::parse("kebab"), None);
    }

    #[test]
    fn create_stamps_price_only_when_present() {
        let now = Utc::now();
        let item = MediaItem::create(fields("Earthbound"), now);
        assert_eq!(item.price_last_updated, None);
        assert_eq!(item.created_at, now);
        assert_eq!(item.updated_at, now);

        let mut priced = fields("Earthbound");
        priced.price = Some(dec("250.00"));
        let item = MediaItem::create(priced, now);
        assert_eq!(item.price_last_updated, Some(now));
    }

    #[test]
    fn update_restamps_price_only_on_change() {
        let created = Utc::now();
        let mut priced = fields("Earthbound");
        priced.price = Some(dec("250.00"));
        let mut item = MediaItem::create(priced.clone(), created);

        let later = created + Duration::minutes(5);
        item.apply(priced.clone(), later);
        assert_eq!(item.price_last_updated, Some(created));
        assert_eq!(item.updated_at, later);

        let latest = later + Duration::minutes(5);
        priced.price = Some(dec("275.00"));
        item.apply(priced.clone(), latest);
        assert_eq!(item.price_last_updated, Some(latest));

        let cleared_at = latest + Duration::minutes(5);
        priced.price = None;
        item.apply(priced, cleared_at);
        assert_eq!(item.price, None);
        assert_eq!(item.price_last_updated, Some(latest));
    }

    #[test]
    fn set_price_stamps_on_change() {
        let created = Utc::now();
        let mut item = MediaItem::create(fields("Earthbound"), created);
        let later = created + Duration::minutes(1);
        item.set_price(dec("10.00"), later);
        assert_eq!(item.price_last_updated, Some(later));

        let same = later + Duration::minutes(1);
        item.set_price(dec("10.0"), same);
        assert_eq!(item.price_last_updated, Some(later));
        assert_eq!(item.updated_at, same);
    }

    #[test]
    fn mentions_searches_text_fields() {
        let mut item = MediaItem::create(fields("Earthbound"), Utc::now());
        item.notes = Some("Complete In Box".into());
        assert!(item.mentions("earth"));
        assert!(item.mentions("nintendo"));
        assert!(item.mentions("in box"));
        assert!(!item.mentions("sega"));
    }

    #[test]
    fn stats_cover_owned_items_only() {
        let now = Utc::now();
        let mut a = fields("Earthbound");
        a.price = Some(dec("200.00"));
        a.quantity = 2;
        a.rating = Some(dec("5"));
        a.is_favorite = true;
        let mut b = fields("Chrono Trigger");
        b.rating = Some(dec("4"));
        let mut c = fields("Akira");
        c.media_type = MediaType::Manga;
        c.price = Some(dec("12.50"));
        let mut d = fields("Wishlisted");
        d.status = MediaStatus::Wishlist;
        d.price = Some(dec("999.00"));

        let items: Vec<MediaItem> = [a, b, c, d]
            .into_iter()
            .map(|f| MediaItem::create(f, now))
            .collect();
        let stats = CollectionStats::from_items(&items);

        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.total_value, dec("412.50"));
        assert_eq!(stats.total_favorites, 1);
        assert_eq!(stats.by_media_type.len(), 2);

        let games = &stats.by_media_type[0];
        assert_eq!(games.media_type, MediaType::VideoGame);
        assert_eq!(games.total_items, 2);
        assert_eq!(games.total_quantity, 3);
        assert_eq!(games.total_value, dec("400.00"));
        assert_eq!(games.average_rating, Some(dec("4.5")));

        let manga = &stats.by_media_type[1];
        assert_eq!(manga.media_type, MediaType::Manga);
        assert_eq!(manga.average_rating, None);
    }
}

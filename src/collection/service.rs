use crate::collection::dto::{
    CollectionStatsDto, CreateMediaItem, MediaItemDto, PriceUpdated, UpdateMediaItem, check_price,
};
use crate::collection::models::{EnumCasing, MediaItem};
use crate::collection::query::{ListParams, MediaQuery, Page};
use crate::error::ServiceError;
use crate::store::Store;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

const SCOPE: &str = "media_items";

#[derive(Clone)]
pub struct CollectionService {
    store: Store,
    casing: EnumCasing,
}

impl CollectionService {
    pub fn new(store: Store, casing: EnumCasing) -> Self {
        Self { store, casing }
    }

    fn dto(&self, item: MediaItem) -> MediaItemDto {
        MediaItemDto::from_item(item, self.casing)
    }

    fn missing(id: Uuid) -> ServiceError {
        ServiceError::not_found(SCOPE, format!("Media item {id} not found."))
    }

    pub async fn list(&self, params: ListParams) -> Result<Page<MediaItemDto>, ServiceError> {
        let query = MediaQuery::try_from(params)?;
        let page = self.store.list_items(&query).await?;
        Ok(Page {
            items: page.items.into_iter().map(|item| self.dto(item)).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<MediaItemDto, ServiceError> {
        let item = self
            .store
            .get_item(id)
            .await?
            .ok_or_else(|| Self::missing(id))?;
        Ok(self.dto(item))
    }

    pub async fn create(&self, input: CreateMediaItem) -> Result<MediaItemDto, ServiceError> {
        let fields = input.validate()?;
        let item = MediaItem::create(fields, Utc::now());
        self.store.insert_item(&item).await?;
        info!(
            target = "media.store",
            id = %item.id,
            media_type = item.media_type.canonical(),
            "media_item_created"
        );
        Ok(self.dto(item))
    }

    pub async fn update(&self, id: Uuid, input: UpdateMediaItem) -> Result<(), ServiceError> {
        if input.id != id {
            return Err(ServiceError::invalid_argument(SCOPE, "ID mismatch"));
        }
        let mut item = self
            .store
            .get_item(id)
            .await?
            .ok_or_else(|| Self::missing(id))?;
        let fields = input.fields.validate()?;
        item.apply(fields, Utc::now());
        if !self.store.update_item(&item).await? {
            return Err(Self::missing(id));
        }
        info!(target = "media.store", id = %id, "media_item_updated");
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete_item(id).await? {
            return Err(Self::missing(id));
        }
        info!(target = "media.store", id = %id, "media_item_deleted");
        Ok(())
    }

    pub async fn update_price(&self, id: Uuid, price: Decimal) -> Result<PriceUpdated, ServiceError> {
        let mut item = self
            .store
            .get_item(id)
            .await?
            .ok_or_else(|| Self::missing(id))?;
        let price = check_price(price)?;
        item.set_price(price, Utc::now());
        if !self.store.update_item(&item).await? {
            return Err(Self::missing(id));
        }
        Ok(PriceUpdated {
            price: item.price,
            price_last_updated: item.price_last_updated,
        })
    }

    pub async fn stats(&self) -> Result<CollectionStatsDto, ServiceError> {
        let stats = self.store.owned_stats().await?;
        Ok(CollectionStatsDto::from_stats(stats, self.casing))
    }

    pub async fn platforms(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.distinct_platforms().await?)
    }

    pub async fn genres(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.distinct_genres().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn service() -> CollectionService {
        CollectionService::new(Store::memory(), EnumCasing::Pascal)
    }

    fn create_input(value: serde_json::Value) -> CreateMediaItem {
        serde_json::from_value(value).unwrap()
    }

    fn update_input(id: Uuid, mut value: serde_json::Value) -> UpdateMediaItem {
        value["id"] = json!(id);
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn created_items_can_be_fetched() {
        let svc = service();
        let created = svc
            .create(create_input(json!({"title": "Earthbound", "mediaType": "videogame", "price": 250})))
            .await
            .unwrap();
        assert_eq!(created.media_type, "VideoGame");
        assert!(created.price_last_updated.is_some());
        let fetched = svc.get(created.id).await.unwrap();
        assert_eq!(fetched.title, "Earthbound");
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let svc = service();
        let id = Uuid::new_v4();
        assert_eq!(svc.get(id).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(svc.delete(id).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            svc.update_price(id, Decimal::ONE).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        let update = update_input(id, json!({"title": "x", "mediaType": "Book"}));
        assert_eq!(
            svc.update(id, update).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn update_requires_matching_ids() {
        let svc = service();
        let created = svc
            .create(create_input(json!({"title": "Akira", "mediaType": "Manga"})))
            .await
            .unwrap();
        let update = update_input(Uuid::new_v4(), json!({"title": "Akira", "mediaType": "Manga"}));
        let err = svc.update(created.id, update).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.detail(), "ID mismatch");
    }

    #[tokio::test]
    async fn update_replaces_fields_and_stamps_price_on_change() {
        let svc = service();
        let created = svc
            .create(create_input(json!({"title": "Akira", "mediaType": "Manga", "genre": "SciFi"})))
            .await
            .unwrap();
        assert_eq!(created.price_last_updated, None);

        let update = update_input(
            created.id,
            json!({"title": "Akira Vol. 1", "mediaType": "Manga", "price": 12.5, "status": "Wishlist"}),
        );
        svc.update(created.id, update).await.unwrap();
        let updated = svc.get(created.id).await.unwrap();
        assert_eq!(updated.title, "Akira Vol. 1");
        assert_eq!(updated.status, "Wishlist");
        assert_eq!(updated.genre, None);
        assert!(updated.price_last_updated.is_some());
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn negative_price_patch_is_rejected() {
        let svc = service();
        let created = svc
            .create(create_input(json!({"title": "Akira", "mediaType": "Manga"})))
            .await
            .unwrap();
        let err = svc
            .update_price(created.id, Decimal::new(-1, 2))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.detail(), "Price cannot be negative");

        let patched = svc
            .update_price(created.id, Decimal::new(1999, 2))
            .await
            .unwrap();
        assert_eq!(patched.price, Some(Decimal::new(1999, 2)));
        assert!(patched.price_last_updated.is_some());
    }

    #[tokio::test]
    async fn list_filters_and_reports_totals() {
        let svc = service();
        for (title, kind, platform) in [
            ("Earthbound", "VideoGame", Some("SNES")),
            ("Chrono Trigger", "VideoGame", Some("SNES")),
            ("Halo", "VideoGame", Some("Xbox")),
            ("Akira", "Manga", None),
        ] {
            svc.create(create_input(
                json!({"title": title, "mediaType": kind, "platform": platform}),
            ))
            .await
            .unwrap();
        }

        let page = svc
            .list(ListParams {
                platform: Some("SNES".into()),
                page_size: Some(1),
                ..ListParams::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Chrono Trigger");

        let err = svc
            .list(ListParams {
                media_type: Some("Betamax".into()),
                ..ListParams::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        assert_eq!(svc.platforms().await.unwrap(), ["SNES", "Xbox"]);
    }

    #[tokio::test]
    async fn stats_render_with_configured_casing() {
        let svc = CollectionService::new(Store::memory(), EnumCasing::Lower);
        svc.create(create_input(
            json!({"title": "Akira", "mediaType": "Manga", "price": 10, "quantity": 3, "rating": 4}),
        ))
        .await
        .unwrap();
        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.total_items, 1);
        assert_eq!(stats.total_value, Decimal::from(30));
        assert_eq!(stats.by_media_type[0].media_type, "manga");
        assert_eq!(stats.by_media_type[0].average_rating, Some(Decimal::from(4)));
    }

    #[tokio::test]
    async fn price_patch_above_column_bound_is_rejected() {
        let svc = service();
        let created = svc
            .create(create_input(json!({"title": "Akira", "mediaType": "Manga", "quantity": 2})))
            .await
            .unwrap();
        for price in [Decimal::from(1_000_000), Decimal::MAX] {
            let err = svc.update_price(created.id, price).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        let item = svc.get(created.id).await.unwrap();
        assert_eq!(item.price, None);

        let patched = svc
            .update_price(created.id, Decimal::new(99_999_999, 2))
            .await
            .unwrap();
        assert_eq!(patched.price, Some(Decimal::new(99_999_999, 2)));
        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.total_value, Decimal::new(199_999_998, 2));
    }
}

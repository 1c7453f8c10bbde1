//! Resource Clients
//!
//! Typed clients over the transport, one per collection. Create and update
//! go through the same upsert endpoint, keyed on whether the payload
//! carries a store id. Nothing here retries; the transport owns that.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{
    Activity, Doc, Donation, Entity, Expense, Experience, GalleryItem, HealthStatus, HeroSlide,
    Member, OrderUpdate, Payment, RemoteId, ReorderRequest, WeeklyFeeRecord,
};
use crate::client::Transport;

/// Client for one plain entity collection.
pub struct CollectionClient<T> {
    transport: Arc<Transport>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for CollectionClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> CollectionClient<T> {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            transport,
            _marker: PhantomData,
        }
    }

    fn path(&self) -> String {
        format!("/api/{}", T::COLLECTION)
    }

    pub async fn list_all(&self) -> Result<Vec<Doc<T>>> {
        self.transport.get(&self.path()).await
    }

    pub async fn create(&self, data: &T) -> Result<Doc<T>> {
        self.transport
            .post(&self.path(), &Doc::new(data.clone()))
            .await
    }

    pub async fn update(&self, id: &RemoteId, data: &T) -> Result<Doc<T>> {
        self.transport
            .post(&self.path(), &Doc::with_id(id.clone(), data.clone()))
            .await
    }

    /// Delete by wire id. Takes a raw string so callers can fall back to a
    /// local handle when no remote id was ever assigned.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .transport
            .delete(&format!("{}/{}", self.path(), id))
            .await?;
        Ok(())
    }
}

/// Client for weekly fee records and their payment sub-resources.
#[derive(Clone)]
pub struct WeeklyFeesClient {
    transport: Arc<Transport>,
}

impl WeeklyFeesClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list_all(&self) -> Result<Vec<Doc<WeeklyFeeRecord>>> {
        self.transport.get("/api/weekly-fees").await
    }

    pub async fn member_fees(&self, member: &RemoteId) -> Result<Doc<WeeklyFeeRecord>> {
        self.transport
            .get(&format!("/api/weekly-fees/{member}"))
            .await
    }

    pub async fn add_payment(
        &self,
        member: &RemoteId,
        payment: &Payment,
    ) -> Result<Doc<WeeklyFeeRecord>> {
        self.transport
            .post(&format!("/api/weekly-fees/{member}"), payment)
            .await
    }

    pub async fn update_payment(
        &self,
        member: &RemoteId,
        payment_id: &str,
        payment: &Payment,
    ) -> Result<Doc<WeeklyFeeRecord>> {
        self.transport
            .put(&format!("/api/weekly-fees/{member}/{payment_id}"), payment)
            .await
    }

    pub async fn delete_payment(
        &self,
        member: &RemoteId,
        payment_id: &str,
    ) -> Result<Doc<WeeklyFeeRecord>> {
        self.transport
            .delete(&format!("/api/weekly-fees/{member}/{payment_id}"))
            .await
    }
}

/// Client for the gallery collection plus its top-five endpoints.
#[derive(Clone)]
pub struct GalleryClient {
    pub items: CollectionClient<GalleryItem>,
    transport: Arc<Transport>,
}

impl GalleryClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            items: CollectionClient::new(Arc::clone(&transport)),
            transport,
        }
    }

    pub async fn fetch_top_five(&self) -> Result<Vec<Doc<GalleryItem>>> {
        self.transport.get("/api/gallery/top5").await
    }

    pub async fn toggle_top_five(&self, id: &RemoteId) -> Result<Doc<GalleryItem>> {
        self.transport
            .put_empty(&format!("/api/gallery/toggle-top5/{id}"))
            .await
    }

    pub async fn reorder(&self, items: &[OrderUpdate]) -> Result<()> {
        let _: serde_json::Value = self
            .transport
            .put(
                "/api/gallery/update-order",
                &ReorderRequest {
                    items: items.to_vec(),
                },
            )
            .await?;
        Ok(())
    }
}

/// All resource clients over one shared transport.
pub struct Resources {
    transport: Arc<Transport>,
    pub hero_slides: CollectionClient<HeroSlide>,
    pub activities: CollectionClient<Activity>,
    pub members: CollectionClient<Member>,
    pub donations: CollectionClient<Donation>,
    pub expenses: CollectionClient<Expense>,
    pub experiences: CollectionClient<Experience>,
    pub weekly_fees: WeeklyFeesClient,
    pub gallery: GalleryClient,
}

impl Resources {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            hero_slides: CollectionClient::new(Arc::clone(&transport)),
            activities: CollectionClient::new(Arc::clone(&transport)),
            members: CollectionClient::new(Arc::clone(&transport)),
            donations: CollectionClient::new(Arc::clone(&transport)),
            expenses: CollectionClient::new(Arc::clone(&transport)),
            experiences: CollectionClient::new(Arc::clone(&transport)),
            weekly_fees: WeeklyFeesClient::new(Arc::clone(&transport)),
            gallery: GalleryClient::new(Arc::clone(&transport)),
            transport,
        }
    }

    /// Probe the health-check endpoint. Single attempt: the caller wants to
    /// know right now whether the store is reachable, not after a backoff.
    pub async fn health_check(&self) -> Result<HealthStatus> {
        self.transport.get_once("/api/health-check").await
    }
}

/// Binds an entity type to its client inside [`Resources`].
pub trait HasClient: Entity {
    fn client(resources: &Resources) -> &CollectionClient<Self>;
}

macro_rules! has_client {
    ($record:ty, $field:ident) => {
        impl HasClient for $record {
            fn client(resources: &Resources) -> &CollectionClient<Self> {
                &resources.$field
            }
        }
    };
}

has_client!(HeroSlide, hero_slides);
has_client!(Activity, activities);
has_client!(Member, members);
has_client!(Donation, donations);
has_client!(Expense, expenses);
has_client!(Experience, experiences);

impl HasClient for GalleryItem {
    fn client(resources: &Resources) -> &CollectionClient<Self> {
        &resources.gallery.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::spawn_test_server;
    use crate::config::RemoteConfig;
    use crate::notify::MemoryNotifier;
    use crate::store::Store;
    use chrono::NaiveDate;

    async fn setup() -> (Resources, Arc<Store>) {
        let store = Arc::new(Store::new());
        let addr = spawn_test_server(Arc::clone(&store)).await;
        let config = RemoteConfig {
            base_url: format!("http://{addr}"),
            timeout_secs: 5,
            max_attempts: 1,
            backoff_base_ms: 10,
        };
        let transport =
            Arc::new(Transport::new(&config, Arc::new(MemoryNotifier::new())).unwrap());
        (Resources::new(transport), store)
    }

    fn activity() -> Activity {
        Activity {
            title: "Weekend Football Tournament".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(),
            time: "09:00 - 17:00".to_string(),
            description: "A friendly tournament for all age groups".to_string(),
            image: String::new(),
            status: "upcoming".to_string(),
            kind: "tournament".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_update_delete_roundtrip() {
        let (resources, store) = setup().await;

        let created = resources.activities.create(&activity()).await.unwrap();
        let id = created.id.clone().unwrap();
        assert_eq!(store.activities.len().await, 1);

        let mut data = created.data.clone();
        data.status = "completed".to_string();
        let updated = resources.activities.update(&id, &data).await.unwrap();
        assert_eq!(updated.data.status, "completed");
        assert_eq!(store.activities.len().await, 1);

        resources.activities.delete(id.as_str()).await.unwrap();
        assert_eq!(store.activities.len().await, 0);
    }

    #[tokio::test]
    async fn test_health_check_deserializes() {
        let (resources, store) = setup().await;
        let health = resources.health_check().await.unwrap();
        assert!(health.database_connected());

        store.set_connected(false);
        let health = resources.health_check().await.unwrap();
        assert!(!health.database_connected());
    }

    #[tokio::test]
    async fn test_gallery_reorder_roundtrip() {
        let (resources, _store) = setup().await;

        let mut ids = Vec::new();
        for i in 0..2 {
            let item = GalleryItem {
                title: format!("photo-{i}"),
                description: None,
                image_url: format!("{i}.jpg"),
                is_top_five: false,
                top_five_order: 0,
            };
            let doc = resources.gallery.items.create(&item).await.unwrap();
            let id = doc.id.unwrap();
            resources.gallery.toggle_top_five(&id).await.unwrap();
            ids.push(id);
        }

        resources
            .gallery
            .reorder(&[
                OrderUpdate { id: ids[0].clone(), order: 2 },
                OrderUpdate { id: ids[1].clone(), order: 1 },
            ])
            .await
            .unwrap();

        let top = resources.gallery.fetch_top_five().await.unwrap();
        assert_eq!(top[0].data.title, "photo-1");
        assert_eq!(top[1].data.title, "photo-0");
    }
}

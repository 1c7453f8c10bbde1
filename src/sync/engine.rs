//! Bulk Synchronizer
//!
//! Runs full-state passes against the remote store: probe connectivity,
//! fan out one reconciliation task per cached entity, wait for all of them
//! regardless of individual outcome. Entity failures mark `needs_sync` and
//! are retried on the next pass; only an unreachable store aborts a pass.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::cache::{AppData, CacheSlot, SharedCache};
use crate::client::{HasClient, Resources};
use crate::error::Result;
use crate::model::{GalleryItem, LocalId, OrderUpdate, Payment, RemoteId};
use crate::notify::{MessageLevel, Notifier};
use crate::sync::reconcile::{reconcile_delete, reconcile_entity, reconcile_weekly_fee};
use crate::sync::{PassOutcome, PassReport};

type SyncTask = Pin<Box<dyn Future<Output = bool> + Send + 'static>>;

/// Drives synchronization between the shared cache and the remote store.
pub struct SyncEngine {
    cache: SharedCache,
    resources: Arc<Resources>,
    notifier: Arc<dyn Notifier>,
}

impl SyncEngine {
    pub fn new(cache: SharedCache, resources: Arc<Resources>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            cache,
            resources,
            notifier,
        }
    }

    pub fn cache(&self) -> SharedCache {
        Arc::clone(&self.cache)
    }

    pub fn resources(&self) -> Arc<Resources> {
        Arc::clone(&self.resources)
    }

    /// Fetch every collection in parallel and replace the cache with the
    /// remote state. Returns an error when the store is unreachable or any
    /// listing ultimately fails.
    pub async fn load_all(&self) -> Result<()> {
        self.notifier
            .notify(MessageLevel::Info, "Loading data from server...");

        match self.resources.health_check().await {
            Ok(health) if health.database_connected() => {}
            Ok(health) => {
                tracing::error!("store reports database {} on load", health.database);
                self.notifier.notify(
                    MessageLevel::Error,
                    "Cannot connect to server. Check that the backing store is configured.",
                );
                return Err(crate::Error::Network(
                    "store database disconnected".to_string(),
                ));
            }
            Err(e) => {
                tracing::error!("connectivity probe failed on load: {e}");
                self.notifier.notify(
                    MessageLevel::Error,
                    "Cannot connect to server. Check that the backing store is configured.",
                );
                return Err(e);
            }
        }

        let fetched = futures::try_join!(
            self.resources.hero_slides.list_all(),
            self.resources.activities.list_all(),
            self.resources.members.list_all(),
            self.resources.donations.list_all(),
            self.resources.expenses.list_all(),
            self.resources.experiences.list_all(),
            self.resources.weekly_fees.list_all(),
            self.resources.gallery.items.list_all(),
        );
        let (hero_slides, activities, members, donations, expenses, experiences, fees, gallery) =
            match fetched {
                Ok(collections) => collections,
                Err(e) => {
                    self.notifier
                        .notify(MessageLevel::Error, "Failed to load data from server.");
                    return Err(e);
                }
            };

        let mut data = self.cache.write().await;
        data.adopt(hero_slides);
        data.adopt(activities);
        data.adopt(members);
        data.adopt(donations);
        data.adopt(expenses);
        data.adopt(experiences);
        data.adopt_weekly_fees(fees);
        data.adopt(gallery);
        data.recompute_dashboard();
        drop(data);

        self.notifier
            .notify(MessageLevel::Success, "Data loaded successfully");
        Ok(())
    }

    /// Run one bulk synchronization pass.
    pub async fn run_pass(&self) -> PassReport {
        self.notifier
            .notify(MessageLevel::Info, "Synchronizing data with server...");

        match self.resources.health_check().await {
            Ok(health) if health.database_connected() => {}
            Ok(health) => {
                tracing::error!(
                    "store reports database {} (state {}), aborting pass",
                    health.database,
                    health.db_state
                );
                self.notify_unreachable();
                return PassReport::aborted();
            }
            Err(e) => {
                tracing::error!("connectivity probe failed: {e}");
                self.notify_unreachable();
                return PassReport::aborted();
            }
        }

        let pending_before = self.cache.read().await.pending_count();

        let mut labels = Vec::new();
        let mut tasks: Vec<SyncTask> = Vec::new();
        {
            let data = self.cache.read().await;
            // Gallery items whose last sync failed go ahead of everything
            // else in the dispatch order.
            self.queue_tasks::<GalleryItem>(&data, Some(true), &mut tasks, &mut labels);
            self.queue_tasks::<crate::model::HeroSlide>(&data, None, &mut tasks, &mut labels);
            self.queue_tasks::<crate::model::Activity>(&data, None, &mut tasks, &mut labels);
            self.queue_tasks::<crate::model::Member>(&data, None, &mut tasks, &mut labels);
            self.queue_tasks::<crate::model::Donation>(&data, None, &mut tasks, &mut labels);
            self.queue_tasks::<crate::model::Expense>(&data, None, &mut tasks, &mut labels);
            self.queue_tasks::<crate::model::Experience>(&data, None, &mut tasks, &mut labels);
            self.queue_tasks::<GalleryItem>(&data, Some(false), &mut tasks, &mut labels);
            for fee in &data.weekly_fees {
                let cache = Arc::clone(&self.cache);
                let client = self.resources.weekly_fees.clone();
                let local = fee.identity.local();
                labels.push(format!("weekly-fees:{local}"));
                tasks.push(Box::pin(async move {
                    reconcile_weekly_fee(&cache, &client, local).await
                }));
            }
        }

        // Fan out and wait for every task to settle; a failed entity never
        // short-circuits the rest of the pass.
        let results = futures::future::join_all(tasks).await;
        let failed = results.iter().filter(|ok| !**ok).count();

        self.cache.write().await.recompute_dashboard();

        let pending_after = self.cache.read().await.pending_count();
        let resolved = pending_before.saturating_sub(pending_after);
        if resolved > 0 {
            self.notifier.notify(
                MessageLevel::Success,
                &format!("{resolved} pending change(s) synchronized"),
            );
        }
        self.notifier
            .notify(MessageLevel::Success, "Data synchronized successfully");

        tracing::info!(
            "sync pass complete: {} task(s), {} failed, {} resolved",
            labels.len(),
            failed,
            resolved
        );

        PassReport {
            outcome: PassOutcome::Success,
            tasks: labels,
            failed,
            resolved,
        }
    }

    fn queue_tasks<T: CacheSlot + HasClient>(
        &self,
        data: &AppData,
        pending_filter: Option<bool>,
        tasks: &mut Vec<SyncTask>,
        labels: &mut Vec<String>,
    ) {
        for entry in T::entries(data) {
            if let Some(pending) = pending_filter {
                if entry.needs_sync != pending {
                    continue;
                }
            }
            let cache = Arc::clone(&self.cache);
            let client = T::client(&self.resources).clone();
            let local = entry.identity.local();
            labels.push(format!("{}:{local}", T::COLLECTION));
            tasks.push(Box::pin(async move {
                reconcile_entity(&cache, &client, local).await
            }));
        }
    }

    fn notify_unreachable(&self) {
        self.notifier.notify(
            MessageLevel::Error,
            "Cannot connect to server. Changes will only be saved locally.",
        );
    }

    /// Insert a new entity into the cache and reconcile it immediately.
    /// The entity stays cached (and retryable) even when the sync fails.
    pub async fn create_entity<T: CacheSlot + HasClient>(&self, data: T) -> (LocalId, bool) {
        let local = {
            let mut cache = self.cache.write().await;
            let local = cache.insert_local(data);
            cache.recompute_dashboard();
            local
        };
        let ok = reconcile_entity(&self.cache, T::client(&self.resources), local).await;
        (local, ok)
    }

    /// Replace an entity's payload and reconcile it.
    pub async fn update_entity<T: CacheSlot + HasClient>(&self, local: LocalId, data: T) -> bool {
        {
            let mut cache = self.cache.write().await;
            let Some(entry) = cache.find_mut::<T>(local) else {
                return false;
            };
            entry.data = data;
            cache.recompute_dashboard();
        }
        reconcile_entity(&self.cache, T::client(&self.resources), local).await
    }

    /// Remove an entity from the cache and reconcile the delete.
    pub async fn delete_entity<T: CacheSlot + HasClient>(&self, local: LocalId) -> bool {
        let removed = {
            let mut cache = self.cache.write().await;
            let removed = cache.remove::<T>(local);
            cache.recompute_dashboard();
            removed
        };
        let Some(removed) = removed else {
            return false;
        };
        reconcile_delete(T::client(&self.resources), &removed.identity).await
    }

    /// Record a payment against a cached fee record and push it.
    pub async fn record_payment(&self, fee: LocalId, payment: Payment) -> bool {
        {
            let mut cache = self.cache.write().await;
            if !cache.add_payment(fee, payment) {
                return false;
            }
            cache.recompute_dashboard();
        }
        reconcile_weekly_fee(&self.cache, &self.resources.weekly_fees, fee).await
    }

    /// Toggle a gallery item's top-five membership on the server and adopt
    /// the resulting flags locally. The hero slides regenerate server-side;
    /// the next load or pass picks them up.
    pub async fn toggle_gallery_top_five(&self, local: LocalId) -> bool {
        let identity = {
            let data = self.cache.read().await;
            data.find::<GalleryItem>(local).map(|t| t.identity.clone())
        };
        let Some(identity) = identity else {
            return false;
        };

        match self
            .resources
            .gallery
            .toggle_top_five(&RemoteId::new(identity.wire_id()))
            .await
        {
            Ok(doc) => {
                let mut data = self.cache.write().await;
                if let Some(entry) = data.find_mut::<GalleryItem>(local) {
                    entry.data.is_top_five = doc.data.is_top_five;
                    entry.data.top_five_order = doc.data.top_five_order;
                }
                true
            }
            Err(e) => {
                tracing::warn!("failed to toggle top-five for {local}: {e}");
                false
            }
        }
    }

    /// Push a client-side ordering of the top-five set.
    pub async fn reorder_gallery(&self, ordered: &[(LocalId, u32)]) -> bool {
        let updates: Vec<OrderUpdate> = {
            let data = self.cache.read().await;
            ordered
                .iter()
                .filter_map(|(local, order)| {
                    data.find::<GalleryItem>(*local).map(|t| OrderUpdate {
                        id: RemoteId::new(t.identity.wire_id()),
                        order: *order,
                    })
                })
                .collect()
        };

        match self.resources.gallery.reorder(&updates).await {
            Ok(()) => {
                let mut data = self.cache.write().await;
                for (local, order) in ordered {
                    if let Some(entry) = data.find_mut::<GalleryItem>(*local) {
                        entry.data.top_five_order = *order;
                    }
                }
                true
            }
            Err(e) => {
                tracing::warn!("failed to push gallery order: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::spawn_test_server;
    use crate::client::Transport;
    use crate::config::RemoteConfig;
    use crate::model::{Donation, GalleryItem, Member, PaymentStatus};
    use crate::notify::{MemoryNotifier, MessageLevel};
    use crate::store::Store;
    use chrono::NaiveDate;

    async fn setup() -> (SyncEngine, Arc<Store>, Arc<MemoryNotifier>) {
        let store = Arc::new(Store::new());
        let addr = spawn_test_server(Arc::clone(&store)).await;
        let notifier = Arc::new(MemoryNotifier::new());
        let transport = Arc::new(
            Transport::new(
                &RemoteConfig {
                    base_url: format!("http://{addr}"),
                    timeout_secs: 5,
                    max_attempts: 1,
                    backoff_base_ms: 10,
                },
                Arc::clone(&notifier) as Arc<dyn crate::notify::Notifier>,
            )
            .unwrap(),
        );
        let engine = SyncEngine::new(
            AppData::shared(),
            Arc::new(Resources::new(transport)),
            Arc::clone(&notifier) as Arc<dyn crate::notify::Notifier>,
        );
        (engine, store, notifier)
    }

    fn gallery_item(title: &str) -> GalleryItem {
        GalleryItem {
            title: title.to_string(),
            description: None,
            image_url: format!("{title}.jpg"),
            is_top_five: false,
            top_five_order: 0,
        }
    }

    fn donation(donor: &str, amount: f64) -> Donation {
        Donation {
            donor_name: donor.to_string(),
            amount,
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            purpose: "Equipment".to_string(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_disconnected_database_aborts_pass() {
        let (engine, store, _notifier) = setup().await;
        for i in 0..3 {
            store.gallery.insert(gallery_item(&format!("photo-{i}"))).await;
        }
        engine.load_all().await.unwrap();

        store.set_connected(false);
        let report = engine.run_pass().await;

        assert_eq!(report.outcome, PassOutcome::Aborted);
        assert_eq!(report.attempted(), 0);
        assert!(report.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_pending_gallery_items_dispatch_first() {
        let (engine, store, notifier) = setup().await;
        for i in 0..5 {
            store.gallery.insert(gallery_item(&format!("photo-{i}"))).await;
        }
        engine.load_all().await.unwrap();

        // Mark one item as previously failed.
        let cache = engine.cache();
        let flagged = {
            let mut data = cache.write().await;
            let entry = &mut data.gallery[2];
            entry.needs_sync = true;
            entry.identity.local()
        };

        let report = engine.run_pass().await;
        assert_eq!(report.outcome, PassOutcome::Success);
        assert_eq!(report.attempted(), 5);
        assert_eq!(report.tasks[0], format!("gallery:{flagged}"));
        assert_eq!(report.failed, 0);
        assert_eq!(report.resolved, 1);

        // The flag cleared and the resolution was reported.
        assert!(!cache.read().await.gallery.iter().any(|t| t.needs_sync));
        assert!(notifier
            .messages_at(MessageLevel::Success)
            .iter()
            .any(|m| m.contains("1 pending change(s) synchronized")));
    }

    #[tokio::test]
    async fn test_entity_failure_does_not_fail_pass() {
        let (engine, _store, _notifier) = setup().await;
        engine.load_all().await.unwrap();

        // An empty donor name fails server-side validation, so this entity
        // can never sync; the pass itself still succeeds.
        engine.cache().write().await.insert_local(donation("", 10.0));
        let good = engine.create_entity(donation("Alumni Association", 50.0)).await;
        assert!(good.1);

        let report = engine.run_pass().await;
        assert_eq!(report.outcome, PassOutcome::Success);
        assert_eq!(report.failed, 1);

        let cache = engine.cache();
        let data = cache.read().await;
        assert_eq!(data.donations.iter().filter(|t| t.needs_sync).count(), 1);
    }

    #[tokio::test]
    async fn test_offline_create_is_retried_by_later_pass() {
        let store = Arc::new(Store::new());
        let addr = spawn_test_server(Arc::clone(&store)).await;
        let notifier = Arc::new(MemoryNotifier::new());
        let cache = AppData::shared();

        // First engine points at a dead port: the create stays local.
        let dead = Arc::new(
            Transport::new(
                &RemoteConfig {
                    base_url: "http://127.0.0.1:9".to_string(),
                    timeout_secs: 1,
                    max_attempts: 1,
                    backoff_base_ms: 1,
                },
                Arc::clone(&notifier) as Arc<dyn crate::notify::Notifier>,
            )
            .unwrap(),
        );
        let offline = SyncEngine::new(
            Arc::clone(&cache),
            Arc::new(Resources::new(dead)),
            Arc::clone(&notifier) as Arc<dyn crate::notify::Notifier>,
        );
        let (local, ok) = offline.create_entity(donation("Anonymous Donor", 75.0)).await;
        assert!(!ok);
        assert!(cache.read().await.find::<Donation>(local).unwrap().needs_sync);

        // A pass against the live store persists it and promotes the id.
        let live = Arc::new(
            Transport::new(
                &RemoteConfig {
                    base_url: format!("http://{addr}"),
                    timeout_secs: 5,
                    max_attempts: 1,
                    backoff_base_ms: 10,
                },
                Arc::clone(&notifier) as Arc<dyn crate::notify::Notifier>,
            )
            .unwrap(),
        );
        let online = SyncEngine::new(
            Arc::clone(&cache),
            Arc::new(Resources::new(live)),
            Arc::clone(&notifier) as Arc<dyn crate::notify::Notifier>,
        );
        let report = online.run_pass().await;
        assert_eq!(report.outcome, PassOutcome::Success);
        assert_eq!(report.failed, 0);

        let data = cache.read().await;
        let entry = data.find::<Donation>(local).unwrap();
        assert!(entry.identity.is_persisted());
        assert!(!entry.needs_sync);
        assert_eq!(store.donations.len().await, 1);
    }

    #[tokio::test]
    async fn test_double_pass_leaves_remote_state_unchanged() {
        let (engine, store, _notifier) = setup().await;
        engine.load_all().await.unwrap();
        engine.create_entity(donation("Alumni Association", 90.0)).await;

        engine.run_pass().await;
        engine.run_pass().await;

        assert_eq!(store.donations.len().await, 1);
        let listed = store.list::<Donation>().await;
        assert_eq!(listed[0].data.amount, 90.0);
    }

    #[tokio::test]
    async fn test_load_all_adopts_remote_state() {
        let (engine, store, _notifier) = setup().await;
        store
            .upsert_member(crate::model::Doc::new(Member {
                name: "John Doe".to_string(),
                contact: "john@example.com".to_string(),
                phone: "+1-555-0100".to_string(),
                join_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                role: Member::STUDENT_ROLE.to_string(),
                image: String::new(),
            }))
            .await
            .unwrap();
        store.donations.insert(donation("Anonymous Donor", 500.0)).await;

        engine.load_all().await.unwrap();

        let cache = engine.cache();
        let data = cache.read().await;
        assert_eq!(data.members.len(), 1);
        assert_eq!(data.weekly_fees.len(), 1);
        assert!(data.members[0].identity.is_persisted());
        assert_eq!(data.dashboard.total_members, 1);
        assert_eq!(data.dashboard.total_donations, 500.0);
    }

    #[tokio::test]
    async fn test_payment_flow_updates_dashboard_and_store() {
        let (engine, store, _notifier) = setup().await;
        store
            .upsert_member(crate::model::Doc::new(Member {
                name: "Emily Williams".to_string(),
                contact: "emily@example.com".to_string(),
                phone: "+1-555-0103".to_string(),
                join_date: NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
                role: Member::STUDENT_ROLE.to_string(),
                image: String::new(),
            }))
            .await
            .unwrap();
        engine.load_all().await.unwrap();

        let fee_local = engine.cache().read().await.weekly_fees[0].identity.local();
        let ok = engine
            .record_payment(
                fee_local,
                Payment {
                    date: NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
                    amount: 20.0,
                    status: PaymentStatus::Paid,
                },
            )
            .await;
        assert!(ok);

        let cache = engine.cache();
        assert_eq!(cache.read().await.dashboard.fees_collected, 20.0);
        let fees = store.list::<crate::model::WeeklyFeeRecord>().await;
        assert_eq!(fees[0].data.payments.len(), 1);
    }
}

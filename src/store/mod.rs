//! Remote Document Store
//!
//! In-memory backing store for the REST surface: one keyed collection per
//! entity type with upsert-by-id semantics, server-assigned ids, and
//! creation/update stamps. Writes are last-write-wins; there is no
//! optimistic concurrency check.

mod gallery;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{
    Activity, Doc, Donation, Entity, Expense, Experience, GalleryItem, HealthStatus, HeroSlide,
    Member, Payment, RemoteId, WeeklyFeeRecord,
};

/// A persisted document: server id, stamps, payload.
#[derive(Debug, Clone, Serialize)]
pub struct Stored<T> {
    #[serde(rename = "_id")]
    pub id: RemoteId,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    /// Monotonic insertion order, used for stable listing.
    #[serde(skip)]
    pub seq: u64,
    #[serde(flatten)]
    pub data: T,
}

/// One keyed collection of documents.
#[derive(Debug)]
pub struct StoreCollection<T> {
    docs: RwLock<HashMap<String, Stored<T>>>,
    seq: AtomicU64,
}

impl<T> Default for StoreCollection<T> {
    fn default() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }
}

impl<T: Entity> StoreCollection<T> {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Insert a new document under a freshly assigned id.
    pub async fn insert(&self, data: T) -> Stored<T> {
        let now = Utc::now();
        let stored = Stored {
            id: RemoteId::generate(),
            created_at: now,
            updated_at: now,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            data,
        };
        let mut docs = self.docs.write().await;
        docs.insert(stored.id.to_string(), stored.clone());
        stored
    }

    /// Create or update depending on whether the doc carries an id.
    pub async fn upsert(&self, doc: Doc<T>) -> Result<Stored<T>> {
        match doc.id {
            Some(id) => {
                let mut docs = self.docs.write().await;
                let stored = docs.get_mut(id.as_str()).ok_or_else(|| {
                    Error::NotFound(format!("{} {} not found", T::COLLECTION, id))
                })?;
                stored.data = doc.data;
                stored.updated_at = Utc::now();
                Ok(stored.clone())
            }
            None => Ok(self.insert(doc.data).await),
        }
    }

    pub async fn get(&self, id: &str) -> Option<Stored<T>> {
        self.docs.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<Stored<T>> {
        self.docs.write().await.remove(id)
    }

    /// All documents, in insertion order.
    pub async fn list(&self) -> Vec<Stored<T>> {
        let docs = self.docs.read().await;
        let mut list: Vec<Stored<T>> = docs.values().cloned().collect();
        list.sort_by_key(|d| d.seq);
        list
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.docs.write().await.clear();
    }

    /// Run a closure against the raw document map under the write lock.
    /// Multi-document mutations (renumbering, cascades) go through here so
    /// they observe one consistent snapshot.
    pub async fn modify<R>(&self, f: impl FnOnce(&mut HashMap<String, Stored<T>>) -> R) -> R {
        let mut docs = self.docs.write().await;
        f(&mut docs)
    }
}

/// The backing store behind the REST surface.
#[derive(Debug, Default)]
pub struct Store {
    pub hero_slides: StoreCollection<HeroSlide>,
    pub activities: StoreCollection<Activity>,
    pub members: StoreCollection<Member>,
    pub donations: StoreCollection<Donation>,
    pub expenses: StoreCollection<Expense>,
    pub experiences: StoreCollection<Experience>,
    pub gallery: StoreCollection<GalleryItem>,
    pub weekly_fees: StoreCollection<WeeklyFeeRecord>,
    connected: AtomicBool,
}

/// Binds an entity type to its collection inside [`Store`], with the sort
/// order its listing endpoint uses.
pub trait StoreSlot: Entity {
    fn slot(store: &Store) -> &StoreCollection<Self>;

    fn sort(list: &mut Vec<Stored<Self>>) {
        list.sort_by_key(|d| d.seq);
    }
}

macro_rules! store_slot {
    ($record:ty, $field:ident) => {
        impl StoreSlot for $record {
            fn slot(store: &Store) -> &StoreCollection<Self> {
                &store.$field
            }
        }
    };
    ($record:ty, $field:ident, $sort:expr) => {
        impl StoreSlot for $record {
            fn slot(store: &Store) -> &StoreCollection<Self> {
                &store.$field
            }

            fn sort(list: &mut Vec<Stored<Self>>) {
                let sort: fn(&mut Vec<Stored<Self>>) = $sort;
                sort(list);
            }
        }
    };
}

store_slot!(HeroSlide, hero_slides);
store_slot!(Activity, activities, |list| {
    list.sort_by(|a, b| b.data.date.cmp(&a.data.date))
});
store_slot!(Member, members, |list| {
    list.sort_by(|a, b| a.data.name.cmp(&b.data.name))
});
store_slot!(Donation, donations, |list| {
    list.sort_by(|a, b| b.data.date.cmp(&a.data.date))
});
store_slot!(Expense, expenses, |list| {
    list.sort_by(|a, b| b.data.date.cmp(&a.data.date))
});
store_slot!(Experience, experiences, |list| {
    list.sort_by(|a, b| b.data.date.cmp(&a.data.date))
});
store_slot!(GalleryItem, gallery, |list| {
    list.sort_by(|a, b| b.seq.cmp(&a.seq))
});
store_slot!(WeeklyFeeRecord, weekly_fees, |list| {
    list.sort_by(|a, b| a.data.member_name.cmp(&b.data.member_name))
});

impl Store {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Whether the backing store reports itself reachable. Flipping this
    /// off makes the health check report a disconnected database.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn health(&self) -> HealthStatus {
        let connected = self.is_connected();
        HealthStatus {
            server: "running".to_string(),
            database: if connected { "connected" } else { "disconnected" }.to_string(),
            db_state: i32::from(connected),
        }
    }

    /// Sorted listing for a collection, as its GET endpoint returns it.
    pub async fn list<T: StoreSlot>(&self) -> Vec<Stored<T>> {
        let mut list = T::slot(self).list().await;
        T::sort(&mut list);
        list
    }

    /// Upsert a member. Creating a student member also creates their weekly
    /// fee record; updates leave the fee lifecycle untouched.
    pub async fn upsert_member(&self, doc: Doc<Member>) -> Result<Stored<Member>> {
        let creating = doc.id.is_none();
        let stored = self.members.upsert(doc).await?;
        if creating && stored.data.is_student() {
            self.weekly_fees
                .insert(WeeklyFeeRecord {
                    member_id: stored.id.clone(),
                    member_name: stored.data.name.clone(),
                    payments: Vec::new(),
                })
                .await;
        }
        Ok(stored)
    }

    /// Delete a member along with their weekly fee record.
    pub async fn delete_member(&self, id: &str) -> Result<Stored<Member>> {
        self.weekly_fees
            .modify(|docs| docs.retain(|_, record| record.data.member_id.as_str() != id))
            .await;
        self.members
            .remove(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("member {id} not found")))
    }

    /// The fee record owned by a member, addressed by the member's id.
    pub async fn member_fees(&self, member_id: &str) -> Result<Stored<WeeklyFeeRecord>> {
        let docs = self.weekly_fees.list().await;
        docs.into_iter()
            .find(|record| record.data.member_id.as_str() == member_id)
            .ok_or_else(|| Error::NotFound("weekly fee record not found".to_string()))
    }

    /// Append a payment to a member's fee record, assigning it an id.
    pub async fn add_payment(
        &self,
        member_id: &str,
        payment: Payment,
    ) -> Result<Stored<WeeklyFeeRecord>> {
        self.weekly_fees
            .modify(|docs| {
                let record = docs
                    .values_mut()
                    .find(|record| record.data.member_id.as_str() == member_id)
                    .ok_or_else(|| {
                        Error::NotFound("weekly fee record not found".to_string())
                    })?;
                record
                    .data
                    .payments
                    .push(Doc::with_id(RemoteId::generate(), payment));
                record.updated_at = Utc::now();
                Ok(record.clone())
            })
            .await
    }

    /// Replace one payment's fields.
    pub async fn update_payment(
        &self,
        member_id: &str,
        payment_id: &str,
        payment: Payment,
    ) -> Result<Stored<WeeklyFeeRecord>> {
        self.weekly_fees
            .modify(|docs| {
                let record = docs
                    .values_mut()
                    .find(|record| record.data.member_id.as_str() == member_id)
                    .ok_or_else(|| {
                        Error::NotFound("weekly fee record not found".to_string())
                    })?;
                let entry = record
                    .data
                    .payments
                    .iter_mut()
                    .find(|p| p.id.as_ref().map(RemoteId::as_str) == Some(payment_id))
                    .ok_or_else(|| Error::NotFound("payment not found".to_string()))?;
                entry.data = payment;
                record.updated_at = Utc::now();
                Ok(record.clone())
            })
            .await
    }

    /// Drop a payment from a member's fee record. Unknown payment ids are
    /// ignored, matching the filter semantics of the original endpoint.
    pub async fn delete_payment(
        &self,
        member_id: &str,
        payment_id: &str,
    ) -> Result<Stored<WeeklyFeeRecord>> {
        self.weekly_fees
            .modify(|docs| {
                let record = docs
                    .values_mut()
                    .find(|record| record.data.member_id.as_str() == member_id)
                    .ok_or_else(|| {
                        Error::NotFound("weekly fee record not found".to_string())
                    })?;
                record
                    .data
                    .payments
                    .retain(|p| p.id.as_ref().map(RemoteId::as_str) != Some(payment_id));
                record.updated_at = Utc::now();
                Ok(record.clone())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaymentStatus;
    use chrono::NaiveDate;

    fn member(name: &str, role: &str) -> Member {
        Member {
            name: name.to_string(),
            contact: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: "+1-555-0100".to_string(),
            join_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            role: role.to_string(),
            image: String::new(),
        }
    }

    fn payment(amount: f64) -> Payment {
        Payment {
            date: NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
            amount,
            status: PaymentStatus::Paid,
        }
    }

    #[tokio::test]
    async fn test_upsert_assigns_id_and_updates_in_place() {
        let store = Store::new();
        let created = store
            .donations
            .upsert(Doc::new(Donation {
                donor_name: "Alumni Association".to_string(),
                amount: 100.0,
                date: NaiveDate::from_ymd_opt(2024, 9, 20).unwrap(),
                purpose: "Tournaments".to_string(),
                notes: String::new(),
            }))
            .await
            .unwrap();

        let mut data = created.data.clone();
        data.amount = 150.0;
        let updated = store
            .donations
            .upsert(Doc::with_id(created.id.clone(), data))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.data.amount, 150.0);
        assert_eq!(store.donations.len().await, 1);
    }

    #[tokio::test]
    async fn test_upsert_unknown_id_is_not_found() {
        let store = Store::new();
        let result = store
            .gallery
            .upsert(Doc::with_id(
                RemoteId::new("missing"),
                GalleryItem {
                    title: "x".to_string(),
                    description: None,
                    image_url: "x.jpg".to_string(),
                    is_top_five: false,
                    top_five_order: 0,
                },
            ))
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_student_member_gets_fee_record() {
        let store = Store::new();
        let stored = store
            .upsert_member(Doc::new(member("John Doe", Member::STUDENT_ROLE)))
            .await
            .unwrap();

        let fees = store.member_fees(stored.id.as_str()).await.unwrap();
        assert_eq!(fees.data.member_name, "John Doe");
        assert!(fees.data.payments.is_empty());
    }

    #[tokio::test]
    async fn test_non_student_member_gets_no_fee_record() {
        let store = Store::new();
        let stored = store
            .upsert_member(Doc::new(member("Jane Smith", "Coach")))
            .await
            .unwrap();

        assert!(store.member_fees(stored.id.as_str()).await.is_err());
    }

    #[tokio::test]
    async fn test_member_delete_removes_fee_record() {
        let store = Store::new();
        let stored = store
            .upsert_member(Doc::new(member("John Doe", Member::STUDENT_ROLE)))
            .await
            .unwrap();
        assert_eq!(store.weekly_fees.len().await, 1);

        store.delete_member(stored.id.as_str()).await.unwrap();
        assert_eq!(store.weekly_fees.len().await, 0);
        assert_eq!(store.members.len().await, 0);
    }

    #[tokio::test]
    async fn test_payment_lifecycle() {
        let store = Store::new();
        let stored = store
            .upsert_member(Doc::new(member("John Doe", Member::STUDENT_ROLE)))
            .await
            .unwrap();
        let member_id = stored.id.as_str();

        let record = store.add_payment(member_id, payment(20.0)).await.unwrap();
        assert_eq!(record.data.payments.len(), 1);
        let payment_id = record.data.payments[0].id.clone().unwrap();

        let mut updated = payment(25.0);
        updated.status = PaymentStatus::Overdue;
        let record = store
            .update_payment(member_id, payment_id.as_str(), updated)
            .await
            .unwrap();
        assert_eq!(record.data.payments[0].data.amount, 25.0);
        assert_eq!(record.data.payments[0].data.status, PaymentStatus::Overdue);

        let record = store
            .delete_payment(member_id, payment_id.as_str())
            .await
            .unwrap();
        assert!(record.data.payments.is_empty());

        let missing = store
            .update_payment(member_id, "no-such-payment", payment(1.0))
            .await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_health_reflects_connected_flag() {
        let store = Store::new();
        assert!(store.health().database_connected());

        store.set_connected(false);
        let health = store.health();
        assert_eq!(health.database, "disconnected");
        assert_eq!(health.db_state, 0);
    }

    #[tokio::test]
    async fn test_member_listing_sorted_by_name() {
        let store = Store::new();
        store
            .upsert_member(Doc::new(member("Robert Brown", "Admin")))
            .await
            .unwrap();
        store
            .upsert_member(Doc::new(member("Emily Williams", Member::STUDENT_ROLE)))
            .await
            .unwrap();

        let names: Vec<String> = store
            .list::<Member>()
            .await
            .into_iter()
            .map(|m| m.data.name)
            .collect();
        assert_eq!(names, vec!["Emily Williams", "Robert Brown"]);
    }
}

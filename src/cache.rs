//! Local Application Cache
//!
//! Owned, in-memory copy of every collection, mutated optimistically before
//! synchronization. Entities live in the cache with a [`Tracked`] wrapper
//! carrying their identity tag and the `needs_sync` marker; the reconciler
//! promotes identities and clears markers in place, so every holder of the
//! shared cache observes the same state.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::{
    Activity, DashboardStats, Doc, Donation, Entity, Expense, Experience, GalleryItem, HeroSlide,
    Identity, LocalId, Member, Payment, PaymentStatus, RemoteId, WeeklyFeeRecord,
};

/// Cache shared between the UI side, the reconciler, and the scheduler.
pub type SharedCache = Arc<RwLock<AppData>>;

/// A cached entity: identity tag, dirty marker, payload.
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    pub identity: Identity,
    /// Set when a sync attempt for this entity failed; cleared only on a
    /// confirmed successful sync.
    pub needs_sync: bool,
    pub data: T,
}

impl<T> Tracked<T> {
    /// Wrap a locally created, not yet persisted entity.
    pub fn local(data: T) -> Self {
        Self {
            identity: Identity::new(),
            needs_sync: false,
            data,
        }
    }

    /// Wrap an entity fetched from the remote store.
    pub fn from_doc(doc: Doc<T>) -> Self {
        let identity = match doc.id {
            Some(remote) => Identity::from_remote(remote),
            None => Identity::new(),
        };
        Self {
            identity,
            needs_sync: false,
            data: doc.data,
        }
    }
}

/// A cached payment entry. `id` is absent until the store has acknowledged
/// the payment; `dirty` marks local edits not yet pushed.
#[derive(Debug, Clone)]
pub struct TrackedPayment {
    pub id: Option<RemoteId>,
    pub dirty: bool,
    pub data: Payment,
}

/// A cached weekly fee record. Payments can only be pushed once the owning
/// member has a remote id.
#[derive(Debug, Clone)]
pub struct TrackedFee {
    pub identity: Identity,
    pub member: Identity,
    pub member_name: String,
    pub needs_sync: bool,
    pub payments: Vec<TrackedPayment>,
}

impl TrackedFee {
    pub fn from_doc(doc: Doc<WeeklyFeeRecord>) -> Self {
        let identity = match doc.id {
            Some(remote) => Identity::from_remote(remote),
            None => Identity::new(),
        };
        let payments = doc
            .data
            .payments
            .into_iter()
            .map(|p| TrackedPayment {
                id: p.id,
                dirty: false,
                data: p.data,
            })
            .collect();
        Self {
            identity,
            member: Identity::from_remote(doc.data.member_id),
            member_name: doc.data.member_name,
            needs_sync: false,
            payments,
        }
    }
}

/// The whole application state. Created at startup, torn down at shutdown;
/// passed by shared reference to every component that reads or writes it.
#[derive(Debug, Default)]
pub struct AppData {
    pub hero_slides: Vec<Tracked<HeroSlide>>,
    pub activities: Vec<Tracked<Activity>>,
    pub members: Vec<Tracked<Member>>,
    pub donations: Vec<Tracked<Donation>>,
    pub expenses: Vec<Tracked<Expense>>,
    pub experiences: Vec<Tracked<Experience>>,
    pub gallery: Vec<Tracked<GalleryItem>>,
    pub weekly_fees: Vec<TrackedFee>,
    pub dashboard: DashboardStats,
}

/// Binds an entity type to its collection inside [`AppData`].
pub trait CacheSlot: Entity {
    fn entries(data: &AppData) -> &[Tracked<Self>];
    fn entries_mut(data: &mut AppData) -> &mut Vec<Tracked<Self>>;
}

macro_rules! cache_slot {
    ($record:ty, $field:ident) => {
        impl CacheSlot for $record {
            fn entries(data: &AppData) -> &[Tracked<Self>] {
                &data.$field
            }

            fn entries_mut(data: &mut AppData) -> &mut Vec<Tracked<Self>> {
                &mut data.$field
            }
        }
    };
}

cache_slot!(HeroSlide, hero_slides);
cache_slot!(Activity, activities);
cache_slot!(Member, members);
cache_slot!(Donation, donations);
cache_slot!(Expense, expenses);
cache_slot!(Experience, experiences);
cache_slot!(GalleryItem, gallery);

impl AppData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedCache {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn find<T: CacheSlot>(&self, local: LocalId) -> Option<&Tracked<T>> {
        T::entries(self).iter().find(|t| t.identity.local() == local)
    }

    pub fn find_mut<T: CacheSlot>(&mut self, local: LocalId) -> Option<&mut Tracked<T>> {
        T::entries_mut(self)
            .iter_mut()
            .find(|t| t.identity.local() == local)
    }

    /// Insert a locally created entity and return its cache handle.
    pub fn insert_local<T: CacheSlot>(&mut self, data: T) -> LocalId {
        let tracked = Tracked::local(data);
        let local = tracked.identity.local();
        T::entries_mut(self).push(tracked);
        local
    }

    /// Remove an entity, returning it so the caller can reconcile the delete.
    pub fn remove<T: CacheSlot>(&mut self, local: LocalId) -> Option<Tracked<T>> {
        let entries = T::entries_mut(self);
        let index = entries.iter().position(|t| t.identity.local() == local)?;
        Some(entries.remove(index))
    }

    /// Replace a collection with freshly fetched remote documents.
    pub fn adopt<T: CacheSlot>(&mut self, docs: Vec<Doc<T>>) {
        *T::entries_mut(self) = docs.into_iter().map(Tracked::from_doc).collect();
    }

    pub fn adopt_weekly_fees(&mut self, docs: Vec<Doc<WeeklyFeeRecord>>) {
        self.weekly_fees = docs.into_iter().map(TrackedFee::from_doc).collect();
    }

    pub fn find_fee(&self, local: LocalId) -> Option<&TrackedFee> {
        self.weekly_fees
            .iter()
            .find(|f| f.identity.local() == local)
    }

    pub fn find_fee_mut(&mut self, local: LocalId) -> Option<&mut TrackedFee> {
        self.weekly_fees
            .iter_mut()
            .find(|f| f.identity.local() == local)
    }

    /// Record a payment made against a member's fee ledger. The payment is
    /// pushed on the next reconciliation of the record.
    pub fn add_payment(&mut self, fee: LocalId, payment: Payment) -> bool {
        match self.find_fee_mut(fee) {
            Some(record) => {
                record.payments.push(TrackedPayment {
                    id: None,
                    dirty: true,
                    data: payment,
                });
                record.needs_sync = true;
                true
            }
            None => false,
        }
    }

    /// Entities across every collection still waiting for a successful sync.
    pub fn pending_count(&self) -> usize {
        self.hero_slides.iter().filter(|t| t.needs_sync).count()
            + self.activities.iter().filter(|t| t.needs_sync).count()
            + self.members.iter().filter(|t| t.needs_sync).count()
            + self.donations.iter().filter(|t| t.needs_sync).count()
            + self.expenses.iter().filter(|t| t.needs_sync).count()
            + self.experiences.iter().filter(|t| t.needs_sync).count()
            + self.gallery.iter().filter(|t| t.needs_sync).count()
            + self.weekly_fees.iter().filter(|f| f.needs_sync).count()
    }

    /// Recompute the derived dashboard figures from the cached collections.
    pub fn recompute_dashboard(&mut self) {
        let total_donations: f64 = self.donations.iter().map(|d| d.data.amount).sum();
        let total_expenses: f64 = self.expenses.iter().map(|e| e.data.amount).sum();

        let mut fees_collected = 0.0;
        let mut fees_pending = 0.0;
        let mut fees_overdue = 0.0;
        for fee in &self.weekly_fees {
            for payment in &fee.payments {
                match payment.data.status {
                    PaymentStatus::Paid => fees_collected += payment.data.amount,
                    PaymentStatus::Pending => fees_pending += payment.data.amount,
                    PaymentStatus::Overdue => fees_overdue += payment.data.amount,
                }
            }
        }

        self.dashboard = DashboardStats {
            total_members: self.members.len(),
            total_activities: self.activities.len(),
            total_donations,
            total_expenses,
            net_balance: total_donations - total_expenses,
            fees_collected,
            fees_pending,
            fees_overdue,
            total_experiences: self.experiences.len(),
        };
    }
}

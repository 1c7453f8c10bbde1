//! Data Model
//!
//! Identity handling and the record types shared by the cache, the resource
//! clients, and the store.

pub mod identity;
pub mod records;

pub use identity::{Identity, LocalId, RemoteId};
pub use records::{
    Activity, DashboardStats, Doc, Donation, Entity, Expense, Experience, GalleryItem,
    HealthStatus, HeroSlide, Member, OrderUpdate, Payment, PaymentStatus, ReorderRequest,
    Validate, WeeklyFeeRecord,
};

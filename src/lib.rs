//! Clubsync - Offline-First Sports Academy Content Manager
//!
//! A small content management system for a sports academy (hero slides,
//! activities, members, donations, expenses, experiences, weekly fees,
//! gallery) built around a client-side synchronization engine that keeps a
//! local in-memory cache consistent with a remote document store over an
//! unreliable network.
//!
//! # Architecture
//!
//! Entities are created and edited optimistically in the local cache, then
//! reconciled against the store: creates receive a store-assigned id that
//! is written back in place, updates are addressed by that id, and failures
//! mark the entity for retry on the next bulk pass. A periodic scheduler
//! drives passes in the background.
//!
//! # Features
//!
//! - Retrying request transport with per-attempt timeout and exponential backoff
//! - Tagged entity identity (local handle vs. store-assigned id)
//! - Bulk fan-out synchronization with per-entity failure tracking
//! - Periodic background sync with overlap protection
//! - REST API server over an in-memory document store
//! - Gallery top-five ordering with hero-slide regeneration cascade

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod store;
pub mod sync;

pub use config::ClubsyncConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{AppData, SharedCache, Tracked};
    pub use crate::client::{Resources, Transport};
    pub use crate::config::ClubsyncConfig;
    pub use crate::error::{Error, Result};
    pub use crate::model::{Doc, Identity, LocalId, RemoteId};
    pub use crate::notify::{LogNotifier, MessageLevel, Notifier};
    pub use crate::store::Store;
    pub use crate::sync::{PassOutcome, PassReport, SyncEngine, SyncScheduler};
}

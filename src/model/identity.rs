//! Entity Identity
//!
//! Every cached entity is addressed two ways: a client-assigned local id,
//! unique within the cache and stable for its lifetime, and a remote id the
//! store assigns on first successful create. [`Identity`] tags which stage
//! an entity is in instead of leaving callers to infer it from optional
//! fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Client-assigned identifier. Never sent to the remote store as identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(Uuid);

impl LocalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Store-assigned identifier. Immutable once assigned; authoritative for
/// all update and delete calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh id, server-side.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RemoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Persistence state of a cached entity.
///
/// `Local` means the entity has never been successfully created remotely;
/// `Remote` carries the store-assigned id alongside the original local
/// handle, which stays valid for cache lookups after promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Local(LocalId),
    Remote { local: LocalId, remote: RemoteId },
}

impl Identity {
    /// Fresh identity for a locally created entity.
    pub fn new() -> Self {
        Identity::Local(LocalId::new())
    }

    /// Identity for an entity that already exists remotely.
    pub fn from_remote(remote: RemoteId) -> Self {
        Identity::Remote {
            local: LocalId::new(),
            remote,
        }
    }

    /// The stable local handle.
    pub fn local(&self) -> LocalId {
        match self {
            Identity::Local(local) => *local,
            Identity::Remote { local, .. } => *local,
        }
    }

    /// The store-assigned id, if the entity has been persisted.
    pub fn remote(&self) -> Option<&RemoteId> {
        match self {
            Identity::Local(_) => None,
            Identity::Remote { remote, .. } => Some(remote),
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self, Identity::Remote { .. })
    }

    /// Record the store-assigned id after a successful create.
    ///
    /// A remote id never changes once assigned; promoting an already-remote
    /// identity is ignored.
    pub fn promote(&mut self, remote: RemoteId) {
        if let Identity::Local(local) = self {
            *self = Identity::Remote {
                local: *local,
                remote,
            };
        }
    }

    /// Identity value used on the wire: the remote id when present,
    /// otherwise the local handle's string form.
    pub fn wire_id(&self) -> String {
        match self {
            Identity::Local(local) => local.to_string(),
            Identity::Remote { remote, .. } => remote.to_string(),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

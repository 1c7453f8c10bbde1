//! Entity Reconciliation
//!
//! Makes one entity's remote representation match its local one. The
//! decision is driven by the identity tag: a persisted entity is updated
//! under its remote id, an unpersisted one is created and its assigned id
//! written back into the shared cache in place. Every failure is caught and
//! converted to a boolean plus a `needs_sync` marker, so a bulk pass keeps
//! going when individual entities fail.

use crate::cache::{CacheSlot, SharedCache};
use crate::client::{CollectionClient, WeeklyFeesClient};
use crate::model::{Entity, Identity, LocalId};

/// Reconcile one cached entity with the remote store.
///
/// Returns whether the entity is now in sync. Never propagates an error.
pub async fn reconcile_entity<T: CacheSlot>(
    cache: &SharedCache,
    client: &CollectionClient<T>,
    local: LocalId,
) -> bool {
    let snapshot = {
        let data = cache.read().await;
        data.find::<T>(local)
            .map(|entry| (entry.identity.clone(), entry.data.clone()))
    };
    let Some((identity, payload)) = snapshot else {
        tracing::warn!("{} {local} vanished from cache before sync", T::COLLECTION);
        return false;
    };

    let outcome = match identity.remote() {
        Some(remote) => client.update(remote, &payload).await.map(|_| None),
        None => client.create(&payload).await.map(|doc| doc.id),
    };

    let mut data = cache.write().await;
    let Some(entry) = data.find_mut::<T>(local) else {
        // Deleted while the request was in flight; the delete path owns it.
        return false;
    };

    match outcome {
        Ok(assigned) => {
            if let Some(remote) = assigned {
                entry.identity.promote(remote);
            } else if !entry.identity.is_persisted() {
                tracing::warn!("{} create response carried no id", T::COLLECTION);
            }
            entry.needs_sync = false;
            true
        }
        Err(e) => {
            tracing::warn!("failed to sync {} {local}: {e}", T::COLLECTION);
            entry.needs_sync = true;
            false
        }
    }
}

/// Reconcile a delete with the remote store, addressed by the remote id
/// when one was ever assigned, the local handle otherwise.
pub async fn reconcile_delete<T: Entity>(
    client: &CollectionClient<T>,
    identity: &Identity,
) -> bool {
    let id = identity.wire_id();
    match client.delete(&id).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("failed to delete {} {id}: {e}", T::COLLECTION);
            false
        }
    }
}

/// Reconcile a weekly fee record: push payments the store has not
/// acknowledged, then payments edited locally. The record can only sync
/// once its member has a remote id.
pub async fn reconcile_weekly_fee(
    cache: &SharedCache,
    client: &WeeklyFeesClient,
    local: LocalId,
) -> bool {
    let snapshot = {
        let data = cache.read().await;
        data.find_fee(local)
            .map(|fee| (fee.member.clone(), fee.payments.clone()))
    };
    let Some((member, payments)) = snapshot else {
        tracing::warn!("weekly fee record {local} vanished from cache before sync");
        return false;
    };

    let Some(member_remote) = member.remote().cloned() else {
        // Payments are addressed by member id on the wire; wait for the
        // member to be persisted and retry next pass.
        let mut data = cache.write().await;
        if let Some(fee) = data.find_fee_mut(local) {
            fee.needs_sync = true;
        }
        return false;
    };

    let mut all_ok = true;
    for (index, payment) in payments.iter().enumerate() {
        match &payment.id {
            None => match client.add_payment(&member_remote, &payment.data).await {
                Ok(doc) => {
                    let assigned = doc.data.payments.last().and_then(|p| p.id.clone());
                    let mut data = cache.write().await;
                    if let Some(fee) = data.find_fee_mut(local) {
                        if let Some(entry) = fee.payments.get_mut(index) {
                            entry.id = assigned;
                            entry.dirty = false;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("failed to push payment for member {member_remote}: {e}");
                    all_ok = false;
                }
            },
            Some(payment_id) if payment.dirty => {
                match client
                    .update_payment(&member_remote, payment_id.as_str(), &payment.data)
                    .await
                {
                    Ok(_) => {
                        let mut data = cache.write().await;
                        if let Some(fee) = data.find_fee_mut(local) {
                            if let Some(entry) = fee.payments.get_mut(index) {
                                entry.dirty = false;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            "failed to update payment {payment_id} for member {member_remote}: {e}"
                        );
                        all_ok = false;
                    }
                }
            }
            Some(_) => {}
        }
    }

    let mut data = cache.write().await;
    if let Some(fee) = data.find_fee_mut(local) {
        fee.needs_sync = !all_ok;
    }
    all_ok
}

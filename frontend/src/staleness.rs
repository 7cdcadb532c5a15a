//! "This asset changed elsewhere" notifications, keyed by asset id.
//!
//! Delivery is synchronous and in subscription order. Nothing is retained for
//! late subscribers. A callback removed while a notification is being
//! delivered is skipped if delivery had not reached it yet.

use futures::{Stream, StreamExt};
use indexmap::IndexMap;
use shared::AssetId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback = Arc<dyn Fn(&AssetId) + Send + Sync>;

struct Listener {
    active: Arc<AtomicBool>,
    callback: Callback,
}

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    by_asset: Mutex<HashMap<AssetId, IndexMap<u64, Listener>>>,
}

impl Listeners {
    fn table(&self) -> MutexGuard<'_, HashMap<AssetId, IndexMap<u64, Listener>>> {
        self.by_asset.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, asset_id: &AssetId, listener_id: u64) {
        let mut table = self.table();
        if let Some(listeners) = table.get_mut(asset_id) {
            if let Some(listener) = listeners.shift_remove(&listener_id) {
                listener.active.store(false, Ordering::SeqCst);
            }
            if listeners.is_empty() {
                table.remove(asset_id);
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct StalenessChannel {
    listeners: Arc<Listeners>,
}

impl StalenessChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for changes to `asset_id`. Dropping the returned
    /// [`Subscription`] unsubscribes.
    pub fn subscribe(
        &self,
        asset_id: AssetId,
        callback: impl Fn(&AssetId) + Send + Sync + 'static,
    ) -> Subscription {
        let listener_id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        self.listeners
            .table()
            .entry(asset_id.clone())
            .or_default()
            .insert(
                listener_id,
                Listener {
                    active: active.clone(),
                    callback: Arc::new(callback),
                },
            );
        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            asset_id,
            listener_id,
            active,
        }
    }

    /// Invokes every current listener for `asset_id` once. Returns how many ran.
    pub fn notify(&self, asset_id: &AssetId) -> usize {
        // Snapshot first so callbacks may (un)subscribe without deadlocking.
        let snapshot: Vec<(Arc<AtomicBool>, Callback)> = match self.listeners.table().get(asset_id) {
            Some(listeners) => listeners
                .values()
                .map(|listener| (listener.active.clone(), listener.callback.clone()))
                .collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for (active, callback) in snapshot {
            if active.load(Ordering::SeqCst) {
                callback(asset_id);
                delivered += 1;
            }
        }
        log::debug!("staleness: {asset_id} changed, {delivered} listener(s) notified");
        delivered
    }

    pub fn listener_count(&self, asset_id: &AssetId) -> usize {
        self.listeners.table().get(asset_id).map_or(0, IndexMap::len)
    }
}

impl std::fmt::Debug for StalenessChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StalenessChannel")
            .field("assets", &self.listeners.table().len())
            .finish()
    }
}

#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    listeners: Weak<Listeners>,
    asset_id: AssetId,
    listener_id: u64,
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(&self.asset_id, self.listener_id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("asset_id", &self.asset_id)
            .field("listener_id", &self.listener_id)
            .finish()
    }
}

/// Feeds an external change stream (e.g. the receiving end of an
/// `asset_changed_relay`) into `channel` until the stream ends.
pub async fn forward_changes(channel: StalenessChannel, changes: impl Stream<Item = AssetId>) {
    let mut changes = std::pin::pin!(changes);
    while let Some(asset_id) = changes.next().await {
        channel.notify(&asset_id);
    }
    log::debug!("staleness: change feed closed");
}

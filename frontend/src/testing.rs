//! Test doubles: a tokio-backed runtime, an in-memory asset store and a
//! telemetry sink that records events.

use crate::scheduler::Runtime;
use crate::store::{AssetStore, StoreError, StoreResult};
use crate::telemetry::Telemetry;
use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt};
use shared::{AssetForm, AssetId, AssetInput, AssetRecord, AssetType, AssetVersion, GameId, VersionId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRuntime;

impl Runtime for TokioRuntime {
    fn spawn_after(&self, delay: Duration, task: BoxFuture<'static, ()>) {
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task.await;
        });
    }
}

#[derive(Default)]
pub struct CallCounts {
    pub fetches: AtomicUsize,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub reverts: AtomicUsize,
}

impl CallCounts {
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn reverts(&self) -> usize {
        self.reverts.load(Ordering::SeqCst)
    }
}

/// Operation that [`InMemoryStore::fail_next`] makes fail once, or that
/// [`InMemoryStore::hold_next`] keeps in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Fetch,
    Create,
    Update,
    Delete,
    Revert,
    ListVersions,
}

#[derive(Default)]
struct StoreData {
    records: HashMap<AssetId, AssetRecord>,
    versions: HashMap<AssetId, Vec<(AssetVersion, AssetRecord)>>,
    failures: HashMap<StoreOp, StoreError>,
    holds: HashMap<StoreOp, oneshot::Receiver<()>>,
    next_id: usize,
    clock: i64,
}

/// Store whose effects apply when a call is made. Responses are ready on first
/// poll unless the operation was held with [`hold_next`](Self::hold_next).
#[derive(Default)]
pub struct InMemoryStore {
    data: Mutex<StoreData>,
    pub calls: CallCounts,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Stores a record directly, as another session would.
    pub fn set_record(&self, record: AssetRecord) {
        let mut data = self.lock();
        data.records.insert(record.id.clone(), record);
    }

    pub fn record(&self, asset_id: &AssetId) -> Option<AssetRecord> {
        self.lock().records.get(asset_id).cloned()
    }

    /// Seeds an asset whose form is the type's defaults with `name` set.
    pub fn seed(&self, asset_type: AssetType, asset_id: &str, name: &str) -> AssetRecord {
        let mut form = AssetForm::defaults(asset_type);
        form.set_name(name);
        let record = AssetRecord {
            id: AssetId::from(asset_id),
            game_id: GameId::new("game-1"),
            details: form.to_details(),
            image_url: None,
            updated_at: 0,
        };
        self.set_record(record.clone());
        record
    }

    /// Renames a stored record in place, bumping `updated_at`.
    pub fn rename_externally(&self, asset_id: &AssetId, name: &str) {
        let mut data = self.lock();
        data.clock += 1;
        let clock = data.clock;
        if let Some(record) = data.records.get_mut(asset_id) {
            let mut form = AssetForm::from_record(record);
            form.set_name(name);
            record.details = form.to_details();
            record.updated_at = clock;
        }
    }

    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.lock().failures.insert(op, error);
    }

    /// Keeps the response of the next `op` pending until the returned sender
    /// fires or is dropped. The call itself still counts and takes effect.
    pub fn hold_next(&self, op: StoreOp) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.lock().holds.insert(op, gate);
        release
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreData> {
        self.data.lock().unwrap()
    }

    fn take_failure(data: &mut StoreData, op: StoreOp) -> StoreResult<()> {
        match data.failures.remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn respond<T: Send + 'static>(data: &mut StoreData, op: StoreOp, result: T) -> BoxFuture<'static, T> {
        match data.holds.remove(&op) {
            Some(gate) => async move {
                let _ = gate.await;
                result
            }
            .boxed(),
            None => future::ready(result).boxed(),
        }
    }

    fn archive(data: &mut StoreData, record: &AssetRecord) {
        let history = data.versions.entry(record.id.clone()).or_default();
        let version = AssetVersion {
            version_id: VersionId::new(format!("{}-v{}", record.id, history.len() + 1)),
            name: record.name().to_string(),
            created_at: record.updated_at,
        };
        history.insert(0, (version, record.clone()));
    }
}

impl AssetStore for InMemoryStore {
    fn fetch_asset(&self, asset_id: &AssetId) -> BoxFuture<'static, StoreResult<Option<AssetRecord>>> {
        self.calls.fetches.fetch_add(1, Ordering::SeqCst);
        let mut data = self.lock();
        let result = Self::take_failure(&mut data, StoreOp::Fetch).map(|()| data.records.get(asset_id).cloned());
        Self::respond(&mut data, StoreOp::Fetch, result)
    }

    fn create_asset(&self, input: AssetInput) -> BoxFuture<'static, StoreResult<AssetRecord>> {
        self.calls.creates.fetch_add(1, Ordering::SeqCst);
        let mut data = self.lock();
        let result = Self::take_failure(&mut data, StoreOp::Create).map(|()| {
            data.next_id += 1;
            data.clock += 1;
            let record = AssetRecord {
                id: AssetId::new(format!("created-{}", data.next_id)),
                game_id: input.game_id,
                details: input.details,
                image_url: None,
                updated_at: data.clock,
            };
            data.records.insert(record.id.clone(), record.clone());
            record
        });
        Self::respond(&mut data, StoreOp::Create, result)
    }

    fn update_asset(&self, asset_id: &AssetId, input: AssetInput) -> BoxFuture<'static, StoreResult<AssetRecord>> {
        self.calls.updates.fetch_add(1, Ordering::SeqCst);
        let mut data = self.lock();
        let result = Self::take_failure(&mut data, StoreOp::Update).and_then(|()| {
            let previous = data
                .records
                .get(asset_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(asset_id.clone()))?;
            Self::archive(&mut data, &previous);
            data.clock += 1;
            let record = AssetRecord {
                details: input.details,
                updated_at: data.clock,
                ..previous
            };
            data.records.insert(asset_id.clone(), record.clone());
            Ok(record)
        });
        Self::respond(&mut data, StoreOp::Update, result)
    }

    fn delete_asset(&self, asset_id: &AssetId) -> BoxFuture<'static, StoreResult<()>> {
        self.calls.deletes.fetch_add(1, Ordering::SeqCst);
        let mut data = self.lock();
        let result = Self::take_failure(&mut data, StoreOp::Delete).and_then(|()| {
            data.records
                .remove(asset_id)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(asset_id.clone()))
        });
        Self::respond(&mut data, StoreOp::Delete, result)
    }

    fn revert_asset(&self, asset_id: &AssetId, version_id: &VersionId) -> BoxFuture<'static, StoreResult<AssetRecord>> {
        self.calls.reverts.fetch_add(1, Ordering::SeqCst);
        let mut data = self.lock();
        let result = Self::take_failure(&mut data, StoreOp::Revert).and_then(|()| {
            let archived = data
                .versions
                .get(asset_id)
                .and_then(|history| history.iter().find(|(version, _)| &version.version_id == version_id))
                .map(|(_, record)| record.clone())
                .ok_or_else(|| StoreError::Rejected(format!("unknown version {version_id}")))?;
            data.clock += 1;
            let record = AssetRecord {
                updated_at: data.clock,
                ..archived
            };
            data.records.insert(asset_id.clone(), record.clone());
            Ok(record)
        });
        Self::respond(&mut data, StoreOp::Revert, result)
    }

    fn list_versions(&self, asset_id: &AssetId) -> BoxFuture<'static, StoreResult<Vec<AssetVersion>>> {
        let mut data = self.lock();
        let result = Self::take_failure(&mut data, StoreOp::ListVersions).map(|()| {
            data.versions
                .get(asset_id)
                .map(|history| history.iter().map(|(version, _)| version.clone()).collect())
                .unwrap_or_default()
        });
        Self::respond(&mut data, StoreOp::ListVersions, result)
    }
}

#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl RecordingTelemetry {
    pub fn names(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|(event, _)| event == name).count()
    }
}

impl Telemetry for RecordingTelemetry {
    fn log_event(&self, name: &str, attributes: &[(&str, String)]) {
        let attributes = attributes
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        self.events.lock().unwrap().push((name.to_string(), attributes));
    }
}

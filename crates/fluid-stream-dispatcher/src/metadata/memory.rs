//!
//! # In-memory metadata store
//!
//! Keeps objects of every kind as yaml values and implements the same write
//! semantics as the cluster object store: optimistic concurrency on resource
//! version, generation bump on non-status changes, and finalizer guarded deletion.
//!
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_channel::{Sender, Receiver, unbounded};
use async_lock::{Mutex, RwLock};
use chrono::Utc;
use futures_util::{FutureExt, StreamExt};
use futures_util::stream::{self, BoxStream};
use serde_yaml::Value;
use tracing::{debug, trace};

use fluid_controlplane_metadata::core::{Spec, MetadataObject, NamespacedName};

use crate::StoreError;
use super::{MetadataClient, MetadataStoreList, NameSpace, WatchEvent};

/// number of updates kept per kind for watchers resuming from older versions
const MAX_HISTORY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateKind {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
struct StoreUpdate {
    version: u64,
    namespace: String,
    kind: UpdateKind,
    value: Value,
}

impl StoreUpdate {
    fn into_watch_event<S: Spec>(self) -> Result<WatchEvent<S>, StoreError> {
        let obj: MetadataObject<S> = serde_yaml::from_value(self.value)?;
        Ok(match self.kind {
            UpdateKind::Added => WatchEvent::Added(obj),
            UpdateKind::Modified => WatchEvent::Modified(obj),
            UpdateKind::Deleted => WatchEvent::Deleted(obj),
        })
    }
}

#[derive(Debug)]
struct WatchState {
    history: VecDeque<StoreUpdate>,
    capacity: usize,
    /// newest version evicted from history
    compacted: u64,
    watchers: Vec<Sender<StoreUpdate>>,
}

impl Default for WatchState {
    fn default() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }
}

impl WatchState {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            history: VecDeque::new(),
            capacity,
            compacted: 0,
            watchers: vec![],
        }
    }

    fn publish(&mut self, update: StoreUpdate) {
        if self.history.len() >= self.capacity {
            if let Some(evicted) = self.history.pop_front() {
                self.compacted = evicted.version;
            }
        }
        self.history.push_back(update.clone());
        // closed watchers are dropped
        self.watchers
            .retain(|watcher| watcher.try_send(update.clone()).is_ok());
    }

    /// replay history newer than `since`, fails if part of it was already evicted
    fn subscribe(&mut self, since: Option<u64>) -> Result<Receiver<StoreUpdate>, StoreError> {
        if let Some(since) = since {
            if since < self.compacted {
                return Err(StoreError::Expired {
                    version: since.to_string(),
                    oldest: self.compacted.to_string(),
                });
            }
        }

        let (sender, receiver) = unbounded();
        if let Some(since) = since {
            for update in self.history.iter().filter(|u| u.version > since) {
                let _ = sender.try_send(update.clone());
            }
        }
        self.watchers.push(sender);
        Ok(receiver)
    }
}

#[derive(Debug, Default)]
struct SpecStore {
    data: RwLock<BTreeMap<NamespacedName, Value>>,
    watch: Mutex<WatchState>,
}

impl SpecStore {
    fn decode<S: Spec>(
        data: &BTreeMap<NamespacedName, Value>,
        key: &NamespacedName,
    ) -> Result<Option<MetadataObject<S>>, StoreError> {
        match data.get(key) {
            Some(value) => Ok(Some(serde_yaml::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    async fn publish(&self, update: StoreUpdate) {
        trace!(version = update.version, kind = ?update.kind, "publishing update");
        self.watch.lock().await.publish(update);
    }
}

#[derive(Debug, Default)]
pub struct MemoryClient {
    version: AtomicU64,
    stores: Mutex<HashMap<&'static str, Arc<SpecStore>>>,
}

impl MemoryClient {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// latest resource version handed out
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn get_store<S: Spec>(&self) -> Arc<SpecStore> {
        let mut stores = self.stores.lock().await;
        stores.entry(S::LABEL).or_default().clone()
    }
}

fn not_found<S: Spec>(key: &NamespacedName) -> StoreError {
    StoreError::NotFound {
        kind: S::LABEL,
        key: key.clone(),
    }
}

fn check_version<S: Spec>(
    current: &MetadataObject<S>,
    value: &MetadataObject<S>,
) -> Result<(), StoreError> {
    let expected = &value.metadata.resource_version;
    if expected.is_empty() || *expected == current.metadata.resource_version {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            kind: S::LABEL,
            key: current.key(),
            expected: expected.clone(),
            actual: current.metadata.resource_version.clone(),
        })
    }
}

/// anything but status and store managed fields
fn content_changed<S: Spec>(current: &MetadataObject<S>, next: &MetadataObject<S>) -> bool {
    current.spec != next.spec
        || current.metadata.labels != next.metadata.labels
        || current.metadata.annotations != next.metadata.annotations
        || current.metadata.finalizers != next.metadata.finalizers
}

#[async_trait::async_trait]
impl MetadataClient for MemoryClient {
    async fn retrieve_item<S>(&self, key: &NamespacedName) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let data = store.data.read().await;
        SpecStore::decode(&data, key)?.ok_or_else(|| not_found::<S>(key))
    }

    async fn retrieve_items<S>(
        &self,
        namespace: &NameSpace,
    ) -> Result<MetadataStoreList<S>, StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let data = store.data.read().await;
        let version = self.current_version().to_string();
        let items = data
            .iter()
            .filter(|(key, _)| namespace.contains(&key.namespace))
            .map(|(_, value)| serde_yaml::from_value(value.clone()))
            .collect::<Result<Vec<MetadataObject<S>>, _>>()?;

        Ok(MetadataStoreList { version, items })
    }

    async fn create_item<S>(&self, value: MetadataObject<S>) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let key = value.key();
        let mut data = store.data.write().await;
        if data.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: S::LABEL,
                key,
            });
        }

        let mut created = value;
        let version = self.next_version();
        created.metadata.uid = uuid::Uuid::new_v4().to_string();
        created.metadata.creation_timestamp = Some(Utc::now());
        created.metadata.deletion_timestamp = None;
        created.metadata.generation = 1;
        created.metadata.resource_version = version.to_string();

        let encoded = serde_yaml::to_value(&created)?;
        data.insert(key.clone(), encoded.clone());
        store
            .publish(StoreUpdate {
                version,
                namespace: key.namespace.clone(),
                kind: UpdateKind::Added,
                value: encoded,
            })
            .await;
        drop(data);

        debug!(kind = S::LABEL, %key, version, "created");
        Ok(created)
    }

    async fn update_item<S>(&self, value: MetadataObject<S>) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let key = value.key();
        let mut data = store.data.write().await;
        let current: MetadataObject<S> =
            SpecStore::decode(&data, &key)?.ok_or_else(|| not_found::<S>(&key))?;
        check_version(&current, &value)?;

        if !content_changed(&current, &value) {
            trace!(kind = S::LABEL, %key, "no change, skipping write");
            return Ok(current);
        }

        let mut next = value;
        let version = self.next_version();
        next.status = current.status.clone();
        next.metadata.uid = current.metadata.uid.clone();
        next.metadata.creation_timestamp = current.metadata.creation_timestamp;
        next.metadata.deletion_timestamp = current.metadata.deletion_timestamp;
        next.metadata.generation = current.metadata.generation + 1;
        next.metadata.resource_version = version.to_string();

        let encoded = serde_yaml::to_value(&next)?;
        let kind = if next.metadata.is_being_deleted() && next.metadata.finalizers.is_empty() {
            debug!(kind = S::LABEL, %key, "last finalizer removed, deleting");
            data.remove(&key);
            UpdateKind::Deleted
        } else {
            data.insert(key.clone(), encoded.clone());
            UpdateKind::Modified
        };
        store
            .publish(StoreUpdate {
                version,
                namespace: key.namespace.clone(),
                kind,
                value: encoded,
            })
            .await;
        drop(data);

        debug!(kind = S::LABEL, %key, version, generation = next.metadata.generation, "updated");
        Ok(next)
    }

    async fn update_status<S>(
        &self,
        value: MetadataObject<S>,
    ) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let key = value.key();
        let mut data = store.data.write().await;
        let current: MetadataObject<S> =
            SpecStore::decode(&data, &key)?.ok_or_else(|| not_found::<S>(&key))?;
        check_version(&current, &value)?;

        if current.status == value.status {
            trace!(kind = S::LABEL, %key, "status unchanged, skipping write");
            return Ok(current);
        }

        let version = self.next_version();
        let mut next = current;
        next.status = value.status;
        next.metadata.resource_version = version.to_string();

        let encoded = serde_yaml::to_value(&next)?;
        data.insert(key.clone(), encoded.clone());
        store
            .publish(StoreUpdate {
                version,
                namespace: key.namespace.clone(),
                kind: UpdateKind::Modified,
                value: encoded,
            })
            .await;
        drop(data);

        debug!(kind = S::LABEL, %key, version, "status updated");
        Ok(next)
    }

    async fn delete_item<S>(&self, key: &NamespacedName) -> Result<(), StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let mut data = store.data.write().await;
        let mut current: MetadataObject<S> =
            SpecStore::decode(&data, key)?.ok_or_else(|| not_found::<S>(key))?;

        if current.metadata.is_being_deleted() {
            trace!(kind = S::LABEL, %key, "already terminating");
            return Ok(());
        }

        let version = self.next_version();
        current.metadata.resource_version = version.to_string();
        let kind = if current.metadata.finalizers.is_empty() {
            data.remove(key);
            UpdateKind::Deleted
        } else {
            debug!(kind = S::LABEL, %key, finalizers = ?current.metadata.finalizers, "marked for deletion");
            current.metadata.deletion_timestamp = Some(Utc::now());
            UpdateKind::Modified
        };

        let encoded = serde_yaml::to_value(&current)?;
        if kind == UpdateKind::Modified {
            data.insert(key.clone(), encoded.clone());
        }
        store
            .publish(StoreUpdate {
                version,
                namespace: key.namespace.clone(),
                kind,
                value: encoded,
            })
            .await;

        Ok(())
    }

    fn watch_stream_since<S>(
        &self,
        namespace: &NameSpace,
        resource_version: Option<String>,
    ) -> BoxStream<'_, Result<Vec<WatchEvent<S>>, StoreError>>
    where
        S: Spec,
    {
        let namespace = namespace.clone();
        let since = resource_version.and_then(|version| version.parse::<u64>().ok());

        let ft_stream = async move {
            let store = self.get_store::<S>().await;
            let mut watch = store.watch.lock().await;
            match watch.subscribe(since) {
                Ok(receiver) => receiver
                    .filter(move |update: &StoreUpdate| {
                        let in_scope = namespace.contains(&update.namespace);
                        async move { in_scope }
                    })
                    .map(|update| update.into_watch_event::<S>().map(|event| vec![event]))
                    .left_stream(),
                Err(err) => {
                    debug!(kind = S::LABEL, "{err}");
                    stream::once(async move { Err(err) }).right_stream()
                }
            }
        };

        ft_stream
            .flatten_stream()
            .boxed()
    }
}

#[cfg(test)]
mod test {

    use std::time::Duration;

    use futures_util::StreamExt;

    use fluid_controlplane_metadata::core::ObjectMeta;
    use fluid_controlplane_metadata::dataset::{DatasetSpec, DatasetPhase};

    use super::*;

    fn dataset(name: &str) -> MetadataObject<DatasetSpec> {
        MetadataObject::new(ObjectMeta::new(name, "ns"), DatasetSpec::default())
    }

    #[fluvio_future::test]
    async fn test_create_and_retrieve() {
        let client = MemoryClient::new_shared();
        let created = client.create_item(dataset("ds1")).await.expect("create");

        assert_eq!(created.metadata.generation, 1);
        assert!(!created.metadata.uid.is_empty());

        let item: MetadataObject<DatasetSpec> = client
            .retrieve_item(&NamespacedName::new("ns", "ds1"))
            .await
            .expect("retrieve");
        assert_eq!(item, created);

        let err = client
            .create_item(dataset("ds1"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::AlreadyExists { .. }));

        let err = client
            .retrieve_item::<DatasetSpec>(&NamespacedName::new("ns", "ds2"))
            .await
            .expect_err("missing");
        assert!(err.is_not_found());
    }

    #[fluvio_future::test]
    async fn test_update_conflict() {
        let client = MemoryClient::new_shared();
        let created = client.create_item(dataset("ds1")).await.expect("create");

        let mut first = created.clone();
        first.metadata.add_finalizer("a");
        let updated = client.update_item(first).await.expect("update");
        assert_eq!(updated.metadata.generation, 2);

        // stale copy loses
        let mut second = created;
        second.metadata.add_finalizer("b");
        let err = client.update_item(second).await.expect_err("conflict");
        assert!(err.is_conflict());
    }

    #[fluvio_future::test]
    async fn test_status_update_keeps_generation() {
        let client = MemoryClient::new_shared();
        let mut created = client.create_item(dataset("ds1")).await.expect("create");

        created.status.phase = DatasetPhase::NotBound;
        let updated = client.update_status(created.clone()).await.expect("status");

        assert_eq!(updated.metadata.generation, created.metadata.generation);
        assert_ne!(updated.metadata.resource_version, created.metadata.resource_version);
        assert_eq!(updated.status.phase, DatasetPhase::NotBound);

        // status is ignored by regular update
        let mut spec_update = updated.clone();
        spec_update.status.phase = DatasetPhase::Failed;
        spec_update.metadata.add_finalizer("a");
        let updated = client.update_item(spec_update).await.expect("update");
        assert_eq!(updated.status.phase, DatasetPhase::NotBound);
    }

    #[fluvio_future::test]
    async fn test_no_op_update_keeps_version() {
        let client = MemoryClient::new_shared();
        let created = client.create_item(dataset("ds1")).await.expect("create");

        let updated = client.update_item(created.clone()).await.expect("update");
        assert_eq!(updated.metadata.resource_version, created.metadata.resource_version);
        assert_eq!(updated.metadata.generation, created.metadata.generation);
    }

    #[fluvio_future::test]
    async fn test_delete_with_finalizer() {
        let client = MemoryClient::new_shared();
        let mut obj = dataset("ds1");
        obj.metadata.add_finalizer("a");
        obj.metadata.add_finalizer("b");
        client.create_item(obj).await.expect("create");

        let key = NamespacedName::new("ns", "ds1");
        client.delete_item::<DatasetSpec>(&key).await.expect("delete");

        let mut terminating: MetadataObject<DatasetSpec> =
            client.retrieve_item(&key).await.expect("still there");
        assert!(terminating.metadata.is_being_deleted());

        terminating.metadata.remove_finalizer("a");
        let mut terminating = client.update_item(terminating).await.expect("update");
        assert!(client.retrieve_item::<DatasetSpec>(&key).await.is_ok());

        terminating.metadata.remove_finalizer("b");
        client.update_item(terminating).await.expect("update");
        let err = client
            .retrieve_item::<DatasetSpec>(&key)
            .await
            .expect_err("removed");
        assert!(err.is_not_found());
    }

    #[fluvio_future::test]
    async fn test_watch_stream() {
        let client = MemoryClient::new_shared();
        let list = client
            .retrieve_items::<DatasetSpec>(&NameSpace::All)
            .await
            .expect("list");

        let mut other_ns = dataset("ds2");
        other_ns.metadata.namespace = "other".to_owned();
        let created = client.create_item(dataset("ds1")).await.expect("create");
        client.create_item(other_ns).await.expect("create");
        client
            .delete_item::<DatasetSpec>(&created.key())
            .await
            .expect("delete");

        // subscribed after the writes, resumes from list version
        let updates = client
            .watch_stream_since::<DatasetSpec>(&NameSpace::Named("ns".to_owned()), Some(list.version))
            .take_until(fluvio_future::timer::sleep(Duration::from_millis(200)))
            .collect::<Vec<_>>()
            .await;

        let updates: Vec<WatchEvent<DatasetSpec>> =
            updates.into_iter().flatten().flatten().collect();
        assert_eq!(updates.len(), 2);
        assert!(matches!(updates.first(), Some(WatchEvent::Added(obj)) if obj.metadata.name == "ds1"));
        assert!(matches!(updates.get(1), Some(WatchEvent::Deleted(obj)) if obj.metadata.name == "ds1"));
    }

    #[test]
    fn test_watch_state_expired() {
        let mut watch = WatchState::with_capacity(2);
        for version in 1..=4 {
            watch.publish(StoreUpdate {
                version,
                namespace: "ns".to_owned(),
                kind: UpdateKind::Added,
                value: Value::Null,
            });
        }

        // versions 1 and 2 were evicted
        assert!(matches!(
            watch.subscribe(Some(1)),
            Err(StoreError::Expired { .. })
        ));
        let receiver = watch.subscribe(Some(2)).expect("in history");
        assert_eq!(receiver.len(), 2);
        assert!(watch.subscribe(None).is_ok());
    }

    #[fluvio_future::test]
    async fn test_watch_from_evicted_version() {
        let client = MemoryClient::new_shared();
        let list = client
            .retrieve_items::<DatasetSpec>(&NameSpace::All)
            .await
            .expect("list");

        for i in 0..MAX_HISTORY + 5 {
            client
                .create_item(dataset(&format!("ds{i}")))
                .await
                .expect("create");
        }

        let mut stream =
            client.watch_stream_since::<DatasetSpec>(&NameSpace::All, Some(list.version));
        let first = stream.next().await.expect("item");
        let err = first.expect_err("expired");
        assert!(err.is_expired());
    }
}

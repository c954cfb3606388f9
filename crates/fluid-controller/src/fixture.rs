//! test doubles for reconciler collaborators

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_lock::Mutex;
use async_trait::async_trait;

use fluvio_future::timer::sleep;

use futures_util::stream::BoxStream;

use fluid_controlplane_metadata::core::{MetadataObject, NamespacedName, Spec};
use fluid_controlplane_metadata::event::{EventType, ObjectReference};
use fluid_stream_dispatcher::StoreError;
use fluid_stream_dispatcher::metadata::memory::MemoryClient;
use fluid_stream_dispatcher::metadata::{MetadataClient, MetadataStoreList, NameSpace, WatchEvent};

use crate::activation::{Activation, ActivationError, EngineActivator};
use crate::controllers::dataset::{PhaseObserver, ReconcileError, ReconcileRequest};
use crate::events::EventRecorder;
use crate::usage::{UsageChecker, UsageError};

pub struct ActivatorStub {
    resolved: bool,
    scaled_up: bool,
    delay: Option<Duration>,
}

impl ActivatorStub {
    pub fn resolved(scaled_up: bool) -> Self {
        Self {
            resolved: true,
            scaled_up,
            delay: None,
        }
    }

    pub fn unresolved() -> Self {
        Self {
            resolved: false,
            scaled_up: false,
            delay: None,
        }
    }

    /// every activation takes `delay` before answering
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::resolved(false)
        }
    }
}

#[async_trait]
impl EngineActivator for ActivatorStub {
    async fn ensure_active(&self, key: &NamespacedName) -> Result<Activation, ActivationError> {
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if self.resolved {
            Ok(Activation {
                controller: "fluid-system/alluxioruntime-controller".to_owned(),
                scaled_up: self.scaled_up,
            })
        } else {
            Err(ActivationError::Unresolved(key.clone()))
        }
    }
}

#[derive(Default)]
pub struct UsageStub {
    in_use: AtomicBool,
    indeterminate: AtomicBool,
}

impl UsageStub {
    pub fn set_in_use(&self, in_use: bool) {
        self.in_use.store(in_use, Ordering::SeqCst);
    }

    pub fn set_indeterminate(&self) {
        self.indeterminate.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UsageChecker for UsageStub {
    async fn check_in_use(&self, name: &str, namespace: &str) -> Result<(), UsageError> {
        let dataset = NamespacedName::new(namespace, name);
        if self.indeterminate.load(Ordering::SeqCst) {
            return Err(UsageError::Indeterminate {
                dataset,
                source: StoreError::Closed,
            });
        }
        if self.in_use.load(Ordering::SeqCst) {
            return Err(UsageError::InUse {
                dataset,
                pod: "app".to_owned(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecorderStub {
    events: Mutex<Vec<(EventType, String, String)>>,
}

impl RecorderStub {
    pub async fn events(&self) -> Vec<(EventType, String, String)> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventRecorder for RecorderStub {
    async fn record(
        &self,
        _object: ObjectReference,
        event_type: EventType,
        reason: &str,
        message: &str,
    ) {
        self.events
            .lock()
            .await
            .push((event_type, reason.to_owned(), message.to_owned()));
    }
}

#[derive(Default)]
pub struct CountingObserver {
    seen: AtomicUsize,
}

impl CountingObserver {
    pub fn count(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhaseObserver for CountingObserver {
    async fn observe(&self, _request: &ReconcileRequest) -> Result<(), ReconcileError> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// store whose reads of one kind always fail
pub struct FailingClient {
    store: MemoryClient,
    failing: &'static str,
}

impl FailingClient {
    pub fn failing<S: Spec>() -> Self {
        Self {
            store: MemoryClient::default(),
            failing: S::LABEL,
        }
    }

    fn check<S: Spec>(&self) -> Result<(), StoreError> {
        if S::LABEL == self.failing {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetadataClient for FailingClient {
    async fn retrieve_item<S>(&self, key: &NamespacedName) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec,
    {
        self.check::<S>()?;
        self.store.retrieve_item(key).await
    }

    async fn retrieve_items<S>(
        &self,
        namespace: &NameSpace,
    ) -> Result<MetadataStoreList<S>, StoreError>
    where
        S: Spec,
    {
        self.check::<S>()?;
        self.store.retrieve_items(namespace).await
    }

    async fn create_item<S>(&self, value: MetadataObject<S>) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec,
    {
        self.store.create_item(value).await
    }

    async fn update_item<S>(&self, value: MetadataObject<S>) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec,
    {
        self.store.update_item(value).await
    }

    async fn update_status<S>(
        &self,
        value: MetadataObject<S>,
    ) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec,
    {
        self.store.update_status(value).await
    }

    async fn delete_item<S>(&self, key: &NamespacedName) -> Result<(), StoreError>
    where
        S: Spec,
    {
        self.store.delete_item::<S>(key).await
    }

    fn watch_stream_since<S>(
        &self,
        namespace: &NameSpace,
        resource_version: Option<String>,
    ) -> BoxStream<'_, Result<Vec<WatchEvent<S>>, StoreError>>
    where
        S: Spec,
    {
        self.store.watch_stream_since(namespace, resource_version)
    }
}

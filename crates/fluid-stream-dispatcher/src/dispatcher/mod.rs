//!
//! # Change dispatcher
//!
//! Lists objects of one kind, then watches changes from the listed version and feeds
//! the key of every touched object into a work queue.
//!
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tracing::{debug, trace, info, error, instrument};

use fluvio_future::task::spawn;
use fluvio_future::timer::sleep;
use fluvio_types::event::StickyEvent;

use fluid_controlplane_metadata::core::{Spec, NamespacedName};

use crate::StoreError;
use crate::metadata::{MetadataClient, NameSpace, SharedClient};
use crate::queue::WorkQueue;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

pub struct ChangeDispatcher<S, C> {
    client: SharedClient<C>,
    namespace: NameSpace,
    queue: WorkQueue<NamespacedName>,
    shutdown: Arc<StickyEvent>,
    data: PhantomData<S>,
}

impl<S, C> ChangeDispatcher<S, C>
where
    S: Spec,
    C: MetadataClient + 'static,
{
    pub fn new(
        client: SharedClient<C>,
        namespace: NameSpace,
        queue: WorkQueue<NamespacedName>,
        shutdown: Arc<StickyEvent>,
    ) -> Self {
        Self {
            client,
            namespace,
            queue,
            shutdown,
            data: PhantomData,
        }
    }

    pub fn start(self) {
        spawn(self.dispatch_loop());
    }

    #[instrument(skip(self), name = "ChangeDispatcher", fields(kind = S::LABEL, namespace = %self.namespace))]
    async fn dispatch_loop(self) {
        use tokio::select;

        info!("started");
        loop {
            match self.inner_loop().await {
                Ok(()) => break,
                Err(err) if err.is_expired() => {
                    debug!("watch expired, re-listing: {err}");
                }
                Err(err) => {
                    error!("error with inner loop: {err}");
                    debug!(delay = ?DEFAULT_RETRY_DELAY, "re-listing after delay");
                    select! {
                        _ = sleep(DEFAULT_RETRY_DELAY) => {},
                        _ = self.shutdown.listen() => {
                            break;
                        }
                    }
                }
            }
        }
        info!("terminated");
    }

    /// runs until shutdown, any store failure restarts from a fresh list
    async fn inner_loop(&self) -> Result<(), StoreError> {
        use tokio::select;

        if self.shutdown.is_set() {
            return Ok(());
        }

        let list = self.client.retrieve_items::<S>(&self.namespace).await?;
        debug!(version = %list.version, items = list.items.len(), "initial list");
        for item in list.items {
            self.queue.add(item.key()).await;
        }

        let mut stream = self
            .client
            .watch_stream_since::<S>(&self.namespace, Some(list.version));

        loop {
            trace!("waiting for changes");

            select! {
                _ = self.shutdown.listen() => {
                    debug!("shutdown requested");
                    return Ok(());
                },
                next = stream.next() => {
                    match next {
                        Some(Ok(events)) => {
                            for event in events {
                                let key = event.key();
                                trace!(%key, "change");
                                self.queue.add(key).await;
                            }
                        }
                        Some(Err(err)) => return Err(err),
                        None => {
                            debug!("watch stream ended");
                            return Err(StoreError::Closed);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::stream::{self, BoxStream};

    use fluvio_future::timer::sleep;

    use fluid_controlplane_metadata::core::{MetadataObject, ObjectMeta};
    use fluid_controlplane_metadata::dataset::DatasetSpec;

    use crate::metadata::memory::MemoryClient;
    use crate::metadata::{MetadataStoreList, WatchEvent};

    use super::*;

    /// first watch fails as expired, later watches go to the store
    #[derive(Default)]
    struct ExpiringClient {
        store: MemoryClient,
        watches: AtomicUsize,
    }

    #[async_trait]
    impl MetadataClient for ExpiringClient {
        async fn retrieve_item<S>(&self, key: &NamespacedName) -> Result<MetadataObject<S>, StoreError>
        where
            S: Spec,
        {
            self.store.retrieve_item(key).await
        }

        async fn retrieve_items<S>(
            &self,
            namespace: &NameSpace,
        ) -> Result<MetadataStoreList<S>, StoreError>
        where
            S: Spec,
        {
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
            if self.watches.fetch_add(1, Ordering::SeqCst) == 0 {
                let err = StoreError::Expired {
                    version: resource_version.unwrap_or_default(),
                    oldest: "100".to_owned(),
                };
                stream::once(async move { Err(err) }).boxed()
            } else {
                self.store.watch_stream_since(namespace, resource_version)
            }
        }
    }

    #[fluvio_future::test]
    async fn test_expired_watch_lists_again() {
        let client = Arc::new(ExpiringClient::default());
        client
            .create_item(MetadataObject::new(
                ObjectMeta::new("ds1", "ns"),
                DatasetSpec::default(),
            ))
            .await
            .expect("create");

        let queue = WorkQueue::default();
        let shutdown = StickyEvent::shared();
        ChangeDispatcher::<DatasetSpec, _>::new(
            client.clone(),
            NameSpace::All,
            queue.clone(),
            shutdown.clone(),
        )
        .start();

        let key = NamespacedName::new("ns", "ds1");
        assert_eq!(queue.get().await, Some(key.clone()));
        queue.done(&key).await;

        // listed again right away, without the failure delay
        let relisted = tokio::select! {
            key = queue.get() => key,
            _ = sleep(Duration::from_secs(1)) => None,
        };
        assert_eq!(relisted, Some(key.clone()));
        queue.done(&key).await;

        client
            .create_item(MetadataObject::new(
                ObjectMeta::new("ds2", "ns"),
                DatasetSpec::default(),
            ))
            .await
            .expect("create");
        assert_eq!(queue.get().await, Some(NamespacedName::new("ns", "ds2")));

        sleep(Duration::from_millis(50)).await;
        assert_eq!(client.watches.load(Ordering::SeqCst), 2);
        shutdown.notify();
    }

    #[fluvio_future::test]
    async fn test_list_then_watch() {
        let client = MemoryClient::new_shared();
        client
            .create_item(MetadataObject::new(
                ObjectMeta::new("ds1", "ns"),
                DatasetSpec::default(),
            ))
            .await
            .expect("create");

        let queue = WorkQueue::default();
        let shutdown = StickyEvent::shared();
        ChangeDispatcher::<DatasetSpec, _>::new(
            client.clone(),
            NameSpace::Named("ns".to_owned()),
            queue.clone(),
            shutdown.clone(),
        )
        .start();

        assert_eq!(queue.get().await, Some(NamespacedName::new("ns", "ds1")));

        client
            .create_item(MetadataObject::new(
                ObjectMeta::new("ds2", "ns"),
                DatasetSpec::default(),
            ))
            .await
            .expect("create");
        client
            .create_item(MetadataObject::new(
                ObjectMeta::new("ds3", "other"),
                DatasetSpec::default(),
            ))
            .await
            .expect("create");

        assert_eq!(queue.get().await, Some(NamespacedName::new("ns", "ds2")));

        shutdown.notify();
        sleep(Duration::from_millis(50)).await;
        assert!(queue.is_empty());
    }
}

//!
//! # Event recorder
//!
//! Operator visible events attached to objects. Repeated events with the same reason
//! for the same object are aggregated into one record.
//!
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use fluid_controlplane_metadata::core::{Spec, MetadataObject, NamespacedName, ObjectMeta};
use fluid_controlplane_metadata::event::{EventSource, EventSpec, EventType, ObjectReference};
use fluid_stream_dispatcher::StoreError;
use fluid_stream_dispatcher::metadata::{MetadataClient, SharedClient};

pub const DATASET_CONTROLLER_COMPONENT: &str = "dataset-controller";

pub fn object_reference<S: Spec>(obj: &MetadataObject<S>) -> ObjectReference {
    ObjectReference {
        kind: S::LABEL.to_owned(),
        namespace: obj.metadata.namespace.clone(),
        name: obj.metadata.name.clone(),
        uid: obj.metadata.uid.clone(),
    }
}

/// Recording is best effort, failures never reach the caller
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn record(
        &self,
        object: ObjectReference,
        event_type: EventType,
        reason: &str,
        message: &str,
    );
}

/// Writes events into the metadata store
#[derive(Debug)]
pub struct StoreEventRecorder<C> {
    client: SharedClient<C>,
    component: String,
}

impl<C> StoreEventRecorder<C>
where
    C: MetadataClient,
{
    pub fn new(client: SharedClient<C>, component: impl Into<String>) -> Self {
        Self {
            client,
            component: component.into(),
        }
    }

    /// event name is derived from object and reason so repeats land on the same record
    pub fn event_key(object: &ObjectReference, reason: &str) -> NamespacedName {
        NamespacedName::new(
            object.namespace.clone(),
            format!("{}.{}", object.name, reason.to_lowercase()),
        )
    }

    async fn try_record(
        &self,
        object: ObjectReference,
        event_type: EventType,
        reason: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        let key = Self::event_key(&object, reason);
        let now = Utc::now();

        match self.client.retrieve_item::<EventSpec>(&key).await {
            Ok(mut event) => {
                event.spec.count = event.spec.count.saturating_add(1);
                event.spec.last_timestamp = Some(now);
                event.spec.message = message.to_owned();
                event.spec.event_type = event_type;
                self.client.update_item(event).await?;
            }
            Err(err) if err.is_not_found() => {
                let spec = EventSpec {
                    involved_object: object,
                    event_type,
                    reason: reason.to_owned(),
                    message: message.to_owned(),
                    count: 1,
                    first_timestamp: Some(now),
                    last_timestamp: Some(now),
                    source: EventSource {
                        component: self.component.clone(),
                    },
                };
                self.client
                    .create_item(MetadataObject::new(
                        ObjectMeta::new(key.name.clone(), key.namespace.clone()),
                        spec,
                    ))
                    .await?;
            }
            Err(err) => return Err(err),
        }

        debug!(event = %key, %event_type, reason, "recorded");
        Ok(())
    }
}

#[async_trait]
impl<C> EventRecorder for StoreEventRecorder<C>
where
    C: MetadataClient + 'static,
{
    async fn record(
        &self,
        object: ObjectReference,
        event_type: EventType,
        reason: &str,
        message: &str,
    ) {
        if let Err(err) = self.try_record(object, event_type, reason, message).await {
            warn!(reason, "unable to record event: {err}");
        }
    }
}

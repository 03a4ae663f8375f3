//! Change notifications.
//!
//! Every document write and every domain event is broadcast in-process (the
//! admin SSE stream subscribes here) and, when a NATS client is configured,
//! published on `vitrine.<store>.<name>`.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::events::DomainEvent;
use crate::domain::value_objects::StoreId;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug, Serialize)]
pub struct StoreEvent {
    pub store_id: StoreId,
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Change { collection: String, id: String, kind: ChangeKind },
    Domain { event: DomainEvent },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind { Created, Updated, Deleted }

impl StoreEvent {
    /// NATS subject for this event.
    pub fn subject(&self) -> String {
        match &self.payload {
            EventPayload::Change { collection, kind, .. } => {
                let kind = match kind { ChangeKind::Created => "created", ChangeKind::Updated => "updated", ChangeKind::Deleted => "deleted" };
                format!("vitrine.{}.{collection}.{kind}", self.store_id)
            }
            EventPayload::Domain { event } => format!("vitrine.{}.{}", self.store_id, event.name()),
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
    nats: Option<async_nats::Client>,
}

impl EventBus {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx, nats }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> { self.tx.subscribe() }

    pub async fn change(&self, store_id: &StoreId, collection: &str, id: &str, kind: ChangeKind) {
        self.publish(StoreEvent {
            store_id: store_id.clone(),
            payload: EventPayload::Change { collection: collection.to_string(), id: id.to_string(), kind },
        })
        .await;
    }

    pub async fn domain(&self, store_id: &StoreId, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(StoreEvent { store_id: store_id.clone(), payload: EventPayload::Domain { event } }).await;
        }
    }

    async fn publish(&self, event: StoreEvent) {
        // No subscribers is the normal case outside of an open admin session.
        let _ = self.tx.send(event.clone());

        let Some(nats) = &self.nats else { return };
        let subject = event.subject();
        match serde_json::to_vec(&event) {
            Ok(payload) => {
                if let Err(e) = nats.publish(subject.clone(), payload.into()).await {
                    tracing::warn!(error = %e, %subject, "failed to publish event to NATS");
                }
            }
            Err(e) => tracing::warn!(error = %e, %subject, "failed to serialize event"),
        }
    }
}

//! Broadcast dispatch and push delivery.

mod transport;

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use uuid::Uuid;
use web_push::SubscriptionInfo;

use shared::NotificationPayload;

use crate::db::{self, Db};

pub use transport::{DeliveryError, PushTransport, VapidConfig, WebPushTransport};

/// Notification title shown for every broadcast.
const NOTIFICATION_TITLE: &str = "New Update!";

/// How a single delivery attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Endpoint permanently gone; the subscription row was pruned.
    Pruned,
    /// Transient failure; the subscription is retained.
    Failed,
}

/// Result of one broadcast, available once every attempt has settled.
#[derive(Debug)]
pub struct BroadcastSummary {
    pub message_id: Uuid,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl BroadcastSummary {
    pub fn count(&self, outcome: DeliveryOutcome) -> usize {
        self.outcomes.iter().filter(|o| **o == outcome).count()
    }
}

/// Fan-out dispatcher over the subscription and message stores.
pub struct Dispatcher {
    db: Arc<Db>,
    transport: Arc<dyn PushTransport>,
}

impl Dispatcher {
    pub fn new(db: Arc<Db>, transport: Arc<dyn PushTransport>) -> Self {
        Self { db, transport }
    }

    /// Persist `content`, then deliver one identical notification payload to
    /// every subscriber. Persistence failure aborts before any delivery
    /// attempt. Per-subscriber failures never abort the batch: gone endpoints
    /// are pruned (best-effort), anything else is logged and the subscription
    /// retained.
    pub async fn broadcast(&self, content: &str) -> Result<BroadcastSummary> {
        let (message_id, subscribers) = {
            let conn = self.db.0.lock().unwrap();
            let message_id =
                db::insert_message(&conn, content).context("persist broadcast message")?;
            let subscribers = db::list_subscriptions(&conn).context("load subscribers")?;
            (message_id, subscribers)
        };

        let payload = serde_json::to_vec(&NotificationPayload {
            title: NOTIFICATION_TITLE.to_string(),
            body: content.to_string(),
        })?;

        // Every attempt is created before any is awaited; join_all waits for
        // the whole set to settle and preserves subscriber order.
        let attempts = subscribers.iter().map(|(id, endpoint, p256dh, auth)| {
            let info = SubscriptionInfo::new(endpoint, p256dh, auth);
            let payload = &payload;
            async move {
                (
                    *id,
                    endpoint.as_str(),
                    self.transport.deliver(&info, payload).await,
                )
            }
        });
        let settled = join_all(attempts).await;

        let mut outcomes = Vec::with_capacity(settled.len());
        for (id, endpoint, result) in settled {
            let outcome = match result {
                Ok(()) => DeliveryOutcome::Delivered,
                Err(DeliveryError::Gone) => {
                    let conn = self.db.0.lock().unwrap();
                    if let Err(e) = db::delete_subscription(&conn, id) {
                        tracing::warn!("failed to prune gone subscription {}: {:#}", id, e);
                    }
                    DeliveryOutcome::Pruned
                }
                Err(DeliveryError::Other(e)) => {
                    tracing::warn!("push to {} failed: {:#}", endpoint, e);
                    DeliveryOutcome::Failed
                }
            };
            outcomes.push(outcome);
        }

        let summary = BroadcastSummary {
            message_id,
            outcomes,
        };
        tracing::info!(
            "broadcast {}: {} delivered, {} pruned, {} failed",
            message_id,
            summary.count(DeliveryOutcome::Delivered),
            summary.count(DeliveryOutcome::Pruned),
            summary.count(DeliveryOutcome::Failed),
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::sync::Mutex;

    /// Scripted transport: per-endpoint outcome, records every attempt.
    struct ScriptedTransport {
        gone: Vec<String>,
        failing: Vec<String>,
        attempts: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(gone: Vec<&str>, failing: Vec<&str>) -> Self {
            Self {
                gone: gone.into_iter().map(String::from).collect(),
                failing: failing.into_iter().map(String::from).collect(),
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempted(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl PushTransport for ScriptedTransport {
        async fn deliver(
            &self,
            subscription: &SubscriptionInfo,
            _payload: &[u8],
        ) -> Result<(), DeliveryError> {
            self.attempts
                .lock()
                .unwrap()
                .push(subscription.endpoint.clone());
            if self.gone.contains(&subscription.endpoint) {
                Err(DeliveryError::Gone)
            } else if self.failing.contains(&subscription.endpoint) {
                Err(DeliveryError::Other(anyhow::anyhow!(
                    "503 from push service"
                )))
            } else {
                Ok(())
            }
        }
    }

    fn test_db() -> Arc<Db> {
        let migrations_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../migrations")
            .canonicalize()
            .unwrap();
        std::env::set_var("MIGRATIONS_DIR", migrations_dir);
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        db::run_migrations(&conn).unwrap();
        Arc::new(Db(Mutex::new(conn)))
    }

    fn seed(db: &Db, endpoints: &[&str]) {
        let conn = db.0.lock().unwrap();
        for endpoint in endpoints {
            db::upsert_subscription(&conn, endpoint, "p256dh", "auth").unwrap();
        }
    }

    fn remaining_endpoints(db: &Db) -> Vec<String> {
        let conn = db.0.lock().unwrap();
        let mut endpoints: Vec<String> = db::list_subscriptions(&conn)
            .unwrap()
            .into_iter()
            .map(|(_, endpoint, _, _)| endpoint)
            .collect();
        endpoints.sort();
        endpoints
    }

    #[tokio::test]
    async fn broadcast_prunes_gone_subscribers_and_keeps_the_rest() {
        let db = test_db();
        seed(&db, &["https://push/e1", "https://push/e2", "https://push/e3"]);
        let transport = Arc::new(ScriptedTransport::new(vec!["https://push/e2"], vec![]));
        let dispatcher = Dispatcher::new(db.clone(), transport.clone());

        let summary = dispatcher.broadcast("Hello").await.unwrap();

        assert_eq!(summary.outcomes.len(), 3);
        assert_eq!(summary.count(DeliveryOutcome::Delivered), 2);
        assert_eq!(summary.count(DeliveryOutcome::Pruned), 1);
        assert_eq!(summary.count(DeliveryOutcome::Failed), 0);
        assert_eq!(
            remaining_endpoints(&db),
            vec!["https://push/e1".to_string(), "https://push/e3".to_string()]
        );

        let conn = db.0.lock().unwrap();
        let (id, content, _) = db::latest_message(&conn).unwrap().unwrap();
        assert_eq!(id, summary.message_id);
        assert_eq!(content, "Hello");
    }

    #[tokio::test]
    async fn transient_failure_retains_subscription_and_rest_still_delivered() {
        let db = test_db();
        seed(&db, &["https://push/e1", "https://push/e2", "https://push/e3"]);
        let transport = Arc::new(ScriptedTransport::new(vec![], vec!["https://push/e2"]));
        let dispatcher = Dispatcher::new(db.clone(), transport.clone());

        let summary = dispatcher.broadcast("still here").await.unwrap();

        assert_eq!(summary.count(DeliveryOutcome::Delivered), 2);
        assert_eq!(summary.count(DeliveryOutcome::Failed), 1);
        assert_eq!(summary.count(DeliveryOutcome::Pruned), 0);
        // Every subscriber was attempted despite the failure.
        assert_eq!(transport.attempted().len(), 3);
        assert_eq!(remaining_endpoints(&db).len(), 3);
    }

    #[tokio::test]
    async fn persistence_failure_prevents_any_delivery_attempt() {
        let db = test_db();
        seed(&db, &["https://push/e1"]);
        {
            let conn = db.0.lock().unwrap();
            conn.execute_batch("DROP TABLE messages;").unwrap();
        }
        let transport = Arc::new(ScriptedTransport::new(vec![], vec![]));
        let dispatcher = Dispatcher::new(db.clone(), transport.clone());

        let result = dispatcher.broadcast("never sent").await;

        assert!(result.is_err());
        assert!(transport.attempted().is_empty());
        assert_eq!(remaining_endpoints(&db).len(), 1);
    }

    #[tokio::test]
    async fn broadcast_with_no_subscribers_still_persists_message() {
        let db = test_db();
        let transport = Arc::new(ScriptedTransport::new(vec![], vec![]));
        let dispatcher = Dispatcher::new(db.clone(), transport);

        let summary = dispatcher.broadcast("solo").await.unwrap();

        assert!(summary.outcomes.is_empty());
        let conn = db.0.lock().unwrap();
        let (_, content, _) = db::latest_message(&conn).unwrap().unwrap();
        assert_eq!(content, "solo");
    }

    #[tokio::test]
    async fn pruned_subscriber_is_absent_from_the_next_broadcast() {
        let db = test_db();
        seed(&db, &["https://push/e1"]);
        let transport = Arc::new(ScriptedTransport::new(vec!["https://push/e1"], vec![]));
        let dispatcher = Dispatcher::new(db.clone(), transport.clone());

        let summary = dispatcher.broadcast("first").await.unwrap();
        assert_eq!(summary.count(DeliveryOutcome::Pruned), 1);

        let summary = dispatcher.broadcast("second").await.unwrap();
        assert!(summary.outcomes.is_empty());
        assert_eq!(transport.attempted().len(), 1);
    }
}

//! Shared request/response and domain models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery credentials for a push endpoint, exactly as the browser hands
/// them over in `PushSubscription.toJSON()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Subscribe request (subscriber client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// Broadcast request (admin console).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastRequest {
    pub content: String,
}

/// Broadcast response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub success: bool,
}

/// Latest message response. The empty-board placeholder carries only
/// `content`, so `id` and `created_at` are omitted when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Push payload rendered by the client-side service worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_request_parses_browser_subscription_json() {
        let json = r#"{
            "endpoint": "https://fcm.googleapis.com/fcm/send/abc123",
            "keys": {"p256dh": "BPubKey", "auth": "authSecret"}
        }"#;
        let req: SubscribeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.endpoint, "https://fcm.googleapis.com/fcm/send/abc123");
        assert_eq!(req.keys.p256dh, "BPubKey");
        assert_eq!(req.keys.auth, "authSecret");
    }

    #[test]
    fn message_response_placeholder_has_only_content() {
        let resp = MessageResponse {
            id: None,
            content: "No messages yet".to_string(),
            created_at: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json, serde_json::json!({"content": "No messages yet"}));
    }

    #[test]
    fn message_response_serde_roundtrip() {
        let resp = MessageResponse {
            id: Some(Uuid::new_v4()),
            content: "hello".to_string(),
            created_at: Some("2025-01-01T00:00:00Z".to_string()),
        };
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: MessageResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, resp.id);
        assert_eq!(parsed.content, "hello");
    }

    #[test]
    fn notification_payload_field_names() {
        let payload = NotificationPayload {
            title: "New Update!".to_string(),
            body: "board update".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["title"], "New Update!");
        assert_eq!(json["body"], "board update");
    }
}

//! Push delivery transport.

use anyhow::anyhow;
use async_trait::async_trait;
use thiserror::Error;
use web_push::{
    ContentEncoding, HyperWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

/// VAPID material for signing push requests, fixed at startup.
#[derive(Debug, Clone)]
pub struct VapidConfig {
    /// `sub` claim, a `mailto:` or `https:` URI identifying the sender.
    pub subject: String,
    /// URL-safe base64 private key, as produced by VAPID key generators.
    pub private_key: String,
}

/// Why a single delivery attempt failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The push service reports the endpoint permanently invalid; the
    /// subscription must be removed.
    #[error("subscription endpoint gone")]
    Gone,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Delivers one payload to one subscriber.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn deliver(
        &self,
        subscription: &SubscriptionInfo,
        payload: &[u8],
    ) -> Result<(), DeliveryError>;
}

/// Web Push transport: VAPID-signed requests to the browser push services.
pub struct WebPushTransport {
    client: HyperWebPushClient,
    vapid: VapidConfig,
}

impl WebPushTransport {
    pub fn new(vapid: VapidConfig) -> Self {
        Self {
            client: HyperWebPushClient::new(),
            vapid,
        }
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn deliver(
        &self,
        subscription: &SubscriptionInfo,
        payload: &[u8],
    ) -> Result<(), DeliveryError> {
        let mut signature = VapidSignatureBuilder::from_base64(
            &self.vapid.private_key,
            URL_SAFE_NO_PAD,
            subscription,
        )
        .map_err(|e| anyhow!("vapid key: {}", e))?;
        signature.add_claim("sub", self.vapid.subject.clone());
        let signature = signature
            .build()
            .map_err(|e| anyhow!("vapid signature: {}", e))?;

        let mut message = WebPushMessageBuilder::new(subscription);
        message.set_payload(ContentEncoding::Aes128Gcm, payload);
        message.set_vapid_signature(signature);
        let message = message.build().map_err(|e| anyhow!("push message: {}", e))?;

        match self.client.send(message).await {
            Ok(()) => Ok(()),
            // 410 Gone and 404: the push service wants this subscription dropped.
            Err(WebPushError::EndpointNotValid(_)) | Err(WebPushError::EndpointNotFound(_)) => {
                Err(DeliveryError::Gone)
            }
            Err(e) => Err(DeliveryError::Other(e.into())),
        }
    }
}

//! Shared types and models for the noticeboard backend.

mod models;

// Explicit re-exports (avoids rust-analyzer issues with `pub use models::*`)
pub use models::{
    BroadcastRequest, BroadcastResponse, MessageResponse, NotificationPayload, SubscribeRequest,
    SubscriptionKeys,
};

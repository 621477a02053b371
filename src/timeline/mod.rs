//! Timeline subscriptions: the transport boundary and the walk built on top of it.
//!
//! The account transport (session handling, the websocket protocol) lives outside
//! this crate. Embedders implement [`Transport`] for it; [`TimelineWalker`] drives
//! the subscriptions and feeds the documents it finds into a
//! [`DocumentQueue`](crate::queue::DocumentQueue).

pub mod model;
pub mod walker;

pub use model::{
    Action, Cursors, DetailDocument, DetailSection, TimelineDetail, TimelineEvent,
    TimelineEventData, TimelinePage,
};
pub use walker::{TimelineWalker, WalkOptions};

use crate::error::Result;
use crate::utils::{PREVIEW_LINES, preview};
use serde::Deserialize;
use serde_json::Value;

/// Identifier the transport assigns to a subscription
pub type SubscriptionId = u64;

/// Subscription type of timeline pages
pub const TIMELINE_TYPE: &str = "timeline";

/// Subscription type of timeline details
pub const TIMELINE_DETAIL_TYPE: &str = "timelineDetail";

/// One message yielded by [`Transport::receive`]
#[derive(Clone, Debug)]
pub struct InboundFrame {
    /// Subscription the message answers
    pub subscription_id: SubscriptionId,
    /// Subscription metadata as sent with the request; carries at least `"type"`
    pub subscription: Value,
    /// Response body
    pub payload: Value,
}

/// The account transport the walker talks to
///
/// Requests only subscribe; answers arrive through [`receive`](Transport::receive)
/// one at a time, in arrival order.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Subscribe to one timeline page; `after` is the cursor of the previous page
    async fn request_timeline(&mut self, after: Option<&str>) -> Result<()>;

    /// Subscribe to the detail page of one timeline entry
    async fn request_timeline_detail(&mut self, id: &str) -> Result<()>;

    /// Wait for the next inbound message
    ///
    /// An error here is treated as fatal and ends the walk.
    async fn receive(&mut self) -> Result<InboundFrame>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for &mut T {
    async fn request_timeline(&mut self, after: Option<&str>) -> Result<()> {
        (**self).request_timeline(after).await
    }

    async fn request_timeline_detail(&mut self, id: &str) -> Result<()> {
        (**self).request_timeline_detail(id).await
    }

    async fn receive(&mut self) -> Result<InboundFrame> {
        (**self).receive().await
    }
}

/// Subscription types the walker understands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// A page of timeline entries
    Timeline,
    /// The detail page of one entry
    TimelineDetail,
}

/// An inbound message sorted by subscription type
#[derive(Clone, Debug)]
pub enum InboundMessage {
    /// A timeline page
    Timeline(TimelinePage),
    /// A timeline detail
    TimelineDetail(Box<TimelineDetail>),
    /// A known type whose payload did not have the expected shape
    Malformed {
        /// Which subscription type it claimed to be
        kind: MessageKind,
        /// Deserialization error
        error: String,
        /// First lines of the payload
        preview: String,
    },
    /// A subscription type the walker does not handle
    Unhandled {
        /// The `"type"` of the subscription (`"<missing>"` if absent)
        kind: String,
        /// First lines of the payload
        preview: String,
    },
}

impl InboundMessage {
    /// Sort a message by its subscription `"type"` and parse the payload
    pub fn classify(subscription: &Value, payload: &Value) -> Self {
        let kind = subscription
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<missing>");

        match kind {
            TIMELINE_TYPE => match TimelinePage::deserialize(payload) {
                Ok(page) => InboundMessage::Timeline(page),
                Err(e) => Self::malformed(MessageKind::Timeline, &e, payload),
            },
            TIMELINE_DETAIL_TYPE => match TimelineDetail::deserialize(payload) {
                Ok(detail) => InboundMessage::TimelineDetail(Box::new(detail)),
                Err(e) => Self::malformed(MessageKind::TimelineDetail, &e, payload),
            },
            other => InboundMessage::Unhandled {
                kind: other.to_string(),
                preview: preview(payload, PREVIEW_LINES),
            },
        }
    }

    fn malformed(kind: MessageKind, error: &serde_json::Error, payload: &Value) -> Self {
        InboundMessage::Malformed {
            kind,
            error: error.to_string(),
            preview: preview(payload, PREVIEW_LINES),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_timeline_page() {
        let message = InboundMessage::classify(
            &json!({ "type": "timeline" }),
            &json!({ "data": [], "cursors": {} }),
        );
        assert!(matches!(message, InboundMessage::Timeline(page) if page.data.is_empty()));
    }

    #[test]
    fn classify_detail() {
        let message = InboundMessage::classify(
            &json!({ "type": "timelineDetail", "id": "e1" }),
            &json!({ "titleText": "Apple", "sections": [] }),
        );
        match message {
            InboundMessage::TimelineDetail(detail) => assert_eq!(detail.title_text(), "Apple"),
            other => panic!("expected detail, got {other:?}"),
        }
    }

    #[test]
    fn classify_unknown_type_is_unhandled() {
        let message = InboundMessage::classify(
            &json!({ "type": "portfolioAggregateHistory" }),
            &json!({ "aggregates": [1, 2, 3] }),
        );
        match message {
            InboundMessage::Unhandled { kind, preview } => {
                assert_eq!(kind, "portfolioAggregateHistory");
                assert!(preview.contains("aggregates"));
            }
            other => panic!("expected unhandled, got {other:?}"),
        }
    }

    #[test]
    fn classify_missing_type_is_unhandled() {
        let message = InboundMessage::classify(&json!({}), &json!(null));
        assert!(matches!(message, InboundMessage::Unhandled { kind, .. } if kind == "<missing>"));
    }

    #[test]
    fn classify_bad_payload_is_malformed() {
        let message = InboundMessage::classify(
            &json!({ "type": "timeline" }),
            &json!({ "data": "not a list" }),
        );
        assert!(matches!(
            message,
            InboundMessage::Malformed {
                kind: MessageKind::Timeline,
                ..
            }
        ));
    }
}

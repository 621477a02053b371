//! Scripted in-memory transport

use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use timeline_dl::{Error, InboundFrame, Result, Transport};

/// Canned timeline: pages in order (newest first) plus detail pages by id
#[derive(Clone, Debug, Default)]
pub struct TimelineScript {
    pages: Vec<Vec<Value>>,
    details: HashMap<String, Value>,
    unsolicited: Vec<(String, Value)>,
}

impl TimelineScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page; every page but the last gets an `after` cursor
    pub fn page(mut self, entries: Vec<Value>) -> Self {
        self.pages.push(entries);
        self
    }

    /// Answer for `request_timeline_detail(id)`
    pub fn detail(mut self, id: &str, payload: Value) -> Self {
        self.details.insert(id.to_string(), payload);
        self
    }

    /// A message of another subscription type, delivered before anything else
    pub fn unsolicited(mut self, kind: &str, payload: Value) -> Self {
        self.unsolicited.push((kind.to_string(), payload));
        self
    }

    /// A fresh transport playing this script
    pub fn transport(&self) -> ScriptedTransport {
        let mut transport = ScriptedTransport {
            script: self.clone(),
            inbox: VecDeque::new(),
            next_subscription: 0,
            timeline_requests: Vec::new(),
            detail_requests: Vec::new(),
        };
        for (kind, payload) in &self.unsolicited {
            transport.deliver(kind, payload.clone());
        }
        transport
    }
}

/// Transport answering subscriptions from a [`TimelineScript`]
///
/// Answers are queued as soon as a subscription is requested. `receive` fails
/// with a transport error once nothing is left, so a walk that waits for a
/// message that will never come fails instead of hanging.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: TimelineScript,
    inbox: VecDeque<InboundFrame>,
    next_subscription: u64,
    /// Cursors passed to `request_timeline`, in order
    pub timeline_requests: Vec<Option<String>>,
    /// Ids passed to `request_timeline_detail`, in order
    pub detail_requests: Vec<String>,
}

impl ScriptedTransport {
    fn deliver(&mut self, kind: &str, payload: Value) {
        self.next_subscription += 1;
        self.inbox.push_back(InboundFrame {
            subscription_id: self.next_subscription,
            subscription: json!({ "type": kind }),
            payload,
        });
    }
}

fn cursor(index: usize) -> String {
    format!("page-{index}")
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn request_timeline(&mut self, after: Option<&str>) -> Result<()> {
        self.timeline_requests.push(after.map(str::to_string));

        let index = match after {
            None => 0,
            Some(after) => (1..self.script.pages.len())
                .find(|&i| cursor(i) == after)
                .ok_or_else(|| Error::Transport(format!("unknown cursor {after}")))?,
        };
        let entries = self
            .script
            .pages
            .get(index)
            .cloned()
            .unwrap_or_default();
        let after = (index + 1 < self.script.pages.len()).then(|| cursor(index + 1));

        self.deliver(
            "timeline",
            json!({ "data": entries, "cursors": { "after": after } }),
        );
        Ok(())
    }

    async fn request_timeline_detail(&mut self, id: &str) -> Result<()> {
        self.detail_requests.push(id.to_string());
        let payload = self
            .script
            .details
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("no detail scripted for {id}")))?;
        self.deliver("timelineDetail", payload);
        Ok(())
    }

    async fn receive(&mut self) -> Result<InboundFrame> {
        self.inbox
            .pop_front()
            .ok_or_else(|| Error::Transport("subscription stream ended".to_string()))
    }
}

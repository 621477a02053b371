//! Timeline walker: pages through the timeline and turns detail pages into documents.
//!
//! The walk is a single loop over [`Transport::receive`]:
//!
//! - a timeline page queues its eligible entries for detail requests and either
//!   requests the next (older) page or ends paging
//! - a detail page is scanned for documents, each of which is offered to the
//!   [`DocumentQueue`]
//! - anything else is logged with a short preview and ignored
//!
//! At most `detail_batch_size` detail requests are outstanding at a time. The walk
//! ends once paging has ended and every requested detail has arrived.

use super::model::{
    DETAIL_ACTION, SAVINGS_PLAN_SUBTITLE, TimelineDetail, TimelineEvent, TimelinePage,
};
use super::{InboundMessage, MessageKind, Transport};
use crate::error::Result;
use crate::queue::DocumentQueue;
use crate::types::{DocumentDescriptor, Event, WalkStats};
use chrono::{NaiveDate, Utc};
use std::collections::VecDeque;
use std::path::Path;
use tokio::sync::broadcast;

/// Dump of detail pages that carried documents
pub const EVENTS_WITH_DOCUMENTS_FILE: &str = "events_with_documents.json";

/// Dump of timeline entries without documents
pub const OTHER_EVENTS_FILE: &str = "other_events.json";

/// Date format of a document's `detail` field
const DOCUMENT_DATE_FORMAT: &str = "%d.%m.%Y";

/// Knobs of a single walk
#[derive(Clone, Copy, Debug)]
pub struct WalkOptions {
    /// Entries and documents older than this (epoch milliseconds) are skipped
    pub since_timestamp: Option<i64>,
    /// Maximum number of outstanding detail requests
    pub detail_batch_size: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            since_timestamp: None,
            detail_batch_size: 5,
        }
    }
}

/// Drives the timeline subscriptions of one run
#[derive(Debug)]
pub struct TimelineWalker<T> {
    transport: T,
    options: WalkOptions,
    pending: VecDeque<String>,
    outstanding: usize,
    paging_done: bool,
    stats: WalkStats,
    events_with_documents: Vec<TimelineDetail>,
    other_events: Vec<TimelineEvent>,
}

impl<T: Transport> TimelineWalker<T> {
    /// Create a walker over `transport`
    pub fn new(transport: T, options: WalkOptions) -> Self {
        Self {
            transport,
            options: WalkOptions {
                detail_batch_size: options.detail_batch_size.max(1),
                ..options
            },
            pending: VecDeque::new(),
            outstanding: 0,
            paging_done: false,
            stats: WalkStats::default(),
            events_with_documents: Vec::new(),
            other_events: Vec::new(),
        }
    }

    /// Walk the timeline to the end, offering every document to `queue`
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to send a request or to receive.
    /// Unexpected or malformed messages are logged and skipped.
    pub async fn walk(
        &mut self,
        queue: &mut DocumentQueue,
        events: &broadcast::Sender<Event>,
    ) -> Result<WalkStats> {
        tracing::info!("Awaiting #1 timeline");
        self.transport.request_timeline(None).await?;

        while !self.is_finished() {
            let frame = self.transport.receive().await?;

            match InboundMessage::classify(&frame.subscription, &frame.payload) {
                InboundMessage::Timeline(page) => {
                    self.on_timeline(page, events).await?;
                }
                InboundMessage::TimelineDetail(detail) => {
                    self.on_detail_arrived();
                    self.on_detail(*detail, queue, events);
                }
                InboundMessage::Malformed {
                    kind,
                    error,
                    preview,
                } => {
                    self.stats.ignored_messages += 1;
                    tracing::warn!(
                        subscription_id = frame.subscription_id,
                        kind = ?kind,
                        error = %error,
                        "Malformed subscription payload:\n{preview}"
                    );
                    match kind {
                        // without a cursor there is no next page to ask for
                        MessageKind::Timeline => self.paging_done = true,
                        MessageKind::TimelineDetail => self.on_detail_arrived(),
                    }
                }
                InboundMessage::Unhandled { kind, preview } => {
                    self.stats.ignored_messages += 1;
                    tracing::warn!(
                        subscription_id = frame.subscription_id,
                        "unmatched subscription of type '{kind}':\n{preview}"
                    );
                }
            }

            self.request_details().await?;
        }

        tracing::info!(
            timelines = self.stats.timelines,
            details = self.stats.details_received,
            documents = self.stats.documents,
            "Timeline walk finished"
        );
        Ok(self.stats)
    }

    /// Counters of the walk so far
    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// Detail pages that carried at least one document
    pub fn events_with_documents(&self) -> &[TimelineDetail] {
        &self.events_with_documents
    }

    /// Timeline entries that were not requested in detail
    pub fn other_events(&self) -> &[TimelineEvent] {
        &self.other_events
    }

    /// Write [`EVENTS_WITH_DOCUMENTS_FILE`] and [`OTHER_EVENTS_FILE`] into `dir`
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be serialized or written.
    pub async fn write_event_dumps(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;

        let with_documents = serde_json::to_vec_pretty(&self.events_with_documents)?;
        tokio::fs::write(dir.join(EVENTS_WITH_DOCUMENTS_FILE), with_documents).await?;

        let others = serde_json::to_vec_pretty(&self.other_events)?;
        tokio::fs::write(dir.join(OTHER_EVENTS_FILE), others).await?;

        tracing::debug!(dir = %dir.display(), "Wrote event dumps");
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.paging_done && self.pending.is_empty() && self.outstanding == 0
    }

    fn is_below_floor(&self, timestamp: i64) -> bool {
        self.options
            .since_timestamp
            .is_some_and(|floor| timestamp < floor)
    }

    async fn on_timeline(
        &mut self,
        page: TimelinePage,
        events: &broadcast::Sender<Event>,
    ) -> Result<()> {
        self.stats.timelines += 1;
        self.stats.timeline_events += page.data.len();
        let number = self.stats.timelines;

        events
            .send(Event::TimelineReceived {
                page: number,
                entries: page.data.len(),
            })
            .ok();

        let oldest = page.oldest_timestamp();
        let after = page.cursors.after;

        for event in page.data {
            match self.skip_reason(&event) {
                None => self.pending.push_back(event.data.id.clone()),
                Some(reason) => {
                    tracing::debug!(
                        id = %event.data.id,
                        title = event.data.title.as_deref().unwrap_or_default(),
                        body = event.data.body.as_deref().unwrap_or_default(),
                        reason,
                        "Skipping timeline entry"
                    );
                    self.other_events.push(event);
                }
            }
        }

        match (after, oldest) {
            (Some(after), Some(oldest)) if !self.is_below_floor(oldest) => {
                tracing::info!("Received #{number} timeline, awaiting #{}", number + 1);
                self.transport.request_timeline(Some(&after)).await?;
            }
            (Some(_), Some(_)) => {
                tracing::info!("Received #{number} timeline, reached the oldest relevant entry");
                self.paging_done = true;
            }
            _ => {
                tracing::info!("Received #{number} (last) timeline");
                self.paging_done = true;
            }
        }

        Ok(())
    }

    /// Why an entry is not requested in detail, or `None` if it is
    fn skip_reason(&self, event: &TimelineEvent) -> Option<&'static str> {
        let data = &event.data;
        if self.is_below_floor(data.timestamp) {
            return Some("older than the floor");
        }

        match &data.action {
            None => Some("no action"),
            Some(action) if action.kind != DETAIL_ACTION => Some("action type unmatched"),
            Some(action) if action.payload_str() != Some(data.id.as_str()) => {
                Some("payload unmatched")
            }
            Some(_) => None,
        }
    }

    async fn request_details(&mut self) -> Result<()> {
        while self.outstanding < self.options.detail_batch_size {
            let Some(id) = self.pending.pop_front() else {
                break;
            };
            self.transport.request_timeline_detail(&id).await?;
            self.outstanding += 1;
            self.stats.details_requested += 1;
        }
        Ok(())
    }

    fn on_detail_arrived(&mut self) {
        self.stats.details_received += 1;
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    fn on_detail(
        &mut self,
        detail: TimelineDetail,
        queue: &mut DocumentQueue,
        events: &broadcast::Sender<Event>,
    ) {
        let subfolder = detail
            .is_savings_plan()
            .then(|| SAVINGS_PLAN_SUBTITLE.to_string());
        let mut found = 0;

        for document in detail.documents() {
            let Some(fetch_url) = document.url() else {
                tracing::debug!(
                    title = document.title.as_deref().unwrap_or_default(),
                    "Document without URL"
                );
                continue;
            };

            if let Err(e) = url::Url::parse(fetch_url) {
                tracing::warn!(
                    title = document.title.as_deref().unwrap_or_default(),
                    error = %e,
                    "Document URL is not absolute, skipping"
                );
                continue;
            }

            let detail_date = document.detail.as_deref().unwrap_or_default();
            if self.is_document_too_old(detail_date) {
                tracing::debug!(date = detail_date, "Document older than the floor");
                continue;
            }

            let descriptor = DocumentDescriptor {
                fetch_url: fetch_url.to_string(),
                display_title: document.title.clone().unwrap_or_default(),
                detail_date: detail_date.to_string(),
                title_text: detail.title_text().to_string(),
                subtitle_text: detail.subtitle_text().to_string(),
                subfolder: subfolder.clone(),
            };
            found += 1;
            self.stats.documents += 1;

            let (decision, path) = queue.enqueue_with_path(&descriptor);
            let event = if decision.is_queued() {
                Event::DocumentQueued { path }
            } else {
                Event::DocumentSkipped { path, decision }
            };
            events.send(event).ok();
        }

        if found > 0 {
            self.events_with_documents.push(detail);
        }
    }

    /// Whether a document's dotted date lies before the floor
    ///
    /// A date that does not parse counts as now.
    fn is_document_too_old(&self, detail_date: &str) -> bool {
        let timestamp = NaiveDate::parse_from_str(detail_date, DOCUMENT_DATE_FORMAT)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|datetime| datetime.and_utc().timestamp_millis())
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        self.is_below_floor(timestamp)
    }
}

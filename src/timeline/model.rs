//! Payload shapes of the `timeline` and `timelineDetail` subscriptions.
//!
//! Only the fields the walker reads are typed. Everything else is kept in a
//! flattened `extra` map so the event dumps reproduce the payloads as received.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Action type that marks a timeline entry as having a detail page
pub const DETAIL_ACTION: &str = "timelineDetail";

/// Section type that lists documents
pub const DOCUMENTS_SECTION: &str = "documents";

/// Section type that lists action buttons
pub const ACTION_BUTTONS_SECTION: &str = "actionButtons";

/// Subtitle that identifies a savings-plan execution
pub const SAVINGS_PLAN_SUBTITLE: &str = "Sparplan";

/// Button actions that only appear on savings-plan details
pub const SAVINGS_PLAN_ACTIONS: [&str; 2] = ["editSavingsPlan", "deleteSavingsPlan"];

/// One page of the timeline, newest entries first
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimelinePage {
    /// Entries on this page
    #[serde(default)]
    pub data: Vec<TimelineEvent>,
    /// Paging cursors
    #[serde(default)]
    pub cursors: Cursors,
}

impl TimelinePage {
    /// Timestamp of the oldest (last) entry on the page
    pub fn oldest_timestamp(&self) -> Option<i64> {
        self.data.last().map(|event| event.data.timestamp)
    }
}

/// Paging cursors of a timeline page
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cursors {
    /// Cursor for the next (older) page; absent on the last page
    #[serde(default)]
    pub after: Option<String>,
    /// Cursor for the previous (newer) page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
}

/// A timeline entry as wrapped on the page
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Entry kind, usually `"timelineEvent"`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Entry body
    pub data: TimelineEventData,
}

/// Fields of a timeline entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineEventData {
    /// Entry id, also the detail subscription id
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Headline, e.g. the instrument name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Second line, e.g. "Kauf" or "Zinsen"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// What tapping the entry does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An action attached to an entry, document, or button
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    /// Action type, e.g. `"timelineDetail"` or `"browserModal"`
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Action payload: the entry id for detail actions, the URL for documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Action {
    /// The payload if it is a string
    pub fn payload_str(&self) -> Option<&str> {
        self.payload.as_ref().and_then(Value::as_str)
    }
}

/// Detail page of one timeline entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineDetail {
    /// Entry id, when the payload carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "titleText", default, skip_serializing_if = "Option::is_none")]
    title_text: Option<String>,
    #[serde(rename = "subtitleText", default, skip_serializing_if = "Option::is_none")]
    subtitle_text: Option<String>,
    /// Sections of the page, in display order
    #[serde(default)]
    pub sections: Vec<DetailSection>,
    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TimelineDetail {
    /// Heading of the detail page (empty if absent)
    pub fn title_text(&self) -> &str {
        self.title_text.as_deref().unwrap_or_default()
    }

    /// Sub-heading of the detail page (empty if absent)
    pub fn subtitle_text(&self) -> &str {
        self.subtitle_text.as_deref().unwrap_or_default()
    }

    /// Documents listed in every `documents` section
    pub fn documents(&self) -> impl Iterator<Item = &DetailDocument> {
        self.sections
            .iter()
            .filter(|section| section.kind == DOCUMENTS_SECTION)
            .flat_map(|section| section.documents.iter())
    }

    /// Whether this detail belongs to a savings-plan execution
    pub fn is_savings_plan(&self) -> bool {
        if self.subtitle_text() == SAVINGS_PLAN_SUBTITLE {
            return true;
        }

        self.sections
            .iter()
            .filter(|section| section.kind == ACTION_BUTTONS_SECTION)
            .filter_map(|section| section.data.as_array())
            .flatten()
            .filter_map(|button| button.pointer("/action/type").and_then(Value::as_str))
            .any(|kind| SAVINGS_PLAN_ACTIONS.contains(&kind))
    }
}

/// One section of a detail page
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetailSection {
    /// Section type, e.g. `"documents"`, `"actionButtons"`, `"table"`
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Documents (only on `documents` sections)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<DetailDocument>,
    /// Section content for all other section types
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A document reference on a detail page
///
/// All fields are optional so one odd entry cannot invalidate the whole page.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetailDocument {
    /// Document id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Document label, e.g. `"Kontoauszug"` or `"Kosteninformation 2"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Dotted date, e.g. `"01.02.2023"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Download action; its payload is the fetch URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DetailDocument {
    /// Fetch URL carried by the document's action
    pub fn url(&self) -> Option<&str> {
        self.action.as_ref().and_then(Action::payload_str)
    }
}

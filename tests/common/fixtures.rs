//! Timeline payload fixtures

use serde_json::{Value, json};

/// Timestamp of 2023-02-01 10:32 UTC in milliseconds
pub const FEB_2023: i64 = 1_675_247_520_000;

/// Timestamp of 2023-02-01 00:00 UTC in milliseconds
pub const FEB_2023_MIDNIGHT: i64 = 1_675_209_600_000;

/// File name of the Apple trade executed at 10:32 on 2023-02-01
///
/// The time keeps its colon except on Windows, where `:` is reserved.
pub const APPLE_TRADE_FILE: &str = if cfg!(windows) {
    "2023-02-01 10_32 Apple.pdf"
} else {
    "2023-02-01 10:32 Apple.pdf"
};

/// A timeline entry that links to its own detail page
pub fn detail_entry(id: &str, timestamp: i64) -> Value {
    json!({
        "type": "timelineEvent",
        "data": {
            "id": id,
            "timestamp": timestamp,
            "title": "Apple",
            "body": "Kauf",
            "action": { "type": "timelineDetail", "payload": id }
        }
    })
}

/// A timeline entry without a detail page (e.g. an interest payment notice)
pub fn plain_entry(id: &str, timestamp: i64) -> Value {
    json!({
        "type": "timelineEvent",
        "data": { "id": id, "timestamp": timestamp, "title": "Zinsen", "body": "2,00 %" }
    })
}

/// One document reference on a detail page
pub struct Doc<'a> {
    /// Document label, e.g. "Kontoauszug" or "Kosteninformation 2"
    pub title: &'a str,
    /// Dotted date, e.g. "01.02.2023"
    pub date: &'a str,
    /// Absolute fetch URL
    pub url: String,
}

/// A detail page with a single documents section
pub fn detail_page(title_text: &str, subtitle_text: &str, docs: &[Doc<'_>]) -> Value {
    let documents: Vec<Value> = docs
        .iter()
        .map(|doc| {
            json!({
                "title": doc.title,
                "detail": doc.date,
                "action": { "type": "browserModal", "payload": doc.url }
            })
        })
        .collect();

    json!({
        "titleText": title_text,
        "subtitleText": subtitle_text,
        "sections": [
            { "type": "header", "data": { "status": "executed" } },
            { "type": "documents", "title": "Dokumente", "documents": documents }
        ]
    })
}

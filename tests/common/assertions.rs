//! Event collection helpers

use timeline_dl::Event;
use tokio::sync::broadcast;

/// Drain every event already buffered in `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Number of events matching `predicate`
pub fn count_events(events: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|event| predicate(event)).count()
}

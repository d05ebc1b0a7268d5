use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;

/// Lifecycle status marking an event that is no longer active
pub const END_STATUS: &str = "END";

/// Stable identifier of an event, always compared and emitted as a string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for EventId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// A festival or event in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub eventid: EventId,
    pub title: String,
    pub category: String,
    pub location: String,
    pub description: String,
    /// Lifecycle tag; `END` removes the event from the active catalog
    pub status: Option<String>,
}

impl Event {
    /// Creates an event without a lifecycle status
    pub fn new(
        eventid: impl Into<EventId>,
        title: impl Into<String>,
        category: impl Into<String>,
        location: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            eventid: eventid.into(),
            title: title.into(),
            category: category.into(),
            location: location.into(),
            description: description.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Text used as the event's document: title, category, location and
    /// description separated by single spaces
    pub fn combined_features(&self) -> String {
        [
            self.title.as_str(),
            self.category.as_str(),
            self.location.as_str(),
            self.description.as_str(),
        ]
        .join(" ")
    }

    pub fn is_ended(&self) -> bool {
        self.status.as_deref() == Some(END_STATUS)
    }
}

/// Ordered collection of events with unique ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    events: Vec<Event>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog, keeping only the last event for each repeated id
    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut catalog = Self::new();
        catalog.upsert(events);
        catalog
    }

    /// Replaces events sharing an id with the incoming ones and appends the
    /// incoming events in order. Within the batch the last duplicate wins.
    pub fn upsert(&mut self, events: impl IntoIterator<Item = Event>) {
        let mut seen = HashSet::new();
        let mut batch: Vec<Event> = events
            .into_iter()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .filter(|event| seen.insert(event.eventid.clone()))
            .collect();
        batch.reverse();

        self.events.retain(|event| !seen.contains(&event.eventid));
        self.events.extend(batch);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether any event carries a lifecycle status
    pub fn has_status(&self) -> bool {
        self.events.iter().any(|event| event.status.is_some())
    }

    /// Count of events per status value
    pub fn status_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for status in self.events.iter().filter_map(|event| event.status.as_deref()) {
            *counts.entry(status).or_insert(0) += 1;
        }
        counts
    }

    /// Splits off the active events, returning them with the number of
    /// ended events that were dropped
    pub fn active(&self) -> (Catalog, usize) {
        let events: Vec<Event> = self
            .events
            .iter()
            .filter(|event| !event.is_ended())
            .cloned()
            .collect();
        let removed = self.events.len() - events.len();
        (Catalog { events }, removed)
    }
}

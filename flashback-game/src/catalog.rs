//! Event catalog loading and validation
use serde::Deserialize;
use thiserror::Error;

use crate::event::{Event, EventError};

const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/events.json");

/// Failures while loading the event catalog. Terminal for a session.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog source unavailable: {0}")]
    Unavailable(String),
    #[error("catalog JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog record {index} is invalid: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: EventError,
    },
    #[error("catalog contains no events")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    #[serde(default)]
    name: String,
    #[serde(default)]
    date: String,
}

/// Read-only list of candidate events, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    events: Vec<Event>,
}

impl Catalog {
    /// Parse and validate a flat JSON list of `{name, date}` records.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, any record fails validation,
    /// or the list is empty.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let records: Vec<CatalogRecord> = serde_json::from_str(json)?;
        let events = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                Event::new(record.name, &record.date)
                    .map_err(|source| CatalogError::InvalidRecord { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_events(events)
    }

    /// Wrap already validated events.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Empty`] when no events are supplied.
    pub fn from_events(events: Vec<Event>) -> Result<Self, CatalogError> {
        if events.is_empty() {
            return Err(CatalogError::Empty);
        }
        log::debug!("catalog loaded with {} events", events.len());
        Ok(Self { events })
    }

    /// Built-in catalog bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled asset fails validation.
    pub fn load_from_static() -> Result<Self, CatalogError> {
        Self::from_json(DEFAULT_CATALOG_DATA)
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

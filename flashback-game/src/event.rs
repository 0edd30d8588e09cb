//! Historical events and their in-play counterparts.
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,4})-(\d{2})-(\d{2})$").expect("date pattern is a valid regex")
});

/// Errors raised when an event record fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("event name must not be empty")]
    EmptyName,
    #[error("date '{0}' is not in YYYY-MM-DD form")]
    MalformedDate(String),
    #[error("date '{0}' does not exist on the calendar")]
    ImpossibleDate(String),
}

/// Calendar date of an event.
///
/// Equality, ordering and hashing use the calendar day. The source text is
/// kept verbatim so that serialization reproduces exactly what was read,
/// including unpadded years such as `476-09-04`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventDate {
    raw: String,
    day: NaiveDate,
}

impl EventDate {
    /// Parse a `Y-MM-DD` date with a one to four digit year.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is malformed or names a day that does not exist.
    pub fn parse(text: &str) -> Result<Self, EventError> {
        let trimmed = text.trim();
        let caps = DATE_SHAPE
            .captures(trimmed)
            .ok_or_else(|| EventError::MalformedDate(text.to_string()))?;
        let field = |i: usize| caps.get(i).map_or("", |m| m.as_str());
        let year: i32 = field(1)
            .parse()
            .map_err(|_| EventError::MalformedDate(text.to_string()))?;
        let month: u32 = field(2)
            .parse()
            .map_err(|_| EventError::MalformedDate(text.to_string()))?;
        let day: u32 = field(3)
            .parse()
            .map_err(|_| EventError::MalformedDate(text.to_string()))?;
        if year < 1 {
            return Err(EventError::ImpossibleDate(text.to_string()));
        }
        let day = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| EventError::ImpossibleDate(text.to_string()))?;
        Ok(Self {
            raw: trimmed.to_string(),
            day,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn naive(&self) -> NaiveDate {
        self.day
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.day.year()
    }
}

impl PartialEq for EventDate {
    fn eq(&self, other: &Self) -> bool {
        self.day == other.day
    }
}

impl Eq for EventDate {}

impl Hash for EventDate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.day.hash(state);
    }
}

impl PartialOrd for EventDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.day.cmp(&other.day)
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for EventDate {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EventDate {
    type Error = EventError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EventDate> for String {
    fn from(value: EventDate) -> Self {
        value.raw
    }
}

#[derive(Deserialize)]
struct RawEvent {
    name: String,
    date: EventDate,
}

/// A named historical event as it appears in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct Event {
    name: String,
    date: EventDate,
}

impl Event {
    /// Build a validated event.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the date is invalid.
    pub fn new(name: impl Into<String>, date: &str) -> Result<Self, EventError> {
        let date = EventDate::parse(date)?;
        Self::with_date(name, date)
    }

    /// Build an event from an already parsed date.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank.
    pub fn with_date(name: impl Into<String>, date: EventDate) -> Result<Self, EventError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EventError::EmptyName);
        }
        Ok(Self { name, date })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn date(&self) -> &EventDate {
        &self.date
    }
}

impl TryFrom<RawEvent> for Event {
    type Error = EventError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        Self::with_date(raw.name, raw.date)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.date)
    }
}

/// Session-unique handle for an event in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u32);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlacementState {
    #[default]
    Unplaced,
    Selected,
    Placed,
}

/// Permanent judgment recorded on an event's first commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    #[default]
    Unjudged,
    Correct,
    Incorrect,
}

impl Verdict {
    #[must_use]
    pub const fn is_judged(self) -> bool {
        !matches!(self, Self::Unjudged)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unjudged => "unjudged",
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event that has entered play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    id: EventId,
    event: Event,
    placement: PlacementState,
    verdict: Verdict,
}

impl GameEvent {
    #[must_use]
    pub const fn new(id: EventId, event: Event) -> Self {
        Self {
            id,
            event,
            placement: PlacementState::Unplaced,
            verdict: Verdict::Unjudged,
        }
    }

    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    #[must_use]
    pub const fn event(&self) -> &Event {
        &self.event
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.event.name()
    }

    #[must_use]
    pub const fn date(&self) -> &EventDate {
        self.event.date()
    }

    #[must_use]
    pub const fn placement(&self) -> PlacementState {
        self.placement
    }

    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub(crate) const fn set_placement(&mut self, placement: PlacementState) {
        self.placement = placement;
    }

    /// Record the first judgment. Later attempts are ignored and return `false`.
    pub(crate) fn record_verdict(&mut self, verdict: Verdict) -> bool {
        if self.verdict.is_judged() || !verdict.is_judged() {
            return false;
        }
        self.verdict = verdict;
        true
    }

    /// Consume the entity, returning the catalog event it was built from.
    #[must_use]
    pub fn into_event(self) -> Event {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_compare_by_calendar_not_text() {
        let early = EventDate::parse("476-09-04").unwrap();
        let late = EventDate::parse("1066-10-14").unwrap();
        assert!(early < late);
        assert!("476-09-04" > "1066-10-14");
        assert_eq!(early.as_str(), "476-09-04");
        assert_eq!(early.year(), 476);
    }

    #[test]
    fn padded_and_unpadded_years_are_the_same_day() {
        let a = EventDate::parse("0476-09-04").unwrap();
        let b = EventDate::parse("476-09-04").unwrap();
        assert_eq!(a, b);
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn rejects_bad_dates() {
        assert!(matches!(
            EventDate::parse("1999/01/01"),
            Err(EventError::MalformedDate(_))
        ));
        assert!(matches!(
            EventDate::parse("2001-02-29"),
            Err(EventError::ImpossibleDate(_))
        ));
        assert!(matches!(
            EventDate::parse("0000-01-01"),
            Err(EventError::ImpossibleDate(_))
        ));
        assert!(EventDate::parse("2000-02-29").is_ok());
    }

    #[test]
    fn event_requires_a_name() {
        assert_eq!(Event::new("  ", "2000-01-01"), Err(EventError::EmptyName));
    }

    #[test]
    fn event_serializes_raw_fields() {
        let event = Event::new("Fall of Rome", "476-09-04").unwrap();
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"name":"Fall of Rome","date":"476-09-04"}"#);
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn deserialization_validates_records() {
        assert!(serde_json::from_str::<Event>(r#"{"name":"","date":"2000-01-01"}"#).is_err());
        assert!(serde_json::from_str::<Event>(r#"{"name":"x","date":"soon"}"#).is_err());
        assert!(serde_json::from_str::<Event>(r#"{"name":"x"}"#).is_err());
    }

    #[test]
    fn verdict_is_set_once() {
        let event = Event::new("Moon landing", "1969-07-20").unwrap();
        let mut game_event = GameEvent::new(EventId(1), event);
        assert!(!game_event.record_verdict(Verdict::Unjudged));
        assert!(game_event.record_verdict(Verdict::Incorrect));
        assert!(!game_event.record_verdict(Verdict::Correct));
        assert_eq!(game_event.verdict(), Verdict::Incorrect);
    }
}

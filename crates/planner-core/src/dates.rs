//! Calendar-day utilities.
//!
//! Every date in the planner is a local calendar day in canonical
//! `YYYY-MM-DD` form. Canonical strings sort lexicographically in day order,
//! which is the same order as [`NaiveDate`], so the store keys its schedule by
//! `NaiveDate` and persists the canonical string. No timezone math happens
//! beyond "which local day is it": all boundaries are local wall-clock
//! midnights.
//!
//! The current day comes from a [`Clock`] so maintenance and recurrence can be
//! exercised against any date.

use chrono::{DateTime, Local, Locale, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use thiserror::Error;

/// Canonical format string for a calendar day.
pub const ISO_DAY_FORMAT: &str = "%Y-%m-%d";

/// Locale used when the configured one is unknown.
pub const DEFAULT_LOCALE: Locale = Locale::es_ES;

/// Errors produced by date parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    /// The text is not a canonical zero-padded `YYYY-MM-DD` day.
    #[error("invalid calendar day '{0}', expected YYYY-MM-DD")]
    Invalid(String),
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// The current local calendar day.
    fn today(&self) -> NaiveDate;

    /// The current instant as Unix epoch milliseconds.
    fn now_millis(&self) -> i64;
}

/// Wall-clock time in the host's local timezone.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock pinned to a settable day.
///
/// `now_millis` reports local noon of the pinned day, so timestamps stay
/// inside the day they claim to belong to.
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    /// Pin the clock to `day`.
    #[must_use]
    pub fn new(day: NaiveDate) -> Self {
        Self {
            today: Mutex::new(day),
        }
    }

    /// Move the clock to another day.
    pub fn set_today(&self, day: NaiveDate) {
        *self.today.lock() = day;
    }

    /// Advance the clock by `days` calendar days.
    pub fn advance_days(&self, days: u64) {
        let mut today = self.today.lock();
        if let Some(next) = today.checked_add_days(chrono::Days::new(days)) {
            *today = next;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock()
    }

    fn now_millis(&self) -> i64 {
        let day = *self.today.lock();
        day.and_hms_opt(12, 0, 0)
            .and_then(|noon| Local.from_local_datetime(&noon).earliest())
            .map_or(0, |dt| dt.timestamp_millis())
    }
}

/// Today's canonical date-string.
pub fn today(clock: &dyn Clock) -> String {
    format_iso(clock.today())
}

/// Tomorrow's canonical date-string.
pub fn tomorrow(clock: &dyn Clock) -> String {
    format_iso(next_day(clock.today()))
}

/// The day after `day` (saturates at the last representable day).
#[must_use]
pub fn next_day(day: NaiveDate) -> NaiveDate {
    day.succ_opt().unwrap_or(day)
}

/// Canonical `YYYY-MM-DD` form of a date value.
#[must_use]
pub fn format_iso(day: NaiveDate) -> String {
    day.format(ISO_DAY_FORMAT).to_string()
}

/// Strictly parse a canonical date-string.
///
/// Rejects anything that would not format back to the same text, so
/// unpadded months or days are errors rather than silently accepted.
pub fn parse_iso(text: &str) -> Result<NaiveDate, DateError> {
    let day = NaiveDate::parse_from_str(text, ISO_DAY_FORMAT)
        .map_err(|_| DateError::Invalid(text.to_string()))?;
    if format_iso(day) != text {
        return Err(DateError::Invalid(text.to_string()));
    }
    Ok(day)
}

/// Local calendar day containing the given epoch-millisecond instant.
#[must_use]
pub fn local_day_of_millis(millis: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.with_timezone(&Local).date_naive())
}

/// Labels used when rendering day headings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayLabels {
    /// Heading for the current day.
    pub today: String,
    /// Heading for the next day.
    pub tomorrow: String,
    /// POSIX locale name for weekday/month names (e.g. `es_ES`).
    pub locale: String,
}

impl Default for DayLabels {
    fn default() -> Self {
        Self {
            today: "Hoy".to_string(),
            tomorrow: "Mañana".to_string(),
            locale: "es_ES".to_string(),
        }
    }
}

impl DayLabels {
    /// Resolved chrono locale, falling back to [`DEFAULT_LOCALE`].
    #[must_use]
    pub fn chrono_locale(&self) -> Locale {
        resolve_locale(&self.locale)
    }
}

/// Look up a locale by POSIX name.
#[must_use]
pub fn resolve_locale(name: &str) -> Locale {
    Locale::try_from(name).unwrap_or(DEFAULT_LOCALE)
}

/// Heading for a scheduled day relative to `today`.
///
/// Today and tomorrow get their fixed labels; every other day renders as a
/// capitalized `weekday, day month` in the configured locale.
#[must_use]
pub fn display_label(day: NaiveDate, today: NaiveDate, labels: &DayLabels) -> String {
    if day == today {
        return labels.today.clone();
    }
    if day == next_day(today) {
        return labels.tomorrow.clone();
    }
    let text = day
        .format_localized("%A, %-d %b", labels.chrono_locale())
        .to_string();
    capitalize_first(&text)
}

/// Long-form heading for the current day (`Viernes, 16 de octubre de 2026`).
#[must_use]
pub fn header_label(day: NaiveDate, labels: &DayLabels) -> String {
    let locale = labels.chrono_locale();
    let pattern = if matches!(locale, Locale::es_ES) {
        "%A, %-d de %B de %Y"
    } else {
        "%A, %-d %B %Y"
    };
    capitalize_first(&day.format_localized(pattern, locale).to_string())
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

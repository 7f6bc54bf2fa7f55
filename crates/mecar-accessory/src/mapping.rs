//! Telemetry → characteristic mapping
//!
//! Every indicator is an ordered list of field rules. A snapshot matches an
//! indicator when any record matches any of its rules, so one record
//! reporting an open door is enough even if another reports all closed.

use mecar_core::{FieldValue, Snapshot, TelemetryRecord};

use crate::config::BatterySource;

/// Battery level at or below which the low-battery flag is raised
pub const LOW_BATTERY_THRESHOLD: u8 = 20;

/// Charging state reported for every vehicle
pub const NOT_CHARGING: u8 = 0;

// =============================================================================
// Field Rules
// =============================================================================

/// Strict string test applied to a telemetry value.
///
/// Numbers and booleans never equal a string, so `0` is not `"0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Equals(&'static str),
    /// Also matches a missing or non-string value
    NotEquals(&'static str),
    OneOf(&'static [&'static str]),
}

impl Predicate {
    pub fn matches(&self, value: &FieldValue) -> bool {
        let text = value.as_str();
        match self {
            Predicate::Equals(expected) => text == Some(*expected),
            Predicate::NotEquals(expected) => text != Some(*expected),
            Predicate::OneOf(options) => text.is_some_and(|t| options.iter().any(|o| *o == t)),
        }
    }
}

/// A field name paired with the predicate it must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: &'static str,
    pub predicate: Predicate,
}

const fn rule(field: &'static str, predicate: Predicate) -> FieldRule {
    FieldRule { field, predicate }
}

impl FieldRule {
    /// Whether the record carries this field with a matching value
    pub fn matches(&self, record: &TelemetryRecord) -> bool {
        record
            .field(self.field)
            .is_some_and(|value| self.predicate.matches(value))
    }
}

/// Any of these means the vehicle is not fully locked
pub const UNLOCKED_RULES: &[FieldRule] = &[
    rule("doorlockstatusdecklid", Predicate::Equals("false")),
    rule("doorlockstatusvehicle", Predicate::OneOf(&["1", "2"])),
    rule("doorlockstatusgas", Predicate::Equals("false")),
];

/// Any of these means a door or the trunk is open
pub const DOOR_OPEN_RULES: &[FieldRule] = &[
    rule("doorstatusfrontleft", Predicate::Equals("true")),
    rule("doorstatusfrontright", Predicate::Equals("true")),
    rule("doorstatusrearleft", Predicate::Equals("true")),
    rule("doorstatusrearright", Predicate::Equals("true")),
    rule("decklidstatus", Predicate::Equals("true")),
];

/// Any of these means a window or the sunroof is open
pub const WINDOW_OPEN_RULES: &[FieldRule] = &[
    rule("windowstatusfrontleft", Predicate::Equals("1")),
    rule("windowstatusfrontright", Predicate::Equals("1")),
    rule("windowstatusrearleft", Predicate::Equals("1")),
    rule("windowstatusrearright", Predicate::Equals("1")),
    rule("sunroofstatus", Predicate::NotEquals("0")),
];

/// Any of these means an interior light is on
pub const LIGHT_ON_RULES: &[FieldRule] = &[
    rule("interiorLightsFront", Predicate::Equals("true")),
    rule("interiorLightsRear", Predicate::Equals("true")),
    rule("readingLampFrontLeft", Predicate::Equals("true")),
    rule("readingLampFrontRight", Predicate::Equals("true")),
];

/// First rule in priority order that matches the record
pub fn first_match(record: &TelemetryRecord, rules: &'static [FieldRule]) -> Option<&'static FieldRule> {
    rules.iter().find(|rule| rule.matches(record))
}

/// Whether any record of the snapshot matches any rule
pub fn any_match(snapshot: &Snapshot, rules: &'static [FieldRule]) -> bool {
    snapshot
        .records()
        .iter()
        .any(|record| first_match(record, rules).is_some())
}

// =============================================================================
// Indicator States
// =============================================================================

/// Lock mechanism state as reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Secured,
    Unlocked,
}

impl LockState {
    /// Characteristic value (0 secured, 1 unlocked)
    pub fn value(self) -> u8 {
        match self {
            LockState::Secured => 0,
            LockState::Unlocked => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LockState::Secured => "secured",
            LockState::Unlocked => "unlocked",
        }
    }
}

/// Contact sensor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactState {
    Closed,
    Open,
}

impl ContactState {
    /// Characteristic value (0 closed, 1 open)
    pub fn value(self) -> u8 {
        match self {
            ContactState::Closed => 0,
            ContactState::Open => 1,
        }
    }

    fn from_open(open: bool) -> Self {
        if open {
            ContactState::Open
        } else {
            ContactState::Closed
        }
    }
}

pub fn lock_state(snapshot: &Snapshot) -> LockState {
    if any_match(snapshot, UNLOCKED_RULES) {
        LockState::Unlocked
    } else {
        LockState::Secured
    }
}

pub fn door_state(snapshot: &Snapshot) -> ContactState {
    ContactState::from_open(any_match(snapshot, DOOR_OPEN_RULES))
}

pub fn window_state(snapshot: &Snapshot) -> ContactState {
    ContactState::from_open(any_match(snapshot, WINDOW_OPEN_RULES))
}

pub fn lights_on(snapshot: &Snapshot) -> bool {
    any_match(snapshot, LIGHT_ON_RULES)
}

// =============================================================================
// Battery
// =============================================================================

/// Battery service values derived from one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    /// `None` leaves the level characteristic untouched
    pub level: Option<u8>,
    pub low: bool,
}

impl BatteryReading {
    pub fn from_level(level: Option<u8>) -> Self {
        Self {
            level,
            low: level.is_some_and(|l| l <= LOW_BATTERY_THRESHOLD),
        }
    }

    /// Value for the low-battery characteristic
    pub fn low_value(&self) -> u8 {
        u8::from(self.low)
    }
}

/// Level reported by a single record, if any.
///
/// The direct percentage wins over the range; the range only counts when a
/// positive `max_range` is configured.
fn record_level(record: &TelemetryRecord, source: BatterySource, max_range: Option<f64>) -> Option<f64> {
    if let Some(percent) = record.field(source.percent_field()) {
        return percent.leading_integer().map(|p| p as f64);
    }

    let max_range = max_range.filter(|m| m.is_finite() && *m > 0.0)?;
    let range = record.field(source.range_field())?.leading_integer()?;
    Some(range as f64 * 100.0 / max_range)
}

/// Battery level and low flag; the last record carrying a usable value wins
pub fn battery_reading(snapshot: &Snapshot, source: BatterySource, max_range: Option<f64>) -> BatteryReading {
    let level = snapshot
        .records()
        .iter()
        .filter_map(|record| record_level(record, source, max_range))
        .last()
        .map(|level| level.trunc().clamp(0.0, 100.0) as u8);

    BatteryReading::from_level(level)
}

//! Linked 12-hour start/end pickers.
//!
//! Start is authoritative: committing a start edit always rewrites the end to
//! start + 1h. Only end edits are validated, and an end earlier than the start
//! is replaced by start + 1h with a toast.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ui_kit::Notifier;
use crate::widget::NavKey;

pub const MINUTES_PER_DAY: i32 = 24 * 60;
pub const END_BEFORE_START_MESSAGE: &str = "시작 시간보다 종료시간은 빠를 수 없습니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Meridiem {
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
}

impl Meridiem {
    pub fn toggled(self) -> Self {
        match self {
            Self::Am => Self::Pm,
            Self::Pm => Self::Am,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Am => "AM",
            Self::Pm => "PM",
        }
    }

    /// Korean label shown on the toggle button.
    pub fn label(self) -> &'static str {
        match self {
            Self::Am => "오전",
            Self::Pm => "오후",
        }
    }
}

/// Always holds hour 1..=12 and minute 0..=59; stored values are clamped
/// into range when read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredTime")]
pub struct TimeValue {
    #[serde(rename = "ampm")]
    pub meridiem: Meridiem,
    pub hour: u8,
    pub minute: u8,
}

#[derive(Deserialize)]
struct StoredTime {
    ampm: Meridiem,
    hour: u32,
    minute: u32,
}

impl From<StoredTime> for TimeValue {
    fn from(stored: StoredTime) -> Self {
        Self::new(stored.ampm, stored.hour, stored.minute)
    }
}

impl TimeValue {
    /// Clamps hour to 1..=12 and minute to 0..=59.
    pub fn new(meridiem: Meridiem, hour: u32, minute: u32) -> Self {
        Self {
            meridiem,
            hour: hour.clamp(1, 12) as u8,
            minute: minute.min(59) as u8,
        }
    }

    pub fn to_minutes(self) -> i32 {
        let hour = i32::from(self.hour.clamp(1, 12)) % 12;
        let offset = match self.meridiem {
            Meridiem::Am => 0,
            Meridiem::Pm => 12 * 60,
        };
        hour * 60 + i32::from(self.minute.min(59)) + offset
    }

    /// Wraps into a single day, so 1440 is midnight again.
    pub fn from_minutes(minutes: i32) -> Self {
        let minutes = minutes.rem_euclid(MINUTES_PER_DAY);
        let hour24 = minutes / 60;
        let meridiem = if hour24 < 12 { Meridiem::Am } else { Meridiem::Pm };
        let hour12 = match hour24 % 12 {
            0 => 12,
            h => h,
        };
        Self {
            meridiem,
            hour: hour12 as u8,
            minute: (minutes % 60) as u8,
        }
    }

    pub fn plus_minutes(self, minutes: i32) -> Self {
        Self::from_minutes(self.to_minutes() + minutes)
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:{:02}", self.meridiem.label(), self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRangeState {
    pub start: TimeValue,
    pub end: TimeValue,
}

impl Default for TimeRangeState {
    /// 10:00 AM to 11:00 AM.
    fn default() -> Self {
        Self {
            start: TimeValue::new(Meridiem::Am, 10, 0),
            end: TimeValue::new(Meridiem::Am, 11, 0),
        }
    }
}

impl TimeRangeState {
    pub fn is_ordered(&self) -> bool {
        self.start.to_minutes() <= self.end.to_minutes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Hour,
    Minute,
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn parse_digits(raw: &str) -> u32 {
    digits(raw).parse().unwrap_or(0)
}

/// One picker's on-screen state: the meridiem toggle and two text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TimePicker {
    meridiem: Meridiem,
    hour_text: String,
    minute_text: String,
}

impl TimePicker {
    fn showing(value: TimeValue) -> Self {
        let mut picker = Self {
            meridiem: value.meridiem,
            hour_text: String::new(),
            minute_text: String::new(),
        };
        picker.write(value);
        picker
    }

    fn write(&mut self, value: TimeValue) {
        self.meridiem = value.meridiem;
        self.hour_text = format!("{:02}", value.hour);
        self.minute_text = format!("{:02}", value.minute);
    }

    fn read(&self) -> TimeValue {
        TimeValue::new(
            self.meridiem,
            parse_digits(&self.hour_text),
            parse_digits(&self.minute_text),
        )
    }

    fn field_mut(&mut self, field: TimeField) -> &mut String {
        match field {
            TimeField::Hour => &mut self.hour_text,
            TimeField::Minute => &mut self.minute_text,
        }
    }
}

pub struct TimeRangeInput {
    start: TimePicker,
    end: TimePicker,
    initialized: bool,
    notifier: Arc<dyn Notifier>,
}

impl TimeRangeInput {
    /// Unwired pair showing the defaults; call `initialize` before use.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self::with_state(TimeRangeState::default(), notifier, false)
    }

    /// Wired pair showing `state`, used when a section already has values.
    pub fn restored(state: TimeRangeState, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_state(state, notifier, true)
    }

    fn with_state(state: TimeRangeState, notifier: Arc<dyn Notifier>, initialized: bool) -> Self {
        Self {
            start: TimePicker::showing(state.start),
            end: TimePicker::showing(state.end),
            initialized,
            notifier,
        }
    }

    /// Sets 10:00 AM / 11:00 AM. Re-initializing is a no-op; returns whether
    /// anything happened.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return false;
        }
        let defaults = TimeRangeState::default();
        self.start.write(defaults.start);
        self.end.write(defaults.end);
        self.initialized = true;
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn state(&self) -> TimeRangeState {
        TimeRangeState {
            start: self.start.read(),
            end: self.end.read(),
        }
    }

    pub fn value(&self, side: Side) -> TimeValue {
        self.picker(side).read()
    }

    pub fn meridiem(&self, side: Side) -> Meridiem {
        self.picker(side).meridiem
    }

    /// Raw field text, which may be mid-edit and unpadded.
    pub fn field_text(&self, side: Side, field: TimeField) -> &str {
        let picker = self.picker(side);
        match field {
            TimeField::Hour => &picker.hour_text,
            TimeField::Minute => &picker.minute_text,
        }
    }

    fn picker(&self, side: Side) -> &TimePicker {
        match side {
            Side::Start => &self.start,
            Side::End => &self.end,
        }
    }

    fn picker_mut(&mut self, side: Side) -> &mut TimePicker {
        match side {
            Side::Start => &mut self.start,
            Side::End => &mut self.end,
        }
    }

    /// Keystroke in a numeric field: keep at most two digits, nothing else.
    pub fn input(&mut self, side: Side, field: TimeField, raw: &str) {
        let cleaned: String = digits(raw).chars().take(2).collect();
        *self.picker_mut(side).field_mut(field) = cleaned;
    }

    /// Blur of a numeric field: clamp and pad both fields, then apply the
    /// start/end rule. Returns true if the end was auto-corrected.
    pub fn commit(&mut self, side: Side) -> bool {
        let picker = self.picker_mut(side);
        let value = picker.read();
        picker.write(value);
        match side {
            Side::Start => {
                self.sync_end_to_start();
                false
            }
            Side::End => self.correct_end_if_early(),
        }
    }

    /// Start meridiem drags the end along to start + 1h; end meridiem is
    /// validated. Returns true if the end was auto-corrected.
    pub fn set_meridiem(&mut self, side: Side, meridiem: Meridiem) -> bool {
        self.picker_mut(side).meridiem = meridiem;
        match side {
            Side::Start => {
                self.end.meridiem = meridiem;
                self.sync_end_to_start();
                false
            }
            Side::End => self.correct_end_if_early(),
        }
    }

    pub fn toggle_meridiem(&mut self, side: Side) -> bool {
        let next = self.meridiem(side).toggled();
        self.set_meridiem(side, next)
    }

    /// Keyboard on the meridiem toggle. Returns false for keys it ignores.
    pub fn meridiem_key(&mut self, side: Side, key: NavKey) -> bool {
        match key {
            NavKey::Space | NavKey::Enter | NavKey::ArrowLeft | NavKey::ArrowRight => {
                self.toggle_meridiem(side);
                true
            }
            NavKey::Home => {
                if self.meridiem(side) != Meridiem::Am {
                    self.toggle_meridiem(side);
                }
                true
            }
            NavKey::End => {
                if self.meridiem(side) != Meridiem::Pm {
                    self.toggle_meridiem(side);
                }
                true
            }
            NavKey::ArrowUp | NavKey::ArrowDown => false,
        }
    }

    fn sync_end_to_start(&mut self) {
        let end = self.start.read().plus_minutes(60);
        self.end.write(end);
    }

    fn correct_end_if_early(&mut self) -> bool {
        let state = self.state();
        if state.end.to_minutes() >= state.start.to_minutes() {
            return false;
        }
        debug!(start = %state.start, end = %state.end, "end before start, correcting");
        self.notifier.notify(END_BEFORE_START_MESSAGE);
        self.sync_end_to_start();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingNotifier;

    fn input() -> (TimeRangeInput, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut range = TimeRangeInput::new(notifier.clone());
        range.initialize();
        (range, notifier)
    }

    fn tv(meridiem: Meridiem, hour: u32, minute: u32) -> TimeValue {
        TimeValue::new(meridiem, hour, minute)
    }

    #[test]
    fn test_minutes_round_trip_whole_day() {
        for minutes in 0..MINUTES_PER_DAY {
            assert_eq!(TimeValue::from_minutes(minutes).to_minutes(), minutes);
        }
        assert_eq!(TimeValue::from_minutes(0), tv(Meridiem::Am, 12, 0));
        assert_eq!(TimeValue::from_minutes(720), tv(Meridiem::Pm, 12, 0));
        assert_eq!(TimeValue::from_minutes(1440 + 61), tv(Meridiem::Am, 1, 1));
        assert_eq!(TimeValue::from_minutes(-1), tv(Meridiem::Pm, 11, 59));
    }

    #[test]
    fn test_defaults_and_idempotent_initialize() {
        let (mut range, _) = input();
        assert_eq!(range.state(), TimeRangeState::default());
        assert_eq!(range.field_text(Side::Start, TimeField::Hour), "10");
        assert_eq!(range.field_text(Side::End, TimeField::Minute), "00");

        range.input(Side::Start, TimeField::Hour, "3");
        range.commit(Side::Start);
        assert!(!range.initialize());
        assert_eq!(range.value(Side::Start), tv(Meridiem::Am, 3, 0));
    }

    #[test]
    fn test_live_input_strips_non_digits() {
        let (mut range, _) = input();
        range.input(Side::Start, TimeField::Minute, "4a5x9");
        assert_eq!(range.field_text(Side::Start, TimeField::Minute), "45");
        range.input(Side::Start, TimeField::Hour, "");
        assert_eq!(range.field_text(Side::Start, TimeField::Hour), "");
    }

    #[test]
    fn test_commit_clamps_and_pads() {
        let (mut range, _) = input();
        range.input(Side::Start, TimeField::Hour, "13");
        range.input(Side::Start, TimeField::Minute, "7");
        range.commit(Side::Start);
        assert_eq!(range.field_text(Side::Start, TimeField::Hour), "12");
        assert_eq!(range.field_text(Side::Start, TimeField::Minute), "07");

        range.input(Side::Start, TimeField::Hour, "0");
        range.input(Side::Start, TimeField::Minute, "99");
        range.commit(Side::Start);
        assert_eq!(range.value(Side::Start), tv(Meridiem::Am, 1, 59));
    }

    #[test]
    fn test_start_commit_always_pushes_end() {
        for start_minutes in (0..MINUTES_PER_DAY).step_by(17) {
            let (mut range, notifier) = input();
            let start = TimeValue::from_minutes(start_minutes);
            range.set_meridiem(Side::Start, start.meridiem);
            range.input(Side::Start, TimeField::Hour, &start.hour.to_string());
            range.input(Side::Start, TimeField::Minute, &start.minute.to_string());
            range.commit(Side::Start);

            let state = range.state();
            assert_eq!(state.start, start);
            assert_eq!(
                state.end.to_minutes(),
                (start.to_minutes() + 60) % MINUTES_PER_DAY
            );
            assert_eq!(notifier.count(), 0);
        }
    }

    #[test]
    fn test_end_commit_before_start_is_corrected_once() {
        let (mut range, notifier) = input();
        range.input(Side::End, TimeField::Hour, "9");
        assert!(range.commit(Side::End));

        assert_eq!(range.value(Side::End), tv(Meridiem::Am, 11, 0));
        assert_eq!(notifier.count(), 1);
        assert_eq!(
            notifier.messages.lock().unwrap()[0],
            END_BEFORE_START_MESSAGE
        );
    }

    #[test]
    fn test_end_commit_equal_or_later_is_kept() {
        let (mut range, notifier) = input();
        range.input(Side::End, TimeField::Hour, "10");
        range.input(Side::End, TimeField::Minute, "00");
        assert!(!range.commit(Side::End));
        assert_eq!(range.value(Side::End), tv(Meridiem::Am, 10, 0));

        range.set_meridiem(Side::End, Meridiem::Pm);
        range.input(Side::End, TimeField::Hour, "3");
        assert!(!range.commit(Side::End));
        assert_eq!(range.value(Side::End), tv(Meridiem::Pm, 3, 0));
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn test_end_meridiem_back_to_am_corrects() {
        let (mut range, notifier) = input();
        range.set_meridiem(Side::End, Meridiem::Pm);
        range.input(Side::End, TimeField::Hour, "9");
        range.commit(Side::End);
        assert_eq!(range.value(Side::End), tv(Meridiem::Pm, 9, 0));

        assert!(range.set_meridiem(Side::End, Meridiem::Am));
        assert_eq!(range.value(Side::End), tv(Meridiem::Am, 11, 0));
        assert_eq!(notifier.count(), 1);
    }

    #[test]
    fn test_start_meridiem_drags_end() {
        let (mut range, _) = input();
        range.toggle_meridiem(Side::Start);
        let state = range.state();
        assert_eq!(state.start, tv(Meridiem::Pm, 10, 0));
        assert_eq!(state.end, tv(Meridiem::Pm, 11, 0));

        // 11:30 PM wraps to 12:30 AM within the same cycle.
        range.input(Side::Start, TimeField::Hour, "11");
        range.input(Side::Start, TimeField::Minute, "30");
        range.commit(Side::Start);
        assert_eq!(range.value(Side::End), tv(Meridiem::Am, 12, 30));
    }

    #[test]
    fn test_meridiem_keys() {
        let (mut range, _) = input();
        assert!(range.meridiem_key(Side::Start, NavKey::End));
        assert_eq!(range.meridiem(Side::Start), Meridiem::Pm);
        assert!(range.meridiem_key(Side::Start, NavKey::End));
        assert_eq!(range.meridiem(Side::Start), Meridiem::Pm);
        assert!(range.meridiem_key(Side::Start, NavKey::Home));
        assert_eq!(range.meridiem(Side::Start), Meridiem::Am);
        assert!(range.meridiem_key(Side::Start, NavKey::Space));
        assert_eq!(range.meridiem(Side::Start), Meridiem::Pm);
        assert!(!range.meridiem_key(Side::Start, NavKey::ArrowUp));
    }

    #[test]
    fn test_restored_keeps_values() {
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());
        let state = TimeRangeState {
            start: tv(Meridiem::Pm, 2, 15),
            end: tv(Meridiem::Pm, 4, 45),
        };
        let mut range = TimeRangeInput::restored(state, notifier);
        assert!(range.is_initialized());
        assert!(!range.initialize());
        assert_eq!(range.state(), state);
    }

    #[test]
    fn test_time_value_json_shape() {
        let json = serde_json::to_string(&tv(Meridiem::Pm, 2, 5)).unwrap();
        assert_eq!(json, r#"{"ampm":"PM","hour":2,"minute":5}"#);
    }

    #[test]
    fn test_stored_values_are_clamped() {
        let parsed: TimeValue =
            serde_json::from_str(r#"{"ampm":"AM","hour":0,"minute":99}"#).unwrap();
        assert_eq!(parsed, tv(Meridiem::Am, 1, 59));
        let parsed: TimeValue =
            serde_json::from_str(r#"{"ampm":"PM","hour":300,"minute":7}"#).unwrap();
        assert_eq!(parsed, tv(Meridiem::Pm, 12, 7));
        assert!(serde_json::from_str::<TimeValue>(r#"{"ampm":"PM","hour":-1,"minute":0}"#).is_err());
    }
}

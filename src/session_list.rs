//! The "event schedule": an ordered list of sessions, each with a date picked
//! from its own calendar, a start/end time range and a description.
//!
//! The controller owns every child widget directly. Calendars and time inputs
//! are created the first time their section is used, and every mutation ends
//! in exactly one aggregate change notification carrying `serialize()`.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calendar::{DateBounds, DateCalendar};
use crate::config::DescriptionLimits;
use crate::dates::{YearMonth, format_korean_ymd};
use crate::persistence::{DebouncedWriter, KeyValueStore};
use crate::textarea::ResponsiveTextarea;
use crate::time_input::{Meridiem, Side, TimeField, TimeRangeInput, TimeRangeState, TimeValue};
use crate::ui_kit::{ConfirmPrompt, ConfirmService, ModalChoice, Notifier};
use crate::widget::{NavKey, Observers, SubscriptionId};

pub const SINGLE_SESSION_TITLE: &str = "회차 정보";
pub const DATE_PLACEHOLDER: &str = "날짜를 선택해주세요";
pub const DATE_ERROR_TEXT: &str = "문제가 발생하였습니다";

const REMOVE_TITLE: &str = "작성된 내용을 삭제하시겠어요?";
const REMOVE_BODY: &str = "삭제한 내용은 복구할 수 없습니다.";
const REMOVE_CANCEL: &str = "취소";
const REMOVE_CONFIRM: &str = "삭제하기";

fn default_start() -> TimeValue {
    TimeRangeState::default().start
}

fn default_end() -> TimeValue {
    TimeRangeState::default().end
}

fn clamped(value: TimeValue) -> TimeValue {
    TimeValue::new(value.meridiem, value.hour.into(), value.minute.into())
}

/// Plain, persistable view of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub date_ymd: Option<NaiveDate>,
    #[serde(default = "default_start")]
    pub start: TimeValue,
    #[serde(default = "default_end")]
    pub end: TimeValue,
    #[serde(default)]
    pub desc: String,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            date_ymd: None,
            start: default_start(),
            end: default_end(),
            desc: String::new(),
        }
    }
}

/// `event-schedule:change`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleChange {
    pub sessions: Vec<SessionSnapshot>,
}

/// Parses a stored snapshot list. Anything malformed counts as nothing saved.
pub fn load_snapshots(raw: &str) -> Option<Vec<SessionSnapshot>> {
    match serde_json::from_str(raw) {
        Ok(sessions) => Some(sessions),
        Err(e) => {
            warn!(error = %e, "ignoring malformed saved schedule");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionId(u64);

impl SectionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Placeholder,
    Confirmed(NaiveDate),
    /// The calendar confirmed without a selection.
    Failed,
}

impl DateField {
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            Self::Confirmed(date) => Some(date),
            Self::Placeholder | Self::Failed => None,
        }
    }

    pub fn display(self) -> String {
        match self {
            Self::Placeholder => DATE_PLACEHOLDER.to_string(),
            Self::Confirmed(date) => format_korean_ymd(date),
            Self::Failed => DATE_ERROR_TEXT.to_string(),
        }
    }
}

pub struct Section {
    id: SectionId,
    date: DateField,
    calendar: Option<DateCalendar>,
    calendar_open: bool,
    /// Times to show once the time input is built; `None` means defaults.
    restored_time: Option<TimeRangeState>,
    time: Option<TimeRangeInput>,
    description: ResponsiveTextarea,
}

impl Section {
    fn blank(id: SectionId, limits: DescriptionLimits) -> Self {
        Self {
            id,
            date: DateField::Placeholder,
            calendar: None,
            calendar_open: false,
            restored_time: None,
            time: None,
            description: ResponsiveTextarea::new(limits),
        }
    }

    fn filled(id: SectionId, limits: DescriptionLimits, snapshot: &SessionSnapshot) -> Self {
        Self {
            id,
            date: snapshot
                .date_ymd
                .map_or(DateField::Placeholder, DateField::Confirmed),
            calendar: None,
            calendar_open: false,
            restored_time: Some(TimeRangeState {
                start: clamped(snapshot.start),
                end: clamped(snapshot.end),
            }),
            time: None,
            description: ResponsiveTextarea::with_value(limits, snapshot.desc.clone()),
        }
    }

    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn date(&self) -> DateField {
        self.date
    }

    pub fn calendar(&self) -> Option<&DateCalendar> {
        self.calendar.as_ref()
    }

    pub fn is_calendar_open(&self) -> bool {
        self.calendar_open
    }

    /// Present once the section has been focused.
    pub fn time_input(&self) -> Option<&TimeRangeInput> {
        self.time.as_ref()
    }

    pub fn time_state(&self) -> TimeRangeState {
        match &self.time {
            Some(input) => input.state(),
            None => self.restored_time.unwrap_or_default(),
        }
    }

    pub fn description(&self) -> &ResponsiveTextarea {
        &self.description
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let time = self.time_state();
        SessionSnapshot {
            date_ymd: self.date.date(),
            start: time.start,
            end: time.end,
            desc: self.description.value().to_string(),
        }
    }

    /// One-time setup of the description and time pair. Returns true on the
    /// first call.
    fn activate(&mut self, notifier: &Arc<dyn Notifier>) -> bool {
        let first = !self.description.is_initialized() || self.time.is_none();
        self.live_time(notifier);
        if first {
            debug!(section = self.id.0, "initialized section controls");
        }
        first
    }

    fn live_time(&mut self, notifier: &Arc<dyn Notifier>) -> &mut TimeRangeInput {
        self.description.initialize();
        let restored = self.restored_time;
        self.time.get_or_insert_with(|| match restored {
            Some(state) => TimeRangeInput::restored(state, Arc::clone(notifier)),
            None => {
                let mut input = TimeRangeInput::new(Arc::clone(notifier));
                input.initialize();
                input
            }
        })
    }
}

/// A pending removal, waiting on the user's answer.
pub struct RemovalRequest {
    id: SectionId,
    confirm: Arc<dyn ConfirmService>,
}

impl RemovalRequest {
    pub fn section(&self) -> SectionId {
        self.id
    }

    pub async fn decide(self) -> RemovalDecision {
        let prompt = ConfirmPrompt::new(REMOVE_TITLE, REMOVE_BODY)
            .with_labels(REMOVE_CANCEL, REMOVE_CONFIRM);
        let choice = self.confirm.confirm(prompt).await;
        RemovalDecision { id: self.id, choice }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalDecision {
    pub id: SectionId,
    pub choice: ModalChoice,
}

pub struct SessionListController {
    today: NaiveDate,
    sections: Vec<Section>,
    next_id: u64,
    limits: DescriptionLimits,
    confirm: Arc<dyn ConfirmService>,
    notifier: Arc<dyn Notifier>,
    observers: Observers<ScheduleChange>,
}

impl SessionListController {
    /// Starts with one blank session. `today` is fixed for the controller's
    /// lifetime and handed to every calendar it creates.
    pub fn initialize(
        today: NaiveDate,
        confirm: Arc<dyn ConfirmService>,
        notifier: Arc<dyn Notifier>,
        limits: DescriptionLimits,
    ) -> Self {
        let mut controller = Self {
            today,
            sections: Vec::new(),
            next_id: 0,
            limits,
            confirm,
            notifier,
            observers: Observers::default(),
        };
        let id = controller.allocate_id();
        controller.sections.push(Section::blank(id, limits));
        controller
    }

    fn allocate_id(&mut self) -> SectionId {
        let id = SectionId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == id)
    }

    pub fn ids(&self) -> Vec<SectionId> {
        self.sections.iter().map(|section| section.id).collect()
    }

    fn index_of(&self, id: SectionId) -> Option<usize> {
        self.sections.iter().position(|section| section.id == id)
    }

    fn section_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        self.sections.iter_mut().find(|section| section.id == id)
    }

    /// "회차 정보" for a lone session, otherwise "N회차 정보".
    pub fn title(&self, index: usize) -> String {
        if self.sections.len() == 1 {
            SINGLE_SESSION_TITLE.to_string()
        } else {
            format!("{}회차 정보", index + 1)
        }
    }

    pub fn shows_remove_controls(&self) -> bool {
        self.sections.len() >= 2
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&ScheduleChange) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn emit_change(&mut self) {
        let change = ScheduleChange {
            sessions: self.serialize(),
        };
        self.observers.emit(&change);
    }

    pub fn append_session(&mut self) -> SectionId {
        let id = self.allocate_id();
        self.sections.push(Section::blank(id, self.limits));
        self.emit_change();
        id
    }

    /// First half of a removal: the caller awaits `decide` without holding the
    /// controller, so other sections stay usable meanwhile.
    pub fn request_removal(&self, id: SectionId) -> Option<RemovalRequest> {
        self.index_of(id)?;
        Some(RemovalRequest {
            id,
            confirm: Arc::clone(&self.confirm),
        })
    }

    /// Second half of a removal. Only a confirmed decision for a section that
    /// still exists removes anything. Removing the last session leaves a
    /// blank one in its place.
    pub fn apply_removal(&mut self, decision: RemovalDecision) -> bool {
        if decision.choice != ModalChoice::Confirm {
            debug!(section = decision.id.0, choice = ?decision.choice, "removal dismissed");
            return false;
        }
        let Some(index) = self.index_of(decision.id) else {
            return false;
        };
        self.sections.remove(index);
        if self.sections.is_empty() {
            let id = self.allocate_id();
            self.sections.push(Section::blank(id, self.limits));
        }
        self.emit_change();
        true
    }

    pub async fn remove_session(&mut self, id: SectionId) -> bool {
        let Some(request) = self.request_removal(id) else {
            return false;
        };
        let decision = request.decide().await;
        self.apply_removal(decision)
    }

    /// Exclusive bounds from the neighbours' confirmed dates.
    pub fn bounds_for(&self, id: SectionId) -> Option<DateBounds> {
        let index = self.index_of(id)?;
        let min = index
            .checked_sub(1)
            .and_then(|prev| self.sections.get(prev))
            .and_then(|section| section.date.date());
        let max = self
            .sections
            .get(index + 1)
            .and_then(|section| section.date.date());
        Some(DateBounds::new(min, max))
    }

    /// Builds the calendar on first use, pushes the current bounds and shows it.
    pub fn open_calendar(&mut self, id: SectionId) -> bool {
        let Some(bounds) = self.bounds_for(id) else {
            return false;
        };
        let today = self.today;
        let Some(section) = self.section_mut(id) else {
            return false;
        };
        let confirmed = section.date.date();
        let calendar = section.calendar.get_or_insert_with(|| {
            debug!(section = id.0, "creating calendar");
            let mut calendar = DateCalendar::initialize(today, confirmed.map(YearMonth::of));
            if let Some(date) = confirmed {
                calendar.preselect(date);
            }
            calendar
        });
        calendar.set_bounds(bounds.min, bounds.max);
        section.calendar_open = true;
        true
    }

    pub fn close_calendar(&mut self, id: SectionId) -> bool {
        match self.section_mut(id) {
            Some(section) => {
                section.calendar_open = false;
                true
            }
            None => false,
        }
    }

    /// The section's calendar for navigation, clicks and keys.
    pub fn calendar_mut(&mut self, id: SectionId) -> Option<&mut DateCalendar> {
        self.section_mut(id)?.calendar.as_mut()
    }

    /// Confirm button of an open calendar.
    pub fn confirm_calendar(&mut self, id: SectionId) -> bool {
        let Some(calendar) = self.calendar_mut(id) else {
            return false;
        };
        let date = calendar.confirm_selection().date();
        self.on_calendar_confirmed(id, date)
    }

    /// Writes the confirmed date (or the failure marker) and hides the calendar.
    pub fn on_calendar_confirmed(&mut self, id: SectionId, date: Option<NaiveDate>) -> bool {
        let Some(section) = self.section_mut(id) else {
            return false;
        };
        section.date = match date {
            Some(date) => DateField::Confirmed(date),
            None => {
                warn!(section = id.0, "calendar confirmed without a date");
                DateField::Failed
            }
        };
        section.calendar_open = false;
        self.emit_change();
        true
    }

    /// Focus entering a section: lazily sets up its description and time pair.
    pub fn focus_section(&mut self, id: SectionId) -> bool {
        let notifier = Arc::clone(&self.notifier);
        self.section_mut(id)
            .is_some_and(|section| section.activate(&notifier))
    }

    pub fn set_description(&mut self, id: SectionId, raw: &str) -> bool {
        let notifier = Arc::clone(&self.notifier);
        let Some(section) = self.section_mut(id) else {
            return false;
        };
        section.activate(&notifier);
        section.description.input(raw);
        self.emit_change();
        true
    }

    fn with_time(&mut self, id: SectionId, edit: impl FnOnce(&mut TimeRangeInput) -> bool) -> bool {
        let notifier = Arc::clone(&self.notifier);
        let Some(section) = self.section_mut(id) else {
            return false;
        };
        let handled = edit(section.live_time(&notifier));
        if handled {
            self.emit_change();
        }
        handled
    }

    pub fn time_input(&mut self, id: SectionId, side: Side, field: TimeField, raw: &str) -> bool {
        self.with_time(id, |time| {
            time.input(side, field, raw);
            true
        })
    }

    pub fn commit_time(&mut self, id: SectionId, side: Side) -> bool {
        self.with_time(id, |time| {
            time.commit(side);
            true
        })
    }

    pub fn set_meridiem(&mut self, id: SectionId, side: Side, meridiem: Meridiem) -> bool {
        self.with_time(id, |time| {
            time.set_meridiem(side, meridiem);
            true
        })
    }

    pub fn toggle_meridiem(&mut self, id: SectionId, side: Side) -> bool {
        self.with_time(id, |time| {
            time.toggle_meridiem(side);
            true
        })
    }

    pub fn meridiem_key(&mut self, id: SectionId, side: Side, key: NavKey) -> bool {
        self.with_time(id, |time| time.meridiem_key(side, key))
    }

    /// Reads the live widgets; nothing is cached.
    pub fn serialize(&self) -> Vec<SessionSnapshot> {
        self.sections.iter().map(Section::snapshot).collect()
    }

    /// Replaces every section with one per snapshot. An absent or empty list
    /// leaves the current sections alone and returns false.
    pub fn hydrate(&mut self, data: Option<&[SessionSnapshot]>) -> bool {
        let Some(data) = data.filter(|data| !data.is_empty()) else {
            return false;
        };
        let mut sections = Vec::with_capacity(data.len());
        for snapshot in data {
            let id = self.allocate_id();
            sections.push(Section::filled(id, self.limits, snapshot));
        }
        self.sections = sections;
        self.emit_change();
        true
    }
}

/// Restores the schedule saved under `key` and keeps it saved: each change is
/// written back after `debounce` of quiet. The restore itself does not write.
pub async fn mount_event_schedule(
    controller: &mut SessionListController,
    store: Arc<dyn KeyValueStore>,
    key: &str,
    debounce: Duration,
) -> SubscriptionId {
    if let Some(saved) = store.get(key).await.as_deref().and_then(load_snapshots) {
        controller.hydrate(Some(&saved));
    }

    let mut writer = DebouncedWriter::new(store, key, debounce);
    controller.subscribe(move |change| match serde_json::to_string(&change.sessions) {
        Ok(json) => writer.schedule(json),
        Err(e) => warn!(error = %e, "could not serialize schedule"),
    })
}

//! Month-grid date picker with "today"-relative selectability and optional
//! exclusive bounds supplied by the owner.

use chrono::NaiveDate;
use tracing::debug;

use crate::dates::{YearMonth, grid_start, ymd_key};
use crate::widget::{NavKey, Observers, SubscriptionId, edge_enabled, step_enabled};

pub const GRID_CELLS: usize = 42;

/// Exclusive date bounds: a date is admitted only if `min < date < max`.
/// A missing side is unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateBounds {
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
}

impl DateBounds {
    pub fn new(min: Option<NaiveDate>, max: Option<NaiveDate>) -> Self {
        Self { min, max }
    }

    pub fn admits(&self, date: NaiveDate) -> bool {
        self.min.is_none_or(|min| date > min) && self.max.is_none_or(|max| date < max)
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Which month of the rendered grid a date belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMonth {
    Previous,
    Viewed,
    Next,
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub host: HostMonth,
    pub selectable: bool,
    pub selected: bool,
    pub focused: bool,
    /// The date passes the today policy but falls outside the bounds.
    pub out_of_bounds: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarEvent {
    /// `calendar:change`
    Changed { date: NaiveDate },
    /// `calendar:confirm`; `None` when nothing was selected.
    Confirmed { date: Option<NaiveDate> },
}

impl CalendarEvent {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Changed { date } => Some(*date),
            Self::Confirmed { date } => *date,
        }
    }

    pub fn key(&self) -> Option<String> {
        self.date().map(ymd_key)
    }
}

pub struct DateCalendar {
    today: NaiveDate,
    view: YearMonth,
    selected: Option<NaiveDate>,
    bounds: DateBounds,
    focused: Option<NaiveDate>,
    observers: Observers<CalendarEvent>,
}

impl DateCalendar {
    /// Opens on `anchor` when given, otherwise on the month containing `today`.
    /// Today starts out selected if it is selectable from that view.
    pub fn initialize(today: NaiveDate, anchor: Option<YearMonth>) -> Self {
        let mut calendar = Self {
            today,
            view: anchor.unwrap_or_else(|| YearMonth::of(today)),
            selected: Some(today),
            bounds: DateBounds::default(),
            focused: None,
            observers: Observers::default(),
        };
        calendar.settle_selection();
        calendar
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn view(&self) -> YearMonth {
        self.view
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn bounds(&self) -> DateBounds {
        self.bounds
    }

    pub fn focused(&self) -> Option<NaiveDate> {
        self.focused
    }

    pub fn can_confirm(&self) -> bool {
        self.selected.is_some()
    }

    /// The calendar never pages into or before the present month.
    pub fn can_navigate_previous(&self) -> bool {
        self.view > YearMonth::of(self.today)
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&CalendarEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn host_of(&self, date: NaiveDate) -> HostMonth {
        let month = YearMonth::of(date);
        if month == self.view {
            HostMonth::Viewed
        } else if month == self.view.shift(1) {
            HostMonth::Next
        } else if month == self.view.shift(-1) {
            HostMonth::Previous
        } else {
            HostMonth::Outside
        }
    }

    /// Past months never, the current month from today on, future months always.
    fn passes_today_policy(&self, date: NaiveDate) -> bool {
        let host = YearMonth::of(date);
        let current = YearMonth::of(self.today);
        if host < current {
            false
        } else if host == current {
            date >= self.today
        } else {
            true
        }
    }

    pub fn is_selectable(&self, date: NaiveDate) -> bool {
        self.host_of(date) != HostMonth::Outside
            && self.passes_today_policy(date)
            && self.bounds.admits(date)
    }

    /// The 6x7 grid starting on the Sunday on or before the 1st of the view.
    pub fn cells(&self) -> Vec<CalendarCell> {
        let start = grid_start(self.view);
        start
            .iter_days()
            .take(GRID_CELLS)
            .map(|date| {
                let host = self.host_of(date);
                let in_grid_month = host != HostMonth::Outside && self.passes_today_policy(date);
                let selectable = in_grid_month && self.bounds.admits(date);
                CalendarCell {
                    date,
                    host,
                    selectable,
                    selected: selectable && self.selected == Some(date),
                    focused: self.focused == Some(date),
                    out_of_bounds: in_grid_month && !selectable,
                }
            })
            .collect()
    }

    /// Selection and focus only ever rest on selectable dates.
    fn settle_selection(&mut self) {
        if let Some(date) = self.selected.filter(|date| !self.is_selectable(*date)) {
            debug!(%date, "selection no longer selectable, clearing it");
            self.selected = None;
        }
        if self.focused.is_some_and(|date| !self.is_selectable(date)) {
            self.focused = None;
        }
    }

    /// `calendar:set-bounds`. Drops the selection when the new bounds exclude it.
    pub fn set_bounds(&mut self, min: Option<NaiveDate>, max: Option<NaiveDate>) {
        self.bounds = DateBounds::new(min, max);
        self.settle_selection();
    }

    /// Shows an already chosen date as selected without notifying. Dates that
    /// are not selectable from the current view leave the selection empty.
    pub fn preselect(&mut self, date: NaiveDate) -> bool {
        self.selected = Some(date);
        self.settle_selection();
        self.selected.is_some()
    }

    /// Shifts the view by one month and deselects. Returns false when paging
    /// back is disabled.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        let delta = match direction {
            Direction::Previous if !self.can_navigate_previous() => return false,
            Direction::Previous => -1,
            Direction::Next => 1,
        };
        self.view = self.view.shift(delta);
        self.selected = None;
        self.focused = None;
        true
    }

    /// Selects `date` if it is selectable; clicking a cell of the adjacent
    /// month moves the view there. Ignored clicks return false.
    pub fn select_cell(&mut self, date: NaiveDate) -> bool {
        if !self.is_selectable(date) {
            debug!(%date, "ignoring click on non-selectable date");
            return false;
        }
        match self.host_of(date) {
            HostMonth::Next => self.view = self.view.shift(1),
            HostMonth::Previous => self.view = self.view.shift(-1),
            HostMonth::Viewed | HostMonth::Outside => {}
        }
        self.selected = Some(date);
        self.observers.emit(&CalendarEvent::Changed { date });
        true
    }

    /// Emits `calendar:confirm`. Hiding the calendar is up to the caller.
    pub fn confirm_selection(&mut self) -> CalendarEvent {
        let event = CalendarEvent::Confirmed {
            date: self.selected,
        };
        self.observers.emit(&event);
        event
    }

    /// Keyboard handling over selectable cells. Returns true if the key was used.
    pub fn handle_key(&mut self, key: NavKey) -> bool {
        let cells = self.cells();
        let current = self
            .focused
            .and_then(|date| cells.iter().position(|cell| cell.date == date));
        let target = match key {
            NavKey::ArrowRight | NavKey::ArrowDown => {
                step_enabled(&cells, current, true, |cell| cell.selectable)
            }
            NavKey::ArrowLeft | NavKey::ArrowUp => {
                step_enabled(&cells, current, false, |cell| cell.selectable)
            }
            NavKey::Home => edge_enabled(&cells, true, |cell| cell.selectable),
            NavKey::End => edge_enabled(&cells, false, |cell| cell.selectable),
            NavKey::Space | NavKey::Enter => {
                return match self.focused {
                    Some(date) => self.select_cell(date),
                    None => false,
                };
            }
        };
        match target {
            Some(index) => {
                self.focused = Some(cells[index].date);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // A Saturday; March 2025 starts on a Saturday as well.
    fn today() -> NaiveDate {
        date(2025, 3, 15)
    }

    fn calendar() -> DateCalendar {
        DateCalendar::initialize(today(), None)
    }

    #[test]
    fn test_initial_state() {
        let cal = calendar();
        assert_eq!(cal.view(), YearMonth::new(2025, 3).unwrap());
        assert_eq!(cal.selected(), Some(today()));
        assert!(!cal.can_navigate_previous());
        assert!(cal.bounds().is_unbounded());
    }

    #[test]
    fn test_stored_anchor_is_used() {
        let anchor = YearMonth::new(2025, 6).unwrap();
        let cal = DateCalendar::initialize(today(), Some(anchor));
        assert_eq!(cal.view(), anchor);
        assert!(cal.can_navigate_previous());
    }

    #[test]
    fn test_far_anchor_does_not_keep_today_selected() {
        let cal = DateCalendar::initialize(today(), Some(YearMonth::new(2025, 6).unwrap()));
        assert_eq!(cal.selected(), None);
        assert!(!cal.can_confirm());
        assert!(cal.cells().iter().all(|c| !c.selected));

        // March is the month before April, so today stays reachable.
        let cal = DateCalendar::initialize(today(), Some(YearMonth::new(2025, 4).unwrap()));
        assert_eq!(cal.selected(), Some(today()));
    }

    #[test]
    fn test_preselect_only_accepts_selectable_dates() {
        let mut cal = DateCalendar::initialize(today(), Some(YearMonth::new(2025, 6).unwrap()));
        assert!(cal.preselect(date(2025, 6, 10)));
        assert_eq!(cal.selected(), Some(date(2025, 6, 10)));

        assert!(!cal.preselect(date(2025, 9, 1)));
        assert_eq!(cal.selected(), None);
        assert!(!cal.preselect(date(2025, 3, 14)));
    }

    #[test]
    fn test_selection_always_satisfies_selectability() {
        let mut cal = calendar();
        let steps: [fn(&mut DateCalendar); 6] = [
            |c| c.set_bounds(None, Some(date(2025, 3, 31))),
            |c| {
                c.select_cell(date(2025, 3, 30));
            },
            |c| c.set_bounds(Some(date(2025, 3, 29)), None),
            |c| c.set_bounds(Some(date(2025, 3, 30)), Some(date(2025, 4, 3))),
            |c| {
                c.select_cell(date(2025, 4, 2));
            },
            |c| c.set_bounds(Some(date(2025, 4, 2)), None),
        ];
        for step in steps {
            step(&mut cal);
            if let Some(selected) = cal.selected() {
                assert!(cal.is_selectable(selected), "{selected} left selected");
            }
        }
        assert_eq!(cal.selected(), None);
    }

    #[test]
    fn test_grid_layout() {
        let cells = calendar().cells();
        assert_eq!(cells.len(), GRID_CELLS);
        assert_eq!(cells[0].date, date(2025, 2, 23));
        assert_eq!(cells[0].host, HostMonth::Previous);
        assert_eq!(cells[41].date, date(2025, 4, 5));
        assert_eq!(cells[41].host, HostMonth::Next);

        // 15..=31 March plus 1..=5 April.
        let selectable: Vec<_> = cells.iter().filter(|c| c.selectable).collect();
        assert_eq!(selectable.len(), 22);
        assert_eq!(selectable[0].date, today());
        assert!(cells.iter().filter(|c| c.selected).all(|c| c.date == today()));
    }

    #[test]
    fn test_future_dates_in_reach_are_selectable() {
        let mut d = today();
        while d < date(2025, 5, 1) {
            let mut cal = calendar();
            if cal.host_of(d) == HostMonth::Viewed || cal.host_of(d) == HostMonth::Next {
                assert!(cal.select_cell(d), "{d} should be selectable");
                assert_eq!(cal.selected(), Some(d));
            }
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_past_dates_never_selectable() {
        let past = [date(2025, 3, 14), date(2025, 3, 1), date(2025, 2, 28), date(2024, 12, 31)];
        let mut cal = calendar();
        for _ in 0..3 {
            for d in past {
                assert!(!cal.select_cell(d), "{d} must be ignored");
            }
            cal.navigate(Direction::Next);
        }
    }

    #[test]
    fn test_dates_beyond_adjacent_months_ignored() {
        let mut cal = calendar();
        assert!(!cal.select_cell(date(2025, 5, 10)));
        assert_eq!(cal.selected(), Some(today()));
    }

    #[test]
    fn test_adjacent_month_click_moves_view() {
        let mut cal = calendar();
        assert!(cal.select_cell(date(2025, 4, 2)));
        assert_eq!(cal.view(), YearMonth::new(2025, 4).unwrap());

        // April's grid starts on Sunday 30 March, which is current-month and future.
        assert_eq!(cal.cells()[0].date, date(2025, 3, 30));
        assert!(cal.select_cell(date(2025, 3, 31)));
        assert_eq!(cal.view(), YearMonth::new(2025, 3).unwrap());
    }

    #[test]
    fn test_exclusive_bounds() {
        let mut cal = calendar();
        cal.set_bounds(Some(date(2025, 3, 20)), Some(date(2025, 3, 25)));

        assert_eq!(cal.selected(), None, "today falls below min and is cleared");
        assert!(!cal.select_cell(date(2025, 3, 20)));
        assert!(!cal.select_cell(date(2025, 3, 25)));
        for day in 21..=24 {
            assert!(cal.select_cell(date(2025, 3, day)));
        }

        let cells = cal.cells();
        let twenty_six = cells.iter().find(|c| c.date == date(2025, 3, 26)).unwrap();
        assert!(!twenty_six.selectable);
        assert!(twenty_six.out_of_bounds);
    }

    #[test]
    fn test_one_sided_bounds_and_valid_selection_kept() {
        let mut cal = calendar();
        cal.set_bounds(None, Some(date(2025, 3, 20)));
        assert_eq!(cal.selected(), Some(today()));
        assert!(!cal.select_cell(date(2025, 3, 21)));
        assert!(cal.select_cell(date(2025, 3, 19)));

        cal.set_bounds(Some(date(2025, 3, 19)), None);
        assert_eq!(cal.selected(), None);
        assert!(cal.select_cell(date(2025, 4, 1)));
    }

    #[test]
    fn test_navigation_clears_selection() {
        let mut cal = calendar();
        assert!(!cal.navigate(Direction::Previous));
        assert_eq!(cal.selected(), Some(today()));

        assert!(cal.navigate(Direction::Next));
        assert_eq!(cal.selected(), None);
        assert!(cal.select_cell(date(2025, 4, 10)));

        assert!(cal.navigate(Direction::Previous));
        assert_eq!(cal.selected(), None);
        assert_eq!(cal.view(), YearMonth::of(today()));
        assert!(!cal.can_confirm());
    }

    #[test]
    fn test_confirm_carries_selection() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut cal = calendar();
        let sink = Arc::clone(&events);
        cal.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        cal.select_cell(date(2025, 3, 20));
        let confirmed = cal.confirm_selection();
        assert_eq!(confirmed.key().as_deref(), Some("2025-03-20"));

        cal.navigate(Direction::Next);
        assert_eq!(cal.confirm_selection(), CalendarEvent::Confirmed { date: None });

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                CalendarEvent::Changed { date: date(2025, 3, 20) },
                CalendarEvent::Confirmed { date: Some(date(2025, 3, 20)) },
                CalendarEvent::Confirmed { date: None },
            ]
        );
    }

    #[test]
    fn test_ignored_click_emits_nothing() {
        let events = Arc::new(Mutex::new(0));
        let mut cal = calendar();
        let sink = Arc::clone(&events);
        cal.subscribe(move |_| *sink.lock().unwrap() += 1);
        cal.select_cell(date(2025, 3, 1));
        assert_eq!(*events.lock().unwrap(), 0);
    }

    #[test]
    fn test_keyboard_traversal_skips_disabled_and_wraps() {
        let mut cal = calendar();
        assert!(cal.handle_key(NavKey::ArrowRight));
        assert_eq!(cal.focused(), Some(today()));

        assert!(cal.handle_key(NavKey::ArrowLeft));
        assert_eq!(cal.focused(), Some(date(2025, 4, 5)));

        assert!(cal.handle_key(NavKey::Home));
        assert_eq!(cal.focused(), Some(today()));
        assert!(cal.handle_key(NavKey::ArrowDown));
        assert_eq!(cal.focused(), Some(date(2025, 3, 16)));

        assert!(cal.handle_key(NavKey::End));
        assert!(cal.handle_key(NavKey::Enter));
        assert_eq!(cal.selected(), Some(date(2025, 4, 5)));
        assert_eq!(cal.view(), YearMonth::new(2025, 4).unwrap());
    }

    #[test]
    fn test_activation_without_focus_does_nothing() {
        let mut cal = calendar();
        assert!(!cal.handle_key(NavKey::Space));
        assert_eq!(cal.selected(), Some(today()));
    }

    #[test]
    fn test_no_selectable_cells_means_no_focus() {
        let mut cal = calendar();
        cal.set_bounds(Some(date(2025, 3, 15)), Some(date(2025, 3, 16)));
        assert!(!cal.handle_key(NavKey::ArrowRight));
        assert_eq!(cal.focused(), None);
    }
}

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::persistence::{DebouncedWriter, KeyValueStore};
use crate::widget::{NavKey, Observers, SubscriptionId, edge_enabled, step_enabled};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityOption {
    pub value: String,
    pub label: String,
    pub disabled: bool,
    pub hidden: bool,
}

impl ActivityOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            disabled: false,
            hidden: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn is_selectable(&self) -> bool {
        !self.disabled && !self.hidden
    }
}

/// `activity-type-change`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTypeChange {
    pub value: String,
}

/// Radio group for the activity style of the event. At most one option is
/// checked; disabled or hidden options can never become checked.
pub struct ActivityTypeGroup {
    options: Vec<ActivityOption>,
    selected: Option<usize>,
    focused: Option<usize>,
    observers: Observers<ActivityTypeChange>,
}

impl ActivityTypeGroup {
    pub fn new(options: Vec<ActivityOption>) -> Self {
        Self {
            options,
            selected: None,
            focused: None,
            observers: Observers::default(),
        }
    }

    pub fn options(&self) -> &[ActivityOption] {
        &self.options
    }

    pub fn selected(&self) -> Option<&ActivityOption> {
        self.selected.and_then(|index| self.options.get(index))
    }

    pub fn selected_value(&self) -> Option<&str> {
        self.selected().map(|option| option.value.as_str())
    }

    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    /// The option that takes keyboard focus: the checked one, else the first.
    pub fn tab_stop(&self) -> Option<usize> {
        self.selected
            .or_else(|| (!self.options.is_empty()).then_some(0))
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&ActivityTypeChange) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(listener)
    }

    fn index_of(&self, value: &str) -> Option<usize> {
        self.options.iter().position(|option| option.value == value)
    }

    fn apply(&mut self, index: usize, notify: bool) {
        self.selected = Some(index);
        if notify {
            let value = self.options[index].value.clone();
            self.observers.emit(&ActivityTypeChange { value });
        }
    }

    /// Checks a saved value without notifying. Unknown or unselectable values
    /// are ignored.
    pub fn restore(&mut self, value: &str) -> bool {
        match self.index_of(value) {
            Some(index) if self.options[index].is_selectable() => {
                self.apply(index, false);
                true
            }
            _ => {
                debug!(value, "saved activity type is not selectable");
                false
            }
        }
    }

    /// Click on an option. Re-clicking the checked option changes nothing.
    pub fn click(&mut self, value: &str) -> bool {
        let Some(index) = self.index_of(value) else {
            return false;
        };
        if !self.options[index].is_selectable() {
            debug!(value, "ignoring click on unselectable option");
            return false;
        }
        self.focused = Some(index);
        if self.selected == Some(index) {
            return false;
        }
        self.apply(index, true);
        true
    }

    /// Returns true if the key changed or re-applied the selection.
    pub fn handle_key(&mut self, key: NavKey) -> bool {
        let current = self.focused.or(self.selected).or_else(|| self.tab_stop());
        let Some(current) = current else {
            return false;
        };
        let next = match key {
            NavKey::ArrowRight | NavKey::ArrowDown => {
                step_enabled(&self.options, Some(current), true, ActivityOption::is_selectable)
            }
            NavKey::ArrowLeft | NavKey::ArrowUp => {
                step_enabled(&self.options, Some(current), false, ActivityOption::is_selectable)
            }
            NavKey::Home => edge_enabled(&self.options, true, ActivityOption::is_selectable),
            NavKey::End => edge_enabled(&self.options, false, ActivityOption::is_selectable),
            NavKey::Space | NavKey::Enter => {
                self.apply(current, true);
                return true;
            }
        };
        match next {
            Some(next) if next != current => {
                self.apply(next, true);
                self.focused = Some(next);
                true
            }
            _ => false,
        }
    }
}

/// Restores the saved value and writes every later selection under `key`.
pub async fn mount_activity_type(
    group: &mut ActivityTypeGroup,
    store: Arc<dyn KeyValueStore>,
    key: &str,
) -> SubscriptionId {
    if let Some(saved) = store.get(key).await {
        group.restore(&saved);
    }
    let mut writer = DebouncedWriter::new(store, key, Duration::ZERO);
    group.subscribe(move |change| writer.schedule(change.value.clone()))
}

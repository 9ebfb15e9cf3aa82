//! Form widgets for the event creation page: calendar and time pickers, the
//! repeatable session list, image inputs, the activity-type selector and the
//! modal/toast kit, plus their persistence and HTML rendering.

pub mod activity_type;
pub mod calendar;
pub mod config;
pub mod dates;
pub mod error;
pub mod form;
pub mod image_input;
pub mod persistence;
pub mod render;
pub mod session_list;
pub mod storybook;
pub mod textarea;
pub mod time_input;
pub mod ui_kit;
pub mod widget;

#[cfg(test)]
pub(crate) mod test_support;

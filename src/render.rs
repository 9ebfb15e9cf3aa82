//! HTML for every widget. Each function returns a fragment string that the
//! page and storybook handlers splice together.

use chrono::Datelike;
use hypertext::{Raw, prelude::*};

use crate::activity_type::ActivityTypeGroup;
use crate::calendar::{CalendarCell, DateCalendar, HostMonth};
use crate::dates::{WEEKDAY_LABELS, ymd_key};
use crate::image_input::{ACCEPT, MainImageInput, SubImageInput, SubSlot};
use crate::session_list::{DateField, Section, SessionListController};
use crate::textarea::{ResponsiveTextarea, TextStatus};
use crate::time_input::{Meridiem, Side, TimeField};
use crate::ui_kit::ConfirmPrompt;

pub fn render_page(title: &str, body_html: &str) -> String {
    maud! {
        !DOCTYPE
        html lang="ko" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                link rel="stylesheet" href="/static/app.css";
            }
            body {
                (Raw::dangerously_create(body_html))
            }
        }
    }
    .render()
    .into_inner()
}

fn cell_class(cell: &CalendarCell, today: chrono::NaiveDate) -> String {
    let mut class = "calendar-body__cell".to_string();
    if cell.host != HostMonth::Viewed {
        class.push_str(" calendar-body__cell--adjacent");
    }
    if cell.date == today {
        class.push_str(" calendar-body__cell--today");
    }
    if cell.selected {
        class.push_str(" calendar-body__cell--selected");
    }
    if cell.out_of_bounds {
        class.push_str(" calendar-body__cell--out-of-range");
    }
    class
}

pub fn render_calendar(calendar: &DateCalendar) -> String {
    let today = calendar.today();
    let cells = calendar.cells();
    let view = calendar.view();
    let view_key = format!("{:04}-{:02}", view.year, view.month);

    maud! {
        div class="calendar" data-view=(view_key) {
            div class="calendar-head" {
                button type="button" class="calendar-head__btn" data-direction="prev" aria-label="이전 달" disabled[!calendar.can_navigate_previous()] { "‹" }
                span class="calendar-head__month-indicator" { (view.label()) }
                button type="button" class="calendar-head__btn" data-direction="next" aria-label="다음 달" { "›" }
            }
            div class="calendar-body" role="grid" {
                @for label in WEEKDAY_LABELS {
                    div class="calendar-body__weekday" { (label) }
                }
                @for cell in &cells {
                    button
                        type="button"
                        class=(cell_class(cell, today))
                        data-date=(ymd_key(cell.date))
                        aria-pressed=(cell.selected)
                        tabindex=(if cell.focused || cell.selected { 0 } else { -1 })
                        disabled[!cell.selectable]
                    { (cell.date.day()) }
                }
            }
            button type="button" class="calendar-cta-btn" disabled[!calendar.can_confirm()] { "확인" }
        }
    }
    .render()
    .into_inner()
}

fn render_time_picker(side: Side, meridiem: Meridiem, hour: &str, minute: &str) -> String {
    let (side_name, label) = match side {
        Side::Start => ("start", "시작 시간"),
        Side::End => ("end", "종료 시간"),
    };
    maud! {
        div class="event-schedule__time-picker" data-side=(side_name) {
            span class="event-schedule__time-label" { (label) }
            div class="event-schedule__ampm" {
                button type="button" class="event-schedule__ampm__btn" role="switch" aria-checked=(meridiem == Meridiem::Pm) data-value=(meridiem.as_str()) {
                    (meridiem.label())
                }
            }
            input type="text" inputmode="numeric" maxlength="2" class="event-schedule__hour" name=(format!("{side_name}-hour")) value=(hour);
            span { ":" }
            input type="text" inputmode="numeric" maxlength="2" class="event-schedule__minute" name=(format!("{side_name}-minute")) value=(minute);
        }
    }
    .render()
    .into_inner()
}

/// Live input text when the section has been focused, padded values otherwise.
pub fn render_time_range(section: &Section) -> String {
    let pickers: Vec<String> = [Side::Start, Side::End]
        .into_iter()
        .map(|side| match section.time_input() {
            Some(input) => render_time_picker(
                side,
                input.meridiem(side),
                input.field_text(side, TimeField::Hour),
                input.field_text(side, TimeField::Minute),
            ),
            None => {
                let state = section.time_state();
                let value = match side {
                    Side::Start => state.start,
                    Side::End => state.end,
                };
                render_time_picker(
                    side,
                    value.meridiem,
                    &format!("{:02}", value.hour),
                    &format!("{:02}", value.minute),
                )
            }
        })
        .collect();
    format!(r#"<div class="event-schedule__time">{}</div>"#, pickers.join("\n"))
}

pub fn render_textarea(area: &ResponsiveTextarea, name: &str, placeholder: &str) -> String {
    let status = match area.status() {
        TextStatus::TooShort => "too-short",
        TextStatus::Ok => "ok",
    };
    maud! {
        div class="responsive-textarea" data-status=(status) {
            textarea class="responsive-textarea__input" name=(name) rows="1" placeholder=(placeholder) {
                (area.value())
            }
            p class="responsive-textarea__counter" { (area.counter_text()) }
            @if let Some(help) = area.help_text() {
                p class="responsive-textarea__help" { (help) }
            }
        }
    }
    .render()
    .into_inner()
}

fn date_class(date: DateField) -> &'static str {
    match date {
        DateField::Placeholder => {
            "event-schedule__calendar-text event-schedule__calendar-text--placeholder"
        }
        DateField::Failed => "event-schedule__calendar-text event-schedule__calendar-text--error",
        DateField::Confirmed(_) => "event-schedule__calendar-text",
    }
}

fn render_session(controller: &SessionListController, index: usize, section: &Section) -> String {
    let date = section.date();
    let calendar = section.calendar().map(render_calendar);
    let time = render_time_range(section);
    let description = render_textarea(section.description(), "desc", "회차 설명을 입력해주세요");

    maud! {
        section class="event-schedule__section" data-section=(section.id().get()) {
            header class="event-schedule__section-head" {
                h3 class="event-schedule__section-title" { (controller.title(index)) }
                @if controller.shows_remove_controls() {
                    button type="button" class="event-schedule__section-x-btn" aria-label="회차 삭제" { "×" }
                }
            }
            button type="button" class=(date_class(date)) data-ymd=(date.date().map(ymd_key).unwrap_or_default()) {
                (date.display())
            }
            @if let Some(calendar) = &calendar {
                div class="event-schedule__calendar" hidden[!section.is_calendar_open()] {
                    (Raw::dangerously_create(calendar))
                }
            }
            (Raw::dangerously_create(&time))
            (Raw::dangerously_create(&description))
        }
    }
    .render()
    .into_inner()
}

pub fn render_event_schedule(controller: &SessionListController) -> String {
    let sections: Vec<String> = controller
        .sections()
        .iter()
        .enumerate()
        .map(|(index, section)| render_session(controller, index, section))
        .collect();
    maud! {
        div class="event-schedule" {
            @for section in &sections {
                (Raw::dangerously_create(section))
            }
            button type="button" class="event-schedule__add-btn" { "+ 회차 추가" }
        }
    }
    .render()
    .into_inner()
}

pub fn render_modal(prompt: Option<&ConfirmPrompt>) -> String {
    match prompt {
        Some(prompt) => maud! {
            dialog class="modal" open {
                button type="button" class="modal-x" aria-label="닫기" { "×" }
                h2 class="modal-title" { (prompt.title) }
                p class="modal-subtitle" { (prompt.body) }
                div class="modal-actions" {
                    button type="button" class="modal-cancel-btn" { (prompt.cancel_label) }
                    button type="button" class="modal-cta-btn" { (prompt.confirm_label) }
                }
            }
        }
        .render()
        .into_inner(),
        None => maud! { dialog class="modal" {} }.render().into_inner(),
    }
}

pub fn render_toast(message: Option<&str>) -> String {
    maud! {
        @if let Some(message) = message {
            div class="toast toast--visible" role="status" aria-live="polite" { (message) }
        } @else {
            div class="toast" role="status" aria-live="polite" hidden {}
        }
    }
    .render()
    .into_inner()
}

pub fn render_activity_group(group: &ActivityTypeGroup) -> String {
    let tab_stop = group.tab_stop();
    let selected = group.selected_value();
    maud! {
        div class="activity-style-picker" role="radiogroup" aria-label="활동 방식" {
            @for (index, option) in group.options().iter().enumerate() {
                button
                    type="button"
                    class=(if selected == Some(option.value.as_str()) { "activity-style-picker__option active" } else { "activity-style-picker__option" })
                    role="radio"
                    aria-checked=(selected == Some(option.value.as_str()))
                    data-value=(option.value)
                    tabindex=(if tab_stop == Some(index) { 0 } else { -1 })
                    disabled[option.disabled]
                    hidden[option.hidden]
                { (option.label) }
            }
        }
    }
    .render()
    .into_inner()
}

pub fn render_main_image(input: &MainImageInput) -> String {
    let current = input.current();
    maud! {
        div class="main-image-input" {
            input type="file" accept=(ACCEPT) hidden;
            @if let Some(preview) = current {
                img class="main-image-input__img" src=(preview.src()) alt=(preview.file().name);
            } @else {
                img class="main-image-input__img" alt="" hidden aria-hidden="true";
            }
            div class="main-image-input__placeholder" hidden[!input.shows_placeholder()] aria-hidden="true"[!input.shows_placeholder()] {
                "대표 이미지를 등록해주세요"
            }
        }
    }
    .render()
    .into_inner()
}

pub fn render_sub_images(input: &SubImageInput) -> String {
    let slots = input.layout();
    maud! {
        div class="sub-image-input" data-max=(input.max_count()) {
            input type="file" accept=(ACCEPT) multiple hidden;
            @for slot in &slots {
                @match slot {
                    SubSlot::Image { index, src, alt } => {
                        div class="sub-image-input__item" role="button" tabindex="0" data-index=(*index) {
                            img class="sub-image-input__img" src=(src) alt=(alt);
                        }
                    }
                    SubSlot::Placeholder => {
                        div class="sub-image-input__item" role="button" tabindex="0" {
                            img class="sub-image-input__placeholder" alt="이미지 추가";
                        }
                    }
                }
            }
        }
    }
    .render()
    .into_inner()
}

use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use hypertext::{Raw, prelude::*};
use serde::Deserialize;

use crate::calendar::DateCalendar;
use crate::config;
use crate::dates::{YearMonth, parse_ymd_key};
use crate::form::AppState;
use crate::render::{render_calendar, render_event_schedule, render_time_range};
use crate::time_input::{Meridiem, Side};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendar", get(calendar))
        .route("/time", get(time))
        .route("/sessions", get(sessions))
}

fn storybook_page(title: &str, intro: &str, body: &str) -> Html<String> {
    let html = maud! {
        !DOCTYPE
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " - Storybook" }
                link rel="stylesheet" href="/static/app.css";
            }
            body {
                h1 { (title) }
                p { (intro) }
                div .storybook-grid {
                    (Raw::dangerously_create(body))
                }
            }
        }
    };

    Html(html.render().into_inner())
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    month: Option<String>,
    min: Option<String>,
    max: Option<String>,
}

// GET /storybook/calendar?month=2025-03&min=2025-03-10&max=2025-03-20
async fn calendar(Query(query): Query<CalendarQuery>) -> Html<String> {
    let anchor = query.month.as_deref().and_then(YearMonth::parse);
    let mut calendar = DateCalendar::initialize(config::today(), anchor);
    calendar.set_bounds(
        query.min.as_deref().and_then(parse_ymd_key),
        query.max.as_deref().and_then(parse_ymd_key),
    );
    storybook_page(
        "Calendar",
        "Month grid with exclusive min/max bounds:",
        &render_calendar(&calendar),
    )
}

// GET /storybook/time
async fn time(State(state): State<AppState>) -> Html<String> {
    let mut controller = state.controller();
    let id = controller.ids()[0];
    let untouched = render_time_range(&controller.sections()[0]);
    controller.set_meridiem(id, Side::Start, Meridiem::Pm);
    let afternoon = controller
        .section(id)
        .map(render_time_range)
        .unwrap_or_default();
    storybook_page(
        "Time range",
        "Defaults, then the start switched to PM (the end follows):",
        &format!("{untouched}\n{afternoon}"),
    )
}

// GET /storybook/sessions
async fn sessions(State(state): State<AppState>) -> Html<String> {
    let mut controller = state.controller();
    let first = controller.ids()[0];
    controller.append_session();
    controller.on_calendar_confirmed(first, Some(controller.today()));
    controller.set_description(first, "첫 번째 회차 설명입니다.");
    let second = controller.append_session();
    controller.open_calendar(second);
    storybook_page(
        "Event schedule",
        "Three sessions; the first dated, the last with its calendar open:",
        &render_event_schedule(&controller),
    )
}

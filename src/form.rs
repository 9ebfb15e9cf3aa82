use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::{delete, get, post},
};
use hypertext::{Raw, prelude::*};
use tracing::{info, warn};

use crate::activity_type::{ActivityOption, ActivityTypeGroup, mount_activity_type};
use crate::config::{self, AppConfig};
use crate::image_input::{
    MainImageInput, PreviewRegistry, SubImageInput, mount_main_image, mount_sub_images,
};
use crate::persistence::KeyValueStore;
use crate::render::{
    render_activity_group, render_event_schedule, render_main_image, render_modal, render_page,
    render_sub_images, render_toast,
};
use crate::session_list::{
    SessionListController, SessionSnapshot, load_snapshots, mount_event_schedule,
};
use crate::ui_kit::{ModalChoice, ModalDialog, ToastSlot};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub config: Arc<AppConfig>,
    pub modal: Arc<ModalDialog>,
    pub toast: Arc<ToastSlot>,
    pub previews: Arc<PreviewRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn KeyValueStore>, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            modal: Arc::new(ModalDialog::new()),
            toast: Arc::new(ToastSlot::new()),
            previews: Arc::new(PreviewRegistry::new()),
        }
    }

    /// A fresh controller wired to the page's modal and toast.
    pub fn controller(&self) -> SessionListController {
        SessionListController::initialize(
            config::today(),
            self.modal.clone(),
            self.toast.clone(),
            self.config.description,
        )
    }
}

pub fn activity_options() -> Vec<ActivityOption> {
    vec![
        ActivityOption::new("online", "온라인"),
        ActivityOption::new("offline", "오프라인"),
        ActivityOption::new("hybrid", "온·오프라인"),
    ]
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/event-schedule", get(get_event_schedule).put(put_event_schedule))
        .route("/event-schedule/{index}", delete(delete_session))
        .route("/modal/{choice}", post(close_modal))
}

// GET /
pub async fn homepage(State(state): State<AppState>) -> Html<String> {
    let keys = &state.config.storage_keys;
    let images = state.config.images;
    let debounce = state.config.debounce();

    let mut controller = state.controller();
    mount_event_schedule(&mut controller, state.store.clone(), &keys.event_schedule, debounce).await;

    let mut activity = ActivityTypeGroup::new(activity_options());
    mount_activity_type(&mut activity, state.store.clone(), &keys.activity_type).await;

    let mut main_image = MainImageInput::new(state.previews.clone(), images.main_max_bytes);
    mount_main_image(&mut main_image, state.store.clone(), &keys.main_image, debounce).await;

    let mut sub_images = SubImageInput::new(
        state.previews.clone(),
        images.sub_max_bytes,
        images.sub_max_count,
    );
    mount_sub_images(&mut sub_images, state.store.clone(), &keys.sub_images, debounce).await;

    let main_html = render_main_image(&main_image);
    let sub_html = render_sub_images(&sub_images);
    let activity_html = render_activity_group(&activity);
    let schedule_html = render_event_schedule(&controller);
    let modal_html = render_modal(state.modal.current().as_ref());
    let toast_html = render_toast(state.toast.visible().as_deref());

    let body = maud! {
        main class="content-form" {
            h1 { "이벤트 만들기" }
            section class="content-form__images" {
                (Raw::dangerously_create(&main_html))
                (Raw::dangerously_create(&sub_html))
            }
            section class="content-form__activity" { (Raw::dangerously_create(&activity_html)) }
            section class="content-form__schedule" { (Raw::dangerously_create(&schedule_html)) }
        }
        (Raw::dangerously_create(&modal_html))
        (Raw::dangerously_create(&toast_html))
    }
    .render()
    .into_inner();
    Html(render_page("이벤트 만들기", &body))
}

async fn load_schedule(state: &AppState) -> Option<Vec<SessionSnapshot>> {
    let key = &state.config.storage_keys.event_schedule;
    state.store.get(key).await.as_deref().and_then(load_snapshots)
}

async fn save_schedule(state: &AppState, sessions: &[SessionSnapshot]) {
    let key = &state.config.storage_keys.event_schedule;
    match serde_json::to_string(sessions) {
        Ok(json) => {
            state.store.set(key, &json).await;
            info!(sessions = sessions.len(), "saved event schedule");
        }
        Err(e) => warn!(error = %e, "could not serialize event schedule"),
    }
}

// GET /api/event-schedule
pub async fn get_event_schedule(State(state): State<AppState>) -> Json<Vec<SessionSnapshot>> {
    Json(load_schedule(&state).await.unwrap_or_default())
}

// PUT /api/event-schedule
pub async fn put_event_schedule(
    State(state): State<AppState>,
    Json(sessions): Json<Vec<SessionSnapshot>>,
) -> Json<Vec<SessionSnapshot>> {
    let mut controller = state.controller();
    controller.hydrate(Some(&sessions));
    let saved = controller.serialize();
    save_schedule(&state, &saved).await;
    Json(saved)
}

// DELETE /api/event-schedule/{index}
// Opens the removal dialog and answers once it is closed.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<Vec<SessionSnapshot>>, StatusCode> {
    let mut controller = state.controller();
    controller.hydrate(load_schedule(&state).await.as_deref());
    let id = controller
        .ids()
        .get(index)
        .copied()
        .ok_or(StatusCode::NOT_FOUND)?;

    let saved = if controller.remove_session(id).await {
        let saved = controller.serialize();
        save_schedule(&state, &saved).await;
        saved
    } else {
        controller.serialize()
    };
    Ok(Json(saved))
}

// POST /api/modal/{choice}
pub async fn close_modal(
    State(state): State<AppState>,
    Path(choice): Path<ModalChoice>,
) -> StatusCode {
    if state.modal.close(choice) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::CONFLICT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::time_input::{Meridiem, TimeValue};
    use chrono::NaiveDate;

    fn state() -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AppState::new(store.clone(), AppConfig::default()), store)
    }

    fn session(desc: &str) -> SessionSnapshot {
        SessionSnapshot {
            date_ymd: NaiveDate::from_ymd_opt(2099, 1, 2),
            start: TimeValue::new(Meridiem::Am, 9, 0),
            end: TimeValue::new(Meridiem::Am, 10, 30),
            desc: desc.to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_without_saved_state_is_empty() {
        let (state, _) = state();
        let Json(sessions) = get_event_schedule(State(state)).await;
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (state, store) = state();
        let body = vec![session("첫 회차"), session("두 번째 회차")];
        let Json(saved) = put_event_schedule(State(state.clone()), Json(body.clone())).await;
        assert_eq!(saved, body);
        assert!(store.snapshot().contains_key("event-schedule"));

        let Json(loaded) = get_event_schedule(State(state)).await;
        assert_eq!(loaded, body);
    }

    #[tokio::test]
    async fn test_put_empty_keeps_default_session() {
        let (state, _) = state();
        let Json(saved) = put_event_schedule(State(state), Json(Vec::new())).await;
        assert_eq!(saved, vec![SessionSnapshot::default()]);
    }

    async fn wait_for_dialog(state: &AppState) {
        while !state.modal.is_open() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_close_modal_resolves_pending_confirm() {
        use crate::ui_kit::{ConfirmPrompt, ConfirmService};

        let (state, _) = state();
        assert_eq!(
            close_modal(State(state.clone()), Path(ModalChoice::Confirm)).await,
            StatusCode::CONFLICT
        );

        let modal = state.modal.clone();
        let pending = tokio::spawn(async move { modal.confirm(ConfirmPrompt::new("t", "b")).await });
        wait_for_dialog(&state).await;
        assert_eq!(
            close_modal(State(state), Path(ModalChoice::Backdrop)).await,
            StatusCode::NO_CONTENT
        );
        assert_eq!(pending.await.unwrap(), ModalChoice::Backdrop);
    }

    #[tokio::test]
    async fn test_delete_session_waits_for_the_dialog() {
        let (state, _) = state();
        put_event_schedule(State(state.clone()), Json(vec![session("a"), session("b")])).await;

        let removal = tokio::spawn(delete_session(State(state.clone()), Path(0)));
        wait_for_dialog(&state).await;
        assert_eq!(state.modal.current().unwrap().confirm_label, "삭제하기");
        let Html(page) = homepage(State(state.clone())).await;
        assert!(page.contains("<dialog class=\"modal\" open>"));

        close_modal(State(state.clone()), Path(ModalChoice::Confirm)).await;
        let Json(remaining) = removal.await.unwrap().unwrap();
        assert_eq!(remaining, vec![session("b")]);

        let Json(loaded) = get_event_schedule(State(state)).await;
        assert_eq!(loaded, vec![session("b")]);
    }

    #[tokio::test]
    async fn test_delete_session_cancelled_or_missing() {
        let (state, _) = state();
        put_event_schedule(State(state.clone()), Json(vec![session("a")])).await;

        let removal = tokio::spawn(delete_session(State(state.clone()), Path(0)));
        wait_for_dialog(&state).await;
        close_modal(State(state.clone()), Path(ModalChoice::Cancel)).await;
        let Json(remaining) = removal.await.unwrap().unwrap();
        assert_eq!(remaining, vec![session("a")]);

        assert!(matches!(
            delete_session(State(state), Path(3)).await,
            Err(StatusCode::NOT_FOUND)
        ));
    }

    #[tokio::test]
    async fn test_homepage_renders_saved_schedule() {
        let (state, store) = state();
        store.set("activity-type", "hybrid").await;
        put_event_schedule(State(state.clone()), Json(vec![session("a"), session("b")])).await;

        let Html(page) = homepage(State(state)).await;
        assert!(page.contains("2회차 정보"));
        assert!(page.contains("2099년 1월 2일"));
        assert!(page.contains(r#"aria-checked="true" data-value="hybrid""#));
        assert!(page.contains("<dialog class=\"modal\"></dialog>"));
    }

    #[tokio::test]
    async fn test_homepage_does_not_hold_preview_handles() {
        use crate::image_input::{ImageFile, ImageSnapshot};

        let (state, store) = state();
        let saved = ImageSnapshot::of(&ImageFile::new("main.png", "image/png", vec![1, 2]));
        let main_json = serde_json::to_string(&Some(saved.clone())).unwrap();
        let sub_json = serde_json::to_string(&vec![saved.clone(), saved.clone()]).unwrap();
        store.set("main-image", &main_json).await;
        store.set("sub-images", &sub_json).await;

        for _ in 0..5 {
            let Html(page) = homepage(State(state.clone())).await;
            assert!(page.contains(&format!(r#"src="{}""#, saved.data_url)));
            assert!(!page.contains("blob:preview/"));
        }
        assert_eq!(state.previews.live_count(), 0);
    }
}

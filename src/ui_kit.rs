//! Modal confirmation dialog and toast notifications.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

pub const TOAST_DURATION: Duration = Duration::from_secs(2);

/// How a confirmation dialog was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalChoice {
    Confirm,
    Cancel,
    X,
    Backdrop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub body: String,
    pub cancel_label: String,
    pub confirm_label: String,
}

impl ConfirmPrompt {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            cancel_label: "취소".to_string(),
            confirm_label: "계속".to_string(),
        }
    }

    pub fn with_labels(mut self, cancel: impl Into<String>, confirm: impl Into<String>) -> Self {
        self.cancel_label = cancel.into();
        self.confirm_label = confirm.into();
        self
    }
}

/// Asks the user to confirm something. Resolves exactly once per call.
#[async_trait]
pub trait ConfirmService: Send + Sync {
    async fn confirm(&self, prompt: ConfirmPrompt) -> ModalChoice;
}

/// Fire-and-forget user notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct OpenPrompt {
    prompt: ConfirmPrompt,
    reply: oneshot::Sender<ModalChoice>,
}

/// The page's `<dialog>`. Prompts queue up; the front one is shown and the
/// page closes it with `close`.
#[derive(Default)]
pub struct ModalDialog {
    open: Mutex<VecDeque<OpenPrompt>>,
}

impl ModalDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The prompt currently on screen.
    pub fn current(&self) -> Option<ConfirmPrompt> {
        lock(&self.open).front().map(|open| open.prompt.clone())
    }

    pub fn is_open(&self) -> bool {
        !lock(&self.open).is_empty()
    }

    /// Resolves the visible prompt. Returns false when nothing was open.
    pub fn close(&self, choice: ModalChoice) -> bool {
        let Some(open) = lock(&self.open).pop_front() else {
            return false;
        };
        if open.reply.send(choice).is_err() {
            debug!("modal closed after its caller went away");
        }
        true
    }
}

#[async_trait]
impl ConfirmService for ModalDialog {
    async fn confirm(&self, prompt: ConfirmPrompt) -> ModalChoice {
        let (reply, choice) = oneshot::channel();
        lock(&self.open).push_back(OpenPrompt { prompt, reply });
        // A dropped dialog counts as dismissed.
        choice.await.unwrap_or(ModalChoice::Cancel)
    }
}

/// Single toast line that hides itself two seconds after it was shown.
#[derive(Default)]
pub struct ToastSlot {
    current: Mutex<Option<(String, Instant)>>,
}

impl ToastSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible(&self) -> Option<String> {
        let current = lock(&self.current);
        match current.as_ref() {
            Some((message, shown)) if shown.elapsed() < TOAST_DURATION => Some(message.clone()),
            _ => None,
        }
    }
}

impl Notifier for ToastSlot {
    fn notify(&self, message: &str) {
        *lock(&self.current) = Some((message.to_string(), Instant::now()));
    }
}

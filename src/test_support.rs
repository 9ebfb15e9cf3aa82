use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ui_kit::{ConfirmPrompt, ConfirmService, ModalChoice, Notifier};

/// Records every toast instead of showing it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Answers prompts from a script, then with `fallback`.
pub struct ScriptedConfirm {
    answers: Mutex<VecDeque<ModalChoice>>,
    fallback: ModalChoice,
    pub prompts: Mutex<Vec<ConfirmPrompt>>,
}

impl ScriptedConfirm {
    pub fn always(choice: ModalChoice) -> Self {
        Self::new(Vec::new(), choice)
    }

    pub fn new(answers: Vec<ModalChoice>, fallback: ModalChoice) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            fallback,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ConfirmService for ScriptedConfirm {
    async fn confirm(&self, prompt: ConfirmPrompt) -> ModalChoice {
        self.prompts.lock().unwrap().push(prompt);
        self.answers.lock().unwrap().pop_front().unwrap_or(self.fallback)
    }
}

use crate::config::DescriptionLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStatus {
    TooShort,
    Ok,
}

/// Free-text field with a character counter and whitespace collapsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsiveTextarea {
    value: String,
    limits: DescriptionLimits,
    initialized: bool,
}

/// Collapses runs of spaces into one space and runs of newlines into one newline.
fn collapse_runs(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut previous = None;
    for ch in raw.chars() {
        if (ch == ' ' || ch == '\n') && previous == Some(ch) {
            continue;
        }
        out.push(ch);
        previous = Some(ch);
    }
    out
}

impl ResponsiveTextarea {
    pub fn new(limits: DescriptionLimits) -> Self {
        Self {
            value: String::new(),
            limits,
            initialized: false,
        }
    }

    /// Hydration path: the stored text is shown as-is.
    pub fn with_value(limits: DescriptionLimits, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            limits,
            initialized: false,
        }
    }

    /// Returns false when already initialized.
    pub fn initialize(&mut self) -> bool {
        !std::mem::replace(&mut self.initialized, true)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Replaces the text. Before initialization the text is taken verbatim.
    pub fn input(&mut self, raw: &str) {
        if !self.initialized {
            self.value = raw.to_string();
            return;
        }
        self.value = collapse_runs(raw)
            .chars()
            .take(self.limits.max_chars)
            .collect();
    }

    pub fn status(&self) -> TextStatus {
        if self.len() < self.limits.min_chars {
            TextStatus::TooShort
        } else {
            TextStatus::Ok
        }
    }

    pub fn help_text(&self) -> Option<String> {
        match self.status() {
            TextStatus::TooShort => Some(format!("최소 {}자 이상 입력해주세요.", self.limits.min_chars)),
            TextStatus::Ok => None,
        }
    }

    pub fn counter_text(&self) -> String {
        format!(
            "{} / {}자 (최소 {}자)",
            self.len(),
            self.limits.max_chars,
            self.limits.min_chars
        )
    }
}

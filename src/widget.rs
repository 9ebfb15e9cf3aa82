//! Pieces shared by every widget: observer registration and keyboard keys.

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E) + Send>;

/// Ordered list of change listeners for one event type.
pub struct Observers<E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<E> Observers<E> {
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false when the id was not (or no longer) registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Keys the widgets react to. Anything else is ignored by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    Space,
    Enter,
}

impl NavKey {
    /// Maps a DOM `KeyboardEvent.key` value, including the legacy IE names.
    pub fn from_dom_key(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" | "Left" => Some(Self::ArrowLeft),
            "ArrowRight" | "Right" => Some(Self::ArrowRight),
            "ArrowUp" | "Up" => Some(Self::ArrowUp),
            "ArrowDown" | "Down" => Some(Self::ArrowDown),
            "Home" => Some(Self::Home),
            "End" => Some(Self::End),
            " " | "Spacebar" => Some(Self::Space),
            "Enter" => Some(Self::Enter),
            _ => None,
        }
    }

    pub fn is_activation(self) -> bool {
        matches!(self, Self::Space | Self::Enter)
    }
}

/// Index of the next item after `from` (or before it, when `forward` is false)
/// that satisfies `enabled`, wrapping around. `from == None` starts outside the
/// list so the first step lands on the first or last item.
pub fn step_enabled<T>(
    items: &[T],
    from: Option<usize>,
    forward: bool,
    enabled: impl Fn(&T) -> bool,
) -> Option<usize> {
    let len = items.len();
    if len == 0 {
        return None;
    }
    let mut index = match (from, forward) {
        (Some(i), _) => i,
        (None, true) => len - 1,
        (None, false) => 0,
    };
    for _ in 0..len {
        index = if forward {
            (index + 1) % len
        } else {
            (index + len - 1) % len
        };
        if enabled(&items[index]) {
            return Some(index);
        }
    }
    None
}

/// First (or last) item satisfying `enabled`.
pub fn edge_enabled<T>(items: &[T], first: bool, enabled: impl Fn(&T) -> bool) -> Option<usize> {
    if first {
        items.iter().position(|item| enabled(item))
    } else {
        items.iter().rposition(|item| enabled(item))
    }
}

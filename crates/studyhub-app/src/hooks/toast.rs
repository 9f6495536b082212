//! Transient notifications.

use std::fmt::Display;
use std::time::Duration;

use dioxus::prelude::*;

/// How long a toast stays on screen.
const TOAST_DURATION: Duration = Duration::from_secs(4);
/// Oldest toasts are dropped beyond this many.
const MAX_TOASTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    pub fn class(&self) -> &'static str {
        match self {
            ToastKind::Success => "toast success",
            ToastKind::Error => "toast error",
            ToastKind::Info => "toast info",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub title: String,
    pub description: Option<String>,
}

/// Visible toasts, newest last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToastQueue {
    items: Vec<Toast>,
    next_id: u64,
}

impl ToastQueue {
    pub fn push(&mut self, kind: ToastKind, title: String, description: Option<String>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.items.push(Toast {
            id,
            kind,
            title,
            description,
        });
        if self.items.len() > MAX_TOASTS {
            let excess = self.items.len() - MAX_TOASTS;
            self.items.drain(..excess);
        }
        id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.items.retain(|t| t.id != id);
    }

    pub fn items(&self) -> &[Toast] {
        &self.items
    }
}

/// Handle for raising toasts from components and hooks.
#[derive(Clone, Copy, PartialEq)]
pub struct Toaster {
    queue: Signal<ToastQueue>,
}

impl Toaster {
    pub fn new(queue: Signal<ToastQueue>) -> Self {
        Self { queue }
    }

    fn push(&self, kind: ToastKind, title: impl Into<String>, description: Option<String>) {
        let mut queue = self.queue;
        let id = queue.write().push(kind, title.into(), description);
        spawn(async move {
            tokio::time::sleep(TOAST_DURATION).await;
            queue.write().dismiss(id);
        });
    }

    pub fn success(&self, title: impl Into<String>) {
        self.push(ToastKind::Success, title, None);
    }

    pub fn info(&self, title: impl Into<String>, description: impl Into<String>) {
        self.push(ToastKind::Info, title, Some(description.into()));
    }

    /// Error toast carrying the error's message.
    pub fn error(&self, title: impl Into<String>, error: impl Display) {
        self.push(ToastKind::Error, title, Some(error.to_string()));
    }

    pub fn dismiss(&self, id: u64) {
        let mut queue = self.queue;
        queue.write().dismiss(id);
    }

    pub fn visible(&self) -> Vec<Toast> {
        self.queue.read().items().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_caps_and_dismisses() {
        let mut queue = ToastQueue::default();
        let first = queue.push(ToastKind::Info, "one".into(), None);
        for title in ["two", "three", "four"] {
            queue.push(ToastKind::Success, title.into(), None);
        }
        assert_eq!(queue.items().len(), MAX_TOASTS);
        assert!(queue.items().iter().all(|t| t.id != first));

        let last = queue.items()[2].id;
        queue.dismiss(last);
        let titles: Vec<_> = queue.items().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["two", "three"]);
    }
}

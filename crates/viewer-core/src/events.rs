//! Outward notifications and the synchronous bus that delivers them.

use serde::Serialize;

pub type SubscriptionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Everything the viewer reports to its host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewerEvent {
    DocumentLoaded { page_count: u32, page_numbers: Vec<u32> },
    PageChanged { current_page_number: u32, previous_page_number: u32 },
    Scrolled { current_page_number: u32, direction: ScrollDirection },
    ScaleChanged { previous: f32, current: f32 },
    PageRenderFailed { page_number: u32, reason: String },
    PageDeleted { page_number: u32 },
}

type Listener<E> = Box<dyn FnMut(&E)>;

/// Calls every listener, in subscription order, before `emit` returns.
pub struct EventBus<E> {
    next_id: SubscriptionId,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self { next_id: 0, listeners: Vec::new() }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        self.next_id += 1;
        self.listeners.push((self.next_id, Box::new(listener)));
        self.next_id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
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

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("listeners", &self.listeners.len()).finish()
    }
}

use super::ids::{BufferHandle, LineHandle};

/// Change notification raised after a model mutation has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelEvent {
    BufferOpened(BufferHandle),
    BufferUpdated(BufferHandle),
    BufferClosed(BufferHandle),
    BufferLinesChanged(BufferHandle),
    BufferRosterChanged(BufferHandle),
    BufferCountersChanged(BufferHandle),
    LineSegmentsChanged {
        buffer: BufferHandle,
        line: LineHandle,
    },
}

impl ModelEvent {
    pub fn buffer(&self) -> BufferHandle {
        match self {
            Self::BufferOpened(buffer)
            | Self::BufferUpdated(buffer)
            | Self::BufferClosed(buffer)
            | Self::BufferLinesChanged(buffer)
            | Self::BufferRosterChanged(buffer)
            | Self::BufferCountersChanged(buffer)
            | Self::LineSegmentsChanged { buffer, .. } => *buffer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&ModelEvent) + Send>;

/// Synchronous observer registry. Observers run in subscription order on the caller's thread.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<(SubscriptionId, Observer)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&ModelEvent) + Send + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(candidate, _)| *candidate != id);
        self.observers.len() != before
    }

    pub fn publish(&mut self, event: &ModelEvent) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }

    pub fn publish_all<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = ModelEvent>,
    {
        for event in events {
            self.publish(&event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Events queued by a buffer's own mutations until the directory publishes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Outbox {
    pending: Vec<ModelEvent>,
}

impl Outbox {
    pub fn push(&mut self, event: ModelEvent) {
        // Consecutive duplicates carry no extra information for observers.
        if self.pending.last() != Some(&event) {
            self.pending.push(event);
        }
    }

    pub fn drain(&mut self) -> Vec<ModelEvent> {
        std::mem::take(&mut self.pending)
    }
}

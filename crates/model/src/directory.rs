use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::RelayClient;
use super::buffer::{AttachOutcome, Buffer, DEFAULT_BACKFILL_STEP};
use super::hotlist::HotlistEntry;
use super::ids::{BufferHandle, LineHandle, NickHandle};
use super::line::BufferLine;
use super::notify::{EventBus, ModelEvent, SubscriptionId};
use super::types::{BufferFields, LineData, NickFields};

/// Reference to any model entity by its relay handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Buffer(BufferHandle),
    Line(LineHandle),
    Nick(NickHandle),
}

/// All buffers of one relay session plus the observers watching them.
///
/// Every inbound `on_*` entry point publishes the resulting notifications
/// before it returns. Events naming an unknown buffer are dropped.
pub struct BufferDirectory {
    buffers: HashMap<BufferHandle, Buffer>,
    hotlist: HashMap<BufferHandle, HotlistEntry>,
    bus: EventBus,
    relay: Arc<dyn RelayClient>,
    backfill_step: usize,
}

impl BufferDirectory {
    pub fn new(relay: Arc<dyn RelayClient>) -> Self {
        Self {
            buffers: HashMap::new(),
            hotlist: HashMap::new(),
            bus: EventBus::new(),
            relay,
            backfill_step: DEFAULT_BACKFILL_STEP,
        }
    }

    pub fn with_backfill_step(mut self, step: usize) -> Self {
        self.backfill_step = step.max(1);
        self
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&ModelEvent) + Send + 'static,
    {
        self.bus.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&Buffer> {
        self.buffers.get(&handle)
    }

    /// Buffers in relay numbering order, ties broken by full name.
    pub fn buffers(&self) -> Vec<&Buffer> {
        let mut buffers = self.buffers.values().collect::<Vec<_>>();
        buffers.sort_by(|left, right| {
            left.number()
                .cmp(&right.number())
                .then_with(|| left.name().cmp(right.name()))
        });
        buffers
    }

    /// Runs `mutate` against a buffer and publishes whatever it changed.
    pub fn update_buffer<R>(
        &mut self,
        handle: BufferHandle,
        mutate: impl FnOnce(&mut Buffer) -> R,
    ) -> Option<R> {
        let buffer = self.buffers.get_mut(&handle)?;
        let result = mutate(buffer);
        self.flush(handle);
        Some(result)
    }

    pub fn on_buffer_opened(&mut self, handle: BufferHandle, fields: BufferFields) {
        if self.buffers.contains_key(&handle) {
            tracing::debug!(buffer = %handle, "buffer announced twice; treating as update");
            self.on_buffer_updated(handle, fields);
            return;
        }

        let mut buffer =
            Buffer::new(handle, Arc::clone(&self.relay)).with_backfill_step(self.backfill_step);
        buffer.apply_fields(fields);
        // The opening notification supersedes the property change.
        buffer.drain_events();
        if let Some(entry) = self.hotlist.get(&handle) {
            entry.apply_to(&mut buffer);
        }
        self.buffers.insert(handle, buffer);
        tracing::debug!(buffer = %handle, "buffer opened");

        self.bus.publish(&ModelEvent::BufferOpened(handle));
        self.flush(handle);
    }

    pub fn on_buffer_updated(&mut self, handle: BufferHandle, fields: BufferFields) {
        self.with_known_buffer(handle, "buffer-updated", |buffer| {
            buffer.apply_fields(fields);
        });
    }

    pub fn on_buffer_closed(&mut self, handle: BufferHandle) {
        self.hotlist.remove(&handle);
        if self.buffers.remove(&handle).is_none() {
            tracing::debug!(buffer = %handle, "close for unknown buffer ignored");
            return;
        }
        tracing::debug!(buffer = %handle, "buffer closed");
        self.bus.publish(&ModelEvent::BufferClosed(handle));
    }

    /// Inserts a new line or updates a known one in place.
    pub fn on_line_event(&mut self, handle: BufferHandle, data: LineData) {
        self.with_known_buffer(handle, "line", |buffer| {
            if buffer.contains_line(data.line) {
                buffer.update_line(data);
            } else {
                buffer.insert_line(BufferLine::from_data(data));
            }
        });
    }

    pub fn on_nick_event(&mut self, handle: BufferHandle, nick: NickHandle, fields: NickFields) {
        self.with_known_buffer(handle, "nick", |buffer| {
            buffer.update_nick(nick, fields);
        });
    }

    pub fn on_nick_removed(&mut self, handle: BufferHandle, nick: NickHandle) {
        self.with_known_buffer(handle, "nick-removed", |buffer| {
            buffer.remove_nick(nick);
        });
    }

    pub fn on_nicklist_cleared(&mut self, handle: BufferHandle) {
        self.with_known_buffer(handle, "nicklist-cleared", Buffer::clear_nicks);
    }

    /// Records the count vector for `handle` and applies it if the buffer is open.
    ///
    /// Counts that arrive before the buffer is announced are kept and applied on open.
    pub fn on_hotlist_event(&mut self, handle: BufferHandle, counts: &[u32]) {
        let entry = self
            .hotlist
            .entry(handle)
            .or_insert_with(|| HotlistEntry::new(handle));
        if !entry.set_counts(counts) {
            return;
        }

        if let Some(buffer) = self.buffers.get_mut(&handle) {
            entry.apply_to(buffer);
            self.flush(handle);
        }
    }

    /// Hands `line` to the entity named by `target`.
    ///
    /// Only live buffers accept lines; any other target discards the line.
    pub fn attach_line(&mut self, target: EntityRef, line: BufferLine) -> AttachOutcome {
        let EntityRef::Buffer(handle) = target else {
            tracing::debug!(?target, line = %line.handle(), "discarding line attached to a non-buffer");
            return AttachOutcome::Discarded;
        };
        let Some(buffer) = self.buffers.get_mut(&handle) else {
            tracing::debug!(buffer = %handle, line = %line.handle(), "discarding line attached to unknown buffer");
            return AttachOutcome::Discarded;
        };

        let outcome = buffer.attach(line);
        self.flush(handle);
        outcome
    }

    pub fn input(&self, handle: BufferHandle, text: &str) -> bool {
        match self.buffers.get(&handle) {
            Some(buffer) => {
                buffer.input(text);
                true
            }
            None => false,
        }
    }

    /// Returns whether a backfill request went out.
    pub fn request_more_lines(&mut self, handle: BufferHandle) -> bool {
        self.update_buffer(handle, Buffer::request_more_lines)
            .unwrap_or(false)
    }

    fn with_known_buffer(
        &mut self,
        handle: BufferHandle,
        event: &'static str,
        mutate: impl FnOnce(&mut Buffer),
    ) {
        if self.update_buffer(handle, mutate).is_none() {
            tracing::debug!(buffer = %handle, event, "event for unknown buffer ignored");
        }
    }

    fn flush(&mut self, handle: BufferHandle) {
        if let Some(buffer) = self.buffers.get_mut(&handle) {
            let events = buffer.drain_events();
            self.bus.publish_all(events);
        }
    }
}

impl fmt::Debug for BufferDirectory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BufferDirectory")
            .field("buffers", &self.buffers.len())
            .field("hotlist", &self.hotlist.len())
            .field("bus", &self.bus)
            .field("backfill_step", &self.backfill_step)
            .finish_non_exhaustive()
    }
}

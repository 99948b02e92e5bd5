use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::RelayClient;
use super::ids::{BufferHandle, LineHandle, NickHandle};
use super::line::BufferLine;
use super::nick::{Nick, Roster};
use super::notify::{ModelEvent, Outbox};
use super::types::{BufferFields, LineData, NickFields};

/// How many lines past the current count each backfill request asks for.
pub const DEFAULT_BACKFILL_STEP: usize = 25;

/// Result of handing a line to a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached {
        buffer: BufferHandle,
        index: usize,
    },
    /// The line already belongs to a buffer and is returned untouched.
    Rejected(Box<BufferLine>),
    /// The target was not a live buffer; the line was dropped.
    Discarded,
}

/// Client-side state of one relay buffer.
pub struct Buffer {
    handle: BufferHandle,
    number: u32,
    name: String,
    short_name: String,
    title: String,
    local_variables: BTreeMap<String, String>,
    // Newest first; lines without a timestamp lead.
    lines: Vec<BufferLine>,
    roster: Roster,
    unread_count: u32,
    highlight_count: u32,
    last_requested_count: usize,
    after_initial_fetch: bool,
    backfill_step: usize,
    relay: Arc<dyn RelayClient>,
    outbox: Outbox,
}

impl Buffer {
    pub fn new(handle: BufferHandle, relay: Arc<dyn RelayClient>) -> Self {
        Self {
            handle,
            number: 0,
            name: String::new(),
            short_name: String::new(),
            title: String::new(),
            local_variables: BTreeMap::new(),
            lines: Vec::new(),
            roster: Roster::new(),
            unread_count: 0,
            highlight_count: 0,
            last_requested_count: 0,
            after_initial_fetch: false,
            backfill_step: DEFAULT_BACKFILL_STEP,
            relay,
            outbox: Outbox::default(),
        }
    }

    pub fn with_backfill_step(mut self, step: usize) -> Self {
        self.backfill_step = step.max(1);
        self
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Full name, e.g. `irc.libera.#rust`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn local_variables(&self) -> &BTreeMap<String, String> {
        &self.local_variables
    }

    pub fn local_variable(&self, key: &str) -> Option<&str> {
        self.local_variables.get(key).map(String::as_str)
    }

    pub fn lines(&self) -> &[BufferLine] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, handle: LineHandle) -> Option<&BufferLine> {
        self.lines.iter().find(|line| line.handle() == handle)
    }

    pub fn contains_line(&self, handle: LineHandle) -> bool {
        self.line(handle).is_some()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn unread_count(&self) -> u32 {
        self.unread_count
    }

    pub fn highlight_count(&self) -> u32 {
        self.highlight_count
    }

    pub fn last_requested_count(&self) -> usize {
        self.last_requested_count
    }

    pub fn is_after_initial_fetch(&self) -> bool {
        self.after_initial_fetch
    }

    /// Applies the properties present in `fields`. Returns whether anything changed.
    pub fn apply_fields(&mut self, fields: BufferFields) -> bool {
        let mut changed = false;
        if let Some(number) = fields.number {
            changed |= replace(&mut self.number, number);
        }
        if let Some(name) = fields.name {
            changed |= replace(&mut self.name, name);
        }
        if let Some(short_name) = fields.short_name {
            changed |= replace(&mut self.short_name, short_name);
        }
        if let Some(title) = fields.title {
            changed |= replace(&mut self.title, title);
        }
        if let Some(local_variables) = fields.local_variables {
            changed |= replace(&mut self.local_variables, local_variables);
        }

        if changed {
            self.outbox.push(ModelEvent::BufferUpdated(self.handle));
        }
        changed
    }

    /// Places an unowned `line` by timestamp and returns its index.
    ///
    /// Lines without a timestamp go to the front. Otherwise the line lands right
    /// before the first strictly older line, so equal timestamps keep arrival order.
    /// A line that already belongs to a buffer is refused and `None` is returned.
    pub fn insert_line(&mut self, line: BufferLine) -> Option<usize> {
        if let Some(owner) = line.owner() {
            self.log_owned_line(owner, &line);
            return None;
        }
        Some(self.place_line(line))
    }

    /// Takes ownership of a line that does not yet belong to any buffer.
    pub fn attach(&mut self, line: BufferLine) -> AttachOutcome {
        if let Some(owner) = line.owner() {
            self.log_owned_line(owner, &line);
            return AttachOutcome::Rejected(Box::new(line));
        }

        let index = self.place_line(line);
        AttachOutcome::Attached {
            buffer: self.handle,
            index,
        }
    }

    fn place_line(&mut self, mut line: BufferLine) -> usize {
        line.set_owner(self.handle);
        let index = match line.timestamp() {
            None => 0,
            Some(timestamp) => self.lines.partition_point(|existing| {
                existing
                    .timestamp()
                    .is_none_or(|existing_timestamp| existing_timestamp >= timestamp)
            }),
        };

        self.lines.insert(index, line);
        self.outbox.push(ModelEvent::BufferLinesChanged(self.handle));
        index
    }

    fn log_owned_line(&self, owner: BufferHandle, line: &BufferLine) {
        tracing::debug!(
            buffer = %self.handle,
            owner = %owner,
            line = %line.handle(),
            "refusing a line that already has an owner"
        );
    }

    /// Applies an in-place update to a known line. Returns false for unknown handles.
    pub fn update_line(&mut self, data: LineData) -> bool {
        let Some(line) = self.lines.iter_mut().find(|line| line.handle() == data.line) else {
            return false;
        };

        let handle = line.handle();
        let update = line.apply_update(data);
        if update.segments_changed {
            self.outbox.push(ModelEvent::LineSegmentsChanged {
                buffer: self.handle,
                line: handle,
            });
        }
        if update.any() {
            self.outbox.push(ModelEvent::BufferLinesChanged(self.handle));
        }
        true
    }

    pub fn clear_lines(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        self.lines.clear();
        self.outbox.push(ModelEvent::BufferLinesChanged(self.handle));
    }

    /// Asks the relay for older lines unless a previous request is still unmet.
    ///
    /// Returns whether a request was sent. A relay that delivers fewer lines than
    /// asked for simply gets asked again on the next call.
    pub fn request_more_lines(&mut self) -> bool {
        self.after_initial_fetch = true;
        let current_count = self.lines.len();
        if current_count < self.last_requested_count {
            tracing::trace!(
                buffer = %self.handle,
                current_count,
                last_requested_count = self.last_requested_count,
                "backfill still outstanding"
            );
            return false;
        }

        let desired_count = current_count + self.backfill_step;
        self.relay.request_lines(self.handle, desired_count);
        self.last_requested_count = desired_count;
        tracing::debug!(buffer = %self.handle, desired_count, "requested more lines");
        true
    }

    pub fn input(&self, text: &str) {
        self.relay.send_input(self.handle, text);
    }

    /// Returns the roster entry for `handle`, creating it on first reference.
    pub fn get_or_create_nick(&mut self, handle: NickHandle) -> &mut Nick {
        let (nick, created) = self.roster.get_or_create(handle);
        if created {
            self.outbox.push(ModelEvent::BufferRosterChanged(self.handle));
        }
        nick
    }

    pub fn update_nick(&mut self, handle: NickHandle, fields: NickFields) {
        let (nick, created) = self.roster.get_or_create(handle);
        let changed = nick.apply_fields(fields);
        if created || changed {
            self.outbox.push(ModelEvent::BufferRosterChanged(self.handle));
        }
    }

    pub fn remove_nick(&mut self, handle: NickHandle) -> Option<Nick> {
        let removed = self.roster.remove(handle);
        if removed.is_some() {
            self.outbox.push(ModelEvent::BufferRosterChanged(self.handle));
        }
        removed
    }

    pub fn clear_nicks(&mut self) {
        if self.roster.clear() {
            self.outbox.push(ModelEvent::BufferRosterChanged(self.handle));
        }
    }

    pub fn visible_nick_names(&self) -> Vec<String> {
        self.roster.visible_names()
    }

    /// Overwrites both counters. Returns whether either value changed.
    pub(crate) fn set_counts(&mut self, unread_count: u32, highlight_count: u32) -> bool {
        let changed = replace(&mut self.highlight_count, highlight_count)
            | replace(&mut self.unread_count, unread_count);
        if changed {
            self.outbox.push(ModelEvent::BufferCountersChanged(self.handle));
        }
        changed
    }

    /// Takes the notifications produced by mutations since the last drain.
    pub fn drain_events(&mut self) -> Vec<ModelEvent> {
        self.outbox.drain()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Buffer")
            .field("handle", &self.handle)
            .field("number", &self.number)
            .field("name", &self.name)
            .field("lines", &self.lines.len())
            .field("nicks", &self.roster.len())
            .field("unread_count", &self.unread_count)
            .field("highlight_count", &self.highlight_count)
            .field("last_requested_count", &self.last_requested_count)
            .finish_non_exhaustive()
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

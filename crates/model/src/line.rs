use chrono::{DateTime, Utc};

use super::ids::{BufferHandle, LineHandle};
use super::segment::{Segment, classify};
use super::types::LineData;

const PRIVATE_MESSAGE_TAG: &str = "irc_privmsg";

/// One chat line. The segment list is always derived from the current message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferLine {
    handle: LineHandle,
    timestamp: Option<DateTime<Utc>>,
    prefix: String,
    message: String,
    tags: Vec<String>,
    highlight: bool,
    displayed: bool,
    segments: Vec<Segment>,
    owner: Option<BufferHandle>,
}

impl BufferLine {
    pub fn new(handle: LineHandle, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            handle,
            timestamp,
            prefix: String::new(),
            message: String::new(),
            tags: Vec::new(),
            highlight: false,
            displayed: true,
            segments: Vec::new(),
            owner: None,
        }
    }

    pub fn from_data(data: LineData) -> Self {
        let mut line = Self::new(data.line, data.date);
        line.prefix = data.prefix.unwrap_or_default();
        line.tags = data.tags.unwrap_or_default();
        line.highlight = data.highlight.unwrap_or(false);
        line.displayed = data.displayed.unwrap_or(true);
        line.set_message(data.message.unwrap_or_default());
        line
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.set_message(message);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn handle(&self) -> LineHandle {
        self.handle
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn highlight(&self) -> bool {
        self.highlight
    }

    pub fn displayed(&self) -> bool {
        self.displayed
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The buffer this line was attached to, if any.
    pub fn owner(&self) -> Option<BufferHandle> {
        self.owner
    }

    pub fn is_private_message(&self) -> bool {
        self.tags.iter().any(|tag| tag == PRIVATE_MESSAGE_TAG)
    }

    /// Message text as shown once segmented: fragments joined by single spaces.
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(Segment::text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Replaces the message and rebuilds segments. Returns whether the text changed.
    pub fn set_message(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if message == self.message {
            return false;
        }

        self.segments = classify(&message);
        self.message = message;
        true
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) -> bool {
        let prefix = prefix.into();
        if prefix == self.prefix {
            return false;
        }
        self.prefix = prefix;
        true
    }

    pub fn set_tags(&mut self, tags: Vec<String>) -> bool {
        if tags == self.tags {
            return false;
        }
        self.tags = tags;
        true
    }

    pub fn set_highlight(&mut self, highlight: bool) -> bool {
        let changed = self.highlight != highlight;
        self.highlight = highlight;
        changed
    }

    pub fn set_displayed(&mut self, displayed: bool) -> bool {
        let changed = self.displayed != displayed;
        self.displayed = displayed;
        changed
    }

    /// Applies the fields present in a relay update. The timestamp is never rewritten.
    pub(crate) fn apply_update(&mut self, data: LineData) -> LineUpdate {
        let mut update = LineUpdate::default();
        if let Some(message) = data.message {
            update.segments_changed = self.set_message(message);
        }
        if let Some(prefix) = data.prefix {
            update.other_changed |= self.set_prefix(prefix);
        }
        if let Some(tags) = data.tags {
            update.other_changed |= self.set_tags(tags);
        }
        if let Some(highlight) = data.highlight {
            update.other_changed |= self.set_highlight(highlight);
        }
        if let Some(displayed) = data.displayed {
            update.other_changed |= self.set_displayed(displayed);
        }
        update
    }

    pub(crate) fn set_owner(&mut self, owner: BufferHandle) {
        self.owner = Some(owner);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LineUpdate {
    pub segments_changed: bool,
    pub other_changed: bool,
}

impl LineUpdate {
    pub fn any(self) -> bool {
        self.segments_changed || self.other_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentKind;

    #[test]
    fn segments_follow_message_changes() {
        let mut line = BufferLine::new(LineHandle::new(1), None).with_message("hello");
        assert_eq!(line.segments().len(), 1);
        assert_eq!(line.segments()[0].kind(), SegmentKind::Plain);

        assert!(line.set_message("pic https://a.com/cat.gif"));
        assert_eq!(line.segments().len(), 2);
        assert_eq!(line.segments()[1].kind(), SegmentKind::Image);

        assert!(line.set_message(""));
        assert!(line.segments().is_empty());
        assert!(!line.set_message(""));
    }

    #[test]
    fn private_message_detection_uses_tags() {
        let line = BufferLine::new(LineHandle::new(2), None)
            .with_tags(["notify_private", "irc_privmsg", "nick_alice"]);
        assert!(line.is_private_message());

        let line = BufferLine::new(LineHandle::new(3), None).with_tags(["irc_join"]);
        assert!(!line.is_private_message());
    }

    #[test]
    fn plain_text_joins_trimmed_segments() {
        let line = BufferLine::new(LineHandle::new(4), None)
            .with_message("  look  https://example.com/x.png   nice ");
        assert_eq!(line.plain_text(), "look https://example.com/x.png nice");
    }

    #[test]
    fn partial_update_touches_only_present_fields() {
        let mut line = BufferLine::new(LineHandle::new(5), None)
            .with_prefix("alice")
            .with_message("first");
        let update = line.apply_update(LineData {
            prefix: Some("bob".to_string()),
            ..LineData::new(LineHandle::new(5))
        });
        assert!(update.other_changed);
        assert!(!update.segments_changed);
        assert_eq!(line.prefix(), "bob");
        assert_eq!(line.message(), "first");
    }
}

use lith_model::{BufferDirectory, BufferFields, BufferHandle, LineData, NickFields, NickHandle};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use super::error::{DecodeEventSnafu, RelayResult};

/// One decoded relay event, as produced by the connection layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RelayEvent {
    BufferOpened {
        buffer: BufferHandle,
        #[serde(flatten)]
        fields: BufferFields,
    },
    BufferUpdated {
        buffer: BufferHandle,
        #[serde(flatten)]
        fields: BufferFields,
    },
    BufferClosed {
        buffer: BufferHandle,
    },
    Line {
        buffer: BufferHandle,
        #[serde(flatten)]
        line: LineData,
    },
    Nick {
        buffer: BufferHandle,
        nick: NickHandle,
        #[serde(flatten)]
        fields: NickFields,
    },
    NickRemoved {
        buffer: BufferHandle,
        nick: NickHandle,
    },
    NicklistCleared {
        buffer: BufferHandle,
    },
    Hotlist {
        buffer: BufferHandle,
        counts: Vec<u32>,
    },
}

impl RelayEvent {
    pub fn buffer(&self) -> BufferHandle {
        match self {
            Self::BufferOpened { buffer, .. }
            | Self::BufferUpdated { buffer, .. }
            | Self::BufferClosed { buffer }
            | Self::Line { buffer, .. }
            | Self::Nick { buffer, .. }
            | Self::NickRemoved { buffer, .. }
            | Self::NicklistCleared { buffer }
            | Self::Hotlist { buffer, .. } => *buffer,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::BufferOpened { .. } => "buffer_opened",
            Self::BufferUpdated { .. } => "buffer_updated",
            Self::BufferClosed { .. } => "buffer_closed",
            Self::Line { .. } => "line",
            Self::Nick { .. } => "nick",
            Self::NickRemoved { .. } => "nick_removed",
            Self::NicklistCleared { .. } => "nicklist_cleared",
            Self::Hotlist { .. } => "hotlist",
        }
    }

    /// Routes the event to the matching directory entry point.
    pub fn apply(self, directory: &mut BufferDirectory) {
        match self {
            Self::BufferOpened { buffer, fields } => directory.on_buffer_opened(buffer, fields),
            Self::BufferUpdated { buffer, fields } => directory.on_buffer_updated(buffer, fields),
            Self::BufferClosed { buffer } => directory.on_buffer_closed(buffer),
            Self::Line { buffer, line } => directory.on_line_event(buffer, line),
            Self::Nick {
                buffer,
                nick,
                fields,
            } => directory.on_nick_event(buffer, nick, fields),
            Self::NickRemoved { buffer, nick } => directory.on_nick_removed(buffer, nick),
            Self::NicklistCleared { buffer } => directory.on_nicklist_cleared(buffer),
            Self::Hotlist { buffer, counts } => directory.on_hotlist_event(buffer, &counts),
        }
    }
}

/// Decodes a recorded event log: one JSON object per line.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn decode_event_log(text: &str) -> RelayResult<Vec<RelayEvent>> {
    let mut events = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let event = serde_json::from_str::<RelayEvent>(trimmed).context(DecodeEventSnafu {
            stage: "decode-event-log",
            line_number: index + 1,
        })?;
        events.push(event);
    }
    Ok(events)
}

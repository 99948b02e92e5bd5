#![deny(unsafe_code)]

//! Client-side model of a relay session: buffers, their lines and nicklists,
//! hotlist counters, and the display segments derived from each line.
//!
//! Every mutating entry point is synchronous and expects to be called from the
//! single context that owns the [`BufferDirectory`].

pub mod buffer;
pub mod directory;
pub mod error;
pub mod hotlist;
pub mod ids;
pub mod line;
pub mod nick;
pub mod notify;
pub mod segment;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use buffer::{AttachOutcome, Buffer, DEFAULT_BACKFILL_STEP};
pub use directory::{BufferDirectory, EntityRef};
pub use error::{ModelError, ModelResult};
pub use hotlist::{HotlistEntry, apply_counts};
pub use ids::{BufferHandle, LineHandle, NickHandle};
pub use line::BufferLine;
pub use nick::{Nick, Roster};
pub use notify::{EventBus, ModelEvent, SubscriptionId};
pub use segment::{MAX_UNSHORTENED_LINK_LENGTH, Segment, SegmentKind, classify};
pub use types::{BufferFields, LineData, NickFields};

/// Outbound half of the relay connection as seen by the model.
///
/// Both calls are fire-and-forget: results come back later as ordinary events.
pub trait RelayClient: Send + Sync {
    fn send_input(&self, buffer: BufferHandle, text: &str);
    fn request_lines(&self, buffer: BufferHandle, desired_count: usize);
}

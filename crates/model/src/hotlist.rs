use super::buffer::Buffer;
use super::ids::BufferHandle;

const UNREAD_POSITION: usize = 1;
const HIGHLIGHT_POSITION: usize = 2;
const MIN_COUNT_POSITIONS: usize = 3;

/// Overwrites the buffer's unread and highlight counters from a relay count vector.
///
/// Vectors shorter than three entries are ignored. Returns whether the buffer changed.
pub fn apply_counts(buffer: &mut Buffer, counts: &[u32]) -> bool {
    if counts.len() < MIN_COUNT_POSITIONS {
        tracing::trace!(
            buffer = %buffer.handle(),
            positions = counts.len(),
            "ignoring short hotlist count vector"
        );
        return false;
    }

    buffer.set_counts(counts[UNREAD_POSITION], counts[HIGHLIGHT_POSITION])
}

/// One hotlist relation: the buffer it points at and the last count vector seen.
///
/// The directory keys entries by buffer handle, so the relation is fixed for the
/// entry's lifetime and only a counts change calls for re-applying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotlistEntry {
    buffer: BufferHandle,
    counts: Vec<u32>,
}

impl HotlistEntry {
    pub fn new(buffer: BufferHandle) -> Self {
        Self {
            buffer,
            counts: Vec::new(),
        }
    }

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Returns true when the stored counts changed and need re-applying.
    pub fn set_counts(&mut self, counts: &[u32]) -> bool {
        if self.counts == counts {
            return false;
        }
        self.counts = counts.to_vec();
        true
    }

    /// Pushes the stored counts into `buffer` if this entry relates to it.
    pub fn apply_to(&self, buffer: &mut Buffer) -> bool {
        if self.buffer != buffer.handle() {
            return false;
        }
        apply_counts(buffer, &self.counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ModelEvent;
    use crate::testing::RecordingRelay;

    fn buffer() -> Buffer {
        Buffer::new(BufferHandle::new(0xa), RecordingRelay::shared())
    }

    #[test]
    fn counts_overwrite_rather_than_accumulate() {
        let mut buffer = buffer();
        assert!(apply_counts(&mut buffer, &[0, 4, 1]));
        assert_eq!((buffer.unread_count(), buffer.highlight_count()), (4, 1));

        assert!(apply_counts(&mut buffer, &[0, 0, 0]));
        assert_eq!((buffer.unread_count(), buffer.highlight_count()), (0, 0));
    }

    #[test]
    fn short_vectors_are_ignored() {
        let mut buffer = buffer();
        apply_counts(&mut buffer, &[2, 7, 3, 9]);
        buffer.drain_events();

        assert!(!apply_counts(&mut buffer, &[1, 1]));
        assert!(!apply_counts(&mut buffer, &[]));
        assert_eq!((buffer.unread_count(), buffer.highlight_count()), (7, 3));
        assert!(buffer.drain_events().is_empty());
    }

    #[test]
    fn counters_notify_only_on_change() {
        let mut buffer = buffer();
        apply_counts(&mut buffer, &[0, 2, 0]);
        apply_counts(&mut buffer, &[5, 2, 0]);
        assert_eq!(
            buffer.drain_events(),
            vec![ModelEvent::BufferCountersChanged(buffer.handle())]
        );
    }

    #[test]
    fn entry_applies_only_to_its_own_buffer() {
        let mut buffer = buffer();
        let mut other = HotlistEntry::new(BufferHandle::new(0xb));
        assert!(other.set_counts(&[0, 3, 1]));
        assert!(!other.set_counts(&[0, 3, 1]));
        assert!(!other.apply_to(&mut buffer));
        assert_eq!(buffer.unread_count(), 0);

        let mut own = HotlistEntry::new(buffer.handle());
        own.set_counts(&[0, 3, 1]);
        assert!(own.apply_to(&mut buffer));
        assert_eq!(buffer.unread_count(), 3);
        assert_eq!(buffer.highlight_count(), 1);
    }
}

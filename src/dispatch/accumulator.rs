use tracing::debug;

use crate::dispatch::entry::LogEntry;

/// Outcome of offering an entry to the accumulator. The dispatch task
/// decides when to flush based on this; the accumulator never talks to
/// the sink itself.
#[derive(Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// Entry was appended and the batch still has room.
    Added,
    /// Entry was appended and the batch is now exactly full, either on
    /// the byte boundary or the entry count. Flush the containing batch.
    AddedNowFull,
    /// Appending would exceed the byte or count cap. The entry is handed
    /// back; flush the existing batch, then re-append it.
    WouldOverflow(LogEntry),
    /// The entry alone exceeds the batch byte cap and can never be
    /// shipped. Handed back for diagnostics, then dropped.
    TooLarge(LogEntry),
}

/// Owns the in-memory buffer of pending entries and the running byte
/// counter. Mutated only by the dispatch task.
pub struct Accumulator {
    entries: Vec<LogEntry>,
    size_bytes: usize,
    max_entries: usize,
    max_size_bytes: usize,
}

impl Accumulator {
    #[must_use]
    pub fn new(max_entries: usize, max_size_bytes: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_entries),
            size_bytes: 0,
            max_entries,
            max_size_bytes,
        }
    }

    /// Offer an entry to the current batch, enforcing the byte and count
    /// caps. An entry that exactly fills the remaining space is packed
    /// into the batch being flushed; an entry that would overflow is
    /// deferred to the next batch.
    pub fn try_add(&mut self, entry: LogEntry) -> AddOutcome {
        let entry_size = entry.encoded_size();
        if entry_size > self.max_size_bytes {
            return AddOutcome::TooLarge(entry);
        }

        let over_size_limit = self.size_bytes + entry_size > self.max_size_bytes;
        let at_entry_limit = self.entries.len() >= self.max_entries;
        if over_size_limit || at_entry_limit {
            return AddOutcome::WouldOverflow(entry);
        }

        self.push(entry, entry_size);
        if self.size_bytes == self.max_size_bytes || self.entries.len() == self.max_entries {
            AddOutcome::AddedNowFull
        } else {
            AddOutcome::Added
        }
    }

    /// Append without cap checks. Used after a flush was triggered for an
    /// overflowing entry: the entry must be buffered exactly once even if
    /// that flush failed and left the batch behind, so the buffer may sit
    /// over its caps until a later flush succeeds.
    pub fn push_unchecked(&mut self, entry: LogEntry) {
        let entry_size = entry.encoded_size();
        if self.size_bytes + entry_size > self.max_size_bytes {
            debug!("buffer temporarily over byte cap after failed flush");
        }
        self.push(entry, entry_size);
    }

    fn push(&mut self, entry: LogEntry, entry_size: usize) {
        self.entries.push(entry);
        self.size_bytes += entry_size;
    }

    /// Reset the buffer after a confirmed successful flush. Capacity is
    /// retained, the buffer is not reallocated.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.size_bytes = 0;
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

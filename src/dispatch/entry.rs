use bytes::Bytes;
use chrono::Utc;

use crate::dispatch::constants;

/// A single buffered log message. Immutable once built; ownership moves
/// from the producer to the dispatch task on enqueue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    message: Bytes,
    timestamp_millis: i64,
}

impl LogEntry {
    /// Build an entry stamped with the current UTC wall-clock time.
    #[must_use]
    pub fn new(message: impl Into<Bytes>) -> Self {
        Self {
            message: message.into(),
            timestamp_millis: Utc::now().timestamp_millis(),
        }
    }

    /// Build an entry with an explicit timestamp, in UTC milliseconds.
    #[must_use]
    pub fn with_timestamp(message: impl Into<Bytes>, timestamp_millis: i64) -> Self {
        Self {
            message: message.into(),
            timestamp_millis,
        }
    }

    #[must_use]
    pub fn message(&self) -> &Bytes {
        &self.message
    }

    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    /// Size charged against the batch byte cap.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        self.message.len() * constants::BYTES_PER_ENCODED_CHAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_size_charges_four_bytes_per_char() {
        let entry = LogEntry::with_timestamp("test", 0);
        assert_eq!(entry.encoded_size(), 16);
    }

    #[test]
    fn new_stamps_current_time() {
        let before = Utc::now().timestamp_millis();
        let entry = LogEntry::new("hello");
        let after = Utc::now().timestamp_millis();
        assert!(entry.timestamp_millis() >= before);
        assert!(entry.timestamp_millis() <= after);
    }

    #[test]
    fn empty_message_has_zero_size() {
        let entry = LogEntry::with_timestamp("", 0);
        assert_eq!(entry.encoded_size(), 0);
    }
}

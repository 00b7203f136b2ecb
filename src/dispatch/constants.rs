/// Maximum number of entries the sink accepts in a single batch.
pub const MAX_ENTRIES_PER_BATCH: usize = 10_000;

/// Maximum batch payload size in bytes accepted by the sink.
pub const MAX_BATCH_SIZE_BYTES: usize = 1_048_576;

/// A batch may not span more than 24 hours, so the flush timer must
/// fire strictly more often than that.
pub const MAX_FLUSH_INTERVAL_MS: u64 = 24 * 60 * 60 * 1_000;

/// Conservative per-character size accounting used against the batch
/// byte cap. Each message byte is charged as a full 4-byte character.
pub const BYTES_PER_ENCODED_CHAR: usize = 4;

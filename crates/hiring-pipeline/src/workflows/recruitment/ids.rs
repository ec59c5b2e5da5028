use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

/// Source of globally unique, roughly time-ordered identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> u64;
}

const NODE_ID_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;

pub const MAX_NODE_ID: u16 = (1 << NODE_ID_BITS) - 1;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

/// 2026-01-01T00:00:00Z in unix milliseconds.
pub const SNOWFLAKE_EPOCH_MS: i64 = 1_767_225_600_000;

#[derive(Debug, thiserror::Error)]
#[error("snowflake node id {0} exceeds {MAX_NODE_ID}")]
pub struct InvalidNodeId(pub u16);

#[derive(Debug, Default)]
struct SnowflakeState {
    last_ms: u64,
    sequence: u64,
}

/// `| 1 unused | 41 bits ms since epoch | 10 bits node | 12 bits sequence |`
#[derive(Debug)]
pub struct SnowflakeGenerator {
    node_id: u64,
    state: Mutex<SnowflakeState>,
}

impl SnowflakeGenerator {
    pub fn new(node_id: u16) -> Result<Self, InvalidNodeId> {
        if node_id > MAX_NODE_ID {
            return Err(InvalidNodeId(node_id));
        }

        Ok(Self {
            node_id: u64::from(node_id),
            state: Mutex::new(SnowflakeState::default()),
        })
    }

    /// Wall-clock instant encoded in `id`.
    pub fn timestamp_of(id: u64) -> Option<DateTime<Utc>> {
        let offset = (id >> (NODE_ID_BITS + SEQUENCE_BITS)) as i64;
        DateTime::from_timestamp_millis(SNOWFLAKE_EPOCH_MS + offset)
    }

    fn elapsed_ms() -> u64 {
        let now = Utc::now().timestamp_millis();
        now.saturating_sub(SNOWFLAKE_EPOCH_MS).max(0) as u64
    }

    fn compose(&self, ms: u64, sequence: u64) -> u64 {
        (ms << (NODE_ID_BITS + SEQUENCE_BITS)) | (self.node_id << SEQUENCE_BITS) | sequence
    }
}

impl IdGenerator for SnowflakeGenerator {
    fn next_id(&self) -> u64 {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        // A clock that steps backwards keeps issuing from the last observed millisecond.
        let mut now = Self::elapsed_ms().max(state.last_ms);

        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                // Sequence exhausted: borrow the next millisecond rather than wait for the clock.
                now = state.last_ms + 1;
            }
        } else {
            state.sequence = 0;
        }

        state.last_ms = now;
        self.compose(now, state.sequence)
    }
}

/// Deterministic counter for tests and demos.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of unique, time-ordered numeric match id suffixes
///
/// Implementations are shared by all concurrent runs of the process.
pub trait IdAllocator: Send + Sync {
    fn next_id(&self) -> i64;
}

/// Snowflake-style allocator
///
/// Layout (high to low): 41 bits of milliseconds since [`SnowflakeIds::EPOCH_MS`],
/// 10 bits of node id, 12 bits of per-millisecond sequence. Distinct nodes
/// never collide; within a node ids strictly increase.
#[derive(Debug)]
pub struct SnowflakeIds {
    node: i64,
    state: Mutex<SnowflakeState>,
}

#[derive(Debug, Default)]
struct SnowflakeState {
    last_ms: i64,
    sequence: i64,
}

impl SnowflakeState {
    /// Claim the next (millisecond, sequence) slot given the wall clock
    ///
    /// A clock that steps backwards keeps using the last timestamp. When a
    /// millisecond's sequence is exhausted the timestamp moves one logical
    /// millisecond ahead instead of waiting for the wall clock to catch up.
    fn advance(&mut self, now: i64) -> (i64, i64) {
        if now > self.last_ms {
            self.last_ms = now;
            self.sequence = 0;
        } else {
            self.sequence = (self.sequence + 1) & SnowflakeIds::SEQUENCE_MASK;
            if self.sequence == 0 {
                self.last_ms += 1;
            }
        }
        (self.last_ms, self.sequence)
    }
}

impl SnowflakeIds {
    /// 2010-11-04T01:42:54.657Z
    pub const EPOCH_MS: i64 = 1_288_834_974_657;
    pub const NODE_BITS: u32 = 10;
    pub const SEQUENCE_BITS: u32 = 12;
    pub const MAX_NODE: u16 = (1 << Self::NODE_BITS) - 1;
    const SEQUENCE_MASK: i64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Returns `None` if `node` does not fit in 10 bits
    pub fn new(node: u16) -> Option<Self> {
        if node > Self::MAX_NODE {
            return None;
        }
        Some(Self {
            node: node as i64,
            state: Mutex::new(SnowflakeState::default()),
        })
    }

    pub fn node(&self) -> u16 {
        self.node as u16
    }

    /// Split an id back into (milliseconds since epoch, node, sequence)
    pub fn decompose(id: i64) -> (i64, u16, u16) {
        let sequence = id & Self::SEQUENCE_MASK;
        let node = (id >> Self::SEQUENCE_BITS) & Self::MAX_NODE as i64;
        let millis = id >> (Self::NODE_BITS + Self::SEQUENCE_BITS);
        (millis, node as u16, sequence as u16)
    }

    fn now_ms() -> i64 {
        let since_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        (since_unix - Self::EPOCH_MS).max(0)
    }
}

impl IdAllocator for SnowflakeIds {
    fn next_id(&self) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (now, sequence) = state.advance(Self::now_ms());

        (now << (Self::NODE_BITS + Self::SEQUENCE_BITS))
            | (self.node << Self::SEQUENCE_BITS)
            | sequence
    }
}

/// Deterministic counter for tests and replays
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicI64,
}

impl SequentialIds {
    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }
}

impl IdAllocator for SequentialIds {
    fn next_id(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

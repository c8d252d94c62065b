//! Identifier and timestamp sources, injected so output can be made deterministic.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const HEX: &[u8] = b"0123456789abcdef";

const NODE_ID_LEN: usize = 26;
const INSTANCE_ID_LEN: usize = 40;

pub trait IdSource: Send + Sync {
    /// Identifier for a node that arrived without one.
    fn node_id(&self) -> String;
    /// Identifier for `meta.instanceId`.
    fn instance_id(&self) -> String;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// `now()` rendered the way the workflow engine stamps captures.
    fn timestamp(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl RandomIds {
    fn draw(alphabet: &[u8], len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
            .collect()
    }
}

impl IdSource for RandomIds {
    fn node_id(&self) -> String {
        Self::draw(BASE36, NODE_ID_LEN)
    }

    fn instance_id(&self) -> String {
        Self::draw(HEX, INSTANCE_ID_LEN)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Counter-backed ids: `node-1`, `node-2`, ... and `instance-1`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl IdSource for SequentialIds {
    fn node_id(&self) -> String {
        format!("node-{}", self.bump())
    }

    fn instance_id(&self) -> String {
        format!("instance-{}", self.bump())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

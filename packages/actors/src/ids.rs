//! Human-readable job id generation.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use pipeline_core::JobId;
use ulid::Ulid;

/// Produces unique, human-readable job ids.
pub trait IdGenerator: Send + Sync + 'static {
    fn next_id(&self) -> JobId;
}

const ADJECTIVES: &[&str] = &[
    "amber", "brave", "calm", "clever", "crisp", "daring", "eager", "fancy", "gentle", "golden",
    "happy", "hidden", "jolly", "keen", "lively", "lucky", "mellow", "misty", "noble", "odd",
    "patient", "proud", "quiet", "rapid", "rusty", "shy", "silent", "silver", "swift", "tidy",
    "vivid", "witty",
];

const NOUNS: &[&str] = &[
    "badger", "beacon", "canyon", "cedar", "comet", "crane", "falcon", "fern", "fox", "glacier",
    "harbor", "heron", "island", "lantern", "lynx", "maple", "meadow", "otter", "owl", "pebble",
    "pine", "raven", "river", "sparrow", "spruce", "summit", "thistle", "tiger", "valley", "walrus",
    "willow", "wren",
];

/// `adjective-noun` ids, unique for the life of the generator.
///
/// Once a pair has been handed out it gets a numeric suffix
/// (`quiet-otter-2`), so the space never runs dry.
#[derive(Debug, Default)]
pub struct TwoWordIdGenerator {
    issued: Mutex<HashSet<String>>,
}

impl TwoWordIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn candidate() -> String {
        let bits = Ulid::new().random();
        let adjective = ADJECTIVES[(bits % ADJECTIVES.len() as u128) as usize];
        let noun = NOUNS[((bits >> 32) % NOUNS.len() as u128) as usize];
        format!("{adjective}-{noun}")
    }
}

impl IdGenerator for TwoWordIdGenerator {
    fn next_id(&self) -> JobId {
        let base = Self::candidate();
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);

        let mut id = base.clone();
        let mut suffix = 2u64;
        while issued.contains(&id) {
            id = format!("{base}-{suffix}");
            suffix += 1;
        }
        issued.insert(id.clone());
        JobId::new(id)
    }
}

use std::{
    collections::HashSet,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use dashmap::{mapref::entry::Entry, DashMap};
use tokio::time::Instant;
use tracing::debug;

use crate::bot::{chat_event::chat_event::Snowflake, state::def::CooldownSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownCheck {
    Allowed,
    /// Time left until the window after the last allowed call closes.
    Limited(Duration),
}

#[derive(Debug, Clone, Copy)]
struct CooldownRecord {
    last_invocation: Instant,
    window: Duration,
    count: u32,
}

impl CooldownRecord {
    fn expires_at(&self) -> Instant {
        self.last_invocation + self.window
    }
}

// Expired records are swept once every this many checks.
const PRUNE_EVERY: u64 = 256;

/// Invocation ledger keyed by (command id, invoker). A window runs from the
/// last allowed invocation; once it has passed the count starts over.
pub struct CooldownTracker {
    ledger: DashMap<(String, Snowflake), CooldownRecord>,
    bypass: HashSet<Snowflake>,
    checks: AtomicU64,
}

impl CooldownTracker {
    pub fn new(bypass: impl IntoIterator<Item = Snowflake>) -> Self {
        CooldownTracker { ledger: DashMap::new(), bypass: bypass.into_iter().collect(), checks: AtomicU64::new(0) }
    }

    pub fn check(&self, command_id: &str, invoker: Snowflake, spec: &CooldownSpec) -> CooldownCheck {
        self.check_at(command_id, invoker, spec, Instant::now())
    }

    pub fn check_at(&self, command_id: &str, invoker: Snowflake, spec: &CooldownSpec, now: Instant) -> CooldownCheck {
        if self.bypass.contains(&invoker) {
            return CooldownCheck::Allowed;
        }
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune_at(now);
        }

        let fresh = CooldownRecord { last_invocation: now, window: spec.window(), count: 1 };
        let mut record = match self.ledger.entry((command_id.to_owned(), invoker)) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                return CooldownCheck::Allowed;
            }
            Entry::Occupied(slot) => slot.into_ref(),
        };

        if now > record.expires_at() {
            *record = fresh;
            return CooldownCheck::Allowed;
        }

        record.count += 1;
        if record.count <= spec.max_uses {
            record.last_invocation = now;
            CooldownCheck::Allowed
        } else {
            let remaining = record.expires_at().saturating_duration_since(now);
            debug!("{} is on cooldown for {} ({}ms left)", command_id, invoker, remaining.as_millis());
            CooldownCheck::Limited(remaining)
        }
    }

    /// Drops records whose window has passed.
    pub fn prune_at(&self, now: Instant) {
        self.ledger.retain(|_, record| now <= record.expires_at());
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }
}

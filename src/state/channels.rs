//! Channel membership and NAMES collection.
//!
//! A collector accumulates `353` entries for one channel until the matching
//! `366`. Each collector records who owns it: an explicit `join`/`names`
//! request finalizes its own collector, while the passive `366` handler only
//! finalizes collectors opened implicitly by a server-initiated JOIN. The
//! owner lives on the collector itself, so exactly one path can finish it.

use std::collections::{HashMap, HashSet};

use crate::chan::{parse_names_reply, NamesEntry};

/// Who finalizes a [`NamesCollector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectorOwner {
    /// Opened by a JOIN we did not request; finished by the passive `366` path.
    Implicit,
    /// Opened by an in-flight `join`/`names` request, which finishes it.
    Explicit,
}

/// Names gathered between a request (or JOIN) and `366 RPL_ENDOFNAMES`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamesCollector {
    pub owner: CollectorOwner,
    pub entries: Vec<NamesEntry>,
}

impl NamesCollector {
    fn new(owner: CollectorOwner) -> Self {
        NamesCollector {
            owner,
            entries: Vec::new(),
        }
    }
}

/// Per-channel tables: open collectors, joined channels and the names
/// captured at join time.
#[derive(Clone, Debug, Default)]
pub struct ChannelTable {
    collectors: HashMap<String, NamesCollector>,
    joined: HashSet<String>,
    join_names: HashMap<String, Vec<NamesEntry>>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_joined(&self, channel: &str) -> bool {
        self.joined.contains(channel)
    }

    /// Joined channels, sorted.
    pub fn joined_channels(&self) -> Vec<String> {
        let mut channels: Vec<_> = self.joined.iter().cloned().collect();
        channels.sort();
        channels
    }

    pub fn collector(&self, channel: &str) -> Option<&NamesCollector> {
        self.collectors.get(channel)
    }

    /// Open an explicitly owned collector, replacing any existing one.
    ///
    /// Called before the request goes out so that names arriving ahead of
    /// the JOIN echo are not lost.
    pub fn begin_explicit(&mut self, channel: &str) {
        self.collectors
            .insert(channel.to_string(), NamesCollector::new(CollectorOwner::Explicit));
    }

    /// Our own JOIN was seen. Opens an implicit collector unless one exists.
    pub fn on_self_join(&mut self, channel: &str) {
        if channel.is_empty() {
            return;
        }
        self.collectors
            .entry(channel.to_string())
            .or_insert_with(|| NamesCollector::new(CollectorOwner::Implicit));
    }

    /// `353`: append entries when a collector is open for `channel`.
    pub fn on_names_reply(&mut self, channel: &str, list: &str) {
        if let Some(collector) = self.collectors.get_mut(channel) {
            collector.entries.extend(parse_names_reply(list));
        }
    }

    /// `366` seen by the passive tracker.
    ///
    /// Finalizes an implicit collector into joined membership and returns
    /// `true`; explicit collectors are left for their owner.
    pub fn on_end_of_names(&mut self, channel: &str) -> bool {
        match self.collectors.get(channel) {
            Some(collector) if collector.owner == CollectorOwner::Implicit => {}
            _ => return false,
        }
        let entries = self
            .collectors
            .remove(channel)
            .map(|c| c.entries)
            .unwrap_or_default();
        self.join_names.insert(channel.to_string(), entries);
        self.joined.insert(channel.to_string());
        true
    }

    /// Complete an explicit join: store the collected names for
    /// [`take_join_names`](Self::take_join_names) and mark the channel joined.
    pub fn finish_join(&mut self, channel: &str) -> usize {
        let entries = self
            .collectors
            .remove(channel)
            .map(|c| c.entries)
            .unwrap_or_default();
        let count = entries.len();
        self.join_names.insert(channel.to_string(), entries);
        self.joined.insert(channel.to_string());
        count
    }

    /// Complete an explicit NAMES refresh and hand back what was collected.
    pub fn finish_names(&mut self, channel: &str) -> Vec<NamesEntry> {
        self.collectors
            .remove(channel)
            .map(|c| c.entries)
            .unwrap_or_default()
    }

    /// Drop an explicit collector whose request failed.
    pub fn abandon(&mut self, channel: &str) {
        if let Some(collector) = self.collectors.get(channel) {
            if collector.owner == CollectorOwner::Explicit {
                self.collectors.remove(channel);
            }
        }
    }

    /// We left `channel` (PART or KICK).
    pub fn on_self_part(&mut self, channel: &str) {
        self.joined.remove(channel);
        self.join_names.remove(channel);
    }

    /// One-shot read of the names collected by the most recent join.
    pub fn take_join_names(&mut self, channel: &str) -> Vec<NamesEntry> {
        self.join_names.remove(channel).unwrap_or_default()
    }

    /// Forget everything; used when the connection is re-established.
    pub fn clear(&mut self) {
        self.collectors.clear();
        self.joined.clear();
        self.join_names.clear();
    }
}

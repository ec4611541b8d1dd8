//! `chathistory` batch collection.
//!
//! A batch is opened by `BATCH +ref chathistory <channel>` and closed by
//! `BATCH -ref`. Messages tagged `batch=ref` in between belong to the replay
//! and are collected here instead of being delivered live.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::message::ParsedLine;
use crate::state::{HistoryMessage, MessageEvent};

/// Batch type collected by [`BatchTable`].
pub const CHATHISTORY_BATCH: &str = "chathistory";

/// An open `chathistory` batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveBatch {
    /// Channel named in the opening line.
    pub channel: String,
    pub messages: Vec<HistoryMessage>,
}

/// Open batches keyed by reference id.
#[derive(Clone, Debug, Default)]
pub struct BatchTable {
    batches: HashMap<String, ActiveBatch>,
}

/// The reference of a `BATCH -ref` line.
pub fn closing_ref(line: &ParsedLine) -> Option<&str> {
    if !line.is("BATCH") {
        return None;
    }
    line.param(0).strip_prefix('-')
}

impl BatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a `BATCH +ref <type> <channel>` line. Batches of any other
    /// type are ignored.
    pub fn open(&mut self, line: &ParsedLine) {
        let Some(reference) = line.param(0).strip_prefix('+') else {
            return;
        };
        if line.param(1) != CHATHISTORY_BATCH {
            return;
        }
        self.batches.insert(
            reference.to_string(),
            ActiveBatch {
                channel: line.param(2).to_string(),
                messages: Vec::new(),
            },
        );
    }

    /// Divert a batched `PRIVMSG`/`TAGMSG` into its batch.
    ///
    /// Returns `true` when the line was absorbed and must not be delivered
    /// as live traffic.
    pub fn absorb(&mut self, line: &ParsedLine, received: DateTime<Utc>) -> bool {
        if !MessageEvent::is_message(line) {
            return false;
        }
        let Some(batch) = line
            .tag("batch")
            .and_then(|reference| self.batches.get_mut(reference))
        else {
            return false;
        };
        batch.messages.push(MessageEvent::from_line(line, received));
        true
    }

    /// Channel of the open batch that `line` closes, if any.
    pub fn closing_channel(&self, line: &ParsedLine) -> Option<&str> {
        let reference = closing_ref(line)?;
        self.batches.get(reference).map(|b| b.channel.as_str())
    }

    /// Remove and return a batch.
    pub fn close(&mut self, reference: &str) -> Option<ActiveBatch> {
        self.batches.remove(reference)
    }

    /// Number of open batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

//! Channel membership, NAMES and chat history.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::Client;
use crate::chan::{normalize_channel, NamesEntry};
use crate::ircv3::batch::closing_ref;
use crate::ircv3::format_server_time;
use crate::message::build_command;
use crate::state::HistoryMessage;

/// Where a `CHATHISTORY LATEST` request starts from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HistoryCursor {
    /// The newest messages (`*`).
    #[default]
    Latest,
    /// Messages newer than the given `msgid`.
    MsgId(String),
    /// Messages newer than a point in time.
    Timestamp(DateTime<Utc>),
}

impl std::fmt::Display for HistoryCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryCursor::Latest => f.write_str("*"),
            HistoryCursor::MsgId(id) => write!(f, "msgid={}", id),
            HistoryCursor::Timestamp(time) => write!(f, "timestamp={}", format_server_time(*time)),
        }
    }
}

impl Client {
    /// Join `channel` (a missing `#` is added).
    ///
    /// Resolves `true` once the server echoed our JOIN and finished the
    /// member list, or immediately when already joined. Resolves `false`
    /// when the JOIN is not echoed in time. A NAMES list that never ends
    /// does not fail the join.
    pub async fn join_channel(&self, channel: &str) -> bool {
        let Some(channel) = normalize_channel(channel) else {
            return false;
        };

        let (joined, names_done) = {
            let mut state = self.lock();
            if state.session.channels().is_joined(&channel) {
                return true;
            }
            state.session.channels_mut().begin_explicit(&channel);

            let target = channel.clone();
            let joined = state.waiters.register(self.timeouts().join, move |line, session| {
                if !line.is("JOIN") || !session.is_me(line.nickname()) {
                    return None;
                }
                let echoed = match line.trailing.as_str() {
                    "" => line.param(0),
                    name => name,
                };
                (echoed == target).then_some(())
            });
            let target = channel.clone();
            let names_done = state.waiters.register(self.timeouts().names, move |line, _| {
                (line.is("366") && line.param(1) == target).then_some(())
            });

            if let Err(err) = state.send(&build_command("JOIN", &[&channel], None)) {
                debug!(%channel, error = %err, "JOIN not sent");
                state.waiters.remove(joined.id());
                state.waiters.remove(names_done.id());
                state.session.channels_mut().abandon(&channel);
                return false;
            }
            (self.waiting(joined), self.waiting(names_done))
        };

        if let Err(err) = joined.wait().await {
            debug!(%channel, error = %err, "JOIN not confirmed");
            self.lock().session.channels_mut().abandon(&channel);
            return false;
        }
        if let Err(err) = names_done.wait().await {
            debug!(%channel, error = %err, "member list incomplete");
        }

        let members = self.lock().session.channels_mut().finish_join(&channel);
        debug!(%channel, members, "joined");
        true
    }

    /// Create `channel` by joining it.
    pub async fn create_channel(&self, channel: &str) -> bool {
        self.join_channel(channel).await
    }

    /// Take the member list collected while joining `channel`.
    ///
    /// A second call returns an empty list.
    pub fn get_join_names(&self, channel: &str) -> Vec<NamesEntry> {
        let Some(channel) = normalize_channel(channel) else {
            return Vec::new();
        };
        self.lock().session.channels_mut().take_join_names(&channel)
    }

    /// Ask for the current member list of `channel`.
    ///
    /// Returns an empty list on timeout.
    pub async fn request_names(&self, channel: &str) -> Vec<NamesEntry> {
        let Some(channel) = normalize_channel(channel) else {
            return Vec::new();
        };

        let done = {
            let mut state = self.lock();
            state.session.channels_mut().begin_explicit(&channel);
            let target = channel.clone();
            let done = state.waiters.register(self.timeouts().names, move |line, _| {
                (line.is("366") && line.param(1) == target).then_some(())
            });
            if let Err(err) = state.send(&build_command("NAMES", &[&channel], None)) {
                debug!(%channel, error = %err, "NAMES not sent");
                state.waiters.remove(done.id());
                state.session.channels_mut().abandon(&channel);
                return Vec::new();
            }
            self.waiting(done)
        };

        match done.wait().await {
            Ok(()) => self.lock().session.channels_mut().finish_names(&channel),
            Err(err) => {
                debug!(%channel, error = %err, "NAMES not answered");
                self.lock().session.channels_mut().abandon(&channel);
                Vec::new()
            }
        }
    }

    /// Fetch up to `limit` recent messages of `channel` through
    /// `CHATHISTORY LATEST`.
    ///
    /// Returns an empty list without sending anything unless both `batch`
    /// and `draft/chathistory` were acknowledged, and on timeout.
    pub async fn request_history(
        &self,
        channel: &str,
        limit: usize,
        cursor: HistoryCursor,
    ) -> Vec<HistoryMessage> {
        let Some(channel) = normalize_channel(channel) else {
            return Vec::new();
        };
        if !self.has_capability("batch") || !self.has_capability("draft/chathistory") {
            debug!(%channel, "chathistory not negotiated");
            return Vec::new();
        }

        let target = channel.clone();
        let request = build_command(
            "CHATHISTORY",
            &["LATEST".to_string(), channel.clone(), cursor.to_string(), limit.to_string()],
            None,
        );
        let waiting = self.request(&request, self.timeouts().history, move |line, session| {
            let reference = closing_ref(line)?;
            if session.batches().closing_channel(line) != Some(target.as_str()) {
                return None;
            }
            session
                .batches_mut()
                .close(reference)
                .map(|batch| batch.messages)
        });

        match waiting {
            Some(waiting) => waiting.wait().await.unwrap_or_else(|err| {
                debug!(%channel, error = %err, "history not received");
                Vec::new()
            }),
            None => Vec::new(),
        }
    }
}

//! Sending, replying, reacting and redaction.

use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::debug;

use super::{Client, Subscription};
use crate::casemap::irc_eq;
use crate::chan::normalize_channel;
use crate::error::{Refusal, Reply, WaitError};
use crate::message::{build_command, build_tag_string, with_tags};
use crate::state::MessageEvent;

type MessagePredicate = Box<dyn FnMut(&MessageEvent) -> bool + Send>;

/// A pending wait for a message event, usually the echo of our own line.
///
/// The subscription is taken when the wait is created, so a message sent
/// afterwards is never missed.
#[must_use = "dropping a message wait cancels it"]
pub struct MessageWait {
    subscription: Subscription<MessageEvent>,
    channel: String,
    predicate: MessagePredicate,
    deadline: Instant,
    timeout: Duration,
}

impl MessageWait {
    /// First event on the channel accepted by the predicate.
    pub async fn wait(mut self) -> Result<MessageEvent, WaitError> {
        loop {
            match timeout_at(self.deadline, self.subscription.recv()).await {
                Err(_) => return Err(WaitError::Timeout(self.timeout)),
                Ok(None) => return Err(WaitError::Closed),
                Ok(Some(event)) => {
                    if event.channel == self.channel && (self.predicate)(&event) {
                        return Ok(event);
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for MessageWait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageWait")
            .field("channel", &self.channel)
            .field("deadline", &self.deadline)
            .finish()
    }
}

fn action_text(text: &str) -> String {
    format!("\u{1}ACTION {}\u{1}", text)
}

impl Client {
    /// Wait for a message on `channel` accepted by `predicate`.
    ///
    /// Fails with [`WaitError::Closed`] if the connection closes first.
    pub fn wait_for_message<F>(&self, channel: &str, timeout: Duration, predicate: F) -> MessageWait
    where
        F: FnMut(&MessageEvent) -> bool + Send + 'static,
    {
        MessageWait {
            subscription: self.lock().messages.subscribe_transient(),
            channel: channel.to_string(),
            predicate: Box::new(predicate),
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    /// Send `content` to `channel` and wait for the server's echo.
    ///
    /// Returns the `msgid` the server assigned, or `None` for empty text,
    /// a missing echo or an echo without a `msgid`.
    pub async fn send_message(&self, channel: &str, content: &str) -> Option<String> {
        self.send_message_with_tags(channel, content, &[]).await
    }

    /// Like [`send_message`](Client::send_message) with client tags attached.
    pub async fn send_message_with_tags(
        &self,
        channel: &str,
        content: &str,
        tags: &[(&str, &str)],
    ) -> Option<String> {
        let channel = normalize_channel(channel)?;
        let text = content.trim().to_string();
        if text.is_empty() {
            return None;
        }

        let nick = self.current_nick();
        let expected = text.clone();
        let echo = self.wait_for_message(&channel, self.timeouts().echo, move |event| {
            irc_eq(&event.author, &nick) && event.content == expected
        });
        let tag_string = build_tag_string(tags.iter().map(|(key, value)| (*key, Some(*value))));
        let line = with_tags(&tag_string, &build_command("PRIVMSG", &[&channel], Some(text.as_str())));
        self.send_and_await_echo(&line, echo).await
    }

    /// Send `content` as a reply to the message `parent_msgid`.
    pub async fn reply_to_message(
        &self,
        channel: &str,
        parent_msgid: &str,
        content: &str,
    ) -> Option<String> {
        let channel = normalize_channel(channel)?;
        let text = content.trim().to_string();
        if text.is_empty() {
            return None;
        }

        let nick = self.current_nick();
        let expected = text.clone();
        let parent = parent_msgid.to_string();
        let echo = self.wait_for_message(&channel, self.timeouts().echo, move |event| {
            irc_eq(&event.author, &nick)
                && event.content == expected
                && event.reply_to.as_deref() == Some(parent.as_str())
        });
        let tag_string = build_tag_string([
            ("+draft/reply", Some(parent_msgid)),
            ("+reply", Some(parent_msgid)),
        ]);
        let line = with_tags(&tag_string, &build_command("PRIVMSG", &[&channel], Some(text.as_str())));
        self.send_and_await_echo(&line, echo).await
    }

    async fn send_and_await_echo(&self, line: &str, echo: MessageWait) -> Option<String> {
        if let Err(err) = self.send_raw(line) {
            debug!(error = %err, "message not sent");
            return None;
        }
        match echo.wait().await {
            Ok(event) => event.msgid,
            Err(err) => {
                debug!(error = %err, "message echo not received");
                None
            }
        }
    }

    /// Redact `msgid` in `channel`.
    ///
    /// Requires `draft/message-redaction`. Resolves `true` once the server
    /// echoes the REDACT; `false` on `FAIL REDACT` or timeout.
    pub async fn delete_message(&self, channel: &str, msgid: &str) -> bool {
        self.redact(channel, msgid, "deleted").await
    }

    async fn redact(&self, channel: &str, msgid: &str, reason: &str) -> bool {
        if !self.has_capability("draft/message-redaction") {
            return false;
        }
        let Some(channel) = normalize_channel(channel) else {
            return false;
        };

        let target = channel.clone();
        let id = msgid.to_string();
        let request = build_command("REDACT", &[channel.as_str(), msgid], Some(reason));
        let waiting = self.request(&request, self.timeouts().redact, move |line, _| {
            if line.is("REDACT") {
                return (line.param(0) == target && line.param(1) == id).then_some(Reply::Confirmed(()));
            }
            if line.is("FAIL") && line.param(0).eq_ignore_ascii_case("REDACT") && line.params.contains(&id) {
                return Refusal::from_line(line).map(Reply::Refused);
            }
            None
        });
        let Some(waiting) = waiting else {
            return false;
        };

        match waiting.wait().await {
            Ok(Reply::Confirmed(())) => true,
            Ok(Reply::Refused(refusal)) => {
                debug!(%channel, %msgid, %refusal, "redaction refused");
                false
            }
            Err(err) => {
                debug!(%channel, %msgid, error = %err, "redaction not confirmed");
                false
            }
        }
    }

    /// Replace `msgid` with `content`: redact the old message, then send the
    /// new one.
    ///
    /// The replacement is sent whether or not the redaction succeeds.
    pub async fn edit_message(&self, channel: &str, msgid: &str, content: &str) -> Option<String> {
        if !self.redact(channel, msgid, "edited").await {
            debug!(%msgid, "original not redacted; sending replacement anyway");
        }
        self.send_message(channel, content).await
    }

    /// React to `msgid` with `emoji` and wait for the echo.
    pub async fn add_reaction(&self, channel: &str, msgid: &str, emoji: &str) -> bool {
        let Some(channel) = normalize_channel(channel) else {
            return false;
        };

        let nick = self.current_nick();
        let reaction = emoji.to_string();
        let parent = msgid.to_string();
        let echo = self.wait_for_message(&channel, self.timeouts().echo, move |event| {
            irc_eq(&event.author, &nick)
                && event.reaction.as_deref() == Some(reaction.as_str())
                && event.reply_to.as_deref() == Some(parent.as_str())
        });
        let tag_string = build_tag_string([
            ("+draft/reply", Some(msgid)),
            ("+reply", Some(msgid)),
            ("+draft/react", Some(emoji)),
            ("+react", Some(emoji)),
        ]);
        let line = with_tags(&tag_string, &build_command("TAGMSG", &[&channel], None));
        if let Err(err) = self.send_raw(&line) {
            debug!(error = %err, "reaction not sent");
            return false;
        }
        echo.wait().await.is_ok()
    }

    /// Send a CTCP ACTION (`/me`).
    pub async fn send_action(&self, channel: &str, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.send_message(channel, &action_text(text)).await
    }

    pub async fn slap_with_trout(&self, channel: &str, nick: &str) -> Option<String> {
        let text = format!("slaps {} around a bit with a large trout", nick);
        self.send_message(channel, &action_text(&text)).await
    }
}

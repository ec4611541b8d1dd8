//! Topic, modes, renames, kicks and bans.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{Client, Waiting};
use crate::casemap::irc_eq;
use crate::chan::{ban_mask_for, normalize_channel};
use crate::error::{Refusal, Reply};
use crate::ircv3::parse_timestamp;
use crate::message::{build_command, ParsedLine};
use crate::response::{Response, CHANNEL_REFUSALS};

/// One entry of a channel ban list (`367 RPL_BANLIST`).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BanEntry {
    pub mask: String,
    /// Who set the ban, when the server says.
    pub set_by: String,
    /// When the ban was set; `None` when absent or unparseable.
    pub set_at: Option<DateTime<Utc>>,
}

impl BanEntry {
    fn from_line(line: &ParsedLine) -> BanEntry {
        BanEntry {
            mask: line.param(2).to_string(),
            set_by: line.param(3).to_string(),
            set_at: parse_timestamp(line.param(4)),
        }
    }
}

/// A refusal among `codes` whose first argument is `channel`.
fn channel_refusal(line: &ParsedLine, codes: &[Response], channel: &str) -> Option<Refusal> {
    let response = Response::from_line(line)?;
    (codes.contains(&response) && line.param(1) == channel).then_some(Refusal::Numeric(response))
}

/// Topic text of a 332 reply: the trailing parameter verbatim, or the
/// remaining middle parameters when a server sends none.
fn topic_text(line: &ParsedLine) -> String {
    if line.trailing.is_empty() {
        line.params.get(2..).map(|rest| rest.join(" ")).unwrap_or_default().trim().to_string()
    } else {
        line.trailing.clone()
    }
}

async fn outcome<T>(waiting: Option<Waiting<Reply<T>>>, operation: &str, channel: &str) -> Option<T> {
    match waiting?.wait().await {
        Ok(Reply::Confirmed(value)) => Some(value),
        Ok(Reply::Refused(refusal)) => {
            debug!(%channel, %refusal, "{} refused", operation);
            None
        }
        Err(err) => {
            debug!(%channel, error = %err, "{} not confirmed", operation);
            None
        }
    }
}

impl Client {
    /// Set the topic of `channel`. An empty topic clears it.
    ///
    /// `true` once the server echoes our TOPIC.
    pub async fn set_topic(&self, channel: &str, topic: &str) -> bool {
        let Some(channel) = normalize_channel(channel) else {
            return false;
        };
        let target = channel.clone();
        let request = build_command("TOPIC", &[&channel], Some(topic.trim()));
        let waiting = self.request(&request, self.timeouts().command, move |line, session| {
            if line.is("TOPIC") {
                return (line.param(0) == target && session.is_me(line.nickname()))
                    .then_some(Reply::Confirmed(()));
            }
            channel_refusal(line, CHANNEL_REFUSALS, &target).map(Reply::Refused)
        });
        outcome(waiting, "TOPIC", &channel).await.is_some()
    }

    /// Current topic of `channel`; empty when unset or on failure.
    pub async fn request_channel_topic(&self, channel: &str) -> String {
        let Some(channel) = normalize_channel(channel) else {
            return String::new();
        };
        let target = channel.clone();
        let request = build_command("TOPIC", &[channel.as_str()], None);
        let waiting = self.request(&request, self.timeouts().command, move |line, _| {
            match Response::from_line(line)? {
                Response::RPL_TOPIC if line.param(1) == target => Some(topic_text(line)),
                Response::RPL_NOTOPIC if line.param(1) == target => Some(String::new()),
                _ => None,
            }
        });
        match waiting {
            Some(waiting) => waiting.wait_or(String::new()).await,
            None => String::new(),
        }
    }

    /// Mode string of `channel` (such as `+nt`); empty on failure.
    pub async fn request_channel_modes(&self, channel: &str) -> String {
        let Some(channel) = normalize_channel(channel) else {
            return String::new();
        };
        let target = channel.clone();
        let request = build_command("MODE", &[channel.as_str()], None);
        let waiting = self.request(&request, self.timeouts().command, move |line, _| {
            if line.is("324") {
                return (line.param(1) == target).then(|| Reply::Confirmed(line.text_from(2)));
            }
            channel_refusal(
                line,
                &[Response::ERR_NOSUCHCHANNEL, Response::ERR_NOTONCHANNEL],
                &target,
            )
            .map(Reply::Refused)
        });
        outcome(waiting, "MODE query", &channel)
            .await
            .unwrap_or_default()
    }

    /// Apply `mode_spec` (such as `+k secret`) to `channel`.
    pub async fn set_channel_modes(&self, channel: &str, mode_spec: &str) -> bool {
        let Some(channel) = normalize_channel(channel) else {
            return false;
        };
        let mut params = vec![channel.as_str()];
        params.extend(mode_spec.split_whitespace());
        if params.len() == 1 {
            return false;
        }

        let target = channel.clone();
        let request = build_command("MODE", &params[..], None);
        let waiting = self.request(&request, self.timeouts().command, move |line, _| {
            if line.is("MODE") {
                return (line.param(0) == target).then_some(Reply::Confirmed(()));
            }
            channel_refusal(
                line,
                &[
                    Response::ERR_CHANOPRIVSNEEDED,
                    Response::ERR_NOTONCHANNEL,
                    Response::ERR_NOSUCHCHANNEL,
                    Response::ERR_UNKNOWNMODE,
                ],
                &target,
            )
            .map(Reply::Refused)
        });
        outcome(waiting, "MODE", &channel).await.is_some()
    }

    /// Rename `old` to `new` with the `RENAME` extension.
    ///
    /// Renaming a channel to its own name succeeds without a round trip.
    pub async fn rename_channel(&self, old: &str, new: &str) -> bool {
        let (Some(old), Some(new)) = (normalize_channel(old), normalize_channel(new)) else {
            return false;
        };
        if old == new {
            return true;
        }

        let (from, to) = (old.clone(), new.clone());
        let request = build_command("RENAME", &[old.as_str(), new.as_str()], None);
        let waiting = self.request(&request, self.timeouts().rename, move |line, _| {
            if line.is("RENAME") {
                return (line.param(0) == from && line.param(1) == to).then_some(Reply::Confirmed(()));
            }
            let codes = [
                Response::ERR_CHANOPRIVSNEEDED,
                Response::ERR_NOTONCHANNEL,
                Response::ERR_NOSUCHCHANNEL,
                Response::ERR_INVALIDMODEPARAM,
            ];
            channel_refusal(line, &codes, &from)
                .or_else(|| channel_refusal(line, &codes, &to))
                .map(Reply::Refused)
        });
        outcome(waiting, "RENAME", &old).await.is_some()
    }

    /// Ban list of `channel`; empty on refusal or timeout.
    pub async fn request_ban_list(&self, channel: &str) -> Vec<BanEntry> {
        let Some(channel) = normalize_channel(channel) else {
            return Vec::new();
        };
        let target = channel.clone();
        let mut entries = Vec::new();
        let request = build_command("MODE", &[channel.as_str(), "+b"], None);
        let waiting = self.request(&request, self.timeouts().list, move |line, _| {
            match Response::from_line(line) {
                Some(Response::RPL_BANLIST) if line.param(1) == target => {
                    entries.push(BanEntry::from_line(line));
                    None
                }
                Some(Response::RPL_ENDOFBANLIST) if line.param(1) == target => {
                    Some(Reply::Confirmed(std::mem::take(&mut entries)))
                }
                _ => channel_refusal(line, CHANNEL_REFUSALS, &target).map(Reply::Refused),
            }
        });
        outcome(waiting, "ban list", &channel)
            .await
            .unwrap_or_default()
    }

    /// Kick `nick` from `channel`, with `reason` or `kicked`.
    pub async fn kick_user(&self, channel: &str, nick: &str, reason: Option<&str>) -> bool {
        let Some(channel) = normalize_channel(channel) else {
            return false;
        };
        let nick = nick.trim();
        if nick.is_empty() {
            return false;
        }

        let (target, victim) = (channel.clone(), nick.to_string());
        let request = build_command("KICK", &[channel.as_str(), nick], Some(reason.unwrap_or("kicked")));
        let waiting = self.request(&request, self.timeouts().command, move |line, _| {
            if line.is("KICK") {
                return (line.param(0) == target && irc_eq(line.param(1), &victim))
                    .then_some(Reply::Confirmed(()));
            }
            if line.is("441") {
                return (irc_eq(line.param(1), &victim) && line.param(2) == target)
                    .then_some(Reply::Refused(Refusal::Numeric(Response::ERR_USERNOTINCHANNEL)));
            }
            channel_refusal(line, CHANNEL_REFUSALS, &target).map(Reply::Refused)
        });
        outcome(waiting, "KICK", &channel).await.is_some()
    }

    /// Ban `nick_or_mask` from `channel`. A bare nick becomes `nick!*@*`.
    pub async fn ban_user(&self, channel: &str, nick_or_mask: &str) -> bool {
        match ban_mask_for(nick_or_mask) {
            Some(mask) => self.add_ban(channel, mask).await,
            None => false,
        }
    }

    /// Add exactly `mask` to the ban list of `channel`.
    pub async fn set_ban_mask(&self, channel: &str, mask: &str) -> bool {
        let mask = mask.trim();
        if mask.is_empty() {
            return false;
        }
        self.add_ban(channel, mask.to_string()).await
    }

    async fn add_ban(&self, channel: &str, mask: String) -> bool {
        let Some(channel) = normalize_channel(channel) else {
            return false;
        };
        let target = channel.clone();
        let request = build_command("MODE", &[channel.as_str(), "+b", mask.as_str()], None);
        let waiting = self.request(&request, self.timeouts().command, move |line, _| {
            if line.is("MODE") {
                return (line.param(0) == target && line.param(1) == "+b" && line.param(2) == mask)
                    .then_some(Reply::Confirmed(()));
            }
            channel_refusal(line, CHANNEL_REFUSALS, &target).map(Reply::Refused)
        });
        outcome(waiting, "ban", &channel).await.is_some()
    }
}

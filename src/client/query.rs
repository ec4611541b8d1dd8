//! WHOIS and services.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use tracing::debug;

use super::{Client, Waiting};
use crate::casemap::irc_eq;
use crate::message::{build_command, ParsedLine};
use crate::response::Response;

/// What a WHOIS reply told us about a user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WhoisInfo {
    pub nick: String,
    pub username: Option<String>,
    pub hostname: Option<String>,
    pub realname: Option<String>,
    pub server: Option<String>,
    pub server_info: Option<String>,
    /// Channels as listed, with any membership prefix.
    pub channels: Vec<String>,
    /// Services account (`330`).
    pub account: Option<String>,
    pub is_operator: bool,
    pub idle_seconds: Option<u64>,
    pub signon: Option<DateTime<Utc>>,
    /// Connected over TLS (`671`).
    pub secure: bool,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl WhoisInfo {
    fn new(nick: &str) -> Self {
        WhoisInfo {
            nick: nick.to_string(),
            ..Default::default()
        }
    }

    /// Fold one WHOIS numeric into the record.
    fn absorb(&mut self, response: Response, line: &ParsedLine) {
        match response {
            Response::RPL_WHOISUSER => {
                if let Some(nick) = non_empty(line.param(1)) {
                    self.nick = nick;
                }
                self.username = non_empty(line.param(2));
                self.hostname = non_empty(line.param(3));
                self.realname = non_empty(&line.trailing);
            }
            Response::RPL_WHOISSERVER => {
                self.server = non_empty(line.param(2));
                self.server_info = non_empty(&line.trailing);
            }
            Response::RPL_WHOISOPERATOR => self.is_operator = true,
            Response::RPL_WHOISIDLE => {
                if let Ok(idle) = line.param(2).parse() {
                    self.idle_seconds = Some(idle);
                }
                if let Some(signon) = line
                    .param(3)
                    .parse::<i64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                {
                    self.signon = Some(signon);
                }
            }
            Response::RPL_WHOISCHANNELS => {
                self.channels = line.trailing.split_whitespace().map(str::to_string).collect();
            }
            Response::RPL_WHOISACCOUNT => self.account = non_empty(line.param(2)),
            Response::RPL_WHOISSECURE => self.secure = true,
            _ => {}
        }
    }
}

impl Client {
    /// WHOIS `nick`.
    ///
    /// `None` when the server answers `401 ERR_NOSUCHNICK` or nothing ends
    /// the reply in time.
    pub async fn request_whois(&self, nick: &str) -> Option<WhoisInfo> {
        let nick = nick.trim();
        if nick.is_empty() {
            return None;
        }

        let target = nick.to_string();
        let mut info = WhoisInfo::new(nick);
        let request = build_command("WHOIS", &[nick], None);
        let waiting = self.request(&request, self.timeouts().list, move |line, _| {
            let response = Response::from_line(line)?;
            if !irc_eq(line.param(1), &target) {
                return None;
            }
            match response {
                Response::ERR_NOSUCHNICK => Some(None),
                Response::RPL_ENDOFWHOIS => Some(Some(std::mem::take(&mut info))),
                other if other.is_whois_related() => {
                    info.absorb(other, line);
                    None
                }
                _ => None,
            }
        })?;

        match waiting.wait().await {
            Ok(info) => info,
            Err(err) => {
                debug!(%nick, error = %err, "WHOIS not answered");
                None
            }
        }
    }

    /// Send `command` to a services bot as a PRIVMSG, without waiting.
    ///
    /// Nothing is sent when either argument is blank.
    pub fn send_service_command(&self, service: &str, command: &str) {
        let (service, command) = (service.trim(), command.trim());
        if service.is_empty() || command.is_empty() {
            return;
        }
        if let Err(err) = self.send_raw(&build_command("PRIVMSG", &[service], Some(command))) {
            debug!(%service, error = %err, "service command not sent");
        }
    }

    /// Wait for a NOTICE from `service` addressed to us.
    ///
    /// The first notice matching `failure` resolves `false`, one matching
    /// `success` resolves `true`; other notices are ignored.
    /// [`Timeouts::service_notice`](super::Timeouts::service_notice) is the
    /// usual deadline. Register the wait before sending the command it
    /// answers:
    ///
    /// ```no_run
    /// # async fn run(client: slirc_client::client::Client) {
    /// use regex::Regex;
    ///
    /// let success = Regex::new("(?i)you are now identified").unwrap();
    /// let timeout = client.config().timeouts.service_notice;
    /// let wait = client.wait_for_service_notice("NickServ", &success, None, timeout);
    /// client.send_service_command("NickServ", "IDENTIFY hunter2");
    /// let identified = wait.wait_or(false).await;
    /// # }
    /// ```
    pub fn wait_for_service_notice(
        &self,
        service: &str,
        success: &Regex,
        failure: Option<&Regex>,
        timeout: Duration,
    ) -> Waiting<bool> {
        let service = service.trim().to_string();
        let success = success.clone();
        let failure = failure.cloned();
        let ticket = self.lock().waiters.register(timeout, move |line, session| {
            if !line.is("NOTICE")
                || !session.is_me(line.param(0))
                || !irc_eq(line.nickname(), &service)
            {
                return None;
            }
            let text = line.text_from(1);
            if failure.as_ref().is_some_and(|re| re.is_match(&text)) {
                return Some(false);
            }
            success.is_match(&text).then_some(true)
        });
        self.waiting(ticket)
    }
}

//! Client configuration.

use std::time::Duration;

use crate::caps::REQUESTED_CAPABILITIES;

/// Deadlines for every request/response exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Timeouts {
    /// Registration signal (`001`/`376`/`422`) after connecting.
    pub registration: Duration,
    /// `CAP LS` reply.
    pub cap_ls: Duration,
    /// ACK/NAK for each `CAP REQ`.
    pub cap_reply: Duration,
    /// JOIN echo.
    pub join: Duration,
    /// `366 RPL_ENDOFNAMES`.
    pub names: Duration,
    /// End of a `chathistory` batch.
    pub history: Duration,
    /// Echo of our own PRIVMSG/TAGMSG.
    pub echo: Duration,
    /// REDACT echo.
    pub redact: Duration,
    /// Topic, mode, kick and ban commands.
    pub command: Duration,
    /// RENAME.
    pub rename: Duration,
    /// Ban list and WHOIS.
    pub list: Duration,
    /// Services NOTICE.
    pub service_notice: Duration,
    /// Period of the latency probe.
    pub latency_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            registration: Duration::from_secs(15),
            cap_ls: Duration::from_secs(3),
            cap_reply: Duration::from_secs(5),
            join: Duration::from_secs(5),
            names: Duration::from_secs(10),
            history: Duration::from_secs(15),
            echo: Duration::from_secs(5),
            redact: Duration::from_secs(5),
            command: Duration::from_secs(5),
            rename: Duration::from_secs(6),
            list: Duration::from_secs(7),
            service_notice: Duration::from_secs(6),
            latency_interval: Duration::from_secs(30),
        }
    }
}

/// Configuration for one [`Client`](super::Client).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientConfig {
    /// Desired nickname.
    pub nickname: String,
    /// Username (ident).
    pub username: String,
    /// Real name / GECOS.
    pub realname: String,
    /// Server password, if required.
    pub password: Option<String>,
    /// Answer for a `PING` without a token.
    pub server_name: String,
    /// Capabilities to request, in order.
    pub request_caps: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Configuration for `nickname`, which also serves as username and real name.
    pub fn new(nickname: impl Into<String>) -> Self {
        let nickname = nickname.into();
        Self {
            username: nickname.clone(),
            realname: nickname.clone(),
            nickname,
            password: None,
            server_name: "localhost".to_string(),
            request_caps: REQUESTED_CAPABILITIES.iter().map(|c| c.to_string()).collect(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_realname(mut self, realname: impl Into<String>) -> Self {
        self.realname = realname.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = server_name.into();
        self
    }

    pub fn with_request_caps<I, S>(mut self, caps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request_caps = caps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

//! Scripted IRC server for driving a `Client` over `MemoryTransport`.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use slirc_client::{Client, ClientConfig, MemoryListener, MemoryServer, MemoryTransport, ParsedLine};

/// How long a test waits for the client to write a line.
pub const LINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Capabilities a full-featured server acknowledges.
pub const ALL_CAPS: &[&str] = &[
    "message-tags",
    "echo-message",
    "draft/message-redaction",
    "server-time",
    "batch",
    "draft/chathistory",
];

pub struct FakeServer {
    conn: MemoryServer,
    /// Nick the client registered with.
    pub nick: String,
    /// Latency probes seen while reading other lines.
    pub probes: VecDeque<String>,
    sync_counter: u32,
}

impl FakeServer {
    pub async fn accept(listener: &mut MemoryListener) -> FakeServer {
        let conn = tokio::time::timeout(LINE_TIMEOUT, listener.accept())
            .await
            .expect("client never connected")
            .expect("transport dropped");
        FakeServer {
            conn,
            nick: String::new(),
            probes: VecDeque::new(),
            sync_counter: 0,
        }
    }

    /// Next line from the client, latency probes included.
    pub async fn recv_raw(&mut self) -> Option<String> {
        tokio::time::timeout(LINE_TIMEOUT, self.conn.recv())
            .await
            .expect("timed out waiting for a client line")
    }

    /// Next line from the client, setting latency probes aside.
    pub async fn next_line(&mut self) -> String {
        loop {
            let line = self.recv_raw().await.expect("client closed the connection");
            if is_probe(&line) {
                self.probes.push_back(line);
                continue;
            }
            return line;
        }
    }

    /// Next line, asserting it starts with `prefix`.
    pub async fn expect(&mut self, prefix: &str) -> String {
        let line = self.next_line().await;
        assert!(
            line.starts_with(prefix),
            "expected a line starting with {:?}, got {:?}",
            prefix,
            line
        );
        line
    }

    /// Next latency probe, waiting for one if none was set aside.
    pub async fn next_probe(&mut self) -> String {
        if let Some(probe) = self.probes.pop_front() {
            return probe;
        }
        loop {
            let line = self.recv_raw().await.expect("client closed the connection");
            if is_probe(&line) {
                return line;
            }
        }
    }

    /// Lines already written by the client, latency probes excluded.
    pub fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.conn.try_recv() {
            if is_probe(&line) {
                self.probes.push_back(line);
            } else {
                lines.push(line);
            }
        }
        lines
    }

    pub fn send(&self, line: impl Into<String>) {
        assert!(self.conn.send(line), "client is gone");
    }

    pub fn close(&mut self) {
        self.conn.close();
    }

    pub fn conn(&mut self) -> &mut MemoryServer {
        &mut self.conn
    }

    /// Answer registration, acknowledging `caps` and refusing the rest.
    pub async fn handshake(&mut self, caps: &[&str]) {
        self.expect("CAP LS 302").await;
        loop {
            let line = self.next_line().await;
            if let Some(nick) = line.strip_prefix("NICK ") {
                self.nick = nick.to_string();
            }
            if line.starts_with("USER ") {
                break;
            }
        }
        self.send(format!(":srv CAP * LS :{}", caps.join(" ")));
        self.negotiate(caps).await;
        self.send(format!(":srv 001 {} :Welcome to the test network", self.nick));
    }

    /// Answer `CAP REQ` lines until `CAP END`.
    pub async fn negotiate(&mut self, caps: &[&str]) {
        loop {
            let line = self.next_line().await;
            if line == "CAP END" {
                return;
            }
            let name = line
                .strip_prefix("CAP REQ :")
                .unwrap_or_else(|| panic!("unexpected line during CAP negotiation: {:?}", line));
            let verdict = if caps.contains(&name) { "ACK" } else { "NAK" };
            self.send(format!(":srv CAP {} {} :{}", self.nick, verdict, name));
        }
    }

    /// Prefix identifying our client as the source of a line.
    pub fn source(&self) -> String {
        format!("{}!user@host", self.nick)
    }

    /// Echo a PRIVMSG/TAGMSG the client sent, adding a `msgid` tag.
    pub fn echo(&self, line: &str, msgid: &str) -> String {
        let echoed = echo_line(line, &self.source(), msgid);
        self.send(echoed.clone());
        echoed
    }
}

/// `line` as the server relays it: prefixed by `source`, with a `msgid`.
pub fn echo_line(line: &str, source: &str, msgid: &str) -> String {
    let (tags, body) = match line.strip_prefix('@') {
        Some(rest) => {
            let (tags, body) = rest.split_once(' ').expect("tag block without a body");
            (format!("{};", tags), body)
        }
        None => (String::new(), line),
    };
    format!("@{}msgid={} :{} {}", tags, msgid, source, body)
}

fn is_probe(line: &str) -> bool {
    line.starts_with("PING :slirc-")
}

/// Make sure every line sent so far has been processed by the client.
pub async fn sync(client: &Client, server: &mut FakeServer) {
    server.sync_counter += 1;
    let token = format!("sync-{}", server.sync_counter);
    let expected = token.clone();
    let waiting = client.wait_for(LINE_TIMEOUT, move |line: &ParsedLine| {
        line.is("NOTICE") && line.trailing == expected
    });
    server.send(format!(":srv NOTICE {} :{}", server.nick, token));
    waiting.wait().await.expect("sync notice not processed");
}

/// A client registered against a fresh scripted server.
pub async fn connected(config: ClientConfig, caps: &[&str]) -> (Client, FakeServer, MemoryListener) {
    let (transport, mut listener) = MemoryTransport::pair();
    let client = Client::new(config, transport);
    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });
    let mut server = FakeServer::accept(&mut listener).await;
    server.handshake(caps).await;
    connecting
        .await
        .expect("connect task panicked")
        .expect("registration failed");
    (client, server, listener)
}

pub async fn connected_as(nick: &str, caps: &[&str]) -> (Client, FakeServer, MemoryListener) {
    connected(ClientConfig::new(nick), caps).await
}

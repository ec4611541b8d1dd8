//! Connection lifecycle: registration, capability negotiation, PING/PONG,
//! latency probes, close handling and reconnects.

mod common;

use std::time::Duration;

use common::{connected, connected_as, sync, FakeServer, ALL_CAPS};
use slirc_client::client::Direction;
use slirc_client::{
    Client, ClientConfig, ClientError, ConnectionState, MemoryListener, MemoryTransport, Timeouts,
    TransportError, WaitError,
};
use tokio::task::JoinHandle;

// =============================================================================
// REGISTRATION
// =============================================================================

mod registration {
    use super::*;

    #[tokio::test]
    async fn test_handshake_order_and_capabilities() {
        let (client, _server, _listener) = connected_as("me", &["batch", "server-time"]).await;

        assert_eq!(client.state(), ConnectionState::Connected);
        assert!(client.is_connected());
        assert!(client.connected_at().is_some());
        assert_eq!(client.capabilities(), vec!["batch", "server-time"]);
        assert!(client.has_capability("batch"));
        assert!(!client.has_capability("echo-message"));

        let sent: Vec<_> = client
            .raw_log()
            .into_iter()
            .filter(|entry| entry.direction == Direction::Out)
            .map(|entry| entry.line)
            .collect();
        assert_eq!(sent[0], "CAP LS 302");
        assert_eq!(sent[1], "NICK me");
        assert_eq!(sent[2], "USER me 0 * :me");
        assert_eq!(sent[3], "CAP REQ :message-tags");
        assert!(sent.contains(&"CAP END".to_string()));
    }

    #[tokio::test]
    async fn test_password_is_sent_before_nick() {
        let config = ClientConfig::new("me").with_password("secret");
        let (transport, mut listener) = MemoryTransport::pair();
        let client = Client::new(config, transport);
        let connecting = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });

        let mut server = FakeServer::accept(&mut listener).await;
        server.expect("CAP LS 302").await;
        assert_eq!(server.next_line().await, "PASS :secret");
        assert_eq!(server.next_line().await, "NICK me");
        server.expect("USER me").await;
        server.send(":srv CAP * LS :");
        server.nick = "me".into();
        server.negotiate(&[]).await;
        server.send(":srv 376 me :End of /MOTD command.");

        connecting.await.unwrap().unwrap();
        assert!(client.capabilities().is_empty());
    }

    #[tokio::test]
    async fn test_server_without_cap_support() {
        let timeouts = Timeouts {
            cap_ls: Duration::from_millis(50),
            ..Timeouts::default()
        };
        let config = ClientConfig::new("me").with_timeouts(timeouts);
        let (transport, mut listener) = MemoryTransport::pair();
        let client = Client::new(config, transport);
        let connecting = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });

        let mut server = FakeServer::accept(&mut listener).await;
        server.expect("CAP LS 302").await;
        server.expect("NICK me").await;
        server.expect("USER me").await;
        assert_eq!(server.next_line().await, "CAP END");
        server.send(":srv 422 me :MOTD File is missing");

        connecting.await.unwrap().unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);
        assert!(client.capabilities().is_empty());
    }

    #[tokio::test]
    async fn test_registration_timeout_fails_connect() {
        let timeouts = Timeouts {
            cap_ls: Duration::from_millis(20),
            registration: Duration::from_millis(100),
            ..Timeouts::default()
        };
        let config = ClientConfig::new("me").with_timeouts(timeouts);
        let (transport, mut listener) = MemoryTransport::pair();
        let client = Client::new(config, transport);
        let connecting = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });
        let mut server = FakeServer::accept(&mut listener).await;

        let result = connecting.await.unwrap();
        assert!(matches!(
            result,
            Err(ClientError::Registration(WaitError::Timeout(_)))
        ));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.pending_waiters(), 0);

        // The failed connection was closed.
        while server.conn().recv().await.is_some() {}
    }

    fn slow_caps_config() -> ClientConfig {
        let timeouts = Timeouts {
            registration: Duration::from_secs(1),
            cap_ls: Duration::from_secs(10),
            cap_reply: Duration::from_secs(10),
            latency_interval: Duration::ZERO,
            ..Timeouts::default()
        };
        ClientConfig::new("me")
            .with_request_caps(["batch"])
            .with_timeouts(timeouts)
    }

    /// Start registering, stalling on `CAP REQ :batch` until the registration
    /// waiter's deadline has passed.
    async fn stall_past_registration_deadline() -> (
        Client,
        FakeServer,
        JoinHandle<Result<(), ClientError>>,
        MemoryListener,
    ) {
        let (transport, mut listener) = MemoryTransport::pair();
        let client = Client::new(slow_caps_config(), transport);
        let connecting = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });
        let mut server = FakeServer::accept(&mut listener).await;
        server.expect("CAP LS 302").await;
        server.expect("NICK me").await;
        server.expect("USER ").await;
        server.nick = "me".to_string();
        server.send(":srv CAP * LS :batch");
        server.expect("CAP REQ :batch").await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        (client, server, connecting, listener)
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_registration_signal_still_connects() {
        let (client, mut server, connecting, _listener) = stall_past_registration_deadline().await;
        server.send(":srv 001 me :Welcome to the test network");
        server.send(":srv CAP me ACK :batch");
        server.expect("CAP END").await;

        assert!(connecting.await.unwrap().is_ok());
        assert_eq!(client.state(), ConnectionState::Connected);
        assert!(client.is_connected());
        assert!(client.has_capability("batch"));
        assert_eq!(client.pending_waiters(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_registration_signal_fails_after_slow_caps() {
        let (client, mut server, connecting, _listener) = stall_past_registration_deadline().await;
        server.send(":srv CAP me ACK :batch");
        server.expect("CAP END").await;

        let result = connecting.await.unwrap();
        assert!(matches!(
            result,
            Err(ClientError::Registration(WaitError::Timeout(_)))
        ));
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_unreachable_transport_fails_connect() {
        let (transport, listener) = MemoryTransport::pair();
        drop(listener);
        let client = Client::new(ClientConfig::new("me"), transport);
        let result = client.connect().await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_connect_while_connected_is_noop() {
        let (client, mut server, _listener) = connected_as("me", &[]).await;
        client.connect().await.unwrap();
        sync(&client, &mut server).await;
        assert!(server.drain().is_empty());
    }
}

// =============================================================================
// PASSIVE TRACKING
// =============================================================================

mod tracking {
    use super::*;

    #[tokio::test]
    async fn test_ping_is_answered_and_never_reaches_waiters() {
        let (client, mut server, _listener) = connected_as("me", &[]).await;

        let waiting = client.wait_for(Duration::from_millis(200), |line| line.is("PING"));
        server.send("PING :irc.test");
        assert_eq!(server.next_line().await, "PONG :irc.test");
        assert!(waiting.wait().await.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_ping_without_token_uses_server_name() {
        let config = ClientConfig::new("me").with_server_name("irc.home");
        let (_client, mut server, _listener) = connected(config, &[]).await;
        server.send("PING");
        assert_eq!(server.next_line().await, "PONG :irc.home");
    }

    #[tokio::test]
    async fn test_nick_change_is_tracked() {
        let (client, mut server, _listener) = connected_as("me", &[]).await;
        server.send(":me!user@host NICK :me_");
        server.nick = "me_".into();
        sync(&client, &mut server).await;
        assert_eq!(client.current_nick(), "me_");

        // Someone else's nick change is not ours.
        server.send(":other!u@h NICK :me2");
        sync(&client, &mut server).await;
        assert_eq!(client.current_nick(), "me_");
    }

    #[tokio::test]
    async fn test_user_modes_are_tracked() {
        let (client, mut server, _listener) = connected_as("me", &[]).await;
        server.send(":srv 221 me +i");
        sync(&client, &mut server).await;
        assert_eq!(client.user_modes(), "+i");

        server.send(":me MODE me :+wx-i");
        sync(&client, &mut server).await;
        assert_eq!(client.user_modes(), "+wx");
    }

    #[tokio::test]
    async fn test_latency_probe_round_trip() {
        let (client, mut server, _listener) = connected_as("me", &[]).await;

        let probe = server.next_probe().await;
        let token = probe.trim_start_matches("PING :").to_string();
        assert!(client.latency().is_none());

        // A second probe is not sent while the first is outstanding.
        client.measure_latency();
        server.send(format!(":srv PONG srv :{}", token));
        sync(&client, &mut server).await;
        assert!(client.latency().is_some());
        assert!(server.probes.is_empty());
    }

    #[tokio::test]
    async fn test_raw_log_and_subscription() {
        let timeouts = Timeouts {
            latency_interval: Duration::ZERO,
            ..Timeouts::default()
        };
        let config = ClientConfig::new("me").with_timeouts(timeouts);
        let (client, mut server, _listener) = connected(config, &[]).await;
        let mut raw = client.on_raw_line();

        server.send(":srv NOTICE me :hello");
        let entry = raw.recv().await.unwrap();
        assert_eq!(entry.direction, Direction::In);
        assert_eq!(entry.line, ":srv NOTICE me :hello");

        client.send_raw("AWAY :lunch").unwrap();
        let entry = raw.recv().await.unwrap();
        assert_eq!(entry.direction, Direction::Out);
        assert_eq!(entry.line, "AWAY :lunch");
        assert_eq!(server.next_line().await, "AWAY :lunch");

        let log = client.raw_log();
        assert_eq!(log.last().map(|e| e.line.as_str()), Some("AWAY :lunch"));
    }
}

// =============================================================================
// CLOSE AND RECONNECT
// =============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_disconnect_rejects_waiters_and_is_idempotent() {
        let (client, mut server, _listener) = connected_as("me", &[]).await;
        let waiting = client.wait_for(Duration::from_secs(30), |_| false);

        client.disconnect();
        assert_eq!(waiting.wait().await, Err(WaitError::Closed));
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.pending_waiters(), 0);
        assert!(matches!(
            client.send_raw("PRIVMSG #a :late"),
            Err(TransportError::NotConnected)
        ));

        while server.conn().recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_server_close_rejects_waiters() {
        let (client, mut server, _listener) = connected_as("me", &[]).await;
        let waiting = client.wait_for(Duration::from_secs(30), |_| false);

        server.close();
        assert_eq!(waiting.wait().await, Err(WaitError::Closed));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.current_nick(), "me");
    }

    #[tokio::test]
    async fn test_transport_error_rejects_waiters() {
        let (client, mut server, _listener) = connected_as("me", &[]).await;
        let waiting = client.wait_for(Duration::from_secs(30), |_| false);

        server.conn().fail(TransportError::WebSocket("reset by peer".into()));
        assert!(matches!(waiting.wait().await, Err(WaitError::Transport(_))));
    }

    #[tokio::test]
    async fn test_operations_after_close_fail_softly() {
        let (client, mut server, _listener) = connected_as("me", ALL_CAPS).await;
        let waiting = client.wait_for(Duration::from_secs(30), |_| false);
        server.close();
        assert_eq!(waiting.wait().await, Err(WaitError::Closed));

        assert_eq!(client.send_message("#rust", "hello").await, None);
        assert!(!client.join_channel("#rust").await);
        assert!(client.request_names("#rust").await.is_empty());
        assert!(client.request_whois("someone").await.is_none());
    }

    #[tokio::test]
    async fn test_reconnect_resets_per_connection_state() {
        let (client, mut server, mut listener) = connected_as("me", &["batch"]).await;
        server.send(":me!user@host NICK :me_");
        server.nick = "me_".into();
        sync(&client, &mut server).await;

        let waiting = client.wait_for(Duration::from_secs(30), |_| false);
        server.close();
        assert_eq!(waiting.wait().await, Err(WaitError::Closed));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.current_nick(), "me_");

        let connecting = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });
        let mut server = FakeServer::accept(&mut listener).await;
        server.handshake(&["echo-message"]).await;
        connecting.await.unwrap().unwrap();

        assert_eq!(server.nick, "me");
        assert_eq!(client.current_nick(), "me");
        assert_eq!(client.capabilities(), vec!["echo-message"]);
        assert!(client.joined_channels().is_empty());
        assert_eq!(client.state(), ConnectionState::Connected);
    }
}

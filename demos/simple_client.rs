//! Simple IRC client example
//!
//! Connects to a server, joins a channel, prints live messages and answers
//! greetings. Set `RUST_LOG=slirc_client=debug` to watch the protocol.
//!
//! ```text
//! cargo run --example simple_client -- irc.libera.chat 6667 '#example'
//! ```

use std::time::Duration;

use anyhow::{bail, Context};
use slirc_client::{Client, ClientConfig, HistoryCursor, TcpTransport};
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "irc.libera.chat".to_string());
    let port = match args.next() {
        Some(port) => port.parse().context("port must be a number")?,
        None => 6667,
    };
    let channel = args.next().unwrap_or_else(|| "#example".to_string());

    let config = ClientConfig::new("example_bot").with_realname("slirc-client example");
    let client = Client::new(config, TcpTransport::new(host.clone(), port));
    client
        .connect()
        .await
        .with_context(|| format!("registering with {}", host))?;
    println!("✓ Registered as {} ({:?})", client.current_nick(), client.capabilities());

    if !client.join_channel(&channel).await {
        bail!("could not join {}", channel);
    }
    let names = client.get_join_names(&channel);
    println!("✓ Joined {} with {} members", channel, names.len());

    for message in client
        .request_history(&channel, 10, HistoryCursor::Latest)
        .await
    {
        println!("  [{}] <{}> {}", message.timestamp, message.author, message.content);
    }

    client
        .send_message(&channel, "Hello from slirc-client example!")
        .await;

    println!("\n--- Listening for messages (Ctrl+C to exit) ---");
    let mut messages = client.on_message();
    loop {
        match timeout(Duration::from_secs(300), messages.recv()).await {
            Ok(Some(message)) => {
                println!("← <{}> {}", message.author, message.content);
                if message.content.contains("hello") && !message.author.eq_ignore_ascii_case(&client.current_nick()) {
                    if let Some(msgid) = &message.msgid {
                        client.reply_to_message(&message.channel, msgid, "Hello there! 👋").await;
                    } else {
                        client.send_message(&message.channel, "Hello there! 👋").await;
                    }
                }
            }
            Ok(None) => {
                println!("Connection closed");
                break;
            }
            Err(_) => {
                if let Some(latency) = client.latency() {
                    println!("No messages in 5 minutes (latency {:?}), keeping alive...", latency);
                }
            }
        }
        if !client.is_connected() {
            break;
        }
    }

    client.disconnect();
    Ok(())
}

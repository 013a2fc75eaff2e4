//! Integration tests for the full stack: environment config, real TCP
//! sessions against a fake RCON server, and the status engine.

use std::time::Duration;

use rconwatch::env;
use rconwatch::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;

// =========================================================================
// Fake RCON server
// =========================================================================

const ROSTER: &str = "\
PlayerDataName: \"Ann\", PlayerID: 76561198000000001, Location: X=1 Y=2 Z=3, Class: Utahraptor\n\
PlayerDataName: Ben, PlayerID: 76561198000000002, Location: X=4 Y=5 Z=6, Class: Tenontosaurus\n";

async fn read_packet(stream: &mut TcpStream) -> Vec<u8> {
    let mut packet = Vec::new();
    let mut byte = [0u8; 1];
    while stream.read(&mut byte).await.unwrap_or(0) == 1 {
        packet.push(byte[0]);
        if byte[0] == 0 {
            break;
        }
    }
    packet
}

/// Accepts connections forever, answering every roster request with `reply`.
async fn spawn_server(reply: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_packet(&mut stream).await;
                stream.write_all(b"Password Accepted").await.ok();
                read_packet(&mut stream).await;
                stream.write_all(reply.as_bytes()).await.ok();
            });
        }
    });

    port
}

/// A port with nothing listening on it.
async fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("addr").port()
}

// =========================================================================
// Helpers
// =========================================================================

fn config(port: u16, poll_on_start: bool) -> MonitorConfig {
    let port = port.to_string();
    let mut config = MonitorConfig::from_lookup(|key| {
        let value = match key {
            env::RCON_IP => "127.0.0.1",
            env::RCON_PORT => port.as_str(),
            env::RCON_PASSWORD => "pw",
            env::POLL_INTERVAL_SECS => "0",
            env::RESTART_TIME => "off",
            env::ATTEMPT_TIMEOUT_MS => "2000",
            env::RESPONSE_TIMEOUT_MS => "500",
            env::SETTLE_DELAY_MS => "10",
            env::RETRY_ATTEMPTS => "2",
            env::RETRY_BACKOFF_MS => "10",
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("valid config");
    config.engine.poll_on_start = poll_on_start;
    config
}

async fn next_update(rx: &mut UnboundedReceiver<StatusUpdate>) -> StatusUpdate {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("update within 5s")
        .expect("notifier alive")
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_manual_poll_reports_roster() {
    let port = spawn_server(ROSTER).await;
    let (notifier, mut rx) = ChannelNotifier::new();
    let monitor = StatusMonitor::start(config(port, false), notifier);

    assert_eq!(monitor.poll_now().await.unwrap(), ServerState::Online);

    let update = next_update(&mut rx).await;
    assert_eq!(update.state, ServerState::Online);
    let roster = update.roster.as_ref().expect("roster");
    assert_eq!(roster.names(), vec!["Ann", "Ben"]);
    assert_eq!(roster.players()[0].id, "76561198000000001");
    assert_eq!(roster.players()[1].class, "Tenontosaurus");

    let json = serde_json::to_value(&update).unwrap();
    assert_eq!(json["state"], "online");
    assert_eq!(json["roster"]["players"][1]["name"], "Ben");
}

#[tokio::test]
async fn test_poll_on_start_reports_empty_server() {
    let port = spawn_server("No Players Connected").await;
    let (notifier, mut rx) = ChannelNotifier::new();
    let monitor = StatusMonitor::start(config(port, true), notifier);

    let update = next_update(&mut rx).await;
    assert_eq!(update.state, ServerState::Online);
    assert!(update.roster.expect("roster").is_sentinel_empty());

    let status = monitor.status().await.unwrap();
    assert_eq!(status.polls_started, 1);
}

#[tokio::test]
async fn test_unreachable_server_goes_offline() {
    let port = dead_port().await;
    let (notifier, mut rx) = ChannelNotifier::new();
    let monitor = StatusMonitor::start(config(port, false), notifier);

    assert_eq!(monitor.poll_now().await.unwrap(), ServerState::Offline);
    let update = next_update(&mut rx).await;
    assert_eq!(update.state, ServerState::Offline);
    assert!(update.roster.is_none());
}

#[tokio::test]
async fn test_shutdown_stops_monitor() {
    let port = spawn_server(ROSTER).await;
    let (notifier, _rx) = ChannelNotifier::new();
    let monitor = StatusMonitor::start(config(port, false), notifier);

    monitor.shutdown().await.unwrap();

    assert!(monitor.handle().is_stopped());
    assert!(matches!(monitor.poll_now().await, Err(EngineError::Unavailable)));
}

#[tokio::test]
async fn test_status_tracks_last_roster() {
    let port = spawn_server(ROSTER).await;
    let (notifier, _rx) = ChannelNotifier::new();
    let monitor = StatusMonitor::start(config(port, false), notifier);

    assert_eq!(monitor.status().await.unwrap().last_roster, None);
    monitor.poll_now().await.unwrap();

    let status = monitor.status().await.unwrap();
    assert_eq!(status.state, ServerState::Online);
    assert_eq!(status.last_roster.expect("roster").len(), 2);
}

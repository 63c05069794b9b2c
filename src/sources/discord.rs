// src/sources/discord.rs
//! Discord gateway adapter.
//!
//! Unlike the polling adapters this keeps one websocket open and hands over
//! messages as they arrive. Lifecycle: connect → Hello → Identify → heartbeats
//! + MESSAGE_CREATE dispatches → close.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::require_non_empty;
use crate::config::Settings;
use crate::error::ControlError;
use crate::lead::{LeadSource, RawItem};

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

// GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT
const INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 12) | (1 << 15);

const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// A source that pushes items over a persistent connection.
#[async_trait]
pub trait ChatStream: Send + Sync {
    fn source(&self) -> LeadSource {
        LeadSource::Discord
    }

    fn keywords(&self, settings: &Settings) -> Vec<String>;

    fn validate(&self, settings: &Settings) -> Result<(), ControlError>;

    async fn connect(&self, settings: &Settings) -> Result<Box<dyn ChatConnection>>;
}

/// One open connection.
#[async_trait]
pub trait ChatConnection: Send {
    /// Suspends until the next candidate message; `None` once the connection is gone.
    async fn next_item(&mut self) -> Option<Result<RawItem>>;

    async fn close(&mut self);
}

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: serde_json::Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageCreate {
    id: String,
    channel_id: String,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    content: String,
    timestamp: DateTime<Utc>,
    author: Author,
}

#[derive(Debug, Deserialize)]
struct Author {
    username: String,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Hello {
        heartbeat_interval_ms: u64,
    },
    Message {
        seq: Option<u64>,
        channel_id: String,
        from_bot: bool,
        item: RawItem,
    },
    /// Any other dispatch; only its sequence number matters.
    Dispatch {
        seq: Option<u64>,
    },
    HeartbeatRequest,
    HeartbeatAck,
    Reconnect,
    InvalidSession,
    Unknown(u8),
}

/// Decode one gateway text frame.
pub fn parse_event(raw: &str) -> Result<GatewayEvent> {
    let p: GatewayPayload = serde_json::from_str(raw).context("parsing gateway payload")?;
    let ev = match p.op {
        OP_HELLO => {
            let ms = p
                .d
                .get("heartbeat_interval")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| anyhow!("hello without heartbeat_interval"))?;
            GatewayEvent::Hello {
                heartbeat_interval_ms: ms,
            }
        }
        OP_DISPATCH if p.t.as_deref() == Some("MESSAGE_CREATE") => {
            let m: MessageCreate =
                serde_json::from_value(p.d).context("parsing MESSAGE_CREATE")?;
            let guild = m.guild_id.as_deref().unwrap_or("@me");
            let url = format!(
                "https://discord.com/channels/{guild}/{}/{}",
                m.channel_id, m.id
            );
            GatewayEvent::Message {
                seq: p.s,
                channel_id: m.channel_id,
                from_bot: m.author.bot,
                item: RawItem {
                    source_id: LeadSource::Discord.source_id(&m.id),
                    title: format!("Discord message from {}", m.author.username),
                    content: m.content,
                    url,
                    created_at: m.timestamp,
                },
            }
        }
        OP_DISPATCH => GatewayEvent::Dispatch { seq: p.s },
        OP_HEARTBEAT => GatewayEvent::HeartbeatRequest,
        OP_HEARTBEAT_ACK => GatewayEvent::HeartbeatAck,
        OP_RECONNECT => GatewayEvent::Reconnect,
        OP_INVALID_SESSION => GatewayEvent::InvalidSession,
        other => GatewayEvent::Unknown(other),
    };
    Ok(ev)
}

fn identify_payload(token: &str) -> serde_json::Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "lead-scanner",
                "device": "lead-scanner"
            }
        }
    })
}

/// Bot-token gateway client.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscordGateway;

#[async_trait]
impl ChatStream for DiscordGateway {
    fn keywords(&self, settings: &Settings) -> Vec<String> {
        settings.discord.keywords.clone()
    }

    fn validate(&self, settings: &Settings) -> Result<(), ControlError> {
        if settings.discord.bot_token.trim().is_empty() {
            return Err(ControlError::missing(
                LeadSource::Discord,
                "no bot token configured (discord.bot_token / DISCORD_BOT_TOKEN)",
            ));
        }
        require_non_empty(LeadSource::Discord, "keywords", &settings.discord.keywords)
    }

    async fn connect(&self, settings: &Settings) -> Result<Box<dyn ChatConnection>> {
        let cfg = &settings.discord;
        let (ws, _resp) = connect_async(cfg.gateway_url.as_str())
            .await
            .context("discord gateway connect")?;
        let (mut sink, mut stream) = ws.split();

        let heartbeat_ms = read_hello(&mut stream).await?;
        sink.send(Message::Text(identify_payload(cfg.bot_token.trim()).to_string()))
            .await
            .context("discord identify")?;

        let period = Duration::from_millis(heartbeat_ms.max(1_000));
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(target: "scanner", source = "discord", heartbeat_ms, "gateway connected");
        Ok(Box::new(GatewayConnection {
            sink,
            stream,
            heartbeat,
            seq: None,
            channels: cfg
                .channel_ids
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        }))
    }
}

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn read_hello(stream: &mut SplitStream<Ws>) -> Result<u64> {
    loop {
        let frame = tokio::time::timeout(HELLO_TIMEOUT, stream.next())
            .await
            .context("discord gateway: no hello")?;
        match frame {
            Some(Ok(Message::Text(text))) => match parse_event(&text)? {
                GatewayEvent::Hello {
                    heartbeat_interval_ms,
                } => return Ok(heartbeat_interval_ms),
                other => bail!("expected hello, got {other:?}"),
            },
            Some(Ok(Message::Close(frame))) => bail!("gateway closed before hello: {frame:?}"),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e).context("discord gateway read"),
            None => bail!("gateway stream ended before hello"),
        }
    }
}

struct GatewayConnection {
    sink: SplitSink<Ws, Message>,
    stream: SplitStream<Ws>,
    heartbeat: Interval,
    seq: Option<u64>,
    channels: HashSet<String>,
}

impl GatewayConnection {
    async fn send_heartbeat(&mut self) -> Result<()> {
        let payload = json!({ "op": OP_HEARTBEAT, "d": self.seq });
        self.sink
            .send(Message::Text(payload.to_string()))
            .await
            .context("discord heartbeat")
    }

    fn channel_allowed(&self, channel_id: &str) -> bool {
        self.channels.is_empty() || self.channels.contains(channel_id)
    }
}

#[async_trait]
impl ChatConnection for GatewayConnection {
    async fn next_item(&mut self) -> Option<Result<RawItem>> {
        loop {
            tokio::select! {
                _ = self.heartbeat.tick() => {
                    if let Err(e) = self.send_heartbeat().await {
                        tracing::warn!(target: "scanner", source = "discord", error = %format!("{e:#}"), "heartbeat failed");
                        return None;
                    }
                }
                frame = self.stream.next() => {
                    let text = match frame {
                        None => return None,
                        Some(Err(e)) => {
                            tracing::warn!(target: "scanner", source = "discord", error = %e, "gateway read failed");
                            return None;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(target: "scanner", source = "discord", ?frame, "gateway closed");
                            return None;
                        }
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(_)) => continue,
                    };
                    match parse_event(&text) {
                        Ok(GatewayEvent::Message { seq, channel_id, from_bot, item }) => {
                            self.seq = seq.or(self.seq);
                            if from_bot || !self.channel_allowed(&channel_id) {
                                continue;
                            }
                            return Some(Ok(item));
                        }
                        Ok(GatewayEvent::Dispatch { seq }) => self.seq = seq.or(self.seq),
                        Ok(GatewayEvent::HeartbeatRequest) => {
                            if self.send_heartbeat().await.is_err() {
                                return None;
                            }
                        }
                        Ok(GatewayEvent::Reconnect) | Ok(GatewayEvent::InvalidSession) => {
                            tracing::info!(target: "scanner", source = "discord", "gateway asked to reconnect");
                            return None;
                        }
                        Ok(_) => {}
                        Err(e) => return Some(Err(e)),
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

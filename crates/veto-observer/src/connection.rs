//! Per-connection WebSocket adapter.
//!
//! Each upgraded socket is registered with the hub, gets its `room:state`
//! snapshot queued, and is then split into a writer task and a reader loop.
//! The writer drains the connection's direct replies ahead of the hub
//! queue, and sends a ping whenever the socket has been idle for the
//! configured interval. The reader decodes commands,
//! checks them against the room's active session and dispatches them to
//! the [`VetoBridge`]. When the reader ends, the connection unregisters,
//! which closes the hub queue and lets the writer close the socket.

use core::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitStream;
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, warn};
use veto_core::config::HubConfig;
use veto_core::{VetoError, parse_side, parse_team};
use veto_types::{ConnectionId, RoomId, UserId};

use crate::bridge::VetoBridge;
use crate::hub::{Frame, HubError, Registration};
use crate::protocol::{
    self, InboundCommand, NO_ACTIVE_SESSION_CODE, ProtocolError, SESSION_MISMATCH_CODE,
    ServerMessage,
};

const MIN_PING_INTERVAL: Duration = Duration::from_secs(1);

/// Timing and buffer limits applied to every room connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Outbound frames buffered before the hub evicts the connection.
    pub outbound_buffer: usize,
    /// Idle time before a ping is sent.
    pub ping_interval: Duration,
    /// Read silence after which the peer is dropped.
    pub pong_timeout: Duration,
    /// Upper bound for one socket write.
    pub write_timeout: Duration,
    /// Largest accepted inbound frame.
    pub max_message_bytes: usize,
}

impl ConnectionSettings {
    /// Settings from the `hub` configuration section.
    pub const fn from_config(config: &HubConfig) -> Self {
        Self {
            outbound_buffer: config.outbound_buffer,
            ping_interval: config.ping_interval(),
            pong_timeout: config.pong_timeout(),
            write_timeout: config.write_timeout(),
            max_message_bytes: config.max_message_bytes,
        }
    }

    const fn queue_capacity(&self) -> usize {
        if self.outbound_buffer == 0 {
            1
        } else {
            self.outbound_buffer
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_config(&HubConfig::default())
    }
}

/// Queues drained by [`write_loop`].
#[derive(Debug)]
pub struct Outbound {
    /// Frames fanned out by the hub.
    pub hub_frames: mpsc::Receiver<Frame>,
    /// Replies addressed to this connection only.
    pub direct_frames: mpsc::Receiver<Frame>,
}

/// A registered connection whose `room:state` snapshot is already queued.
#[derive(Debug)]
pub struct Attachment {
    /// The connection's hub identity.
    pub connection_id: ConnectionId,
    /// Sender for direct replies.
    pub replies: mpsc::Sender<Frame>,
    /// Everything the writer has to deliver.
    pub outbound: Outbound,
}

/// Register with the hub and queue the initial `room:state`.
///
/// Broadcasts enqueued after registration land in the hub queue, which the
/// writer only drains once the snapshot has gone out.
///
/// # Errors
///
/// Returns [`HubError::Stopped`] when the hub no longer accepts members.
pub async fn attach(
    bridge: &VetoBridge,
    room_id: RoomId,
    user_id: UserId,
    settings: ConnectionSettings,
) -> Result<Attachment, HubError> {
    let connection_id = ConnectionId::new();
    let (outbound, hub_frames) = mpsc::channel(settings.queue_capacity());
    let (replies, direct_frames) = mpsc::channel(settings.queue_capacity());

    bridge
        .hub()
        .register(Registration {
            room_id,
            user_id,
            connection_id,
            outbound,
        })
        .await?;

    let initial = match bridge.room_state(room_id).await {
        Ok(state) => ServerMessage::RoomState(Box::new(state)),
        Err(e) => rejection(&e),
    };
    send_reply(&replies, &initial).await;

    Ok(Attachment {
        connection_id,
        replies,
        outbound: Outbound {
            hub_frames,
            direct_frames,
        },
    })
}

/// Run one room connection until the peer goes away.
pub async fn serve(
    socket: WebSocket,
    bridge: Arc<VetoBridge>,
    room_id: RoomId,
    user_id: UserId,
    settings: ConnectionSettings,
) {
    let Attachment {
        connection_id,
        replies,
        outbound,
    } = match attach(&bridge, room_id, user_id, settings).await {
        Ok(attachment) => attachment,
        Err(e) => {
            warn!(%room_id, %user_id, error = %e, "Could not register observer");
            return;
        }
    };

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(sink, outbound, settings));

    read_loop(stream, &bridge, room_id, user_id, &replies, settings).await;

    bridge.hub().unregister(room_id, connection_id);
    drop(replies);
    if timeout(settings.write_timeout, &mut writer).await.is_err() {
        writer.abort();
    }
    debug!(%room_id, %user_id, %connection_id, "Observer connection closed");
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    bridge: &VetoBridge,
    room_id: RoomId,
    user_id: UserId,
    replies: &mpsc::Sender<Frame>,
    settings: ConnectionSettings,
) {
    loop {
        let message = match timeout(settings.pong_timeout, stream.next()).await {
            Err(_elapsed) => {
                debug!(%room_id, %user_id, "Observer silent past the pong timeout");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(%room_id, %user_id, error = %e, "WebSocket read failed");
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        let reply = match message {
            Message::Text(text) => handle_frame(bridge, room_id, user_id, text.as_str()).await,
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => handle_frame(bridge, room_id, user_id, text).await,
                Err(_utf8_err) => Some(ServerMessage::protocol_error(&ProtocolError::Malformed)),
            },
            Message::Close(_) => break,
            // Any frame, pongs included, restarts the read deadline.
            Message::Ping(_) | Message::Pong(_) => None,
        };
        if let Some(reply) = reply {
            send_reply(replies, &reply).await;
        }
    }
}

/// Deliver queued frames to `sink` until the hub drops the connection or a
/// write fails.
///
/// Direct replies always go out before pending hub frames.
pub async fn write_loop<S>(mut sink: S, outbound: Outbound, settings: ConnectionSettings)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let Outbound {
        mut hub_frames,
        mut direct_frames,
    } = outbound;
    let period = settings.ping_interval.max(MIN_PING_INTERVAL);
    let mut ping = interval(period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate first tick.
    ping.reset();

    loop {
        let message = tokio::select! {
            biased;
            Some(frame) = direct_frames.recv() => text_message(&frame),
            frame = hub_frames.recv() => match frame {
                Some(frame) => text_message(&frame),
                None => {
                    if timeout(settings.write_timeout, sink.send(Message::Close(None))).await.is_err() {
                        debug!("Close frame timed out");
                    }
                    break;
                }
            },
            _ = ping.tick() => Message::Ping(Bytes::new()),
        };

        match timeout(settings.write_timeout, sink.send(message)).await {
            Ok(Ok(())) => ping.reset(),
            Ok(Err(e)) => {
                debug!(error = %e, "WebSocket write failed");
                break;
            }
            Err(_elapsed) => {
                debug!("WebSocket write timed out");
                break;
            }
        }
    }
}

fn text_message(frame: &Frame) -> Message {
    Message::Text(frame.to_string().into())
}

async fn send_reply(replies: &mpsc::Sender<Frame>, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(json) => {
            if replies.send(Frame::from(json)).await.is_err() {
                debug!("Writer gone, reply dropped");
            }
        }
        Err(e) => warn!(error = %e, "Failed to serialize reply"),
    }
}

/// Decode and execute one inbound frame.
///
/// Returns the direct reply for the sender, if any. Accepted mutations
/// reply nothing directly; their result reaches the sender through the
/// room broadcast like every other member.
pub async fn handle_frame(
    bridge: &VetoBridge,
    room_id: RoomId,
    user_id: UserId,
    frame: &str,
) -> Option<ServerMessage> {
    match protocol::decode(frame) {
        Ok(command) => dispatch(bridge, room_id, user_id, command).await,
        Err(e) => {
            debug!(%room_id, %user_id, error = %e, "Undecodable frame");
            Some(ServerMessage::protocol_error(&e))
        }
    }
}

/// Execute a decoded command on behalf of a room member.
pub async fn dispatch(
    bridge: &VetoBridge,
    room_id: RoomId,
    user_id: UserId,
    command: InboundCommand,
) -> Option<ServerMessage> {
    let Some(session_id) = command.session_id() else {
        return Some(ServerMessage::pong());
    };

    match bridge.active_session(room_id).await {
        Ok(Some(active)) if active == session_id => {}
        Ok(Some(_)) => {
            return Some(ServerMessage::error(
                "session_id mismatch",
                SESSION_MISMATCH_CODE,
            ));
        }
        Ok(None) => {
            return Some(ServerMessage::error(
                "no veto session in room",
                NO_ACTIVE_SESSION_CODE,
            ));
        }
        Err(e) => return Some(rejection(&e)),
    }

    match execute(bridge, user_id, command).await {
        Ok(()) => None,
        Err(e) => {
            debug!(%room_id, %user_id, %session_id, code = e.code(), "Room command rejected");
            Some(rejection(&e))
        }
    }
}

async fn execute(
    bridge: &VetoBridge,
    user_id: UserId,
    command: InboundCommand,
) -> Result<(), VetoError> {
    let user = Some(user_id);
    match command {
        InboundCommand::Ban(cmd) => {
            let team = parse_team(&cmd.team)?;
            bridge.ban(cmd.session_id, cmd.map_id, team, user).await?;
        }
        InboundCommand::Pick(cmd) => {
            let team = parse_team(&cmd.team)?;
            bridge.pick(cmd.session_id, cmd.map_id, team, user).await?;
        }
        InboundCommand::SelectSide(cmd) => {
            let team = parse_team(&cmd.team)?;
            let side = parse_side(&cmd.side)?;
            bridge.select_side(cmd.session_id, team, side, user).await?;
        }
        InboundCommand::Start(cmd) => {
            bridge.start(cmd.session_id, user).await?;
        }
        InboundCommand::Reset(cmd) => {
            bridge.reset(cmd.session_id, user).await?;
        }
        InboundCommand::Ping => {}
    }
    Ok(())
}

fn rejection(err: &VetoError) -> ServerMessage {
    ServerMessage::error(err.to_string(), err.code())
}

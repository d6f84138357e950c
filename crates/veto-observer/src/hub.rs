//! Room broadcast hub.
//!
//! A single coordinator task owns every write to the room membership table.
//! Register, unregister and broadcast requests arrive on one unbounded
//! intake queue and are processed strictly in arrival order, so a broadcast
//! enqueued after a registration completed always reaches the new member
//! and one enqueued before never does.
//!
//! Each member owns a bounded outbound queue. A member whose queue is full
//! or closed when a frame is delivered is evicted on the spot instead of
//! stalling the rest of the room.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use veto_types::{ConnectionId, RoomId, UserId};

use crate::protocol::{PresencePayload, ServerMessage};

/// A serialized outbound frame, shared by every member it is delivered to.
pub type Frame = Arc<str>;

/// A connection asking to join a room.
#[derive(Debug)]
pub struct Registration {
    /// Room to join.
    pub room_id: RoomId,
    /// User behind the connection.
    pub user_id: UserId,
    /// Unique connection identity.
    pub connection_id: ConnectionId,
    /// The connection's outbound queue. The hub holds the only sender;
    /// dropping it closes the connection's writer.
    pub outbound: mpsc::Sender<Frame>,
}

/// Public view of one room member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberInfo {
    /// The member's connection.
    pub connection_id: ConnectionId,
    /// The member's user.
    pub user_id: UserId,
}

/// Errors returned to callers of [`HubHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The coordinator has stopped and accepts no more requests.
    #[error("room hub is stopped")]
    Stopped,
}

#[derive(Debug)]
struct Member {
    user_id: UserId,
    outbound: mpsc::Sender<Frame>,
}

type Rooms = HashMap<RoomId, HashMap<ConnectionId, Member>>;

#[derive(Debug)]
enum HubRequest {
    Register {
        registration: Registration,
        ack: oneshot::Sender<()>,
    },
    Unregister {
        room_id: RoomId,
        connection_id: ConnectionId,
    },
    Broadcast {
        room_id: RoomId,
        message: ServerMessage,
    },
    Stop,
}

/// Cloneable handle for talking to the hub coordinator.
#[derive(Debug, Clone)]
pub struct HubHandle {
    intake: mpsc::UnboundedSender<HubRequest>,
    rooms: Arc<RwLock<Rooms>>,
}

impl HubHandle {
    /// Add a connection to its room.
    ///
    /// Resolves once the coordinator has processed the registration, so
    /// every broadcast enqueued after this returns is delivered to it.
    pub async fn register(&self, registration: Registration) -> Result<(), HubError> {
        let (ack, done) = oneshot::channel();
        self.intake
            .send(HubRequest::Register { registration, ack })
            .map_err(|_send_err| HubError::Stopped)?;
        done.await.map_err(|_recv_err| HubError::Stopped)
    }

    /// Remove a connection from its room and close its outbound queue.
    pub fn unregister(&self, room_id: RoomId, connection_id: ConnectionId) {
        if self
            .intake
            .send(HubRequest::Unregister {
                room_id,
                connection_id,
            })
            .is_err()
        {
            debug!(%room_id, %connection_id, "Hub stopped, unregister dropped");
        }
    }

    /// Deliver a message to every current member of a room.
    ///
    /// Never fails: delivery problems are handled by evicting members.
    pub fn broadcast(&self, room_id: RoomId, message: ServerMessage) {
        if self
            .intake
            .send(HubRequest::Broadcast { room_id, message })
            .is_err()
        {
            debug!(%room_id, "Hub stopped, broadcast dropped");
        }
    }

    /// Current number of members in a room.
    pub async fn member_count(&self, room_id: RoomId) -> usize {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .map_or(0, HashMap::len)
    }

    /// Snapshot of a room's members.
    pub async fn members(&self, room_id: RoomId) -> Vec<MemberInfo> {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .map(|members| {
                members
                    .iter()
                    .map(|(connection_id, member)| MemberInfo {
                        connection_id: *connection_id,
                        user_id: member.user_id,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of rooms with at least one member.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

/// The running coordinator and the means to stop it.
#[derive(Debug)]
pub struct Hub {
    handle: HubHandle,
    task: JoinHandle<()>,
}

impl Hub {
    /// Spawn the coordinator on the current Tokio runtime.
    pub fn start() -> Self {
        let (intake, requests) = mpsc::unbounded_channel();
        let rooms = Arc::new(RwLock::new(Rooms::new()));
        let coordinator = Coordinator {
            requests,
            rooms: Arc::clone(&rooms),
        };
        let task = tokio::spawn(coordinator.run());
        info!("Room hub started");
        Self {
            handle: HubHandle { intake, rooms },
            task,
        }
    }

    /// A handle for registering connections and broadcasting.
    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Stop the coordinator after it drains requests already queued.
    ///
    /// Every member's outbound queue is closed, which ends their writers.
    pub async fn stop(self) {
        if self.handle.intake.send(HubRequest::Stop).is_err() {
            debug!("Hub coordinator already gone");
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "Hub coordinator ended abnormally");
        }
        info!("Room hub stopped");
    }
}

struct Coordinator {
    requests: mpsc::UnboundedReceiver<HubRequest>,
    rooms: Arc<RwLock<Rooms>>,
}

impl Coordinator {
    async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            match request {
                HubRequest::Register { registration, ack } => {
                    self.register(registration).await;
                    if ack.send(()).is_err() {
                        debug!("Registrant went away before the ack");
                    }
                }
                HubRequest::Unregister {
                    room_id,
                    connection_id,
                } => self.unregister(room_id, connection_id).await,
                HubRequest::Broadcast { room_id, message } => {
                    self.broadcast(room_id, &message).await;
                }
                HubRequest::Stop => break,
            }
        }
        self.rooms.write().await.clear();
    }

    async fn register(&self, registration: Registration) {
        let Registration {
            room_id,
            user_id,
            connection_id,
            outbound,
        } = registration;

        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(room_id).or_default();
        members.insert(connection_id, Member { user_id, outbound });
        let count = members.len();
        debug!(%room_id, %user_id, %connection_id, members = count, "Observer joined room");

        let join = ServerMessage::RoomJoin(PresencePayload {
            room_id,
            user_id,
            connection_id,
            members: count,
        });
        if let Some(frame) = encode(&join) {
            deliver(&mut rooms, room_id, &frame, Some(connection_id));
        }
    }

    async fn unregister(&self, room_id: RoomId, connection_id: ConnectionId) {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(&room_id) else {
            return;
        };
        let Some(member) = members.remove(&connection_id) else {
            return;
        };
        let user_id = member.user_id;
        // Dropping the member closes its outbound queue.
        drop(member);
        let remaining = members.len();
        if remaining == 0 {
            rooms.remove(&room_id);
        }
        debug!(%room_id, %user_id, %connection_id, members = remaining, "Observer left room");

        if remaining > 0 {
            let leave = ServerMessage::RoomLeave(PresencePayload {
                room_id,
                user_id,
                connection_id,
                members: remaining,
            });
            if let Some(frame) = encode(&leave) {
                deliver(&mut rooms, room_id, &frame, None);
            }
        }
    }

    async fn broadcast(&self, room_id: RoomId, message: &ServerMessage) {
        let mut rooms = self.rooms.write().await;
        if !rooms.contains_key(&room_id) {
            return;
        }
        if let Some(frame) = encode(message) {
            deliver(&mut rooms, room_id, &frame, None);
        }
    }
}

fn encode(message: &ServerMessage) -> Option<Frame> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Frame::from(json)),
        Err(e) => {
            warn!(error = %e, "Failed to serialize room message");
            None
        }
    }
}

/// Offer `frame` to every member of the room except `exclude`, evicting
/// members whose queue is full or closed.
fn deliver(rooms: &mut Rooms, room_id: RoomId, frame: &Frame, exclude: Option<ConnectionId>) {
    let Some(members) = rooms.get_mut(&room_id) else {
        return;
    };
    members.retain(|connection_id, member| {
        if Some(*connection_id) == exclude {
            return true;
        }
        match member.outbound.try_send(Arc::clone(frame)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%room_id, %connection_id, user_id = %member.user_id, "Evicting slow observer");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(%room_id, %connection_id, "Dropping closed observer");
                false
            }
        }
    });
    if members.is_empty() {
        rooms.remove(&room_id);
    }
}

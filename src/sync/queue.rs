//! The `SyncQueue` broker contract and an in-memory implementation. The
//! ack model is explicit ack/nack against `SyncQueue` rather than
//! broker-side auto-ack, so a crash mid-processing leaves the message
//! redeliverable instead of silently dropped.
//!
//! Modeled as a trait rather than a concrete RabbitMQ binding: a durable,
//! cross-process broker is a host integration concern and stays out of
//! scope here. [`InMemorySyncQueue`] is the default a host without
//! cross-process durability needs wires in, built on a `tokio::sync::mpsc`
//! channel the way `Plawn-r2e/r2e-executor`'s worker pool feeds its
//! workers.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{ScimError, ScimResult};

/// A unit of group-sync work: one affected member of one changed group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSyncMessage {
    pub group_id: String,
    pub member_id: String,
    /// 1-based attempt count. The worker increments this itself before
    /// requeueing; callers that first submit a message always pass `1`.
    pub trial: u32,
}

impl GroupSyncMessage {
    pub fn new(group_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        GroupSyncMessage {
            group_id: group_id.into(),
            member_id: member_id.into(),
            trial: 1,
        }
    }

    /// The same logical task, one trial later.
    pub fn retry(&self) -> Self {
        GroupSyncMessage {
            group_id: self.group_id.clone(),
            member_id: self.member_id.clone(),
            trial: self.trial + 1,
        }
    }
}

/// The broker contract the group-sync worker consumes and the Group
/// service wrappers publish to. `&self` throughout (not `&mut self`): a
/// queue is a shared resource callers hold behind `Arc`, the same
/// constraint `ResourceStore` carries.
pub trait SyncQueue: Send + Sync {
    /// Publish one message. Used both by the Group service wrappers
    /// (`services::group`) fanning out a [`super::diff::Diff`] and by the
    /// worker's own group-expand step.
    fn publish(&self, message: GroupSyncMessage) -> impl Future<Output = ScimResult<()>> + Send;

    /// Block until a message is available or `cancel` fires. `None` means
    /// cancellation won the race and the receive loop should stop pulling
    /// new work.
    fn receive(&self, cancel: &CancellationToken) -> impl Future<Output = Option<GroupSyncMessage>> + Send;

    /// Acknowledge successful processing of a message this queue handed
    /// out via [`SyncQueue::receive`].
    fn ack(&self, message: &GroupSyncMessage) -> impl Future<Output = ScimResult<()>> + Send;

    /// Negative-acknowledge: re-publish `message` (already bumped to its
    /// next `trial` by the caller) so another `receive` can pick it up.
    fn nack(&self, message: GroupSyncMessage) -> impl Future<Output = ScimResult<()>> + Send {
        self.publish(message)
    }

    /// Whether the underlying connection is up, for `GET /Health`.
    /// Side-effect-free, unlike `publish`/`receive` — a
    /// concrete broker binding overrides this with its own connection
    /// check; the default assumes an always-up in-process channel.
    fn is_connected(&self) -> impl Future<Output = bool> + Send {
        async { true }
    }
}

/// A `tokio::sync::mpsc`-backed [`SyncQueue`] with no cross-process
/// durability — the default for tests and for hosts that don't need one.
/// `ack` is a no-op: once [`InMemorySyncQueue::receive`]
/// hands a message out it is already gone from the channel, so there is
/// nothing left to acknowledge against; `nack`/[`SyncQueue::nack`]'s default
/// `publish`-based re-enqueue is what actually matters here.
pub struct InMemorySyncQueue {
    sender: mpsc::UnboundedSender<GroupSyncMessage>,
    receiver: Mutex<mpsc::UnboundedReceiver<GroupSyncMessage>>,
}

impl InMemorySyncQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        InMemorySyncQueue {
            sender,
            receiver: Mutex::new(receiver),
        }
    }
}

impl Default for InMemorySyncQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncQueue for InMemorySyncQueue {
    async fn publish(&self, message: GroupSyncMessage) -> ScimResult<()> {
        self.sender
            .send(message)
            .map_err(|_| ScimError::internal("group_sync queue receiver has been dropped"))
    }

    async fn receive(&self, cancel: &CancellationToken) -> Option<GroupSyncMessage> {
        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            message = receiver.recv() => message,
        }
    }

    async fn ack(&self, _message: &GroupSyncMessage) -> ScimResult<()> {
        Ok(())
    }
}

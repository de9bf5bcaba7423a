use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::shared::error::CommandError;
use crate::shared::types::{CommandOutcome, CommandRequest};

/// A request waiting in the queue together with the channel its outcome is
/// reported on.
#[derive(Debug)]
pub struct QueuedCommand {
    pub request: CommandRequest,
    reply: oneshot::Sender<CommandOutcome>,
}

impl QueuedCommand {
    /// Deliver the outcome. The issuer may have dropped its ticket already.
    pub fn respond(self, outcome: CommandOutcome) {
        let _ = self.reply.send(outcome);
    }
}

/// Handle returned by a successful enqueue.
#[derive(Debug)]
pub struct CommandTicket {
    request_id: Uuid,
    receiver: oneshot::Receiver<CommandOutcome>,
}

impl CommandTicket {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Wait for the executor to finish with this request.
    pub async fn outcome(self) -> CommandOutcome {
        self.receiver.await.unwrap_or(Err(CommandError::Cancelled))
    }
}

/// Producer side of the bounded command queue. Cheap to clone.
#[derive(Clone)]
pub struct CommandQueue {
    sender: mpsc::Sender<QueuedCommand>,
    capacity: usize,
}

/// Consumer side, owned by the executor.
pub struct CommandReceiver {
    receiver: mpsc::Receiver<QueuedCommand>,
}

impl CommandQueue {
    pub fn bounded(capacity: usize) -> (Self, CommandReceiver) {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender, capacity }, CommandReceiver { receiver })
    }

    /// Never waits: a full queue is reported as `QueueFull` immediately.
    pub fn enqueue(&self, request: CommandRequest) -> Result<CommandTicket, CommandError> {
        let (reply, receiver) = oneshot::channel();
        let request_id = request.request_id;
        let key = request.key.clone();
        let kind = request.kind;

        match self.sender.try_send(QueuedCommand { request, reply }) {
            Ok(()) => {
                debug!(%key, %kind, %request_id, pending = self.pending(), "Command enqueued");
                Ok(CommandTicket {
                    request_id,
                    receiver,
                })
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%key, %kind, "Command queue is full");
                Err(CommandError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(%key, %kind, "Command queue is closed");
                Err(CommandError::Cancelled)
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests currently waiting for the executor.
    pub fn pending(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl CommandReceiver {
    pub async fn recv(&mut self) -> Option<QueuedCommand> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<QueuedCommand> {
        self.receiver.try_recv().ok()
    }

    /// Refuse further enqueues; already queued requests stay readable.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

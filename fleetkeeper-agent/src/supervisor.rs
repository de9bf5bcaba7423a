//! Process wiring: one reconciliation task, one command executor, and the
//! surface handed to front-ends (Store reads, enqueue, status stream).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::features::command_dispatch::{
    CommandController, CommandExecutor, CommandQueue, CommandTicket,
};
use crate::features::reconciliation::{ReconciliationController, Reconciler};
use crate::features::state_store::StateStore;
use crate::shared::error::CommandError;
use crate::shared::runtime::{RuntimeClient, SnapshotSource};
use crate::shared::types::{CommandKind, CommandRequest, Settings, StatusChanged};

pub const STATUS_CHANNEL_CAPACITY: usize = 10;

pub struct Supervisor {
    store: StateStore,
    queue: CommandQueue,
    cancel: CancellationToken,
    reconciliation: JoinHandle<()>,
    executor: JoinHandle<()>,
}

impl Supervisor {
    /// Start both background tasks. Must be called inside a Tokio runtime.
    pub fn start(
        settings: Settings,
        source: Arc<dyn SnapshotSource>,
        runtime: Arc<dyn RuntimeClient>,
    ) -> (Self, mpsc::Receiver<StatusChanged>) {
        let capacity = settings.command_queue_capacity;
        let store = StateStore::new(settings);
        let (queue, receiver) = CommandQueue::bounded(capacity);
        let (events_tx, events_rx) = mpsc::channel(STATUS_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let reconciler = Reconciler::new(store.clone(), Arc::clone(&source), queue.clone(), events_tx);
        let reconciliation = ReconciliationController::new(reconciler, cancel.child_token()).spawn();

        let executor = CommandExecutor::new(store.clone(), runtime, source);
        let executor = CommandController::new(executor, receiver, cancel.child_token()).spawn();

        info!(queue_capacity = queue.capacity(), "Supervisor started");

        (
            Self {
                store,
                queue,
                cancel,
                reconciliation,
                executor,
            },
            events_rx,
        )
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Operator request using the configured `command_timeout` for stop and
    /// restart.
    pub fn operator_request(&self, kind: CommandKind, key: impl Into<String>) -> CommandRequest {
        let timeout = match kind {
            CommandKind::Start => 0,
            CommandKind::Stop | CommandKind::Restart => self.store.get_settings().command_timeout,
        };
        CommandRequest::new(kind, key, timeout)
    }

    pub fn enqueue(&self, request: CommandRequest) -> Result<CommandTicket, CommandError> {
        self.queue.enqueue(request)
    }

    /// Swap in reloaded settings; the next tick picks them up.
    pub fn apply_settings(&self, settings: Settings) {
        info!(
            containers = settings.registered_containers.len(),
            interval_secs = settings.regular_task.interval,
            "Applying settings"
        );
        if settings.command_queue_capacity != self.queue.capacity() {
            warn!(
                configured = settings.command_queue_capacity,
                active = self.queue.capacity(),
                "Command queue capacity changes take effect after restart"
            );
        }
        self.store.set_settings(settings);
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signal both tasks and wait for them to exit.
    pub async fn shutdown(self) {
        info!("Shutting down supervisor");
        self.cancel.cancel();

        for (name, handle) in [
            ("reconciliation", self.reconciliation),
            ("executor", self.executor),
        ] {
            if let Err(error) = handle.await {
                warn!(task = name, error = %error, "Background task ended abnormally");
            }
        }
    }
}

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::features::command_dispatch::repo::{CommandReceiver, QueuedCommand};
use crate::features::command_dispatch::service::CommandExecutor;
use crate::shared::error::CommandError;

/// Single consumer of the command queue. Requests run strictly one at a time
/// in arrival order.
pub struct CommandController {
    executor: CommandExecutor,
    receiver: CommandReceiver,
    cancel: CancellationToken,
}

impl CommandController {
    pub fn new(
        executor: CommandExecutor,
        receiver: CommandReceiver,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            executor,
            receiver,
            cancel,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("Command executor started");

        loop {
            let queued = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                queued = self.receiver.recv() => match queued {
                    Some(queued) => queued,
                    None => break,
                },
            };
            self.handle(queued).await;
        }

        self.receiver.close();
        let mut abandoned = 0usize;
        while let Some(queued) = self.receiver.try_recv() {
            queued.respond(Err(CommandError::Cancelled));
            abandoned += 1;
        }
        info!(abandoned, "Command executor stopped");
    }

    async fn handle(&self, queued: QueuedCommand) {
        let outcome = self.executor.execute(&queued.request).await;
        let request = &queued.request;

        match &outcome {
            Ok(completed) => info!(
                request_id = %request.request_id,
                key = %request.key,
                kind = %request.kind,
                status = ?completed.snapshot.as_ref().map(|s| s.status()),
                "Command completed"
            ),
            Err(error) => warn!(
                request_id = %request.request_id,
                key = %request.key,
                kind = %request.kind,
                code = error.code(),
                error = %error,
                "Command failed"
            ),
        }

        queued.respond(outcome);
    }
}

use super::Executor;
use crate::command::SendCommand;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

/// Fixed set of execution slots; one spawned task per accepted command.
pub(super) struct SlotPool {
    permits: Arc<Semaphore>,
    capacity: u32,
}

impl SlotPool {
    pub(super) fn new(capacity: usize) -> Self {
        let capacity = capacity.min(Semaphore::MAX_PERMITS).min(u32::MAX as usize);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity: capacity as u32,
        }
    }

    /// Takes a slot without waiting and spawns the command on it.
    pub(super) fn try_dispatch(&self, cmd: SendCommand, executor: &Arc<Executor>, runtime: &Handle) -> bool {
        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            return false;
        };

        let executor = Arc::clone(executor);
        runtime.spawn(async move {
            executor.run(cmd).await;
            drop(permit); // Release slot
        });
        true
    }

    /// Returns once every slot taken before the call has been released.
    ///
    /// The semaphore queues waiters fairly, so while this waits for the busy
    /// slots, freed permits go to it and `try_dispatch` finds none.
    pub(super) async fn drain(&self) {
        if let Ok(all) = self.permits.acquire_many(self.capacity).await {
            drop(all);
        }
    }
}

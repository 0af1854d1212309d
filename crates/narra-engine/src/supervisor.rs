//! Background task supervision. Each task runs on a dedicated named OS
//! thread; a dashmap keyed by task id enforces the one-task-per-key
//! invariant and carries the cooperative cancel flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use dashmap::DashMap;

use narra_core::errors::{NarraError, NarraResult};

/// Cooperative cancellation flag, checked by tasks at their own
/// suspension points (the writing loop checks at chapter boundaries).
pub type CancelFlag = Arc<AtomicBool>;

struct TaskHandle {
    cancel: CancelFlag,
    thread: JoinHandle<()>,
}

#[derive(Default)]
pub struct TaskSupervisor {
    tasks: DashMap<String, TaskHandle>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` under `key`, rejecting the spawn when a live task
    /// already holds the key. This is the explicit one-generation-task-
    /// per-session guard.
    pub fn spawn(
        &self,
        key: &str,
        thread_name: &str,
        task: impl FnOnce(CancelFlag) + Send + 'static,
    ) -> NarraResult<()> {
        use dashmap::mapref::entry::Entry;

        let cancel: CancelFlag = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();

        match self.tasks.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                if !slot.get().thread.is_finished() {
                    return Err(NarraError::PreconditionFailed(format!(
                        "a task is already running for {key}"
                    )));
                }
                let thread = spawn_thread(thread_name, flag, task)?;
                slot.insert(TaskHandle { cancel, thread });
            }
            Entry::Vacant(slot) => {
                let thread = spawn_thread(thread_name, flag, task)?;
                slot.insert(TaskHandle { cancel, thread });
            }
        }
        Ok(())
    }

    /// Requests cooperative cancellation. Returns whether a live task
    /// was signalled.
    pub fn cancel(&self, key: &str) -> bool {
        match self.tasks.get(key) {
            Some(handle) if !handle.thread.is_finished() => {
                handle.cancel.store(true, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }

    pub fn is_running(&self, key: &str) -> bool {
        self.tasks
            .get(key)
            .map(|handle| !handle.thread.is_finished())
            .unwrap_or(false)
    }

    /// Blocks until the task under `key` finishes (no-op when absent).
    /// Primarily for tests and graceful shutdown.
    pub fn join(&self, key: &str) {
        if let Some((_, handle)) = self.tasks.remove(key) {
            let _ = handle.thread.join();
        }
    }
}

fn spawn_thread(
    name: &str,
    cancel: CancelFlag,
    task: impl FnOnce(CancelFlag) + Send + 'static,
) -> NarraResult<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || task(cancel))
        .map_err(|e| NarraError::PreconditionFailed(format!("failed to spawn task thread: {e}")))
}

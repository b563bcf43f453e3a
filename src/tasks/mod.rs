//! Bookkeeping for background passes: status channels, cooperative
//! cancellation, and a manager to poll them.
//!
//! Auto-assignment runs over potentially thousands of faces, so it is
//! dispatched to a worker thread; the caller keeps only a task id and
//! polls the manager for status. There is no result channel.

pub mod manager;

use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;

pub use manager::BackgroundTaskManager;

/// Unique identifier for a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

impl TaskId {
    fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        TaskId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

/// Progress of a running task.
#[derive(Debug, Clone)]
pub struct TaskProgress {
    pub current: usize,
    pub total: usize,
    pub message: Option<String>,
}

impl TaskProgress {
    pub fn new(current: usize, total: usize) -> Self {
        Self {
            current,
            total,
            message: None,
        }
    }

    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Progress percentage, 0-100.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            ((self.current as f64 / self.total as f64) * 100.0).min(100.0) as u8
        }
    }
}

/// State of a background task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Completed,
    Cancelled,
    Failed(String),
}

/// Updates a background pass sends over its channel.
#[derive(Debug, Clone)]
pub enum TaskUpdate {
    /// The pass has started with this many items to process.
    Started { total: usize },
    /// Progress during processing.
    Progress(TaskProgress),
    /// Finished successfully.
    Completed { message: String },
    /// Stopped at a cancellation point.
    Cancelled,
    /// Aborted with an error.
    Failed { error: String },
}

/// A registered background task and its communication endpoints.
pub struct BackgroundTask {
    pub id: TaskId,
    pub name: String,
    pub state: TaskState,
    pub progress: Option<TaskProgress>,
    pub cancel_flag: Arc<AtomicBool>,
    pub receiver: mpsc::Receiver<TaskUpdate>,
}

impl BackgroundTask {
    fn new(
        name: impl Into<String>,
        cancel_flag: Arc<AtomicBool>,
        receiver: mpsc::Receiver<TaskUpdate>,
    ) -> Self {
        Self {
            id: TaskId::next(),
            name: name.into(),
            state: TaskState::Running,
            progress: None,
            cancel_flag,
            receiver,
        }
    }

    /// Request cooperative cancellation; the pass stops at its next
    /// cancellation point.
    pub fn cancel(&self) {
        self.cancel_flag
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }
}

/// Terminal status delivered by [`BackgroundTaskManager::poll_updates`].
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    pub id: TaskId,
    pub name: String,
    pub message: String,
    pub success: bool,
}

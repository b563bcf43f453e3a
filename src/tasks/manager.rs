//! Tracking and control of concurrent background tasks.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;

use super::{BackgroundTask, TaskCompletion, TaskId, TaskProgress, TaskState, TaskUpdate};

/// Owns every registered background task and drains their channels.
#[derive(Default)]
pub struct BackgroundTaskManager {
    tasks: HashMap<TaskId, BackgroundTask>,
    /// Registration order, for "cancel the most recent" semantics.
    task_order: Vec<TaskId>,
}

impl BackgroundTaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Returns its id, the sender the worker reports
    /// through, and the flag it checks for cancellation.
    pub fn register(
        &mut self,
        name: impl Into<String>,
    ) -> (TaskId, mpsc::Sender<TaskUpdate>, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::channel();
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let task = BackgroundTask::new(name, cancel_flag.clone(), rx);
        let id = task.id;

        self.tasks.insert(id, task);
        self.task_order.push(id);

        (id, tx, cancel_flag)
    }

    /// Whether a task with this name is currently running.
    pub fn is_running(&self, name: &str) -> bool {
        self.tasks
            .values()
            .any(|t| t.name == name && t.is_running())
    }

    /// Cancel a specific task. Returns false when it is not running.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        if let Some(task) = self.tasks.get(&id) {
            if task.is_running() {
                task.cancel();
                return true;
            }
        }
        false
    }

    /// Cancel the most recently registered running task.
    pub fn cancel_most_recent(&mut self) -> bool {
        for id in self.task_order.iter().rev() {
            if let Some(task) = self.tasks.get(id) {
                if task.is_running() {
                    task.cancel();
                    return true;
                }
            }
        }
        false
    }

    /// Cancel every running task.
    pub fn cancel_all(&mut self) {
        for task in self.tasks.values() {
            if task.is_running() {
                task.cancel();
            }
        }
    }

    /// Drain every task channel, folding updates into task state.
    /// Finished tasks are removed and returned.
    pub fn poll_updates(&mut self) -> Vec<TaskCompletion> {
        let mut completed = Vec::new();

        let task_ids: Vec<TaskId> = self.tasks.keys().copied().collect();
        for id in task_ids {
            let Some(task) = self.tasks.get_mut(&id) else {
                continue;
            };

            while let Ok(update) = task.receiver.try_recv() {
                match update {
                    TaskUpdate::Started { total } => {
                        task.progress = Some(TaskProgress::new(0, total));
                    }
                    TaskUpdate::Progress(progress) => {
                        task.progress = Some(progress);
                    }
                    TaskUpdate::Completed { message } => {
                        task.state = TaskState::Completed;
                        completed.push(TaskCompletion {
                            id,
                            name: task.name.clone(),
                            message,
                            success: true,
                        });
                    }
                    TaskUpdate::Cancelled => {
                        task.state = TaskState::Cancelled;
                        completed.push(TaskCompletion {
                            id,
                            name: task.name.clone(),
                            message: "Cancelled".to_string(),
                            success: false,
                        });
                    }
                    TaskUpdate::Failed { error } => {
                        task.state = TaskState::Failed(error.clone());
                        completed.push(TaskCompletion {
                            id,
                            name: task.name.clone(),
                            message: error,
                            success: false,
                        });
                    }
                }
            }
        }

        for info in &completed {
            self.tasks.remove(&info.id);
            self.task_order.retain(|id| *id != info.id);
        }

        completed
    }

    /// Currently running tasks in registration order.
    pub fn running_tasks(&self) -> Vec<&BackgroundTask> {
        self.task_order
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|t| t.is_running())
            .collect()
    }

    pub fn has_running_tasks(&self) -> bool {
        self.tasks.values().any(|t| t.is_running())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_poll_complete_lifecycle() {
        let mut manager = BackgroundTaskManager::new();
        let (id, tx, _cancel) = manager.register("auto-assign");
        assert!(manager.is_running("auto-assign"));
        assert!(manager.poll_updates().is_empty());

        tx.send(TaskUpdate::Started { total: 2 }).unwrap();
        tx.send(TaskUpdate::Progress(TaskProgress::new(1, 2))).unwrap();
        assert!(manager.poll_updates().is_empty());
        assert_eq!(manager.running_tasks()[0].progress.as_ref().unwrap().percent(), 50);

        tx.send(TaskUpdate::Completed {
            message: "Assigned 2 of 2 faces".to_string(),
        })
        .unwrap();

        let completed = manager.poll_updates();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, id);
        assert!(completed[0].success);
        assert!(!manager.is_running("auto-assign"));
        assert!(!manager.has_running_tasks());
    }

    #[test]
    fn cancel_flags_the_running_task() {
        let mut manager = BackgroundTaskManager::new();
        let (id, tx, cancel_flag) = manager.register("auto-assign");

        assert!(manager.cancel(id));
        assert!(cancel_flag.load(std::sync::atomic::Ordering::SeqCst));

        tx.send(TaskUpdate::Cancelled).unwrap();
        let completed = manager.poll_updates();
        assert_eq!(completed.len(), 1);
        assert!(!completed[0].success);
    }

    #[test]
    fn cancel_most_recent_picks_the_newest() {
        let mut manager = BackgroundTaskManager::new();
        let (_old, _tx1, old_flag) = manager.register("auto-assign");
        let (_new, _tx2, new_flag) = manager.register("auto-assign");

        assert!(manager.cancel_most_recent());
        assert!(!old_flag.load(std::sync::atomic::Ordering::SeqCst));
        assert!(new_flag.load(std::sync::atomic::Ordering::SeqCst));

        manager.cancel_all();
        assert!(old_flag.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn failed_tasks_surface_their_error() {
        let mut manager = BackgroundTaskManager::new();
        let (_id, tx, _cancel) = manager.register("auto-assign");

        tx.send(TaskUpdate::Failed {
            error: "database unavailable".to_string(),
        })
        .unwrap();

        let completed = manager.poll_updates();
        assert_eq!(completed[0].message, "database unavailable");
        assert!(!completed[0].success);
    }
}

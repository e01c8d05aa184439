use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::a2a::types::{Artifact, Message, Part, Task, TaskState, TaskStatus};

/// Why a task could not be canceled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelError {
    NotFound,
    NotCancelable(TaskState),
}

/// Finished tasks kept for `tasks/get` before the oldest are evicted.
pub const DEFAULT_RETAINED_TASKS: usize = 1_000;

/// Tasks created by `message/send`, kept in memory for `tasks/get`.
///
/// Running tasks are always kept. Once more than `retain` tasks have
/// reached a terminal state, the ones that finished first are dropped.
#[derive(Debug, Clone)]
pub struct TaskStore {
    inner: Arc<RwLock<Inner>>,
    retain: usize,
}

#[derive(Debug, Default)]
struct Inner {
    tasks: HashMap<String, Task>,
    /// Ids of terminal tasks, in the order they finished.
    finished: VecDeque<String>,
}

impl Inner {
    fn finish(&mut self, id: &str, retain: usize) {
        self.finished.push_back(id.to_string());
        while self.finished.len() > retain {
            if let Some(oldest) = self.finished.pop_front() {
                self.tasks.remove(&oldest);
            }
        }
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETAINED_TASKS)
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store keeping at most `retain` finished tasks.
    pub fn with_retention(retain: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            retain,
        }
    }

    /// Register a new `submitted` task for `message`.
    pub fn create(&self, message: &Message) -> Task {
        let id = uuid::Uuid::new_v4().to_string();
        let context_id = message
            .context_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut first = message.clone();
        first.task_id = Some(id.clone());
        first.context_id = Some(context_id.clone());

        let task = Task {
            id: id.clone(),
            context_id: Some(context_id),
            status: TaskStatus::now(TaskState::Submitted),
            artifacts: Vec::new(),
            history: vec![first],
            kind: "task".to_string(),
        };

        self.write().tasks.insert(id, task.clone());
        task
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.read().tasks.get(id).cloned()
    }

    pub fn set_working(&self, id: &str) {
        self.update(id, |task| {
            task.status = TaskStatus::now(TaskState::Working);
        });
    }

    /// Finish with a single text artifact.
    pub fn complete(&self, id: &str, text: &str) {
        self.update(id, |task| {
            task.artifacts.push(Artifact {
                artifact_id: uuid::Uuid::new_v4().to_string(),
                name: Some("response".to_string()),
                parts: vec![Part::text(text)],
            });
            task.status = TaskStatus::now(TaskState::Completed);
        });
    }

    /// Mark failed, explaining the error in an agent status message.
    pub fn fail(&self, id: &str, reason: &str) {
        self.update(id, |task| {
            let mut message = Message::agent_text(format!("Error: {reason}"));
            message.task_id = Some(task.id.clone());
            message.context_id = task.context_id.clone();
            task.status = TaskStatus {
                message: Some(message),
                ..TaskStatus::now(TaskState::Failed)
            };
        });
    }

    pub fn cancel(&self, id: &str) -> Result<Task, CancelError> {
        let mut inner = self.write();
        let task = inner.tasks.get_mut(id).ok_or(CancelError::NotFound)?;
        if task.status.state.is_terminal() {
            return Err(CancelError::NotCancelable(task.status.state));
        }
        task.status = TaskStatus::now(TaskState::Canceled);
        let canceled = task.clone();
        inner.finish(id, self.retain);
        Ok(canceled)
    }

    pub fn len(&self) -> usize {
        self.read().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().tasks.is_empty()
    }

    // Terminal tasks are frozen; a late worker result for a canceled task
    // is dropped.
    fn update(&self, id: &str, apply: impl FnOnce(&mut Task)) {
        let mut inner = self.write();
        let Some(task) = inner.tasks.get_mut(id) else {
            return;
        };
        if task.status.state.is_terminal() {
            return;
        }
        apply(task);
        if task.status.state.is_terminal() {
            inner.finish(id, self.retain);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

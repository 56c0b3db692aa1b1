#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use llm_orchestra::error::{OrchestraError, OrchestraResult};
use llm_orchestra::gateway::{GenerateRequest, InferenceGateway, TaskInferenceRequest};
use llm_orchestra::messaging::{InMemoryTaskQueue, TaskQueue};
use llm_orchestra::models::{NewTask, Task, TaskId};
use llm_orchestra::store::{InMemoryTaskStore, TaskStore};

/// Gateway that replays scripted replies in order and records every request.
///
/// An exhausted script answers with `GatewayUnavailable`.
#[derive(Default)]
pub struct ScriptedGateway {
    task_replies: Mutex<VecDeque<OrchestraResult<String>>>,
    generate_replies: Mutex<VecDeque<OrchestraResult<String>>>,
    task_requests: Mutex<Vec<TaskInferenceRequest>>,
    generate_requests: Mutex<Vec<GenerateRequest>>,
    delay: Option<Duration>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` before answering
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push_task_reply(&self, reply: OrchestraResult<String>) -> &Self {
        self.task_replies.lock().push_back(reply);
        self
    }

    pub fn push_generate_reply(&self, reply: OrchestraResult<String>) -> &Self {
        self.generate_replies.lock().push_back(reply);
        self
    }

    pub fn task_requests(&self) -> Vec<TaskInferenceRequest> {
        self.task_requests.lock().clone()
    }

    pub fn generate_requests(&self) -> Vec<GenerateRequest> {
        self.generate_requests.lock().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn next(script: &Mutex<VecDeque<OrchestraResult<String>>>) -> OrchestraResult<String> {
        script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(OrchestraError::gateway_unavailable("no scripted reply")))
    }
}

#[async_trait]
impl InferenceGateway for ScriptedGateway {
    async fn execute_task(&self, request: &TaskInferenceRequest) -> OrchestraResult<String> {
        self.task_requests.lock().push(request.clone());
        self.pause().await;
        Self::next(&self.task_replies)
    }

    async fn generate(&self, request: &GenerateRequest) -> OrchestraResult<String> {
        self.generate_requests.lock().push(request.clone());
        self.pause().await;
        Self::next(&self.generate_replies)
    }
}

/// In-memory queue whose operations can be made to fail
#[derive(Default)]
pub struct FlakyQueue {
    inner: InMemoryTaskQueue,
    enqueue_failures_left: AtomicUsize,
    dequeue_failing: AtomicBool,
    enqueue_attempts: AtomicUsize,
}

impl FlakyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` enqueue calls
    pub fn fail_next_enqueues(&self, count: usize) {
        self.enqueue_failures_left.store(count, Ordering::SeqCst);
    }

    pub fn set_dequeue_failing(&self, failing: bool) {
        self.dequeue_failing.store(failing, Ordering::SeqCst);
    }

    pub fn enqueue_attempts(&self) -> usize {
        self.enqueue_attempts.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryTaskQueue {
        &self.inner
    }
}

#[async_trait]
impl TaskQueue for FlakyQueue {
    async fn enqueue(&self, task_id: TaskId) -> OrchestraResult<()> {
        self.enqueue_attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .enqueue_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(OrchestraError::queue("broker unavailable"));
        }
        self.inner.enqueue(task_id).await
    }

    async fn dequeue(&self, timeout: Duration) -> OrchestraResult<Option<TaskId>> {
        if self.dequeue_failing.load(Ordering::SeqCst) {
            return Err(OrchestraError::queue("broker unavailable"));
        }
        self.inner.dequeue(timeout).await
    }
}

/// In-memory store that starts failing updates after a number of successes.
///
/// Simulates a worker losing its database mid-task.
pub struct FlakyStore {
    inner: InMemoryTaskStore,
    updates_allowed: AtomicUsize,
}

impl FlakyStore {
    pub fn allowing_updates(count: usize) -> Self {
        Self {
            inner: InMemoryTaskStore::new(),
            updates_allowed: AtomicUsize::new(count),
        }
    }

    pub fn inner(&self) -> &InMemoryTaskStore {
        &self.inner
    }
}

#[async_trait]
impl TaskStore for FlakyStore {
    async fn create(&self, new_task: NewTask) -> OrchestraResult<Task> {
        self.inner.create(new_task).await
    }

    async fn get(&self, id: TaskId) -> OrchestraResult<Task> {
        self.inner.get(id).await
    }

    async fn update(&self, task: &Task) -> OrchestraResult<bool> {
        let allowed = self
            .updates_allowed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(OrchestraError::storage("connection reset"));
        }
        self.inner.update(task).await
    }

    async fn mark_enqueued(&self, id: TaskId, at: DateTime<Utc>) -> OrchestraResult<()> {
        self.inner.mark_enqueued(id, at).await
    }

    async fn claim_stale(
        &self,
        id: TaskId,
        seen_updated_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> OrchestraResult<bool> {
        self.inner.claim_stale(id, seen_updated_at, now).await
    }

    async fn find_stale(&self, older_than: DateTime<Utc>, limit: u32) -> OrchestraResult<Vec<Task>> {
        self.inner.find_stale(older_than, limit).await
    }
}

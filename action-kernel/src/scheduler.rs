//! Single-consumer priority scheduler for action execution.
//!
//! Every task runs against the one shared session, so at most one task is in
//! flight at any time. Tasks are kept in a priority-ordered queue (highest
//! first, FIFO among equals) and drained by a single run loop that is started
//! on demand and exits once the queue is empty.

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use action_primitives::{ActionOutcome, ErrorCode, Params, TaskId};
use action_registry::{Action, ActionRegistry, SessionHandle};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Scheduler settings.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    default_timeout: Duration,
}

impl SchedulerConfig {
    /// Creates a configuration with the supplied default per-task timeout.
    #[must_use]
    pub const fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    /// Returns the timeout applied to tasks that do not carry their own.
    #[must_use]
    pub const fn default_timeout(self) -> Duration {
        self.default_timeout
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// Snapshot of the queue returned by [`ActionScheduler::queue_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatus {
    /// Number of tasks waiting to run (excludes the running task).
    pub length: usize,
    /// `true` while the run loop is draining the queue.
    pub is_processing: bool,
}

/// Errors a [`TaskHandle`] can reject with.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The task was discarded by [`ActionScheduler::cancel_all`] before it started.
    #[error("task cancelled before it started")]
    Cancelled,
    /// The run loop went away without settling the task.
    #[error("scheduler worker dropped the task")]
    WorkerLost,
}

/// Result a [`TaskHandle`] resolves to.
pub type TaskResult = Result<ActionOutcome, SchedulerError>;

/// Completion handle for an enqueued task.
///
/// Resolves exactly once: with an outcome, or with a [`SchedulerError`] when
/// the task is discarded.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    rx: oneshot::Receiver<TaskResult>,
}

impl TaskHandle {
    fn settled(id: TaskId, outcome: ActionOutcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Ok(outcome));
        Self { id, rx }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }
}

impl Future for TaskHandle {
    type Output = TaskResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SchedulerError::WorkerLost)))
    }
}

struct QueuedTask {
    id: TaskId,
    action: Arc<dyn Action>,
    session: SessionHandle,
    params: Params,
    priority: i32,
    timeout: Option<Duration>,
    enqueued_at: Instant,
    completion: oneshot::Sender<TaskResult>,
}

struct QueueState {
    tasks: VecDeque<QueuedTask>,
    processing: bool,
    cancelled: bool,
    default_timeout: Duration,
}

impl QueueState {
    /// Inserts before the first entry with strictly lower priority.
    fn insert(&mut self, task: QueuedTask) {
        let position = self
            .tasks
            .iter()
            .position(|queued| queued.priority < task.priority)
            .unwrap_or(self.tasks.len());
        self.tasks.insert(position, task);
    }
}

struct Shared {
    registry: Arc<ActionRegistry>,
    state: Mutex<QueueState>,
}

/// Priority scheduler guaranteeing a single in-flight action.
#[derive(Clone)]
pub struct ActionScheduler {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ActionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.queue_status();
        f.debug_struct("ActionScheduler")
            .field("length", &status.length)
            .field("is_processing", &status.is_processing)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ActionScheduler {
    /// Creates a scheduler resolving actions from `registry`.
    #[must_use]
    pub fn new(registry: Arc<ActionRegistry>, config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry,
                state: Mutex::new(QueueState {
                    tasks: VecDeque::new(),
                    processing: false,
                    cancelled: false,
                    default_timeout: config.default_timeout(),
                }),
            }),
        }
    }

    /// Returns the registry actions are resolved from.
    #[must_use]
    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.shared.registry
    }

    /// Enqueues an action for execution.
    ///
    /// Unknown actions, rejected parameters and a cancelled scheduler settle
    /// the handle immediately without queueing anything.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, or if the queue lock is
    /// poisoned.
    pub fn enqueue(
        &self,
        name: &str,
        session: SessionHandle,
        params: Params,
        priority: i32,
        timeout: Option<Duration>,
    ) -> TaskHandle {
        let id = TaskId::random();

        if self.is_cancelled() {
            return TaskHandle::settled(id, cancelled_outcome(name));
        }

        let Some(action) = self.shared.registry.get(name) else {
            debug!(action = name, "enqueue for unknown action");
            return TaskHandle::settled(
                id,
                ActionOutcome::failure(
                    ErrorCode::ActionNotFound,
                    format!("action `{name}` is not registered"),
                ),
            );
        };

        if !action.validate_params(&params) {
            debug!(action = name, "action rejected parameters");
            return TaskHandle::settled(
                id,
                ActionOutcome::failure(
                    ErrorCode::InvalidParams,
                    format!("invalid parameters for action `{name}`"),
                )
                .with_data(action.params_schema().to_value()),
            );
        }

        let (tx, rx) = oneshot::channel();
        let task = QueuedTask {
            id,
            action,
            session,
            params,
            priority,
            timeout,
            enqueued_at: Instant::now(),
            completion: tx,
        };

        let (start_loop, length) = {
            let mut state = self.shared.state.lock().expect("scheduler queue poisoned");
            if state.cancelled {
                drop(state);
                let _ = task.completion.send(Ok(cancelled_outcome(name)));
                return TaskHandle { id, rx };
            }
            state.insert(task);
            let start_loop = !state.processing;
            state.processing = true;
            (start_loop, state.tasks.len())
        };

        debug!(task_id = %id, action = name, priority, queue_length = length, "task enqueued");

        if start_loop {
            tokio::spawn(run_loop(Arc::clone(&self.shared)));
        }

        TaskHandle { id, rx }
    }

    /// Enqueues an action and waits for it, folding rejections into outcomes.
    ///
    /// Never fails: a cancelled task yields a `CANCELLED` outcome and a lost
    /// worker yields `EXECUTION_ERROR`.
    pub async fn execute(
        &self,
        name: &str,
        session: SessionHandle,
        params: Params,
        priority: i32,
        timeout: Option<Duration>,
    ) -> ActionOutcome {
        match self.enqueue(name, session, params, priority, timeout).await {
            Ok(outcome) => outcome,
            Err(SchedulerError::Cancelled) => cancelled_outcome(name),
            Err(err @ SchedulerError::WorkerLost) => {
                ActionOutcome::failure(ErrorCode::ExecutionError, err.to_string())
            }
        }
    }

    /// Cancels the scheduler permanently and discards every queued task.
    ///
    /// The running task, if any, is left to finish and resolves its own
    /// caller. Returns the number of discarded tasks.
    ///
    /// # Panics
    ///
    /// Panics if the queue lock is poisoned.
    pub fn cancel_all(&self) -> usize {
        let discarded: Vec<QueuedTask> = {
            let mut state = self.shared.state.lock().expect("scheduler queue poisoned");
            state.cancelled = true;
            state.tasks.drain(..).collect()
        };

        let count = discarded.len();
        for task in discarded {
            debug!(task_id = %task.id, action = task.action.name(), "discarding queued task");
            let _ = task.completion.send(Err(SchedulerError::Cancelled));
        }

        info!(discarded = count, "scheduler cancelled");
        count
    }

    /// Clears the cancellation flag so a new session can enqueue work.
    ///
    /// # Panics
    ///
    /// Panics if the queue lock is poisoned.
    pub fn reset_cancellation(&self) {
        self.shared
            .state
            .lock()
            .expect("scheduler queue poisoned")
            .cancelled = false;
        debug!("scheduler cancellation reset");
    }

    /// Returns `true` while the scheduler is cancelled.
    ///
    /// # Panics
    ///
    /// Panics if the queue lock is poisoned.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared
            .state
            .lock()
            .expect("scheduler queue poisoned")
            .cancelled
    }

    /// Sets the timeout applied to tasks that do not carry their own.
    ///
    /// # Panics
    ///
    /// Panics if the queue lock is poisoned.
    pub fn set_default_timeout(&self, timeout: Duration) {
        self.shared
            .state
            .lock()
            .expect("scheduler queue poisoned")
            .default_timeout = timeout;
    }

    /// Returns the timeout applied to tasks that do not carry their own.
    ///
    /// # Panics
    ///
    /// Panics if the queue lock is poisoned.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.shared
            .state
            .lock()
            .expect("scheduler queue poisoned")
            .default_timeout
    }

    /// Returns the queue length and whether the run loop is active.
    ///
    /// # Panics
    ///
    /// Panics if the queue lock is poisoned.
    #[must_use]
    pub fn queue_status(&self) -> QueueStatus {
        let state = self.shared.state.lock().expect("scheduler queue poisoned");
        QueueStatus {
            length: state.tasks.len(),
            is_processing: state.processing,
        }
    }
}

async fn run_loop(shared: Arc<Shared>) {
    loop {
        let (task, default_timeout) = {
            let mut state = shared.state.lock().expect("scheduler queue poisoned");
            match state.tasks.pop_front() {
                Some(task) => (task, state.default_timeout),
                None => {
                    state.processing = false;
                    return;
                }
            }
        };

        let QueuedTask {
            id,
            action,
            session,
            params,
            priority,
            timeout,
            enqueued_at,
            completion,
        } = task;

        let name = action.name().to_owned();
        let timeout = timeout.unwrap_or(default_timeout);
        let started = Instant::now();
        debug!(
            task_id = %id,
            action = %name,
            priority,
            waited_ms = elapsed_ms(enqueued_at),
            "task started"
        );

        let outcome = run_with_timeout(action, session, params, timeout).await;

        if outcome.is_success() {
            debug!(task_id = %id, action = %name, elapsed_ms = elapsed_ms(started), "task finished");
        } else {
            warn!(
                task_id = %id,
                action = %name,
                error = outcome.error().map(ErrorCode::as_str),
                message = outcome.message(),
                elapsed_ms = elapsed_ms(started),
                "task failed"
            );
        }

        let _ = completion.send(Ok(outcome));
    }
}

/// Races the action against its deadline.
///
/// The action runs as its own task; when the timer wins that task is detached
/// rather than aborted and may keep running in the background.
async fn run_with_timeout(
    action: Arc<dyn Action>,
    session: SessionHandle,
    params: Params,
    timeout: Duration,
) -> ActionOutcome {
    let name = action.name().to_owned();
    let mut execution = tokio::spawn(async move { action.execute(session, params).await });

    match tokio::time::timeout(timeout, &mut execution).await {
        Ok(Ok(Ok(outcome))) => outcome,
        Ok(Ok(Err(err))) => ActionOutcome::failure(ErrorCode::ExecutionError, err.to_string()),
        Ok(Err(err)) => ActionOutcome::failure(ErrorCode::ExecutionError, join_error_message(err)),
        Err(_) => ActionOutcome::failure(
            ErrorCode::Timeout,
            format!(
                "action `{name}` timed out after {}ms",
                timeout.as_millis()
            ),
        ),
    }
}

fn cancelled_outcome(name: &str) -> ActionOutcome {
    ActionOutcome::failure(
        ErrorCode::Cancelled,
        format!("action `{name}` cancelled: scheduler is not accepting work"),
    )
}

fn join_error_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "action task was cancelled".to_owned();
    }
    let payload = err.into_panic();
    format!("action panicked: {}", panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use action_primitives::ParamsSchema;
    use action_registry::{ActionError, ActionResult, Session};
    use async_trait::async_trait;
    use serde_json::json;

    struct TestSession;

    impl Session for TestSession {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Clone, Default)]
    struct Tracker {
        log: Arc<Mutex<Vec<String>>>,
        in_flight: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    impl Tracker {
        fn order(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct Recorder {
        name: &'static str,
        delay: Duration,
        behaviour: Behaviour,
        tracker: Tracker,
    }

    #[async_trait]
    impl Action for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "records its execution"
        }

        fn params_schema(&self) -> ParamsSchema {
            ParamsSchema::new()
                .optional_field("count", "number of repetitions")
                .unwrap()
        }

        fn validate_params(&self, params: &Params) -> bool {
            params.get("count").is_none_or(serde_json::Value::is_u64)
        }

        async fn execute(&self, _session: SessionHandle, _params: Params) -> ActionResult<ActionOutcome> {
            let current = self.tracker.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.tracker.max_seen.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.tracker.log.lock().unwrap().push(self.name.to_owned());

            match self.behaviour {
                Behaviour::Succeed => Ok(ActionOutcome::success(self.name)),
                Behaviour::Fail => Err(ActionError::execution("block out of reach")),
                Behaviour::Panic => panic!("pathfinder exploded"),
            }
        }
    }

    fn scheduler_with(units: &[(&'static str, u64, Behaviour)], tracker: &Tracker) -> ActionScheduler {
        let registry = Arc::new(ActionRegistry::new());
        for &(name, delay_ms, behaviour) in units {
            registry.register(Recorder {
                name,
                delay: Duration::from_millis(delay_ms),
                behaviour,
                tracker: tracker.clone(),
            });
        }
        ActionScheduler::new(registry, SchedulerConfig::default())
    }

    fn session() -> SessionHandle {
        Arc::new(TestSession)
    }

    #[tokio::test(start_paused = true)]
    async fn equal_priorities_complete_in_enqueue_order() {
        let tracker = Tracker::default();
        let scheduler = scheduler_with(&[("a", 10, Behaviour::Succeed), ("b", 10, Behaviour::Succeed)], &tracker);

        let a = scheduler.enqueue("a", session(), Params::new(), 0, None);
        let b = scheduler.enqueue("b", session(), Params::new(), 0, None);

        assert!(a.await.unwrap().is_success());
        assert!(b.await.unwrap().is_success());
        assert_eq!(tracker.order(), ["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn higher_priority_overtakes_queued_tasks() {
        let tracker = Tracker::default();
        let scheduler = scheduler_with(
            &[
                ("blocker", 50, Behaviour::Succeed),
                ("low", 5, Behaviour::Succeed),
                ("mid", 5, Behaviour::Succeed),
                ("high", 5, Behaviour::Succeed),
            ],
            &tracker,
        );

        let blocker = scheduler.enqueue("blocker", session(), Params::new(), 0, None);
        tokio::time::sleep(Duration::from_millis(1)).await;

        let low = scheduler.enqueue("low", session(), Params::new(), 1, None);
        let mid = scheduler.enqueue("mid", session(), Params::new(), 1, None);
        let high = scheduler.enqueue("high", session(), Params::new(), 5, None);
        assert_eq!(scheduler.queue_status().length, 3);

        for handle in [blocker, low, mid, high] {
            assert!(handle.await.unwrap().is_success());
        }
        assert_eq!(tracker.order(), ["blocker", "high", "low", "mid"]);
        assert!(!scheduler.queue_status().is_processing);
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_task_runs_at_a_time() {
        let tracker = Tracker::default();
        let scheduler = scheduler_with(&[("dig", 10, Behaviour::Succeed)], &tracker);

        let handles: Vec<_> = (0..5)
            .map(|i| scheduler.enqueue("dig", session(), Params::new(), i % 2, None))
            .collect();
        for result in futures::future::join_all(handles).await {
            assert!(result.unwrap().is_success());
        }

        assert_eq!(tracker.max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.order().len(), 5);
    }

    #[tokio::test]
    async fn unknown_action_short_circuits() {
        let scheduler = scheduler_with(&[], &Tracker::default());

        let outcome = scheduler
            .enqueue("mineBlock", session(), Params::new(), 0, None)
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.error(), Some(&ErrorCode::ActionNotFound));
        assert_eq!(
            scheduler.queue_status(),
            QueueStatus { length: 0, is_processing: false }
        );
    }

    #[tokio::test]
    async fn invalid_params_echo_the_schema() {
        let tracker = Tracker::default();
        let scheduler = scheduler_with(&[("dig", 1, Behaviour::Succeed)], &tracker);
        let mut params = Params::new();
        params.insert("count".into(), json!("lots"));

        let outcome = scheduler.enqueue("dig", session(), params, 0, None).await.unwrap();

        assert_eq!(outcome.error(), Some(&ErrorCode::InvalidParams));
        assert_eq!(outcome.data(), Some(&json!({ "count": "number of repetitions" })));
        assert!(tracker.order().is_empty());
        assert!(!scheduler.queue_status().is_processing);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_resolves_and_scheduler_keeps_going() {
        let tracker = Tracker::default();
        let scheduler = scheduler_with(
            &[("slow", 1_000, Behaviour::Succeed), ("fast", 5, Behaviour::Succeed)],
            &tracker,
        );

        let slow = scheduler.enqueue("slow", session(), Params::new(), 0, Some(Duration::from_millis(50)));
        let fast = scheduler.enqueue("fast", session(), Params::new(), 0, None);

        let outcome = slow.await.unwrap();
        assert_eq!(outcome.error(), Some(&ErrorCode::Timeout));

        let started = tokio::time::Instant::now();
        assert!(fast.await.unwrap().is_success());
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn default_timeout_applies_when_task_has_none() {
        let scheduler = scheduler_with(&[("slow", 500, Behaviour::Succeed)], &Tracker::default());
        scheduler.set_default_timeout(Duration::from_millis(20));
        assert_eq!(scheduler.default_timeout(), Duration::from_millis(20));

        let outcome = scheduler.execute("slow", session(), Params::new(), 0, None).await;
        assert_eq!(outcome.error(), Some(&ErrorCode::Timeout));
    }

    #[tokio::test]
    async fn execution_failures_become_outcomes() {
        let scheduler = scheduler_with(
            &[("fails", 1, Behaviour::Fail), ("panics", 1, Behaviour::Panic)],
            &Tracker::default(),
        );

        let failed = scheduler.execute("fails", session(), Params::new(), 0, None).await;
        assert_eq!(failed.error(), Some(&ErrorCode::ExecutionError));
        assert!(failed.message().contains("block out of reach"));

        let panicked = scheduler.execute("panics", session(), Params::new(), 0, None).await;
        assert_eq!(panicked.error(), Some(&ErrorCode::ExecutionError));
        assert!(panicked.message().contains("pathfinder exploded"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_discards_queued_tasks_only() {
        let tracker = Tracker::default();
        let scheduler = scheduler_with(
            &[("running", 50, Behaviour::Succeed), ("queued", 5, Behaviour::Succeed)],
            &tracker,
        );

        let running = scheduler.enqueue("running", session(), Params::new(), 0, None);
        tokio::time::sleep(Duration::from_millis(1)).await;
        let first = scheduler.enqueue("queued", session(), Params::new(), 0, None);
        let second = scheduler.enqueue("queued", session(), Params::new(), 3, None);

        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(scheduler.queue_status().length, 0);
        assert_eq!(first.await, Err(SchedulerError::Cancelled));
        assert_eq!(second.await, Err(SchedulerError::Cancelled));
        assert!(running.await.unwrap().is_success());

        let rejected = scheduler.enqueue("queued", session(), Params::new(), 0, None);
        assert_eq!(scheduler.queue_status().length, 0);
        assert_eq!(rejected.await.unwrap().error(), Some(&ErrorCode::Cancelled));

        let folded = scheduler.execute("queued", session(), Params::new(), 0, None).await;
        assert_eq!(folded.error(), Some(&ErrorCode::Cancelled));

        scheduler.reset_cancellation();
        assert!(!scheduler.is_cancelled());
        let resumed = scheduler.execute("queued", session(), Params::new(), 0, None).await;
        assert!(resumed.is_success());
        assert_eq!(tracker.order(), ["running", "queued"]);
    }

    #[test]
    #[should_panic(expected = "scheduler queue poisoned")]
    fn cancellation_check_panics_on_poisoned_queue() {
        let scheduler = scheduler_with(&[], &Tracker::default());
        assert!(!scheduler.is_cancelled());

        let holder = scheduler.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.shared.state.lock().unwrap();
            panic!("worker died holding the queue");
        })
        .join();

        let _ = scheduler.is_cancelled();
    }
}

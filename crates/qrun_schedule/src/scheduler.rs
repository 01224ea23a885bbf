//! Task scheduler for QRUN
//!
//! Gantree: L4_Schedule → Scheduler
//!
//! Max-priority task queue drained either on the caller's thread
//! (`run`) or by a single background worker (`run_async`). Queue and
//! control flags live under one mutex paired with a condition
//! variable; the worker sleeps on it while idle or paused.

use crate::task::{QueuedTask, Task};
use qrun_backend::QpuBackend;
use qrun_core::{ExecTarget, QrunError, QrunResult};
use qrun_memory::{MemoryTracker, RegisterManager};
use std::any::Any;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

/// Payload dispatched for QPU tasks that carry no IR
pub const PLACEHOLDER_IR: &str = "; scheduler dispatch\n";

/// Observable scheduler state
/// Gantree: SchedulerState // Idle → Running ⇄ Paused → Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing draining the queue
    Idle,
    /// `run` or the worker is draining the queue
    Running,
    /// Draining is suspended
    Paused,
    /// `stop` was called
    Stopped,
}

#[derive(Default)]
struct Control {
    queue: BinaryHeap<QueuedTask>,
    next_seq: u64,
    active: usize,
    worker: bool,
    paused: bool,
    draining: bool,
    stop_requested: bool,
    stopped: bool,
}

struct Shared {
    control: Mutex<Control>,
    wakeup: Condvar,
    backend: RwLock<Option<Arc<dyn QpuBackend>>>,
    memory: Option<Arc<RegisterManager>>,
    tracker: Option<Arc<MemoryTracker>>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

impl Shared {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Control>) -> MutexGuard<'a, Control> {
        self.wakeup.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    fn backend(&self) -> Option<Arc<dyn QpuBackend>> {
        self.backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Next task for `run`, or `None` when empty or stopping
    fn next_blocking(&self) -> Option<Task> {
        let mut c = self.control();
        loop {
            if c.stop_requested {
                return None;
            }
            if !c.paused {
                return c.queue.pop().map(|q| q.task);
            }
            c = self.wait(c);
        }
    }

    /// Next task for the worker, or `None` when it should exit
    fn next_for_worker(&self) -> Option<Task> {
        let mut c = self.control();
        loop {
            if c.stop_requested {
                return None;
            }
            if !c.paused {
                if let Some(q) = c.queue.pop() {
                    return Some(q.task);
                }
                if c.draining {
                    return None;
                }
            }
            c = self.wait(c);
        }
    }

    // ========================================================================
    // Task Execution
    // ========================================================================

    /// Run one task, dispatch it to the QPU if needed, record memory
    /// Gantree: execute(task) // 실행 + 디스패치 + 메모리 기록
    fn execute(&self, mut task: Task) {
        log::info!("Running task {}", task);

        let completed = match task.take_handler() {
            Some(handler) => match panic::catch_unwind(AssertUnwindSafe(handler)) {
                Ok(()) => true,
                Err(payload) => {
                    log::error!("Task '{}' panicked: {}", task.name, panic_message(payload.as_ref()));
                    false
                }
            },
            None => true,
        };

        if completed && task.target == ExecTarget::Qpu {
            if let Some(backend) = self.backend() {
                let ir = task.ir.as_deref().unwrap_or(PLACEHOLDER_IR);
                if let Err(e) = backend.execute_ir(ir) {
                    log::error!("QPU dispatch of '{}' to {} failed: {}", task.name, backend.name(), e);
                }
            }
        }

        if let Some(memory) = &self.memory {
            let bytes = memory.memory_usage();
            log::debug!("Memory in use: {} bytes", bytes);
            if let Some(tracker) = &self.tracker {
                tracker.record(bytes);
            }
        }
    }

    fn worker_loop(&self) {
        while let Some(task) = self.next_for_worker() {
            self.execute(task);
        }
        let mut c = self.control();
        c.active -= 1;
        c.worker = false;
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Priority task scheduler with at most one worker thread
/// Gantree: Scheduler // 스케줄러
pub struct Scheduler {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Scheduler without memory accounting
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// Scheduler that records `memory` usage into `tracker` after each task
    pub fn with_memory(memory: Arc<RegisterManager>, tracker: Arc<MemoryTracker>) -> Self {
        Self::build(Some(memory), Some(tracker))
    }

    fn build(memory: Option<Arc<RegisterManager>>, tracker: Option<Arc<MemoryTracker>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control::default()),
                wakeup: Condvar::new(),
                backend: RwLock::new(None),
                memory,
                tracker,
            }),
            handle: Mutex::new(None),
        }
    }

    fn handle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join_worker(&self) {
        let handle = self.handle().take();
        if let Some(h) = handle {
            if h.join().is_err() {
                log::error!("Scheduler worker terminated abnormally");
            }
        }
    }

    // ========================================================================
    // Backend
    // ========================================================================

    /// Register (or clear) the QPU backend
    pub fn set_backend(&self, backend: Option<Arc<dyn QpuBackend>>) {
        *self
            .shared
            .backend
            .write()
            .unwrap_or_else(PoisonError::into_inner) = backend;
    }

    /// Current QPU backend
    pub fn backend(&self) -> Option<Arc<dyn QpuBackend>> {
        self.shared.backend()
    }

    // ========================================================================
    // Queue
    // ========================================================================

    /// Queue a task and wake the worker
    /// Gantree: add_task(task) // 작업 추가
    pub fn add_task(&self, task: Task) {
        {
            let mut c = self.shared.control();
            let seq = c.next_seq;
            c.next_seq += 1;
            c.queue.push(QueuedTask { seq, task });
        }
        self.shared.wakeup.notify_all();
    }

    /// Number of queued tasks
    pub fn pending(&self) -> usize {
        self.shared.control().queue.len()
    }

    /// Current state
    pub fn state(&self) -> SchedulerState {
        let c = self.shared.control();
        if c.stopped {
            SchedulerState::Stopped
        } else if c.paused {
            SchedulerState::Paused
        } else if c.active > 0 {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    // ========================================================================
    // Draining
    // ========================================================================

    /// Drain the queue on this thread, highest priority first
    /// Gantree: run() // 동기 실행
    ///
    /// Returns when the queue is empty or `stop` is called. While
    /// paused it blocks until resumed.
    pub fn run(&self) {
        {
            let mut c = self.shared.control();
            c.active += 1;
            c.stopped = false;
            c.stop_requested = false;
        }
        while let Some(task) = self.shared.next_blocking() {
            self.shared.execute(task);
        }
        self.shared.control().active -= 1;
    }

    /// Start the background worker; a no-op while one is alive
    /// Gantree: run_async() -> QrunResult<()> // 비동기 실행
    pub fn run_async(&self) -> QrunResult<()> {
        let mut handle = self.handle();
        {
            let mut c = self.shared.control();
            if c.worker {
                return Ok(());
            }
            c.worker = true;
            c.active += 1;
            c.draining = false;
            c.stopped = false;
            c.stop_requested = false;
        }

        // reap a worker that already exited on its own
        if let Some(old) = handle.take() {
            let _ = old.join();
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("qrun-scheduler".to_string())
            .spawn(move || shared.worker_loop());

        match spawned {
            Ok(h) => {
                *handle = Some(h);
                Ok(())
            }
            Err(e) => {
                let mut c = self.shared.control();
                c.worker = false;
                c.active -= 1;
                Err(QrunError::InternalError(format!("cannot spawn scheduler worker: {}", e)))
            }
        }
    }

    /// Let the worker drain the queue, then join it
    ///
    /// Blocks for as long as the scheduler stays paused.
    pub fn wait(&self) {
        self.shared.control().draining = true;
        self.shared.wakeup.notify_all();
        self.join_worker();
        self.shared.control().draining = false;
    }

    /// Abandon queued tasks, let the in-flight one finish, join the worker
    pub fn stop(&self) {
        let dropped = {
            let mut c = self.shared.control();
            c.stop_requested = true;
            c.stopped = true;
            let n = c.queue.len();
            c.queue.clear();
            n
        };
        self.shared.wakeup.notify_all();
        self.join_worker();
        if dropped > 0 {
            log::warn!("Scheduler stopped with {} queued tasks abandoned", dropped);
        }
    }

    /// Suspend draining after the current task
    pub fn pause(&self) {
        self.shared.control().paused = true;
    }

    /// Continue draining
    pub fn resume(&self) {
        self.shared.control().paused = false;
        self.shared.wakeup.notify_all();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.shared.control().worker {
            self.stop();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use qrun_backend::RecordingBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = Arc::clone(&log);
        let make = move |name: &str| {
            let l = Arc::clone(&l);
            let owned = name.to_string();
            Task::new(name, move || l.lock().unwrap().push(owned))
        };
        (log, make)
    }

    #[test]
    fn test_run_priority_order() {
        let (log, make) = recorder();
        let s = Scheduler::new();
        s.add_task(make("low").with_priority(5));
        s.add_task(make("high").with_priority(10));
        s.add_task(make("low2").with_priority(5));
        s.run();
        assert_eq!(*log.lock().unwrap(), vec!["high", "low", "low2"]);
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_async_priority_order() {
        let (log, make) = recorder();
        let s = Scheduler::new();
        s.add_task(make("low").with_priority(5));
        s.add_task(make("high").with_priority(10));
        s.run_async().unwrap();
        s.wait();
        assert_eq!(*log.lock().unwrap(), vec!["high", "low"]);
    }

    #[test]
    fn test_pause_and_resume() {
        let count = Arc::new(AtomicUsize::new(0));
        let s = Scheduler::new();
        for i in 0..2 {
            let c = Arc::clone(&count);
            s.add_task(Task::new(format!("inc{}", i), move || {
                thread::sleep(Duration::from_millis(20));
                c.fetch_add(1, Ordering::SeqCst);
            }));
        }
        s.run_async().unwrap();
        s.pause();
        assert_eq!(s.state(), SchedulerState::Paused);
        thread::sleep(Duration::from_millis(100));
        assert!(count.load(Ordering::SeqCst) <= 1);

        s.resume();
        s.wait();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_worker_picks_up_late_tasks() {
        let count = Arc::new(AtomicUsize::new(0));
        let s = Scheduler::new();
        s.run_async().unwrap();
        // second call while alive is a no-op
        s.run_async().unwrap();
        assert_eq!(s.state(), SchedulerState::Running);

        for _ in 0..3 {
            let c = Arc::clone(&count);
            s.add_task(Task::new("late", move || {
                c.fetch_add(1, Ordering::SeqCst);
            }));
        }
        s.wait();
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_stop_abandons_queue() {
        let count = Arc::new(AtomicUsize::new(0));
        let s = Scheduler::new();
        s.pause();
        s.run_async().unwrap();
        for _ in 0..3 {
            let c = Arc::clone(&count);
            s.add_task(Task::new("never", move || {
                c.fetch_add(1, Ordering::SeqCst);
            }));
        }
        s.stop();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(s.pending(), 0);
        assert_eq!(s.state(), SchedulerState::Stopped);
    }

    #[test]
    fn test_panicking_task_is_contained() {
        let (log, make) = recorder();
        let s = Scheduler::new();
        s.add_task(Task::new("boom", || panic!("task failed")).with_priority(1));
        s.add_task(make("after"));
        s.run();
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn test_qpu_dispatch() {
        let backend = Arc::new(RecordingBackend::new("mock"));
        let s = Scheduler::new();
        s.set_backend(Some(backend.clone()));

        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        s.add_task(
            Task::new("qpu_task", move || {
                r.fetch_add(1, Ordering::SeqCst);
            })
            .with_target(ExecTarget::Qpu),
        );
        s.add_task(Task::named("cpu_task"));
        s.add_task(Task::named("with_ir").with_target(ExecTarget::Qpu).with_ir("; body\n"));
        s.run();

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(backend.submissions(), vec![PLACEHOLDER_IR.to_string(), "; body\n".to_string()]);
    }

    #[test]
    fn test_backend_failure_is_logged_not_fatal() {
        let backend = Arc::new(RecordingBackend::failing("down", "offline"));
        let s = Scheduler::new();
        s.set_backend(Some(backend.clone()));
        s.add_task(Task::named("a").with_target(ExecTarget::Qpu));
        s.add_task(Task::named("b").with_target(ExecTarget::Qpu));
        s.run();
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn test_memory_recorded_per_task() {
        let memory = Arc::new(RegisterManager::new());
        let tracker = Arc::new(MemoryTracker::new());
        tracker.start();
        let s = Scheduler::with_memory(Arc::clone(&memory), Arc::clone(&tracker));

        let m = Arc::clone(&memory);
        s.add_task(Task::new("alloc", move || {
            m.create_qregister(3).unwrap();
        }));
        s.add_task(Task::named("idle"));
        s.run();

        let samples = tracker.samples();
        assert_eq!(samples.len(), 2);
        assert!(samples[0].bytes > 0);
    }
}

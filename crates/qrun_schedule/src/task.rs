//! Schedulable tasks
//!
//! Gantree: L4_Schedule → Task
//!
//! A task is a named unit of work with a target, a hint, a priority and
//! an optional IR payload for QPU dispatch.

use qrun_backend::emit_qir;
use qrun_core::{ExecHint, ExecTarget, TaskBlock};
use std::cmp::Ordering;
use std::fmt;

/// Work run by the scheduler
pub type TaskHandler = Box<dyn FnOnce() + Send + 'static>;

/// Unit of scheduled work
/// Gantree: Task // 작업
pub struct Task {
    /// Name used in logs
    pub name: String,
    /// Where the task runs
    pub target: ExecTarget,
    /// Simulation hint
    pub hint: ExecHint,
    /// Higher runs first
    pub priority: i32,
    /// Payload sent to the QPU backend for QPU tasks
    pub ir: Option<String>,
    handler: Option<TaskHandler>,
}

impl Task {
    /// CPU task with priority 0
    pub fn new(name: impl Into<String>, handler: impl FnOnce() + Send + 'static) -> Self {
        Self {
            handler: Some(Box::new(handler)),
            ..Self::named(name)
        }
    }

    /// Task with no handler
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: ExecTarget::Cpu,
            hint: ExecHint::None,
            priority: 0,
            ir: None,
            handler: None,
        }
    }

    /// Task for a `TASK ... ENDTASK` block; the body becomes the IR payload
    /// Gantree: for_block(TaskBlock,handler) -> Task // 블록 → 작업
    pub fn for_block(block: &TaskBlock, handler: impl FnOnce() + Send + 'static) -> Self {
        Self::new(block.name.clone(), handler)
            .with_target(block.target)
            .with_hint(block.hint)
            .with_ir(emit_qir(&block.body))
    }

    /// Set target
    pub fn with_target(mut self, target: ExecTarget) -> Self {
        self.target = target;
        self
    }

    /// Set hint
    pub fn with_hint(mut self, hint: ExecHint) -> Self {
        self.hint = hint;
        self
    }

    /// Set priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set IR payload
    pub fn with_ir(mut self, ir: impl Into<String>) -> Self {
        self.ir = Some(ir.into());
        self
    }

    /// Whether a handler is attached
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub(crate) fn take_handler(&mut self) -> Option<TaskHandler> {
        self.handler.take()
    }
}

impl fmt::Display for Task {
    /// `'name' on QPU [CLIFFORD]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' on {}", self.name, self.target)?;
        if self.hint != ExecHint::None {
            write!(f, " [{}]", self.hint)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("hint", &self.hint)
            .field("priority", &self.priority)
            .field("has_ir", &self.ir.is_some())
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

// ============================================================================
// Queue Ordering
// ============================================================================

/// Heap entry: higher priority first, then earlier insertion
pub(crate) struct QueuedTask {
    pub(crate) seq: u64,
    pub(crate) task: Task,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.task
            .priority
            .cmp(&other.task.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

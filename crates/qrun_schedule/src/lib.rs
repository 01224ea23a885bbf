//! # QRUN Schedule
//!
//! Priority task scheduling for the QRUN runtime.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qrun_schedule // L4: Scheduling (완료)
//!     Task // 작업 + 우선순위 큐 순서 (완료)
//!     Scheduler // run / run_async / pause / stop (완료)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qrun_schedule::prelude::*;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let count = Arc::new(AtomicUsize::new(0));
//! let scheduler = Scheduler::new();
//!
//! let c = Arc::clone(&count);
//! scheduler.add_task(Task::new("inc", move || {
//!     c.fetch_add(1, Ordering::SeqCst);
//! }));
//! scheduler.run_async().unwrap();
//! scheduler.wait();
//! assert_eq!(count.load(Ordering::SeqCst), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Tasks (Gantree: L4_Schedule → Task)
pub mod task;

/// Scheduler (Gantree: L4_Schedule → Scheduler)
pub mod scheduler;

// ============================================================================
// Re-exports
// ============================================================================

pub use scheduler::{Scheduler, SchedulerState, PLACEHOLDER_IR};
pub use task::{Task, TaskHandler};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases

    pub use crate::scheduler::{Scheduler, SchedulerState};
    pub use crate::task::Task;
    pub use qrun_core::{ExecHint, ExecTarget};
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use qrun_backend::RecordingBackend;
    use qrun_core::Circuit;
    use qrun_memory::{MemoryTracker, RegisterManager};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_tasks_share_register() {
        let memory = Arc::new(RegisterManager::new());
        let tracker = Arc::new(MemoryTracker::new());
        let s = Scheduler::with_memory(Arc::clone(&memory), tracker);
        let id = memory.create_qregister(1).unwrap();
        let result = Arc::new(Mutex::new(None));

        let m = Arc::clone(&memory);
        s.add_task(Task::new("flip", move || {
            m.with_qreg(id, |r| r.x(0)).unwrap();
        }).with_priority(1));

        let m = Arc::clone(&memory);
        let out = Arc::clone(&result);
        s.add_task(Task::new("measure", move || {
            *out.lock().unwrap() = Some(m.with_qreg(id, |r| r.measure(0)).unwrap());
        }));

        s.run_async().unwrap();
        s.wait();
        assert_eq!(*result.lock().unwrap(), Some(1));
        memory.release_qregister(id).unwrap();
    }

    #[test]
    fn test_task_blocks_dispatch_their_body() {
        let program = "TASK prep CPU\nH q 0\nENDTASK\nTASK run QPU\nCNOT q 0 q 1\nENDTASK\n";
        let circuit = Circuit::parse(program).unwrap();
        let backend = Arc::new(RecordingBackend::new("mock"));
        let s = Scheduler::new();
        s.set_backend(Some(backend.clone()));

        for block in circuit.task_blocks() {
            s.add_task(Task::for_block(&block, || {}));
        }
        s.run();

        let sent = backend.submissions();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("__quantum__qis__cnot__body"));
        assert!(!sent[0].contains("__quantum__qis__h__body"));
    }
}

#![forbid(unsafe_code)]

//! Delayed execution.
//!
//! [`Scheduler`] is the host's timer facility as seen by the surface helper:
//! post a task to run after a delay and get back a [`TaskHandle`] that can
//! cancel it.
//!
//! [`ManualScheduler`] runs on virtual time. Nothing fires until the caller
//! advances the clock, which makes teardown timing fully deterministic in
//! tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use web_time::Duration;

/// Task posted to a [`Scheduler`].
pub type Task = Box<dyn FnOnce()>;

/// Cancellation handle for a posted task.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    cancelled: Rc<Cell<bool>>,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prevent the task from running. No effect once it has run.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// Timer facility.
pub trait Scheduler {
    /// Run `task` once `delay` has elapsed, unless the handle is cancelled
    /// first.
    fn post_delayed(&self, delay: Duration, task: Task) -> TaskHandle;
}

struct Pending {
    task: Task,
    handle: TaskHandle,
}

#[derive(Default)]
struct ManualInner {
    now: Duration,
    next_seq: u64,
    /// Keyed by (deadline, post order).
    tasks: BTreeMap<(Duration, u64), Pending>,
}

/// Virtual-time scheduler.
///
/// Tasks run in deadline order; tasks with equal deadlines run in the order
/// they were posted. Cloning creates a new handle to the same clock.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<ManualInner>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of posted tasks that have neither run nor been cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner
            .borrow()
            .tasks
            .values()
            .filter(|p| !p.handle.is_cancelled())
            .count()
    }

    /// Advance the clock by `delta`, running every task that comes due,
    /// including tasks posted by tasks run along the way. Returns the number
    /// of tasks run.
    pub fn advance(&self, delta: Duration) -> usize {
        let target = self.now() + delta;
        let mut ran = 0;
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let due = inner
                    .tasks
                    .first_key_value()
                    .map(|((deadline, _), _)| *deadline)
                    .filter(|deadline| *deadline <= target);
                match due {
                    Some(deadline) => {
                        inner.now = deadline;
                        inner.tasks.pop_first().map(|(_, pending)| pending)
                    }
                    None => None,
                }
            };
            let Some(pending) = next else { break };
            if pending.handle.is_cancelled() {
                continue;
            }
            (pending.task)();
            ran += 1;
        }
        self.inner.borrow_mut().now = target;
        ran
    }

    /// Run everything that is pending, advancing the clock to the last
    /// deadline.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let last = self
                .inner
                .borrow()
                .tasks
                .last_key_value()
                .map(|((deadline, _), _)| *deadline);
            let Some(deadline) = last else { break };
            let delta = deadline.saturating_sub(self.now());
            ran += self.advance(delta);
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn post_delayed(&self, delay: Duration, task: Task) -> TaskHandle {
        let handle = TaskHandle::new();
        let mut inner = self.inner.borrow_mut();
        let deadline = inner.now + delay;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.tasks.insert(
            (deadline, seq),
            Pending {
                task,
                handle: handle.clone(),
            },
        );
        handle
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> Task {
        let log = Rc::clone(log);
        Box::new(move || log.borrow_mut().push(tag))
    }

    #[test]
    fn runs_only_when_due() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sched = ManualScheduler::new();
        let _h = sched.post_delayed(Duration::from_millis(300), recorder(&log, "finish"));

        assert_eq!(sched.advance(Duration::from_millis(299)), 0);
        assert!(log.borrow().is_empty());
        assert_eq!(sched.advance(Duration::from_millis(1)), 1);
        assert_eq!(*log.borrow(), ["finish"]);
        assert_eq!(sched.now(), Duration::from_millis(300));
    }

    #[test]
    fn deadline_then_post_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sched = ManualScheduler::new();
        let _a = sched.post_delayed(Duration::from_millis(20), recorder(&log, "late"));
        let _b = sched.post_delayed(Duration::from_millis(10), recorder(&log, "first"));
        let _c = sched.post_delayed(Duration::from_millis(10), recorder(&log, "second"));
        sched.advance(Duration::from_millis(50));
        assert_eq!(*log.borrow(), ["first", "second", "late"]);
    }

    #[test]
    fn cancelled_task_never_runs() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sched = ManualScheduler::new();
        let handle = sched.post_delayed(Duration::from_millis(5), recorder(&log, "x"));
        assert_eq!(sched.pending(), 1);
        handle.cancel();
        assert_eq!(sched.pending(), 0);
        assert_eq!(sched.advance(Duration::from_millis(10)), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn tasks_posted_by_tasks_run_when_due() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sched = ManualScheduler::new();
        let inner_sched = sched.clone();
        let inner_log = Rc::clone(&log);
        let _h = sched.post_delayed(
            Duration::from_millis(10),
            Box::new(move || {
                inner_log.borrow_mut().push("outer");
                let _ = inner_sched
                    .post_delayed(Duration::from_millis(5), recorder(&inner_log, "inner"));
            }),
        );
        assert_eq!(sched.advance(Duration::from_millis(15)), 2);
        assert_eq!(*log.borrow(), ["outer", "inner"]);
    }

    #[test]
    fn run_until_idle_drains() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sched = ManualScheduler::new();
        let _a = sched.post_delayed(Duration::from_secs(2), recorder(&log, "b"));
        let _b = sched.post_delayed(Duration::from_secs(1), recorder(&log, "a"));
        assert_eq!(sched.run_until_idle(), 2);
        assert_eq!(sched.now(), Duration::from_secs(2));
        assert_eq!(sched.pending(), 0);
    }
}

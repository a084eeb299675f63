//! Deterministic task scheduler driven by the test.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use fibra_core::collections::map::HashMap;
use fibra_core::{SchedulerCallback, SchedulerPriority, TaskScheduler, TaskStatus, TaskToken};

type TaskKey = (SchedulerPriority, u64);

/// Runs callbacks only when asked, most urgent first and FIFO within a
/// priority. A continuation keeps its original queue position.
pub struct ManualScheduler {
    queue: RefCell<BTreeMap<TaskKey, (TaskToken, SchedulerCallback)>>,
    keys: RefCell<HashMap<TaskToken, TaskKey>>,
    next_seq: Cell<u64>,
    running: Cell<Option<TaskToken>>,
    running_cancelled: Cell<bool>,
    current_priority: Cell<SchedulerPriority>,
    yield_after: Cell<Option<usize>>,
    yield_checks: Cell<usize>,
    force_yield: Cell<bool>,
    timed_out: Cell<bool>,
    scheduled_total: Cell<usize>,
    continuations: Cell<usize>,
    cancelled_total: Cell<usize>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self {
            queue: RefCell::new(BTreeMap::new()),
            keys: RefCell::new(HashMap::default()),
            next_seq: Cell::new(0),
            running: Cell::new(None),
            running_cancelled: Cell::new(false),
            current_priority: Cell::new(SchedulerPriority::Normal),
            yield_after: Cell::new(None),
            yield_checks: Cell::new(0),
            force_yield: Cell::new(false),
            timed_out: Cell::new(false),
            scheduled_total: Cell::new(0),
            continuations: Cell::new(0),
            cancelled_total: Cell::new(0),
        }
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(n)` makes `should_yield` return true once it has been asked
    /// more than `n` times within one task run. `None` never yields.
    pub fn set_yield_after(&self, budget: Option<usize>) {
        self.yield_after.set(budget);
    }

    pub fn set_should_yield(&self, value: bool) {
        self.force_yield.set(value);
    }

    /// Value passed to callbacks as their `did_timeout` argument.
    pub fn set_timed_out(&self, value: bool) {
        self.timed_out.set(value);
    }

    pub fn set_current_priority(&self, priority: SchedulerPriority) {
        self.current_priority.set(priority);
    }

    pub fn pending_count(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    /// Priorities of queued tasks in run order.
    pub fn pending_priorities(&self) -> Vec<SchedulerPriority> {
        self.queue.borrow().keys().map(|(priority, _)| *priority).collect()
    }

    pub fn scheduled_total(&self) -> usize {
        self.scheduled_total.get()
    }

    pub fn continuations(&self) -> usize {
        self.continuations.get()
    }

    pub fn cancelled_total(&self) -> usize {
        self.cancelled_total.get()
    }

    /// Runs the most urgent queued task. Returns false when the queue was
    /// empty.
    pub fn run_next(&self) -> bool {
        let next = {
            let mut queue = self.queue.borrow_mut();
            let Some(key) = queue.keys().next().copied() else {
                return false;
            };
            queue.remove(&key).map(|task| (key, task))
        };
        let Some((key, (token, mut callback))) = next else {
            return false;
        };
        self.keys.borrow_mut().remove(&token);

        self.running.set(Some(token));
        self.running_cancelled.set(false);
        self.yield_checks.set(0);
        let previous = self.current_priority.replace(key.0);
        log::trace!("running task {:?} at {:?}", token, key.0);
        let status = callback(self.timed_out.get());
        self.current_priority.set(previous);
        self.running.set(None);

        if status == TaskStatus::Continue && !self.running_cancelled.get() {
            self.continuations.set(self.continuations.get() + 1);
            self.queue.borrow_mut().insert(key, (token, callback));
            self.keys.borrow_mut().insert(token, key);
        }
        true
    }

    /// Runs tasks until the queue is empty or `limit` tasks ran. Returns the
    /// number of tasks run.
    pub fn run_all(&self, limit: usize) -> usize {
        let mut ran = 0;
        while ran < limit && self.run_next() {
            ran += 1;
        }
        if ran == limit && self.has_pending() {
            log::warn!("ManualScheduler::run_all stopped after {limit} tasks");
        }
        ran
    }
}

impl TaskScheduler for ManualScheduler {
    fn schedule_callback(
        &self,
        priority: SchedulerPriority,
        callback: SchedulerCallback,
    ) -> TaskToken {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let token = TaskToken(seq);
        self.queue
            .borrow_mut()
            .insert((priority, seq), (token, callback));
        self.keys.borrow_mut().insert(token, (priority, seq));
        self.scheduled_total.set(self.scheduled_total.get() + 1);
        token
    }

    fn cancel_callback(&self, token: TaskToken) {
        if self.running.get() == Some(token) {
            self.running_cancelled.set(true);
            self.cancelled_total.set(self.cancelled_total.get() + 1);
            return;
        }
        let key = self.keys.borrow_mut().remove(&token);
        if let Some(key) = key {
            self.queue.borrow_mut().remove(&key);
            self.cancelled_total.set(self.cancelled_total.get() + 1);
        }
    }

    fn should_yield(&self) -> bool {
        if self.force_yield.get() {
            return true;
        }
        match self.yield_after.get() {
            Some(budget) => {
                let checks = self.yield_checks.get() + 1;
                self.yield_checks.set(checks);
                checks > budget
            }
            None => false,
        }
    }

    fn current_priority(&self) -> SchedulerPriority {
        self.current_priority.get()
    }

    fn run_with_priority(&self, priority: SchedulerPriority, f: &mut dyn FnMut()) {
        let previous = self.current_priority.replace(priority);
        f();
        self.current_priority.set(previous);
    }
}

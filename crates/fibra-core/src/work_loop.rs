//! Scheduling, rendering and committing a root.
//!
//! Every entry point takes the root state with `try_borrow_mut`. Requests
//! that arrive while it is held (state setters called during render,
//! callback refs run during commit) wait in `RootInner::requests` and are
//! drained by [`RootInner::flush_requests`] as soon as the borrow ends.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::begin_work::begin_work;
use crate::commit_work::{commit_layout_effects, commit_mutation_effects, run_passive_effects};
use crate::complete_work::complete_work;
use crate::context::ContextStack;
use crate::error::RenderError;
use crate::fiber::{create_work_in_progress, FiberArena, FiberId, FiberKind};
use crate::flags::Flags;
use crate::host::HostConfig;
use crate::lanes::{
    highest_priority_lane, lanes_to_scheduler_priority, Lane, Lanes, NO_LANE, NO_LANES,
};
use crate::props::Props;
use crate::root::{RootInner, RootState};
use crate::scheduler::{SchedulerPriority, TaskStatus, TaskToken};

/// Shared inputs of `begin_work` and `complete_work` for one render pass.
pub(crate) struct WorkContext<'a> {
    pub host: &'a dyn HostConfig,
    pub context: &'a Rc<RefCell<ContextStack>>,
    pub root: &'a Weak<RootInner>,
    pub lane: Lanes,
}

#[derive(Debug)]
pub(crate) enum RootExitStatus {
    Incomplete,
    Completed,
    Errored(RenderError),
}

fn perform_unit_of_work(
    fibers: &mut FiberArena,
    unit: FiberId,
    cx: &WorkContext<'_>,
) -> Result<Option<FiberId>, RenderError> {
    let next = begin_work(fibers, unit, cx)?;
    let fiber = &mut fibers[unit];
    fiber.memoized_props = Some(fiber.pending_props.clone());
    match next {
        Some(child) => Ok(Some(child)),
        None => Ok(complete_unit_of_work(fibers, unit, cx)),
    }
}

/// Completes `unit` and its ancestors until one has a sibling to begin.
fn complete_unit_of_work(
    fibers: &mut FiberArena,
    unit: FiberId,
    cx: &WorkContext<'_>,
) -> Option<FiberId> {
    let mut completed = unit;
    loop {
        complete_work(fibers, completed, cx);
        if let Some(sibling) = fibers[completed].sibling {
            return Some(sibling);
        }
        completed = fibers[completed].parent?;
    }
}

/// Whether `fiber` still hangs off one of the root's two host root fibers.
fn is_mounted(state: &RootState, fiber: FiberId) -> bool {
    let root_alternate = state.fibers.get(state.current).and_then(|root| root.alternate);
    let mut node = fiber;
    loop {
        let Some(current) = state.fibers.get(node) else {
            return false;
        };
        match current.parent {
            Some(parent) => node = parent,
            None => {
                return matches!(current.kind, FiberKind::HostRoot)
                    && (node == state.current || Some(node) == root_alternate);
            }
        }
    }
}

impl RootInner {
    /// Records an update for `fiber` (or the root itself when `None`) and
    /// schedules it, or leaves it queued while the root is busy.
    pub(crate) fn request_update(&self, fiber: Option<FiberId>, lane: Lane) {
        if self.is_rendering.get() {
            self.render_phase_update.set(true);
        }
        self.requests.borrow_mut().push_back((fiber, lane));
        self.flush_requests();
    }

    pub(crate) fn flush_requests(&self) {
        loop {
            let Ok(mut state) = self.state.try_borrow_mut() else {
                return;
            };
            let Some((fiber, lane)) = self.requests.borrow_mut().pop_front() else {
                return;
            };
            self.schedule_update_on_fiber(&mut state, fiber, lane);
        }
    }

    pub(crate) fn flush_sync_callbacks(&self) {
        self.sync_queue.flush();
    }

    fn schedule_update_on_fiber(&self, state: &mut RootState, fiber: Option<FiberId>, lane: Lane) {
        let limit = self.options.nested_update_limit;
        if state.nested_update_count >= limit {
            log::error!("update loop detected: {limit} nested commits, dropping queued updates");
            self.requests.borrow_mut().clear();
            state.nested_update_count = 0;
            state.last_error = Some(RenderError::NestedUpdateLimit { limit });
            return;
        }
        if let Some(fiber) = fiber {
            if !is_mounted(state, fiber) {
                log::debug!("dropping update for unmounted fiber {fiber:?}");
                return;
            }
        }
        state.pending_lanes |= lane;
        if state.wip.is_some() {
            // hooks already rendered in the paused pass will not see it
            state.interleaved_lanes |= lane;
        }
        self.ensure_root_is_scheduled(state);
    }

    pub(crate) fn ensure_root_is_scheduled(&self, state: &mut RootState) {
        let next = highest_priority_lane(state.pending_lanes);
        if next.is_empty() {
            if let Some(token) = state.callback_node.take() {
                self.scheduler.cancel_callback(token);
            }
            state.callback_priority = NO_LANE;
            return;
        }
        if next == state.callback_priority {
            return;
        }
        if let Some(token) = state.callback_node.take() {
            log::debug!("cancelling {:?} work for {next:?}", state.callback_priority);
            self.scheduler.cancel_callback(token);
        }

        if next == Lanes::SYNC {
            if !state.sync_scheduled {
                state.sync_scheduled = true;
                let root = self.this.clone();
                self.sync_queue.push(Box::new(move || {
                    if let Some(root) = root.upgrade() {
                        root.perform_sync_work_on_root();
                    }
                }));
                let root = self.this.clone();
                self.host.schedule_microtask(Box::new(move || {
                    if let Some(root) = root.upgrade() {
                        root.flush_sync_callbacks();
                    }
                }));
            }
        } else {
            let root = self.this.clone();
            let slot: Rc<Cell<Option<TaskToken>>> = Rc::new(Cell::new(None));
            let task_slot = Rc::clone(&slot);
            let token = self.scheduler.schedule_callback(
                lanes_to_scheduler_priority(next),
                Box::new(move |did_timeout| match (root.upgrade(), task_slot.get()) {
                    (Some(root), Some(token)) => {
                        root.perform_concurrent_work_on_root(token, did_timeout)
                    }
                    _ => TaskStatus::Done,
                }),
            );
            slot.set(Some(token));
            state.callback_node = Some(token);
        }
        state.callback_priority = next;
        log::debug!("scheduled root work at {next:?}");
    }

    fn perform_concurrent_work_on_root(&self, token: TaskToken, did_timeout: bool) -> TaskStatus {
        self.flush_passive_effects();
        self.flush_requests();

        let Ok(mut state) = self.state.try_borrow_mut() else {
            log::warn!("root busy when its task ran; yielding");
            return TaskStatus::Continue;
        };
        if state.callback_node != Some(token) {
            return TaskStatus::Done;
        }
        let lane = highest_priority_lane(state.pending_lanes);
        if lane.is_empty() {
            state.callback_node = None;
            state.callback_priority = NO_LANE;
            return TaskStatus::Done;
        }

        let time_sliced = lane != Lanes::SYNC && !did_timeout;
        match self.render_root(&mut state, lane, time_sliced) {
            RootExitStatus::Incomplete => {}
            RootExitStatus::Completed => self.commit_root(&mut state),
            RootExitStatus::Errored(error) => self.handle_render_error(&mut state, lane, error),
        }
        drop(state);
        self.flush_requests();

        let still_current = self
            .state
            .try_borrow()
            .map(|state| state.callback_node == Some(token))
            .unwrap_or(false);
        if still_current {
            TaskStatus::Continue
        } else {
            TaskStatus::Done
        }
    }

    fn perform_sync_work_on_root(&self) {
        self.flush_passive_effects();
        self.flush_requests();

        let Ok(mut state) = self.state.try_borrow_mut() else {
            log::warn!("root busy during sync flush; retrying in a microtask");
            let root = self.this.clone();
            self.host.schedule_microtask(Box::new(move || {
                if let Some(root) = root.upgrade() {
                    root.perform_sync_work_on_root();
                }
            }));
            return;
        };
        state.sync_scheduled = false;
        if state.callback_priority == Lanes::SYNC {
            state.callback_priority = NO_LANE;
        }

        let lane = highest_priority_lane(state.pending_lanes);
        if lane != Lanes::SYNC {
            self.ensure_root_is_scheduled(&mut state);
        } else {
            match self.render_root(&mut state, Lanes::SYNC, false) {
                RootExitStatus::Completed => self.commit_root(&mut state),
                RootExitStatus::Errored(error) => {
                    self.handle_render_error(&mut state, Lanes::SYNC, error)
                }
                RootExitStatus::Incomplete => {
                    log::warn!("synchronous render yielded");
                    self.ensure_root_is_scheduled(&mut state);
                }
            }
        }
        drop(state);
        self.flush_requests();
    }

    fn prepare_fresh_stack(&self, state: &mut RootState, lane: Lane) {
        self.context.borrow_mut().clear();
        let wip_root = create_work_in_progress(&mut state.fibers, state.current, Props::default());
        state.wip_root = Some(wip_root);
        state.wip = Some(wip_root);
        state.render_lane = lane;
        state.interleaved_lanes = NO_LANES;
        state.finished_work = None;
        log::trace!("fresh stack at {lane:?}");
    }

    fn render_root(&self, state: &mut RootState, lane: Lane, time_sliced: bool) -> RootExitStatus {
        if state.wip.is_none() || state.render_lane != lane {
            self.prepare_fresh_stack(state, lane);
        }
        let cx = WorkContext {
            host: &*self.host,
            context: &self.context,
            root: &self.this,
            lane,
        };

        self.is_rendering.set(true);
        let mut performed = false;
        let outcome = loop {
            let Some(unit) = state.wip else {
                break Ok(true);
            };
            // at least one unit per slice so a zero budget still progresses
            if time_sliced && performed && self.scheduler.should_yield() {
                break Ok(false);
            }
            match perform_unit_of_work(&mut state.fibers, unit, &cx) {
                Ok(next) => state.wip = next,
                Err(error) => break Err(error),
            }
            performed = true;
        };
        self.is_rendering.set(false);

        match outcome {
            Ok(false) => RootExitStatus::Incomplete,
            Ok(true) => {
                state.render_lane = NO_LANE;
                state.finished_work = state.wip_root.take();
                state.finished_lane = lane;
                RootExitStatus::Completed
            }
            Err(error) => {
                state.wip = None;
                state.wip_root = None;
                state.render_lane = NO_LANE;
                self.context.borrow_mut().clear();
                RootExitStatus::Errored(error)
            }
        }
    }

    fn handle_render_error(&self, state: &mut RootState, lane: Lane, error: RenderError) {
        log::error!("render at {lane:?} failed: {error}");
        state.mark_root_finished(lane);
        state.callback_node = None;
        state.callback_priority = NO_LANE;
        self.render_phase_update.set(false);
        state.last_error = Some(error);
        self.ensure_root_is_scheduled(state);
    }

    fn commit_root(&self, state: &mut RootState) {
        let Some(finished) = state.finished_work.take() else {
            return;
        };
        let lane = std::mem::replace(&mut state.finished_lane, NO_LANE);
        state.mark_root_finished(lane);
        state.callback_node = None;
        state.callback_priority = NO_LANE;
        if self.render_phase_update.replace(false) {
            state.nested_update_count += 1;
        } else {
            state.nested_update_count = 0;
        }
        log::trace!("commit {finished:?} at {lane:?}");

        let finished_flags = state.fibers[finished].flags | state.fibers[finished].subtree_flags;
        if finished_flags.intersects(Flags::PASSIVE_MASK) && !state.passive_flush_scheduled {
            state.passive_flush_scheduled = true;
            let root = self.this.clone();
            self.scheduler.schedule_callback(
                SchedulerPriority::Normal,
                Box::new(move |_| {
                    if let Some(root) = root.upgrade() {
                        root.flush_passive_effects();
                    }
                    TaskStatus::Done
                }),
            );
        }

        if finished_flags.intersects(Flags::MUTATION_MASK | Flags::PASSIVE_MASK) {
            commit_mutation_effects(
                &mut state.fibers,
                &*self.host,
                &mut state.pending_passive,
                finished,
            );
            state.current = finished;
            commit_layout_effects(&mut state.fibers, finished);
        } else {
            state.current = finished;
        }

        let freed = state.fibers.retain_reachable(state.current);
        if freed > 0 {
            log::trace!("released {freed} fibers");
        }
        self.ensure_root_is_scheduled(state);
    }

    /// Runs queued passive effects with no root borrow held. Returns whether
    /// anything was pending.
    pub(crate) fn flush_passive_effects(&self) -> bool {
        let pending = match self.state.try_borrow_mut() {
            Ok(mut state) => {
                state.passive_flush_scheduled = false;
                std::mem::take(&mut state.pending_passive)
            }
            Err(_) => return false,
        };
        if pending.is_empty() {
            return false;
        }
        run_passive_effects(pending);
        self.flush_requests();
        self.flush_sync_callbacks();
        true
    }
}

//! Root container and the public entry points.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::commit_work::PendingPassiveEffects;
use crate::context::ContextStack;
use crate::element::Child;
use crate::error::RenderError;
use crate::fiber::{create_host_root_fiber, FiberArena, FiberId};
use crate::host::{HostConfig, HostId};
use crate::lanes::{request_update_lane, Lane, Lanes, NO_LANE, NO_LANES};
use crate::options::RootOptions;
use crate::scheduler::{TaskScheduler, TaskToken};
use crate::sync_queue::SyncQueue;
use crate::update_queue::{Action, Update, UpdateQueue};

/// Mutable per-root bookkeeping. Borrowed for the whole of a render slice
/// or a commit; anything that arrives meanwhile goes through
/// [`RootInner::request_update`].
pub(crate) struct RootState {
    pub fibers: FiberArena,
    pub current: FiberId,
    pub finished_work: Option<FiberId>,
    pub finished_lane: Lane,
    pub pending_lanes: Lanes,
    /// Lanes of updates scheduled while a render was paused between slices.
    /// Put back into `pending_lanes` when that render commits.
    pub interleaved_lanes: Lanes,
    pub callback_node: Option<TaskToken>,
    pub callback_priority: Lane,
    pub sync_scheduled: bool,
    pub pending_passive: PendingPassiveEffects,
    pub passive_flush_scheduled: bool,
    pub wip_root: Option<FiberId>,
    pub wip: Option<FiberId>,
    pub render_lane: Lane,
    pub nested_update_count: usize,
    pub last_error: Option<RenderError>,
}

pub(crate) struct RootInner {
    pub(crate) this: Weak<RootInner>,
    pub(crate) container: HostId,
    pub(crate) state: RefCell<RootState>,
    pub(crate) requests: RefCell<VecDeque<(Option<FiberId>, Lane)>>,
    pub(crate) sync_queue: SyncQueue,
    pub(crate) context: Rc<RefCell<ContextStack>>,
    pub(crate) root_queue: Rc<RefCell<UpdateQueue<Child>>>,
    pub(crate) host: Rc<dyn HostConfig>,
    pub(crate) scheduler: Rc<dyn TaskScheduler>,
    pub(crate) options: RootOptions,
    pub(crate) is_rendering: Cell<bool>,
    pub(crate) render_phase_update: Cell<bool>,
    mounted: Cell<bool>,
}

impl RootState {
    /// Clears `lane` from the pending set once its work has committed or
    /// failed, restoring lanes that arrived while that render was paused.
    pub(crate) fn mark_root_finished(&mut self, lane: Lane) {
        self.pending_lanes.remove(lane);
        let interleaved = std::mem::take(&mut self.interleaved_lanes);
        self.pending_lanes |= interleaved;
    }
}

impl RootInner {
    pub(crate) fn scheduler(&self) -> &dyn TaskScheduler {
        &*self.scheduler
    }
}

/// Handle to a rendered tree inside one host container.
///
/// Dropping the handle does not unmount; call [`Root::unmount`] first when
/// host nodes and effect cleanups should be released.
pub struct Root {
    inner: Rc<RootInner>,
}

impl Root {
    pub fn new(
        container: HostId,
        host: Rc<dyn HostConfig>,
        scheduler: Rc<dyn TaskScheduler>,
    ) -> Self {
        Self::with_options(container, host, scheduler, RootOptions::default())
    }

    pub fn with_options(
        container: HostId,
        host: Rc<dyn HostConfig>,
        scheduler: Rc<dyn TaskScheduler>,
        options: RootOptions,
    ) -> Self {
        let root_queue = Rc::new(RefCell::new(UpdateQueue::new()));
        let mut fibers = FiberArena::new();
        let current = create_host_root_fiber(&mut fibers, container, Rc::clone(&root_queue));
        let inner = Rc::new_cyclic(|this| RootInner {
            this: this.clone(),
            container,
            state: RefCell::new(RootState {
                fibers,
                current,
                finished_work: None,
                finished_lane: NO_LANE,
                pending_lanes: NO_LANES,
                interleaved_lanes: NO_LANES,
                callback_node: None,
                callback_priority: NO_LANE,
                sync_scheduled: false,
                pending_passive: PendingPassiveEffects::default(),
                passive_flush_scheduled: false,
                wip_root: None,
                wip: None,
                render_lane: NO_LANE,
                nested_update_count: 0,
                last_error: None,
            }),
            requests: RefCell::new(VecDeque::new()),
            sync_queue: SyncQueue::default(),
            context: Rc::new(RefCell::new(ContextStack::default())),
            root_queue,
            host,
            scheduler,
            options,
            is_rendering: Cell::new(false),
            render_phase_update: Cell::new(false),
            mounted: Cell::new(false),
        });
        log::debug!("created root for container {container}");
        Self { inner }
    }

    /// Schedules `child` as the root's content. The first render is
    /// synchronous; later ones use the lane of the calling context.
    pub fn render(&self, child: impl Into<Child>) {
        let lane = if self.inner.mounted.replace(true) {
            request_update_lane(self.inner.scheduler())
        } else {
            Lanes::SYNC
        };
        self.enqueue(child.into(), lane);
    }

    /// Renders nothing at `SYNC` priority, removing every host node and
    /// running every effect cleanup once the microtask flush runs.
    pub fn unmount(&self) {
        self.inner.mounted.set(true);
        self.enqueue(Child::Empty, Lanes::SYNC);
    }

    fn enqueue(&self, child: Child, lane: Lane) {
        self.inner
            .root_queue
            .borrow_mut()
            .enqueue(Update::new(Action::Replace(child), lane));
        self.inner.request_update(None, lane);
    }

    pub fn container(&self) -> HostId {
        self.inner.container
    }

    /// Lanes with scheduled but uncommitted work. Empty while the root is
    /// mid-render.
    pub fn pending_lanes(&self) -> Lanes {
        self.inner
            .state
            .try_borrow()
            .map(|state| state.pending_lanes)
            .unwrap_or_default()
    }

    /// The last render failure, if any, clearing it.
    pub fn take_render_error(&self) -> Option<RenderError> {
        self.inner
            .state
            .try_borrow_mut()
            .ok()
            .and_then(|mut state| state.last_error.take())
    }

    /// Indented listing of the committed fiber tree.
    pub fn debug_tree(&self) -> String {
        match self.inner.state.try_borrow() {
            Ok(state) => state.fibers.dump(state.current),
            Err(_) => String::from("<root is rendering>"),
        }
    }

    /// Number of fibers currently allocated, both trees included.
    pub fn fiber_count(&self) -> usize {
        self.inner
            .state
            .try_borrow()
            .map(|state| state.fibers.len())
            .unwrap_or_default()
    }
}

pub fn create_root(
    container: HostId,
    host: Rc<dyn HostConfig>,
    scheduler: Rc<dyn TaskScheduler>,
) -> Root {
    Root::new(container, host, scheduler)
}

pub fn update_root(child: impl Into<Child>, root: &Root) {
    root.render(child);
}

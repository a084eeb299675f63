//! State and effect runtime for function components.
//!
//! A [`HookFrame`] is pushed on a thread-local stack while a component
//! renders. Hook calls read their previous cell from the frame by call
//! position and append the next cell. User callbacks (initializers,
//! reducers) never run while the stack is borrowed.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::context::{Context, ContextStack};
use crate::element::{Child, Component};
use crate::error::{HookError, RenderError};
use crate::fiber::{FiberArena, FiberId, FiberUpdateQueue, MemoizedState};
use crate::flags::{Flags, HookFlags};
use crate::lanes::{request_update_lane, Lanes, TransitionScope};
use crate::mutable_ref::MutableRef;
use crate::root::RootInner;
use crate::update_queue::{process_update_queue, Action, Update, UpdateQueue, UpdateRing};

pub(crate) type StateValue = Rc<dyn Any>;

/// Effect dependencies, one hash per dependency value. Build with
/// [`deps!`](crate::deps).
pub type Deps = SmallVec<[u64; 4]>;

/// Hashes each expression into a [`Deps`] list.
///
/// ```ignore
/// use_effect(Some(deps![count, label]), |scope| scope.on_cleanup(|| {}));
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        $crate::Deps::new()
    };
    ($($dep:expr),+ $(,)?) => {{
        let mut deps = $crate::Deps::new();
        $(deps.push($crate::hash::hash_dep(&$dep));)+
        deps
    }};
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EffectScope;

/// What an effect's create callback returns: an optional cleanup.
#[derive(Default)]
pub struct EffectResult {
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl EffectScope {
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) -> EffectResult {
        EffectResult::new(cleanup)
    }
}

impl EffectResult {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    fn into_cleanup(self) -> Option<Box<dyn FnOnce()>> {
        self.cleanup
    }
}

type EffectCreate = Box<dyn FnOnce(EffectScope) -> EffectResult>;

/// Cleanup slot shared by every render of one effect call site.
#[derive(Default)]
pub(crate) struct EffectInstance {
    destroy: RefCell<Option<Box<dyn FnOnce()>>>,
}

pub(crate) struct Effect {
    tag: HookFlags,
    create: RefCell<Option<EffectCreate>>,
    deps: Option<Deps>,
    inst: Rc<EffectInstance>,
}

impl Effect {
    pub(crate) fn tag(&self) -> HookFlags {
        self.tag
    }

    pub(crate) fn run_destroy(&self) {
        let destroy = self.inst.destroy.borrow_mut().take();
        if let Some(destroy) = destroy {
            destroy();
        }
    }

    pub(crate) fn run_create(&self) {
        let create = self.create.borrow_mut().take();
        if let Some(create) = create {
            let cleanup = create(EffectScope).into_cleanup();
            *self.inst.destroy.borrow_mut() = cleanup;
        }
    }
}

#[derive(Clone)]
pub(crate) struct StateHook {
    memoized: StateValue,
    base_state: StateValue,
    base_queue: Option<UpdateRing<StateValue>>,
    queue: Rc<RefCell<UpdateQueue<StateValue>>>,
}

#[derive(Clone)]
pub(crate) enum Hook {
    State(StateHook),
    Effect(Rc<Effect>),
    Ref(Rc<dyn Any>),
}

impl Hook {
    fn kind(&self) -> &'static str {
        match self {
            Hook::State(_) => "use_state",
            Hook::Effect(_) => "use_effect",
            Hook::Ref(_) => "use_ref",
        }
    }
}

pub(crate) struct HookFrame {
    fiber: FiberId,
    component: Rc<str>,
    lane: Lanes,
    root: Weak<RootInner>,
    context: Rc<RefCell<ContextStack>>,
    previous: Option<Vec<Hook>>,
    hooks: Vec<Hook>,
    effects: Vec<Rc<Effect>>,
    flags: Flags,
    current_base_queues: Vec<(usize, Option<UpdateRing<StateValue>>)>,
}

impl HookFrame {
    /// Previous cell at the next call position. `None` while mounting.
    fn next_previous(&self) -> Result<Option<Hook>, HookError> {
        let Some(previous) = &self.previous else {
            return Ok(None);
        };
        match previous.get(self.hooks.len()) {
            Some(hook) => Ok(Some(hook.clone())),
            None => Err(HookError::TooManyHooks {
                component: self.component.to_string(),
                previous: previous.len(),
            }),
        }
    }

    fn kind_mismatch(&self, expected: &'static str, found: &Hook) -> HookError {
        HookError::KindMismatch {
            component: self.component.to_string(),
            index: self.hooks.len(),
            expected,
            found: found.kind(),
        }
    }
}

thread_local! {
    static FRAMES: RefCell<Vec<HookFrame>> = const { RefCell::new(Vec::new()) };
}

/// Pops the frame pushed by [`enter_frame`] unless [`FrameGuard::finish`]
/// already did.
#[must_use = "FrameGuard pops the hook frame on drop"]
struct FrameGuard {
    finished: bool,
}

impl FrameGuard {
    fn finish(mut self) -> Option<HookFrame> {
        self.finished = true;
        FRAMES.with(|frames| frames.borrow_mut().pop())
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if !self.finished {
            FRAMES.with(|frames| {
                frames.borrow_mut().pop();
            });
        }
    }
}

fn enter_frame(frame: HookFrame) -> FrameGuard {
    FRAMES.with(|frames| frames.borrow_mut().push(frame));
    FrameGuard { finished: false }
}

/// Runs `f` against the innermost frame. Errors are raised as panics
/// carrying the [`HookError`] after the frame stack borrow is released.
fn with_frame<R>(
    hook: &'static str,
    f: impl FnOnce(&mut HookFrame) -> Result<R, HookError>,
) -> R {
    let result = FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        match frames.last_mut() {
            Some(frame) => f(frame),
            None => Err(HookError::OutsideRender { hook }),
        }
    });
    match result {
        Ok(value) => value,
        Err(error) => panic::panic_any(error),
    }
}

/// Setter returned by [`use_state`]. Cloning shares the target cell.
pub struct SetState<T> {
    root: Weak<RootInner>,
    fiber: FiberId,
    queue: Rc<RefCell<UpdateQueue<StateValue>>>,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            fiber: self.fiber,
            queue: Rc::clone(&self.queue),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> SetState<T> {
    pub fn set(&self, value: T) {
        self.dispatch(Action::Replace(Rc::new(value)));
    }

    /// Queues `f(previous)` as the next state.
    pub fn update(&self, f: impl Fn(&T) -> T + 'static) {
        self.dispatch(Action::Reduce(Rc::new(move |state: &StateValue| {
            match state.downcast_ref::<T>() {
                Some(value) => Rc::new(f(value)) as StateValue,
                None => Rc::clone(state),
            }
        })));
    }

    fn dispatch(&self, action: Action<StateValue>) {
        let Some(root) = self.root.upgrade() else {
            log::debug!("dropping state update: root is gone");
            return;
        };
        let lane = request_update_lane(root.scheduler());
        self.queue.borrow_mut().enqueue(Update::new(action, lane));
        root.request_update(Some(self.fiber), lane);
    }
}

pub fn use_state<T: Clone + 'static>(init: impl FnOnce() -> T) -> (T, SetState<T>) {
    let (previous, fiber, lane, root, component, index) = with_frame("use_state", |frame| {
        let previous = match frame.next_previous()? {
            None => None,
            Some(Hook::State(hook)) => Some(hook),
            Some(other) => return Err(frame.kind_mismatch("use_state", &other)),
        };
        Ok((
            previous,
            frame.fiber,
            frame.lane,
            frame.root.clone(),
            Rc::clone(&frame.component),
            frame.hooks.len(),
        ))
    });

    let mut saved_base_queue = None;
    let hook = match previous {
        None => {
            let initial: StateValue = Rc::new(init());
            StateHook {
                memoized: Rc::clone(&initial),
                base_state: initial,
                base_queue: None,
                queue: Rc::new(RefCell::new(UpdateQueue::new())),
            }
        }
        Some(mut hook) => {
            let pending = hook.queue.borrow_mut().take_pending();
            let had_pending = pending.is_some();
            let merged = UpdateRing::merge(hook.base_queue.take(), pending);
            if had_pending {
                saved_base_queue = Some(merged.clone());
            }
            if let Some(ring) = merged {
                let processed = process_update_queue(Rc::clone(&hook.base_state), &ring, lane);
                hook.memoized = processed.memoized_state;
                hook.base_state = processed.base_state;
                hook.base_queue = processed.base_queue;
            }
            hook
        }
    };

    let Some(state) = hook.memoized.downcast_ref::<T>().cloned() else {
        panic::panic_any(HookError::StateTypeMismatch {
            component: component.to_string(),
            index,
            expected: type_name::<T>(),
        });
    };
    let setter = SetState {
        root,
        fiber,
        queue: Rc::clone(&hook.queue),
        _marker: PhantomData,
    };

    with_frame("use_state", move |frame| {
        if let Some(ring) = saved_base_queue {
            frame.current_base_queues.push((frame.hooks.len(), ring));
        }
        frame.hooks.push(Hook::State(hook));
        Ok(())
    });
    (state, setter)
}

/// Records a passive effect. `deps == None` re-runs after every commit.
pub fn use_effect<F>(deps: Option<Deps>, create: F)
where
    F: FnOnce(EffectScope) -> EffectResult + 'static,
{
    with_frame("use_effect", move |frame| {
        let (inst, changed) = match frame.next_previous()? {
            None => (Rc::new(EffectInstance::default()), true),
            Some(Hook::Effect(previous)) => {
                let changed = match (&deps, &previous.deps) {
                    (Some(next), Some(prev)) => next != prev,
                    _ => true,
                };
                (Rc::clone(&previous.inst), changed)
            }
            Some(other) => return Err(frame.kind_mismatch("use_effect", &other)),
        };
        let tag = if changed {
            frame.flags |= Flags::PASSIVE;
            HookFlags::PASSIVE | HookFlags::HAS_EFFECT
        } else {
            HookFlags::PASSIVE
        };
        let effect = Rc::new(Effect {
            tag,
            create: RefCell::new(Some(Box::new(create))),
            deps,
            inst,
        });
        frame.effects.push(Rc::clone(&effect));
        frame.hooks.push(Hook::Effect(effect));
        Ok(())
    })
}

pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> MutableRef<T> {
    let (previous, component, index) = with_frame("use_ref", |frame| {
        let previous = match frame.next_previous()? {
            None => None,
            Some(Hook::Ref(cell)) => Some(cell),
            Some(other) => return Err(frame.kind_mismatch("use_ref", &other)),
        };
        Ok((previous, Rc::clone(&frame.component), frame.hooks.len()))
    });

    let cell: Rc<dyn Any> = match previous {
        Some(cell) => cell,
        None => Rc::new(MutableRef::new(init())),
    };
    let Some(handle) = cell.downcast_ref::<MutableRef<T>>().cloned() else {
        panic::panic_any(HookError::StateTypeMismatch {
            component: component.to_string(),
            index,
            expected: type_name::<T>(),
        });
    };

    with_frame("use_ref", move |frame| {
        frame.hooks.push(Hook::Ref(cell));
        Ok(())
    });
    handle
}

/// Nearest provided value of `context`, or its default.
pub fn use_context<T: Clone + 'static>(context: &Context<T>) -> T {
    let provided = with_frame("use_context", |frame| {
        Ok(frame.context.borrow().read(context.id()))
    });
    provided
        .and_then(|value| value.downcast_ref::<T>().cloned())
        .unwrap_or_else(|| context.default_value().clone())
}

/// Starts transitions and reports whether one is pending.
#[derive(Clone)]
pub struct StartTransition {
    set_pending: SetState<bool>,
}

impl StartTransition {
    /// Marks the transition pending at the current lane, then runs `f` with
    /// its updates on the transition lane.
    pub fn start(&self, f: impl FnOnce()) {
        self.set_pending.set(true);
        let _scope = TransitionScope::enter();
        self.set_pending.set(false);
        f();
    }
}

pub fn use_transition() -> (bool, StartTransition) {
    let (pending, set_pending) = use_state(|| false);
    (pending, StartTransition { set_pending })
}

/// Render environment handed to [`render_with_hooks`] by `begin_work`.
pub(crate) struct HookEnv<'a> {
    pub root: &'a Weak<RootInner>,
    pub context: &'a Rc<RefCell<ContextStack>>,
    pub lane: Lanes,
}

/// Invokes `component` for the in-progress fiber `wip` and stores its hooks,
/// effects and flags. Panics raised by the component are caught here.
pub(crate) fn render_with_hooks(
    fibers: &mut FiberArena,
    wip: FiberId,
    component: &Component,
    env: HookEnv<'_>,
) -> Result<Child, RenderError> {
    let props = fibers[wip].pending_props.clone();
    let current = fibers[wip].alternate.filter(|id| fibers.contains(*id));
    let previous = current.map(|id| fibers[id].memoized_state.hooks().to_vec());

    let guard = enter_frame(HookFrame {
        fiber: wip,
        component: Rc::from(component.name()),
        lane: env.lane,
        root: env.root.clone(),
        context: Rc::clone(env.context),
        previous,
        hooks: Vec::new(),
        effects: Vec::new(),
        flags: Flags::empty(),
        current_base_queues: Vec::new(),
    });
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| component.render(&props)));
    let Some(mut frame) = guard.finish() else {
        return Err(RenderError::ComponentPanicked {
            component: component.name().to_string(),
            message: "hook frame was lost during render".to_string(),
        });
    };

    // consumed updates stay on the committed cells even if this pass fails
    if let Some(current) = current {
        if let MemoizedState::Hooks(hooks) = &mut fibers[current].memoized_state {
            for (index, ring) in frame.current_base_queues.drain(..) {
                if let Some(Hook::State(hook)) = hooks.get_mut(index) {
                    hook.base_queue = ring;
                }
            }
        }
    }

    let child = outcome.map_err(|payload| RenderError::from_panic(component.name(), payload))?;

    if let Some(previous) = &frame.previous {
        if frame.hooks.len() < previous.len() {
            return Err(HookError::TooFewHooks {
                component: component.name().to_string(),
                previous: previous.len(),
                rendered: frame.hooks.len(),
            }
            .into());
        }
    }

    let fiber = &mut fibers[wip];
    fiber.memoized_state = MemoizedState::Hooks(frame.hooks);
    fiber.update_queue = if frame.effects.is_empty() {
        FiberUpdateQueue::None
    } else {
        FiberUpdateQueue::Effects(Rc::from(frame.effects))
    };
    fiber.flags |= frame.flags;
    Ok(child)
}

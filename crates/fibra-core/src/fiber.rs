//! Work nodes and the per-root arena that owns them.
//!
//! Links between fibers (`parent`, `child`, `sibling`, `alternate`) are
//! generational [`FiberId`]s into a [`FiberArena`]. Each logical position in
//! the tree owns at most two fibers, the committed one and its in-progress
//! alternate, which swap roles on every commit.

use std::cell::RefCell;
use std::fmt::{self, Write as _};
use std::ops::{Index, IndexMut};
use std::rc::Rc;

use smallvec::SmallVec;

use crate::context::ContextId;
use crate::element::{Child, Component, Element, ElementType, Key};
use crate::flags::Flags;
use crate::hooks::{Effect, Hook};
use crate::host::HostId;
use crate::mutable_ref::HostRef;
use crate::props::{Attributes, PropValue, Props};
use crate::update_queue::{UpdateQueue, UpdateRing};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId {
    index: u32,
    generation: u32,
}

impl fmt::Debug for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Clone, Debug)]
pub enum FiberKind {
    HostRoot,
    HostComponent(Rc<str>),
    HostText,
    FunctionComponent(Component),
    Fragment,
    ContextProvider(ContextId),
    Suspense,
    Offscreen,
}

impl FiberKind {
    pub(crate) fn from_element_type(ty: &ElementType) -> Self {
        match ty {
            ElementType::Host(name) => FiberKind::HostComponent(Rc::clone(name)),
            ElementType::Component(component) => FiberKind::FunctionComponent(component.clone()),
            ElementType::Fragment => FiberKind::Fragment,
            ElementType::Provider(id) => FiberKind::ContextProvider(*id),
            ElementType::Suspense => FiberKind::Suspense,
        }
    }

    /// Whether a fiber of this kind can be reused for a descriptor of `ty`.
    pub(crate) fn matches(&self, ty: &ElementType) -> bool {
        match (self, ty) {
            (FiberKind::HostComponent(a), ElementType::Host(b)) => a == b,
            (FiberKind::FunctionComponent(a), ElementType::Component(b)) => a.same(b),
            (FiberKind::Fragment, ElementType::Fragment) => true,
            (FiberKind::ContextProvider(a), ElementType::Provider(b)) => a == b,
            (FiberKind::Suspense, ElementType::Suspense) => true,
            _ => false,
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, FiberKind::HostComponent(_) | FiberKind::HostText)
    }

    pub fn name(&self) -> &str {
        match self {
            FiberKind::HostRoot => "HostRoot",
            FiberKind::HostComponent(ty) => ty,
            FiberKind::HostText => "#text",
            FiberKind::FunctionComponent(component) => component.name(),
            FiberKind::Fragment => "Fragment",
            FiberKind::ContextProvider(_) => "Provider",
            FiberKind::Suspense => "Suspense",
            FiberKind::Offscreen => "Offscreen",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffscreenMode {
    Visible,
    Hidden,
}

impl OffscreenMode {
    const ATTR: &'static str = "mode";

    fn as_str(self) -> &'static str {
        match self {
            OffscreenMode::Visible => "visible",
            OffscreenMode::Hidden => "hidden",
        }
    }

    pub(crate) fn props(self, children: Child) -> Props {
        let mut attrs = Attributes::new();
        attrs.insert(Rc::from(Self::ATTR), PropValue::from(self.as_str()));
        Props::new(attrs, children)
    }

    pub(crate) fn of(props: &Props) -> OffscreenMode {
        match props.str(Self::ATTR) {
            Some("hidden") => OffscreenMode::Hidden,
            _ => OffscreenMode::Visible,
        }
    }
}

/// State a host root keeps between renders.
#[derive(Clone, Default)]
pub(crate) struct RootMemo {
    pub element: Child,
    pub base_state: Child,
    pub base_queue: Option<UpdateRing<Child>>,
}

#[derive(Clone, Default)]
pub(crate) enum MemoizedState {
    #[default]
    None,
    Root(RootMemo),
    Hooks(Vec<Hook>),
}

impl MemoizedState {
    pub(crate) fn hooks(&self) -> &[Hook] {
        match self {
            MemoizedState::Hooks(hooks) => hooks,
            _ => &[],
        }
    }
}

#[derive(Clone, Default)]
pub(crate) enum FiberUpdateQueue {
    #[default]
    None,
    Root(Rc<RefCell<UpdateQueue<Child>>>),
    Effects(Rc<[Rc<Effect>]>),
}

impl FiberUpdateQueue {
    pub(crate) fn effects(&self) -> Option<&Rc<[Rc<Effect>]>> {
        match self {
            FiberUpdateQueue::Effects(effects) => Some(effects),
            _ => None,
        }
    }
}

pub(crate) type Deletions = SmallVec<[FiberId; 2]>;

#[derive(Clone)]
pub struct Fiber {
    pub(crate) kind: FiberKind,
    pub(crate) key: Option<Key>,
    pub(crate) pending_props: Props,
    pub(crate) memoized_props: Option<Props>,
    pub(crate) state_node: Option<HostId>,
    pub(crate) host_ref: Option<HostRef>,
    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) index: usize,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) flags: Flags,
    pub(crate) subtree_flags: Flags,
    pub(crate) deletions: Deletions,
    pub(crate) memoized_state: MemoizedState,
    pub(crate) update_queue: FiberUpdateQueue,
}

impl Fiber {
    pub(crate) fn new(kind: FiberKind, pending_props: Props, key: Option<Key>) -> Self {
        Self {
            kind,
            key,
            pending_props,
            memoized_props: None,
            state_node: None,
            host_ref: None,
            parent: None,
            child: None,
            sibling: None,
            index: 0,
            alternate: None,
            flags: Flags::empty(),
            subtree_flags: Flags::empty(),
            deletions: Deletions::new(),
            memoized_state: MemoizedState::None,
            update_queue: FiberUpdateQueue::None,
        }
    }

    pub fn kind(&self) -> &FiberKind {
        &self.kind
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn subtree_flags(&self) -> Flags {
        self.subtree_flags
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn child(&self) -> Option<FiberId> {
        self.child
    }

    pub fn sibling(&self) -> Option<FiberId> {
        self.sibling
    }

    pub fn parent(&self) -> Option<FiberId> {
        self.parent
    }

    pub fn alternate(&self) -> Option<FiberId> {
        self.alternate
    }

    pub fn state_node(&self) -> Option<HostId> {
        self.state_node
    }

    pub fn deletions(&self) -> &[FiberId] {
        &self.deletions
    }

    pub fn pending_props(&self) -> &Props {
        &self.pending_props
    }
}

struct Slot {
    generation: u32,
    fiber: Option<Fiber>,
}

/// Slot arena for one root's fibers.
#[derive(Default)]
pub struct FiberArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl FiberArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, fiber: Fiber) -> FiberId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.fiber = Some(fiber);
            return FiberId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            fiber: Some(fiber),
        });
        FiberId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.fiber.as_ref())
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.fiber.as_mut())
    }

    pub fn contains(&self, id: FiberId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.fiber.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if slot.fiber.take().is_some() {
                self.free.push(index as u32);
            }
        }
    }

    /// Frees every fiber that is neither reachable from `root` through child
    /// and sibling links nor the alternate of such a fiber.
    pub fn retain_reachable(&mut self, root: FiberId) -> usize {
        let mut live = vec![false; self.slots.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(fiber) = self.get(id) else {
                continue;
            };
            if live[id.index as usize] {
                continue;
            }
            live[id.index as usize] = true;
            if let Some(alternate) = fiber.alternate.filter(|alt| self.contains(*alt)) {
                live[alternate.index as usize] = true;
            }
            stack.extend(fiber.child);
            stack.extend(fiber.sibling);
        }
        let mut freed = 0;
        for (index, keep) in live.into_iter().enumerate() {
            if !keep && self.slots[index].fiber.is_some() {
                self.release(index);
                freed += 1;
            }
        }
        freed
    }

    /// Indented listing of the tree under `root`.
    pub fn dump(&self, root: FiberId) -> String {
        let mut output = String::new();
        self.dump_fiber(&mut output, root, 0);
        output
    }

    fn dump_fiber(&self, output: &mut String, id: FiberId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(fiber) = self.get(id) else {
            let _ = writeln!(output, "{indent}{id:?} (missing)");
            return;
        };
        let _ = write!(output, "{indent}{}", fiber.kind.name());
        if let Some(key) = &fiber.key {
            let _ = write!(output, " key={key}");
        }
        if let (FiberKind::HostText, Some(text)) =
            (&fiber.kind, fiber.pending_props.text_content())
        {
            let _ = write!(output, " {text:?}");
        }
        if let Some(host) = fiber.state_node {
            let _ = write!(output, " host={host}");
        }
        let _ = writeln!(output);
        let mut child = fiber.child;
        while let Some(id) = child {
            self.dump_fiber(output, id, depth + 1);
            child = self.get(id).and_then(|fiber| fiber.sibling);
        }
    }
}

impl Index<FiberId> for FiberArena {
    type Output = Fiber;

    fn index(&self, id: FiberId) -> &Fiber {
        match self.get(id) {
            Some(fiber) => fiber,
            None => panic!("stale fiber id {id:?}"),
        }
    }
}

impl IndexMut<FiberId> for FiberArena {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber {
        match self.get_mut(id) {
            Some(fiber) => fiber,
            None => panic!("stale fiber id {id:?}"),
        }
    }
}

/// Returns the in-progress twin of `current` carrying `pending_props`,
/// recycling the alternate when one exists.
pub(crate) fn create_work_in_progress(
    fibers: &mut FiberArena,
    current: FiberId,
    pending_props: Props,
) -> FiberId {
    let source = &fibers[current];
    let kind = source.kind.clone();
    let update_queue = source.update_queue.clone();
    let child = source.child;
    let memoized_props = source.memoized_props.clone();
    let memoized_state = source.memoized_state.clone();
    let host_ref = source.host_ref.clone();
    let index = source.index;

    let wip = match source.alternate.filter(|alt| fibers.contains(*alt)) {
        Some(wip) => {
            let fiber = &mut fibers[wip];
            fiber.pending_props = pending_props;
            fiber.flags = Flags::empty();
            fiber.subtree_flags = Flags::empty();
            fiber.deletions.clear();
            wip
        }
        None => {
            let mut fiber = Fiber::new(kind.clone(), pending_props, source.key.clone());
            fiber.state_node = source.state_node;
            fiber.alternate = Some(current);
            let wip = fibers.alloc(fiber);
            fibers[current].alternate = Some(wip);
            wip
        }
    };

    let fiber = &mut fibers[wip];
    fiber.kind = kind;
    fiber.update_queue = update_queue;
    fiber.child = child;
    fiber.memoized_props = memoized_props;
    fiber.memoized_state = memoized_state;
    fiber.host_ref = host_ref;
    fiber.index = index;
    fiber.sibling = None;
    wip
}

pub(crate) fn create_fiber_from_element(fibers: &mut FiberArena, element: &Element) -> FiberId {
    if element.is_fragment() {
        return create_fiber_from_fragment(
            fibers,
            element.props().children().clone(),
            element.key().cloned(),
        );
    }
    let mut fiber = Fiber::new(
        FiberKind::from_element_type(element.ty()),
        element.props().clone(),
        element.key().cloned(),
    );
    fiber.host_ref = element.host_ref().cloned();
    fibers.alloc(fiber)
}

pub(crate) fn create_fiber_from_fragment(
    fibers: &mut FiberArena,
    children: Child,
    key: Option<Key>,
) -> FiberId {
    fibers.alloc(Fiber::new(
        FiberKind::Fragment,
        Props::from_children(children),
        key,
    ))
}

pub(crate) fn create_fiber_from_text(fibers: &mut FiberArena, content: Rc<str>) -> FiberId {
    fibers.alloc(Fiber::new(FiberKind::HostText, Props::text(content), None))
}

pub(crate) fn create_fiber_from_offscreen(
    fibers: &mut FiberArena,
    mode: OffscreenMode,
    children: Child,
) -> FiberId {
    fibers.alloc(Fiber::new(FiberKind::Offscreen, mode.props(children), None))
}

pub(crate) fn create_host_root_fiber(
    fibers: &mut FiberArena,
    container: HostId,
    queue: Rc<RefCell<UpdateQueue<Child>>>,
) -> FiberId {
    let mut fiber = Fiber::new(FiberKind::HostRoot, Props::default(), None);
    fiber.state_node = Some(container);
    fiber.update_queue = FiberUpdateQueue::Root(queue);
    fiber.memoized_state = MemoizedState::Root(RootMemo::default());
    fibers.alloc(fiber)
}

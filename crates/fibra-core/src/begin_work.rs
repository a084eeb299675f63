use std::any::Any;
use std::rc::Rc;

use crate::child_fibers::{MOUNT_CHILD_FIBERS, RECONCILE_CHILD_FIBERS};
use crate::context::PROVIDER_VALUE;
use crate::element::{Child, FALLBACK, SUSPENDED};
use crate::error::RenderError;
use crate::fiber::{
    create_fiber_from_fragment, create_fiber_from_offscreen, create_work_in_progress, FiberArena,
    FiberId, FiberKind, FiberUpdateQueue, MemoizedState, OffscreenMode, RootMemo,
};
use crate::flags::Flags;
use crate::hooks::{render_with_hooks, HookEnv};
use crate::props::Props;
use crate::update_queue::{process_update_queue, UpdateRing};
use crate::work_loop::WorkContext;

/// Renders one fiber and returns its first child, if any.
pub(crate) fn begin_work(
    fibers: &mut FiberArena,
    wip: FiberId,
    cx: &WorkContext<'_>,
) -> Result<Option<FiberId>, RenderError> {
    let kind = fibers[wip].kind.clone();
    log::trace!("begin {} {wip:?}", kind.name());
    let next = match kind {
        FiberKind::HostRoot => update_host_root(fibers, wip, cx),
        FiberKind::HostComponent(_) => {
            mark_ref(fibers, wip);
            let children = fibers[wip].pending_props.children().clone();
            reconcile_children(fibers, wip, &children)
        }
        FiberKind::HostText => None,
        FiberKind::FunctionComponent(component) => {
            let env = HookEnv {
                root: cx.root,
                context: cx.context,
                lane: cx.lane,
            };
            let children = render_with_hooks(fibers, wip, &component, env)?;
            reconcile_children(fibers, wip, &children)
        }
        FiberKind::Fragment | FiberKind::Offscreen => {
            let children = fibers[wip].pending_props.children().clone();
            reconcile_children(fibers, wip, &children)
        }
        FiberKind::ContextProvider(id) => {
            let props = fibers[wip].pending_props.clone();
            let value = match props.any(PROVIDER_VALUE) {
                Some(value) => Rc::clone(value),
                None => {
                    log::warn!("provider {id:?} rendered without a value");
                    Rc::new(()) as Rc<dyn Any>
                }
            };
            cx.context.borrow_mut().push(id, value);
            reconcile_children(fibers, wip, props.children())
        }
        FiberKind::Suspense => update_suspense_component(fibers, wip),
    };
    Ok(next)
}

fn current_of(fibers: &FiberArena, wip: FiberId) -> Option<FiberId> {
    fibers[wip].alternate.filter(|id| fibers.contains(*id))
}

fn reconcile_children(fibers: &mut FiberArena, wip: FiberId, children: &Child) -> Option<FiberId> {
    let first = match current_of(fibers, wip) {
        Some(current) => {
            let current_child = fibers[current].child;
            RECONCILE_CHILD_FIBERS.reconcile(fibers, wip, current_child, children)
        }
        None => MOUNT_CHILD_FIBERS.reconcile(fibers, wip, None, children),
    };
    fibers[wip].child = first;
    first
}

fn update_host_root(fibers: &mut FiberArena, wip: FiberId, cx: &WorkContext<'_>) -> Option<FiberId> {
    let queue = match &fibers[wip].update_queue {
        FiberUpdateQueue::Root(queue) => Some(Rc::clone(queue)),
        _ => None,
    };
    let memo = match &fibers[wip].memoized_state {
        MemoizedState::Root(memo) => memo.clone(),
        _ => RootMemo::default(),
    };

    let pending = queue.and_then(|queue| queue.borrow_mut().take_pending());
    let had_pending = pending.is_some();
    let merged = UpdateRing::merge(memo.base_queue.clone(), pending);
    if had_pending {
        if let Some(current) = current_of(fibers, wip) {
            if let MemoizedState::Root(current_memo) = &mut fibers[current].memoized_state {
                current_memo.base_queue = merged.clone();
            }
        }
    }

    let mut next = memo;
    if let Some(ring) = &merged {
        let processed = process_update_queue(next.base_state.clone(), ring, cx.lane);
        next.element = processed.memoized_state;
        next.base_state = processed.base_state;
        next.base_queue = processed.base_queue;
    }
    let element = next.element.clone();
    fibers[wip].memoized_state = MemoizedState::Root(next);
    reconcile_children(fibers, wip, &element)
}

fn mark_ref(fibers: &mut FiberArena, wip: FiberId) {
    let fiber = &fibers[wip];
    let changed = match current_of(fibers, wip) {
        None => fiber.host_ref.is_some(),
        Some(current) => fibers[current].host_ref != fiber.host_ref,
    };
    if changed {
        fibers[wip].flags |= Flags::REF;
    }
}

fn update_suspense_component(fibers: &mut FiberArena, wip: FiberId) -> Option<FiberId> {
    let props = fibers[wip].pending_props.clone();
    let suspended = props.bool(SUSPENDED).unwrap_or(false);
    let primary_children = props.children().clone();
    let fallback_children = props.child(FALLBACK).cloned().unwrap_or_default();

    let current_primary = current_of(fibers, wip).and_then(|current| fibers[current].child);
    let current_fallback = current_primary.and_then(|primary| fibers[primary].sibling);

    let mode = if suspended {
        OffscreenMode::Hidden
    } else {
        OffscreenMode::Visible
    };
    let primary = match current_primary {
        Some(current) => create_work_in_progress(fibers, current, mode.props(primary_children)),
        None => create_fiber_from_offscreen(fibers, mode, primary_children),
    };
    {
        let fiber = &mut fibers[primary];
        fiber.parent = Some(wip);
        fiber.index = 0;
        fiber.sibling = None;
    }
    fibers[wip].child = Some(primary);

    if suspended {
        let fallback = match current_fallback {
            Some(current) => {
                create_work_in_progress(fibers, current, Props::from_children(fallback_children))
            }
            None => {
                let created = create_fiber_from_fragment(fibers, fallback_children, None);
                if current_primary.is_some() {
                    fibers[created].flags |= Flags::PLACEMENT;
                }
                created
            }
        };
        let fiber = &mut fibers[fallback];
        fiber.parent = Some(wip);
        fiber.index = 1;
        fiber.sibling = None;
        fibers[primary].sibling = Some(fallback);
    } else if let Some(fallback) = current_fallback {
        let boundary = &mut fibers[wip];
        boundary.deletions.push(fallback);
        boundary.flags |= Flags::CHILD_DELETION;
    }

    Some(primary)
}

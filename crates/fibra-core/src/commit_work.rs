//! Mutation and layout phases of a commit, and the passive effect flush.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::fiber::{FiberArena, FiberId, FiberKind, OffscreenMode};
use crate::flags::{Flags, HookFlags};
use crate::hooks::Effect;
use crate::host::{HostConfig, HostId};

type EffectList = Rc<[Rc<Effect>]>;

/// Effect lists queued by a commit, run later by
/// [`run_passive_effects`].
#[derive(Default)]
pub(crate) struct PendingPassiveEffects {
    pub unmount: Vec<EffectList>,
    pub update: Vec<EffectList>,
}

impl PendingPassiveEffects {
    pub(crate) fn is_empty(&self) -> bool {
        self.unmount.is_empty() && self.update.is_empty()
    }
}

/// Runs every unmount cleanup, then the cleanups of changed effects, then
/// their creates. No create runs before all cleanups have.
pub(crate) fn run_passive_effects(effects: PendingPassiveEffects) {
    for list in &effects.unmount {
        for effect in list.iter() {
            if effect.tag().contains(HookFlags::PASSIVE) {
                effect.run_destroy();
            }
        }
    }
    let changed = HookFlags::PASSIVE | HookFlags::HAS_EFFECT;
    for list in &effects.update {
        for effect in list.iter().filter(|effect| effect.tag().contains(changed)) {
            effect.run_destroy();
        }
    }
    for list in &effects.update {
        for effect in list.iter().filter(|effect| effect.tag().contains(changed)) {
            effect.run_create();
        }
    }
}

type HostNodes = SmallVec<[HostId; 4]>;

/// Host handles of the top-level host nodes in the subtree at `id`.
fn top_level_host_nodes(fibers: &FiberArena, id: FiberId) -> HostNodes {
    let mut nodes = HostNodes::new();
    collect_host_nodes(fibers, id, &mut nodes);
    nodes
}

fn collect_host_nodes(fibers: &FiberArena, id: FiberId, nodes: &mut HostNodes) {
    let fiber = &fibers[id];
    if fiber.kind.is_host() {
        nodes.extend(fiber.state_node);
        return;
    }
    let mut child = fiber.child;
    while let Some(next) = child {
        collect_host_nodes(fibers, next, nodes);
        child = fibers[next].sibling;
    }
}

fn is_host_parent(kind: &FiberKind) -> bool {
    matches!(kind, FiberKind::HostComponent(_) | FiberKind::HostRoot)
}

/// Host handle of `start` or its nearest host ancestor.
fn host_parent_from(fibers: &FiberArena, start: Option<FiberId>) -> Option<HostId> {
    let mut node = start;
    while let Some(id) = node {
        let fiber = fibers.get(id)?;
        if is_host_parent(&fiber.kind) {
            return fiber.state_node;
        }
        node = fiber.parent;
    }
    None
}

/// First stable host node after `id` in host order. Nodes that are
/// themselves being placed are skipped.
fn get_host_sibling(fibers: &FiberArena, id: FiberId) -> Option<HostId> {
    let mut node = id;
    'siblings: loop {
        while fibers[node].sibling.is_none() {
            let parent = fibers[node].parent?;
            if is_host_parent(&fibers[parent].kind) {
                return None;
            }
            node = parent;
        }
        node = fibers[node].sibling?;
        while !fibers[node].kind.is_host() {
            if fibers[node].flags.contains(Flags::PLACEMENT) {
                continue 'siblings;
            }
            match fibers[node].child {
                Some(child) => node = child,
                None => continue 'siblings,
            }
        }
        if !fibers[node].flags.contains(Flags::PLACEMENT) {
            return fibers[node].state_node;
        }
    }
}

fn commit_placement(fibers: &FiberArena, host: &dyn HostConfig, id: FiberId) {
    let Some(parent) = host_parent_from(fibers, fibers[id].parent) else {
        log::warn!("placement of {id:?} skipped: no host parent");
        return;
    };
    let before = get_host_sibling(fibers, id);
    for node in top_level_host_nodes(fibers, id) {
        match before {
            Some(before) => host.insert_child_to_container(parent, node, before),
            None => host.append_child_to_container(parent, node),
        }
    }
}

fn commit_update(fibers: &FiberArena, host: &dyn HostConfig, id: FiberId) {
    let fiber = &fibers[id];
    let Some(instance) = fiber.state_node else {
        return;
    };
    let Some(old) = fiber
        .alternate
        .and_then(|current| fibers.get(current))
        .and_then(|current| current.memoized_props.as_ref())
    else {
        return;
    };
    match &fiber.kind {
        FiberKind::HostComponent(ty) => host.commit_update(instance, ty, old, &fiber.pending_props),
        FiberKind::HostText => host.commit_text_update(
            instance,
            old.text_content().unwrap_or_default(),
            fiber.pending_props.text_content().unwrap_or_default(),
        ),
        _ => {}
    }
}

/// Unmounts the subtree at `child`, removed from under `parent`.
fn commit_deletion(
    fibers: &mut FiberArena,
    host: &dyn HostConfig,
    pending: &mut PendingPassiveEffects,
    parent: FiberId,
    child: FiberId,
) {
    if !fibers.contains(child) {
        log::warn!("deletion of stale fiber {child:?} skipped");
        return;
    }
    if matches!(fibers[child].kind, FiberKind::HostRoot) {
        log::warn!("deletion of a host root skipped");
        return;
    }

    let mut stack = vec![child];
    while let Some(id) = stack.pop() {
        let fiber = &fibers[id];
        match &fiber.kind {
            FiberKind::FunctionComponent(_) => {
                if let Some(effects) = fiber.update_queue.effects() {
                    pending.unmount.push(Rc::clone(effects));
                }
            }
            FiberKind::HostComponent(_) => {
                if let Some(host_ref) = &fiber.host_ref {
                    host_ref.detach();
                }
            }
            _ => {}
        }
        let mut children: SmallVec<[FiberId; 8]> = SmallVec::new();
        let mut next = fiber.child;
        while let Some(id) = next {
            children.push(id);
            next = fibers[id].sibling;
        }
        stack.extend(children.into_iter().rev());
    }

    match host_parent_from(fibers, Some(parent)) {
        Some(host_parent) => {
            for node in top_level_host_nodes(fibers, child) {
                host.remove_child(host_parent, node);
            }
        }
        None => log::warn!("removal of {child:?} skipped: no host parent"),
    }

    let alternate = fibers[child].alternate;
    fibers[child].parent = None;
    if let Some(fiber) = alternate.and_then(|id| fibers.get_mut(id)) {
        fiber.parent = None;
    }
}

fn commit_visibility(fibers: &FiberArena, host: &dyn HostConfig, id: FiberId) {
    let hidden = OffscreenMode::of(&fibers[id].pending_props) == OffscreenMode::Hidden;
    for node in top_level_host_nodes(fibers, id) {
        if hidden {
            host.hide_instance(node);
        } else {
            host.unhide_instance(node);
        }
    }
}

/// Applies host mutations for the finished tree rooted at `id`. Deletions
/// run before a node's children; the node's own flags after them.
pub(crate) fn commit_mutation_effects(
    fibers: &mut FiberArena,
    host: &dyn HostConfig,
    pending: &mut PendingPassiveEffects,
    id: FiberId,
) {
    let deletions = std::mem::take(&mut fibers[id].deletions);
    for child in deletions {
        commit_deletion(fibers, host, pending, id, child);
    }
    fibers[id].flags.remove(Flags::CHILD_DELETION);

    if fibers[id]
        .subtree_flags
        .intersects(Flags::MUTATION_MASK | Flags::PASSIVE_MASK)
    {
        let mut child = fibers[id].child;
        while let Some(next) = child {
            commit_mutation_effects(fibers, host, pending, next);
            child = fibers[next].sibling;
        }
    }

    let flags = fibers[id].flags;
    if flags.contains(Flags::PLACEMENT) {
        commit_placement(fibers, host, id);
        fibers[id].flags.remove(Flags::PLACEMENT);
    }
    if flags.contains(Flags::UPDATE) {
        commit_update(fibers, host, id);
        fibers[id].flags.remove(Flags::UPDATE);
    }
    if flags.contains(Flags::REF) {
        let previous = fibers[id]
            .alternate
            .and_then(|current| fibers.get(current))
            .and_then(|current| current.host_ref.clone());
        if let Some(previous) = previous {
            previous.detach();
        }
    }
    if flags.contains(Flags::PASSIVE) {
        if let Some(effects) = fibers[id].update_queue.effects() {
            pending.update.push(Rc::clone(effects));
        }
        fibers[id].flags.remove(Flags::PASSIVE);
    }
    if flags.contains(Flags::VISIBILITY) {
        commit_visibility(fibers, host, id);
        fibers[id].flags.remove(Flags::VISIBILITY);
    }
}

/// Attaches refs once the finished tree is current.
pub(crate) fn commit_layout_effects(fibers: &mut FiberArena, id: FiberId) {
    if fibers[id].subtree_flags.intersects(Flags::LAYOUT_MASK) {
        let mut child = fibers[id].child;
        while let Some(next) = child {
            commit_layout_effects(fibers, next);
            child = fibers[next].sibling;
        }
    }
    let fiber = &mut fibers[id];
    if fiber.flags.contains(Flags::REF) {
        fiber.flags.remove(Flags::REF);
        if let (Some(host_ref), Some(instance)) = (&fiber.host_ref, fiber.state_node) {
            host_ref.attach(instance);
        }
    }
}

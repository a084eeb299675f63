//! Child reconciliation: diffing the previous committed children of a fiber
//! against its next descriptor children.

use std::rc::Rc;

use crate::collections::map::{HashMap, HashSet};
use crate::element::{Child, Element, Key};
use crate::fiber::{
    create_fiber_from_element, create_fiber_from_fragment, create_fiber_from_text,
    create_work_in_progress, Fiber, FiberArena, FiberId, FiberKind,
};
use crate::flags::Flags;
use crate::props::Props;

/// Reconciler entry point. With `track_effects` off (mounting a fresh
/// subtree) no placement or deletion is recorded; the subtree is inserted
/// as a whole by its nearest placed ancestor.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChildReconciler {
    track_effects: bool,
}

pub(crate) const RECONCILE_CHILD_FIBERS: ChildReconciler = ChildReconciler {
    track_effects: true,
};

pub(crate) const MOUNT_CHILD_FIBERS: ChildReconciler = ChildReconciler {
    track_effects: false,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ChildKey {
    Explicit(Key),
    Index(usize),
}

impl ChildKey {
    fn of_fiber(fiber: &Fiber) -> Self {
        match &fiber.key {
            Some(key) => ChildKey::Explicit(Rc::clone(key)),
            None => ChildKey::Index(fiber.index),
        }
    }

    fn of_child(child: &Child, index: usize) -> Self {
        match child {
            Child::Element(element) => match element.key() {
                Some(key) => ChildKey::Explicit(Rc::clone(key)),
                None => ChildKey::Index(index),
            },
            _ => ChildKey::Index(index),
        }
    }
}

/// Previous children indexed for the keyed-list pass.
struct ExistingChildren {
    by_key: HashMap<ChildKey, FiberId>,
    reused: HashSet<FiberId>,
}

impl ExistingChildren {
    fn collect(fibers: &FiberArena, first: Option<FiberId>) -> Self {
        let mut by_key = HashMap::default();
        let mut current = first;
        while let Some(id) = current {
            let fiber = &fibers[id];
            if by_key.insert(ChildKey::of_fiber(fiber), id).is_some() {
                log::warn!("duplicate child key {:?} under one parent", fiber.key);
            }
            current = fiber.sibling;
        }
        Self {
            by_key,
            reused: HashSet::default(),
        }
    }

    fn get(&self, key: &ChildKey) -> Option<FiberId> {
        self.by_key.get(key).copied()
    }

    fn claim(&mut self, key: &ChildKey, id: FiberId) {
        self.by_key.remove(key);
        self.reused.insert(id);
    }
}

fn props_for_element(element: &Element) -> Props {
    if element.is_fragment() {
        Props::from_children(element.props().children().clone())
    } else {
        element.props().clone()
    }
}

impl ChildReconciler {
    /// Reconciles `new_child` against the chain starting at
    /// `current_first_child` and returns the first new child.
    pub(crate) fn reconcile(
        &self,
        fibers: &mut FiberArena,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        new_child: &Child,
    ) -> Option<FiberId> {
        let new_child = match new_child {
            Child::Element(element) if element.is_fragment() && element.key().is_none() => {
                element.props().children().clone()
            }
            other => other.clone(),
        };

        match &new_child {
            Child::Element(element) => {
                let fiber =
                    self.reconcile_single_element(fibers, return_fiber, current_first_child, element);
                Some(self.place_single_child(fibers, fiber))
            }
            Child::Text(content) => {
                let fiber = self.reconcile_single_text_node(
                    fibers,
                    return_fiber,
                    current_first_child,
                    content,
                );
                Some(self.place_single_child(fibers, fiber))
            }
            Child::Array(items) => {
                self.reconcile_children_array(fibers, return_fiber, current_first_child, items)
            }
            Child::Empty => {
                self.delete_remaining_children(fibers, return_fiber, current_first_child);
                None
            }
        }
    }

    fn delete_child(&self, fibers: &mut FiberArena, return_fiber: FiberId, child: FiberId) {
        if !self.track_effects {
            return;
        }
        let parent = &mut fibers[return_fiber];
        parent.deletions.push(child);
        parent.flags |= Flags::CHILD_DELETION;
    }

    fn delete_remaining_children(
        &self,
        fibers: &mut FiberArena,
        return_fiber: FiberId,
        first: Option<FiberId>,
    ) {
        if !self.track_effects {
            return;
        }
        let mut current = first;
        while let Some(child) = current {
            current = fibers[child].sibling;
            self.delete_child(fibers, return_fiber, child);
        }
    }

    fn use_fiber(&self, fibers: &mut FiberArena, fiber: FiberId, props: Props) -> FiberId {
        let clone = create_work_in_progress(fibers, fiber, props);
        let clone_fiber = &mut fibers[clone];
        clone_fiber.index = 0;
        clone_fiber.sibling = None;
        clone
    }

    fn place_single_child(&self, fibers: &mut FiberArena, fiber: FiberId) -> FiberId {
        let node = &mut fibers[fiber];
        if self.track_effects && node.alternate.is_none() {
            node.flags |= Flags::PLACEMENT;
        }
        fiber
    }

    fn reconcile_single_element(
        &self,
        fibers: &mut FiberArena,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        element: &Element,
    ) -> FiberId {
        let key = element.key();
        let mut current = current_first_child;
        while let Some(child) = current {
            let next = fibers[child].sibling;
            if fibers[child].key.as_ref() == key {
                if fibers[child].kind.matches(element.ty()) {
                    let existing = self.use_fiber(fibers, child, props_for_element(element));
                    let fiber = &mut fibers[existing];
                    fiber.parent = Some(return_fiber);
                    fiber.host_ref = element.host_ref().cloned();
                    self.delete_remaining_children(fibers, return_fiber, next);
                    return existing;
                }
                // same key, different type: nothing after it can match either
                self.delete_remaining_children(fibers, return_fiber, Some(child));
                break;
            }
            self.delete_child(fibers, return_fiber, child);
            current = next;
        }

        let created = create_fiber_from_element(fibers, element);
        fibers[created].parent = Some(return_fiber);
        created
    }

    fn reconcile_single_text_node(
        &self,
        fibers: &mut FiberArena,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        content: &Rc<str>,
    ) -> FiberId {
        let mut current = current_first_child;
        while let Some(child) = current {
            let next = fibers[child].sibling;
            if matches!(fibers[child].kind, FiberKind::HostText) {
                let existing = self.use_fiber(fibers, child, Props::text(Rc::clone(content)));
                fibers[existing].parent = Some(return_fiber);
                self.delete_remaining_children(fibers, return_fiber, next);
                return existing;
            }
            self.delete_child(fibers, return_fiber, child);
            current = next;
        }

        let created = create_fiber_from_text(fibers, Rc::clone(content));
        fibers[created].parent = Some(return_fiber);
        created
    }

    fn reconcile_children_array(
        &self,
        fibers: &mut FiberArena,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        items: &[Child],
    ) -> Option<FiberId> {
        let mut existing = ExistingChildren::collect(fibers, current_first_child);
        let mut last_placed_index = 0;
        let mut first_new: Option<FiberId> = None;
        let mut previous_new: Option<FiberId> = None;

        for (index, item) in items.iter().enumerate() {
            let Some(new_fiber) = self.update_from_map(fibers, &mut existing, index, item) else {
                continue;
            };
            {
                let fiber = &mut fibers[new_fiber];
                fiber.index = index;
                fiber.parent = Some(return_fiber);
            }
            match previous_new {
                None => first_new = Some(new_fiber),
                Some(previous) => fibers[previous].sibling = Some(new_fiber),
            }
            previous_new = Some(new_fiber);

            if !self.track_effects {
                continue;
            }
            match fibers[new_fiber].alternate {
                Some(current) => {
                    let old_index = fibers[current].index;
                    if old_index < last_placed_index {
                        fibers[new_fiber].flags |= Flags::PLACEMENT;
                    } else {
                        last_placed_index = old_index;
                    }
                }
                None => fibers[new_fiber].flags |= Flags::PLACEMENT,
            }
        }

        let mut current = current_first_child;
        while let Some(child) = current {
            current = fibers[child].sibling;
            if !existing.reused.contains(&child) {
                self.delete_child(fibers, return_fiber, child);
            }
        }

        first_new
    }

    fn update_from_map(
        &self,
        fibers: &mut FiberArena,
        existing: &mut ExistingChildren,
        index: usize,
        item: &Child,
    ) -> Option<FiberId> {
        let key = ChildKey::of_child(item, index);
        let before = existing.get(&key);
        match item {
            Child::Text(content) => {
                if let Some(before) =
                    before.filter(|id| matches!(fibers[*id].kind, FiberKind::HostText))
                {
                    existing.claim(&key, before);
                    return Some(self.use_fiber(fibers, before, Props::text(Rc::clone(content))));
                }
                Some(create_fiber_from_text(fibers, Rc::clone(content)))
            }
            Child::Array(_) => Some(self.update_fragment(
                fibers,
                existing,
                &key,
                before,
                item.clone(),
                None,
            )),
            Child::Element(element) if element.is_fragment() => Some(self.update_fragment(
                fibers,
                existing,
                &key,
                before,
                element.props().children().clone(),
                element.key().cloned(),
            )),
            Child::Element(element) => {
                if let Some(before) = before.filter(|id| fibers[*id].kind.matches(element.ty())) {
                    existing.claim(&key, before);
                    let reused = self.use_fiber(fibers, before, element.props().clone());
                    fibers[reused].host_ref = element.host_ref().cloned();
                    return Some(reused);
                }
                Some(create_fiber_from_element(fibers, element))
            }
            Child::Empty => None,
        }
    }

    fn update_fragment(
        &self,
        fibers: &mut FiberArena,
        existing: &mut ExistingChildren,
        key: &ChildKey,
        before: Option<FiberId>,
        children: Child,
        fragment_key: Option<Key>,
    ) -> FiberId {
        if let Some(before) = before.filter(|id| matches!(fibers[*id].kind, FiberKind::Fragment)) {
            existing.claim(key, before);
            return self.use_fiber(fibers, before, Props::from_children(children));
        }
        create_fiber_from_fragment(fibers, children, fragment_key)
    }
}

//! Priority-tagged update lists.
//!
//! Pending updates form a circular singly-linked ring. The ring keeps an
//! explicit index of its newest update (`last`); following `next` from there
//! reaches the oldest. Slots live in a vector so the links are plain indices
//! and the ring owns every update outright.

use std::fmt;
use std::rc::Rc;

use crate::lanes::{is_subset_of_lanes, Lane, Lanes, NO_LANE};

/// How an update derives the next state.
pub enum Action<S> {
    Replace(S),
    Reduce(Rc<dyn Fn(&S) -> S>),
}

impl<S: Clone> Clone for Action<S> {
    fn clone(&self) -> Self {
        match self {
            Action::Replace(value) => Action::Replace(value.clone()),
            Action::Reduce(reducer) => Action::Reduce(Rc::clone(reducer)),
        }
    }
}

impl<S> Action<S> {
    fn apply(&self, state: &S) -> S
    where
        S: Clone,
    {
        match self {
            Action::Replace(value) => value.clone(),
            Action::Reduce(reducer) => reducer(state),
        }
    }
}

impl<S> fmt::Debug for Action<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Replace(_) => f.write_str("Replace"),
            Action::Reduce(_) => f.write_str("Reduce"),
        }
    }
}

#[derive(Debug)]
pub struct Update<S> {
    pub action: Action<S>,
    pub lane: Lane,
}

impl<S: Clone> Clone for Update<S> {
    fn clone(&self) -> Self {
        Self {
            action: self.action.clone(),
            lane: self.lane,
        }
    }
}

impl<S> Update<S> {
    pub fn new(action: Action<S>, lane: Lane) -> Self {
        Self { action, lane }
    }
}

#[derive(Debug)]
struct RingSlot<S> {
    update: Update<S>,
    next: usize,
}

impl<S: Clone> Clone for RingSlot<S> {
    fn clone(&self) -> Self {
        Self {
            update: self.update.clone(),
            next: self.next,
        }
    }
}

/// Circular list of updates with an explicit pointer to the newest entry.
#[derive(Debug)]
pub struct UpdateRing<S> {
    slots: Vec<RingSlot<S>>,
    last: Option<usize>,
}

impl<S> Default for UpdateRing<S> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            last: None,
        }
    }
}

impl<S: Clone> Clone for UpdateRing<S> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            last: self.last,
        }
    }
}

impl<S> UpdateRing<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }

    /// Links `update` after the newest entry and makes it the newest.
    pub fn push(&mut self, update: Update<S>) {
        let index = self.slots.len();
        match self.last {
            None => self.slots.push(RingSlot {
                update,
                next: index,
            }),
            Some(last) => {
                let first = self.slots[last].next;
                self.slots.push(RingSlot {
                    update,
                    next: first,
                });
                self.slots[last].next = index;
            }
        }
        self.last = Some(index);
    }

    /// The most recently enqueued update.
    pub fn pending(&self) -> Option<&Update<S>> {
        self.last.map(|last| &self.slots[last].update)
    }

    /// The oldest update, i.e. `pending.next`.
    pub fn oldest(&self) -> Option<&Update<S>> {
        self.last
            .map(|last| &self.slots[self.slots[last].next].update)
    }

    /// Splices `other` after this ring's newest update, so this ring's
    /// updates are visited before `other`'s.
    pub fn append(&mut self, other: UpdateRing<S>) {
        let Some(other_last) = other.last else {
            return;
        };
        let Some(self_last) = self.last else {
            *self = other;
            return;
        };
        let offset = self.slots.len();
        self.slots.extend(other.slots.into_iter().map(|mut slot| {
            slot.next += offset;
            slot
        }));
        let other_last = other_last + offset;
        let self_first = self.slots[self_last].next;
        let other_first = self.slots[other_last].next;
        self.slots[self_last].next = other_first;
        self.slots[other_last].next = self_first;
        self.last = Some(other_last);
    }

    /// Joins an optional base ring with optional pending updates.
    pub fn merge(base: Option<UpdateRing<S>>, pending: Option<UpdateRing<S>>) -> Option<Self> {
        match (base, pending) {
            (Some(mut base), Some(pending)) => {
                base.append(pending);
                Some(base)
            }
            (base, None) => base,
            (None, pending) => pending,
        }
    }

    /// Visits every update once, oldest first.
    pub fn iter(&self) -> RingIter<'_, S> {
        RingIter {
            ring: self,
            cursor: self.last.map(|last| self.slots[last].next),
            remaining: self.slots.len(),
        }
    }
}

pub struct RingIter<'a, S> {
    ring: &'a UpdateRing<S>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, S> Iterator for RingIter<'a, S> {
    type Item = &'a Update<S>;

    fn next(&mut self) -> Option<Self::Item> {
        // Bounded by the slot count so a corrupted link can never spin.
        if self.remaining == 0 {
            return None;
        }
        let index = self.cursor?;
        self.remaining -= 1;
        let slot = &self.ring.slots[index];
        self.cursor = Some(slot.next);
        Some(&slot.update)
    }
}

/// Queue shared between the current and in-progress instances of one state
/// cell (or of the root).
#[derive(Debug)]
pub struct UpdateQueue<S> {
    pending: UpdateRing<S>,
}

impl<S> Default for UpdateQueue<S> {
    fn default() -> Self {
        Self {
            pending: UpdateRing::new(),
        }
    }
}

impl<S> UpdateQueue<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, update: Update<S>) {
        self.pending.push(update);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> &UpdateRing<S> {
        &self.pending
    }

    /// Detaches the pending ring, leaving the queue empty.
    pub fn take_pending(&mut self) -> Option<UpdateRing<S>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

/// Result of folding a ring at one render lane.
#[derive(Debug)]
pub struct ProcessedQueue<S> {
    pub memoized_state: S,
    pub base_state: S,
    pub base_queue: Option<UpdateRing<S>>,
}

/// Applies every update whose lane is included in `render_lanes`.
///
/// Skipped updates are cloned into the returned base queue, and so is every
/// update after the first skipped one (with its lane cleared so it always
/// replays). `base_state` is the state just before the first skipped update.
pub fn process_update_queue<S: Clone>(
    base_state: S,
    ring: &UpdateRing<S>,
    render_lanes: Lanes,
) -> ProcessedQueue<S> {
    let mut new_state = base_state.clone();
    let mut new_base_state = base_state;
    let mut new_base_queue: Option<UpdateRing<S>> = None;

    for update in ring.iter() {
        if !is_subset_of_lanes(render_lanes, update.lane) {
            let clone = update.clone();
            match new_base_queue.as_mut() {
                Some(queue) => queue.push(clone),
                None => {
                    new_base_state = new_state.clone();
                    let mut queue = UpdateRing::new();
                    queue.push(clone);
                    new_base_queue = Some(queue);
                }
            }
            continue;
        }
        if let Some(queue) = new_base_queue.as_mut() {
            queue.push(Update::new(update.action.clone(), NO_LANE));
        }
        new_state = update.action.apply(&new_state);
    }

    if new_base_queue.is_none() {
        new_base_state = new_state.clone();
    }

    ProcessedQueue {
        memoized_state: new_state,
        base_state: new_base_state,
        base_queue: new_base_queue,
    }
}

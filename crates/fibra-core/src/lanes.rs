use std::cell::Cell;

use bitflags::bitflags;

use crate::scheduler::{SchedulerPriority, TaskScheduler};

bitflags! {
    /// Update priorities as a bitset. Lower bits are more urgent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Lanes: u32 {
        const SYNC = 0b00001;
        const INPUT_CONTINUOUS = 0b00010;
        const DEFAULT = 0b00100;
        const TRANSITION = 0b01000;
        const IDLE = 0b10000;
    }
}

/// A single lane. Same representation as [`Lanes`], kept as an alias so
/// signatures say whether one bit or a set is expected.
pub type Lane = Lanes;

pub const NO_LANE: Lane = Lanes::empty();
pub const NO_LANES: Lanes = Lanes::empty();

pub fn merge_lanes(a: Lanes, b: Lanes) -> Lanes {
    a | b
}

/// Isolates the most urgent lane (`lanes & -lanes`).
pub fn highest_priority_lane(lanes: Lanes) -> Lane {
    let bits = lanes.bits();
    Lanes::from_bits_retain(bits & bits.wrapping_neg())
}

/// Whether every lane of `subset` is contained in `set`. The empty lane is a
/// subset of everything, which is how rebased updates always replay.
pub fn is_subset_of_lanes(set: Lanes, subset: Lanes) -> bool {
    set.contains(subset)
}

pub fn lanes_to_scheduler_priority(lanes: Lanes) -> SchedulerPriority {
    let lane = highest_priority_lane(lanes);
    if lane == Lanes::SYNC {
        SchedulerPriority::Immediate
    } else if lane == Lanes::INPUT_CONTINUOUS {
        SchedulerPriority::UserBlocking
    } else if lane == Lanes::DEFAULT {
        SchedulerPriority::Normal
    } else if lane == Lanes::TRANSITION {
        SchedulerPriority::Low
    } else if lane == Lanes::IDLE {
        SchedulerPriority::Idle
    } else {
        SchedulerPriority::Normal
    }
}

pub fn scheduler_priority_to_lane(priority: SchedulerPriority) -> Lane {
    match priority {
        SchedulerPriority::Immediate => Lanes::SYNC,
        SchedulerPriority::UserBlocking => Lanes::INPUT_CONTINUOUS,
        SchedulerPriority::Normal => Lanes::DEFAULT,
        SchedulerPriority::Low => Lanes::TRANSITION,
        SchedulerPriority::Idle => Lanes::IDLE,
    }
}

thread_local! {
    static TRANSITION_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks updates requested while alive as transitions.
#[must_use = "TransitionScope ends the transition on drop"]
pub struct TransitionScope {
    _private: (),
}

impl TransitionScope {
    pub fn enter() -> Self {
        TRANSITION_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self { _private: () }
    }
}

impl Drop for TransitionScope {
    fn drop(&mut self) {
        TRANSITION_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

pub fn is_inside_transition() -> bool {
    TRANSITION_DEPTH.with(|depth| depth.get() > 0)
}

/// Lane for an update issued right now.
pub fn request_update_lane(scheduler: &dyn TaskScheduler) -> Lane {
    if is_inside_transition() {
        return Lanes::TRANSITION;
    }
    scheduler_priority_to_lane(scheduler.current_priority())
}

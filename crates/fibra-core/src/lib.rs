#![doc = r"Fiber reconciliation and lane scheduling for declarative UI trees.

Components describe trees of [`Element`]s. A [`Root`] diffs each new
description against the committed fiber tree, renders in interruptible
slices through a [`TaskScheduler`], and applies the resulting mutations to a
[`HostConfig`] in one commit."]

mod begin_work;
mod child_fibers;
mod commit_work;
mod complete_work;
pub mod context;
pub mod element;
pub mod error;
pub mod fiber;
pub mod flags;
pub mod hooks;
pub mod host;
pub mod lanes;
pub mod mutable_ref;
pub mod options;
pub mod props;
mod root;
pub mod scheduler;
mod sync_queue;
pub mod update_queue;
mod work_loop;

pub mod collections;
pub mod hash;

pub use context::{create_context, Context, ContextId};
pub use element::{
    fragment, h, suspense, text, Child, Component, Element, ElementBuilder, ElementType, Key,
};
pub use error::{HookError, RenderError};
pub use fiber::{FiberId, FiberKind};
pub use flags::{Flags, HookFlags};
pub use hooks::{
    use_context, use_effect, use_ref, use_state, use_transition, Deps, EffectResult, EffectScope,
    SetState, StartTransition,
};
pub use host::{HostConfig, HostId, Microtask};
pub use lanes::{Lane, Lanes, TransitionScope};
pub use mutable_ref::{HostRef, MutableRef};
pub use options::RootOptions;
pub use props::{
    apply_style_patches, diff_props, Handler, PropPatch, PropValue, Props, StyleMap, StylePatch,
};
pub use root::{create_root, update_root, Root};
pub use scheduler::{SchedulerCallback, SchedulerPriority, TaskScheduler, TaskStatus, TaskToken};

#[cfg(test)]
#[path = "tests/update_queue_tests.rs"]
mod update_queue_tests;

#[cfg(test)]
#[path = "tests/child_fibers_tests.rs"]
mod child_fibers_tests;

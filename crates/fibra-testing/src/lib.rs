//! Testing utilities and harness for fibra

pub mod harness;
pub mod manual_scheduler;
pub mod memory_host;

pub use harness::TestRoot;
pub use manual_scheduler::ManualScheduler;
pub use memory_host::{HostOp, MemoryHost, NodeData};

pub mod prelude {
    pub use crate::harness::TestRoot;
    pub use crate::manual_scheduler::ManualScheduler;
    pub use crate::memory_host::{HostOp, MemoryHost};
    pub use fibra_core::{
        create_context, deps, fragment, h, suspense, text, use_context, use_effect, use_ref,
        use_state, use_transition, Child, Component, EffectResult, EffectScope, HostRef, Lanes,
        Props, RenderError, SchedulerPriority,
    };
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod reconcile_tests;

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod hooks_tests;

#[cfg(test)]
#[path = "tests/effects_tests.rs"]
mod effects_tests;

#[cfg(test)]
#[path = "tests/scheduling_tests.rs"]
mod scheduling_tests;

#[cfg(test)]
#[path = "tests/commit_tests.rs"]
mod commit_tests;

#[cfg(test)]
#[path = "tests/context_suspense_tests.rs"]
mod context_suspense_tests;

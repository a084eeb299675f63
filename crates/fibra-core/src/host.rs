//! Host environment adapter.
//!
//! The engine only manipulates opaque [`HostId`] handles. Creating,
//! attaching and mutating the concrete output nodes is the adapter's job.
//! Methods take `&self`; adapters keep their node store behind interior
//! mutability so the engine can hold a shared handle.

use crate::props::Props;

/// Opaque handle for a host node or container.
pub type HostId = usize;

/// Deferred callback queued with [`HostConfig::schedule_microtask`].
pub type Microtask = Box<dyn FnOnce()>;

pub trait HostConfig {
    fn create_instance(&self, ty: &str, props: &Props) -> HostId;

    fn create_text_instance(&self, content: &str) -> HostId;

    /// Attach `child` to a detached parent that is still being built.
    fn append_initial_child(&self, parent: HostId, child: HostId);

    fn append_child_to_container(&self, container: HostId, child: HostId);

    fn insert_child_to_container(&self, container: HostId, child: HostId, before: HostId);

    fn remove_child(&self, parent: HostId, child: HostId);

    /// Apply the change from `old` to `new`. See [`crate::props::diff_props`].
    fn commit_update(&self, instance: HostId, ty: &str, old: &Props, new: &Props);

    fn commit_text_update(&self, instance: HostId, old: &str, new: &str);

    fn hide_instance(&self, _instance: HostId) {}

    fn unhide_instance(&self, _instance: HostId) {}

    /// Run `task` after the current turn, before any scheduler task.
    fn schedule_microtask(&self, task: Microtask);
}

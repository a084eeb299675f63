use std::rc::Rc;

use fibra_core::{Child, HostId, RenderError, Root, RootOptions};

use crate::manual_scheduler::ManualScheduler;
use crate::memory_host::MemoryHost;

const FLUSH_LIMIT: usize = 10_000;

/// A root mounted into a [`MemoryHost`] container and driven by a
/// [`ManualScheduler`].
pub struct TestRoot {
    host: Rc<MemoryHost>,
    scheduler: Rc<ManualScheduler>,
    root: Root,
    container: HostId,
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRoot {
    pub fn new() -> Self {
        Self::with_options(RootOptions::default())
    }

    pub fn with_options(options: RootOptions) -> Self {
        let host = Rc::new(MemoryHost::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let container = host.create_container();
        let root = Root::with_options(container, host.clone(), scheduler.clone(), options);
        Self {
            host,
            scheduler,
            root,
            container,
        }
    }

    pub fn host(&self) -> &MemoryHost {
        &self.host
    }

    pub fn scheduler(&self) -> &ManualScheduler {
        &self.scheduler
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn container(&self) -> HostId {
        self.container
    }

    /// Schedules `child` and runs everything to completion.
    pub fn render(&self, child: impl Into<Child>) {
        self.root.render(child);
        self.flush();
    }

    pub fn unmount(&self) {
        self.root.unmount();
        self.flush();
    }

    /// Runs `f`, typically a state setter or a handler, then flushes.
    pub fn act(&self, f: impl FnOnce()) {
        f();
        self.flush();
    }

    /// Runs microtasks, then scheduler tasks, until neither has work.
    /// Microtasks always drain before the next task. Returns the number of
    /// steps taken.
    ///
    /// Panics if the queues never settle.
    pub fn flush(&self) -> usize {
        let mut steps = 0;
        loop {
            let progressed = self.host.run_microtasks() > 0 || self.scheduler.run_next();
            if !progressed {
                log::trace!("TestRoot::flush settled after {steps} steps");
                return steps;
            }
            steps += 1;
            if steps > FLUSH_LIMIT {
                panic!("TestRoot::flush did not settle after {FLUSH_LIMIT} steps");
            }
        }
    }

    pub fn flush_microtasks(&self) -> usize {
        self.host.run_microtasks()
    }

    pub fn take_render_error(&self) -> Option<RenderError> {
        self.root.take_render_error()
    }

    /// Children of the container.
    pub fn top_level(&self) -> Vec<HostId> {
        self.host.children_of(self.container)
    }

    pub fn text(&self) -> String {
        self.host.text_content(self.container)
    }

    pub fn dump(&self) -> String {
        self.host.dump_tree(self.container)
    }
}

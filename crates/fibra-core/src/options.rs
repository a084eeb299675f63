/// Per-root configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootOptions {
    /// Consecutive commits caused by render-phase updates before the root
    /// stops scheduling and reports [`crate::RenderError::NestedUpdateLimit`].
    pub nested_update_limit: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            nested_update_limit: 50,
        }
    }
}

impl RootOptions {
    pub fn with_nested_update_limit(mut self, limit: usize) -> Self {
        self.nested_update_limit = limit;
        self
    }
}

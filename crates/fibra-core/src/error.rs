use std::any::Any;
use std::fmt;

/// Misuse of the hook primitives. Raised with `std::panic::panic_any` from
/// inside a hook call; the work loop turns it into [`RenderError::Hook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    OutsideRender {
        hook: &'static str,
    },
    TooManyHooks {
        component: String,
        previous: usize,
    },
    TooFewHooks {
        component: String,
        previous: usize,
        rendered: usize,
    },
    KindMismatch {
        component: String,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
    StateTypeMismatch {
        component: String,
        index: usize,
        expected: &'static str,
    },
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::OutsideRender { hook } => {
                write!(f, "{hook} called outside of a component render")
            }
            HookError::TooManyHooks {
                component,
                previous,
            } => write!(
                f,
                "{component} rendered more hooks than the {previous} of its previous render"
            ),
            HookError::TooFewHooks {
                component,
                previous,
                rendered,
            } => write!(
                f,
                "{component} rendered {rendered} hooks, fewer than the {previous} of its previous render"
            ),
            HookError::KindMismatch {
                component,
                index,
                expected,
                found,
            } => write!(
                f,
                "{component} called {expected} at hook {index} where the previous render called {found}"
            ),
            HookError::StateTypeMismatch {
                component,
                index,
                expected,
            } => write!(
                f,
                "{component} read hook {index} as {expected} but it holds a different type"
            ),
        }
    }
}

impl std::error::Error for HookError {}

/// Why a render pass was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    Hook(HookError),
    ComponentPanicked { component: String, message: String },
    NestedUpdateLimit { limit: usize },
}

impl RenderError {
    /// Converts a panic payload caught around a component invocation.
    pub(crate) fn from_panic(component: &str, payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<HookError>() {
            Ok(error) => return RenderError::Hook(*error),
            Err(payload) => payload,
        };
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        RenderError::ComponentPanicked {
            component: component.to_string(),
            message,
        }
    }

    /// Component named by the error, when there is one.
    pub fn component(&self) -> Option<&str> {
        match self {
            RenderError::Hook(HookError::OutsideRender { .. }) => None,
            RenderError::Hook(HookError::TooManyHooks { component, .. })
            | RenderError::Hook(HookError::TooFewHooks { component, .. })
            | RenderError::Hook(HookError::KindMismatch { component, .. })
            | RenderError::Hook(HookError::StateTypeMismatch { component, .. })
            | RenderError::ComponentPanicked { component, .. } => Some(component),
            RenderError::NestedUpdateLimit { .. } => None,
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Hook(error) => write!(f, "invalid hook call: {error}"),
            RenderError::ComponentPanicked { component, message } => {
                write!(f, "{component} panicked during render: {message}")
            }
            RenderError::NestedUpdateLimit { limit } => write!(
                f,
                "more than {limit} consecutive commits were triggered by render-phase updates"
            ),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<HookError> for RenderError {
    fn from(value: HookError) -> Self {
        RenderError::Hook(value)
    }
}

use std::sync::Arc;

use weft_phase::{FnHandler, HookResult, PhaseHandler, SubStage};

use crate::context::{RequestContext, ResponseContext};

/// Where a plugin hook lands: a phase name plus the sub-stage within it.
///
/// The sub-stage is part of the registration itself; plain phase names
/// default to the `use` sub-stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTarget {
    pub name: String,
    pub stage: SubStage,
}

impl PhaseTarget {
    /// Target the `use` sub-stage of `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: SubStage::Use,
        }
    }

    /// Target the `before` sub-stage of `name`.
    pub fn before(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: SubStage::Before,
        }
    }

    /// Target the `after` sub-stage of `name`.
    pub fn after(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: SubStage::After,
        }
    }
}

impl From<&str> for PhaseTarget {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for PhaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.stage)
    }
}

/// One handler registration declared by a plugin.
pub struct Hook<C> {
    pub(crate) target: PhaseTarget,
    pub(crate) handler: Arc<dyn PhaseHandler<C>>,
}

/// A named unit of handlers attached to named phases.
///
/// Plugins are the only extension point of the pipeline; a plugin has no
/// access to pipeline internals beyond the contexts its handlers receive.
/// The descriptor itself is never mutated by mounting — handlers are copied
/// into the phase queues.
///
/// ```ignore
/// let plugin = Plugin::new("marker")
///     .on_request_fn("initial", |ctx| {
///         ctx.state.insert("marker.seen", json!(true));
///         Ok(())
///     })
///     .on_response_fn(PhaseTarget::after("final"), |ctx| {
///         ctx.body.get_or_insert_with(Default::default);
///         Ok(())
///     });
/// ```
pub struct Plugin {
    name: String,
    on_request: Vec<Hook<RequestContext>>,
    on_response: Vec<Hook<ResponseContext>>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_request: Vec::new(),
            on_response: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a request-side hook. Declaration order is preserved.
    pub fn on_request<T, H>(mut self, target: T, handler: H) -> Self
    where
        T: Into<PhaseTarget>,
        H: PhaseHandler<RequestContext> + 'static,
    {
        self.on_request.push(Hook {
            target: target.into(),
            handler: Arc::new(handler),
        });
        self
    }

    /// Declare a response-side hook. Declaration order is preserved.
    pub fn on_response<T, H>(mut self, target: T, handler: H) -> Self
    where
        T: Into<PhaseTarget>,
        H: PhaseHandler<ResponseContext> + 'static,
    {
        self.on_response.push(Hook {
            target: target.into(),
            handler: Arc::new(handler),
        });
        self
    }

    /// [`Plugin::on_request`] for a synchronous closure.
    pub fn on_request_fn<T, F>(self, target: T, handler: F) -> Self
    where
        T: Into<PhaseTarget>,
        F: Fn(&mut RequestContext) -> HookResult + Send + Sync + 'static,
    {
        self.on_request(target, FnHandler(handler))
    }

    /// [`Plugin::on_response`] for a synchronous closure.
    pub fn on_response_fn<T, F>(self, target: T, handler: F) -> Self
    where
        T: Into<PhaseTarget>,
        F: Fn(&mut ResponseContext) -> HookResult + Send + Sync + 'static,
    {
        self.on_response(target, FnHandler(handler))
    }

    pub(crate) fn request_hooks(&self) -> &[Hook<RequestContext>] {
        &self.on_request
    }

    pub(crate) fn response_hooks(&self) -> &[Hook<ResponseContext>] {
        &self.on_response
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("on_request", &self.on_request.len())
            .field("on_response", &self.on_response.len())
            .finish_non_exhaustive()
    }
}

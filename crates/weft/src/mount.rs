use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use weft_phase::{HookResult, PhaseHandler, PhaseList, SubStage};

use crate::context::{RequestContext, ResponseContext};
use crate::error::MountError;
use crate::plugin::{Hook, Plugin};

/// The pair of phase lists one client instance runs calls through.
#[derive(Debug, Clone, Default)]
pub(crate) struct PhaseLists {
    pub(crate) request: PhaseList<RequestContext>,
    pub(crate) response: PhaseList<ResponseContext>,
}

/// Options for one mount call.
///
/// The phase maps substitute the phase names a plugin was written against
/// before lookup, so a plugin can target logical names independent of a
/// client's configured phase set.
#[derive(Debug, Clone, Default)]
pub struct MountOptions {
    pub request_phase_map: HashMap<String, String>,
    pub response_phase_map: HashMap<String, String>,
}

impl MountOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_request_phase(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.request_phase_map.insert(from.into(), to.into());
        self
    }

    pub fn map_response_phase(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.response_phase_map.insert(from.into(), to.into());
        self
    }
}

/// Register a plugin's handlers into the client's phase lists.
///
/// The whole descriptor is validated before anything is registered, so a
/// failed mount never leaves a partially-mounted plugin behind. Each
/// accepted handler is wrapped in a tracing adapter that forwards the
/// context unchanged.
pub(crate) fn mount_plugin(
    lists: &mut PhaseLists,
    plugin: &Plugin,
    options: &MountOptions,
) -> Result<(), MountError> {
    if plugin.name().trim().is_empty() {
        return Err(MountError::InvalidName);
    }

    validate_hooks(
        &lists.request,
        plugin.name(),
        "request",
        plugin.request_hooks(),
        &options.request_phase_map,
    )?;
    validate_hooks(
        &lists.response,
        plugin.name(),
        "response",
        plugin.response_hooks(),
        &options.response_phase_map,
    )?;

    let plugin_name: Arc<str> = Arc::from(plugin.name());
    register_hooks(
        &mut lists.request,
        &plugin_name,
        "request",
        plugin.request_hooks(),
        &options.request_phase_map,
    );
    register_hooks(
        &mut lists.response,
        &plugin_name,
        "response",
        plugin.response_hooks(),
        &options.response_phase_map,
    );

    Ok(())
}

fn mapped_name<'a>(name: &'a str, phase_map: &'a HashMap<String, String>) -> &'a str {
    phase_map.get(name).map(String::as_str).unwrap_or(name)
}

fn validate_hooks<C>(
    list: &PhaseList<C>,
    plugin_name: &str,
    list_name: &'static str,
    hooks: &[Hook<C>],
    phase_map: &HashMap<String, String>,
) -> Result<(), MountError> {
    for hook in hooks {
        let phase = mapped_name(&hook.target.name, phase_map);
        if list.find(phase).is_none() {
            return Err(MountError::UnknownPhase {
                plugin: plugin_name.to_string(),
                list: list_name,
                phase: hook.target.name.clone(),
            });
        }
    }
    Ok(())
}

fn register_hooks<C: Send + 'static>(
    list: &mut PhaseList<C>,
    plugin_name: &Arc<str>,
    list_name: &'static str,
    hooks: &[Hook<C>],
    phase_map: &HashMap<String, String>,
) {
    for hook in hooks {
        let phase_name = mapped_name(&hook.target.name, phase_map);
        if let Some(phase) = list.find_mut(phase_name) {
            phase.register(
                hook.target.stage,
                Arc::new(Traced {
                    plugin: Arc::clone(plugin_name),
                    list: list_name,
                    phase: phase_name.to_string(),
                    stage: hook.target.stage,
                    inner: Arc::clone(&hook.handler),
                }),
            );
            tracing::debug!(
                plugin = %plugin_name,
                list = list_name,
                phase = %phase_name,
                stage = %hook.target.stage,
                "registered plugin handler"
            );
        }
    }
}

/// Bookkeeping adapter around a plugin handler.
///
/// Forwards the context unchanged; exists so every handler execution carries
/// plugin/list/phase fields in the trace output.
struct Traced<C> {
    plugin: Arc<str>,
    list: &'static str,
    phase: String,
    stage: SubStage,
    inner: Arc<dyn PhaseHandler<C>>,
}

#[async_trait]
impl<C: Send + 'static> PhaseHandler<C> for Traced<C> {
    async fn handle(&self, ctx: &mut C) -> HookResult {
        tracing::debug!(
            plugin = %self.plugin,
            list = self.list,
            phase = %self.phase,
            stage = %self.stage,
            "executing plugin handler"
        );
        let result = self.inner.handle(ctx).await;
        match &result {
            Ok(()) => tracing::debug!(
                plugin = %self.plugin,
                list = self.list,
                phase = %self.phase,
                "finished plugin handler"
            ),
            Err(error) => tracing::debug!(
                plugin = %self.plugin,
                list = self.list,
                phase = %self.phase,
                %error,
                "plugin handler failed"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PhaseTarget;
    use weft_phase::SubStage;

    fn lists_with_request_phases(names: &[&str]) -> PhaseLists {
        PhaseLists {
            request: PhaseList::with_phases(names).unwrap(),
            response: PhaseList::new(),
        }
    }

    #[test]
    fn empty_plugin_name_is_rejected() {
        let mut lists = PhaseLists::default();
        let plugin = Plugin::new("").on_request_fn("initial", |_| Ok(()));
        let err = mount_plugin(&mut lists, &plugin, &MountOptions::new()).unwrap_err();
        assert!(matches!(err, MountError::InvalidName));
    }

    #[test]
    fn unknown_phase_names_plugin_and_phase() {
        let mut lists = PhaseLists::default();
        let plugin = Plugin::new("my-plugin").on_request_fn("does-not-exist", |_| Ok(()));
        let err = mount_plugin(&mut lists, &plugin, &MountOptions::new()).unwrap_err();

        match &err {
            MountError::UnknownPhase { plugin, list, phase } => {
                assert_eq!(plugin, "my-plugin");
                assert_eq!(*list, "request");
                assert_eq!(phase, "does-not-exist");
            }
            other => panic!("expected UnknownPhase, got: {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("my-plugin"));
        assert!(message.contains("does-not-exist"));
    }

    #[test]
    fn failed_mounts_register_nothing() {
        let mut lists = lists_with_request_phases(&["auth"]);
        let plugin = Plugin::new("partial")
            .on_request_fn("auth", |_| Ok(()))
            .on_response_fn("does-not-exist", |_| Ok(()));

        let err = mount_plugin(&mut lists, &plugin, &MountOptions::new()).unwrap_err();
        assert!(matches!(err, MountError::UnknownPhase { .. }));
        assert_eq!(lists.request.find("auth").unwrap().total_handlers(), 0);
    }

    #[test]
    fn handlers_land_on_the_declared_sub_stage() {
        let mut lists = lists_with_request_phases(&["auth"]);
        let plugin = Plugin::new("staged")
            .on_request_fn(PhaseTarget::before("auth"), |_| Ok(()))
            .on_request_fn("auth", |_| Ok(()))
            .on_request_fn(PhaseTarget::after("auth"), |_| Ok(()));

        mount_plugin(&mut lists, &plugin, &MountOptions::new()).unwrap();

        let phase = lists.request.find("auth").unwrap();
        assert_eq!(phase.handler_count(SubStage::Before), 1);
        assert_eq!(phase.handler_count(SubStage::Use), 1);
        assert_eq!(phase.handler_count(SubStage::After), 1);
    }

    #[test]
    fn phase_map_substitutes_before_lookup() {
        let mut lists = PhaseLists::default();
        let plugin = Plugin::new("mapped").on_request_fn("end", |_| Ok(()));

        // without the map, `end` is unknown
        let err = mount_plugin(&mut lists, &plugin, &MountOptions::new()).unwrap_err();
        assert!(matches!(err, MountError::UnknownPhase { .. }));

        let options = MountOptions::new().map_request_phase("end", "final");
        mount_plugin(&mut lists, &plugin, &options).unwrap();

        let phase = lists.request.find("final").unwrap();
        assert_eq!(phase.handler_count(SubStage::Use), 1);
    }
}

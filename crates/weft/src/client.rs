use std::sync::Arc;

use http::Method;
use tokio::sync::oneshot;
use weft_phase::{HookError, PhaseList};

use crate::context::{Exchange, HookState, RequestContext, ResponseContext};
use crate::error::{BuildError, MountError, PipelineDropped, RequestError};
use crate::mount::{mount_plugin, MountOptions, PhaseLists};
use crate::options::RequestOptions;
use crate::plugin::Plugin;
use crate::registry::PluginRegistry;
use crate::transport::{Completion, HttpTransport, Transport, TransportError};

/// Builder for [`Client`].
///
/// Custom phase names are inserted between the `initial` and `final`
/// anchors of the respective list; plugins added here are mounted during
/// [`ClientBuilder::build`] in the order given.
pub struct ClientBuilder {
    defaults: RequestOptions,
    request_phases: Vec<String>,
    response_phases: Vec<String>,
    transport: Option<Arc<dyn Transport>>,
    registry: PluginRegistry,
    plugins: Vec<(Plugin, MountOptions)>,
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            defaults: RequestOptions::default(),
            request_phases: Vec::new(),
            response_phases: Vec::new(),
            transport: None,
            registry: PluginRegistry::builtin(),
            plugins: Vec::new(),
        }
    }

    /// Default request options merged under every call's arguments.
    pub fn defaults(mut self, defaults: RequestOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn request_phases<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request_phases = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn response_phases<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.response_phases = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the registry consulted by [`Client::mount_named`].
    pub fn registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Mount `plugin` when the client is built.
    pub fn plugin(self, plugin: Plugin) -> Self {
        self.plugin_with(plugin, MountOptions::default())
    }

    /// Mount `plugin` with mount options when the client is built.
    pub fn plugin_with(mut self, plugin: Plugin, options: MountOptions) -> Self {
        self.plugins.push((plugin, options));
        self
    }

    pub fn build(self) -> Result<Client, BuildError> {
        let request = PhaseList::with_phases(&self.request_phases)
            .map_err(|source| BuildError::Phases {
                list: "request",
                source,
            })?;
        let response = PhaseList::with_phases(&self.response_phases)
            .map_err(|source| BuildError::Phases {
                list: "response",
                source,
            })?;

        let mut lists = PhaseLists { request, response };
        for (plugin, options) in &self.plugins {
            mount_plugin(&mut lists, plugin, options)?;
            tracing::info!(plugin = %plugin.name(), "mounted plugin");
        }

        Ok(Client {
            defaults: self.defaults,
            phases: Arc::new(lists),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(HttpTransport::new())),
            registry: self.registry,
        })
    }
}

/// An HTTP client whose calls run through two phase pipelines.
///
/// Every outward call moves through `building` (argument merging, URL
/// resolution, fresh hook state) → the request phase list → the transport →
/// the response phase list → completion. A request-phase error aborts the
/// call before the transport is ever invoked; transport and response-phase
/// results are delivered exactly once through the returned [`InFlight`]
/// handle.
///
/// Phase lists are fixed in shape at construction; mounting adds handlers
/// but requires `&mut self`, so in-flight calls — which hold their own
/// snapshot — never observe a mutation.
pub struct Client {
    defaults: RequestOptions,
    phases: Arc<PhaseLists>,
    transport: Arc<dyn Transport>,
    registry: PluginRegistry,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// A client with no custom phases, no defaults, and the reqwest-backed
    /// transport.
    pub fn new() -> Self {
        Self {
            defaults: RequestOptions::default(),
            phases: Arc::new(PhaseLists::default()),
            transport: Arc::new(HttpTransport::new()),
            registry: PluginRegistry::builtin(),
        }
    }

    /// An independently-mutable deep copy of the configured defaults.
    pub fn defaults(&self) -> RequestOptions {
        self.defaults.clone()
    }

    /// Mount a plugin into this client's phase lists.
    ///
    /// Returns `&mut Self` so multiple mounts chain. A mount error is fatal
    /// to this call only; earlier mounts stay in place.
    pub fn mount(&mut self, plugin: Plugin) -> Result<&mut Self, MountError> {
        self.mount_with(plugin, MountOptions::default())
    }

    /// [`Client::mount`] with phase-name remapping options.
    pub fn mount_with(
        &mut self,
        plugin: Plugin,
        options: MountOptions,
    ) -> Result<&mut Self, MountError> {
        let lists = Arc::make_mut(&mut self.phases);
        mount_plugin(lists, &plugin, &options)?;
        tracing::info!(plugin = %plugin.name(), "mounted plugin");
        Ok(self)
    }

    /// Mount a plugin by registry name.
    ///
    /// Unknown names and mount failures are logged and otherwise ignored;
    /// the client stays usable either way.
    pub fn mount_named(&mut self, name: &str) -> &mut Self {
        match self.registry.resolve(name) {
            Some(plugin) => {
                if let Err(error) = self.mount(plugin) {
                    tracing::warn!(plugin = %name, %error, "failed to mount plugin by name");
                }
            }
            None => {
                tracing::warn!(plugin = %name, "no registered plugin under this name; ignoring");
            }
        }
        self
    }

    /// Issue a request to `uri`, running it through both pipelines.
    ///
    /// Resolves to the in-flight handle as soon as the request phases have
    /// finished; the exchange itself (transport plus response phases) is
    /// awaited through [`InFlight::outcome`].
    pub async fn request(
        &self,
        uri: impl Into<String>,
        options: RequestOptions,
    ) -> Result<InFlight, RequestError> {
        self.dispatch(options.uri(uri)).await
    }

    /// [`Client::request`] with the uri taken from the options.
    pub async fn dispatch(&self, options: RequestOptions) -> Result<InFlight, RequestError> {
        // building: merge and finalize before any handler runs
        let prepared = options.merged_over(&self.defaults).prepare()?;
        tracing::debug!(method = %prepared.method, url = %prepared.url, "dispatching request");

        let mut ctx = RequestContext {
            request: prepared,
            state: HookState::new(),
        };
        if let Err(source) = self.phases.request.run(&mut ctx).await {
            tracing::debug!(error = %source, "request phase pipeline aborted");
            return Err(RequestError::Phase { source });
        }

        let RequestContext { request, state } = ctx;
        let (completion, transport_rx) = Completion::channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let transport = Arc::clone(&self.transport);
        let phases = Arc::clone(&self.phases);

        tokio::spawn(async move {
            transport.send(request.clone(), completion).await;
            let outcome = match transport_rx.await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!("transport dropped its completion handle without an outcome");
                    crate::transport::TransportOutcome {
                        error: Some(TransportError::Dropped),
                        response: None,
                        body: None,
                    }
                }
            };

            let mut ctx = ResponseContext {
                state,
                request,
                error: outcome.error.map(|error| Box::new(error) as HookError),
                response: outcome.response,
                body: outcome.body,
            };
            let exchange = match phases.response.run(&mut ctx).await {
                Ok(()) => Exchange {
                    error: ctx.error,
                    response: ctx.response,
                    body: ctx.body,
                },
                Err(source) => {
                    tracing::debug!(error = %source, "response phase pipeline aborted");
                    Exchange {
                        error: Some(source),
                        response: None,
                        body: None,
                    }
                }
            };

            if outcome_tx.send(exchange).is_err() {
                tracing::debug!("request outcome receiver dropped; exchange discarded");
            }
        });

        Ok(InFlight {
            outcome: outcome_rx,
        })
    }

    pub async fn get(
        &self,
        uri: impl Into<String>,
        options: RequestOptions,
    ) -> Result<InFlight, RequestError> {
        self.request(uri, options.method(Method::GET)).await
    }

    pub async fn post(
        &self,
        uri: impl Into<String>,
        options: RequestOptions,
    ) -> Result<InFlight, RequestError> {
        self.request(uri, options.method(Method::POST)).await
    }

    pub async fn put(
        &self,
        uri: impl Into<String>,
        options: RequestOptions,
    ) -> Result<InFlight, RequestError> {
        self.request(uri, options.method(Method::PUT)).await
    }

    pub async fn delete(
        &self,
        uri: impl Into<String>,
        options: RequestOptions,
    ) -> Result<InFlight, RequestError> {
        self.request(uri, options.method(Method::DELETE)).await
    }

    pub async fn head(
        &self,
        uri: impl Into<String>,
        options: RequestOptions,
    ) -> Result<InFlight, RequestError> {
        self.request(uri, options.method(Method::HEAD)).await
    }

    pub async fn options(
        &self,
        uri: impl Into<String>,
        options: RequestOptions,
    ) -> Result<InFlight, RequestError> {
        self.request(uri, options.method(Method::OPTIONS)).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("request_phases", &self.phases.request.names())
            .field("response_phases", &self.phases.response.names())
            .finish_non_exhaustive()
    }
}

/// Handle to a dispatched call.
///
/// [`InFlight::outcome`] resolves exactly once with the exchange as the
/// response pipeline left it. Response-phase errors arrive here — never as
/// an error from [`Client::request`], which has already returned by then.
#[derive(Debug)]
pub struct InFlight {
    outcome: oneshot::Receiver<Exchange>,
}

impl InFlight {
    pub async fn outcome(self) -> Exchange {
        match self.outcome.await {
            Ok(exchange) => exchange,
            Err(_) => Exchange {
                error: Some(Box::new(PipelineDropped)),
                response: None,
                body: None,
            },
        }
    }
}

//! An HTTP client extensible through named, ordered phase pipelines.
//!
//! Every outward call runs through a request phase list, a pluggable
//! [`Transport`], and a response phase list. Behavior is added by mounting
//! [`Plugin`]s, whose handlers attach to the `before`/`use`/`after`
//! sub-stages of any configured phase and share a per-call [`HookState`]
//! across both pipelines.
//!
//! ```ignore
//! let mut client = Client::builder()
//!     .request_phases(["auth"])
//!     .defaults(RequestOptions::new().base_url("https://api.example.com"))
//!     .build()?;
//! client.mount(my_auth_plugin())?;
//!
//! let in_flight = client.get("widgets/1", RequestOptions::new()).await?;
//! let exchange = in_flight.outcome().await;
//! ```

pub mod builtins;
mod client;
mod context;
mod error;
mod mount;
mod options;
mod plugin;
mod registry;
mod transport;

pub use client::{Client, ClientBuilder, InFlight};
pub use context::{Exchange, HookState, RequestContext, ResponseContext};
pub use error::{BuildError, MountError, RequestError};
pub use mount::MountOptions;
pub use options::{PreparedRequest, RequestOptions};
pub use plugin::{PhaseTarget, Plugin};
pub use registry::PluginRegistry;
pub use transport::{
    Completion, HttpTransport, ResponseHead, Transport, TransportError, TransportOutcome,
};

pub use weft_phase::{
    FnHandler, HookError, HookResult, PhaseError, PhaseHandler, SubStage, FINAL_PHASE,
    INITIAL_PHASE,
};

use thiserror::Error;
use weft_phase::{HookError, PhaseError};

/// Error mounting a plugin.
///
/// Mount errors are fatal to the mount call only; plugins mounted earlier
/// stay registered and the client remains usable.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("plugin name must be a non-empty string")]
    InvalidName,

    #[error("cannot mount handler from plugin `{plugin}`: {list} phase `{phase}` is unknown")]
    UnknownPhase {
        plugin: String,
        list: &'static str,
        phase: String,
    },
}

/// Error constructing a client.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid {list} phase configuration: {source}")]
    Phases {
        list: &'static str,
        #[source]
        source: PhaseError,
    },

    #[error(transparent)]
    Mount(#[from] MountError),
}

/// Error raised while building or running the request side of a call.
///
/// The transport is never invoked when any of these occur.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("a request uri is required")]
    MissingUri,

    #[error("the request uri must be a path when a base url is configured")]
    AbsoluteUriWithBaseUrl,

    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("the `unix:` URL scheme is not supported")]
    UnixScheme,

    #[error("failed to encode json body: {0}")]
    JsonBody(#[from] serde_json::Error),

    #[error("request phase pipeline aborted: {source}")]
    Phase {
        #[source]
        source: HookError,
    },
}

#[derive(Debug, Error)]
#[error("request pipeline dropped before delivering an outcome")]
pub(crate) struct PipelineDropped;

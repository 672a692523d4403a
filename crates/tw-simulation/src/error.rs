use std::error::Error as StdError;

use tw_core::{DomainError, WorldTick};

/// Result of a simulation call.
pub type SimResult<T> = Result<T, SimError>;

/// Failures raised by repository adapters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    /// The store rejected the aggregate because it breaks an invariant.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A store's lock was poisoned by a panicking writer.
    #[error("{0} store lock poisoned")]
    LockPoisoned(&'static str),

    /// The backing store could not be reached.
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Result of a repository call.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors surfaced by the simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Recoverable for the actor or hitbox that raised it.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A repository call failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A contract violation the tick cannot recover from.
    #[error("{message}")]
    Application {
        /// What went wrong.
        message: String,
        /// The domain error behind it, if any.
        #[source]
        cause: Option<DomainError>,
    },

    /// An unexpected failure that aborted the tick.
    #[error("{message}")]
    System {
        /// What went wrong.
        message: String,
        /// The underlying failure.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl SimError {
    /// A contract violation with no underlying domain error.
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
            cause: None,
        }
    }

    /// Whether this is an application-level failure.
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application { .. })
    }

    /// Whether this is a system-level failure.
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }

    /// Classify an error that escaped the pipeline of `tick`.
    ///
    /// Domain errors become application errors keeping their cause. Anything
    /// else unexpected becomes a system error.
    pub fn into_tick_failure(self, tick: WorldTick) -> Self {
        match self {
            Self::Domain(err) | Self::Repository(RepositoryError::Domain(err)) => {
                Self::Application {
                    message: format!("tick {tick} failed: {err}"),
                    cause: Some(err),
                }
            }
            Self::Repository(err) => Self::System {
                message: format!("tick {tick} failed"),
                source: Box::new(err),
            },
            other @ (Self::Application { .. } | Self::System { .. }) => other,
        }
    }
}

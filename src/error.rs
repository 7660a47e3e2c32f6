use snafu::{Location, Snafu};

use crate::service::reconciler::ReconcileError;

/// How an error surfaces to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The token is missing or rejected; the learner has to sign in again.
    AuthRequired,
    /// The store could not be reached or answered with a failure. Reported as a notification
    /// and retried by the next reconciliation.
    NetworkFailure,
    /// The enrollment, course or topic does not exist.
    DataNotFound,
    /// A topic's video link cannot be played inline.
    InvalidVideoSource,
}

impl ErrorKind {
    /// Whether the error replaces the whole view (with retry / back actions) instead of a toast.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::AuthRequired | Self::DataNotFound)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApplicationError {
    /// could not parse the configuration from the environment
    ConfigLoad {
        source: envy::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not initialize the logger
    InitializeLogger {
        source: tracing_subscriber::util::TryInitError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not load the enrollment progress
    InitialLoad {
        source: ReconcileError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not read from or write to the console
    Console {
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_load_errors_block_the_view() {
        assert!(ErrorKind::AuthRequired.is_blocking());
        assert!(ErrorKind::DataNotFound.is_blocking());
        assert!(!ErrorKind::NetworkFailure.is_blocking());
        assert!(!ErrorKind::InvalidVideoSource.is_blocking());
    }
}

//! Errors of the chord simulator

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure classes. None of them is retried: configuration errors are
/// rejected before work starts, invariant violations and resource errors
/// abort the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid input or call order (bad bits, peer count, uninitialized network)
    Configuration,
    /// Internal construction bug (empty topology, broken ring)
    InvariantViolation,
    /// Hash or log sink unavailable
    Resource,
}

/// Errors collections in chord-sim.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Network not initialized. Initialize the network with generate_network(n, run_id)")]
    NetworkNotInitialized,

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Digest unavailable: {0}")]
    DigestUnavailable(String),

    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to parse scenario: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) | Error::NetworkNotInitialized | Error::Yaml(_) => {
                ErrorKind::Configuration
            }
            Error::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Error::DigestUnavailable(_) | Error::Io(_) | Error::ThreadPool(_) => {
                ErrorKind::Resource
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::Configuration("bits".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(Error::NetworkNotInitialized.kind(), ErrorKind::Configuration);
        assert_eq!(
            Error::InvariantViolation("empty".into()).kind(),
            ErrorKind::InvariantViolation
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "log dir");
        assert_eq!(Error::from(io).kind(), ErrorKind::Resource);
    }

    #[test]
    fn test_not_initialized_message() {
        let msg = Error::NetworkNotInitialized.to_string();
        assert!(msg.contains("not initialized"));
    }
}

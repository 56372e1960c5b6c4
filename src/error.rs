//! Unified error type.

use thiserror::Error;

/// The error type returned by trellis's fallible operations.
///
/// Routing outcomes (404, 405) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// programmer mistakes at registration time and infrastructure failures in
/// the bundled [`Server`](crate::Server).
#[derive(Debug, Error)]
pub enum Error {
    /// A route pattern that is not `"<METHOD> <path>"`.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },

    /// Binding to a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pattern_names_the_pattern() {
        let err = Error::InvalidPattern { pattern: "GET items".into(), reason: "path must start with `/`" };
        assert_eq!(err.to_string(), "invalid route pattern `GET items`: path must start with `/`");
    }

    #[test]
    fn io_errors_convert() {
        let err: Error = std::io::Error::other("boom").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "io: boom");
    }
}

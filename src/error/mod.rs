//! The unified error handling system for the gateway.

pub use provider::{ProviderError, ProviderResult};
pub use translate::ErrorTranslator;
pub use types::{ErrorKind, GatewayError};

/// A unified `Result` type for the entire crate.
pub type Result<T> = std::result::Result<T, GatewayError>;

pub mod provider;
pub mod translate;
pub mod types;

/// Error category for monitoring and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Errors the caller can fix (missing or bad credentials, bad input).
    /// Corresponds to 4xx HTTP status codes.
    Client,
    /// Errors caused by the gateway or the upstream providers.
    /// Corresponds to 5xx HTTP status codes.
    Server,
}

#[cfg(test)]
mod tests;

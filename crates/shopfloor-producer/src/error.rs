//! Error types for the producer binary.
//!
//! [`ProducerError`] is the top-level error type that wraps all possible
//! failure modes during producer startup. The tick loop itself never
//! fails; everything fallible happens before it starts.

/// Top-level error for the producer binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    /// Fleet configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: shopfloor_sim::config::ConfigError,
    },
}

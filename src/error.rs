//! Error type for this crate.
//!
//! Only the fatal conditions of the receive/transmit contract become an
//! `Error`: bad configuration at construction time, a payload that doesn't
//! fit the wire format, or a scheduler cipher that can't be keyed. Routine
//! channel noise (bad CRC, uncorrectable FEC, an implausible header) is
//! never an `Error` -- it shows up in [`crate::diagnostics::Diagnostics`]
//! instead, and `RxPipeline::push_bit` stays infallible.

/// Errors produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration failed validation at construction time.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Human readable reason the configuration was rejected.
        reason: String,
    },

    /// `TxPipeline::submit` was given a payload longer than the wire format
    /// allows.
    #[error("payload too large: {len} bytes (max 128)")]
    PayloadTooLarge {
        /// The offending payload length.
        len: usize,
    },

    /// The hop scheduler's block cipher could not be keyed or invoked.
    #[error("hop scheduler key error: {reason}")]
    SchedulerKey {
        /// Reason the cipher could not be constructed.
        reason: String,
    },

    /// A codec primitive hit an internal invariant violation.
    ///
    /// This should not occur for any input accepted by this crate's public
    /// API; it exists so internal invariants fail loudly as a `Result`
    /// instead of a panic.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

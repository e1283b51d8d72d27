use thiserror::Error;

/// Errors raised by the verification engine.
///
/// Handshake and setup errors abort a run immediately; scoreboard and
/// closure problems are accumulated during the run and surfaced once in the
/// final report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TbError {
    /// A bounded wait on a handshake signal expired.
    #[error("handshake timeout: '{signal}' not observed within {max_cycles} cycles")]
    HandshakeTimeout { signal: String, max_cycles: u32 },

    /// An observed read disagreed with the scoreboard prediction.
    #[error("scoreboard mismatch at address {address}: expected {expected}, observed {observed}")]
    ScoreboardMismatch {
        address: u64,
        expected: u64,
        observed: u64,
    },

    /// The attempt budget ran out before every cross met its target.
    #[error("coverage closure failure: achieved {achieved:.2}% of {target:.2}% target")]
    CoverageClosureFailure { achieved: f64, target: f64 },

    /// The declared constraint set admits no legal stimulus.
    #[error("constraint set is unsatisfiable: no legal stimulus exists")]
    ConstraintUnsatisfiable,

    /// A signal name is not present in the signal store.
    #[error("unknown signal '{0}'")]
    UnknownSignal(String),

    /// A cross referenced a cover point that was never registered.
    #[error("unknown cover point '{0}'")]
    UnknownCoverPoint(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

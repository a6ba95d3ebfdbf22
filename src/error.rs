use thiserror::Error;

/// Errors raised while extracting, reducing or emitting a feeder.
#[derive(Debug, Error)]
pub enum ReductionError {
    /// A matrix on the solve path is singular, or the inputs cannot produce a finite equivalent.
    #[error("ineligible reduction: {0}")]
    IneligibleReduction(String),

    /// The declared backbone is not a contiguous simple path.
    #[error("backbone topology mismatch: {0}")]
    TopologyMismatch(String),

    #[error("unknown bus `{0}`")]
    UnknownBus(String),

    #[error("unknown element `{0}`")]
    UnknownElement(String),

    /// An attribution names a bus with no element of the requested kind.
    #[error("no {kind} attached to bus `{bus}`")]
    NoElementAtBus { kind: &'static str, bus: String },

    #[error("invalid phase attachment `{0}`")]
    InvalidAttachment(String),

    #[error("invalid line data for `{name}`: {reason}")]
    InvalidLineData { name: String, reason: String },

    #[error("no loss recorded for element `{0}`")]
    MissingLoss(String),

    /// A snapshot file whose arrays do not line up.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Failure reported by the simulation engine, passed through unmodified.
    #[error("engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ReductionError>;

use core::fmt;

/// Result alias for `idem`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the clustering engines and the ILP formulation.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input was empty.
    EmptyInput,

    /// Shape mismatch (string description).
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// Required per-label data was missing at setup time.
    MissingData {
        /// What was missing, and for which label.
        what: String,
    },

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// The engine was run before `init` built its state.
    NotInitialized,

    /// A decoded ILP cluster contained more than one identity item.
    AmbiguousCluster {
        /// Number of identity items found in the cluster.
        identities: usize,
    },

    /// The ILP model has no feasible assignment.
    Infeasible,

    /// The model exceeds what the bundled backend can enumerate.
    TooLarge {
        /// Number of free variables in the model.
        vars: usize,
        /// Backend limit.
        max: usize,
    },

    /// The solve hit its time limit before finding any feasible assignment.
    TimeLimit,

    /// Generic error with message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected}, actual {actual}")
            }
            Error::MissingData { what } => write!(f, "missing data: {what}"),
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::NotInitialized => write!(f, "engine was not initialized"),
            Error::AmbiguousCluster { identities } => {
                write!(
                    f,
                    "cluster contains {identities} identities (at most one allowed)"
                )
            }
            Error::Infeasible => write!(f, "model is infeasible"),
            Error::TooLarge { vars, max } => {
                write!(f, "model has {vars} free variables, backend limit is {max}")
            }
            Error::TimeLimit => {
                write!(f, "time limit reached before a feasible solution was found")
            }
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

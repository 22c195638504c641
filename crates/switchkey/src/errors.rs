use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Indicates that an error from the underlying mathematical library was
    /// encountered.
    #[error("{0}")]
    MathError(switchkey_math::Error),

    /// Indicates a parameter error.
    #[error("{0}")]
    ParametersError(ParametersError),

    /// Indicates that an input does not have the size implied by the
    /// parameters.
    #[error("Dimension mismatch for {what}: found {found}, expected {expected}")]
    DimensionMismatch {
        /// The input whose size is wrong.
        what: &'static str,
        /// The size found.
        found: usize,
        /// The size implied by the parameters.
        expected: usize,
    },

    /// Indicates a default error
    #[error("{0}")]
    DefaultError(String),
}

impl From<switchkey_math::Error> for Error {
    fn from(e: switchkey_math::Error) -> Self {
        Error::MathError(e)
    }
}

impl From<ParametersError> for Error {
    fn from(e: ParametersError) -> Self {
        Error::ParametersError(e)
    }
}

impl Error {
    pub(crate) fn mismatch(what: &'static str, found: usize, expected: usize) -> Self {
        Error::DimensionMismatch {
            what,
            found,
            expected,
        }
    }
}

/// Separate enum to indicate parameters-related errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParametersError {
    /// Indicates that the degree is invalid.
    #[error("Invalid degree: {0} is not a power of 2 larger than 8")]
    InvalidDegree(usize),

    /// Indicates that the number of output moduli differs from the number of
    /// key moduli.
    #[error("Invalid number of RNS moduli: {0}, expected the number of key moduli {1}")]
    ModulusCountMismatch(usize, usize),

    /// Indicates that the decomposition size leaves no special modulus.
    #[error("Invalid decomposition size: {0}, expected an integer between 1 and {1}")]
    InvalidDecompositionSize(usize, usize),

    /// Indicates that there are no key components.
    #[error("Invalid key component count: {0}, expected at least 1")]
    InvalidComponentCount(usize),

    /// Indicates that a modulus cannot be used for polynomials of this
    /// degree.
    #[error("Modulus {0} is not a prime supporting the NTT of size {1}")]
    UnsupportedModulus(u64, usize),
}

use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Indicates an invalid modulus
    #[error("Invalid modulus: modulus {0} should be between 2 and (1 << 62) - 1.")]
    InvalidModulus(u64),
}

//! Error types for the opensubdiv-adaptive crate.

use thiserror::Error;

/// Main error type for opensubdiv-adaptive operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A component or vertex index outside `[0, len)`.
    #[error("{component} index {index} out of range (len: {len})")]
    IndexOutOfRange {
        component: &'static str,
        index: usize,
        len: usize,
    },

    /// A sparse selector was used before a refinement step was bound.
    #[error("Sparse selector is not bound to a refinement")]
    NotBound,

    /// An operation was invoked in a state that does not allow it.
    #[error("Precondition violated: {0}")]
    PreconditionViolated(String),

    /// Invalid topology descriptor.
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// Invalid buffer size.
    #[error("Invalid buffer size: expected {expected}, got {actual}")]
    InvalidBufferSize { expected: usize, actual: usize },

    /// Inconsistent stencil table.
    #[error("Invalid stencil table: {0}")]
    InvalidStencilTable(String),

    /// Buffer descriptor whose values are not internally consistent.
    #[error("Invalid buffer descriptor (offset: {offset}, length: {length}, stride: {stride})")]
    InvalidBufferDescriptor {
        offset: usize,
        length: usize,
        stride: usize,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `Ok(())` if `index < len`, [`Error::IndexOutOfRange`] otherwise.
    #[inline]
    pub fn check_index(component: &'static str, index: usize, len: usize) -> Result<()> {
        if index < len {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                component,
                index,
                len,
            })
        }
    }
}

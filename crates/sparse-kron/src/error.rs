//! Error types for factorization status and batch construction.

use thiserror::Error;

/// Failure reported by an LU factorization or LU-based inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LapackError {
    /// `U(pivot, pivot)` is exactly zero (1-based, LAPACK convention).
    #[error("matrix is singular: U({pivot}, {pivot}) is exactly zero")]
    Singular { pivot: i32 },

    /// The argument at this 1-based position had an illegal value.
    #[error("argument {position} had an illegal value")]
    InvalidArgument { position: i32 },
}

/// Raw `info` status produced by `getrf`/`getri`.
///
/// `0` is success, `> 0` names the singular pivot, `< 0` is the negated
/// position of the invalid argument.
#[must_use = "a factorization status must be checked"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LapackInfo(pub i32);

impl LapackInfo {
    #[inline]
    pub fn raw(self) -> i32 {
        self.0
    }

    #[inline]
    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Convert the status into a `Result`.
    pub fn into_result(self) -> std::result::Result<(), LapackError> {
        match self.0 {
            0 => Ok(()),
            pivot if pivot > 0 => Err(LapackError::Singular { pivot }),
            neg => Err(LapackError::InvalidArgument { position: -neg }),
        }
    }
}

/// Errors that can occur while building or applying batch operand sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// The coefficient matrix for a (term, dimension) pair was never generated.
    #[error("coefficient matrix for term {term}, dimension {dim} has not been generated")]
    MissingCoefficients { term: usize, dim: usize },

    /// Inputs disagree on a structural size.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Two operand triples of one set write overlapping destination ranges.
    #[error("operand {second} overlaps the destination of operand {first}")]
    OverlappingDestinations { first: usize, second: usize },
}

/// Result type for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;

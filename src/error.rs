use thiserror::Error;

use crate::{Vertex, Weight};

/// Reasons a weight matrix is rejected before solving.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssignmentError {
    #[error("weight matrix has no rows")]
    Empty,

    #[error("row {row} has {len} entries, expected {expected} (matrix must be square)")]
    NotSquare {
        row: Vertex,
        len: usize,
        expected: usize,
    },

    #[error("weight at ({row}, {col}) is not finite")]
    NonFinite { row: Vertex, col: Vertex },

    #[error("weight at ({row}, {col}) exceeds the supported magnitude {max:e}")]
    OutOfRange { row: Vertex, col: Vertex, max: Weight },

    #[error("tolerance must be finite and non-negative, got {0}")]
    InvalidEpsilon(Weight),
}

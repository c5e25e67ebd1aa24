use crate::dtype::DType;

/// Errors raised by the runtime.
///
/// Every variant is fatal from the point of view of generated code; see
/// [`crate::fatal`] for the adapter that reports them and stops the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatrtError {
    #[error("out of memory: could not allocate {elements} {dtype} elements after {attempts} attempt(s)")]
    AllocationFailed {
        elements: usize,
        dtype: DType,
        attempts: usize,
    },

    #[error("invalid shape {extents:?}: {reason}")]
    InvalidShape {
        extents: Vec<usize>,
        reason: &'static str,
    },

    #[error("{op}: number of elements in the source ({got}) and destination ({expected}) must be the same")]
    ElementCountMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{op}: only defined for 2-dimensional matrices, got {rank} dimensions")]
    InvalidRank { op: &'static str, rank: usize },

    #[error("view out of bounds: offset ({offset}) + length ({length}) exceeds source length ({source_len})")]
    ViewOutOfBounds {
        offset: usize,
        length: usize,
        source_len: usize,
    },

    #[error("cannot alias into a handle that holds copied view data; refresh it as a copy")]
    AliasIntoCopyView,

    #[error("{op}: index {index} out of bounds for extent {extent}")]
    IndexOutOfBounds {
        op: &'static str,
        index: usize,
        extent: usize,
    },

    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("{op}: handle is not bound to a buffer")]
    Unbound { op: &'static str },

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_sizes() {
        let err = MatrtError::ElementCountMismatch {
            op: "set_row",
            expected: 3,
            got: 2,
        };
        assert_eq!(
            err.to_string(),
            "set_row: number of elements in the source (2) and destination (3) must be the same"
        );

        let err = MatrtError::ViewOutOfBounds {
            offset: 4,
            length: 3,
            source_len: 6,
        };
        assert!(err.to_string().contains("offset (4) + length (3)"));
        assert!(err.to_string().contains("source length (6)"));
    }

    #[test]
    fn test_rank_message() {
        let err = MatrtError::InvalidRank { op: "transpose", rank: 3 };
        assert!(err.to_string().contains("got 3 dimensions"));
    }
}

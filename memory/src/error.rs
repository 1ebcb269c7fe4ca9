use thiserror::Error;

/// Misuse of the reversible store. These are programming errors: the
/// search never recovers from them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("index {index} out of bounds for a vector of size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("cannot remove the last element of an empty vector")]
    EmptyVector,

    #[error("cannot pop below the root world")]
    PopBelowRoot,

    #[error("cannot commit the root world")]
    CommitAtRoot,

    #[error("cannot pop to world {target} from world {current}")]
    InvalidTargetWorld { target: usize, current: usize },
}

use thiserror::Error;

use crate::{IntVar, PropagatorId};

/// Origin of a domain change.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Cause {
    /// A change made by the search, outside of any propagator.
    Decision,
    Propagator(PropagatorId),
}

/// The current node of the search has no solution. Recovered from by
/// flushing the engine and popping the world.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
#[error("contradiction caused by {cause:?} on {variable:?}: {message}")]
pub struct Contradiction {
    pub cause: Cause,
    pub variable: Option<IntVar>,
    pub message: String,
}

impl Contradiction {
    pub fn new(cause: Cause, variable: Option<IntVar>, message: impl Into<String>) -> Self {
        Self {
            cause,
            variable,
            message: message.into(),
        }
    }
}

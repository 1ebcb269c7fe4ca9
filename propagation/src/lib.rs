//! Event-driven constraint propagation over reversible integer domains.
//!
//! An [`Engine`] owns integer variables and the propagators over them. Domain
//! changes, made by decisions or by propagators, are turned into events that
//! schedule the propagators listening to them; [`Engine::propagate`] runs the
//! schedule until a fixpoint or a [`Contradiction`]. Every piece of state
//! lives in a [`memory::Environment`], so popping a world undoes both the
//! domains and the passivation of propagators.

mod context;
mod contradiction;
mod engine;
mod event;
mod propagator;
mod variables;

pub use context::PropagationContext;
pub use contradiction::{Cause, Contradiction};
pub use engine::{Engine, EngineSettings, EngineState};
pub use event::{EventMask, IntEvent, PropagatorEventType};
pub use propagator::{ESat, Priority, Propagator, PropagatorId};
pub use variables::{DomainView, IntVar, Variables};

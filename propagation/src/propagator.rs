use memory::Strategy;

use crate::{
    Contradiction, DomainView, EventMask, IntVar, PropagationContext, PropagatorEventType,
};

/// Handle of a propagator registered in an [`Engine`](crate::Engine).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PropagatorId(pub(crate) usize);

impl PropagatorId {
    #[inline(always)]
    pub fn index(&self) -> usize {
        return self.0;
    }
}

/// Cost class of a propagator; cheaper classes run first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Priority {
    Unary,
    Binary,
    Ternary,
    Linear,
    Quadratic,
    Cubic,
    VerySlow,
}

impl Priority {
    pub const COUNT: usize = 7;

    #[inline(always)]
    pub fn index(&self) -> usize {
        return *self as usize;
    }
}

/// Entailment status of a propagator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ESat {
    /// Every assignment of the current domains satisfies it.
    True,
    /// No assignment does.
    False,
    Undefined,
}

pub trait Propagator<StrategyT: Strategy> {
    /// Scope of the propagator; positions in it are the variable indices of
    /// events and conditions.
    fn variables(&self) -> &[IntVar];

    fn priority(&self) -> Priority {
        return Priority::Linear;
    }

    /// Events on the variable at `variable_index` that call for a run.
    fn propagation_conditions(&self, _variable_index: usize) -> EventMask {
        return EventMask::ALL;
    }

    fn propagate(
        &mut self,
        context: &mut PropagationContext<'_, StrategyT>,
        event: PropagatorEventType,
    ) -> Result<(), Contradiction>;

    /// Reacts to the events accumulated on one variable since the last run.
    /// Only called when [`reacts_to_fine_events`](Self::reacts_to_fine_events)
    /// holds.
    fn propagate_on(
        &mut self,
        context: &mut PropagationContext<'_, StrategyT>,
        _variable_index: usize,
        _mask: EventMask,
    ) -> Result<(), Contradiction> {
        return self.propagate(context, PropagatorEventType::Full);
    }

    fn reacts_to_fine_events(&self) -> bool {
        return false;
    }

    fn is_entailed(&self, view: &DomainView<'_, StrategyT>) -> ESat;
}

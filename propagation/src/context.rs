use memory::{Environment, Strategy};

use crate::{
    Cause, Contradiction, DomainView, IntVar,
    variables::{Changes, Variables},
};

/// What a running propagator sees: the domains, the environment for its own
/// reversible state, and a sink for the changes it makes.
pub struct PropagationContext<'a, StrategyT: Strategy> {
    pub(crate) environment: &'a mut Environment<StrategyT>,
    pub(crate) variables: &'a Variables,
    pub(crate) changes: &'a mut Changes,
    pub(crate) passive: bool,
}

impl<'a, StrategyT: Strategy> PropagationContext<'a, StrategyT> {
    pub fn environment(&mut self) -> &mut Environment<StrategyT> {
        return &mut *self.environment;
    }

    pub fn view(&self) -> DomainView<'_, StrategyT> {
        return DomainView {
            environment: self.environment,
            variables: self.variables,
        };
    }

    pub fn cause(&self) -> Cause {
        return self.changes.cause;
    }

    /// Builds the contradiction this propagator raises.
    pub fn fail(&self, variable: Option<IntVar>, message: impl Into<String>) -> Contradiction {
        return Contradiction::new(self.changes.cause, variable, message);
    }

    /// Marks the running propagator entailed: it is not scheduled again
    /// until the current world is popped.
    pub fn set_passive(&mut self) {
        self.passive = true;
    }

    #[inline(always)]
    pub fn lower_bound(&self, variable: IntVar) -> i32 {
        return self.variables.lower_bound(self.environment, variable);
    }

    #[inline(always)]
    pub fn upper_bound(&self, variable: IntVar) -> i32 {
        return self.variables.upper_bound(self.environment, variable);
    }

    pub fn size(&self, variable: IntVar) -> usize {
        return self.variables.size(self.environment, variable);
    }

    pub fn is_instantiated(&self, variable: IntVar) -> bool {
        return self.variables.is_instantiated(self.environment, variable);
    }

    pub fn value(&self, variable: IntVar) -> Option<i32> {
        return self.variables.value(self.environment, variable);
    }

    pub fn contains(&self, variable: IntVar, value: i32) -> bool {
        return self.variables.contains(self.environment, variable, value);
    }

    pub fn iter_values(&self, variable: IntVar) -> impl Iterator<Item = i32> + '_ {
        return self.variables.iter_values(self.environment, variable);
    }

    /// Returns whether the domain changed.
    pub fn update_lower_bound(&mut self, variable: IntVar, value: i32) -> Result<bool, Contradiction> {
        return self
            .variables
            .update_lower_bound(self.environment, self.changes, variable, value);
    }

    pub fn update_upper_bound(&mut self, variable: IntVar, value: i32) -> Result<bool, Contradiction> {
        return self
            .variables
            .update_upper_bound(self.environment, self.changes, variable, value);
    }

    pub fn remove_value(&mut self, variable: IntVar, value: i32) -> Result<bool, Contradiction> {
        return self
            .variables
            .remove_value(self.environment, self.changes, variable, value);
    }

    pub fn instantiate_to(&mut self, variable: IntVar, value: i32) -> Result<bool, Contradiction> {
        return self
            .variables
            .instantiate_to(self.environment, self.changes, variable, value);
    }
}

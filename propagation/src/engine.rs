mod schedule;

use memory::{Cell, Environment, Strategy};
use schedule::Schedule;
use tracing::{debug, trace};

use crate::{
    Cause, Contradiction, DomainView, ESat, EventMask, IntVar, Priority, PropagationContext,
    Propagator, PropagatorEventType, PropagatorId,
    variables::{Changes, Variables},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EngineSettings {
    /// Runs the first propagation of new propagators cheapest class first
    /// instead of in registration order.
    pub sort_by_priority: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sort_by_priority: true,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EngineState {
    Consistent,
    /// A contradiction was raised; only `flush` is allowed next.
    Failed,
}

impl EngineState {
    pub fn is_consistent(&self) -> bool {
        return matches!(self, Self::Consistent);
    }

    pub fn is_failed(&self) -> bool {
        return matches!(self, Self::Failed);
    }
}

/// Activation of a propagator, kept in an int cell so that passivation is
/// undone by backtracking.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Activation {
    New,
    Active,
    Passive,
}

impl Activation {
    #[inline(always)]
    fn code(self) -> i32 {
        return self as i32;
    }

    #[inline(always)]
    fn from_code(code: i32) -> Self {
        return match code {
            0 => Self::New,
            1 => Self::Active,
            _ => Self::Passive,
        };
    }
}

struct Subscription {
    propagator: usize,
    variable_index: usize,
    conditions: EventMask,
}

/// Drives propagators to a common fixpoint over the domains of its integer
/// variables.
pub struct Engine<StrategyT: Strategy> {
    settings: EngineSettings,
    variables: Variables,
    propagators: Vec<Box<dyn Propagator<StrategyT>>>,
    priorities: Vec<Priority>,
    fine: Vec<bool>,
    activations: Vec<Cell<i32>>,
    /// Per variable, the propagators listening to it.
    subscriptions: Vec<Vec<Subscription>>,
    schedule: Schedule,
    changes: Changes,
    events: Vec<(usize, EventMask)>,
    state: EngineState,
}

impl<StrategyT: Strategy> Default for Engine<StrategyT> {
    fn default() -> Self {
        Self::with_settings(EngineSettings::default())
    }
}

impl<StrategyT: Strategy> Engine<StrategyT> {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        Self {
            settings,
            variables: Variables::default(),
            propagators: Vec::default(),
            priorities: Vec::default(),
            fine: Vec::default(),
            activations: Vec::default(),
            subscriptions: Vec::default(),
            schedule: Schedule::default(),
            changes: Changes::new(),
            events: Vec::default(),
            state: EngineState::Consistent,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        return &self.settings;
    }

    pub fn state(&self) -> EngineState {
        return self.state;
    }

    pub fn number_of_propagators(&self) -> usize {
        return self.propagators.len();
    }

    pub fn variables(&self) -> &Variables {
        return &self.variables;
    }

    pub fn view<'a>(&'a self, environment: &'a Environment<StrategyT>) -> DomainView<'a, StrategyT> {
        return DomainView {
            environment,
            variables: &self.variables,
        };
    }

    fn add_variable(&mut self, variable: IntVar) -> IntVar {
        debug_assert!(variable.index() == self.subscriptions.len());
        self.subscriptions.push(Vec::default());
        return variable;
    }

    /// Makes a variable over `lower..=upper` that keeps every value.
    pub fn new_int_var(&mut self, environment: &mut Environment<StrategyT>, lower: i32, upper: i32) -> IntVar {
        let variable = self.variables.new_int_var(environment, lower, upper, false);
        return self.add_variable(variable);
    }

    /// Makes a variable over `lower..=upper` that only keeps its bounds.
    pub fn new_bounded_int_var(
        &mut self,
        environment: &mut Environment<StrategyT>,
        lower: i32,
        upper: i32,
    ) -> IntVar {
        let variable = self.variables.new_int_var(environment, lower, upper, true);
        return self.add_variable(variable);
    }

    pub fn new_bool_var(&mut self, environment: &mut Environment<StrategyT>) -> IntVar {
        return self.new_bounded_int_var(environment, 0, 1);
    }

    /// Registers `propagator`. It runs a full propagation on the next call
    /// to [`propagate`](Self::propagate), and again after each backtrack
    /// past the world it was added in.
    pub fn add_propagator(
        &mut self,
        environment: &mut Environment<StrategyT>,
        propagator: impl Propagator<StrategyT> + 'static,
    ) -> PropagatorId {
        let id = self.propagators.len();
        for (variable_index, variable) in propagator.variables().iter().enumerate() {
            self.subscriptions[variable.index()].push(Subscription {
                propagator: id,
                variable_index,
                conditions: propagator.propagation_conditions(variable_index),
            });
        }
        self.priorities.push(propagator.priority());
        self.fine.push(propagator.reacts_to_fine_events());
        self.activations.push(environment.make_int(Activation::New.code()));
        self.schedule.add_propagator(propagator.variables().len());
        self.propagators.push(Box::new(propagator));
        trace!(propagator = id, world = environment.world_index(), "add propagator");
        return PropagatorId(id);
    }

    #[inline(always)]
    fn activation(&self, environment: &Environment<StrategyT>, propagator: usize) -> Activation {
        return Activation::from_code(self.activations[propagator].get(environment));
    }

    pub fn is_active(&self, environment: &Environment<StrategyT>, propagator: PropagatorId) -> bool {
        return self.activation(environment, propagator.0) == Activation::Active;
    }

    pub fn is_passive(&self, environment: &Environment<StrategyT>, propagator: PropagatorId) -> bool {
        return self.activation(environment, propagator.0) == Activation::Passive;
    }

    pub fn is_entailed(&self, environment: &Environment<StrategyT>, propagator: PropagatorId) -> ESat {
        return self.propagators[propagator.0].is_entailed(&self.view(environment));
    }

    fn record<ResultT>(&mut self, result: Result<ResultT, Contradiction>) -> Result<ResultT, Contradiction> {
        if let Err(contradiction) = &result {
            debug!(
                cause = ?contradiction.cause,
                variable = ?contradiction.variable,
                message = %contradiction.message,
                "contradiction"
            );
            self.state = EngineState::Failed;
        }
        return result;
    }

    /// Decision on `variable`; its events are handled by the next
    /// [`propagate`](Self::propagate).
    pub fn instantiate_to(
        &mut self,
        environment: &mut Environment<StrategyT>,
        variable: IntVar,
        value: i32,
    ) -> Result<bool, Contradiction> {
        self.changes.cause = Cause::Decision;
        let result = self
            .variables
            .instantiate_to(environment, &mut self.changes, variable, value);
        return self.record(result);
    }

    pub fn remove_value(
        &mut self,
        environment: &mut Environment<StrategyT>,
        variable: IntVar,
        value: i32,
    ) -> Result<bool, Contradiction> {
        self.changes.cause = Cause::Decision;
        let result = self
            .variables
            .remove_value(environment, &mut self.changes, variable, value);
        return self.record(result);
    }

    pub fn update_lower_bound(
        &mut self,
        environment: &mut Environment<StrategyT>,
        variable: IntVar,
        value: i32,
    ) -> Result<bool, Contradiction> {
        self.changes.cause = Cause::Decision;
        let result = self
            .variables
            .update_lower_bound(environment, &mut self.changes, variable, value);
        return self.record(result);
    }

    pub fn update_upper_bound(
        &mut self,
        environment: &mut Environment<StrategyT>,
        variable: IntVar,
        value: i32,
    ) -> Result<bool, Contradiction> {
        self.changes.cause = Cause::Decision;
        let result = self
            .variables
            .update_upper_bound(environment, &mut self.changes, variable, value);
        return self.record(result);
    }

    /// Schedules `propagator` as if `mask` had happened on the variable at
    /// `variable_index` of its scope. Ignored unless the propagator is active.
    pub fn schedule(
        &mut self,
        environment: &Environment<StrategyT>,
        propagator: PropagatorId,
        variable_index: usize,
        mask: EventMask,
    ) {
        let id = propagator.0;
        if self.activation(environment, id) != Activation::Active {
            return;
        }
        let fine = self.fine[id].then_some(variable_index);
        self.schedule.schedule(id, self.priorities[id], fine, mask);
    }

    /// Turns the recorded domain changes into schedules. A propagator never
    /// hears of its own changes.
    fn notify(&mut self, environment: &Environment<StrategyT>) {
        let cause = self.changes.cause;
        for (variable, event) in self.changes.events.drain(..) {
            for subscription in self.subscriptions[variable.index()].iter() {
                let propagator = subscription.propagator;
                if cause == Cause::Propagator(PropagatorId(propagator))
                    || !event.triggers(subscription.conditions)
                    || Activation::from_code(self.activations[propagator].get(environment))
                        != Activation::Active
                {
                    continue;
                }
                let fine = self.fine[propagator].then_some(subscription.variable_index);
                self.schedule
                    .schedule(propagator, self.priorities[propagator], fine, event.mask());
            }
        }
    }

    /// Runs `propagator` once, on one fine event or from scratch, then
    /// schedules the propagators its changes concern. Returns whether the
    /// propagator turned passive.
    fn run(
        &mut self,
        environment: &mut Environment<StrategyT>,
        propagator: usize,
        event: Option<(usize, EventMask)>,
    ) -> Result<bool, Contradiction> {
        trace!(propagator, priority = ?self.priorities[propagator], ?event, "run propagator");
        self.changes.cause = Cause::Propagator(PropagatorId(propagator));
        let mut context = PropagationContext {
            environment: &mut *environment,
            variables: &self.variables,
            changes: &mut self.changes,
            passive: false,
        };
        let result = match event {
            Some((variable_index, mask)) => {
                self.propagators[propagator].propagate_on(&mut context, variable_index, mask)
            }
            None => self.propagators[propagator].propagate(&mut context, PropagatorEventType::Full),
        };
        let passive = context.passive;
        if let Err(contradiction) = result {
            self.changes.events.clear();
            return Err(contradiction);
        }
        self.notify(environment);
        if passive {
            trace!(propagator, "passivate");
            self.activations[propagator].set(environment, Activation::Passive.code());
            self.schedule.clear_events(propagator);
        }
        return Ok(passive);
    }

    /// First propagation of every propagator not run since it was added, or
    /// since a backtrack to before its activation.
    fn activate_new(&mut self, environment: &mut Environment<StrategyT>) -> Result<(), Contradiction> {
        let mut awaiting: Vec<usize> = (0..self.propagators.len())
            .filter(|&propagator| self.activation(environment, propagator) == Activation::New)
            .collect();
        if self.settings.sort_by_priority {
            awaiting.sort_by_key(|&propagator| self.priorities[propagator]);
        }
        for propagator in awaiting {
            self.activations[propagator].set(environment, Activation::Active.code());
            self.run(environment, propagator, None)?;
        }
        return Ok(());
    }

    fn run_fine(&mut self, environment: &mut Environment<StrategyT>, propagator: usize) -> Result<(), Contradiction> {
        let mut events = std::mem::take(&mut self.events);
        events.clear();
        self.schedule.take_events(propagator, &mut events);
        let mut result = Ok(());
        for &event in events.iter() {
            match self.run(environment, propagator, Some(event)) {
                Ok(false) => {}
                Ok(true) => break,
                Err(contradiction) => {
                    result = Err(contradiction);
                    break;
                }
            }
        }
        self.events = events;
        return result;
    }

    fn run_to_fixpoint(&mut self, environment: &mut Environment<StrategyT>) -> Result<(), Contradiction> {
        // decisions made since the last call
        self.notify(environment);
        self.activate_new(environment)?;
        while let Some(propagator) = self.schedule.pop() {
            debug_assert!(!self.schedule.is_scheduled(propagator));
            if self.activation(environment, propagator) != Activation::Active {
                self.schedule.clear_events(propagator);
                continue;
            }
            if self.fine[propagator] && self.schedule.has_pending_events(propagator) {
                self.run_fine(environment, propagator)?;
            } else {
                self.run(environment, propagator, None)?;
            }
        }
        return Ok(());
    }

    /// Runs propagators until none has anything left to do, or one of them
    /// finds the current node infeasible.
    pub fn propagate(&mut self, environment: &mut Environment<StrategyT>) -> Result<(), Contradiction> {
        assert!(self.state.is_consistent(), "flush the engine after a contradiction");
        let result = self.run_to_fixpoint(environment);
        return self.record(result);
    }

    /// Drops everything scheduled. Required after a contradiction, before
    /// the world is popped.
    pub fn flush(&mut self) {
        self.schedule.flush();
        self.changes.events.clear();
        self.changes.cause = Cause::Decision;
        self.state = EngineState::Consistent;
        trace!("flush");
    }
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, rc::Rc};

    use rand::{Rng, SeedableRng, rngs::SmallRng};

    use memory::{Copying, Environment, PackedTrailing, Strategy, Trailing};

    use super::{Engine, EngineSettings};
    use crate::{
        Cause, Contradiction, DomainView, ESat, EventMask, IntVar, Priority, PropagationContext,
        Propagator, PropagatorEventType, PropagatorId,
    };

    /// `x < y` on bounds.
    struct LessThan {
        variables: [IntVar; 2],
    }

    impl<StrategyT: Strategy> Propagator<StrategyT> for LessThan {
        fn variables(&self) -> &[IntVar] {
            return &self.variables;
        }

        fn priority(&self) -> Priority {
            return Priority::Binary;
        }

        fn propagation_conditions(&self, _variable_index: usize) -> EventMask {
            return EventMask::BOUND;
        }

        fn propagate(
            &mut self,
            context: &mut PropagationContext<'_, StrategyT>,
            _event: PropagatorEventType,
        ) -> Result<(), Contradiction> {
            let [x, y] = self.variables;
            context.update_upper_bound(x, context.upper_bound(y) - 1)?;
            context.update_lower_bound(y, context.lower_bound(x) + 1)?;
            if context.upper_bound(x) < context.lower_bound(y) {
                context.set_passive();
            }
            return Ok(());
        }

        fn is_entailed(&self, view: &DomainView<'_, StrategyT>) -> ESat {
            let [x, y] = self.variables;
            if view.upper_bound(x) < view.lower_bound(y) {
                return ESat::True;
            }
            if view.lower_bound(x) >= view.upper_bound(y) {
                return ESat::False;
            }
            return ESat::Undefined;
        }
    }

    /// `x != y`, woken by instantiations only.
    struct NotEqual {
        variables: [IntVar; 2],
    }

    impl NotEqual {
        fn filter<StrategyT: Strategy>(
            &self,
            context: &mut PropagationContext<'_, StrategyT>,
            from: usize,
        ) -> Result<(), Contradiction> {
            let (fixed, other) = (self.variables[from], self.variables[1 - from]);
            if let Some(value) = context.value(fixed) {
                context.remove_value(other, value)?;
                context.set_passive();
            }
            return Ok(());
        }
    }

    impl<StrategyT: Strategy> Propagator<StrategyT> for NotEqual {
        fn variables(&self) -> &[IntVar] {
            return &self.variables;
        }

        fn priority(&self) -> Priority {
            return Priority::Binary;
        }

        fn propagation_conditions(&self, _variable_index: usize) -> EventMask {
            return EventMask::INSTANTIATE;
        }

        fn reacts_to_fine_events(&self) -> bool {
            return true;
        }

        fn propagate(
            &mut self,
            context: &mut PropagationContext<'_, StrategyT>,
            _event: PropagatorEventType,
        ) -> Result<(), Contradiction> {
            self.filter(context, 0)?;
            return self.filter(context, 1);
        }

        fn propagate_on(
            &mut self,
            context: &mut PropagationContext<'_, StrategyT>,
            variable_index: usize,
            mask: EventMask,
        ) -> Result<(), Contradiction> {
            debug_assert!(mask.contains(EventMask::INSTANTIATE));
            return self.filter(context, variable_index);
        }

        fn is_entailed(&self, view: &DomainView<'_, StrategyT>) -> ESat {
            let [x, y] = self.variables;
            return match (view.value(x), view.value(y)) {
                (Some(a), Some(b)) if a == b => ESat::False,
                (Some(a), _) if !view.contains(y, a) => ESat::True,
                (_, Some(b)) if !view.contains(x, b) => ESat::True,
                _ => ESat::Undefined,
            };
        }
    }

    /// Records every call it receives and raises the lower bound of its
    /// variable to `floor`.
    struct Recorder {
        name: &'static str,
        variables: [IntVar; 1],
        floor: i32,
        priority: Priority,
        fine: bool,
        log: Rc<RefCell<Vec<(&'static str, Option<EventMask>)>>>,
    }

    impl<StrategyT: Strategy> Propagator<StrategyT> for Recorder {
        fn variables(&self) -> &[IntVar] {
            return &self.variables;
        }

        fn priority(&self) -> Priority {
            return self.priority;
        }

        fn reacts_to_fine_events(&self) -> bool {
            return self.fine;
        }

        fn propagate(
            &mut self,
            context: &mut PropagationContext<'_, StrategyT>,
            _event: PropagatorEventType,
        ) -> Result<(), Contradiction> {
            self.log.borrow_mut().push((self.name, None));
            context.update_lower_bound(self.variables[0], self.floor)?;
            return Ok(());
        }

        fn propagate_on(
            &mut self,
            context: &mut PropagationContext<'_, StrategyT>,
            _variable_index: usize,
            mask: EventMask,
        ) -> Result<(), Contradiction> {
            self.log.borrow_mut().push((self.name, Some(mask)));
            context.update_lower_bound(self.variables[0], self.floor)?;
            return Ok(());
        }

        fn is_entailed(&self, _view: &DomainView<'_, StrategyT>) -> ESat {
            return ESat::Undefined;
        }
    }

    fn count_solutions<StrategyT: Strategy>(
        engine: &mut Engine<StrategyT>,
        environment: &mut Environment<StrategyT>,
        variables: &[IntVar],
    ) -> usize {
        if engine.propagate(environment).is_err() {
            engine.flush();
            return 0;
        }
        let Some(&variable) = variables
            .iter()
            .find(|&&variable| !engine.view(environment).is_instantiated(variable))
        else {
            return 1;
        };
        let values: Vec<i32> = engine.view(environment).iter_values(variable).collect();
        let mut count = 0;
        for value in values {
            environment.world_push();
            match engine.instantiate_to(environment, variable, value) {
                Ok(_) => count += count_solutions(engine, environment, variables),
                Err(_) => engine.flush(),
            }
            environment.world_pop().unwrap();
        }
        return count;
    }

    fn chain_solutions<StrategyT: Strategy>() -> usize {
        let mut environment = Environment::<StrategyT>::new();
        let mut engine = Engine::new();
        let variables: Vec<IntVar> = (0..3)
            .map(|_| engine.new_int_var(&mut environment, 1, 4))
            .collect();
        for pair in variables.windows(2) {
            engine.add_propagator(&mut environment, LessThan {
                variables: [pair[0], pair[1]],
            });
        }
        return count_solutions(&mut engine, &mut environment, &variables);
    }

    fn permutations<StrategyT: Strategy>(size: i32) -> usize {
        let mut environment = Environment::<StrategyT>::new();
        let mut engine = Engine::new();
        let variables: Vec<IntVar> = (0..3)
            .map(|_| engine.new_int_var(&mut environment, 1, size))
            .collect();
        for i in 0..variables.len() {
            for j in i + 1..variables.len() {
                engine.add_propagator(&mut environment, NotEqual {
                    variables: [variables[i], variables[j]],
                });
            }
        }
        return count_solutions(&mut engine, &mut environment, &variables);
    }

    #[test]
    fn test_search_counts_agree_across_strategies() {
        assert_eq!(chain_solutions::<Trailing>(), 4);
        assert_eq!(chain_solutions::<PackedTrailing>(), 4);
        assert_eq!(chain_solutions::<Copying>(), 4);

        assert_eq!(permutations::<Trailing>(3), 6);
        assert_eq!(permutations::<PackedTrailing>(3), 6);
        assert_eq!(permutations::<Copying>(3), 6);
        assert_eq!(permutations::<Trailing>(2), 0);
    }

    #[test]
    fn test_chain_reaches_common_fixpoint() {
        for sort_by_priority in [false, true] {
            let mut environment = Environment::<Trailing>::new();
            let mut engine = Engine::with_settings(EngineSettings { sort_by_priority });
            let variables: Vec<IntVar> = (0..10)
                .map(|_| engine.new_bounded_int_var(&mut environment, 0, 9))
                .collect();
            // registered backwards so that bounds travel the whole chain
            for pair in variables.windows(2).rev() {
                engine.add_propagator(&mut environment, LessThan {
                    variables: [pair[0], pair[1]],
                });
            }
            assert_eq!(engine.propagate(&mut environment), Ok(()));
            let view = engine.view(&environment);
            for (value, variable) in variables.iter().enumerate() {
                assert_eq!(view.value(*variable), Some(value as i32));
            }
            assert!(engine.state().is_consistent());
        }
    }

    #[test]
    fn test_contradiction_then_flush_and_pop() {
        let mut environment = Environment::<Trailing>::new();
        let mut engine = Engine::new();
        let x = engine.new_int_var(&mut environment, 0, 5);
        let y = engine.new_int_var(&mut environment, 0, 5);
        engine.add_propagator(&mut environment, LessThan { variables: [x, y] });
        assert_eq!(engine.propagate(&mut environment), Ok(()));

        environment.world_push();
        let p = engine.add_propagator(&mut environment, LessThan { variables: [y, x] });
        let contradiction = engine.propagate(&mut environment).unwrap_err();
        assert!(matches!(contradiction.cause, Cause::Propagator(_)));
        assert!(engine.state().is_failed());
        assert_eq!(engine.is_entailed(&environment, p), ESat::False);

        engine.flush();
        environment.world_pop().unwrap();
        assert!(engine.state().is_consistent());
        let view = engine.view(&environment);
        assert_eq!((view.lower_bound(x), view.upper_bound(x)), (0, 4));
        assert_eq!((view.lower_bound(y), view.upper_bound(y)), (1, 5));
    }

    #[test]
    fn test_decision_outside_domain_fails() {
        let mut environment = Environment::<Copying>::new();
        let mut engine = Engine::new();
        let x = engine.new_bool_var(&mut environment);
        environment.world_push();
        let contradiction = engine.instantiate_to(&mut environment, x, 2).unwrap_err();
        assert_eq!(contradiction.cause, Cause::Decision);
        assert_eq!(contradiction.variable, Some(x));
        engine.flush();
        environment.world_pop().unwrap();
        assert_eq!(engine.view(&environment).size(x), 2);
    }

    #[test]
    fn test_passivation_is_undone_by_backtracking() {
        let mut environment = Environment::<Trailing>::new();
        let mut engine = Engine::new();
        let x = engine.new_int_var(&mut environment, 0, 2);
        let y = engine.new_int_var(&mut environment, 0, 2);
        let p = engine.add_propagator(&mut environment, NotEqual { variables: [x, y] });
        assert_eq!(engine.propagate(&mut environment), Ok(()));
        assert!(engine.is_active(&environment, p));

        environment.world_push();
        assert_eq!(engine.instantiate_to(&mut environment, x, 1), Ok(true));
        assert_eq!(engine.propagate(&mut environment), Ok(()));
        assert!(engine.is_passive(&environment, p));
        assert_eq!(engine.view(&environment).iter_values(y).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(engine.is_entailed(&environment, p), ESat::True);

        environment.world_pop().unwrap();
        assert!(engine.is_active(&environment, p));
        assert_eq!(engine.view(&environment).size(y), 3);
    }

    #[test]
    fn test_own_changes_do_not_reschedule() {
        let mut environment = Environment::<Trailing>::new();
        let mut engine = Engine::new();
        let x = engine.new_int_var(&mut environment, 0, 9);
        let log = Rc::new(RefCell::new(Vec::new()));
        engine.add_propagator(&mut environment, Recorder {
            name: "floor",
            variables: [x],
            floor: 3,
            priority: Priority::Unary,
            fine: false,
            log: log.clone(),
        });
        assert_eq!(engine.propagate(&mut environment), Ok(()));
        assert_eq!(engine.view(&environment).lower_bound(x), 3);
        assert_eq!(*log.borrow(), vec![("floor", None)]);

        assert_eq!(engine.propagate(&mut environment), Ok(()));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_priority_classes_and_activation_order() {
        for sort_by_priority in [false, true] {
            let mut environment = Environment::<Trailing>::new();
            let mut engine = Engine::with_settings(EngineSettings { sort_by_priority });
            let x = engine.new_int_var(&mut environment, 0, 9);
            let log = Rc::new(RefCell::new(Vec::new()));
            for (name, priority) in [("slow", Priority::Cubic), ("fast", Priority::Unary)] {
                engine.add_propagator(&mut environment, Recorder {
                    name,
                    variables: [x],
                    floor: 0,
                    priority,
                    fine: false,
                    log: log.clone(),
                });
            }
            assert_eq!(engine.propagate(&mut environment), Ok(()));
            let activation: Vec<&str> = log.borrow().iter().map(|(name, _)| *name).collect();
            if sort_by_priority {
                assert_eq!(activation, vec!["fast", "slow"]);
            } else {
                assert_eq!(activation, vec!["slow", "fast"]);
            }

            log.borrow_mut().clear();
            assert_eq!(engine.remove_value(&mut environment, x, 0), Ok(true));
            assert_eq!(engine.propagate(&mut environment), Ok(()));
            let runs: Vec<&str> = log.borrow().iter().map(|(name, _)| *name).collect();
            assert_eq!(runs, vec!["fast", "slow"]);
        }
    }

    #[test]
    fn test_fine_events_are_merged_per_variable() {
        let mut environment = Environment::<PackedTrailing>::new();
        let mut engine = Engine::new();
        let x = engine.new_int_var(&mut environment, 0, 9);
        let log = Rc::new(RefCell::new(Vec::new()));
        let p = engine.add_propagator(&mut environment, Recorder {
            name: "fine",
            variables: [x],
            floor: 0,
            priority: Priority::Linear,
            fine: true,
            log: log.clone(),
        });
        assert_eq!(engine.propagate(&mut environment), Ok(()));
        log.borrow_mut().clear();

        assert_eq!(engine.remove_value(&mut environment, x, 5), Ok(true));
        assert_eq!(engine.update_upper_bound(&mut environment, x, 7), Ok(true));
        assert_eq!(engine.propagate(&mut environment), Ok(()));
        assert_eq!(
            *log.borrow(),
            vec![("fine", Some(EventMask::REMOVE | EventMask::DECUPP))]
        );

        log.borrow_mut().clear();
        engine.schedule(&environment, p, 0, EventMask::INCLOW);
        assert_eq!(engine.propagate(&mut environment), Ok(()));
        assert_eq!(*log.borrow(), vec![("fine", Some(EventMask::INCLOW))]);
    }

    /// Random networks of `<` and `!=` over four variables, against brute
    /// force enumeration.
    fn random_network<StrategyT: Strategy>(seed: u64) -> (usize, usize) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut environment = Environment::<StrategyT>::new();
        let mut engine = Engine::new();
        let variables: Vec<IntVar> = (0..4)
            .map(|_| engine.new_int_var(&mut environment, 1, 4))
            .collect();
        let mut constraints = Vec::new();
        for _ in 0..rng.gen_range(1..5) {
            let x = rng.gen_range(0..4);
            let y = (x + rng.gen_range(1..4)) % 4;
            let less = rng.gen_bool(0.3);
            constraints.push((less, x, y));
            let pair = [variables[x], variables[y]];
            if less {
                engine.add_propagator(&mut environment, LessThan { variables: pair });
            } else {
                engine.add_propagator(&mut environment, NotEqual { variables: pair });
            }
        }

        let expected = (0..256u32)
            .filter(|&code| {
                let value = |i: usize| (code >> (2 * i)) & 3;
                constraints.iter().all(|&(less, x, y)| {
                    if less { value(x) < value(y) } else { value(x) != value(y) }
                })
            })
            .count();
        return (count_solutions(&mut engine, &mut environment, &variables), expected);
    }

    #[test]
    fn test_random_networks_match_enumeration() {
        for seed in 0..30 {
            let (found, expected) = random_network::<Trailing>(seed);
            assert_eq!(found, expected, "seed {seed}");
            assert_eq!(random_network::<PackedTrailing>(seed).0, expected, "seed {seed}");
            assert_eq!(random_network::<Copying>(seed).0, expected, "seed {seed}");
        }
    }

    fn propagator_added_below_root<StrategyT: Strategy>() {
        let mut environment = Environment::<StrategyT>::new();
        let mut engine = Engine::new();
        let x = engine.new_int_var(&mut environment, 0, 5);
        let y = engine.new_int_var(&mut environment, 0, 5);
        environment.world_push();
        let p = engine.add_propagator(&mut environment, LessThan { variables: [x, y] });
        assert_eq!(engine.propagate(&mut environment), Ok(()));
        assert!(engine.is_active(&environment, p));
        environment.world_pop().unwrap();

        // the propagator outlives the world it was added in and runs again
        assert!(!engine.is_active(&environment, p));
        assert_eq!(engine.view(&environment).upper_bound(x), 5);
        assert_eq!(engine.propagate(&mut environment), Ok(()));
        assert!(engine.is_active(&environment, p));
        let view = engine.view(&environment);
        assert_eq!((view.upper_bound(x), view.lower_bound(y)), (4, 1));
    }

    #[test]
    fn test_propagator_added_below_root_runs_again_after_pop() {
        propagator_added_below_root::<Trailing>();
        propagator_added_below_root::<PackedTrailing>();
        propagator_added_below_root::<Copying>();
    }

    #[derive(Clone, Copy, Debug)]
    enum Step {
        Push,
        Pop,
        Commit,
        AddVariable(i32, i32),
        AddLessThan(usize, usize),
        AddNotEqual(usize, usize),
        Instantiate(usize, i32),
        RaiseLower(usize, i32),
        Remove(usize, i32),
        Propagate,
    }

    /// An engine driven by hand, as a search would.
    struct Search<StrategyT: Strategy> {
        environment: Environment<StrategyT>,
        engine: Engine<StrategyT>,
        variables: Vec<IntVar>,
        propagators: Vec<PropagatorId>,
    }

    impl<StrategyT: Strategy> Search<StrategyT> {
        fn new() -> Self {
            let mut environment = Environment::<StrategyT>::new();
            let mut engine = Engine::new();
            let variables = vec![engine.new_int_var(&mut environment, 0, 3)];
            return Self {
                environment,
                engine,
                variables,
                propagators: Vec::new(),
            };
        }

        fn apply(&mut self, step: Step) {
            let environment = &mut self.environment;
            let result = match step {
                Step::Push => {
                    environment.world_push();
                    Ok(())
                }
                Step::Pop => {
                    self.engine.flush();
                    environment.world_pop().unwrap();
                    Ok(())
                }
                Step::Commit => {
                    environment.world_commit().unwrap();
                    Ok(())
                }
                Step::AddVariable(lower, upper) => {
                    let variable = self.engine.new_int_var(environment, lower, upper);
                    self.variables.push(variable);
                    Ok(())
                }
                Step::AddLessThan(x, y) => {
                    let variables = [self.variables[x], self.variables[y]];
                    self.propagators
                        .push(self.engine.add_propagator(environment, LessThan { variables }));
                    Ok(())
                }
                Step::AddNotEqual(x, y) => {
                    let variables = [self.variables[x], self.variables[y]];
                    self.propagators
                        .push(self.engine.add_propagator(environment, NotEqual { variables }));
                    Ok(())
                }
                Step::Instantiate(x, value) => self
                    .engine
                    .instantiate_to(environment, self.variables[x], value)
                    .map(|_| ()),
                Step::RaiseLower(x, value) => self
                    .engine
                    .update_lower_bound(environment, self.variables[x], value)
                    .map(|_| ()),
                Step::Remove(x, value) => self
                    .engine
                    .remove_value(environment, self.variables[x], value)
                    .map(|_| ()),
                Step::Propagate => self.engine.propagate(environment),
            };
            if result.is_err() {
                self.engine.flush();
            }
        }

        /// Domains, then the activation of each propagator.
        fn observe(&self) -> (Vec<Vec<i32>>, Vec<(bool, bool)>) {
            let view = self.engine.view(&self.environment);
            let domains = self
                .variables
                .iter()
                .map(|&variable| view.iter_values(variable).collect())
                .collect();
            let activations = self
                .propagators
                .iter()
                .map(|&propagator| {
                    (
                        self.engine.is_active(&self.environment, propagator),
                        self.engine.is_passive(&self.environment, propagator),
                    )
                })
                .collect();
            return (domains, activations);
        }
    }

    fn random_step(rng: &mut SmallRng, world: usize, variables: usize) -> Step {
        loop {
            let pair = (rng.gen_range(0..variables), rng.gen_range(0..variables));
            let step = match rng.gen_range(0..11) {
                0 | 1 => Step::Push,
                2 if world > 0 => Step::Pop,
                3 if world > 0 => Step::Commit,
                4 if variables < 8 => {
                    let lower = rng.gen_range(-2..3);
                    Step::AddVariable(lower, lower + rng.gen_range(0..6))
                }
                5 => match pair {
                    (x, y) if x != y => Step::AddLessThan(x, y),
                    _ => continue,
                },
                6 => match pair {
                    (x, y) if x != y => Step::AddNotEqual(x, y),
                    _ => continue,
                },
                7 => Step::Instantiate(rng.gen_range(0..variables), rng.gen_range(-2..8)),
                8 => Step::RaiseLower(rng.gen_range(0..variables), rng.gen_range(-2..8)),
                9 => Step::Remove(rng.gen_range(0..variables), rng.gen_range(-2..8)),
                10 => Step::Propagate,
                _ => continue,
            };
            return step;
        }
    }

    /// Variables and propagators created at any depth, stepped through
    /// pushes, pops and commits on one search per strategy.
    #[test]
    fn test_strategies_agree_on_searches_growing_below_root() {
        for seed in 0..25u64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut trailing = Search::<Trailing>::new();
            let mut packed = Search::<PackedTrailing>::new();
            let mut copying = Search::<Copying>::new();
            for _ in 0..200 {
                let step = random_step(&mut rng, trailing.environment.world_index(), trailing.variables.len());
                trailing.apply(step);
                packed.apply(step);
                copying.apply(step);

                let expected = trailing.observe();
                assert_eq!(packed.observe(), expected, "seed {seed}, {step:?}");
                assert_eq!(copying.observe(), expected, "seed {seed}, {step:?}");
                assert_eq!(
                    copying.environment.world_index(),
                    trailing.environment.world_index()
                );
            }
        }
    }
}

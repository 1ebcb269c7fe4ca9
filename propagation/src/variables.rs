//! Integer variables whose domains live in reversible cells.

use either::Either;
use memory::{BitSet, Cell, Environment, Strategy};

use crate::{Cause, Contradiction, IntEvent};

/// Handle of an integer variable of an [`Engine`](crate::Engine).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IntVar(usize);

impl IntVar {
    #[inline(always)]
    pub fn index(&self) -> usize {
        return self.0;
    }
}

/// Domain changes made since the engine last looked, and who made them.
pub(crate) struct Changes {
    pub cause: Cause,
    pub events: Vec<(IntVar, IntEvent)>,
}

impl Changes {
    pub fn new() -> Self {
        Self {
            cause: Cause::Decision,
            events: Vec::default(),
        }
    }

    #[inline(always)]
    fn push(&mut self, variable: IntVar, event: IntEvent) {
        self.events.push((variable, event));
    }

    fn fail(&self, variable: IntVar, message: String) -> Contradiction {
        return Contradiction::new(self.cause, Some(variable), message);
    }
}

struct Domain {
    lower: Cell<i32>,
    upper: Cell<i32>,
    size: Cell<i32>,
    /// Bit `b` stands for the value `offset + b`; bounded domains have none.
    values: Option<BitSet>,
    /// Initial lower bound.
    offset: i32,
}

/// Domains of every integer variable of an engine.
#[derive(Default)]
pub struct Variables {
    domains: Vec<Domain>,
}

impl Variables {
    pub fn len(&self) -> usize {
        return self.domains.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.domains.is_empty();
    }

    /// Makes a variable ranging over `lower..=upper`. A bounded variable only
    /// keeps its bounds, so removing an inner value has no effect on it.
    ///
    /// # Panics
    ///
    /// If the range is empty or holds more than `i32::MAX` values.
    pub fn new_int_var<StrategyT: Strategy>(
        &mut self,
        environment: &mut Environment<StrategyT>,
        lower: i32,
        upper: i32,
        bounded: bool,
    ) -> IntVar {
        assert!(lower <= upper, "empty domain {lower}..={upper}");
        let width = upper as i64 - lower as i64 + 1;
        assert!(width <= i32::MAX as i64, "domain {lower}..={upper} holds more than i32::MAX values");
        let values = if bounded {
            None
        } else {
            Some(environment.make_full_bit_set(width as usize))
        };
        self.domains.push(Domain {
            lower: environment.make_int(lower),
            upper: environment.make_int(upper),
            size: environment.make_int(width as i32),
            values,
            offset: lower,
        });
        return IntVar(self.domains.len() - 1);
    }

    #[inline(always)]
    pub fn lower_bound<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>, variable: IntVar) -> i32 {
        return self.domains[variable.0].lower.get(environment);
    }

    #[inline(always)]
    pub fn upper_bound<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>, variable: IntVar) -> i32 {
        return self.domains[variable.0].upper.get(environment);
    }

    #[inline(always)]
    pub fn size<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>, variable: IntVar) -> usize {
        return self.domains[variable.0].size.get(environment) as usize;
    }

    #[inline(always)]
    pub fn is_instantiated<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>, variable: IntVar) -> bool {
        return self.size(environment, variable) == 1;
    }

    pub fn value<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>, variable: IntVar) -> Option<i32> {
        if self.is_instantiated(environment, variable) {
            return Some(self.lower_bound(environment, variable));
        }
        return None;
    }

    pub fn contains<StrategyT: Strategy>(
        &self,
        environment: &Environment<StrategyT>,
        variable: IntVar,
        value: i32,
    ) -> bool {
        let domain = &self.domains[variable.0];
        if value < domain.lower.get(environment) || value > domain.upper.get(environment) {
            return false;
        }
        return match &domain.values {
            None => true,
            Some(values) => values.get(environment, (value - domain.offset) as usize),
        };
    }

    /// Smallest value of the domain above `value`.
    pub fn next_value<StrategyT: Strategy>(
        &self,
        environment: &Environment<StrategyT>,
        variable: IntVar,
        value: i32,
    ) -> Option<i32> {
        let domain = &self.domains[variable.0];
        let lower = domain.lower.get(environment);
        if value >= domain.upper.get(environment) {
            return None;
        }
        if value < lower {
            return Some(lower);
        }
        return match &domain.values {
            None => Some(value + 1),
            Some(values) => values
                .next_set_bit(environment, (value - domain.offset + 1) as usize)
                .map(|bit| bit as i32 + domain.offset),
        };
    }

    /// Values of the domain in increasing order.
    pub fn iter_values<'a, StrategyT: Strategy>(
        &'a self,
        environment: &'a Environment<StrategyT>,
        variable: IntVar,
    ) -> impl Iterator<Item = i32> + 'a {
        let domain = &self.domains[variable.0];
        return match &domain.values {
            None => Either::Left(domain.lower.get(environment)..=domain.upper.get(environment)),
            Some(values) => {
                let offset = domain.offset;
                Either::Right(values.iter(environment).map(move |bit| bit as i32 + offset))
            }
        };
    }

    /// Counts the values of `from..to`, as bit positions.
    fn count_values<StrategyT: Strategy>(
        environment: &Environment<StrategyT>,
        values: &BitSet,
        from: usize,
        to: usize,
    ) -> i32 {
        let mut count = 0;
        let mut bit = values.next_set_bit(environment, from);
        while let Some(position) = bit {
            if position >= to {
                break;
            }
            count += 1;
            bit = values.next_set_bit(environment, position + 1);
        }
        return count;
    }

    pub(crate) fn update_lower_bound<StrategyT: Strategy>(
        &self,
        environment: &mut Environment<StrategyT>,
        changes: &mut Changes,
        variable: IntVar,
        value: i32,
    ) -> Result<bool, Contradiction> {
        let domain = &self.domains[variable.0];
        let (lower, upper) = (domain.lower.get(environment), domain.upper.get(environment));
        if value <= lower {
            return Ok(false);
        }
        if value > upper {
            return Err(changes.fail(variable, format!("lower bound {value} above upper bound {upper}")));
        }
        let new_lower = match &domain.values {
            None => {
                domain.size.set(environment, upper - value + 1);
                value
            }
            Some(values) => {
                let (from, to) = ((lower - domain.offset) as usize, (value - domain.offset) as usize);
                let removed = Self::count_values(environment, values, from, to);
                values.clear_range(environment, from, to);
                domain.size.add(environment, -removed);
                // the upper bound is still in the set
                values
                    .next_set_bit(environment, to)
                    .map_or(upper, |bit| bit as i32 + domain.offset)
            }
        };
        domain.lower.set(environment, new_lower);
        let event = if new_lower == upper { IntEvent::Instantiate } else { IntEvent::IncLow };
        changes.push(variable, event);
        return Ok(true);
    }

    pub(crate) fn update_upper_bound<StrategyT: Strategy>(
        &self,
        environment: &mut Environment<StrategyT>,
        changes: &mut Changes,
        variable: IntVar,
        value: i32,
    ) -> Result<bool, Contradiction> {
        let domain = &self.domains[variable.0];
        let (lower, upper) = (domain.lower.get(environment), domain.upper.get(environment));
        if value >= upper {
            return Ok(false);
        }
        if value < lower {
            return Err(changes.fail(variable, format!("upper bound {value} below lower bound {lower}")));
        }
        let new_upper = match &domain.values {
            None => {
                domain.size.set(environment, value - lower + 1);
                value
            }
            Some(values) => {
                let (from, to) = ((value - domain.offset + 1) as usize, (upper - domain.offset + 1) as usize);
                let removed = Self::count_values(environment, values, from, to);
                values.clear_range(environment, from, to);
                domain.size.add(environment, -removed);
                values
                    .prev_set_bit(environment, from - 1)
                    .map_or(lower, |bit| bit as i32 + domain.offset)
            }
        };
        domain.upper.set(environment, new_upper);
        let event = if new_upper == lower { IntEvent::Instantiate } else { IntEvent::DecUpp };
        changes.push(variable, event);
        return Ok(true);
    }

    pub(crate) fn remove_value<StrategyT: Strategy>(
        &self,
        environment: &mut Environment<StrategyT>,
        changes: &mut Changes,
        variable: IntVar,
        value: i32,
    ) -> Result<bool, Contradiction> {
        let domain = &self.domains[variable.0];
        let (lower, upper) = (domain.lower.get(environment), domain.upper.get(environment));
        if value < lower || value > upper {
            return Ok(false);
        }
        if lower == upper {
            return Err(changes.fail(variable, format!("removal of the last value {value}")));
        }
        let Some(values) = &domain.values else {
            return if value == lower {
                self.update_lower_bound(environment, changes, variable, value + 1)
            } else if value == upper {
                self.update_upper_bound(environment, changes, variable, value - 1)
            } else {
                Ok(false)
            };
        };

        let bit = (value - domain.offset) as usize;
        if !values.get(environment, bit) {
            return Ok(false);
        }
        values.clear(environment, bit);
        domain.size.add(environment, -1);
        let event = if value == lower {
            let new_lower = values
                .next_set_bit(environment, bit + 1)
                .map_or(upper, |next| next as i32 + domain.offset);
            domain.lower.set(environment, new_lower);
            if new_lower == upper { IntEvent::Instantiate } else { IntEvent::IncLow }
        } else if value == upper {
            let new_upper = values
                .prev_set_bit(environment, bit - 1)
                .map_or(lower, |previous| previous as i32 + domain.offset);
            domain.upper.set(environment, new_upper);
            if new_upper == lower { IntEvent::Instantiate } else { IntEvent::DecUpp }
        } else {
            IntEvent::Remove
        };
        changes.push(variable, event);
        return Ok(true);
    }

    pub(crate) fn instantiate_to<StrategyT: Strategy>(
        &self,
        environment: &mut Environment<StrategyT>,
        changes: &mut Changes,
        variable: IntVar,
        value: i32,
    ) -> Result<bool, Contradiction> {
        if !self.contains(environment, variable, value) {
            return Err(changes.fail(variable, format!("instantiation to {value} outside the domain")));
        }
        let domain = &self.domains[variable.0];
        let (lower, upper) = (domain.lower.get(environment), domain.upper.get(environment));
        if lower == upper {
            return Ok(false);
        }
        if let Some(values) = &domain.values {
            let bit = (value - domain.offset) as usize;
            values.clear_range(environment, (lower - domain.offset) as usize, bit);
            values.clear_range(environment, bit + 1, (upper - domain.offset + 1) as usize);
        }
        domain.lower.set(environment, value);
        domain.upper.set(environment, value);
        domain.size.set(environment, 1);
        changes.push(variable, IntEvent::Instantiate);
        return Ok(true);
    }
}

/// Read-only access to the domains, as seen from an environment.
pub struct DomainView<'a, StrategyT: Strategy> {
    pub(crate) environment: &'a Environment<StrategyT>,
    pub(crate) variables: &'a Variables,
}

impl<'a, StrategyT: Strategy> DomainView<'a, StrategyT> {
    pub fn lower_bound(&self, variable: IntVar) -> i32 {
        return self.variables.lower_bound(self.environment, variable);
    }

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

    pub fn iter_values(&self, variable: IntVar) -> impl Iterator<Item = i32> + 'a {
        return self.variables.iter_values(self.environment, variable);
    }
}

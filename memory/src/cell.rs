use std::{any::Any, fmt::Debug, marker::PhantomData, sync::Arc};

use num::Num;

use crate::{
    Environment, Strategy,
    store::ScalarStore,
    value::{Object, StateValue},
};

/// Handle of a reversible scalar cell. The value lives in the environment
/// that made the handle; using it with another environment is a bug.
pub struct Cell<ValueT> {
    slot: usize,
    _value: PhantomData<fn() -> ValueT>,
}

pub type IntCell = Cell<i32>;
pub type LongCell = Cell<i64>;
pub type BoolCell = Cell<bool>;
pub type DoubleCell = Cell<f64>;

impl<ValueT> Clone for Cell<ValueT> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<ValueT> Copy for Cell<ValueT> {}

impl<ValueT> PartialEq for Cell<ValueT> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<ValueT> Eq for Cell<ValueT> {}

impl<ValueT> Debug for Cell<ValueT> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cell({})", self.slot)
    }
}

impl<ValueT: StateValue> Cell<ValueT> {
    pub(crate) fn from_slot(slot: usize) -> Self {
        Self {
            slot,
            _value: PhantomData,
        }
    }

    #[inline(always)]
    pub fn slot(&self) -> usize {
        return self.slot;
    }

    #[inline(always)]
    pub fn get<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>) -> ValueT {
        return environment
            .scalar_store::<ValueT>()
            .get(self.slot)
            .clone();
    }

    /// Writes `value` if it differs from the current one. Only the first
    /// change within a world is recorded.
    #[inline(always)]
    pub fn set<StrategyT: Strategy>(&self, environment: &mut Environment<StrategyT>, value: ValueT) {
        let world = environment.world_index();
        let store = environment.scalar_store_mut::<ValueT>();
        if store.get(self.slot).differs(&value) {
            store.set(self.slot, value, world);
        }
    }
}

impl<ValueT> Cell<ValueT>
where
    ValueT: StateValue + Num + Copy,
{
    /// Adds `delta` and returns the new value.
    pub fn add<StrategyT: Strategy>(&self, environment: &mut Environment<StrategyT>, delta: ValueT) -> ValueT {
        let value = self.get(environment) + delta;
        self.set(environment, value);
        return value;
    }
}

/// Reversible reference to a shared value of type `ValueT`.
pub struct ObjectCell<ValueT> {
    cell: Cell<Object>,
    _value: PhantomData<fn() -> ValueT>,
}

impl<ValueT> Clone for ObjectCell<ValueT> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<ValueT> Copy for ObjectCell<ValueT> {}

impl<ValueT> Debug for ObjectCell<ValueT> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectCell({})", self.cell.slot)
    }
}

impl<ValueT: Any + Send + Sync> ObjectCell<ValueT> {
    pub(crate) fn from_cell(cell: Cell<Object>) -> Self {
        Self {
            cell,
            _value: PhantomData,
        }
    }

    pub fn get<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>) -> Arc<ValueT> {
        match environment.scalar_store::<Object>().get(self.cell.slot).downcast() {
            Some(value) => value,
            None => unreachable!("object cells only ever hold their own type"),
        }
    }

    pub fn set<StrategyT: Strategy>(&self, environment: &mut Environment<StrategyT>, value: ValueT) {
        self.cell.set(environment, Object::new(value));
    }

    /// Points the cell at `value`; a no-op when it already holds that very
    /// allocation.
    pub fn set_shared<StrategyT: Strategy>(
        &self,
        environment: &mut Environment<StrategyT>,
        value: Arc<ValueT>,
    ) {
        self.cell.set(environment, Object::from_arc(value));
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{Copying, Environment, PackedTrailing, Trailing};

    #[test]
    fn test_add_on_numeric_cells() {
        let mut env = Environment::<Trailing>::new();
        let count = env.make_long(10);
        let ratio = env.make_float(0.25);
        env.world_push();
        assert_eq!(count.add(&mut env, -3), 7);
        assert_eq!(ratio.add(&mut env, 0.5), 0.75);
        env.world_pop().unwrap();
        assert_eq!(count.get(&env), 10);
        assert_eq!(ratio.get(&env), 0.25);
    }

    #[test]
    fn test_nan_overwrite_is_not_a_change() {
        let mut env = Environment::<PackedTrailing>::new();
        let x = env.make_float(f64::NAN);
        env.world_push();
        x.set(&mut env, f64::NAN);
        assert_eq!(env.store::<f64>().map(|store| store.logged()), Some(0));
        x.set(&mut env, 1.0);
        assert_eq!(env.store::<f64>().map(|store| store.logged()), Some(1));
        env.world_pop().unwrap();
        assert!(x.get(&env).is_nan());
    }

    #[test]
    fn test_object_cells_restore_previous_allocation() {
        let mut env = Environment::<Copying>::new();
        let name = env.make_object(String::from("root"));
        let root = name.get(&env);
        env.world_push();
        name.set(&mut env, String::from("left"));
        assert_eq!(name.get(&env).as_str(), "left");
        env.world_pop().unwrap();
        assert!(Arc::ptr_eq(&name.get(&env), &root));
    }

    #[test]
    fn test_object_cells_with_trailing() {
        let mut env = Environment::<PackedTrailing>::new();
        let items = env.make_object(vec![1, 2, 3]);
        let shared = Arc::new(vec![4]);
        env.world_push();
        items.set_shared(&mut env, shared.clone());
        items.set_shared(&mut env, shared.clone());
        assert_eq!(env.store::<crate::Object>().map(|store| store.logged()), Some(1));
        assert_eq!(*items.get(&env), vec![4]);
        env.world_pop().unwrap();
        assert_eq!(*items.get(&env), vec![1, 2, 3]);
    }
}

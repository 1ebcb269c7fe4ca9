use std::{fmt::Debug, marker::PhantomData};

use crate::{
    Cell, Environment, MemoryError, Strategy,
    store::VectorStore,
    value::{StateValue, VectorValue},
};

/// Handle of a reversible vector. The logical size is an int cell; the
/// element buffer only grows, so elements past the size are stale.
pub struct Vector<ValueT> {
    slot: usize,
    size: Cell<i32>,
    _value: PhantomData<fn() -> ValueT>,
}

pub type IntVector = Vector<i32>;
pub type DoubleVector = Vector<f64>;

impl<ValueT> Clone for Vector<ValueT> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<ValueT> Copy for Vector<ValueT> {}

impl<ValueT> Debug for Vector<ValueT> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vector({})", self.slot)
    }
}

impl<ValueT: VectorValue> Vector<ValueT> {
    pub(crate) fn from_parts(slot: usize, size: Cell<i32>) -> Self {
        Self {
            slot,
            size,
            _value: PhantomData,
        }
    }

    #[inline(always)]
    pub fn size<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>) -> usize {
        return self.size.get(environment) as usize;
    }

    #[inline(always)]
    pub fn is_empty<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>) -> bool {
        return self.size(environment) == 0;
    }

    fn check_index<StrategyT: Strategy>(
        &self,
        environment: &Environment<StrategyT>,
        index: usize,
    ) -> Result<(), MemoryError> {
        let size = self.size(environment);
        if index >= size {
            return Err(MemoryError::IndexOutOfBounds { index, size });
        }
        return Ok(());
    }

    pub fn get<StrategyT: Strategy>(
        &self,
        environment: &Environment<StrategyT>,
        index: usize,
    ) -> Result<ValueT, MemoryError> {
        self.check_index(environment, index)?;
        return Ok(self.quick_get(environment, index));
    }

    pub fn set<StrategyT: Strategy>(
        &self,
        environment: &mut Environment<StrategyT>,
        index: usize,
        value: ValueT,
    ) -> Result<(), MemoryError> {
        self.check_index(environment, index)?;
        self.quick_set(environment, index, value);
        return Ok(());
    }

    /// Reads without checking `index` against the size.
    #[inline(always)]
    pub fn quick_get<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>, index: usize) -> ValueT {
        debug_assert!(index < self.size(environment));
        return environment.vectors::<ValueT>().get(self.slot, index);
    }

    /// Writes without checking `index` against the size.
    #[inline(always)]
    pub fn quick_set<StrategyT: Strategy>(
        &self,
        environment: &mut Environment<StrategyT>,
        index: usize,
        value: ValueT,
    ) {
        debug_assert!(index < self.size(environment));
        let world = environment.world_index();
        let store = environment.vectors_mut::<ValueT>();
        if store.get(self.slot, index).differs(&value) {
            store.set(self.slot, index, value, world);
        }
    }

    /// Appends `value`, reusing the stale slot past the end when there is one.
    pub fn add<StrategyT: Strategy>(&self, environment: &mut Environment<StrategyT>, value: ValueT) {
        let size = self.size(environment);
        let world = environment.world_index();
        let store = environment.vectors_mut::<ValueT>();
        if size < store.buffer_len(self.slot) {
            store.set(self.slot, size, value, world);
        } else {
            store.append(self.slot, value, world);
        }
        self.size.set(environment, size as i32 + 1);
    }

    pub fn remove_last<StrategyT: Strategy>(
        &self,
        environment: &mut Environment<StrategyT>,
    ) -> Result<(), MemoryError> {
        let size = self.size(environment);
        if size == 0 {
            return Err(MemoryError::EmptyVector);
        }
        self.size.set(environment, size as i32 - 1);
        return Ok(());
    }

    pub fn clear<StrategyT: Strategy>(&self, environment: &mut Environment<StrategyT>) {
        self.size.set(environment, 0);
    }

    pub fn iter<'a, StrategyT: Strategy>(
        &self,
        environment: &'a Environment<StrategyT>,
    ) -> impl Iterator<Item = ValueT> + 'a {
        let (slot, size) = (self.slot, self.size(environment));
        let store = environment.vectors::<ValueT>();
        return (0..size).map(move |index| store.get(slot, index));
    }
}

//! Per-type backing stores and the world protocol they share.

use crate::Settings;

/// The store families an environment can hold, one per value type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StoreKind {
    Int,
    Long,
    Bool,
    Double,
    Object,
    IntVector,
    DoubleVector,
}

/// World protocol, fanned out by the environment to every store it holds.
pub trait Store {
    /// Checkpoints the store before the search enters `world`.
    fn world_push(&mut self, world: usize);

    /// Restores the store to the state it had when `world` was entered.
    fn world_pop(&mut self, world: usize);

    /// Merges `world` into `world - 1`, keeping the current state.
    fn world_commit(&mut self, world: usize);
}

/// Values of every scalar cell of one type, indexed by slot.
pub trait ScalarStore<ValueT>: Store {
    /// `world` is the current world when the store is created; stores made
    /// mid-search behave as if they were empty since the root.
    fn new(settings: &Settings, world: usize) -> Self;

    fn len(&self) -> usize;

    /// Allocates the slot of a new cell.
    fn create(&mut self, value: ValueT, world: usize) -> usize;

    fn get(&self, slot: usize) -> &ValueT;

    /// Writes unconditionally; the caller decides whether the value changed.
    fn set(&mut self, slot: usize, value: ValueT, world: usize);
}

/// Element buffers of every vector of one type, indexed by slot.
///
/// Sizes are kept in int cells by the vectors themselves; a store only
/// knows the buffers, whose length may exceed the logical size.
pub trait VectorStore<ValueT>: Store {
    fn new(settings: &Settings, world: usize) -> Self;

    fn len(&self) -> usize;

    fn create(&mut self, size: usize, value: ValueT, world: usize) -> usize;

    fn buffer_len(&self, slot: usize) -> usize;

    fn get(&self, slot: usize, index: usize) -> ValueT;

    fn set(&mut self, slot: usize, index: usize, value: ValueT, world: usize);

    /// Appends past the end of the buffer.
    fn append(&mut self, slot: usize, value: ValueT, world: usize);
}

pub(crate) const MINIMUM_BUFFER_CAPACITY: usize = 8;

/// Grows `buffer` by half its capacity (at least to the minimum capacity)
/// when `required` elements no longer fit.
pub(crate) fn ensure_capacity<ValueT>(buffer: &mut Vec<ValueT>, required: usize) {
    if buffer.capacity() < required {
        let capacity = (buffer.capacity() * 3 / 2)
            .max(MINIMUM_BUFFER_CAPACITY)
            .max(required);
        buffer.reserve_exact(capacity - buffer.len());
    }
}

#[cfg(test)]
mod test {
    use super::{MINIMUM_BUFFER_CAPACITY, ensure_capacity};

    #[test]
    fn test_ensure_capacity_grows_by_half() {
        let mut buffer: Vec<i32> = Vec::new();
        ensure_capacity(&mut buffer, 1);
        assert!(buffer.capacity() >= MINIMUM_BUFFER_CAPACITY);

        let mut buffer: Vec<i32> = Vec::with_capacity(20);
        buffer.extend(0..20);
        ensure_capacity(&mut buffer, 21);
        assert!(buffer.capacity() >= 30);

        let mut buffer: Vec<i32> = Vec::with_capacity(20);
        ensure_capacity(&mut buffer, 5);
        assert_eq!(buffer.capacity(), 20);
    }
}

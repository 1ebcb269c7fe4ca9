//! Copying stores: every push saves the whole live array, every pop swaps
//! the saved copy back in. Writes cost nothing extra.

use tracing::trace;

use crate::{
    Settings,
    store::{ScalarStore, Store, VectorStore, ensure_capacity},
};

/// Copied values of every scalar cell of one type.
///
/// Snapshots are kept per world and reused across pushes. A cell created
/// after a snapshot was taken lies beyond its end: restoring that snapshot
/// leaves it out and resets it to its creation value instead.
pub struct Snapshot<ValueT> {
    values: Vec<ValueT>,
    snapshots: Vec<Vec<ValueT>>,
    /// Slot and creation value of the cells made below the root, by slot.
    /// Only those can lie beyond a snapshot.
    born_below_root: Vec<(usize, ValueT)>,
}

impl<ValueT> Snapshot<ValueT>
where
    ValueT: Clone,
{
    fn ensure_world(&mut self, world: usize) {
        if world >= self.snapshots.len() {
            let capacity = (world + 1).max(self.snapshots.len() * 3 / 2);
            self.snapshots.resize_with(capacity, Vec::default);
        }
    }

    /// Number of cells covered by the snapshot of `world`.
    pub fn snapshot_len(&self, world: usize) -> usize {
        return self.snapshots.get(world).map_or(0, |snapshot| snapshot.len());
    }
}

impl<ValueT> Store for Snapshot<ValueT>
where
    ValueT: Clone,
{
    fn world_push(&mut self, world: usize) {
        self.ensure_world(world);
        let snapshot = &mut self.snapshots[world];
        snapshot.clear();
        snapshot.extend_from_slice(&self.values);
    }

    fn world_pop(&mut self, world: usize) {
        let snapshot = &self.snapshots[world];
        trace!(world, cells = snapshot.len(), "restore snapshot");
        self.values[..snapshot.len()].clone_from_slice(snapshot);
        let first_later = self
            .born_below_root
            .partition_point(|(slot, _)| *slot < snapshot.len());
        for (slot, value) in self.born_below_root[first_later..].iter() {
            self.values[*slot] = value.clone();
        }
        if world == 1 {
            // every later snapshot covers the cells made so far
            self.born_below_root.clear();
        }
    }

    fn world_commit(&mut self, world: usize) {
        // the parent's snapshot is the one the next pop restores
        self.snapshots[world].clear();
        if world == 1 {
            self.born_below_root.clear();
        }
    }
}

impl<ValueT> ScalarStore<ValueT> for Snapshot<ValueT>
where
    ValueT: Clone,
{
    fn new(settings: &Settings, world: usize) -> Self {
        let mut snapshots = Vec::default();
        snapshots.resize_with(settings.world_capacity.max(world + 1), Vec::default);
        Self {
            values: Vec::default(),
            snapshots,
            born_below_root: Vec::default(),
        }
    }

    fn len(&self) -> usize {
        return self.values.len();
    }

    fn create(&mut self, value: ValueT, world: usize) -> usize {
        let slot = self.values.len();
        if world > 0 {
            self.born_below_root.push((slot, value.clone()));
        }
        self.values.push(value);
        return slot;
    }

    #[inline(always)]
    fn get(&self, slot: usize) -> &ValueT {
        return &self.values[slot];
    }

    #[inline(always)]
    fn set(&mut self, slot: usize, value: ValueT, _world: usize) {
        self.values[slot] = value;
    }
}

/// Copied buffers of every vector of one type. Buffers created after a
/// snapshot are reset to their creation contents when it is restored.
pub struct VectorSnapshot<ValueT> {
    buffers: Vec<Vec<ValueT>>,
    snapshots: Vec<Vec<Vec<ValueT>>>,
    /// Slot, size and fill value of the buffers made below the root.
    born_below_root: Vec<(usize, usize, ValueT)>,
}

impl<ValueT> VectorSnapshot<ValueT>
where
    ValueT: Copy,
{
    fn ensure_world(&mut self, world: usize) {
        if world >= self.snapshots.len() {
            let capacity = (world + 1).max(self.snapshots.len() * 3 / 2);
            self.snapshots.resize_with(capacity, Vec::default);
        }
    }
}

impl<ValueT> Store for VectorSnapshot<ValueT>
where
    ValueT: Copy,
{
    fn world_push(&mut self, world: usize) {
        self.ensure_world(world);
        let snapshot = &mut self.snapshots[world];
        snapshot.resize_with(self.buffers.len(), Vec::default);
        for (saved, buffer) in snapshot.iter_mut().zip(self.buffers.iter()) {
            saved.clear();
            saved.extend_from_slice(buffer);
        }
    }

    fn world_pop(&mut self, world: usize) {
        let snapshot = &self.snapshots[world];
        trace!(world, vectors = snapshot.len(), "restore vector snapshot");
        for (buffer, saved) in self.buffers.iter_mut().zip(snapshot.iter()) {
            buffer.clear();
            buffer.extend_from_slice(saved);
        }
        let first_later = self
            .born_below_root
            .partition_point(|(slot, _, _)| *slot < snapshot.len());
        for &(slot, size, value) in self.born_below_root[first_later..].iter() {
            let buffer = &mut self.buffers[slot];
            buffer.clear();
            buffer.resize(size, value);
        }
        if world == 1 {
            self.born_below_root.clear();
        }
    }

    fn world_commit(&mut self, world: usize) {
        self.snapshots[world].clear();
        if world == 1 {
            self.born_below_root.clear();
        }
    }
}

impl<ValueT> VectorStore<ValueT> for VectorSnapshot<ValueT>
where
    ValueT: Copy,
{
    fn new(settings: &Settings, world: usize) -> Self {
        let mut snapshots = Vec::default();
        snapshots.resize_with(settings.world_capacity.max(world + 1), Vec::default);
        Self {
            buffers: Vec::default(),
            snapshots,
            born_below_root: Vec::default(),
        }
    }

    fn len(&self) -> usize {
        return self.buffers.len();
    }

    fn create(&mut self, size: usize, value: ValueT, world: usize) -> usize {
        let slot = self.buffers.len();
        if world > 0 {
            self.born_below_root.push((slot, size, value));
        }
        let mut buffer = Vec::default();
        ensure_capacity(&mut buffer, size);
        buffer.resize(size, value);
        self.buffers.push(buffer);
        return slot;
    }

    #[inline(always)]
    fn buffer_len(&self, slot: usize) -> usize {
        return self.buffers[slot].len();
    }

    #[inline(always)]
    fn get(&self, slot: usize, index: usize) -> ValueT {
        return self.buffers[slot][index];
    }

    #[inline(always)]
    fn set(&mut self, slot: usize, index: usize, value: ValueT, _world: usize) {
        self.buffers[slot][index] = value;
    }

    fn append(&mut self, slot: usize, value: ValueT, _world: usize) {
        let buffer = &mut self.buffers[slot];
        ensure_capacity(buffer, buffer.len() + 1);
        buffer.push(value);
    }
}

#[cfg(test)]
mod test {
    use super::{Snapshot, VectorSnapshot};
    use crate::{
        Settings,
        store::{ScalarStore, Store, VectorStore},
    };

    #[test]
    fn test_pop_restores_prefix_only() {
        let mut store = Snapshot::<i64>::new(&Settings::default(), 0);
        let a = store.create(1, 0);
        store.world_push(1);
        store.set(a, 2, 1);
        let b = store.create(5, 1);
        store.world_push(2);
        store.set(a, 3, 2);
        store.set(b, 6, 2);
        assert_eq!(store.snapshot_len(2), 2);

        store.world_pop(2);
        assert_eq!((*store.get(a), *store.get(b)), (2, 5));
        store.set(b, 7, 1);
        store.world_pop(1);
        // b did not exist when world 1 was entered
        assert_eq!((*store.get(a), *store.get(b)), (1, 5));
    }

    #[test]
    fn test_cells_made_below_root_reset_after_commit_and_pop() {
        let mut store = Snapshot::<i32>::new(&Settings::default(), 0);
        let a = store.create(0, 0);
        store.world_push(1);
        store.world_push(2);
        let b = store.create(10, 2);
        store.set(b, 11, 2);
        store.world_commit(2);
        // world 1 keeps what world 2 wrote
        assert_eq!(*store.get(b), 11);
        store.set(a, 1, 1);
        store.world_pop(1);
        assert_eq!((*store.get(a), *store.get(b)), (0, 10));

        // back at the root, the next snapshot covers b
        store.world_push(1);
        store.set(b, 12, 1);
        let c = store.create(20, 1);
        store.set(c, 21, 1);
        store.world_pop(1);
        assert_eq!((*store.get(b), *store.get(c)), (10, 20));
    }

    #[test]
    fn test_commit_restores_parent_snapshot() {
        let mut store = Snapshot::<bool>::new(&Settings::default(), 0);
        let a = store.create(false, 0);
        store.world_push(1);
        store.set(a, true, 1);
        store.world_push(2);
        store.world_commit(2);
        store.world_pop(1);
        assert!(!*store.get(a));
    }

    #[test]
    fn test_vector_buffers_are_restored_with_their_length() {
        let mut store = VectorSnapshot::<i32>::new(&Settings::default(), 0);
        let v = store.create(2, 0, 0);
        store.world_push(1);
        store.append(v, 9, 1);
        store.set(v, 0, 4, 1);
        assert_eq!(store.buffer_len(v), 3);
        store.world_pop(1);
        assert_eq!(store.buffer_len(v), 2);
        assert_eq!(store.get(v, 0), 0);
    }

    #[test]
    fn test_vector_made_below_root_gets_its_creation_contents_back() {
        let mut store = VectorSnapshot::<f64>::new(&Settings::default(), 0);
        store.world_push(1);
        let v = store.create(2, 0.5, 1);
        store.world_push(2);
        store.set(v, 1, 3.0, 2);
        store.append(v, 4.0, 2);
        store.world_pop(2);
        assert_eq!(store.buffer_len(v), 2);
        assert_eq!(store.get(v, 1), 0.5);
        store.set(v, 0, 7.0, 1);
        store.world_pop(1);
        assert_eq!((store.get(v, 0), store.get(v, 1)), (0.5, 0.5));
    }
}

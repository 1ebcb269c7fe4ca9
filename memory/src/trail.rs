//! Undo-log stores.
//!
//! A trail records, for the first write to a cell within a world, the value
//! and stamp the cell had before. Popping a world replays those records
//! backward. Writes at the root are never recorded since the root is never
//! popped.

mod chunked_log;
mod journal;
mod packed_log;

use tracing::debug;

use crate::{
    Settings,
    store::{ScalarStore, Store, VectorStore, ensure_capacity},
    value::Packable,
};

pub use chunked_log::ChunkedLog;
pub(crate) use journal::Journal;
pub use packed_log::PackedLog;

/// Stamp of a slot that has never been written in any world; the first
/// write to it is always recorded.
pub const NO_STAMP: usize = usize::MAX;

/// Saved state of one cell: its address in the store, its previous value and
/// the world in which that value was written.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Entry<AddressT, ValueT> {
    pub address: AddressT,
    pub value: ValueT,
    pub stamp: usize,
}

impl<AddressT, ValueT> Packable for Entry<AddressT, ValueT>
where
    AddressT: Packable,
    ValueT: Packable,
{
    const SIZE: usize = AddressT::SIZE + ValueT::SIZE + 4;

    #[inline(always)]
    fn pack(&self, bytes: &mut [u8]) {
        let (address, rest) = bytes.split_at_mut(AddressT::SIZE);
        let (value, stamp) = rest.split_at_mut(ValueT::SIZE);
        self.address.pack(address);
        self.value.pack(value);
        let stamp_bits = if self.stamp == NO_STAMP {
            u32::MAX
        } else {
            debug_assert!(self.stamp < u32::MAX as usize);
            self.stamp as u32
        };
        stamp_bits.pack(stamp);
    }

    #[inline(always)]
    fn unpack(bytes: &[u8]) -> Self {
        let (address, rest) = bytes.split_at(AddressT::SIZE);
        let (value, stamp) = rest.split_at(ValueT::SIZE);
        let stamp_bits = u32::unpack(stamp);
        return Self {
            address: AddressT::unpack(address),
            value: ValueT::unpack(value),
            stamp: if stamp_bits == u32::MAX {
                NO_STAMP
            } else {
                stamp_bits as usize
            },
        };
    }
}

/// Growable storage of trail entries, organised in fixed-capacity chunks.
pub trait Log<EntryT> {
    fn new(chunk_capacity: usize) -> Self;

    fn chunk_capacity(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write cursor as `(chunk, offset within the chunk)`.
    fn cursor(&self) -> (usize, usize);

    fn number_of_chunks(&self) -> usize;

    fn push(&mut self, entry: EntryT);

    fn pop(&mut self) -> Option<EntryT>;

    fn get(&self, position: usize) -> EntryT;
}

/// Trailed values of every scalar cell of one type.
pub struct Trail<ValueT, LogT> {
    values: Vec<ValueT>,
    stamps: Vec<usize>,
    journal: Journal<Entry<u32, ValueT>, LogT>,
}

impl<ValueT, LogT> Trail<ValueT, LogT>
where
    ValueT: Clone,
    LogT: Log<Entry<u32, ValueT>>,
{
    /// Number of entries currently recorded.
    pub fn logged(&self) -> usize {
        return self.journal.len();
    }

    pub fn number_of_chunks(&self) -> usize {
        return self.journal.number_of_chunks();
    }

    pub fn world_capacity(&self) -> usize {
        return self.journal.world_capacity();
    }

    pub fn stamp(&self, slot: usize) -> usize {
        return self.stamps[slot];
    }

    pub fn resize_world_capacity(&mut self, world_capacity: usize) {
        self.journal.resize_world_capacity(world_capacity);
    }

    pub fn save_previous_state(&mut self, slot: usize, old_value: ValueT, old_stamp: usize) {
        self.journal.save_previous_state(Entry {
            address: slot as u32,
            value: old_value,
            stamp: old_stamp,
        });
    }

    /// Gives the cell in `slot`, created in world `older_stamp`, one entry
    /// holding `initial_value` in every world below, so that popping any of
    /// them resets the cell as if it had existed since the root.
    pub fn build_fake_history(&mut self, slot: usize, initial_value: ValueT, older_stamp: usize) {
        debug!(
            slot,
            world = older_stamp,
            entries = self.journal.len(),
            "rebuild trail with fake history"
        );
        self.journal.rebuild(older_stamp, |world| Entry {
            address: slot as u32,
            value: initial_value.clone(),
            stamp: world - 1,
        });
    }
}

impl<ValueT, LogT> Store for Trail<ValueT, LogT>
where
    ValueT: Clone,
    LogT: Log<Entry<u32, ValueT>>,
{
    fn world_push(&mut self, world: usize) {
        self.journal.world_push(world);
    }

    fn world_pop(&mut self, world: usize) {
        let values = &mut self.values;
        let stamps = &mut self.stamps;
        self.journal.undo_to(world, |entry| {
            values[entry.address as usize] = entry.value;
            stamps[entry.address as usize] = entry.stamp;
        });
    }

    fn world_commit(&mut self, world: usize) {
        debug_assert!(world > 0);
        let stamps = &mut self.stamps;
        self.journal.commit(world, |entry| {
            let slot = entry.address as usize;
            debug_assert!(stamps[slot] == world);
            stamps[slot] = world - 1;
            // the parent already holds an older record of this slot
            return world > 1 && entry.stamp != world - 1;
        });
    }
}

impl<ValueT, LogT> ScalarStore<ValueT> for Trail<ValueT, LogT>
where
    ValueT: Clone,
    LogT: Log<Entry<u32, ValueT>>,
{
    fn new(settings: &Settings, world: usize) -> Self {
        Self {
            values: Vec::default(),
            stamps: Vec::default(),
            journal: Journal::new(settings, world),
        }
    }

    fn len(&self) -> usize {
        return self.values.len();
    }

    fn create(&mut self, value: ValueT, world: usize) -> usize {
        let slot = self.values.len();
        self.values.push(value.clone());
        if world == 0 {
            self.stamps.push(0);
        } else {
            self.stamps.push(world - 1);
            self.build_fake_history(slot, value, world);
        }
        return slot;
    }

    #[inline(always)]
    fn get(&self, slot: usize) -> &ValueT {
        return &self.values[slot];
    }

    #[inline(always)]
    fn set(&mut self, slot: usize, value: ValueT, world: usize) {
        let stamp = self.stamps[slot];
        if world > 0 && stamp != world {
            let old_value = std::mem::replace(&mut self.values[slot], value);
            self.save_previous_state(slot, old_value, stamp);
        } else {
            self.values[slot] = value;
        }
        self.stamps[slot] = world;
    }
}

/// Trailed elements of every vector of one type. Elements carry their own
/// stamps; elements appended or created after the root start unstamped so
/// that their first write is recorded.
pub struct VectorTrail<ValueT, LogT> {
    buffers: Vec<Vec<ValueT>>,
    stamps: Vec<Vec<usize>>,
    journal: Journal<Entry<(u32, u32), ValueT>, LogT>,
}

impl<ValueT, LogT> VectorTrail<ValueT, LogT>
where
    ValueT: Copy,
    LogT: Log<Entry<(u32, u32), ValueT>>,
{
    pub fn logged(&self) -> usize {
        return self.journal.len();
    }

    pub fn number_of_chunks(&self) -> usize {
        return self.journal.number_of_chunks();
    }

    #[inline(always)]
    fn initial_stamp(world: usize) -> usize {
        if world == 0 { 0 } else { NO_STAMP }
    }
}

impl<ValueT, LogT> Store for VectorTrail<ValueT, LogT>
where
    ValueT: Copy,
    LogT: Log<Entry<(u32, u32), ValueT>>,
{
    fn world_push(&mut self, world: usize) {
        self.journal.world_push(world);
    }

    fn world_pop(&mut self, world: usize) {
        let buffers = &mut self.buffers;
        let stamps = &mut self.stamps;
        self.journal.undo_to(world, |entry| {
            let (slot, index) = (entry.address.0 as usize, entry.address.1 as usize);
            buffers[slot][index] = entry.value;
            stamps[slot][index] = entry.stamp;
        });
    }

    fn world_commit(&mut self, world: usize) {
        debug_assert!(world > 0);
        let stamps = &mut self.stamps;
        self.journal.commit(world, |entry| {
            let (slot, index) = (entry.address.0 as usize, entry.address.1 as usize);
            debug_assert!(stamps[slot][index] == world);
            stamps[slot][index] = world - 1;
            return world > 1 && entry.stamp != world - 1;
        });
    }
}

impl<ValueT, LogT> VectorStore<ValueT> for VectorTrail<ValueT, LogT>
where
    ValueT: Copy,
    LogT: Log<Entry<(u32, u32), ValueT>>,
{
    fn new(settings: &Settings, world: usize) -> Self {
        Self {
            buffers: Vec::default(),
            stamps: Vec::default(),
            journal: Journal::new(settings, world),
        }
    }

    fn len(&self) -> usize {
        return self.buffers.len();
    }

    fn create(&mut self, size: usize, value: ValueT, world: usize) -> usize {
        let slot = self.buffers.len();
        let mut buffer = Vec::default();
        ensure_capacity(&mut buffer, size);
        buffer.resize(size, value);
        let mut stamps = Vec::default();
        ensure_capacity(&mut stamps, size);
        stamps.resize(size, Self::initial_stamp(world));
        self.buffers.push(buffer);
        self.stamps.push(stamps);
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

    fn set(&mut self, slot: usize, index: usize, value: ValueT, world: usize) {
        let stamp = self.stamps[slot][index];
        if world > 0 && stamp != world {
            let old_value = self.buffers[slot][index];
            self.journal.save_previous_state(Entry {
                address: (slot as u32, index as u32),
                value: old_value,
                stamp,
            });
        }
        self.buffers[slot][index] = value;
        self.stamps[slot][index] = world;
    }

    fn append(&mut self, slot: usize, value: ValueT, world: usize) {
        let buffer = &mut self.buffers[slot];
        ensure_capacity(buffer, buffer.len() + 1);
        buffer.push(value);
        let stamps = &mut self.stamps[slot];
        ensure_capacity(stamps, stamps.len() + 1);
        stamps.push(Self::initial_stamp(world));
    }
}

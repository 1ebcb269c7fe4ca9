use std::marker::PhantomData;

use super::Log;
use crate::Settings;

/// A log plus the per-world checkpoints that delimit its segments: the
/// entries of world `w` lie between checkpoint `w` and checkpoint `w + 1`
/// (or the top of the log for the current world).
pub(crate) struct Journal<EntryT, LogT> {
    log: LogT,
    chunk_at: Vec<usize>,
    top_at: Vec<usize>,
    _entry: PhantomData<EntryT>,
}

impl<EntryT, LogT> Journal<EntryT, LogT>
where
    LogT: Log<EntryT>,
{
    pub fn new(settings: &Settings, world: usize) -> Self {
        // a store created mid-search has empty segments for every world so far
        let world_capacity = settings.world_capacity.max(world + 1);
        Self {
            log: LogT::new(settings.chunk_capacity),
            chunk_at: vec![0; world_capacity],
            top_at: vec![0; world_capacity],
            _entry: PhantomData,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.log.len();
    }

    pub fn number_of_chunks(&self) -> usize {
        return self.log.number_of_chunks();
    }

    pub fn world_capacity(&self) -> usize {
        return self.chunk_at.len();
    }

    pub fn resize_world_capacity(&mut self, world_capacity: usize) {
        if world_capacity > self.chunk_at.len() {
            self.chunk_at.resize(world_capacity, 0);
            self.top_at.resize(world_capacity, 0);
        }
    }

    #[inline(always)]
    fn checkpoint(&self, world: usize) -> usize {
        return self.chunk_at[world] * self.log.chunk_capacity() + self.top_at[world];
    }

    pub fn world_push(&mut self, world: usize) {
        if world >= self.chunk_at.len() {
            self.resize_world_capacity((world + 1).max(self.chunk_at.len() * 3 / 2));
        }
        let (chunk, top) = self.log.cursor();
        self.chunk_at[world] = chunk;
        self.top_at[world] = top;
    }

    #[inline(always)]
    pub fn save_previous_state(&mut self, entry: EntryT) {
        self.log.push(entry);
    }

    /// Pops every entry recorded since `world` was entered, newest first.
    pub fn undo_to(&mut self, world: usize, mut restore: impl FnMut(EntryT)) {
        let checkpoint = self.checkpoint(world);
        debug_assert!(checkpoint <= self.log.len());
        while self.log.len() > checkpoint {
            match self.log.pop() {
                Some(entry) => restore(entry),
                None => break,
            }
        }
    }

    /// Folds the segment of `world` into the one of `world - 1`. `merge` sees
    /// every entry of the segment, oldest first, and tells whether to keep it.
    pub fn commit(&mut self, world: usize, mut merge: impl FnMut(&EntryT) -> bool) {
        let checkpoint = self.checkpoint(world);
        let mut segment = Vec::with_capacity(self.log.len() - checkpoint);
        while self.log.len() > checkpoint {
            match self.log.pop() {
                Some(entry) => segment.push(entry),
                None => break,
            }
        }
        for entry in segment.into_iter().rev() {
            if merge(&entry) {
                self.log.push(entry);
            }
        }
    }

    /// Rewrites the log for worlds `1..=current_world`, appending the entry
    /// made by `synthesize(w)` to the segment of every world `w` below the
    /// current one. The previous storage is dropped once the copy is done.
    pub fn rebuild(&mut self, current_world: usize, mut synthesize: impl FnMut(usize) -> EntryT) {
        let previous_len = self.log.len();
        let mut log = LogT::new(self.log.chunk_capacity());
        for world in 1..=current_world {
            let start = self.checkpoint(world);
            let end = if world < current_world {
                self.checkpoint(world + 1)
            } else {
                previous_len
            };
            let (chunk, top) = log.cursor();
            self.chunk_at[world] = chunk;
            self.top_at[world] = top;
            for position in start..end {
                log.push(self.log.get(position));
            }
            if world < current_world {
                log.push(synthesize(world));
            }
        }
        debug_assert!(log.len() == previous_len + current_world.saturating_sub(1));
        self.log = log;
    }
}

use std::marker::PhantomData;

use super::Log;
use crate::value::Packable;

/// Entries encoded into raw byte chunks, addressed by byte offset.
///
/// Each entry takes exactly `EntryT::SIZE` bytes, with no padding and no
/// per-entry allocation. The chunks are owned by the log and released when it
/// is dropped, which is also how a rebuilt trail retires its old storage.
pub struct PackedLog<EntryT> {
    chunk_capacity: usize,
    chunks: Vec<Box<[u8]>>,
    current_chunk: usize,
    top: usize,
    _entry: PhantomData<EntryT>,
}

impl<EntryT> PackedLog<EntryT>
where
    EntryT: Packable,
{
    fn allocate(chunk_capacity: usize) -> Box<[u8]> {
        vec![0u8; chunk_capacity * EntryT::SIZE].into_boxed_slice()
    }

    /// Bytes held by the chunks, used or not.
    pub fn reserved_bytes(&self) -> usize {
        return self.chunks.iter().map(|chunk| chunk.len()).sum();
    }

    #[inline(always)]
    fn bytes(&self, chunk: usize, offset: usize) -> &[u8] {
        let start = offset * EntryT::SIZE;
        return &self.chunks[chunk][start..start + EntryT::SIZE];
    }
}

impl<EntryT> Log<EntryT> for PackedLog<EntryT>
where
    EntryT: Packable,
{
    fn new(chunk_capacity: usize) -> Self {
        assert!(chunk_capacity > 0);
        Self {
            chunk_capacity,
            chunks: vec![Self::allocate(chunk_capacity)],
            current_chunk: 0,
            top: 0,
            _entry: PhantomData,
        }
    }

    #[inline(always)]
    fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    #[inline(always)]
    fn len(&self) -> usize {
        return self.current_chunk * self.chunk_capacity + self.top;
    }

    #[inline(always)]
    fn cursor(&self) -> (usize, usize) {
        return (self.current_chunk, self.top);
    }

    fn number_of_chunks(&self) -> usize {
        return self.chunks.len();
    }

    fn push(&mut self, entry: EntryT) {
        if self.top == self.chunk_capacity {
            self.current_chunk += 1;
            self.top = 0;
            if self.current_chunk == self.chunks.len() {
                self.chunks.push(Self::allocate(self.chunk_capacity));
            }
        }
        let start = self.top * EntryT::SIZE;
        entry.pack(&mut self.chunks[self.current_chunk][start..start + EntryT::SIZE]);
        self.top += 1;
    }

    fn pop(&mut self) -> Option<EntryT> {
        if self.top == 0 {
            if self.current_chunk == 0 {
                return None;
            }
            self.current_chunk -= 1;
            self.top = self.chunk_capacity;
        }
        self.top -= 1;
        return Some(EntryT::unpack(self.bytes(self.current_chunk, self.top)));
    }

    #[inline(always)]
    fn get(&self, position: usize) -> EntryT {
        debug_assert!(position < self.len());
        return EntryT::unpack(self.bytes(
            position / self.chunk_capacity,
            position % self.chunk_capacity,
        ));
    }
}

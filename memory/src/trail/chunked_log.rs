use super::Log;

/// Entries kept in a list of fixed-capacity vectors. Growth appends a chunk
/// instead of reallocating everything logged so far; chunks emptied by a
/// pop are kept for reuse.
pub struct ChunkedLog<EntryT> {
    chunk_capacity: usize,
    chunks: Vec<Vec<EntryT>>,
    current_chunk: usize,
}

impl<EntryT> Log<EntryT> for ChunkedLog<EntryT>
where
    EntryT: Clone,
{
    fn new(chunk_capacity: usize) -> Self {
        assert!(chunk_capacity > 0);
        Self {
            chunk_capacity,
            chunks: vec![Vec::with_capacity(chunk_capacity)],
            current_chunk: 0,
        }
    }

    #[inline(always)]
    fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    #[inline(always)]
    fn len(&self) -> usize {
        return self.current_chunk * self.chunk_capacity + self.chunks[self.current_chunk].len();
    }

    #[inline(always)]
    fn cursor(&self) -> (usize, usize) {
        return (self.current_chunk, self.chunks[self.current_chunk].len());
    }

    fn number_of_chunks(&self) -> usize {
        return self.chunks.len();
    }

    fn push(&mut self, entry: EntryT) {
        if self.chunks[self.current_chunk].len() == self.chunk_capacity {
            self.current_chunk += 1;
            if self.current_chunk == self.chunks.len() {
                self.chunks.push(Vec::with_capacity(self.chunk_capacity));
            }
        }
        debug_assert!(self.chunks[self.current_chunk].len() < self.chunk_capacity);
        self.chunks[self.current_chunk].push(entry);
    }

    fn pop(&mut self) -> Option<EntryT> {
        if self.chunks[self.current_chunk].is_empty() {
            if self.current_chunk == 0 {
                return None;
            }
            self.current_chunk -= 1;
            debug_assert!(self.chunks[self.current_chunk].len() == self.chunk_capacity);
        }
        return self.chunks[self.current_chunk].pop();
    }

    #[inline(always)]
    fn get(&self, position: usize) -> EntryT {
        debug_assert!(position < self.len());
        return self.chunks[position / self.chunk_capacity][position % self.chunk_capacity].clone();
    }
}

/// Sizing of the stores of an [`Environment`](crate::Environment).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Number of entries per trail chunk.
    pub chunk_capacity: usize,
    /// Number of worlds anticipated up front; checkpoint arrays grow past it.
    pub world_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_capacity: 20_000,
            world_capacity: 64,
        }
    }
}

impl Settings {
    pub fn with_chunk_capacity(mut self, chunk_capacity: usize) -> Self {
        assert!(chunk_capacity > 0);
        self.chunk_capacity = chunk_capacity;
        return self;
    }

    pub fn with_world_capacity(mut self, world_capacity: usize) -> Self {
        self.world_capacity = world_capacity;
        return self;
    }
}

mod circular_queue;
mod map;

pub use circular_queue::CircularQueue;
pub use map::Map;

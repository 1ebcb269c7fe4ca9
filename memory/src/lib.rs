//! Reversible state for depth-first search.
//!
//! An [`Environment`] owns every reversible cell of a search. Cells are
//! plain handles; their values live in one store per value type, either a
//! trail (undo log) or a snapshot store (whole-array copies), selected at
//! compile time by the environment's [`Strategy`].

mod bit_set;
mod cell;
mod environment;
mod error;
mod settings;
mod snapshot;
mod vector;

pub mod store;
pub mod trail;
pub mod value;

pub use bit_set::BitSet;
pub use cell::{BoolCell, Cell, DoubleCell, IntCell, LongCell, ObjectCell};
pub use environment::{Copying, Environment, PackedTrailing, Strategy, Trailing};
pub use error::MemoryError;
pub use settings::Settings;
pub use snapshot::{Snapshot, VectorSnapshot};
pub use store::{ScalarStore, Store, StoreKind, VectorStore};
pub use value::{Object, StateValue, VectorValue};
pub use vector::{DoubleVector, IntVector, Vector};

use std::any::Any;

use tracing::trace;

use crate::{
    BitSet, Cell, MemoryError, ObjectCell, Settings, Snapshot, Vector, VectorSnapshot,
    store::{ScalarStore, Store, StoreKind, VectorStore},
    trail::{ChunkedLog, Entry, Trail, VectorTrail},
    value::{Object, StateValue, VectorValue},
};

/// Persistence strategy of an [`Environment`]: which store backs each value
/// type.
pub trait Strategy: Sized + 'static {
    type Scalar<ValueT: StateValue>: ScalarStore<ValueT>;
    type Vector<ValueT: VectorValue>: VectorStore<ValueT>;
}

/// Undo log kept in chunks of entries.
pub struct Trailing;

/// Undo log packed into raw byte chunks.
pub struct PackedTrailing;

/// Whole-array snapshots taken at every push.
pub struct Copying;

impl Strategy for Trailing {
    type Scalar<ValueT: StateValue> = Trail<ValueT, ChunkedLog<Entry<u32, ValueT>>>;
    type Vector<ValueT: VectorValue> = VectorTrail<ValueT, ChunkedLog<Entry<(u32, u32), ValueT>>>;
}

impl Strategy for PackedTrailing {
    type Scalar<ValueT: StateValue> = Trail<ValueT, ValueT::CompactLog>;
    type Vector<ValueT: VectorValue> = VectorTrail<ValueT, ValueT::CompactVectorLog>;
}

impl Strategy for Copying {
    type Scalar<ValueT: StateValue> = Snapshot<ValueT>;
    type Vector<ValueT: VectorValue> = VectorSnapshot<ValueT>;
}

/// Owner of every reversible cell of a search, and of the world counter.
///
/// Stores are created on the first cell of their type. `world_push` and
/// `world_commit` visit them in creation order, `world_pop` in reverse.
pub struct Environment<StrategyT: Strategy = Trailing> {
    settings: Settings,
    world: usize,
    order: Vec<StoreKind>,
    pub(crate) ints: Option<StrategyT::Scalar<i32>>,
    pub(crate) longs: Option<StrategyT::Scalar<i64>>,
    pub(crate) bools: Option<StrategyT::Scalar<bool>>,
    pub(crate) doubles: Option<StrategyT::Scalar<f64>>,
    pub(crate) objects: Option<StrategyT::Scalar<Object>>,
    pub(crate) int_vectors: Option<StrategyT::Vector<i32>>,
    pub(crate) double_vectors: Option<StrategyT::Vector<f64>>,
}

impl<StrategyT: Strategy> Default for Environment<StrategyT> {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}

impl<StrategyT: Strategy> Environment<StrategyT> {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            world: 0,
            order: Vec::default(),
            ints: None,
            longs: None,
            bools: None,
            doubles: None,
            objects: None,
            int_vectors: None,
            double_vectors: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        return &self.settings;
    }

    #[inline(always)]
    pub fn world_index(&self) -> usize {
        return self.world;
    }

    /// Store kinds in the order their stores were created.
    pub fn store_order(&self) -> &[StoreKind] {
        return &self.order;
    }

    fn store_mut(&mut self, kind: StoreKind) -> Option<&mut dyn Store> {
        return match kind {
            StoreKind::Int => self.ints.as_mut().map(|store| store as &mut dyn Store),
            StoreKind::Long => self.longs.as_mut().map(|store| store as &mut dyn Store),
            StoreKind::Bool => self.bools.as_mut().map(|store| store as &mut dyn Store),
            StoreKind::Double => self.doubles.as_mut().map(|store| store as &mut dyn Store),
            StoreKind::Object => self.objects.as_mut().map(|store| store as &mut dyn Store),
            StoreKind::IntVector => self.int_vectors.as_mut().map(|store| store as &mut dyn Store),
            StoreKind::DoubleVector => self
                .double_vectors
                .as_mut()
                .map(|store| store as &mut dyn Store),
        };
    }

    pub fn world_push(&mut self) {
        let world = self.world + 1;
        for index in 0..self.order.len() {
            let kind = self.order[index];
            if let Some(store) = self.store_mut(kind) {
                store.world_push(world);
            }
        }
        self.world = world;
        trace!(world, "world push");
    }

    pub fn world_pop(&mut self) -> Result<(), MemoryError> {
        if self.world == 0 {
            return Err(MemoryError::PopBelowRoot);
        }
        let world = self.world;
        for index in (0..self.order.len()).rev() {
            let kind = self.order[index];
            if let Some(store) = self.store_mut(kind) {
                store.world_pop(world);
            }
        }
        self.world -= 1;
        trace!(world = self.world, "world pop");
        return Ok(());
    }

    /// Pops worlds until `world` is the current one.
    pub fn world_pop_until(&mut self, world: usize) -> Result<(), MemoryError> {
        if world > self.world {
            return Err(MemoryError::InvalidTargetWorld {
                target: world,
                current: self.world,
            });
        }
        while self.world > world {
            self.world_pop()?;
        }
        return Ok(());
    }

    /// Merges the current world into its parent. Every value is kept; a later
    /// pop restores the state in which the parent was entered.
    pub fn world_commit(&mut self) -> Result<(), MemoryError> {
        if self.world == 0 {
            return Err(MemoryError::CommitAtRoot);
        }
        let world = self.world;
        for index in 0..self.order.len() {
            let kind = self.order[index];
            if let Some(store) = self.store_mut(kind) {
                store.world_commit(world);
            }
        }
        self.world -= 1;
        trace!(world = self.world, "world commit");
        return Ok(());
    }

    /// Store of the cells of type `ValueT`, if any was made.
    pub fn store<ValueT: StateValue>(&self) -> Option<&StrategyT::Scalar<ValueT>> {
        return ValueT::store(self).as_ref();
    }

    pub fn vector_store<ValueT: VectorValue>(&self) -> Option<&StrategyT::Vector<ValueT>> {
        return ValueT::vector_store(self).as_ref();
    }

    pub fn number_of_cells<ValueT: StateValue>(&self) -> usize {
        return self.store::<ValueT>().map_or(0, |store| store.len());
    }

    fn scalar_store_or_create<ValueT: StateValue>(&mut self) -> &mut StrategyT::Scalar<ValueT> {
        if ValueT::store(self).is_none() {
            trace!(kind = ?ValueT::KIND, world = self.world, "create store");
            self.order.push(ValueT::KIND);
        }
        let (settings, world) = (self.settings, self.world);
        return ValueT::store_mut(self).get_or_insert_with(|| {
            <StrategyT::Scalar<ValueT> as ScalarStore<ValueT>>::new(&settings, world)
        });
    }

    fn vector_store_or_create<ValueT: VectorValue>(&mut self) -> &mut StrategyT::Vector<ValueT> {
        if ValueT::vector_store(self).is_none() {
            trace!(kind = ?ValueT::VECTOR_KIND, world = self.world, "create store");
            self.order.push(ValueT::VECTOR_KIND);
        }
        let (settings, world) = (self.settings, self.world);
        return ValueT::vector_store_mut(self)
            .get_or_insert_with(|| <StrategyT::Vector<ValueT> as VectorStore<ValueT>>::new(&settings, world));
    }

    #[inline(always)]
    pub(crate) fn scalar_store<ValueT: StateValue>(&self) -> &StrategyT::Scalar<ValueT> {
        match ValueT::store(self) {
            Some(store) => store,
            None => panic!("{:?} cell used with an environment that never made one", ValueT::KIND),
        }
    }

    #[inline(always)]
    pub(crate) fn scalar_store_mut<ValueT: StateValue>(&mut self) -> &mut StrategyT::Scalar<ValueT> {
        match ValueT::store_mut(self) {
            Some(store) => store,
            None => panic!("{:?} cell used with an environment that never made one", ValueT::KIND),
        }
    }

    #[inline(always)]
    pub(crate) fn vectors<ValueT: VectorValue>(&self) -> &StrategyT::Vector<ValueT> {
        match ValueT::vector_store(self) {
            Some(store) => store,
            None => panic!("{:?} used with an environment that never made one", ValueT::VECTOR_KIND),
        }
    }

    #[inline(always)]
    pub(crate) fn vectors_mut<ValueT: VectorValue>(&mut self) -> &mut StrategyT::Vector<ValueT> {
        match ValueT::vector_store_mut(self) {
            Some(store) => store,
            None => panic!("{:?} used with an environment that never made one", ValueT::VECTOR_KIND),
        }
    }

    /// Makes a cell holding `value`. A cell made below the root reads
    /// `value` again after any pop, as if it had been made at the root.
    pub fn make<ValueT: StateValue>(&mut self, value: ValueT) -> Cell<ValueT> {
        let world = self.world;
        let slot = self.scalar_store_or_create::<ValueT>().create(value, world);
        return Cell::from_slot(slot);
    }

    pub fn make_int(&mut self, value: i32) -> Cell<i32> {
        return self.make(value);
    }

    pub fn make_long(&mut self, value: i64) -> Cell<i64> {
        return self.make(value);
    }

    pub fn make_bool(&mut self, value: bool) -> Cell<bool> {
        return self.make(value);
    }

    pub fn make_float(&mut self, value: f64) -> Cell<f64> {
        return self.make(value);
    }

    pub fn make_object<ValueT: Any + Send + Sync>(&mut self, value: ValueT) -> ObjectCell<ValueT> {
        return ObjectCell::from_cell(self.make(Object::new(value)));
    }

    /// Makes a vector of `size` copies of `value`.
    pub fn make_vector<ValueT: VectorValue>(&mut self, size: usize, value: ValueT) -> Vector<ValueT> {
        let world = self.world;
        let slot = self
            .vector_store_or_create::<ValueT>()
            .create(size, value, world);
        let size = self.make_int(size as i32);
        return Vector::from_parts(slot, size);
    }

    pub fn make_int_vector(&mut self, size: usize, value: i32) -> Vector<i32> {
        return self.make_vector(size, value);
    }

    pub fn make_double_vector(&mut self, size: usize, value: f64) -> Vector<f64> {
        return self.make_vector(size, value);
    }

    /// Makes an empty bit set with room for `number_of_bits` bits.
    pub fn make_bit_set(&mut self, number_of_bits: usize) -> BitSet {
        return BitSet::new(self, number_of_bits);
    }

    /// Makes a bit set holding `0..number_of_bits`.
    pub fn make_full_bit_set(&mut self, number_of_bits: usize) -> BitSet {
        return BitSet::new_full(self, number_of_bits);
    }
}

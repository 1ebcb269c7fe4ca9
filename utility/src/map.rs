/// Map keyed by small indices, iterated in insertion order.
///
/// Removing an entry moves the last entry into its place, so the order is
/// only stable as long as nothing is removed; `drain` keeps it intact.
pub struct Map<ValueT> {
    index_to_position: Vec<usize>,
    item_array: Vec<(usize, ValueT)>,
}

impl<ValueT> Default for Map<ValueT> {
    fn default() -> Self {
        Self {
            index_to_position: Vec::default(),
            item_array: Vec::default(),
        }
    }
}

impl<ValueT> Clone for Map<ValueT>
where
    ValueT: Clone,
{
    fn clone(&self) -> Self {
        Self {
            index_to_position: self.index_to_position.clone(),
            item_array: self.item_array.clone(),
        }
    }
}

impl<ValueT> Map<ValueT> {
    const NULL_POSITION: usize = usize::MAX;

    pub fn with_key_capacity(key_capacity: usize) -> Self {
        Self {
            index_to_position: vec![Self::NULL_POSITION; key_capacity],
            item_array: Vec::with_capacity(key_capacity),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.item_array.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.item_array.is_empty()
    }

    #[inline(always)]
    fn position(&self, index: usize) -> usize {
        if index >= self.index_to_position.len() {
            return Self::NULL_POSITION;
        } else {
            return self.index_to_position[index];
        }
    }

    #[inline(always)]
    pub fn contains_key(&self, index: usize) -> bool {
        self.position(index) != Self::NULL_POSITION
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&ValueT> {
        let position = self.position(index);
        if position == Self::NULL_POSITION {
            return None;
        } else {
            return Some(&self.item_array[position].1);
        }
    }

    pub fn insert(&mut self, index: usize, value: ValueT) -> Option<ValueT> {
        self.reserve_key(index);
        let position = self.index_to_position[index];
        if position == Self::NULL_POSITION {
            self.index_to_position[index] = self.item_array.len();
            self.item_array.push((index, value));
            return None;
        } else {
            debug_assert!(self.item_array[position].0 == index);
            return Some(std::mem::replace(&mut self.item_array[position].1, value));
        }
    }

    /// Inserts `value`, or combines it into the present one with `merge`.
    /// Returns `true` when the key was absent.
    pub fn merge(
        &mut self,
        index: usize,
        value: ValueT,
        merge: impl FnOnce(&mut ValueT, ValueT),
    ) -> bool {
        self.reserve_key(index);
        let position = self.index_to_position[index];
        if position == Self::NULL_POSITION {
            self.index_to_position[index] = self.item_array.len();
            self.item_array.push((index, value));
            return true;
        } else {
            debug_assert!(self.item_array[position].0 == index);
            merge(&mut self.item_array[position].1, value);
            return false;
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<ValueT> {
        let position = self.position(index);
        if position == Self::NULL_POSITION {
            return None;
        }
        debug_assert!(self.item_array[position].0 == index);
        let value = self.item_array.swap_remove(position).1;
        self.index_to_position[index] = Self::NULL_POSITION;
        if position != self.item_array.len() {
            debug_assert!(
                self.index_to_position[self.item_array[position].0] == self.item_array.len()
            );
            self.index_to_position[self.item_array[position].0] = position;
        }
        return Some(value);
    }

    /// Removes every entry, yielding them in insertion order.
    pub fn drain(&mut self) -> impl Iterator<Item = (usize, ValueT)> + '_ {
        for (index, _) in self.item_array.iter() {
            self.index_to_position[*index] = Self::NULL_POSITION;
        }
        self.item_array.drain(..)
    }

    pub fn clear(&mut self) {
        while let Some((index, _)) = self.item_array.pop() {
            debug_assert!(self.index_to_position[index] == self.item_array.len());
            self.index_to_position[index] = Self::NULL_POSITION;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &ValueT)> + Clone {
        self.item_array.iter().map(|(index, value)| (index, value))
    }

    fn reserve_key(&mut self, index: usize) {
        if index >= self.index_to_position.len() {
            self.index_to_position
                .resize(index + 1, Self::NULL_POSITION);
        }
    }
}

impl<ValueT> std::fmt::Debug for Map<ValueT>
where
    ValueT: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

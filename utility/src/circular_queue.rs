/// FIFO ring buffer that doubles its capacity when full.
pub struct CircularQueue<ValueT> {
    elements: Vec<Option<ValueT>>,
    head: usize,
    len: usize,
}

impl<ValueT> Default for CircularQueue<ValueT> {
    fn default() -> Self {
        Self::with_capacity(16)
    }
}

impl<ValueT> Clone for CircularQueue<ValueT>
where
    ValueT: Clone,
{
    fn clone(&self) -> Self {
        Self {
            elements: self.elements.clone(),
            head: self.head,
            len: self.len,
        }
    }
}

impl<ValueT> CircularQueue<ValueT> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut elements = Vec::with_capacity(capacity);
        elements.resize_with(capacity, || None);
        Self {
            elements,
            head: 0,
            len: 0,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.elements.len()
    }

    #[inline(always)]
    fn slot(&self, offset: usize) -> usize {
        return (self.head + offset) % self.elements.len();
    }

    pub fn push_back(&mut self, value: ValueT) {
        if self.len == self.elements.len() {
            self.grow();
        }
        let slot = self.slot(self.len);
        debug_assert!(self.elements[slot].is_none());
        self.elements[slot] = Some(value);
        self.len += 1;
    }

    pub fn pop_front(&mut self) -> Option<ValueT> {
        if self.len == 0 {
            return None;
        }
        let value = self.elements[self.head].take();
        debug_assert!(value.is_some());
        self.head = self.slot(1);
        self.len -= 1;
        return value;
    }

    pub fn pop_back(&mut self) -> Option<ValueT> {
        if self.len == 0 {
            return None;
        }
        let slot = self.slot(self.len - 1);
        self.len -= 1;
        return self.elements[slot].take();
    }

    pub fn front(&self) -> Option<&ValueT> {
        if self.len == 0 {
            return None;
        } else {
            return self.elements[self.head].as_ref();
        }
    }

    pub fn clear(&mut self) {
        while self.pop_back().is_some() {}
        self.head = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValueT> + Clone + '_ {
        (0..self.len).filter_map(move |offset| self.elements[self.slot(offset)].as_ref())
    }

    fn grow(&mut self) {
        let old_capacity = self.elements.len();
        let mut elements = Vec::with_capacity(old_capacity * 2);
        for offset in 0..self.len {
            let slot = self.slot(offset);
            elements.push(self.elements[slot].take());
        }
        elements.resize_with(old_capacity * 2, || None);
        self.elements = elements;
        self.head = 0;
    }
}

impl<ValueT> std::fmt::Debug for CircularQueue<ValueT>
where
    ValueT: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

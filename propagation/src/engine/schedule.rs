use utility::{CircularQueue, Map};

use crate::{EventMask, Priority};

/// Propagators waiting to run, one FIFO queue per priority class, and the
/// fine events pending for each of them.
pub struct Schedule {
    queues: Vec<CircularQueue<usize>>,
    /// Bit `p` is set when the queue of priority `p` is not empty.
    not_empty: u8,
    scheduled: Vec<bool>,
    /// Per propagator, variable index to accumulated mask, in arrival order.
    pending: Vec<Map<EventMask>>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            queues: (0..Priority::COUNT).map(|_| CircularQueue::with_capacity(16)).collect(),
            not_empty: 0,
            scheduled: Vec::default(),
            pending: Vec::default(),
        }
    }
}

impl Schedule {
    pub fn add_propagator(&mut self, number_of_variables: usize) {
        self.scheduled.push(false);
        self.pending.push(Map::with_key_capacity(number_of_variables));
    }

    pub fn is_empty(&self) -> bool {
        return self.not_empty == 0;
    }

    #[inline(always)]
    pub fn is_scheduled(&self, propagator: usize) -> bool {
        return self.scheduled[propagator];
    }

    /// Queues `propagator` unless it already waits. With a variable index,
    /// `mask` is also ORed into the events pending on that variable.
    pub fn schedule(
        &mut self,
        propagator: usize,
        priority: Priority,
        variable_index: Option<usize>,
        mask: EventMask,
    ) {
        if let Some(variable_index) = variable_index {
            self.pending[propagator].merge(variable_index, mask, |pending, mask| *pending |= mask);
        }
        if !self.scheduled[propagator] {
            self.queues[priority.index()].push_back(propagator);
            self.scheduled[propagator] = true;
            self.not_empty |= 1 << priority.index();
        }
    }

    /// Takes the first propagator of the cheapest non-empty class.
    pub fn pop(&mut self) -> Option<usize> {
        while self.not_empty != 0 {
            let priority = self.not_empty.trailing_zeros() as usize;
            if let Some(propagator) = self.queues[priority].pop_front() {
                self.scheduled[propagator] = false;
                return Some(propagator);
            }
            self.not_empty &= !(1 << priority);
        }
        return None;
    }

    pub fn has_pending_events(&self, propagator: usize) -> bool {
        return !self.pending[propagator].is_empty();
    }

    /// Moves the pending events of `propagator` to `events`, oldest first.
    pub fn take_events(&mut self, propagator: usize, events: &mut Vec<(usize, EventMask)>) {
        events.extend(self.pending[propagator].drain());
    }

    pub fn clear_events(&mut self, propagator: usize) {
        self.pending[propagator].clear();
    }

    /// Forgets every scheduled propagator and pending event.
    pub fn flush(&mut self) {
        for queue in self.queues.iter_mut() {
            while let Some(propagator) = queue.pop_front() {
                self.scheduled[propagator] = false;
                self.pending[propagator].clear();
            }
        }
        self.not_empty = 0;
        debug_assert!(self.scheduled.iter().all(|scheduled| !scheduled));
        debug_assert!(self.pending.iter().all(|pending| pending.is_empty()));
    }
}

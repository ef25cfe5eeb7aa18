use std::collections::VecDeque;

/// Bounded FIFO holding the most recent `capacity` items, oldest first.
///
/// Pushing into a full window evicts exactly the oldest item. Both ends are O(1),
/// so the cost of a push does not grow with the capacity.
#[derive(Debug, Clone)]
pub struct FixedWindow<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> FixedWindow<T> {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be positive");
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Newest item
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.items.back_mut()
    }

    /// Item pushed right before the newest one, `None` below two items
    pub fn second_last(&self) -> Option<&T> {
        self.items.len().checked_sub(2).and_then(|i| self.items.get(i))
    }

    /// The two newest items as `(previous, newest)`, with the newest one mutable
    pub fn last_pair_mut(&mut self) -> Option<(&T, &mut T)> {
        let start = self.items.len().checked_sub(2)?;
        let mut pair = self.items.range_mut(start..);
        let previous = pair.next()?;
        let newest = pair.next()?;
        Some((&*previous, newest))
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

//! Indexed binary heap used as the A* open list.
//!
//! Every element carries a stable integer id ([`HeapItem::heap_id`]). A side table maps ids to
//! heap slots and is rewritten on every slot write, so arbitrary elements can be removed in
//! `O(log n)` without scanning.

use core::cmp::Ordering;
use core::fmt;

const TOP: usize = 1;

/// An element that can be addressed by a stable, dense integer id.
pub trait HeapItem {
    fn heap_id(&self) -> usize;
}

impl HeapItem for usize {
    fn heap_id(&self) -> usize {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeapOrder {
    #[default]
    Minimum,
    Maximum,
}

type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

pub struct OpenList<T> {
    // Slot `i` (1-based) lives at `items[i - 1]`.
    items: Vec<T>,
    slots: Vec<Option<usize>>,
    order: HeapOrder,
    compare: Comparator<T>,
}

impl<T: fmt::Debug> fmt::Debug for OpenList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenList")
            .field("order", &self.order)
            .field("items", &self.items)
            .finish()
    }
}

impl<T: HeapItem + Ord> OpenList<T> {
    pub fn new(order: HeapOrder) -> Self {
        Self::with_comparator(order, |a: &T, b: &T| a.cmp(b))
    }
}

impl<T: HeapItem + Ord> Default for OpenList<T> {
    fn default() -> Self {
        Self::new(HeapOrder::Minimum)
    }
}

impl<T: HeapItem> OpenList<T> {
    pub fn with_comparator<F>(order: HeapOrder, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self {
            items: Vec::new(),
            slots: Vec::new(),
            order,
            compare: Box::new(compare),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.items.reserve(capacity);
        self.slots.reserve(capacity);
        self
    }

    pub fn order(&self) -> HeapOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.slot_of(id).is_some()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn push(&mut self, item: T) {
        let id = item.heap_id();
        // An id lives in the heap at most once; a second push replaces the first entry.
        if let Some(slot) = self.slot_of(id) {
            self.remove_at(slot);
        }
        self.items.push(item);
        let tail = self.items.len();
        self.write_slot(tail);
        self.sift_up(tail);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.remove_at(TOP)
    }

    /// Remove the element with the given id, if present.
    pub fn remove(&mut self, id: usize) -> Option<T> {
        let slot = self.slot_of(id)?;
        self.remove_at(slot)
    }

    /// Drop every element; `release` also frees the backing storage.
    pub fn clear(&mut self, release: bool) {
        self.items.clear();
        self.slots.clear();
        if release {
            self.items.shrink_to_fit();
            self.slots.shrink_to_fit();
        }
    }

    /// Pre-order walk from the root; stops as soon as `f` returns `true`.
    pub fn walk(&self, mut f: impl FnMut(&T) -> bool) {
        let mut stack = vec![TOP];
        while let Some(slot) = stack.pop() {
            if slot > self.items.len() {
                continue;
            }
            if f(&self.items[slot - 1]) {
                return;
            }
            let left = slot << 1;
            stack.push(left + 1);
            stack.push(left);
        }
    }

    fn slot_of(&self, id: usize) -> Option<usize> {
        self.slots.get(id).copied().flatten()
    }

    fn remove_at(&mut self, slot: usize) -> Option<T> {
        let tail = self.items.len();
        if slot < TOP || slot > tail {
            return None;
        }
        self.items.swap(slot - 1, tail - 1);
        let removed = self.items.pop()?;
        if let Some(entry) = self.slots.get_mut(removed.heap_id()) {
            *entry = None;
        }
        if slot < tail {
            self.write_slot(slot);
            // The moved tail element may belong above or below its new slot.
            if !self.sift_up(slot) {
                self.sift_down(slot);
            }
        }
        Some(removed)
    }

    /// Record the id of whatever now sits in `slot`.
    fn write_slot(&mut self, slot: usize) {
        debug_assert!(slot >= TOP && slot <= self.items.len(), "slot {slot} out of range");
        let id = self.items[slot - 1].heap_id();
        if id >= self.slots.len() {
            let grown = (id + 1).max(self.slots.len() * 2);
            self.slots.resize(grown, None);
        }
        self.slots[id] = Some(slot);
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.items.swap(a - 1, b - 1);
        self.write_slot(a);
        self.write_slot(b);
    }

    /// `true` when `candidate` should sit above `refer`.
    fn precedes(&self, candidate: usize, refer: usize) -> bool {
        let ord = (self.compare)(&self.items[candidate - 1], &self.items[refer - 1]);
        match self.order {
            HeapOrder::Minimum => ord == Ordering::Less,
            HeapOrder::Maximum => ord == Ordering::Greater,
        }
    }

    /// Returns whether the element moved.
    fn sift_up(&mut self, mut slot: usize) -> bool {
        let start = slot;
        while slot > TOP {
            let parent = slot >> 1;
            if !self.precedes(slot, parent) {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
        slot != start
    }

    fn sift_down(&mut self, mut slot: usize) {
        let tail = self.items.len();
        loop {
            let left = slot << 1;
            if left > tail {
                break;
            }
            let right = left + 1;
            let child = if right <= tail && self.precedes(right, left) {
                right
            } else {
                left
            };
            if !self.precedes(child, slot) {
                break;
            }
            self.swap(child, slot);
            slot = child;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct Keyed {
        key: u32,
        id: usize,
    }

    impl HeapItem for Keyed {
        fn heap_id(&self) -> usize {
            self.id
        }
    }

    fn drain<T: HeapItem>(heap: &mut OpenList<T>) -> Vec<T> {
        std::iter::from_fn(|| heap.pop()).collect()
    }

    #[test]
    fn pops_in_ascending_order() {
        let mut heap = OpenList::new(HeapOrder::Minimum);
        for v in [5usize, 1, 9, 3, 7] {
            heap.push(v);
        }
        assert_eq!(heap.peek(), Some(&1));
        assert_eq!(drain(&mut heap), vec![1, 3, 5, 7, 9]);
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn maximum_order_pops_descending() {
        let mut heap = OpenList::new(HeapOrder::Maximum);
        for v in [2usize, 8, 4] {
            heap.push(v);
        }
        assert_eq!(drain(&mut heap), vec![8, 4, 2]);
    }

    #[test]
    fn remove_by_id_keeps_heap_valid() {
        let mut heap = OpenList::new(HeapOrder::Minimum);
        let keys = [40, 10, 30, 20, 50, 5, 60];
        for (id, key) in keys.into_iter().enumerate() {
            heap.push(Keyed { key, id });
        }

        let removed = heap.remove(2).expect("id 2 present");
        assert_eq!(removed.key, 30);
        assert!(!heap.contains(2));
        assert!(heap.remove(2).is_none());

        let keys: Vec<u32> = drain(&mut heap).into_iter().map(|k| k.key).collect();
        assert_eq!(keys, vec![5, 10, 20, 40, 50, 60]);
    }

    #[test]
    fn clear_with_release_empties_storage() {
        let mut heap = OpenList::new(HeapOrder::Minimum);
        heap.push(3usize);
        heap.push(1usize);
        heap.clear(true);
        assert!(heap.is_empty());
        assert!(!heap.contains(1));
        heap.push(2usize);
        assert_eq!(heap.pop(), Some(2));
    }

    #[test]
    fn walk_visits_root_first_and_can_stop() {
        let mut heap = OpenList::new(HeapOrder::Minimum);
        for v in [4usize, 2, 6, 1] {
            heap.push(v);
        }
        let mut seen = Vec::new();
        heap.walk(|v| {
            seen.push(*v);
            false
        });
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], 1);

        let mut count = 0;
        heap.walk(|_| {
            count += 1;
            true
        });
        assert_eq!(count, 1);
    }
}

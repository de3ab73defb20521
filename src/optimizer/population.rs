//! Population heap: a binary max-heap of individuals keyed by fitness.
//!
//! Scores compare with [`f32::total_cmp`], so the order is total even for the
//! rejection sentinel. [`Population::get_mut`] exposes the raw storage for
//! mate selection; it is heap-ordered, not sorted.

use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct Individual<C> {
    pub chromosome: C,
    pub score: f32,
    /// Bred this era; skips mating once and is re-evaluated when extracted.
    pub fresh: bool,
}

impl<C> Individual<C> {
    pub fn new(chromosome: C) -> Self {
        Self {
            chromosome,
            score: f32::MIN,
            fresh: false,
        }
    }
}

#[derive(Debug)]
pub struct Population<C> {
    heap: Vec<Individual<C>>,
}

impl<C> Default for Population<C> {
    fn default() -> Self {
        Self { heap: Vec::new() }
    }
}

#[inline]
fn outranks(a: f32, b: f32) -> bool {
    a.total_cmp(&b) == Ordering::Greater
}

impl<C> Population<C> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn insert(&mut self, individual: Individual<C>) {
        self.heap.push(individual);
        let mut child = self.heap.len() - 1;
        while child > 0 {
            let parent = (child - 1) / 2;
            if !outranks(self.heap[child].score, self.heap[parent].score) {
                break;
            }
            self.heap.swap(child, parent);
            child = parent;
        }
    }

    /// Remove and return the best-scored individual.
    pub fn extract(&mut self) -> Option<Individual<C>> {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.heap.swap_remove(0);
        self.sift_down(0);
        Some(top)
    }

    fn sift_down(&mut self, mut parent: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * parent + 1;
            let right = left + 1;
            let mut best = parent;
            if left < len && outranks(self.heap[left].score, self.heap[best].score) {
                best = left;
            }
            if right < len && outranks(self.heap[right].score, self.heap[best].score) {
                best = right;
            }
            if best == parent {
                return;
            }
            self.heap.swap(parent, best);
            parent = best;
        }
    }

    /// Positional access into heap storage. Callers must not change `score`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Individual<C>> {
        self.heap.get_mut(index)
    }

    pub fn get(&self, index: usize) -> Option<&Individual<C>> {
        self.heap.get(index)
    }

    /// Empty the heap in storage order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Individual<C>> {
        self.heap.drain(..)
    }

    pub fn best_score(&self) -> Option<f32> {
        self.heap.first().map(|individual| individual.score)
    }
}

//! Adaptive priority queue for the relaxed exploration.
//!
//! Starts as a bucket queue indexed by integer key and promotes itself to a
//! binary heap when a pushed key would require far more buckets than there
//! have been pushes. "Virtual pushes" inflate the push counter so that
//! incremental re-exploration, which pushes few entries with small keys,
//! does not trigger a premature promotion.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Buckets are always allowed up to this key, regardless of push count.
const MIN_BUCKETS: usize = 64;
/// Above `MIN_BUCKETS`, a key is admitted while
/// `key < BUCKETS_PER_PUSH * num_pushes`; otherwise the queue promotes.
const BUCKETS_PER_PUSH: usize = 2;

#[derive(Debug)]
pub struct BucketQueue<V> {
    buckets: Vec<Vec<V>>,
    current_bucket: usize,
    num_entries: usize,
    num_pushes: usize,
}

impl<V: Copy> BucketQueue<V> {
    fn new() -> Self {
        BucketQueue {
            buckets: Vec::new(),
            current_bucket: 0,
            num_entries: 0,
            num_pushes: 0,
        }
    }

    fn push(&mut self, key: usize, value: V) {
        if key >= self.buckets.len() {
            self.buckets.resize_with(key + 1, Vec::new);
        }
        self.current_bucket = self.current_bucket.min(key);
        self.buckets[key].push(value);
        self.num_entries += 1;
        self.num_pushes += 1;
    }

    fn pop(&mut self) -> Option<(usize, V)> {
        if self.num_entries == 0 {
            return None;
        }
        while self.buckets[self.current_bucket].is_empty() {
            self.current_bucket += 1;
        }
        self.num_entries -= 1;
        let value = self.buckets[self.current_bucket]
            .pop()
            .expect("bucket is non-empty");
        Some((self.current_bucket, value))
    }

    fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.current_bucket = 0;
        self.num_entries = 0;
        self.num_pushes = 0;
    }
}

/// Min-queue over `(key, value)` pairs with amortised O(1) bucket access and
/// heap fallback for sparse large keys.
#[derive(Debug)]
pub enum AdaptiveQueue<V> {
    Bucket(BucketQueue<V>),
    Heap(BinaryHeap<Reverse<(usize, V)>>),
}

impl<V: Copy + Ord> AdaptiveQueue<V> {
    pub fn new() -> Self {
        AdaptiveQueue::Bucket(BucketQueue::new())
    }

    pub fn push(&mut self, key: usize, value: V) {
        if let AdaptiveQueue::Bucket(bucket_queue) = &*self {
            if key >= MIN_BUCKETS && key >= BUCKETS_PER_PUSH * (bucket_queue.num_pushes + 1) {
                self.promote();
            }
        }
        match self {
            AdaptiveQueue::Bucket(bucket_queue) => bucket_queue.push(key, value),
            AdaptiveQueue::Heap(heap) => heap.push(Reverse((key, value))),
        }
    }

    pub fn pop(&mut self) -> Option<(usize, V)> {
        match self {
            AdaptiveQueue::Bucket(bucket_queue) => bucket_queue.pop(),
            AdaptiveQueue::Heap(heap) => heap.pop().map(|Reverse(entry)| entry),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AdaptiveQueue::Bucket(bucket_queue) => bucket_queue.num_entries == 0,
            AdaptiveQueue::Heap(heap) => heap.is_empty(),
        }
    }

    pub fn clear(&mut self) {
        match self {
            AdaptiveQueue::Bucket(bucket_queue) => bucket_queue.clear(),
            // Keep the bucket storage for the next full exploration.
            AdaptiveQueue::Heap(_) => *self = AdaptiveQueue::new(),
        }
    }

    /// Pretends `count` pushes have happened. Keeps the queue bucket-backed
    /// when the caller knows that many small-keyed pushes are representative
    /// of the workload.
    pub fn add_virtual_pushes(&mut self, count: usize) {
        if let AdaptiveQueue::Bucket(bucket_queue) = self {
            bucket_queue.num_pushes += count;
        }
    }

    fn promote(&mut self) {
        if let AdaptiveQueue::Bucket(bucket_queue) = self {
            let mut heap = BinaryHeap::with_capacity(bucket_queue.num_entries);
            for (key, bucket) in bucket_queue.buckets.iter().enumerate() {
                for &value in bucket {
                    heap.push(Reverse((key, value)));
                }
            }
            *self = AdaptiveQueue::Heap(heap);
        }
    }
}

impl<V: Copy + Ord> Default for AdaptiveQueue<V> {
    fn default() -> Self {
        AdaptiveQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_key_order() {
        let mut queue = AdaptiveQueue::new();
        queue.push(3, 'c');
        queue.push(1, 'a');
        queue.push(2, 'b');
        queue.push(1, 'd');
        let mut keys = Vec::new();
        while let Some((key, _)) = queue.pop() {
            keys.push(key);
        }
        assert_eq!(keys, vec![1, 1, 2, 3]);
    }

    #[test]
    fn test_decreasing_keys_after_pops() {
        let mut queue = AdaptiveQueue::new();
        queue.push(5, 0usize);
        assert_eq!(queue.pop(), Some((5, 0)));
        // Re-opening a smaller key must work; incremental re-exploration
        // relies on it.
        queue.push(2, 1usize);
        assert_eq!(queue.pop(), Some((2, 1)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_promotes_on_sparse_large_key() {
        let mut queue = AdaptiveQueue::new();
        queue.push(1, 0usize);
        queue.push(1_000_000, 1usize);
        assert!(matches!(queue, AdaptiveQueue::Heap(_)));
        assert_eq!(queue.pop(), Some((1, 0)));
        assert_eq!(queue.pop(), Some((1_000_000, 1)));
    }

    #[test]
    fn test_virtual_pushes_defer_promotion() {
        let mut queue = AdaptiveQueue::new();
        queue.add_virtual_pushes(1_000_000);
        queue.push(1_000_000, 0usize);
        assert!(matches!(queue, AdaptiveQueue::Bucket(_)));
        assert_eq!(queue.pop(), Some((1_000_000, 0)));
    }

    #[test]
    fn test_clear_resets_bucket_state() {
        let mut queue = AdaptiveQueue::new();
        queue.push(7, 0usize);
        queue.push(2, 1usize);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
        queue.push(1, 2usize);
        assert_eq!(queue.pop(), Some((1, 2)));
    }
}

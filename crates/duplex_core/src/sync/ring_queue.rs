//! # Bounded Ring Queue
//!
//! Fixed-capacity FIFO for discrete cross-thread messages.
//!
//! ```text
//!   capacity = 4            head       tail
//!                             v          v
//!   slots:   [ _ ][ a ][ b ][ c ]  ->  full (3 live = capacity - 1)
//! ```
//!
//! One slot always stays empty so `head == tail` means empty and
//! `tail + 1 == head` means full, with nothing but the two indices.
//!
//! Push and pop never block on capacity: a full queue hands the item back,
//! an empty queue returns `None`. Both are ordinary outcomes.

use parking_lot::Mutex;

/// Fixed-capacity circular buffer behind a single mutex.
pub struct RingQueue<T> {
    ring: Mutex<Ring<T>>,
    capacity: usize,
}

struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
}

impl<T> Ring<T> {
    #[inline]
    fn next(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }

    fn len(&self) -> usize {
        let cap = self.slots.len();
        (self.tail + cap - self.head) % cap
    }
}

impl<T> RingQueue<T> {
    /// Creates a queue with `capacity` slots (`capacity - 1` usable).
    ///
    /// # Panics
    ///
    /// Panics if capacity is less than 2.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "Ring capacity must be at least 2");

        let slots: Vec<Option<T>> = (0..capacity).map(|_| None).collect();

        Self {
            ring: Mutex::new(Ring {
                slots: slots.into_boxed_slice(),
                head: 0,
                tail: 0,
            }),
            capacity,
        }
    }

    /// Returns the ring size (one more than the number of storable items).
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an item.
    ///
    /// # Errors
    ///
    /// Returns the item back if the queue is full.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut ring = self.ring.lock();
        let next = ring.next(ring.tail);
        if next == ring.head {
            return Err(item);
        }
        let tail = ring.tail;
        ring.slots[tail] = Some(item);
        ring.tail = next;
        Ok(())
    }

    /// Removes the oldest item, or returns `None` if the queue is empty.
    pub fn pop(&self) -> Option<T> {
        let mut ring = self.ring.lock();
        if ring.head == ring.tail {
            return None;
        }
        let head = ring.head;
        let item = ring.slots[head].take();
        ring.head = ring.next(head);
        item
    }

    /// Pops every queued item into `f`, oldest first.
    ///
    /// Returns the number of items drained.
    pub fn drain(&self, mut f: impl FnMut(T)) -> usize {
        let mut drained = 0;
        while let Some(item) = self.pop() {
            f(item);
            drained += 1;
        }
        drained
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let ring = self.ring.lock();
        ring.head == ring.tail
    }
}

impl<T> std::fmt::Debug for RingQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_capacity_minus_one() {
        let queue = RingQueue::new(4);
        assert!(queue.push(1).is_ok());
        assert!(queue.push(2).is_ok());
        assert!(queue.push(3).is_ok());
        assert_eq!(queue.push(4), Err(4));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_fifo_then_empty() {
        let queue = RingQueue::new(8);
        for i in 0..7 {
            queue.push(i).unwrap();
        }
        assert!(queue.push(7).is_err());

        for i in 0..7 {
            assert_eq!(queue.pop(), Some(i));
        }
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_wraparound() {
        let queue = RingQueue::new(3);
        for round in 0..10 {
            queue.push(round * 2).unwrap();
            queue.push(round * 2 + 1).unwrap();
            assert!(queue.push(99).is_err());
            assert_eq!(queue.pop(), Some(round * 2));
            assert_eq!(queue.pop(), Some(round * 2 + 1));
            assert_eq!(queue.pop(), None);
        }
    }

    #[test]
    fn test_drain() {
        let queue = RingQueue::new(5);
        queue.push("a").unwrap();
        queue.push("b").unwrap();

        let mut seen = Vec::new();
        assert_eq!(queue.drain(|m| seen.push(m)), 2);
        assert_eq!(seen, vec!["a", "b"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cross_thread_order() {
        let queue = Arc::new(RingQueue::new(16));
        let total = 1_000u32;

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut next = 0;
                while next < total {
                    if queue.push(next).is_ok() {
                        next += 1;
                    } else {
                        thread::yield_now();
                    }
                }
            })
        };

        let mut expected = 0;
        while expected < total {
            match queue.pop() {
                Some(value) => {
                    assert_eq!(value, expected);
                    expected += 1;
                }
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();
    }

    #[test]
    #[should_panic(expected = "at least 2")]
    fn test_undersized_ring_panics() {
        let _ = RingQueue::<u8>::new(1);
    }
}

//! Fixed-capacity circular buffer holding measurements awaiting redelivery
//!
//! ## Overview
//!
//! When the collector is unreachable, failed measurements are parked in a
//! ring buffer and retried as one batch on the next publish cycle. Capacity
//! is fixed through a const generic, so memory use stays bounded no matter
//! how long the collector stays down.
//!
//! ## Eviction
//!
//! Pushing into a full buffer overwrites the oldest entry and hands it back
//! to the caller. The buffer therefore always holds the newest `N` entries in
//! arrival order:
//!
//! ```text
//! CircularBuffer<3>, after pushing A B C D:
//!
//! Physical array:  [D, B, C]  (write_pos = 1)
//!                   0  1  2
//!
//! Logical view:    [B, C, D]  (A was evicted)
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use thermolink_core::buffer::CircularBuffer;
//!
//! let mut pending: CircularBuffer<u32, 3> = CircularBuffer::new();
//! for id in 1..=4 {
//!     if let Some(evicted) = pending.push(id) {
//!         assert_eq!(evicted, 1);
//!     }
//! }
//! assert_eq!(pending.to_vec(), vec![2, 3, 4]);
//! ```

use crate::constants::RETRY_BUFFER_CAPACITY;
use crate::events::Measurement;

/// Buffer of measurements that failed delivery
pub type RetryBuffer = CircularBuffer<Measurement, RETRY_BUFFER_CAPACITY>;

/// Fixed-size circular buffer keeping the newest `N` items
///
/// ## Internal Invariants
///
/// - `write_pos < N` (next write position is always valid)
/// - `len <= N` (never claim to have more items than capacity)
/// - Items are yielded oldest to newest when iterating
///
/// ## Thread Safety
///
/// This type is not synchronised. It is meant to be owned by a single task.
#[derive(Clone, Debug)]
pub struct CircularBuffer<T, const N: usize> {
    /// Storage, `None` for slots never written or cleared
    data: [Option<T>; N],

    /// Index where the next write will occur
    write_pos: usize,

    /// Current number of stored items
    len: usize,
}

impl<T, const N: usize> CircularBuffer<T, N> {
    /// Creates a new empty buffer
    pub fn new() -> Self {
        const { assert!(N > 0, "CircularBuffer capacity must be non-zero") };
        Self {
            data: core::array::from_fn(|_| None),
            write_pos: 0,
            len: 0,
        }
    }

    /// Append an item, returning the evicted oldest item if the buffer was full
    ///
    /// ```rust
    /// # use thermolink_core::buffer::CircularBuffer;
    /// let mut buf = CircularBuffer::<_, 2>::new();
    /// assert_eq!(buf.push('a'), None);
    /// assert_eq!(buf.push('b'), None);
    /// assert_eq!(buf.push('c'), Some('a'));
    /// ```
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.len == N {
            // Full: the slot about to be written holds the oldest item
            self.data[self.write_pos].take()
        } else {
            self.len += 1;
            None
        };

        self.data[self.write_pos] = Some(item);
        self.write_pos = (self.write_pos + 1) % N;

        evicted
    }

    /// Maximum number of items held
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Oldest stored item
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Most recently pushed item
    pub fn last(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|idx| self.get(idx))
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> CircularBufferIter<'_, T, N> {
        CircularBufferIter {
            buffer: self,
            index: 0,
        }
    }

    /// Remove every item
    pub fn clear(&mut self) {
        for slot in self.data.iter_mut() {
            *slot = None;
        }
        self.write_pos = 0;
        self.len = 0;
    }

    /// Gets an item by logical index (0 = oldest, len-1 = newest)
    ///
    /// When the buffer is full the oldest element sits at `write_pos`:
    ///
    /// ```text
    /// Physical array:  [D, E, A, B, C]  (write_pos = 2)
    /// Logical view:    [A, B, C, D, E]
    ///
    /// logical[i] = physical[(start + i) % N]
    /// ```
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        let start = if self.len < N { 0 } else { self.write_pos };
        self.data[(start + index) % N].as_ref()
    }
}

impl<T: Clone, const N: usize> CircularBuffer<T, N> {
    /// Copy the contents out in arrival order
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

/// Iterator over circular buffer contents
pub struct CircularBufferIter<'a, T, const N: usize> {
    buffer: &'a CircularBuffer<T, N>,
    index: usize,
}

impl<'a, T, const N: usize> Iterator for CircularBufferIter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a CircularBuffer<T, N> {
    type Item = &'a T;
    type IntoIter = CircularBufferIter<'a, T, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, const N: usize> Default for CircularBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
